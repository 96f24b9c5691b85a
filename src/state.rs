// Chart builder state machine
//
// User intents arrive as `Event`s; `ChartBuilder::apply` updates the state
// and returns the `Effect`s the host must carry out (render, teardown, save,
// export, notify). The builder never draws or performs I/O itself.

use crate::api::{ChartConfig, Dataset};
use crate::kind::ChartKind;
use crate::palette::DEFAULT_PALETTE;
use crate::selection::{self, FormFields, Role, RoleAssignment, UpdateControl};
use crate::series::{self, ChartData};
use crate::OutputFormat;
use log::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

/// Transient, dismissible message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: Level::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: Level::Error, message: message.into() }
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    DatasetLoaded(Dataset),
    KindSelected(ChartKind),
    /// An empty column clears the role
    ColumnSelected { role: Role, column: String },
    PaletteSelected(String),
    TitleChanged(String),
    UpdateRequested,
    /// The host finished drawing the render with this generation
    RenderFinished { generation: u64 },
    SaveRequested,
    /// Outcome of a save: the new chart id or the service's error message
    SaveFinished(Result<i64, String>),
    DownloadRequested(OutputFormat),
    NotificationDismissed,
    NavigatedAway,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Release the current drawing before the surface is reused
    Teardown,
    Render {
        generation: u64,
        chart: ChartData,
        title: String,
    },
    Save(ChartConfig),
    Export {
        file_name: String,
        format: OutputFormat,
    },
    Notify(Notification),
}

/// Owned state of the chart creation page
#[derive(Debug, Clone)]
pub struct ChartBuilder {
    dataset: Option<Dataset>,
    kind: ChartKind,
    selection: RoleAssignment,
    palette: String,
    title: String,
    generation: u64,
    /// Generation of the chart currently on screen
    shown: Option<u64>,
    /// A render was issued since the last teardown
    drawn: bool,
    saving: bool,
    notification: Option<Notification>,
}

impl Default for ChartBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartBuilder {
    pub fn new() -> Self {
        Self {
            dataset: None,
            kind: ChartKind::default(),
            selection: RoleAssignment::new(),
            palette: DEFAULT_PALETTE.to_string(),
            title: String::new(),
            generation: 0,
            shown: None,
            drawn: false,
            saving: false,
            notification: None,
        }
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    pub fn selection(&self) -> &RoleAssignment {
        &self.selection
    }

    pub fn palette(&self) -> &str {
        &self.palette
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn has_chart(&self) -> bool {
        self.shown.is_some()
    }

    pub fn update_control(&self) -> UpdateControl {
        UpdateControl::for_selection(&self.selection, self.kind)
    }

    pub fn form_fields(&self) -> FormFields {
        FormFields::for_kind(self.kind)
    }

    /// Title shown on the chart: the user's text or a default for the kind
    pub fn effective_title(&self) -> String {
        if self.title.is_empty() {
            self.kind.default_title()
        } else {
            self.title.clone()
        }
    }

    pub fn apply(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::DatasetLoaded(dataset) => {
                info!(
                    "loaded dataset '{}' ({} rows, {} columns)",
                    dataset.filename, dataset.rows, dataset.columns
                );
                let effects = self.discard_chart();
                self.dataset = Some(dataset);
                self.selection = RoleAssignment::new();
                self.notification = None;
                effects
            }
            Event::KindSelected(kind) => {
                debug!("chart kind -> {}", kind);
                self.kind = kind;
                Vec::new()
            }
            Event::ColumnSelected { role, column } => {
                let known = column.is_empty()
                    || self
                        .dataset
                        .as_ref()
                        .map_or(false, |d| d.preview.has_column(&column));
                if known {
                    self.selection.set(role, column);
                } else {
                    warn!("ignoring unknown column '{}' for role '{}'", column, role);
                }
                Vec::new()
            }
            Event::PaletteSelected(name) => {
                self.palette = name;
                Vec::new()
            }
            Event::TitleChanged(title) => {
                self.title = title;
                Vec::new()
            }
            Event::UpdateRequested => self.request_update(),
            Event::RenderFinished { generation } => {
                if generation == self.generation {
                    self.shown = Some(generation);
                } else {
                    debug!(
                        "discarding stale render {} (current {})",
                        generation, self.generation
                    );
                }
                Vec::new()
            }
            Event::SaveRequested => self.request_save(),
            Event::SaveFinished(result) => {
                self.saving = false;
                let note = match result {
                    Ok(id) => {
                        info!("chart saved with id {}", id);
                        Notification::success("Chart saved successfully!")
                    }
                    Err(message) => {
                        warn!("save failed: {}", message);
                        Notification::error(format!("Error saving chart: {}", message))
                    }
                };
                self.notify(note)
            }
            Event::DownloadRequested(format) => {
                if self.shown.is_none() {
                    return self.notify(Notification::error("Please create a chart first"));
                }
                let stem = if self.title.is_empty() {
                    "chart"
                } else {
                    self.title.as_str()
                };
                vec![Effect::Export {
                    file_name: format!("{}.{}", stem, format.extension()),
                    format,
                }]
            }
            Event::NotificationDismissed => {
                self.notification = None;
                Vec::new()
            }
            Event::NavigatedAway => self.discard_chart(),
        }
    }

    fn request_update(&mut self) -> Vec<Effect> {
        let Some(dataset) = &self.dataset else {
            return self.notify(Notification::error(
                "No dataset loaded. Please upload a file first.",
            ));
        };
        if !selection::validate(&self.selection, self.kind) {
            return self.notify(Notification::error("Please select the required data columns"));
        }

        let chart = series::prepare(&dataset.preview, &self.selection, self.kind, &self.palette);
        self.generation += 1;
        debug!(
            "update {}: {} chart with {} points",
            self.generation,
            self.kind,
            chart.series.len()
        );

        let mut effects = Vec::with_capacity(2);
        self.shown = None;
        if self.drawn {
            effects.push(Effect::Teardown);
        }
        self.drawn = true;
        effects.push(Effect::Render {
            generation: self.generation,
            chart,
            title: self.effective_title(),
        });
        effects
    }

    fn request_save(&mut self) -> Vec<Effect> {
        if self.shown.is_none() {
            return self.notify(Notification::error("Please create a chart first"));
        }
        let Some(dataset_id) = self.dataset.as_ref().and_then(|d| d.id) else {
            return self.notify(Notification::error(
                "No dataset loaded. Please go back to dashboard and upload a file first.",
            ));
        };
        if self.saving {
            debug!("save already in flight");
            return Vec::new();
        }

        self.saving = true;
        vec![Effect::Save(ChartConfig::new(
            &self.title,
            self.kind,
            dataset_id,
            &self.palette,
            &self.selection,
        ))]
    }

    fn discard_chart(&mut self) -> Vec<Effect> {
        self.shown = None;
        if self.drawn {
            self.drawn = false;
            // Invalidate renders still in flight
            self.generation += 1;
            vec![Effect::Teardown]
        } else {
            Vec::new()
        }
    }

    fn notify(&mut self, note: Notification) -> Vec<Effect> {
        self.notification = Some(note.clone());
        vec![Effect::Notify(note)]
    }
}
