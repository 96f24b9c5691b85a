// Runtime executor: feeds a chart request through the builder and carries out its effects

use crate::api::Dataset;
use crate::kind::ChartKind;
use crate::render::{Canvas, Renderer};
use crate::selection::{Role, RoleAssignment};
use crate::series::{self, ChartData};
use crate::state::{ChartBuilder, Effect, Event, Level};
use crate::RenderOptions;
use anyhow::{Context, Result};
use log::{debug, info};

/// Everything the user picks on the chart form
#[derive(Debug, Clone, Default)]
pub struct ChartRequest {
    pub kind: ChartKind,
    pub selection: RoleAssignment,
    pub palette: String,
    pub title: Option<String>,
}

impl ChartRequest {
    fn events(&self) -> Vec<Event> {
        let mut events = vec![
            Event::KindSelected(self.kind),
            Event::PaletteSelected(self.palette.clone()),
        ];
        if let Some(title) = &self.title {
            events.push(Event::TitleChanged(title.clone()));
        }
        for role in Role::ALL {
            if let Some(column) = self.selection.get(role) {
                events.push(Event::ColumnSelected {
                    role,
                    column: column.to_string(),
                });
            }
        }
        events
    }
}

/// Owns the builder state and the drawing surface it drives
pub struct Session<R: Renderer> {
    builder: ChartBuilder,
    renderer: R,
}

impl<R: Renderer> Session<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            builder: ChartBuilder::new(),
            renderer,
        }
    }

    pub fn builder(&self) -> &ChartBuilder {
        &self.builder
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Apply an event and run the effects it produces.
    ///
    /// Error notifications are returned as errors; save and export effects
    /// are handed back to the caller.
    pub fn dispatch(&mut self, event: Event) -> Result<Vec<Effect>> {
        let mut pending = Vec::new();
        for effect in self.builder.apply(event) {
            match effect {
                Effect::Teardown => self.renderer.teardown(),
                Effect::Render { generation, chart, title } => {
                    self.renderer
                        .draw(&chart, &title)
                        .with_context(|| format!("Failed to render '{}'", title))?;
                    self.builder.apply(Event::RenderFinished { generation });
                }
                Effect::Notify(note) if note.level == Level::Error => {
                    anyhow::bail!("{}", note.message);
                }
                other => pending.push(other),
            }
        }
        Ok(pending)
    }
}

/// Validate the request against the dataset and load both into a session
fn load_session(
    dataset: Dataset,
    request: &ChartRequest,
    options: &RenderOptions,
) -> Result<Session<Canvas>> {
    request.selection.check_columns(&dataset.preview)?;
    let missing = request.selection.missing_roles(request.kind);
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|r| r.as_str()).collect();
        anyhow::bail!(
            "A {} chart needs columns for: {}",
            request.kind,
            names.join(", ")
        );
    }

    let mut session = Session::new(Canvas::new(options.width, options.height)?);
    session.dispatch(Event::DatasetLoaded(dataset))?;
    for event in request.events() {
        session.dispatch(event)?;
    }
    Ok(session)
}

/// Render a chart for the dataset preview to PNG or SVG bytes
pub fn render_chart(
    dataset: Dataset,
    request: &ChartRequest,
    options: &RenderOptions,
) -> Result<Vec<u8>> {
    let mut session = load_session(dataset, request, options)?;
    session.dispatch(Event::UpdateRequested)?;
    debug!("chart drawn: {}", session.renderer().is_drawn());

    let bytes = session.renderer().export(options.format)?;
    info!(
        "rendered {} chart as {} ({} bytes)",
        request.kind,
        options.format.extension(),
        bytes.len()
    );
    Ok(bytes)
}

/// Prepare the chart data without drawing it
pub fn prepare_chart(dataset: &Dataset, request: &ChartRequest) -> Result<ChartData> {
    request.selection.check_columns(&dataset.preview)?;
    Ok(series::prepare(
        &dataset.preview,
        &request.selection,
        request.kind,
        &request.palette,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OutputFormat;
    use serde_json::json;

    fn dataset() -> Dataset {
        serde_json::from_value(json!({
            "id": 1,
            "filename": "t.csv",
            "column_names": ["month", "sales", "region"],
            "preview": [
                {"month": "Jan", "sales": 10, "region": "N"},
                {"month": "Feb", "sales": "12", "region": "S"},
                {"month": "Mar", "sales": "oops", "region": ""}
            ]
        }))
        .unwrap()
    }

    fn axis_request(kind: ChartKind) -> ChartRequest {
        ChartRequest {
            kind,
            selection: RoleAssignment::new()
                .with(Role::X, "month")
                .with(Role::Y, "sales"),
            palette: "blue".into(),
            title: None,
        }
    }

    fn is_valid_png(bytes: &[u8]) -> bool {
        bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
    }

    #[test]
    fn test_render_each_axis_kind() {
        for kind in [ChartKind::Bar, ChartKind::Line, ChartKind::Scatter] {
            let bytes = render_chart(dataset(), &axis_request(kind), &RenderOptions::default())
                .unwrap();
            assert!(is_valid_png(&bytes), "{} did not produce a PNG", kind);
        }
    }

    #[test]
    fn test_render_pie_svg() {
        let request = ChartRequest {
            kind: ChartKind::Pie,
            selection: RoleAssignment::new()
                .with(Role::Value, "sales")
                .with(Role::Label, "region"),
            palette: "rainbow".into(),
            title: Some("By region".into()),
        };
        let options = RenderOptions {
            format: OutputFormat::Svg,
            ..RenderOptions::default()
        };
        let svg = String::from_utf8(render_chart(dataset(), &request, &options).unwrap()).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("By region"));
    }

    #[test]
    fn test_render_pdf() {
        let options = RenderOptions {
            width: 400,
            height: 300,
            format: OutputFormat::Pdf,
        };
        let bytes = render_chart(dataset(), &axis_request(ChartKind::Line), &options).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_oversized_canvas_is_an_error() {
        let options = RenderOptions {
            width: 70000,
            height: 70000,
            format: OutputFormat::Png,
        };
        assert!(render_chart(dataset(), &axis_request(ChartKind::Bar), &options).is_err());
    }

    #[test]
    fn test_missing_roles_error() {
        let mut request = axis_request(ChartKind::Pie);
        request.selection.set(Role::Value, "sales");
        let err = render_chart(dataset(), &request, &RenderOptions::default()).unwrap_err();
        assert!(err.to_string().contains("needs columns for: label"));
    }

    #[test]
    fn test_unknown_column_error() {
        let mut request = axis_request(ChartKind::Bar);
        request.selection.set(Role::Y, "profit");
        let err = render_chart(dataset(), &request, &RenderOptions::default()).unwrap_err();
        assert!(err.to_string().contains("'profit' not found"));
    }

    #[test]
    fn test_prepare_chart() {
        let chart = prepare_chart(&dataset(), &axis_request(ChartKind::Line)).unwrap();
        assert_eq!(chart.series.values, vec![10.0, 12.0, 0.0]);
        assert_eq!(chart.border_width, 2);
    }

    #[test]
    fn test_session_redraw_and_export_effect() {
        let mut session = Session::new(Canvas::new(200, 150).unwrap());
        session.dispatch(Event::DatasetLoaded(dataset())).unwrap();
        for event in axis_request(ChartKind::Bar).events() {
            session.dispatch(event).unwrap();
        }
        session.dispatch(Event::UpdateRequested).unwrap();
        session.dispatch(Event::KindSelected(ChartKind::Line)).unwrap();
        session.dispatch(Event::UpdateRequested).unwrap();
        assert!(session.builder().has_chart());

        let effects = session.dispatch(Event::DownloadRequested(OutputFormat::Png)).unwrap();
        assert_eq!(
            effects,
            vec![Effect::Export {
                file_name: "chart.png".into(),
                format: OutputFormat::Png,
            }]
        );

        session.dispatch(Event::NavigatedAway).unwrap();
        assert!(!session.renderer().is_drawn());
    }
}
