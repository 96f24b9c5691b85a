// Typed payloads exchanged with the upload and persistence services

use crate::csv_reader::CsvData;
use crate::data::{TabularPreview, PREVIEW_ROWS};
use crate::kind::ChartKind;
use crate::palette::DEFAULT_PALETTE;
use crate::selection::{Role, RoleAssignment};
use crate::series::{self, ChartData};
use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A dataset as returned by the upload service
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    pub id: Option<i64>,
    pub filename: String,
    pub file_size: Option<u64>,
    /// Total row count of the uploaded file, not of the preview
    pub rows: usize,
    pub columns: usize,
    pub data_types: HashMap<String, String>,
    pub preview: TabularPreview,
}

#[derive(Deserialize)]
struct RawDataset {
    id: Option<i64>,
    #[serde(default)]
    filename: String,
    file_size: Option<u64>,
    #[serde(default)]
    rows: usize,
    columns: Option<usize>,
    #[serde(default)]
    column_names: Vec<String>,
    #[serde(default)]
    data_types: HashMap<String, String>,
    #[serde(default)]
    preview: Vec<Value>,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = anyhow::Error;

    fn try_from(raw: RawDataset) -> Result<Self> {
        let columns = raw.columns.unwrap_or(raw.column_names.len());
        let column_names = if raw.column_names.is_empty() {
            None
        } else {
            Some(raw.column_names)
        };
        let preview = TabularPreview::from_json(&Value::Array(raw.preview), column_names)
            .context("Invalid dataset preview")?;

        Ok(Self {
            id: raw.id,
            filename: raw.filename,
            file_size: raw.file_size,
            rows: raw.rows,
            columns,
            data_types: raw.data_types,
            preview,
        })
    }
}

impl Dataset {
    /// Build a dataset summary from local CSV data, keeping the first rows as preview
    pub fn from_csv(filename: &str, file_size: Option<u64>, csv: &CsvData) -> Self {
        let data_types = csv
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let cells = csv.rows.iter().map(|r| r.get(i).map_or("", String::as_str));
                (h.clone(), infer_dtype(cells))
            })
            .collect();

        Self {
            id: None,
            filename: filename.to_string(),
            file_size,
            rows: csv.rows.len(),
            columns: csv.headers.len(),
            data_types,
            preview: TabularPreview::from_records(&csv.headers, &csv.rows, PREVIEW_ROWS),
        }
    }

    /// Parse either a bare dataset object or an upload response wrapping one
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).context("Input is not valid JSON")?;
        if value.get("success").is_some() || value.get("error").is_some() {
            let response: UploadResponse = decode_value(value)?;
            return Ok(response.data);
        }
        serde_json::from_value(value).context("Input is not a dataset object")
    }

    pub fn column_names(&self) -> &[String] {
        self.preview.columns()
    }
}

fn infer_dtype<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    let mut all_int = true;
    let mut all_float = true;
    let mut any = false;

    for cell in cells.map(str::trim).filter(|c| !c.is_empty()) {
        any = true;
        all_int &= cell.parse::<i64>().is_ok();
        all_float &= cell.parse::<f64>().is_ok();
    }

    match (any, all_int, all_float) {
        (true, true, _) => "int64",
        (true, false, true) => "float64",
        _ => "object",
    }
    .to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub data: Dataset,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveResponse {
    pub chart_id: i64,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShareResponse {
    pub share_url: String,
    pub share_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResponse {
    pub chart: SavedChart,
}

/// Decode a service response of the form `{"success": true, ...}` or `{"error": "..."}`.
///
/// A failed response becomes an error carrying the service's message.
pub fn decode_response<T: DeserializeOwned>(body: &str) -> Result<T> {
    let value: Value = serde_json::from_str(body).context("Response is not valid JSON")?;
    decode_value(value)
}

fn decode_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    if value.get("success").and_then(Value::as_bool) == Some(true) {
        return serde_json::from_value(value).context("Unexpected response shape");
    }
    let message = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error");
    Err(anyhow!("{}", message))
}

/// Request body for saving a chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub title: String,
    pub chart_type: ChartKind,
    pub dataset_id: i64,
    pub color_scheme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_column: Option<String>,
}

impl ChartConfig {
    /// Only the roles the chart kind uses are sent
    pub fn new(
        title: &str,
        kind: ChartKind,
        dataset_id: i64,
        palette: &str,
        selection: &RoleAssignment,
    ) -> Self {
        let title = if title.is_empty() {
            kind.default_title()
        } else {
            title.to_string()
        };
        let pick = |role: Role| {
            kind.required_roles()
                .contains(&role)
                .then(|| selection.get(role).unwrap_or_default().to_string())
        };

        Self {
            title,
            chart_type: kind,
            dataset_id,
            color_scheme: palette.to_string(),
            x_axis: pick(Role::X),
            y_axis: pick(Role::Y),
            value_column: pick(Role::Value),
            label_column: pick(Role::Label),
        }
    }
}

/// Column choices as stored with a saved chart
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StoredConfig {
    pub x_axis: Option<String>,
    pub y_axis: Option<String>,
    pub value_column: Option<String>,
    pub label_column: Option<String>,
    pub color_scheme: Option<String>,
}

impl StoredConfig {
    pub fn selection(&self) -> RoleAssignment {
        let mut selection = RoleAssignment::new();
        let slots = [
            (Role::X, &self.x_axis),
            (Role::Y, &self.y_axis),
            (Role::Value, &self.value_column),
            (Role::Label, &self.label_column),
        ];
        for (role, column) in slots {
            if let Some(column) = column {
                selection.set(role, column.as_str());
            }
        }
        selection
    }

    pub fn palette(&self) -> &str {
        self.color_scheme.as_deref().unwrap_or(DEFAULT_PALETTE)
    }
}

/// A chart fetched back from the persistence service
#[derive(Debug, Clone, Deserialize)]
pub struct SavedChart {
    pub id: i64,
    pub title: String,
    pub chart_type: ChartKind,
    #[serde(default)]
    pub config: StoredConfig,
    #[serde(default)]
    pub is_public: bool,
    pub share_token: Option<String>,
    pub dataset: Option<Dataset>,
}

impl SavedChart {
    /// Recompute the chart data from the stored configuration and dataset preview
    pub fn chart_data(&self) -> Result<ChartData> {
        let dataset = self
            .dataset
            .as_ref()
            .ok_or_else(|| anyhow!("Chart {} has no dataset attached", self.id))?;
        Ok(series::prepare(
            &dataset.preview,
            &self.config.selection(),
            self.chart_type,
            self.config.palette(),
        ))
    }

    /// Public link for the chart, when it has been shared
    pub fn share_url(&self, origin: &str) -> Option<String> {
        match (&self.share_token, self.is_public) {
            (Some(token), true) => Some(share_url(origin, token)),
            _ => None,
        }
    }

    /// A public chart reuses its link; any other chart needs a share request
    pub fn share_step(&self, origin: &str) -> ShareStep {
        match self.share_url(origin) {
            Some(url) => ShareStep::Copy(url),
            None => ShareStep::Request { chart_id: self.id },
        }
    }

    /// Record a successful share: the chart is public under the returned token
    pub fn apply_share(&mut self, response: &ShareResponse) {
        self.is_public = true;
        self.share_token = Some(response.share_token.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareStep {
    Copy(String),
    Request { chart_id: i64 },
}

pub fn share_url(origin: &str, token: &str) -> String {
    format!("{}/shared/{}", origin.trim_end_matches('/'), token)
}
