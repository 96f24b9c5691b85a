// Shaping preview rows into the series a chart renderer consumes

use crate::data::{Scalar, TabularPreview};
use crate::kind::ChartKind;
use crate::palette::{self, Color, Palette};
use crate::selection::{RoleAssignment, Role};
use serde::Serialize;

/// Category labels and their values, index-aligned
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<Scalar>,
    pub values: Vec<f64>,
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Labels as display text
    pub fn label_texts(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.to_string()).collect()
    }
}

/// A series together with the styling handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub kind: ChartKind,
    #[serde(flatten)]
    pub series: ChartSeries,
    /// One color per value
    pub colors: Vec<Color>,
    /// Legend label of the dataset (the y column); pie charts have none
    pub dataset_label: Option<String>,
    pub border_color: Color,
    pub border_width: u32,
    pub tension: f64,
}

/// Build the series for `kind` from the preview rows.
///
/// Axis kinds zero-fill values that fail numeric coercion and skip rows
/// whose x value is missing or empty. Pie drops any row without a truthy
/// label or a numeric value. Row order is kept in both cases.
pub fn build(preview: &TabularPreview, selection: &RoleAssignment, kind: ChartKind) -> ChartSeries {
    match kind {
        ChartKind::Bar | ChartKind::Line | ChartKind::Scatter => build_axis(
            preview,
            selection.get(Role::X).unwrap_or_default(),
            selection.get(Role::Y).unwrap_or_default(),
        ),
        ChartKind::Pie => build_pie(
            preview,
            selection.get(Role::Value).unwrap_or_default(),
            selection.get(Role::Label).unwrap_or_default(),
        ),
    }
}

fn build_axis(preview: &TabularPreview, x_col: &str, y_col: &str) -> ChartSeries {
    let mut series = ChartSeries::default();

    for row in preview.rows() {
        let x = match row.get(x_col) {
            Some(x) if !x.is_empty_string() => x,
            _ => continue,
        };
        let y = row.get(y_col).and_then(Scalar::to_number).unwrap_or(0.0);

        series.labels.push(x.clone());
        series.values.push(y);
    }

    series
}

fn build_pie(preview: &TabularPreview, value_col: &str, label_col: &str) -> ChartSeries {
    let mut series = ChartSeries::default();

    for row in preview.rows() {
        let label = match row.get(label_col) {
            Some(label) if label.is_truthy() => label,
            _ => continue,
        };
        let Some(value) = row.get(value_col).and_then(Scalar::to_number) else {
            continue;
        };

        series.labels.push(label.clone());
        series.values.push(value);
    }

    series
}

/// Build the series and attach colors from the named palette
pub fn prepare(
    preview: &TabularPreview,
    selection: &RoleAssignment,
    kind: ChartKind,
    palette_name: &str,
) -> ChartData {
    let series = build(preview, selection, kind);
    let colors = palette::colors_for(series.len(), palette_name);
    let dataset_label = if kind.is_categorical() {
        None
    } else {
        selection.get(Role::Y).map(str::to_string)
    };

    ChartData {
        kind,
        series,
        colors,
        dataset_label,
        border_color: Palette::resolve(palette_name).color(0),
        border_width: kind.border_width(),
        tension: kind.tension(),
    }
}
