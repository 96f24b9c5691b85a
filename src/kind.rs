use crate::selection::Role;
use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of chart types the builder can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    Pie,
    Scatter,
}

impl ChartKind {
    pub const ALL: [Self; 4] = [Self::Bar, Self::Line, Self::Pie, Self::Scatter];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Pie => "pie",
            Self::Scatter => "scatter",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Bar => "Bar",
            Self::Line => "Line",
            Self::Pie => "Pie",
            Self::Scatter => "Scatter",
        }
    }

    /// Title used when the user leaves the title field blank
    pub fn default_title(self) -> String {
        format!("{} Chart", self.display_name())
    }

    pub fn required_roles(self) -> &'static [Role] {
        match self {
            Self::Bar | Self::Line | Self::Scatter => &[Role::X, Role::Y],
            Self::Pie => &[Role::Value, Role::Label],
        }
    }

    /// Pie slices are categorical; every other kind is drawn against axes
    pub fn is_categorical(self) -> bool {
        matches!(self, Self::Pie)
    }

    pub fn border_width(self) -> u32 {
        match self {
            Self::Line => 2,
            _ => 1,
        }
    }

    pub fn tension(self) -> f64 {
        match self {
            Self::Line => 0.4,
            _ => 0.0,
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                anyhow!(
                    "Unknown chart type '{}' (expected one of bar, line, pie, scatter)",
                    s
                )
            })
    }
}
