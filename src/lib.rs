// Library exports for fluxion

pub mod api;
pub mod csv_reader;
pub mod data;
pub mod kind;
pub mod library;
pub mod palette;
pub mod preview;
pub mod render;
pub mod runtime;
pub mod selection;
pub mod series;
pub mod state;
pub mod upload;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
    #[serde(rename = "pdf")]
    Pdf,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "svg" => Some(Self::Svg),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Surface configuration for the rendering collaborator
#[derive(Debug, Clone, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    600
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            format: OutputFormat::default(),
        }
    }
}

impl RenderOptions {
    /// Load options from a JSON file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read options file '{}'", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid options file '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_options_defaults() {
        let options: RenderOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.width, 800);
        assert_eq!(options.height, 600);
        assert_eq!(options.format, OutputFormat::Png);
    }

    #[test]
    fn test_output_format_from_extension() {
        assert_eq!(OutputFormat::from_extension("SVG"), Some(OutputFormat::Svg));
        assert_eq!(OutputFormat::from_extension("pdf"), Some(OutputFormat::Pdf));
        assert_eq!(OutputFormat::Pdf.extension(), "pdf");
        assert_eq!(OutputFormat::from_extension("eps"), None);
    }

    #[test]
    fn test_render_options_partial() {
        let options: RenderOptions =
            serde_json::from_str(r#"{"width": 400, "type": "svg"}"#).unwrap();
        assert_eq!(options.width, 400);
        assert_eq!(options.height, 600);
        assert_eq!(options.format, OutputFormat::Svg);
    }
}
