//! Output formatting for CLI

use marquee_core::Representation;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format options
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// Format output based on selected format
pub fn format_output<T: Serialize>(data: &T, format: &str) -> String {
    match OutputFormat::from(format) {
        OutputFormat::Json => {
            serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table | OutputFormat::Text => {
            format!("{:?}", serde_json::to_value(data).unwrap_or_default())
        }
    }
}

/// Render rows as a rounded table
pub fn table<T: Tabled>(rows: Vec<T>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// One-line summary of a representation
pub fn describe(rep: &Representation) -> String {
    let mut parts = vec![rep.src.clone(), rep.mime_type.clone().unwrap_or_else(|| "unknown".into())];
    if let Some(quality) = rep.quality {
        parts.push(format!("{}p", quality));
    }
    if let Some(bit_rate) = rep.bit_rate {
        parts.push(format!("{}bps", bit_rate));
    }
    if let Some(drm) = rep.drm_system {
        parts.push(format!("drm={:?}", drm));
    }
    if rep.default {
        parts.push("default".into());
    }
    parts.join("  ")
}

#[derive(Tabled)]
pub struct RepresentationRow {
    #[tabled(rename = "Item")]
    pub item: usize,
    #[tabled(rename = "Language")]
    pub language: String,
    #[tabled(rename = "Quality")]
    pub quality: String,
    #[tabled(rename = "Type")]
    pub mime_type: String,
    #[tabled(rename = "Bitrate")]
    pub bit_rate: String,
    #[tabled(rename = "Source")]
    pub src: String,
}

impl RepresentationRow {
    pub fn new(item: usize, rep: &Representation) -> Self {
        Self {
            item: item + 1,
            language: or_dash(rep.language.as_deref()),
            quality: or_dash(rep.quality),
            mime_type: or_dash(rep.mime_type.as_deref()),
            bit_rate: or_dash(rep.bit_rate),
            src: rep.src.clone(),
        }
    }
}

/// Result of the `probe` command
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct ProbeReport {
    #[tabled(rename = "URL")]
    pub url: String,
    #[tabled(rename = "Status", display_with = "display_status")]
    pub status: Option<u16>,
    #[tabled(rename = "Reachable")]
    pub reachable: bool,
    #[tabled(rename = "Error", display_with = "display_error")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn display_status(status: &Option<u16>) -> String {
    or_dash(*status)
}

fn display_error(error: &Option<String>) -> String {
    or_dash(error.as_deref())
}
