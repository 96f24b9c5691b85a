// Client-side checks run before a file is sent to the upload service

use anyhow::Result;
use std::path::Path;

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

/// 16 MiB, the upload service's request limit
pub const MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

pub fn allowed_file(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reject files the upload service would refuse, with a user-facing message
pub fn check_upload(filename: &str, size: u64) -> Result<()> {
    if !allowed_file(filename) {
        anyhow::bail!("Invalid file type. Please upload CSV or Excel files only.");
    }
    if size > MAX_UPLOAD_BYTES {
        anyhow::bail!("File size exceeds 16MB limit.");
    }
    Ok(())
}

/// Human-readable byte count, e.g. `1.5 KB`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut idx = 0;
    while idx + 1 < UNITS.len() && bytes >= 1u64 << (10 * (idx + 1)) {
        idx += 1;
    }
    let scaled = bytes as f64 / 1024f64.powi(idx as i32);
    let rounded = (scaled * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[idx])
}
