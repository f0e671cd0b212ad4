//! WASM Bindings
//!
//! WebAssembly bindings for running the parser and report generator in the
//! browser. Errors are returned to JavaScript as message strings.

use wasm_bindgen::prelude::*;

use crate::{OutputFormat, ReportBuilder, SourceFile};

fn output_format(name: &str) -> Result<OutputFormat, String> {
    match name.to_ascii_lowercase().as_str() {
        "docx" => Ok(OutputFormat::Docx),
        "pdf" => Ok(OutputFormat::Pdf),
        other => Err(format!("Invalid output format: {}", other)),
    }
}

/// Parse a score export and return the records as JSON
///
/// # Arguments
/// * `file_name` - Uploaded file name (used to detect CSV vs workbook input)
/// * `bytes` - File content as a Uint8Array from JavaScript
///
/// # Returns
/// * Success: pretty-printed JSON array of records
/// * Error: Error message string
#[wasm_bindgen]
pub fn parse_records(file_name: &str, bytes: &[u8]) -> Result<String, String> {
    let generator = ReportBuilder::new()
        .build()
        .map_err(|e| format!("Failed to create generator: {}", e))?;

    let records = generator
        .parse_source(&SourceFile::new(file_name, bytes))
        .map_err(|e| e.to_string())?;

    serde_json::to_string_pretty(&records).map_err(|e| e.to_string())
}

/// Render every record of one upload and return the deliverable bytes
///
/// A single record yields the document itself; several records yield a ZIP
/// archive.
///
/// # Arguments
/// * `file_name` - Uploaded file name
/// * `bytes` - File content as a Uint8Array from JavaScript
/// * `format` - "docx" or "pdf"
#[wasm_bindgen]
pub fn render_reports(file_name: &str, bytes: &[u8], format: &str) -> Result<Vec<u8>, String> {
    let generator = ReportBuilder::new()
        .with_output_format(output_format(format)?)
        .build()
        .map_err(|e| format!("Failed to create generator: {}", e))?;

    let outcome = generator
        .run_batch(&[SourceFile::new(file_name, bytes)])
        .map_err(|e| e.to_string())?;

    if let Some(message) = outcome.units.iter().find_map(|u| u.error_message()) {
        return Err(message.to_string());
    }
    outcome
        .delivery
        .bytes()
        .map(<[u8]>::to_vec)
        .ok_or_else(|| "No reports were generated".to_string())
}

/// Get version information
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
