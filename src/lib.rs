//! wiscreport - Pure-Rust WISC-V score export parser and psychological report generator
//!
//! This crate extracts structured assessment data from Q-Global score exports
//! (comma-separated text or spreadsheet workbooks) and renders one formatted
//! report per examinee as a DOCX or PDF document. Both formats are produced
//! from the same report model, so their visible content is identical.
//!
//! # Quick Start
//!
//! ```rust
//! use wiscreport::OutputFormat;
//!
//! fn main() -> Result<(), wiscreport::ReportError> {
//!     let csv = "firstname,lastname,wisc5_fsiq_ss,wisc5_vci_ss\nJohn,Smith,105,110\n";
//!
//!     // Decode and extract one record per data row
//!     let records = wiscreport::parse(csv)?;
//!     let vci = records[0].composite("VCI").expect("VCI column present");
//!     assert_eq!(vci.percentile_rank(), 75);
//!     assert_eq!(vci.classification().label(), "High Average");
//!
//!     // Render the report
//!     let docx = wiscreport::render(&records[0], OutputFormat::Docx)?;
//!     assert!(docx.starts_with(b"PK"));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Batch Processing
//!
//! ```rust
//! use wiscreport::{Delivery, OutputFormat, SourceFile, UploadStatus};
//!
//! # fn main() -> Result<(), wiscreport::ReportError> {
//! let files = vec![
//!     SourceFile::new("class.csv", "firstname,lastname\nJohn,Smith\nJane,Doe\n"),
//!     SourceFile::new("empty.csv", ""),
//! ];
//! let outcome = wiscreport::run_batch(&files, OutputFormat::Pdf)?;
//!
//! assert_eq!(outcome.units[1].status(), UploadStatus::Error);
//! match outcome.delivery {
//!     Delivery::Archive { name, entries, .. } => {
//!         assert_eq!(name, "WISC-V_Reports.zip");
//!         assert_eq!(entries.len(), 2);
//!     }
//!     _ => unreachable!(),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Custom Configuration
//!
//! ```rust
//! use wiscreport::{DateFormat, OutputFormat, ReportBuilder};
//!
//! # fn main() -> Result<(), wiscreport::ReportError> {
//! let generator = ReportBuilder::new()
//!     .with_output_format(OutputFormat::Pdf)
//!     .with_date_format(DateFormat::Custom("%B %-d, %Y".to_string()))
//!     .with_examiner_title("Licensed Psychologist")
//!     .build()?;
//!
//! let records = generator.parse("firstname,dob\nJane,2015-03-01\n")?;
//! assert_eq!(records[0].demographics().date_of_birth, "March 1, 2015");
//! # Ok(())
//! # }
//! ```

mod api;
mod archive;
mod batch;
mod builder;
mod catalog;
mod decoder;
mod error;
mod extract;
mod formatter;
mod output;
mod report;
mod score;
mod security;
mod summary;
mod types;

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
mod wasm;

// 公開API
pub use api::{DateFormat, InputKind, OutputFormat, UploadStatus};
pub use batch::{
    detect_input_kind, sanitize_name, source_stem, BatchOutcome, Delivery, OutputArtifact,
    SourceFile, UploadUnit,
};
pub use builder::{ReportBuilder, ReportGenerator};
pub use catalog::{CatalogEntry, Instrument};
pub use decoder::{clean_value, decode, decode_bytes, decode_workbook, split_line};
pub use error::ReportError;
pub use extract::{extract, ScanRules};
pub use output::{DocxFormatter, OutputFormatter, PdfFormatter};
pub use report::{
    ordinal, Align, Block, Column, ReportDocument, Signature, Span, Table, NO_COMPOSITES_NOTICE,
    NO_SUBTESTS_NOTICE, NOT_AVAILABLE, REPORT_TITLE,
};
pub use score::{classify, parse_score, percentile_rank};
pub use security::SecurityConfig;
pub use summary::{render_summary, summary_to_string};
pub use types::{
    AssessmentRecord, Classification, Demographics, HeaderIndex, PlaceholderMap, RawRow,
    ScoreEntry,
};

/// 既定設定で区切りテキストを解析する
///
/// `ReportBuilder::new().build()?.parse(text)`と同じです。
///
/// # 戻り値
///
/// * `Ok(Vec<AssessmentRecord>)` - 1件以上のレコード（入力順）
/// * `Err(ReportError::EmptyInput)` - 非空白行が2行未満の場合
/// * `Err(ReportError::NoValidRecords)` - データ行がすべて空白の場合
pub fn parse(text: &str) -> Result<Vec<AssessmentRecord>, ReportError> {
    ReportBuilder::new().build()?.parse(text)
}

/// 既定設定でレポートを出力する
pub fn render(record: &AssessmentRecord, format: OutputFormat) -> Result<Vec<u8>, ReportError> {
    ReportBuilder::new().build()?.render_as(record, format)
}

/// 既定設定で複数ファイルをバッチ処理する
pub fn run_batch(files: &[SourceFile], format: OutputFormat) -> Result<BatchOutcome, ReportError> {
    ReportBuilder::new()
        .with_output_format(format)
        .build()?
        .run_batch(files)
}
