//! Batch Orchestrator Module
//!
//! 複数の入力ファイルを順に処理し、ファイルごとの処理状態とレポート成果物を管理するモジュール。
//! 成果物が1件なら単一ファイル、2件以上ならZIPアーカイブとして引き渡します。

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::api::{InputKind, OutputFormat, UploadStatus};
use crate::archive::ArchiveWriter;
use crate::error::ReportError;
use crate::types::AssessmentRecord;

/// ワークブックとして扱う拡張子
const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xls", "xlsb", "ods"];
/// 区切りテキストとして扱う拡張子
const TEXT_EXTENSIONS: [&str; 2] = ["csv", "txt"];

/// メモリ上の入力ファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// アップロード時のファイル名
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    /// # 使用例
    ///
    /// ```rust
    /// use wiscreport::SourceFile;
    ///
    /// let file = SourceFile::new("scores.csv", "firstname,wisc5_fsiq_ss\nJane,100\n");
    /// assert_eq!(file.name, "scores.csv");
    /// ```
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// ファイルシステムから読み込む（名前はパスの最後の要素）
    pub fn read(path: &Path) -> Result<Self, ReportError> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Ok(Self { name, bytes })
    }
}

/// 1ファイル分の処理単位
///
/// 状態は Pending -> Processing -> (Complete | Error) の順にのみ進みます。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUnit {
    source_name: String,
    status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<Vec<AssessmentRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl UploadUnit {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            status: UploadStatus::Pending,
            records: None,
            error_message: None,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    /// 抽出済みレコード（Complete の場合のみ）
    pub fn records(&self) -> Option<&[AssessmentRecord]> {
        self.records.as_deref()
    }

    pub fn record_count(&self) -> usize {
        self.records.as_ref().map_or(0, Vec::len)
    }

    /// エラーメッセージ（Error の場合のみ）
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Pending -> Processing
    pub fn start(&mut self) -> Result<(), ReportError> {
        self.advance(UploadStatus::Processing)
    }

    /// Processing -> Complete
    pub fn complete(&mut self, records: Vec<AssessmentRecord>) -> Result<(), ReportError> {
        self.advance(UploadStatus::Complete)?;
        self.records = Some(records);
        Ok(())
    }

    /// Processing -> Error
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), ReportError> {
        self.advance(UploadStatus::Error)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    fn advance(&mut self, next: UploadStatus) -> Result<(), ReportError> {
        if !self.status.can_advance_to(next) {
            return Err(ReportError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }
}

/// 1件分のレポート成果物
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    /// `{入力ファイル名}_{受検者名}`
    pub file_name_stem: String,
    pub rendered_bytes: Vec<u8>,
    pub format: OutputFormat,
}

impl OutputArtifact {
    /// `{stem}_report.{docx|pdf}`
    pub fn file_name(&self) -> String {
        artifact_file_name(&self.file_name_stem, self.format)
    }
}

fn artifact_file_name(stem: &str, format: OutputFormat) -> String {
    format!("{}_report.{}", stem, format.extension())
}

/// 成果物の引き渡し方法
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// 成果物が1件
    Single(OutputArtifact),
    /// 成果物が2件以上（ZIPアーカイブ）
    Archive {
        name: String,
        bytes: Vec<u8>,
        /// アーカイブ内のファイル名（追加順）
        entries: Vec<String>,
    },
    /// 有効なレコードが1件もない
    Empty,
}

impl Delivery {
    /// 引き渡すファイル名
    pub fn file_name(&self) -> Option<String> {
        match self {
            Delivery::Single(artifact) => Some(artifact.file_name()),
            Delivery::Archive { name, .. } => Some(name.clone()),
            Delivery::Empty => None,
        }
    }

    /// 引き渡すバイト列
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Delivery::Single(artifact) => Some(artifact.rendered_bytes.as_slice()),
            Delivery::Archive { bytes, .. } => Some(bytes.as_slice()),
            Delivery::Empty => None,
        }
    }

    /// ディレクトリに書き出し、書き出したファイルのパスを返す
    ///
    /// # 戻り値
    ///
    /// * `Ok(Some(path))` - 書き出した場合
    /// * `Ok(None)` - `Delivery::Empty`の場合
    /// * `Err(ReportError::Io)` - 書き込みに失敗した場合
    pub fn write_to_dir(&self, dir: &Path) -> Result<Option<std::path::PathBuf>, ReportError> {
        let (Some(name), Some(bytes)) = (self.file_name(), self.bytes()) else {
            return Ok(None);
        };
        let path = dir.join(name);
        fs::write(&path, bytes)?;
        Ok(Some(path))
    }
}

/// バッチ処理の結果
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// 入力ファイルごとの処理単位（入力順）
    pub units: Vec<UploadUnit>,
    pub delivery: Delivery,
}

impl BatchOutcome {
    /// エラーになった処理単位の数
    pub fn failed(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.status() == UploadStatus::Error)
            .count()
    }

    /// 抽出されたレコードの総数
    pub fn total_records(&self) -> usize {
        self.units.iter().map(UploadUnit::record_count).sum()
    }
}

/// パスの区切り（`/`・`\`）を除いたファイル名
fn base_name(file_name: &str) -> &str {
    file_name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(file_name)
}

/// 拡張子（小文字）。隠しファイル形式の名前（`.csv`）は拡張子なしとみなす
fn extension(file_name: &str) -> Option<String> {
    match base_name(file_name).rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => Some(ext.to_ascii_lowercase()),
        _ => None,
    }
}

/// 入力ファイルの種類を判定する
///
/// 拡張子で判定し、拡張子がない場合はZIP/OLEの先頭バイトでワークブックを識別します。
///
/// # 戻り値
///
/// * `Ok(InputKind)` - 表形式の入力
/// * `Err(ReportError::UnsupportedFormat)` - 未対応の拡張子（`.pdf`など）
///
/// # 使用例
///
/// ```rust
/// use wiscreport::{detect_input_kind, InputKind};
///
/// assert_eq!(detect_input_kind("scores.CSV", b"").unwrap(), InputKind::Csv);
/// assert_eq!(detect_input_kind("scores.xlsx", b"").unwrap(), InputKind::Workbook);
/// assert!(detect_input_kind("report.pdf", b"%PDF").is_err());
/// ```
pub fn detect_input_kind(file_name: &str, bytes: &[u8]) -> Result<InputKind, ReportError> {
    match extension(file_name) {
        Some(ext) if TEXT_EXTENSIONS.contains(&ext.as_str()) => Ok(InputKind::Csv),
        Some(ext) if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) => Ok(InputKind::Workbook),
        Some(ext) => Err(ReportError::UnsupportedFormat {
            file_name: file_name.to_string(),
            extension: ext,
        }),
        None if bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(b"\xD0\xCF\x11\xE0") => {
            Ok(InputKind::Workbook)
        }
        None => Ok(InputKind::Csv),
    }
}

/// 入力ファイル名から成果物名の前半を作る
///
/// ディレクトリ部分と、対応する拡張子（大文字小文字を無視）を取り除きます。
pub fn source_stem(file_name: &str) -> String {
    let base = base_name(file_name);
    match extension(base) {
        Some(ext)
            if TEXT_EXTENSIONS.contains(&ext.as_str())
                || WORKBOOK_EXTENSIONS.contains(&ext.as_str()) =>
        {
            base[..base.len() - ext.len() - 1].to_string()
        }
        _ => base.to_string(),
    }
}

/// 受検者名をファイル名に使える形にする
///
/// ASCII英数字以外は`_`に置き換えます。英数字が1文字も残らない場合は
/// `Student_{row_position}`を使用します。
pub fn sanitize_name(student_name: &str, row_position: usize) -> String {
    let sanitized: String = student_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if sanitized.chars().any(|c| c.is_ascii_alphanumeric()) {
        sanitized
    } else {
        format!("Student_{}", row_position)
    }
}

/// バッチ内で一意な成果物名を割り当てる
#[derive(Debug, Default)]
pub(crate) struct StemAllocator {
    seen: HashMap<String, usize>,
}

impl StemAllocator {
    /// 2回目以降の同名には`_2`, `_3`, ... を付ける
    ///
    /// 付番した名前がすでに割り当て済みの場合は、その名前にさらに付番します。
    /// たとえば`x`, `x_2`, `x`の順に割り当てると、3つ目は`x_3`ではなく`x_2_2`になります。
    pub fn allocate(&mut self, stem: String) -> String {
        let count = self.seen.entry(stem.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            stem
        } else {
            let candidate = format!("{}_{}", stem, count);
            // 付番後の名前が既存の名前と衝突する場合はさらに付番する
            if self.seen.contains_key(&candidate) {
                self.allocate(candidate)
            } else {
                self.seen.insert(candidate.clone(), 1);
                candidate
            }
        }
    }
}

/// 成果物を組み立てて引き渡し方法を決める
///
/// `render`は1件ずつ呼ばれ、2件目以降はアーカイブへ書き込んだ後に破棄されます。
pub(crate) fn assemble_delivery<F>(
    jobs: &[(String, &AssessmentRecord)],
    format: OutputFormat,
    archive_name: &str,
    mut render: F,
) -> Result<Delivery, ReportError>
where
    F: FnMut(&AssessmentRecord) -> Result<Vec<u8>, ReportError>,
{
    match jobs {
        [] => Ok(Delivery::Empty),
        [(stem, record)] => Ok(Delivery::Single(OutputArtifact {
            file_name_stem: stem.clone(),
            rendered_bytes: render(*record)?,
            format,
        })),
        _ => {
            let mut archive = ArchiveWriter::new();
            for (stem, record) in jobs {
                let bytes = render(*record)?;
                archive.add(&artifact_file_name(stem, format), &bytes)?;
            }
            let entries = archive.entries().to_vec();
            let bytes = archive.finish()?;
            info!(entries = entries.len(), archive = archive_name, "batch archive assembled");
            Ok(Delivery::Archive {
                name: archive_name.to_string(),
                bytes,
                entries,
            })
        }
    }
}

/// 1ファイルを処理単位として解決する
///
/// `parse`の失敗はその処理単位のエラーとして記録され、呼び出し元には伝播しません。
pub(crate) fn resolve_unit<F>(file: &SourceFile, parse: F) -> Result<UploadUnit, ReportError>
where
    F: FnOnce(&SourceFile) -> Result<Vec<AssessmentRecord>, ReportError>,
{
    let mut unit = UploadUnit::new(file.name.as_str());
    unit.start()?;

    match parse(file) {
        Ok(records) => {
            info!(file = %file.name, records = records.len(), "upload processed");
            unit.complete(records)?;
        }
        Err(error) => {
            warn!(file = %file.name, error = %error, "upload failed");
            unit.fail(error.to_string())?;
        }
    }
    Ok(unit)
}

/// 完了した処理単位から成果物名とレコードの組を作る（入力順、行順）
pub(crate) fn plan_artifacts(units: &[UploadUnit]) -> Vec<(String, &AssessmentRecord)> {
    let mut stems = StemAllocator::default();
    let mut jobs = Vec::new();
    for unit in units {
        let source = source_stem(unit.source_name());
        for record in unit.records().unwrap_or_default() {
            let name = sanitize_name(record.student_name(), record.row_position());
            jobs.push((stems.allocate(format!("{}_{}", source, name)), record));
        }
    }
    jobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;
    use crate::extract::extract;
    use crate::types::HeaderIndex;

    fn records(text: &str) -> Vec<AssessmentRecord> {
        let rows = decode(text).unwrap();
        let header = HeaderIndex::from_row(&rows[0]);
        extract(&rows[1..], &header)
    }

    #[test]
    fn test_upload_unit_lifecycle() {
        let mut unit = UploadUnit::new("a.csv");
        assert_eq!(unit.status(), UploadStatus::Pending);
        unit.start().unwrap();
        unit.complete(records("firstname\nJane\n")).unwrap();

        assert_eq!(unit.status(), UploadStatus::Complete);
        assert_eq!(unit.record_count(), 1);
        assert!(unit.error_message().is_none());
    }

    // 状態は後戻りしない
    #[test]
    fn test_upload_unit_rejects_invalid_transitions() {
        let mut unit = UploadUnit::new("a.csv");
        assert!(matches!(
            unit.complete(Vec::new()),
            Err(ReportError::InvalidTransition { .. })
        ));

        unit.start().unwrap();
        unit.fail("boom").unwrap();
        assert_eq!(unit.error_message(), Some("boom"));
        match unit.start() {
            Err(ReportError::InvalidTransition { from, to }) => {
                assert_eq!(from, "error");
                assert_eq!(to, "processing");
            }
            other => panic!("expected InvalidTransition, got {:?}", other),
        }
        assert_eq!(unit.status(), UploadStatus::Error);
    }

    #[test]
    fn test_detect_input_kind() {
        assert_eq!(detect_input_kind("a.csv", b"").unwrap(), InputKind::Csv);
        assert_eq!(detect_input_kind("a.TXT", b"").unwrap(), InputKind::Csv);
        assert_eq!(detect_input_kind("dir/a.ods", b"").unwrap(), InputKind::Workbook);
        assert_eq!(detect_input_kind("noext", b"PK\x03\x04rest").unwrap(), InputKind::Workbook);
        assert_eq!(detect_input_kind("noext", b"a,b\n1,2").unwrap(), InputKind::Csv);

        match detect_input_kind("scores.pdf", b"%PDF") {
            Err(ReportError::UnsupportedFormat { file_name, extension }) => {
                assert_eq!(file_name, "scores.pdf");
                assert_eq!(extension, "pdf");
            }
            other => panic!("expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_source_stem() {
        assert_eq!(source_stem("scores.csv"), "scores");
        assert_eq!(source_stem("Scores.CSV"), "Scores");
        assert_eq!(source_stem("C:\\uploads\\batch.xlsx"), "batch");
        assert_eq!(source_stem("uploads/2024/batch.v2.csv"), "batch.v2");
        assert_eq!(source_stem("noext"), "noext");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("John Smith", 1), "John_Smith");
        assert_eq!(sanitize_name("O'Neil-Brown", 1), "O_Neil_Brown");
        assert_eq!(sanitize_name("José", 1), "Jos_");
        assert_eq!(sanitize_name("", 4), "Student_4");
        assert_eq!(sanitize_name("日本", 2), "Student_2");
    }

    #[test]
    fn test_stem_allocator_suffixes_duplicates() {
        let mut stems = StemAllocator::default();
        assert_eq!(stems.allocate("a_John".to_string()), "a_John");
        assert_eq!(stems.allocate("a_John".to_string()), "a_John_2");
        assert_eq!(stems.allocate("a_John".to_string()), "a_John_3");
        assert_eq!(stems.allocate("a_Jane".to_string()), "a_Jane");
    }

    #[test]
    fn test_stem_allocator_avoids_existing_suffix() {
        let mut stems = StemAllocator::default();
        assert_eq!(stems.allocate("x_2".to_string()), "x_2");
        assert_eq!(stems.allocate("x".to_string()), "x");
        assert_eq!(stems.allocate("x".to_string()), "x_2_2");
        assert_eq!(stems.allocate("x".to_string()), "x_3");
        assert_eq!(stems.allocate("x_2".to_string()), "x_2_3");
    }

    #[test]
    fn test_resolve_unit_records_errors_on_unit() {
        let file = SourceFile::new("empty.csv", "");
        let unit = resolve_unit(&file, |_| Err(ReportError::EmptyInput)).unwrap();
        assert_eq!(unit.status(), UploadStatus::Error);
        assert_eq!(
            unit.error_message(),
            Some(ReportError::EmptyInput.to_string().as_str())
        );

        let unit = resolve_unit(&file, |_| Ok(Vec::new())).unwrap();
        assert_eq!(unit.status(), UploadStatus::Complete);
    }

    #[test]
    fn test_plan_artifacts_order_and_names() {
        let mut first = UploadUnit::new("uploads/a.csv");
        first.start().unwrap();
        first
            .complete(records("firstname,lastname\nJohn,Smith\n,\nJohn,Smith\n"))
            .unwrap();
        let mut failed = UploadUnit::new("b.csv");
        failed.start().unwrap();
        failed.fail("bad").unwrap();

        let units = vec![first, failed];
        let stems: Vec<String> = plan_artifacts(&units).into_iter().map(|(s, _)| s).collect();
        assert_eq!(stems, vec!["a_John_Smith", "a_John_Smith_2"]);
    }

    #[test]
    fn test_assemble_delivery_variants() {
        let recs = records("firstname\nJane\nJoe\n");
        let render = |r: &AssessmentRecord| Ok(r.student_name().as_bytes().to_vec());

        let empty = assemble_delivery(&[], OutputFormat::Pdf, "out.zip", render).unwrap();
        assert_eq!(empty, Delivery::Empty);
        assert!(empty.file_name().is_none());

        let one = vec![("a_Jane".to_string(), &recs[0])];
        match assemble_delivery(&one, OutputFormat::Pdf, "out.zip", render).unwrap() {
            Delivery::Single(artifact) => {
                assert_eq!(artifact.file_name(), "a_Jane_report.pdf");
                assert_eq!(artifact.rendered_bytes, b"Jane".to_vec());
            }
            other => panic!("expected single, got {:?}", other),
        }

        let two = vec![("a_Jane".to_string(), &recs[0]), ("a_Joe".to_string(), &recs[1])];
        match assemble_delivery(&two, OutputFormat::Docx, "out.zip", render).unwrap() {
            Delivery::Archive { name, entries, .. } => {
                assert_eq!(name, "out.zip");
                assert_eq!(entries, vec!["a_Jane_report.docx", "a_Joe_report.docx"]);
            }
            other => panic!("expected archive, got {:?}", other),
        }
    }

    #[test]
    fn test_write_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let delivery = Delivery::Single(OutputArtifact {
            file_name_stem: "a_Jane".to_string(),
            rendered_bytes: b"%PDF-1.4".to_vec(),
            format: OutputFormat::Pdf,
        });

        let path = delivery.write_to_dir(dir.path()).unwrap().unwrap();
        assert_eq!(path.file_name().unwrap(), "a_Jane_report.pdf");
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");
        assert!(Delivery::Empty.write_to_dir(dir.path()).unwrap().is_none());
    }
}
