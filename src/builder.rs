//! Builder Module
//!
//! Fluent Builder APIを提供し、`ReportGenerator`インスタンスを段階的に構築する。

use chrono::NaiveDate;
use tracing::info;

use crate::api::{DateFormat, InputKind, OutputFormat};
use crate::batch::{self, BatchOutcome, SourceFile, UploadUnit};
use crate::catalog::Instrument;
use crate::decoder::{decode, decode_bytes, decode_workbook};
use crate::error::ReportError;
use crate::extract::{Extractor, ScanRules};
use crate::formatter::render_date;
use crate::output::OutputFormatter;
use crate::report::{ReportDocument, ReportSettings};
use crate::security::SecurityConfig;
use crate::types::{AssessmentRecord, HeaderIndex, RawRow};

/// レポート生成の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ReportConfig {
    /// 検査の種類
    pub instrument: Instrument,

    /// 出力フォーマット
    pub output_format: OutputFormat,

    /// 日付形式
    pub date_format: DateFormat,

    /// 年齢列がない場合に生年月日と検査日から算出するか
    pub derive_age: bool,

    /// カタログ外スコア列の検出規則
    pub scan_rules: ScanRules,

    /// 署名欄の肩書き
    pub examiner_title: String,

    /// 入力の上限
    pub security: SecurityConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            instrument: Instrument::default(),
            output_format: OutputFormat::Docx,
            date_format: DateFormat::AsIs,
            derive_age: true,
            scan_rules: ScanRules::default(),
            examiner_title: "School Psychologist".to_string(),
            security: SecurityConfig::default(),
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `ReportGenerator`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust
/// use wiscreport::{OutputFormat, ReportBuilder};
///
/// # fn main() -> Result<(), wiscreport::ReportError> {
/// let generator = ReportBuilder::new()
///     .with_output_format(OutputFormat::Pdf)
///     .with_examiner_title("Licensed Psychologist")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ReportBuilder {
    /// 内部設定（構築中）
    config: ReportConfig,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 出力フォーマット: DOCX
    /// - 日付形式: 入力のまま
    /// - 年齢の算出: 有効
    /// - 動的スキャンの除外: `_ssse`, `_ssre`
    /// - 署名欄の肩書き: School Psychologist
    /// - 入力サイズ上限: 50MB、データ行数上限: 10000
    pub fn new() -> Self {
        Self {
            config: ReportConfig::default(),
        }
    }

    /// 出力フォーマットを指定する
    ///
    /// # 引数
    ///
    /// * `format: OutputFormat`: 出力フォーマット（DOCX, PDF）
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// 生年月日・検査日の出力形式を指定する
    ///
    /// # 引数
    ///
    /// * `format: DateFormat`: 日付形式
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use wiscreport::{DateFormat, ReportBuilder};
    ///
    /// // ISO 8601形式
    /// let builder = ReportBuilder::new()
    ///     .with_date_format(DateFormat::Iso8601);
    ///
    /// // カスタム形式
    /// let builder = ReportBuilder::new()
    ///     .with_date_format(DateFormat::Custom("%m/%d/%Y".to_string()));
    /// ```
    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.config.date_format = format;
        self
    }

    /// 年齢列に値がない場合、生年月日と検査日から生活年齢を算出するか
    ///
    /// # 引数
    ///
    /// * `derive: bool`:
    ///   * `true`: 「9 years, 3 months」の形式で算出する（デフォルト）
    ///   * `false`: 代替表記`[Age]`を使用する
    pub fn derive_age(mut self, derive: bool) -> Self {
        self.config.derive_age = derive;
        self
    }

    /// 動的スキャンで除外するヘッダーの部分文字列を指定する
    ///
    /// 既定値（`_ssse`, `_ssre`）を置き換えます。
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use wiscreport::ReportBuilder;
    ///
    /// let builder = ReportBuilder::new()
    ///     .with_scan_denylist(vec!["_ssse".to_string(), "_ssre".to_string(), "_ssci".to_string()]);
    /// ```
    pub fn with_scan_denylist(mut self, denylist: Vec<String>) -> Self {
        self.config.scan_rules.denylist = denylist;
        self
    }

    /// 署名欄の肩書きを指定する
    pub fn with_examiner_title(mut self, title: impl Into<String>) -> Self {
        self.config.examiner_title = title.into();
        self
    }

    /// 入力ファイルの最大サイズ（バイト）を指定する
    pub fn with_max_input_size(mut self, bytes: u64) -> Self {
        self.config.security.max_input_file_size = bytes;
        self
    }

    /// 1ファイルあたりの最大データ行数を指定する
    pub fn with_max_records(mut self, records: usize) -> Self {
        self.config.security.max_records = records;
        self
    }

    /// 設定を検証し、`ReportGenerator`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(ReportGenerator)`: 設定が有効な場合
    /// * `Err(ReportError::Config)`: 設定が無効な場合
    ///
    /// # 発生し得るエラー
    ///
    /// * `ReportError::Config(String)`: 設定の検証に失敗した場合
    ///   * カスタム日付形式が空、または不正な書式文字列
    ///   * 除外リストに空白の項目がある
    ///   * 署名欄の肩書きが空白
    ///   * 上限値が0
    pub fn build(self) -> Result<ReportGenerator, ReportError> {
        // 1. カスタム日付形式の検証
        if let DateFormat::Custom(ref format_str) = self.config.date_format {
            // テスト用の日付でフォーマット試行
            let test_date = NaiveDate::from_ymd_opt(2025, 1, 1)
                .ok_or_else(|| ReportError::Config("Failed to create test date".to_string()))?;
            let formatted = render_date(test_date, format_str).unwrap_or_default();
            if format_str.trim().is_empty() || formatted.trim().is_empty() {
                return Err(ReportError::Config(format!(
                    "Invalid date format string: '{}'",
                    format_str
                )));
            }
        }

        // 2. 除外リストの検証
        if self
            .config
            .scan_rules
            .denylist
            .iter()
            .any(|fragment| fragment.trim().is_empty())
        {
            return Err(ReportError::Config(
                "Scan denylist entries must not be blank".to_string(),
            ));
        }

        // 3. 肩書きの検証
        if self.config.examiner_title.trim().is_empty() {
            return Err(ReportError::Config(
                "Examiner title must not be blank".to_string(),
            ));
        }

        // 4. 上限値の検証
        if self.config.security.max_input_file_size == 0 || self.config.security.max_records == 0 {
            return Err(ReportError::Config(
                "Input limits must be greater than zero".to_string(),
            ));
        }

        // 5. ReportGeneratorインスタンス生成
        Ok(ReportGenerator::new(self.config))
    }
}

/// レポート生成のファサード
///
/// 入力の解析、レポートの出力、バッチ処理のメインエントリーポイントです。
/// `ReportBuilder`を使用して構築された設定に基づいて処理を実行します。
/// 生成器は状態を持たず、呼び出しごとに独立して動作します。
///
/// # 使用例
///
/// ```rust
/// use wiscreport::{OutputFormat, ReportBuilder};
///
/// # fn main() -> Result<(), wiscreport::ReportError> {
/// let generator = ReportBuilder::new().build()?;
/// let records = generator.parse("firstname,lastname,wisc5_fsiq_ss\nJohn,Smith,105\n")?;
/// let pdf = generator.render_as(&records[0], OutputFormat::Pdf)?;
/// assert!(pdf.starts_with(b"%PDF-1.4"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    /// 生成設定
    config: ReportConfig,

    /// レコード抽出器
    extractor: Extractor,

    /// レポート組み立て設定
    settings: ReportSettings,
}

impl ReportGenerator {
    pub(crate) fn new(config: ReportConfig) -> Self {
        Self {
            extractor: Extractor::new(
                config.instrument,
                config.scan_rules.clone(),
                config.date_format.clone(),
                config.derive_age,
            ),
            settings: ReportSettings {
                instrument: config.instrument,
                examiner_title: config.examiner_title.clone(),
            },
            config,
        }
    }

    /// バッチで使用する出力フォーマット
    pub fn output_format(&self) -> OutputFormat {
        self.config.output_format
    }

    /// 区切りテキストを解析してレコードを抽出する
    ///
    /// # 引数
    ///
    /// * `text` - ヘッダー行を先頭に持つカンマ区切りテキスト
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<AssessmentRecord>)` - 1件以上のレコード（入力順）
    /// * `Err(ReportError::EmptyInput)` - 非空白行が2行未満の場合
    /// * `Err(ReportError::NoValidRecords)` - データ行がすべて空白の場合
    /// * `Err(ReportError::SecurityViolation)` - 上限を超えた場合
    pub fn parse(&self, text: &str) -> Result<Vec<AssessmentRecord>, ReportError> {
        self.config.security.check_input_size("<text>", text.len())?;
        let rows = decode(text)?;
        self.extract_rows(&rows)
    }

    /// アップロードされたファイルを解析してレコードを抽出する
    ///
    /// ファイルの種類は拡張子（拡張子がない場合は先頭バイト）で判定します。
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<AssessmentRecord>)` - 1件以上のレコード（入力順）
    /// * `Err(ReportError::UnsupportedFormat)` - 表形式ではないファイルの場合
    /// * `Err(ReportError)` - その他`parse`と同じエラー
    pub fn parse_source(&self, file: &SourceFile) -> Result<Vec<AssessmentRecord>, ReportError> {
        // 1. 入力サイズの検証
        self.config
            .security
            .check_input_size(&file.name, file.bytes.len())?;

        // 2. 種類の判定とデコード
        let rows = match batch::detect_input_kind(&file.name, &file.bytes)? {
            InputKind::Csv => decode_bytes(&file.bytes)?,
            InputKind::Workbook => decode_workbook(&file.bytes)?,
        };

        // 3. レコードの抽出
        self.extract_rows(&rows)
    }

    fn extract_rows(&self, rows: &[RawRow]) -> Result<Vec<AssessmentRecord>, ReportError> {
        let (header_row, data) = rows.split_first().ok_or(ReportError::EmptyInput)?;
        self.config.security.check_record_count(data.len())?;

        let header = HeaderIndex::from_row(header_row);
        let records = self.extractor.extract(data, &header);
        if records.is_empty() {
            return Err(ReportError::NoValidRecords);
        }
        Ok(records)
    }

    /// レコードから出力フォーマット非依存のレポートを組み立てる
    pub fn document(&self, record: &AssessmentRecord) -> ReportDocument {
        ReportDocument::build(record, &self.settings)
    }

    /// 設定された出力フォーマットでレポートを出力する
    pub fn render(&self, record: &AssessmentRecord) -> Result<Vec<u8>, ReportError> {
        self.render_as(record, self.config.output_format)
    }

    /// 指定した出力フォーマットでレポートを出力する
    ///
    /// # 引数
    ///
    /// * `record` - 出力するレコード
    /// * `format` - 出力フォーマット
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<u8>)` - DOCXまたはPDFのバイト列
    /// * `Err(ReportError)` - 書き出しに失敗した場合
    pub fn render_as(
        &self,
        record: &AssessmentRecord,
        format: OutputFormat,
    ) -> Result<Vec<u8>, ReportError> {
        OutputFormatter::from_format(format).render(&self.document(record))
    }

    /// 複数ファイルをバッチ処理する
    ///
    /// `run_batch_with_progress`を進捗通知なしで呼び出します。
    pub fn run_batch(&self, files: &[SourceFile]) -> Result<BatchOutcome, ReportError> {
        self.run_batch_with_progress(files, |_| {})
    }

    /// 複数ファイルを順にバッチ処理し、処理単位ごとに進捗を通知する
    ///
    /// # 引数
    ///
    /// * `files` - 入力ファイル（この順に処理）
    /// * `progress` - 各処理単位が終端状態になった直後に呼ばれる
    ///
    /// # 戻り値
    ///
    /// * `Ok(BatchOutcome)` - 処理単位と引き渡し方法。個々のファイルの失敗は処理単位に記録されます
    /// * `Err(ReportError)` - レポートの出力またはアーカイブの組み立てに失敗した場合
    ///
    /// # 処理フロー
    ///
    /// 1. 各ファイルを Pending -> Processing -> Complete/Error に進める
    /// 2. 成果物名を割り当てる（重複には`_2`, `_3`, ...）
    /// 3. 成果物が1件なら単一ファイル、2件以上ならZIPアーカイブ
    pub fn run_batch_with_progress<F>(
        &self,
        files: &[SourceFile],
        mut progress: F,
    ) -> Result<BatchOutcome, ReportError>
    where
        F: FnMut(&UploadUnit),
    {
        // 1. ファイルごとの解析（順次）
        let mut units = Vec::with_capacity(files.len());
        for file in files {
            let unit = batch::resolve_unit(file, |f| self.parse_source(f))?;
            progress(&unit);
            units.push(unit);
        }

        // 2. 成果物の出力と引き渡し
        let jobs = batch::plan_artifacts(&units);
        let artifacts = jobs.len();
        let delivery = batch::assemble_delivery(
            &jobs,
            self.config.output_format,
            self.config.instrument.archive_name(),
            |record| self.render(record),
        )?;

        let outcome = BatchOutcome { units, delivery };
        info!(
            files = files.len(),
            failed = outcome.failed(),
            artifacts,
            format = %self.config.output_format,
            "batch completed"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::UploadStatus;
    use crate::batch::Delivery;

    const SAMPLE: &str = "firstname,lastname,wisc5_fsiq_ss,wisc5_vci_ss\nJohn,Smith,105,110\n";

    #[test]
    fn test_report_builder_new() {
        let builder = ReportBuilder::new();
        assert_eq!(builder.config.output_format, OutputFormat::Docx);
        assert_eq!(builder.config.date_format, DateFormat::AsIs);
        assert!(builder.config.derive_age);
        assert_eq!(builder.config.scan_rules, ScanRules::default());
        assert_eq!(builder.config.examiner_title, "School Psychologist");
        assert_eq!(builder.config.security, SecurityConfig::default());
    }

    #[test]
    fn test_builder_method_chaining() {
        let builder = ReportBuilder::new()
            .with_output_format(OutputFormat::Pdf)
            .with_date_format(DateFormat::Iso8601)
            .derive_age(false)
            .with_scan_denylist(vec!["_ssci".to_string()])
            .with_examiner_title("Licensed Psychologist")
            .with_max_input_size(1024)
            .with_max_records(5);

        assert_eq!(builder.config.output_format, OutputFormat::Pdf);
        assert_eq!(builder.config.date_format, DateFormat::Iso8601);
        assert!(!builder.config.derive_age);
        assert_eq!(builder.config.scan_rules.denylist, vec!["_ssci".to_string()]);
        assert_eq!(builder.config.examiner_title, "Licensed Psychologist");
        assert_eq!(builder.config.security.max_input_file_size, 1024);
        assert_eq!(builder.config.security.max_records, 5);
    }

    #[test]
    fn test_build_success() {
        assert!(ReportBuilder::new().build().is_ok());
        assert!(ReportBuilder::new()
            .with_date_format(DateFormat::Custom("%B %-d, %Y".to_string()))
            .build()
            .is_ok());
    }

    #[test]
    fn test_build_with_invalid_custom_date_format() {
        for pattern in ["", "   ", "%Q"] {
            let result = ReportBuilder::new()
                .with_date_format(DateFormat::Custom(pattern.to_string()))
                .build();
            match result {
                Err(ReportError::Config(msg)) => assert!(msg.contains("Invalid date format")),
                other => panic!("Expected Config error for {:?}, got {:?}", pattern, other),
            }
        }
    }

    #[test]
    fn test_build_rejects_blank_settings() {
        assert!(matches!(
            ReportBuilder::new().with_scan_denylist(vec![" ".to_string()]).build(),
            Err(ReportError::Config(_))
        ));
        assert!(matches!(
            ReportBuilder::new().with_examiner_title("").build(),
            Err(ReportError::Config(_))
        ));
        assert!(matches!(
            ReportBuilder::new().with_max_records(0).build(),
            Err(ReportError::Config(_))
        ));
        assert!(matches!(
            ReportBuilder::new().with_max_input_size(0).build(),
            Err(ReportError::Config(_))
        ));
    }

    #[test]
    fn test_parse_sample() {
        let generator = ReportBuilder::new().build().unwrap();
        let records = generator.parse(SAMPLE).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].student_name(), "John Smith");
        let vci = records[0].composite("VCI").unwrap();
        assert_eq!(vci.percentile_rank(), 75);
        assert_eq!(records[0].placeholders().get("{{FSIQ_SS}}"), Some("105"));
    }

    // ヘッダーのみは EmptyInput、空白行のみは NoValidRecords
    #[test]
    fn test_parse_error_kinds() {
        let generator = ReportBuilder::new().build().unwrap();
        assert!(matches!(
            generator.parse("firstname,lastname\n"),
            Err(ReportError::EmptyInput)
        ));
        assert!(matches!(
            generator.parse("firstname,lastname\n , \n"),
            Err(ReportError::NoValidRecords)
        ));
    }

    #[test]
    fn test_parse_respects_limits() {
        let generator = ReportBuilder::new().with_max_records(1).build().unwrap();
        assert!(matches!(
            generator.parse("firstname\nA\nB\n"),
            Err(ReportError::SecurityViolation(_))
        ));

        let generator = ReportBuilder::new().with_max_input_size(8).build().unwrap();
        assert!(matches!(
            generator.parse(SAMPLE),
            Err(ReportError::SecurityViolation(_))
        ));
    }

    #[test]
    fn test_parse_source_rejects_unsupported() {
        let generator = ReportBuilder::new().build().unwrap();
        let file = SourceFile::new("scores.pdf", "%PDF-1.4");
        assert!(matches!(
            generator.parse_source(&file),
            Err(ReportError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_examiner_title_reaches_document() {
        let generator = ReportBuilder::new()
            .with_examiner_title("Licensed Psychologist")
            .build()
            .unwrap();
        let records = generator.parse(SAMPLE).unwrap();
        let fragments = generator.document(&records[0]).text_fragments();
        assert!(fragments.iter().any(|f| f == "Licensed Psychologist"));
    }

    #[test]
    fn test_render_both_formats() {
        let generator = ReportBuilder::new().build().unwrap();
        let records = generator.parse(SAMPLE).unwrap();

        let docx = generator.render(&records[0]).unwrap();
        let pdf = generator.render_as(&records[0], OutputFormat::Pdf).unwrap();
        assert!(docx.starts_with(b"PK\x03\x04"));
        assert!(pdf.starts_with(b"%PDF-1.4"));
    }

    // 2行のファイルと空ファイル: 成果物2件、エラー1件、アーカイブで引き渡し
    #[test]
    fn test_run_batch_with_progress() {
        let generator = ReportBuilder::new().build().unwrap();
        let files = vec![
            SourceFile::new(
                "class.csv",
                "firstname,lastname,wisc5_fsiq_ss\nJohn,Smith,105\nJane,Doe,98\n",
            ),
            SourceFile::new("empty.csv", ""),
        ];

        let mut seen = Vec::new();
        let outcome = generator
            .run_batch_with_progress(&files, |unit| {
                seen.push((unit.source_name().to_string(), unit.status()))
            })
            .unwrap();

        assert_eq!(
            seen,
            vec![
                ("class.csv".to_string(), UploadStatus::Complete),
                ("empty.csv".to_string(), UploadStatus::Error),
            ]
        );
        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.total_records(), 2);
        match outcome.delivery {
            Delivery::Archive { name, entries, .. } => {
                assert_eq!(name, "WISC-V_Reports.zip");
                assert_eq!(
                    entries,
                    vec!["class_John_Smith_report.docx", "class_Jane_Doe_report.docx"]
                );
            }
            other => panic!("expected archive, got {:?}", other),
        }
    }

    #[test]
    fn test_run_batch_single_and_empty() {
        let generator = ReportBuilder::new()
            .with_output_format(OutputFormat::Pdf)
            .build()
            .unwrap();

        let outcome = generator
            .run_batch(&[SourceFile::new("one.csv", SAMPLE)])
            .unwrap();
        match &outcome.delivery {
            Delivery::Single(artifact) => {
                assert_eq!(artifact.file_name(), "one_John_Smith_report.pdf");
                assert!(artifact.rendered_bytes.starts_with(b"%PDF-1.4"));
            }
            other => panic!("expected single, got {:?}", other),
        }

        let outcome = generator
            .run_batch(&[SourceFile::new("notes.pdf", "%PDF")])
            .unwrap();
        assert_eq!(outcome.delivery, Delivery::Empty);
        assert_eq!(outcome.failed(), 1);
    }
}
