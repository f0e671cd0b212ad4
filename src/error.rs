//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// wiscreportクレート全体で使用するエラー型
///
/// スコアエクスポートの読み込み、レコード抽出、レポート生成、バッチ処理中に
/// 発生するすべてのエラーを統一的に扱うために使用されます。
///
/// # エラーの種類
///
/// - `EmptyInput`: ヘッダー行とデータ行が揃っていない入力
/// - `NoValidRecords`: ヘッダーはあるが有効なデータ行がない入力
/// - `UnsupportedFormat`: 表形式ではない入力ファイル（PDFなど）
/// - `Config`: ビルダー設定の検証に失敗したエラー
/// - `SecurityViolation`: サイズ制限や危険なアーカイブエントリ名
/// - `Io` / `Pdf` / `Zip` / `Json` / `Workbook`: 下位ライブラリ由来のエラー
///
/// スコア値の解析失敗はエラーではなく、`Option`で表現されます。
///
/// # 使用例
///
/// ```rust
/// use wiscreport::{parse, ReportError};
///
/// match parse("firstname,lastname\n") {
///     Err(ReportError::EmptyInput) => {}
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Error, Debug)]
pub enum ReportError {
    /// 非空白行が2行未満（ヘッダー行とデータ行がない）
    #[error("CSV must have at least a header row and one data row")]
    EmptyInput,

    /// ヘッダーは存在するが、使用可能なデータ行が1つもない
    #[error("No valid data rows found: every data row is blank")]
    NoValidRecords,

    /// 表形式として扱えない入力
    ///
    /// Q-Globalから出力されたPDFなどが渡された場合に発生します。
    #[error("Unsupported file type '{extension}' for '{file_name}': please upload a CSV file exported from Q-Global")]
    UnsupportedFormat {
        /// 入力ファイル名
        file_name: String,
        /// 検出された拡張子
        extension: String,
    },

    /// I/O操作中に発生したエラー
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ワークブック（XLSX/XLS/ODS）の解析エラー
    ///
    /// `#[from]`属性により、`calamine::Error`から自動的に変換されます。
    #[error("Failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    /// PDF文書の組み立て・書き出しエラー
    #[error("PDF write error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// ZIPアーカイブ（DOCXコンテナまたはバッチアーカイブ）の書き出しエラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// JSONシリアライズエラー
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// 設定の検証に失敗したエラー
    ///
    /// `ReportBuilder::build()`時に設定を検証し、無効な設定が検出された
    /// 場合に発生します。
    ///
    /// # 例
    ///
    /// ```rust
    /// use wiscreport::{ReportBuilder, ReportError};
    ///
    /// let result = ReportBuilder::new()
    ///     .with_examiner_title("   ")
    ///     .build();
    ///
    /// assert!(matches!(result, Err(ReportError::Config(_))));
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// 入力サイズ上限、レコード数上限、危険なアーカイブエントリ名などの
    /// 制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),

    /// アップロード状態の不正な遷移
    ///
    /// 状態は Pending -> Processing -> (Complete | Error) の順にのみ進みます。
    #[error("Invalid upload status transition: {from} -> {to}")]
    InvalidTransition {
        /// 遷移元の状態
        from: String,
        /// 遷移先の状態
        to: String,
    },
}

impl From<zip::result::ZipError> for ReportError {
    fn from(err: zip::result::ZipError) -> Self {
        ReportError::Zip(err.to_string())
    }
}
