//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use serde::Serialize;
use std::fmt;

/// レポートの出力フォーマット
///
/// 同一のレポート内容を、ページ割付の異なる2つの文書形式で出力します。
/// 出力フォーマットはバッチ単位で選択されます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum OutputFormat {
    /// Office Open XML ワードプロセッサ文書（.docx）
    ///
    /// ページ割付はワードプロセッサ側に委ね、表の行は分割禁止・
    /// ヘッダー行は各ページで繰り返し表示されます。
    Docx,

    /// PDF 1.4 文書（.pdf、A4）
    ///
    /// ページ割付をこのクレート側で行い、必要に応じて改ページを挿入します。
    Pdf,
}

impl OutputFormat {
    /// ファイル拡張子（ドットなし）
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Docx => "docx",
            OutputFormat::Pdf => "pdf",
        }
    }

    /// MIMEタイプ
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            OutputFormat::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// 日付の出力形式
///
/// 生年月日・検査日の列に適用されます。解釈できない日付文字列は
/// 形式にかかわらずそのまま出力されます。
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DateFormat {
    /// 入力の文字列をそのまま使用（デフォルト）
    AsIs,

    /// ISO 8601形式（YYYY-MM-DD）
    ///
    /// 例: `2025-11-20`
    Iso8601,

    /// カスタム形式（chrono互換フォーマット文字列）
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use wiscreport::{DateFormat, ReportBuilder};
    ///
    /// # fn main() -> Result<(), wiscreport::ReportError> {
    /// let generator = ReportBuilder::new()
    ///     .with_date_format(DateFormat::Custom("%B %-d, %Y".to_string()))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    Custom(String),
}

/// 入力ファイルの種類
///
/// ファイル名の拡張子（拡張子がない場合は先頭バイト）から判定します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InputKind {
    /// カンマ区切りテキスト
    Csv,
    /// calamineで読み込めるワークブック（XLSX/XLSM/XLS/XLSB/ODS）
    Workbook,
}

/// アップロード単位の処理状態
///
/// 状態遷移は Pending -> Processing -> (Complete | Error) の一方向のみです。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// 未処理
    Pending,
    /// 処理中
    Processing,
    /// 正常終了（1件以上のレコードを抽出）
    Complete,
    /// 異常終了（エラーメッセージを保持）
    Error,
}

impl UploadStatus {
    /// `next`への遷移が許可されているか
    pub fn can_advance_to(self, next: UploadStatus) -> bool {
        matches!(
            (self, next),
            (UploadStatus::Pending, UploadStatus::Processing)
                | (UploadStatus::Processing, UploadStatus::Complete)
                | (UploadStatus::Processing, UploadStatus::Error)
        )
    }

    /// 終端状態かどうか
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadStatus::Complete | UploadStatus::Error)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Processing => "processing",
            UploadStatus::Complete => "complete",
            UploadStatus::Error => "error",
        };
        f.write_str(label)
    }
}
