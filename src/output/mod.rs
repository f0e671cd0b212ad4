//! Output Format Module
//!
//! Strategy Patternによる出力フォーマットの抽象化を提供するモジュール。

mod docx;
mod metrics;
mod pdf;

use crate::api::OutputFormat;
use crate::error::ReportError;
use crate::report::ReportDocument;

pub use docx::DocxFormatter;
pub use pdf::PdfFormatter;

/// 出力フォーマッター（Strategy Pattern）
///
/// 各出力フォーマット（DOCX, PDF）をenumとして表現します。
/// どちらも同じ`ReportDocument`を入力とするため、表示される文字列は一致します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatter {
    Docx,
    Pdf,
}

impl OutputFormatter {
    /// 出力フォーマットからフォーマッターを生成
    pub fn from_format(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Docx => OutputFormatter::Docx,
            OutputFormat::Pdf => OutputFormatter::Pdf,
        }
    }

    /// レポートを指定されたフォーマットのバイト列に変換する
    ///
    /// # 引数
    ///
    /// * `doc` - 出力するレポート
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<u8>)` - 出力に成功した場合
    /// * `Err(ReportError)` - エラーが発生した場合
    pub fn render(&self, doc: &ReportDocument) -> Result<Vec<u8>, ReportError> {
        match self {
            OutputFormatter::Docx => DocxFormatter.render(doc),
            OutputFormatter::Pdf => PdfFormatter.render(doc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Block;

    #[test]
    fn test_from_format() {
        assert_eq!(OutputFormatter::from_format(OutputFormat::Docx), OutputFormatter::Docx);
        assert_eq!(OutputFormatter::from_format(OutputFormat::Pdf), OutputFormatter::Pdf);
    }

    #[test]
    fn test_render_signatures() {
        let doc = ReportDocument {
            title: "T".to_string(),
            subtitle: "S".to_string(),
            blocks: vec![Block::Notice("n".to_string())],
        };
        let docx = OutputFormatter::Docx.render(&doc).unwrap();
        let pdf = OutputFormatter::Pdf.render(&doc).unwrap();

        assert!(docx.starts_with(b"PK\x03\x04"));
        assert!(pdf.starts_with(b"%PDF-"));
    }
}
