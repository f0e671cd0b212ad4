//! Decoder Module
//!
//! 入力バイト列をセル文字列の行（`RawRow`）に変換するモジュール。
//! カンマ区切りテキストとワークブック（calamine）の2系統を提供します。

mod text;
mod workbook;

pub use text::{decode, decode_bytes, split_line};
pub use workbook::decode_workbook;

use crate::error::ReportError;
use crate::types::RawRow;

/// セル値の正規化
///
/// 先頭のBOM（U+FEFF）を除去し、前後の空白を取り除きます。
///
/// # 使用例
///
/// ```rust
/// use wiscreport::clean_value;
///
/// assert_eq!(clean_value("\u{feff} 105 "), "105");
/// ```
pub fn clean_value(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

/// セルがすべて空白の行かどうか
pub(crate) fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|cell| clean_value(cell).is_empty())
}

/// ヘッダー行とデータ行が揃っているかを検証する
pub(crate) fn require_header_and_data(rows: Vec<RawRow>) -> Result<Vec<RawRow>, ReportError> {
    if rows.len() < 2 {
        return Err(ReportError::EmptyInput);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_value() {
        assert_eq!(clean_value("  abc  "), "abc");
        assert_eq!(clean_value("\u{feff}firstname"), "firstname");
        assert_eq!(clean_value("\u{feff}"), "");
        assert_eq!(clean_value(""), "");
    }

    #[test]
    fn test_is_blank_row() {
        assert!(is_blank_row(&["".to_string(), "  ".to_string()]));
        assert!(is_blank_row(&[]));
        assert!(!is_blank_row(&["".to_string(), "x".to_string()]));
    }

    #[test]
    fn test_require_header_and_data() {
        assert!(matches!(
            require_header_and_data(vec![vec!["a".to_string()]]),
            Err(ReportError::EmptyInput)
        ));
        assert!(require_header_and_data(vec![vec![], vec![]]).is_ok());
    }
}
