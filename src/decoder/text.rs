//! Delimited Text Decoder
//!
//! カンマ区切りテキストを行・セルに分割する。
//! 引用符で囲まれたフィールド、フィールド内のカンマ、二重引用符のエスケープ、
//! BOMの混入に対応します。

use encoding_rs::WINDOWS_1252;
use tracing::{debug, warn};

use super::{clean_value, require_header_and_data};
use crate::error::ReportError;
use crate::types::RawRow;

/// カンマ区切りテキストをデコードする
///
/// # 引数
///
/// * `text` - 入力テキスト（先頭行がヘッダー）
///
/// # 戻り値
///
/// * `Ok(Vec<RawRow>)` - 空白行を除いた全行（先頭がヘッダー行）
/// * `Err(ReportError::EmptyInput)` - 非空白行が2行未満の場合
///
/// # 使用例
///
/// ```rust
/// use wiscreport::decode;
///
/// # fn main() -> Result<(), wiscreport::ReportError> {
/// let rows = decode("name,score\n\"Smith, John\",105\n")?;
/// assert_eq!(rows[1], vec!["Smith, John".to_string(), "105".to_string()]);
/// # Ok(())
/// # }
/// ```
pub fn decode(text: &str) -> Result<Vec<RawRow>, ReportError> {
    // 1. 行分割（\n と \r\n）、空白行の除去
    let rows: Vec<RawRow> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !clean_value(line).is_empty())
        .map(split_line)
        .collect();

    debug!(rows = rows.len(), "decoded delimited text");

    // 2. ヘッダー行 + データ行の検証
    require_header_and_data(rows)
}

/// バイト列をデコードする
///
/// UTF-8のBOMを除去してUTF-8として解釈します。UTF-8として不正な場合は
/// Windows-1252として解釈し直します。
pub fn decode_bytes(bytes: &[u8]) -> Result<Vec<RawRow>, ReportError> {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(body) {
        Ok(text) => decode(text),
        Err(err) => {
            warn!(
                valid_up_to = err.valid_up_to(),
                "input is not valid UTF-8, falling back to Windows-1252"
            );
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(body);
            decode(&text)
        }
    }
}

/// 1行をセルに分割する
///
/// 左から右へ走査し、引用符の内外を追跡します。
/// 引用符内で`""`が続く場合は1つの`"`として扱います。
/// 引用符外のカンマでフィールドを区切り、各フィールドは前後空白とBOMを除去します。
pub fn split_line(line: &str) -> RawRow {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                cells.push(clean_value(&current));
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    cells.push(clean_value(&current));

    cells
}
