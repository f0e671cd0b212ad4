//! Workbook Decoder
//!
//! calamineを使用して、ワークブック（XLSX/XLSM/XLS/XLSB/ODS）の先頭シートを
//! カンマ区切りテキストと同じ`RawRow`の並びに変換します。

use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Reader};
use std::io::Cursor;
use tracing::debug;

use super::{clean_value, is_blank_row, require_header_and_data};
use crate::error::ReportError;
use crate::types::RawRow;

/// ワークブックの先頭シートをデコードする
///
/// # 引数
///
/// * `bytes` - ワークブックファイルの内容
///
/// # 戻り値
///
/// * `Ok(Vec<RawRow>)` - 空白行を除いた全行（先頭がヘッダー行）
/// * `Err(ReportError::Workbook)` - ワークブックとして読み込めない場合
/// * `Err(ReportError::EmptyInput)` - シートがない、または非空白行が2行未満の場合
///
/// # セル値の変換
///
/// - 整数値の数値: 小数部なし（`105.0` -> `"105"`）
/// - 日付: ISO 8601（`YYYY-MM-DD`）。1904年システムのワークブックにも対応
/// - 日付として解釈できないシリアル値: 数値のまま
/// - エラー値・空セル: 空文字列
pub fn decode_workbook(bytes: &[u8]) -> Result<Vec<RawRow>, ReportError> {
    // 1. ワークブックを開く（形式は内容から自動判定）
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    // 2. 先頭シートの取得
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Err(ReportError::EmptyInput),
    };

    // 3. セルを文字列化し、空白行を除去
    let rows: Vec<RawRow> = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect::<RawRow>())
        .filter(|row| !is_blank_row(row))
        .collect();

    debug!(rows = rows.len(), "decoded first worksheet");

    require_header_and_data(rows)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_number(*f),
        Data::String(s) => clean_value(s),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::DateTime(dt) => excel_date_to_string(dt),
        Data::DateTimeIso(s) | Data::DurationIso(s) => clean_value(s),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

/// 数値の文字列化（整数値は小数部なし）
fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Excelで表現できる最後の日付（9999-12-31）のシリアル値
const MAX_DATE_SERIAL: f64 = 2_958_465.0;

/// 日付セルをISO 8601に変換する
///
/// エポック（1900年/1904年システム）の扱いはcalamineに任せます。
/// 期間書式のセルと、0未満または9999-12-31より後のシリアル値は数値として出力します。
fn excel_date_to_string(dt: &ExcelDateTime) -> String {
    let serial = dt.as_f64();
    if !dt.is_datetime() || !(0.0..=MAX_DATE_SERIAL).contains(&serial) {
        return format_number(serial);
    }
    dt.as_datetime()
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| format_number(serial))
}
