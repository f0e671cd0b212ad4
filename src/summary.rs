//! Batch Summary Module
//!
//! バッチ処理の結果をMarkdownテーブルとして出力するモジュール。
//! 受検者名は含めず、ファイル名・状態・レコード数・エラー内容のみを表示します。

use std::io::Write;

use unicode_width::UnicodeWidthStr;

use crate::batch::{BatchOutcome, UploadUnit};
use crate::error::ReportError;

const HEADERS: [&str; 4] = ["File", "Status", "Records", "Detail"];

/// 区切り行の最小幅
const MIN_WIDTH: usize = 3;

fn summary_row(unit: &UploadUnit) -> [String; 4] {
    [
        unit.source_name().to_string(),
        unit.status().to_string(),
        unit.record_count().to_string(),
        unit.error_message().unwrap_or("").to_string(),
    ]
}

/// セル内の改行と`|`を表の構造を壊さない形に置き換える
fn escape_cell(text: &str) -> String {
    text.trim().replace('|', "\\|").replace(|c: char| c == '\r' || c == '\n', " ")
}

/// バッチ処理の結果をMarkdownテーブルとして出力する
///
/// 列幅は表示幅（全角文字は2）で揃えます。
///
/// # 引数
///
/// * `outcome` - バッチ処理の結果
/// * `writer` - 出力先のライター
///
/// # 戻り値
///
/// * `Ok(())` - 出力に成功した場合
/// * `Err(ReportError::Io)` - 書き込みに失敗した場合
pub fn render_summary<W: Write>(outcome: &BatchOutcome, writer: &mut W) -> Result<(), ReportError> {
    // 1. セル文字列の準備
    let mut rows: Vec<[String; 4]> = vec![HEADERS.map(str::to_string)];
    rows.extend(outcome.units.iter().map(summary_row));
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| escape_cell(cell)).collect())
        .collect();

    // 2. 列幅の計算
    let mut widths = [MIN_WIDTH; 4];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.width());
        }
    }

    // 3. 各行の出力（ヘッダーの後に区切り行）
    for (row_idx, row) in rows.iter().enumerate() {
        write!(writer, "|")?;
        for (cell, &width) in row.iter().zip(&widths) {
            let padding = width.saturating_sub(cell.width());
            write!(writer, " {}{} |", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;

        if row_idx == 0 {
            let separator: String = widths
                .iter()
                .map(|&w| format!("{}|", "-".repeat(w + 2)))
                .collect();
            writeln!(writer, "|{}", separator)?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// バッチ処理の結果をMarkdownテーブルの文字列にする
pub fn summary_to_string(outcome: &BatchOutcome) -> Result<String, ReportError> {
    let mut buffer = Vec::new();
    render_summary(outcome, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| ReportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Delivery;

    fn outcome() -> BatchOutcome {
        let mut ok = UploadUnit::new("scores.csv");
        ok.start().unwrap();
        ok.complete(Vec::new()).unwrap();
        let mut failed = UploadUnit::new("日本語.pdf");
        failed.start().unwrap();
        failed.fail("Unsupported | file").unwrap();

        BatchOutcome {
            units: vec![ok, failed],
            delivery: Delivery::Empty,
        }
    }

    #[test]
    fn test_summary_table_layout() {
        let text = summary_to_string(&outcome()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("| File "));
        assert!(lines[1].starts_with("|---"));
        assert!(lines[2].contains("| complete "));
        assert!(lines[3].contains("| error "));
        // `|`はエスケープされる
        assert!(lines[3].contains("Unsupported \\| file"));
    }

    // 全角文字を含んでも各行の表示幅が揃う
    #[test]
    fn test_summary_aligns_wide_characters() {
        let text = summary_to_string(&outcome()).unwrap();
        let widths: Vec<usize> = text.lines().map(|l| l.width()).collect();
        assert!(widths.iter().all(|&w| w == widths[0]));
    }

    #[test]
    fn test_escape_cell() {
        assert_eq!(escape_cell(" a|b\nc "), "a\\|b c");
    }
}
