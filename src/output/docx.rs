//! DOCX Layout
//!
//! `ReportDocument`をOffice Open XMLのワードプロセッサ文書に変換する。
//! 段落・表の組み立てとパッケージ化は`docx-rs`で行います。
//! ページ割付はワードプロセッサに委ね、表の行には分割禁止（`cantSplit`）を指定します。

use std::io::Cursor;

use docx_rs::{
    AlignmentType, Docx, LineSpacing, PageMargin, Paragraph, Run, RunFonts, Shading,
    TableCell, TableLayoutType, TableRow, WidthType,
};

use crate::error::ReportError;
use crate::report::{Align, Block, ReportDocument, Signature, Span, Table, ACCENT_COLOR, NOTE_COLOR};

/// A4（twips）
const PAGE_WIDTH: u32 = 11_906;
const PAGE_HEIGHT: u32 = 16_838;
/// 1インチ
const MARGIN: i32 = 1_440;
const CONTENT_WIDTH: usize = PAGE_WIDTH as usize - 2 * MARGIN as usize;

/// 本文の文字サイズ（半ポイント）
const BODY_SIZE: usize = 22;
const TABLE_SIZE: usize = 20;

/// 表幅100%（1/50パーセント単位）
const FULL_WIDTH_PCT: usize = 5_000;

/// DOCX形式のフォーマッター
pub struct DocxFormatter;

impl DocxFormatter {
    /// レポートをDOCXのバイト列に変換する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<u8>)` - ZIPコンテナ（`[Content_Types].xml`, `word/document.xml`,
    ///   `word/styles.xml`などの各パート）
    /// * `Err(ReportError::Zip)` - パッケージの書き出しに失敗した場合
    pub fn render(&self, doc: &ReportDocument) -> Result<Vec<u8>, ReportError> {
        // 1. 表題
        let mut docx = Docx::new()
            .page_size(PAGE_WIDTH, PAGE_HEIGHT)
            .page_margin(
                PageMargin::new()
                    .top(MARGIN)
                    .right(MARGIN)
                    .bottom(MARGIN)
                    .left(MARGIN),
            )
            .default_fonts(
                RunFonts::new()
                    .ascii("Calibri")
                    .hi_ansi("Calibri")
                    .east_asia("Calibri")
                    .cs("Calibri"),
            )
            .default_size(BODY_SIZE)
            .add_paragraph(
                paragraph(ParaProps { center: true, after: 120, ..Default::default() })
                    .add_run(run(&doc.title, RunProps { bold: true, size: Some(36), ..Default::default() })),
            )
            .add_paragraph(
                paragraph(ParaProps { center: true, after: 400, ..Default::default() })
                    .add_run(run(&doc.subtitle, RunProps { italic: true, size: Some(24), ..Default::default() })),
            );

        // 2. 本文ブロック
        for block in &doc.blocks {
            docx = add_block(docx, block);
        }

        // 3. パッケージ化
        let mut buf = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut buf)
            .map_err(|e| ReportError::Zip(e.to_string()))?;
        Ok(buf.into_inner())
    }
}

/// 段落の書式
#[derive(Debug, Default, Clone, Copy)]
struct ParaProps {
    keep_next: bool,
    before: u32,
    after: u32,
    indent: i32,
    center: bool,
}

/// 文字の書式
#[derive(Debug, Default, Clone, Copy)]
struct RunProps<'a> {
    bold: bool,
    italic: bool,
    color: Option<&'a str>,
    size: Option<usize>,
}

impl<'a> RunProps<'a> {
    fn from_span(span: &Span) -> Self {
        Self {
            bold: span.bold,
            italic: span.italic,
            ..Default::default()
        }
    }
}

/// XML 1.0で使用できない制御文字を除去する
fn strip_invalid_xml_chars(text: &str) -> String {
    text.chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || c >= ' ')
        .collect()
}

fn paragraph(props: ParaProps) -> Paragraph {
    let mut p = Paragraph::new()
        .line_spacing(LineSpacing::new().before(props.before).after(props.after))
        .keep_next(props.keep_next);
    if props.indent > 0 {
        p = p.indent(Some(props.indent), None, None, None);
    }
    if props.center {
        p = p.align(AlignmentType::Center);
    }
    p
}

fn run(text: &str, props: RunProps<'_>) -> Run {
    let mut r = Run::new()
        .add_text(strip_invalid_xml_chars(text))
        .size(props.size.unwrap_or(BODY_SIZE));
    if props.bold {
        r = r.bold();
    }
    if props.italic {
        r = r.italic();
    }
    if let Some(color) = props.color {
        r = r.color(color);
    }
    r
}

fn add_block(docx: Docx, block: &Block) -> Docx {
    match block {
        Block::SectionHeading(text) => docx.add_paragraph(
            paragraph(ParaProps { keep_next: true, before: 400, after: 200, ..Default::default() })
                .add_run(run(text, RunProps { bold: true, color: Some(ACCENT_COLOR), size: Some(26), ..Default::default() })),
        ),
        Block::SubHeading(text) => docx.add_paragraph(
            paragraph(ParaProps { keep_next: true, before: 200, after: 150, ..Default::default() })
                .add_run(run(text, RunProps { bold: true, size: Some(24), ..Default::default() })),
        ),
        Block::FieldGrid(fields) => field_grid(docx, fields),
        Block::Paragraph(spans) => docx.add_paragraph(spans.iter().fold(
            paragraph(ParaProps { after: 200, ..Default::default() }),
            |p, span| p.add_run(run(&span.text, RunProps::from_span(span))),
        )),
        Block::Table(table) => data_table(docx, table),
        Block::Notice(text) => docx.add_paragraph(
            paragraph(ParaProps { after: 200, ..Default::default() })
                .add_run(run(text, RunProps { italic: true, ..Default::default() })),
        ),
        Block::Note(text) => docx.add_paragraph(
            paragraph(ParaProps { before: 100, after: 200, ..Default::default() })
                .add_run(run(text, RunProps { italic: true, color: Some(NOTE_COLOR), size: Some(18), ..Default::default() })),
        ),
        Block::ListItem(text) => docx.add_paragraph(
            paragraph(ParaProps { indent: 360, after: 100, ..Default::default() })
                .add_run(run(text, RunProps::default())),
        ),
        Block::Signature(signature) => signature_block(docx, signature),
    }
}

/// ラベルと値の表（罫線なし、2組ずつ横に並べる）
fn field_grid(docx: Docx, fields: &[(String, String)]) -> Docx {
    let label_width = CONTENT_WIDTH / 5;
    let value_width = CONTENT_WIDTH / 2 - label_width;
    let widths = [label_width, value_width, label_width, value_width];

    let rows: Vec<TableRow> = fields
        .chunks(2)
        .map(|pair| {
            let mut cells = Vec::with_capacity(4);
            for col in 0..2 {
                let (label, value) = match pair.get(col) {
                    Some((label, value)) => (format!("{}:", label), value.as_str()),
                    None => (String::new(), ""),
                };
                let bold = RunProps { bold: true, ..Default::default() };
                cells.push(table_cell(widths[col * 2], None, Align::Left, run(&label, bold)));
                cells.push(table_cell(widths[col * 2 + 1], None, Align::Left, run(value, RunProps::default())));
            }
            TableRow::new(cells).cant_split()
        })
        .collect();

    let table = docx_rs::Table::without_borders(rows)
        .set_grid(widths.to_vec())
        .layout(TableLayoutType::Fixed)
        .width(FULL_WIDTH_PCT, WidthType::Pct);

    // 表の直後に空段落（表の連結を防ぐ）
    docx.add_table(table)
        .add_paragraph(paragraph(ParaProps { after: 120, ..Default::default() }))
}

fn data_table(docx: Docx, table: &Table) -> Docx {
    let widths: Vec<usize> = table
        .columns
        .iter()
        .map(|c| (c.weight * CONTENT_WIDTH as f32).round() as usize)
        .collect();

    // 1. ヘッダー行
    let header_props = RunProps { bold: true, color: Some("FFFFFF"), size: Some(TABLE_SIZE), ..Default::default() };
    let header = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(column, &width)| {
            table_cell(width, Some(ACCENT_COLOR), column.align, run(column.header, header_props))
        })
        .collect();
    let mut rows = vec![TableRow::new(header).cant_split()];

    // 2. データ行（交互の背景色）
    let cell_props = RunProps { size: Some(TABLE_SIZE), ..Default::default() };
    for (idx, row) in table.rows.iter().enumerate() {
        let cells = row
            .iter()
            .zip(&table.columns)
            .zip(&widths)
            .map(|((value, column), &width)| {
                table_cell(width, Some(Table::row_fill(idx)), column.align, run(value, cell_props))
            })
            .collect();
        rows.push(TableRow::new(cells).cant_split());
    }

    let table = docx_rs::Table::new(rows)
        .set_grid(widths)
        .layout(TableLayoutType::Fixed)
        .width(FULL_WIDTH_PCT, WidthType::Pct);

    docx.add_table(table)
        .add_paragraph(paragraph(ParaProps { after: 120, ..Default::default() }))
}

fn table_cell(width: usize, fill: Option<&str>, align: Align, content: Run) -> TableCell {
    let props = ParaProps { before: 40, after: 40, center: align == Align::Center, ..Default::default() };
    let cell = TableCell::new()
        .width(width, WidthType::Dxa)
        .add_paragraph(paragraph(props).add_run(content));
    match fill {
        Some(fill) => cell.shading(Shading::new().fill(fill)),
        None => cell,
    }
}

fn signature_block(docx: Docx, signature: &Signature) -> Docx {
    let keep = ParaProps { keep_next: true, ..Default::default() };
    let date = signature.date_line();
    docx.add_paragraph(
        paragraph(ParaProps { before: 600, ..keep }).add_run(run(Signature::RULE, RunProps::default())),
    )
    .add_paragraph(
        paragraph(keep).add_run(run(&signature.examiner, RunProps { bold: true, ..Default::default() })),
    )
    .add_paragraph(paragraph(keep).add_run(run(&signature.title, RunProps::default())))
    .add_paragraph(paragraph(ParaProps::default()).add_run(run(&date, RunProps::default())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Column, NO_COMPOSITES_NOTICE};
    use docx_rs::{read_docx, DocumentChild, ParagraphChild, RunChild, TableCellContent, TableChild, TableRowChild};
    use std::io::Read;
    use zip::ZipArchive;

    fn sample_document() -> ReportDocument {
        ReportDocument {
            title: "TITLE".to_string(),
            subtitle: "Sub & title".to_string(),
            blocks: vec![
                Block::SectionHeading("RESULTS".to_string()),
                Block::Paragraph(vec![Span::bold("Lead: "), Span::plain("body <text>")]),
                Block::Table(Table {
                    columns: vec![
                        Column { header: "Name", weight: 0.5, align: Align::Left },
                        Column { header: "Score", weight: 0.5, align: Align::Center },
                    ],
                    rows: vec![
                        vec!["A".to_string(), "1".to_string()],
                        vec!["B".to_string(), "2".to_string()],
                    ],
                }),
                Block::Notice(NO_COMPOSITES_NOTICE.to_string()),
            ],
        }
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = String::new();
        zip.by_name(name).unwrap().read_to_string(&mut content).unwrap();
        content
    }

    fn paragraph_text(p: &Paragraph) -> String {
        let mut text = String::new();
        for child in &p.children {
            if let ParagraphChild::Run(run) = child {
                for run_child in &run.children {
                    if let RunChild::Text(t) = run_child {
                        text.push_str(&t.text);
                    }
                }
            }
        }
        text
    }

    /// 本文の段落と表のセルを文書順に取り出す
    fn body_text(bytes: &[u8]) -> Vec<String> {
        let docx = read_docx(bytes).unwrap();
        let mut texts = Vec::new();
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(p) => texts.push(paragraph_text(p)),
                DocumentChild::Table(table) => {
                    for TableChild::TableRow(row) in &table.rows {
                        for TableRowChild::TableCell(cell) in &row.cells {
                            for content in &cell.children {
                                if let TableCellContent::Paragraph(p) = content {
                                    texts.push(paragraph_text(p));
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        texts
    }

    #[test]
    fn test_docx_package_parts() {
        let bytes = DocxFormatter.render(&sample_document()).unwrap();
        let zip = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = zip.file_names().collect();

        for part in ["[Content_Types].xml", "_rels/.rels", "word/document.xml", "word/styles.xml"] {
            assert!(names.contains(&part), "missing part {}", part);
        }
    }

    // 特殊文字を含むテキストもそのまま読み戻せる
    #[test]
    fn test_docx_text_round_trips() {
        let bytes = DocxFormatter.render(&sample_document()).unwrap();
        let texts = body_text(&bytes);

        assert_eq!(texts[0], "TITLE");
        assert_eq!(texts[1], "Sub & title");
        assert!(texts.iter().any(|t| t == "Lead: body <text>"));
        assert!(texts.iter().any(|t| t == NO_COMPOSITES_NOTICE));
        // ヘッダー行、データ行の順
        let cells: Vec<&str> = texts
            .iter()
            .map(String::as_str)
            .filter(|t| ["Name", "Score", "A", "1", "B", "2"].contains(t))
            .collect();
        assert_eq!(cells, vec!["Name", "Score", "A", "1", "B", "2"]);

        let xml = read_part(&bytes, "word/document.xml");
        assert!(xml.contains("body &lt;text&gt;"));
    }

    // 表の行は分割禁止、ヘッダー行はアクセント色、データ行は交互の背景色
    #[test]
    fn test_docx_table_row_properties() {
        let bytes = DocxFormatter.render(&sample_document()).unwrap();
        let xml = read_part(&bytes, "word/document.xml");

        assert_eq!(xml.matches("<w:cantSplit").count(), 3);
        assert!(xml.contains(r#"w:fill="2596BE""#));
        assert!(xml.contains(r#"w:fill="FFFFFF""#));
        assert!(xml.contains(r#"w:fill="F8F9FA""#));
    }

    #[test]
    fn test_docx_defaults_and_page_setup() {
        let bytes = DocxFormatter.render(&sample_document()).unwrap();
        let styles = read_part(&bytes, "word/styles.xml");
        let xml = read_part(&bytes, "word/document.xml");

        assert!(styles.contains(r#"w:ascii="Calibri""#));
        assert!(styles.contains(r#"w:val="22""#));
        assert!(xml.contains(r#"w:left="1440""#));
        assert!(xml.contains(r#"w:w="11906""#));
        assert!(xml.contains(r#"w:h="16838""#));
    }

    #[test]
    fn test_strip_invalid_xml_chars() {
        assert_eq!(strip_invalid_xml_chars("a\u{0}b\u{1b}c\td"), "abc\td");
    }
}
