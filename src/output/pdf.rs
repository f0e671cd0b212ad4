//! PDF Layout
//!
//! `ReportDocument`をPDF 1.4に変換する。A4縦・余白20mm、標準14フォント（Helvetica系）を使用し、
//! ページ割付は自前で行います。表の行はページをまたがず、改ページした場合はヘッダー行を再描画します。
//!
//! 座標はすべてページ左上を原点とするmmで扱い、出力時にポイントへ変換します。
//! 描画命令はページごとに`lopdf::content::Operation`として積み、
//! 文書の組み立てと書き出しは`lopdf`に任せます。

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

use super::metrics::{encode_win_ansi, Font, MM_PER_PT};
use crate::error::ReportError;
use crate::report::{
    hex_to_rgb, Align, Block, Column, ReportDocument, Signature, Table, ACCENT_COLOR, GRID_COLOR,
    NOTE_COLOR,
};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
/// 描画可能な下端
const BOTTOM_LIMIT: f32 = 280.0;

const BODY_SIZE: f32 = 10.0;
const TABLE_SIZE: f32 = 9.0;
const NOTE_SIZE: f32 = 8.0;
const TABLE_LINE: f32 = 4.5;
const CELL_PADDING: f32 = 2.0;

const BLACK: Rgb = (0, 0, 0);
const WHITE: Rgb = (255, 255, 255);

type Rgb = (u8, u8, u8);

/// PDF形式のフォーマッター
pub struct PdfFormatter;

impl PdfFormatter {
    /// レポートをPDFのバイト列に変換する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<u8>)` - `%PDF-1.4`で始まるPDF文書
    /// * `Err(ReportError::Pdf)` - 内容ストリームの符号化に失敗した場合
    /// * `Err(ReportError::Io)` - 書き出しに失敗した場合
    pub fn render(&self, doc: &ReportDocument) -> Result<Vec<u8>, ReportError> {
        let mut layout = PageLayout::new();
        layout.title(&doc.title, &doc.subtitle);
        for block in &doc.blocks {
            layout.block(block);
        }
        let pages = layout.finish();
        assemble(pages, &doc.title, &doc.subtitle)
    }
}

/// 1行の中の同一フォントの連続部分
#[derive(Debug, Clone, PartialEq)]
struct Run {
    text: String,
    font: Font,
    /// 行頭からの位置（mm）
    offset: f32,
}

/// 折り返し済みの1行
#[derive(Debug, Clone, Default, PartialEq)]
struct Line {
    runs: Vec<Run>,
    width: f32,
}

impl Line {
    fn space_before(&self, font: Font, size: f32) -> f32 {
        if self.runs.is_empty() {
            0.0
        } else {
            font.text_width(" ", size)
        }
    }

    fn push(&mut self, word: &str, font: Font, size: f32) {
        let space = self.space_before(font, size);
        match self.runs.last_mut() {
            Some(run) if run.font == font => {
                run.text.push(' ');
                run.text.push_str(word);
            }
            _ => self.runs.push(Run {
                text: word.to_string(),
                font,
                offset: self.width + space,
            }),
        }
        self.width += space + font.text_width(word, size);
    }
}

/// 装飾付きテキストを単語単位で折り返す
///
/// 1語だけで幅を超える場合は文字単位で分割します。
/// 空のテキストは空の1行になります。
fn wrap(spans: &[(&str, Font)], size: f32, max_width: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line::default();

    for &(text, font) in spans {
        for word in text.split_whitespace() {
            for piece in break_word(word, font, size, max_width) {
                let advance = line.space_before(font, size) + font.text_width(&piece, size);
                if !line.runs.is_empty() && line.width + advance > max_width {
                    lines.push(std::mem::take(&mut line));
                }
                line.push(&piece, font, size);
            }
        }
    }

    if !line.runs.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

fn break_word(word: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    if font.text_width(word, size) <= max_width {
        return vec![word.to_string()];
    }

    let mut pieces = Vec::new();
    let mut piece = String::new();
    for c in word.chars() {
        piece.push(c);
        if piece.chars().count() > 1 && font.text_width(&piece, size) > max_width {
            piece.pop();
            pieces.push(std::mem::take(&mut piece));
            piece.push(c);
        }
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

/// 文字サイズに対する行送り（mm）
fn line_height(size: f32) -> f32 {
    size * 0.6
}

fn row_height(cells: &[Vec<Line>]) -> f32 {
    let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
    lines as f32 * TABLE_LINE + 2.0 * CELL_PADDING
}

/// mmからポイントへ変換する
fn pt(mm: f32) -> Object {
    Object::Real((mm / MM_PER_PT * 100.0).round() / 100.0)
}

fn color_operands((r, g, b): Rgb) -> Vec<Object> {
    [r, g, b]
        .iter()
        .map(|&c| Object::Real(f32::from(c) / 255.0))
        .collect()
}

/// ページ単位の描画とページ割付
struct PageLayout {
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    /// 次に描画する位置（ページ上端からのmm）
    y: f32,
}

impl PageLayout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            ops: Vec::new(),
            y: MARGIN,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.ops));
        self.y = MARGIN;
    }

    /// 残りが`space`に満たなければ改ページする
    ///
    /// 改ページした場合は`true`を返します。ページ先頭では改ページしません。
    fn ensure_space(&mut self, space: f32) -> bool {
        if self.y + space > BOTTOM_LIMIT && self.y > MARGIN {
            self.new_page();
            true
        } else {
            false
        }
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.pages.push(self.ops);
        self.pages
    }

    fn text_at(&mut self, x: f32, baseline: f32, font: Font, size: f32, color: Rgb, text: &str) {
        if text.is_empty() {
            return;
        }
        self.ops.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.resource_name().into(), Object::Real(size)]),
            Operation::new("rg", color_operands(color)),
            Operation::new("Td", vec![pt(x), pt(PAGE_HEIGHT - baseline)]),
            Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn draw_line(&mut self, line: &Line, x: f32, baseline: f32, size: f32, color: Rgb) {
        for run in &line.runs {
            self.text_at(x + run.offset, baseline, run.font, size, color, &run.text);
        }
    }

    fn fill_rect(&mut self, x: f32, top: f32, width: f32, height: f32, color: Rgb) {
        self.ops.extend([
            Operation::new("q", vec![]),
            Operation::new("rg", color_operands(color)),
            Operation::new(
                "re",
                vec![pt(x), pt(PAGE_HEIGHT - top - height), pt(width), pt(height)],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn rule(&mut self, y: f32, thickness: f32, color: Rgb) {
        let y = pt(PAGE_HEIGHT - y);
        self.ops.extend([
            Operation::new("q", vec![]),
            Operation::new("RG", color_operands(color)),
            Operation::new("w", vec![pt(thickness)]),
            Operation::new("m", vec![pt(MARGIN), y.clone()]),
            Operation::new("l", vec![pt(PAGE_WIDTH - MARGIN), y]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn paragraph(&mut self, spans: &[(&str, Font)], size: f32, color: Rgb, indent: f32, after: f32) {
        let step = line_height(size);
        for line in wrap(spans, size, CONTENT_WIDTH - indent) {
            self.ensure_space(step);
            let baseline = self.y + step * 0.75;
            self.draw_line(&line, MARGIN + indent, baseline, size, color);
            self.y += step;
        }
        self.y += after;
    }

    fn centered(&mut self, text: &str, font: Font, size: f32) {
        let step = line_height(size);
        for line in wrap(&[(text, font)], size, CONTENT_WIDTH) {
            self.ensure_space(step);
            let x = MARGIN + (CONTENT_WIDTH - line.width) / 2.0;
            let baseline = self.y + step * 0.75;
            self.draw_line(&line, x, baseline, size, BLACK);
            self.y += step;
        }
    }

    fn title(&mut self, title: &str, subtitle: &str) {
        self.centered(title, Font::Bold, 18.0);
        self.y += 1.0;
        self.centered(subtitle, Font::Oblique, 11.0);
        self.y += 6.0;
    }

    fn block(&mut self, block: &Block) {
        match block {
            Block::SectionHeading(text) => self.section_heading(text),
            Block::SubHeading(text) => {
                self.y += 2.0;
                self.ensure_space(20.0);
                self.paragraph(&[(text.as_str(), Font::Bold)], 11.0, BLACK, 0.0, 1.0);
            }
            Block::FieldGrid(fields) => self.field_grid(fields),
            Block::Paragraph(spans) => {
                let runs: Vec<(&str, Font)> = spans
                    .iter()
                    .map(|s| (s.text.as_str(), Font::for_style(s.bold, s.italic)))
                    .collect();
                self.paragraph(&runs, BODY_SIZE, BLACK, 0.0, 3.0);
            }
            Block::Table(table) => self.table(table),
            Block::Notice(text) => {
                self.paragraph(&[(text.as_str(), Font::Oblique)], BODY_SIZE, BLACK, 0.0, 3.0)
            }
            Block::Note(text) => {
                self.y += 1.0;
                let grey = hex_to_rgb(NOTE_COLOR);
                self.paragraph(&[(text.as_str(), Font::Oblique)], NOTE_SIZE, grey, 0.0, 3.0);
            }
            Block::ListItem(text) => {
                self.paragraph(&[(text.as_str(), Font::Regular)], BODY_SIZE, BLACK, 5.0, 1.5)
            }
            Block::Signature(signature) => self.signature(signature),
        }
    }

    fn section_heading(&mut self, text: &str) {
        self.y += 4.0;
        // 見出しだけがページ末尾に残らないようにする
        self.ensure_space(25.0);
        let accent = hex_to_rgb(ACCENT_COLOR);
        self.paragraph(&[(text, Font::Bold)], 13.0, accent, 0.0, 1.0);
        let y = self.y;
        self.rule(y, 0.5, accent);
        self.y += 4.0;
    }

    /// ラベルと値を2組ずつ横に並べる
    fn field_grid(&mut self, fields: &[(String, String)]) {
        let half = CONTENT_WIDTH / 2.0;
        let step = line_height(BODY_SIZE);

        for pair in fields.chunks(2) {
            let cells: Vec<(String, f32, Vec<Line>)> = pair
                .iter()
                .map(|(label, value)| {
                    let label = format!("{}:", label);
                    let label_width = Font::Bold.text_width(&label, BODY_SIZE);
                    let value_width = (half - label_width - 4.0).max(10.0);
                    let lines = wrap(&[(value.as_str(), Font::Regular)], BODY_SIZE, value_width);
                    (label, label_width, lines)
                })
                .collect();
            let height = cells.iter().map(|c| c.2.len()).max().unwrap_or(1) as f32 * step;

            self.ensure_space(height);
            let baseline = self.y + step * 0.75;
            for (col, (label, label_width, lines)) in cells.iter().enumerate() {
                let x = MARGIN + col as f32 * half;
                self.text_at(x, baseline, Font::Bold, BODY_SIZE, BLACK, label);
                for (i, line) in lines.iter().enumerate() {
                    let line_baseline = baseline + i as f32 * step;
                    self.draw_line(line, x + label_width + 2.0, line_baseline, BODY_SIZE, BLACK);
                }
            }
            self.y += height;
        }
        self.y += 4.0;
    }

    fn table(&mut self, table: &Table) {
        let widths: Vec<f32> = table
            .columns
            .iter()
            .map(|c| c.weight * CONTENT_WIDTH)
            .collect();
        let cell_lines = |text: &str, font: Font, width: f32| {
            wrap(&[(text, font)], TABLE_SIZE, width - 2.0 * CELL_PADDING)
        };

        let header: Vec<Vec<Line>> = table
            .columns
            .iter()
            .zip(&widths)
            .map(|(c, &w)| cell_lines(c.header, Font::Bold, w))
            .collect();
        let rows: Vec<Vec<Vec<Line>>> = table
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&widths)
                    .map(|(value, &w)| cell_lines(value, Font::Regular, w))
                    .collect()
            })
            .collect();
        let header_height = row_height(&header);
        let accent = hex_to_rgb(ACCENT_COLOR);

        // 1. ヘッダー行（最初のデータ行と同じページに置く）
        let first_height = rows.first().map(|r| row_height(r)).unwrap_or(0.0);
        self.ensure_space(header_height + first_height);
        self.table_row(&table.columns, &widths, &header, header_height, accent, WHITE);

        // 2. データ行（ページをまたがない）
        for (idx, cells) in rows.iter().enumerate() {
            let height = row_height(cells);
            if self.ensure_space(height) {
                self.table_row(&table.columns, &widths, &header, header_height, accent, WHITE);
            }
            let fill = hex_to_rgb(Table::row_fill(idx));
            self.table_row(&table.columns, &widths, cells, height, fill, BLACK);
        }
        self.y += 4.0;
    }

    fn table_row(
        &mut self,
        columns: &[Column],
        widths: &[f32],
        cells: &[Vec<Line>],
        height: f32,
        fill: Rgb,
        color: Rgb,
    ) {
        let top = self.y;
        self.fill_rect(MARGIN, top, CONTENT_WIDTH, height, fill);

        let mut x = MARGIN;
        for ((column, &width), lines) in columns.iter().zip(widths).zip(cells) {
            for (i, line) in lines.iter().enumerate() {
                let offset = match column.align {
                    Align::Left => CELL_PADDING,
                    Align::Center => (width - line.width) / 2.0,
                };
                let baseline = top + CELL_PADDING + (i as f32 + 0.75) * TABLE_LINE;
                self.draw_line(line, x + offset, baseline, TABLE_SIZE, color);
            }
            x += width;
        }

        self.y = top + height;
        self.rule(self.y, 0.1, hex_to_rgb(GRID_COLOR));
    }

    fn signature(&mut self, signature: &Signature) {
        let step = line_height(BODY_SIZE);
        self.y += 10.0;
        self.ensure_space(4.0 * step);

        let date = signature.date_line();
        let lines = [
            (Signature::RULE, Font::Regular),
            (signature.examiner.as_str(), Font::Bold),
            (signature.title.as_str(), Font::Regular),
            (date.as_str(), Font::Regular),
        ];
        for (text, font) in lines {
            self.paragraph(&[(text, font)], BODY_SIZE, BLACK, 0.0, 0.0);
        }
    }
}

/// ページの描画命令からPDF文書を組み立てる
///
/// フォント4種と文書情報は全ページで共有し、ページツリーは1階層です。
fn assemble(
    pages: Vec<Vec<Operation>>,
    title: &str,
    subject: &str,
) -> Result<Vec<u8>, ReportError> {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    // 1. フォント（WinAnsiEncoding）
    let mut fonts = Dictionary::new();
    for font in Font::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), font_id);
    }
    let resources_id = doc.add_object(dictionary! { "Font" => fonts });
    let media_box = vec![
        Object::Integer(0),
        Object::Integer(0),
        pt(PAGE_WIDTH),
        pt(PAGE_HEIGHT),
    ];

    // 2. ページと内容ストリーム
    let mut kids = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box.clone(),
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    // 3. ページツリー・カタログ・文書情報
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(encode_win_ansi(title)),
        "Subject" => Object::string_literal(encode_win_ansi(subject)),
        "Producer" => Object::string_literal("wiscreport"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    // 4. 相互参照表とトレーラーはlopdfが書き出す
    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}
