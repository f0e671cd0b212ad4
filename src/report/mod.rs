//! Report Model Module
//!
//! `AssessmentRecord`を出力フォーマット非依存のブロック列（`ReportDocument`）に変換する。
//! DOCX/PDFの各レイアウトはこのブロック列のみを入力とし、内容の一貫性を保証します。

mod narrative;

pub use narrative::ordinal;

use crate::catalog::Instrument;
use crate::types::{AssessmentRecord, ScoreEntry};

/// 表ヘッダー・見出しの強調色（RRGGBB）
pub const ACCENT_COLOR: &str = "2596BE";
/// 奇数データ行の背景色
pub const STRIPE_COLOR: &str = "F8F9FA";
/// 偶数データ行の背景色
pub const BASE_COLOR: &str = "FFFFFF";
/// 表の罫線色
pub const GRID_COLOR: &str = "CCCCCC";
/// 注記の文字色
pub const NOTE_COLOR: &str = "666666";

/// 値がない数値セルの表記
pub const NOT_AVAILABLE: &str = "N/A";

pub const REPORT_TITLE: &str = "PSYCHOLOGICAL ASSESSMENT REPORT";
pub const NO_COMPOSITES_NOTICE: &str = "[No composite scores available]";
pub const NO_SUBTESTS_NOTICE: &str = "[No subtest scores available]";

/// `RRGGBB`形式の色をRGB成分に分解する
pub fn hex_to_rgb(hex: &str) -> (u8, u8, u8) {
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .unwrap_or(0)
    };
    (channel(0..2), channel(2..4), channel(4..6))
}

/// 文字装飾付きのテキスト断片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            bold: true,
            ..Self::plain(text)
        }
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self {
            italic: true,
            ..Self::plain(text)
        }
    }
}

/// 表の列の配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// 表の列定義
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub header: &'static str,
    /// 表全体の幅に対する比率
    pub weight: f32,
    pub align: Align,
}

impl Column {
    const fn new(header: &'static str, weight: f32, align: Align) -> Self {
        Self {
            header,
            weight,
            align,
        }
    }
}

/// データ表
///
/// ヘッダー行は強調色、データ行は白と淡灰色の交互の背景になります。
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// データ行（0始まり）の背景色
    pub fn row_fill(index: usize) -> &'static str {
        if index % 2 == 0 {
            BASE_COLOR
        } else {
            STRIPE_COLOR
        }
    }
}

/// 署名欄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub examiner: String,
    pub title: String,
    pub date: String,
}

impl Signature {
    pub const RULE: &'static str = "_________________________________";

    pub fn date_line(&self) -> String {
        format!("Date: {}", self.date)
    }
}

/// レポートを構成するブロック
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// 大見出し（強調色、下線付き）
    SectionHeading(String),
    /// ラベルと値の組（2組ずつ横に並べる）
    FieldGrid(Vec<(String, String)>),
    /// 本文段落
    Paragraph(Vec<Span>),
    /// 小見出し
    SubHeading(String),
    Table(Table),
    /// データがない場合の告知（斜体）
    Notice(String),
    /// 小さな灰色の注記
    Note(String),
    /// 番号付きの行
    ListItem(String),
    Signature(Signature),
}

/// レポートの生成設定
#[derive(Debug, Clone)]
pub(crate) struct ReportSettings {
    pub instrument: Instrument,
    pub examiner_title: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            instrument: Instrument::default(),
            examiner_title: "School Psychologist".to_string(),
        }
    }
}

/// 出力フォーマット非依存のレポート
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub subtitle: String,
    pub blocks: Vec<Block>,
}

impl ReportDocument {
    /// 既定設定でレポートを組み立てる
    pub fn from_record(record: &AssessmentRecord) -> Self {
        Self::build(record, &ReportSettings::default())
    }

    pub(crate) fn build(record: &AssessmentRecord, settings: &ReportSettings) -> Self {
        let demo = record.demographics();
        let student = demo.student_name.as_str();
        let mut blocks = Vec::new();

        // 1. 基本情報
        blocks.push(Block::SectionHeading("IDENTIFYING INFORMATION".to_string()));
        blocks.push(Block::FieldGrid(vec![
            ("Student Name".to_string(), demo.student_name.clone()),
            ("Date of Testing".to_string(), demo.date_of_testing.clone()),
            ("Date of Birth".to_string(), demo.date_of_birth.clone()),
            ("Chronological Age".to_string(), demo.age.clone()),
            ("Grade".to_string(), demo.grade.clone()),
            ("School".to_string(), demo.school.clone()),
            ("Examiner".to_string(), demo.examiner.clone()),
        ]));

        // 2. 紹介理由・背景
        blocks.push(Block::SectionHeading("REASON FOR REFERRAL".to_string()));
        blocks.push(Block::Paragraph(vec![Span::plain(narrative::referral(student))]));
        blocks.push(Block::SectionHeading("BACKGROUND INFORMATION".to_string()));
        blocks.push(Block::Paragraph(vec![Span::italic(
            narrative::BACKGROUND_PLACEHOLDER,
        )]));

        // 3. 検査結果
        blocks.push(Block::SectionHeading("TEST RESULTS".to_string()));
        blocks.push(Block::SubHeading("Composite/Index Scores".to_string()));
        if record.composites().is_empty() {
            blocks.push(Block::Notice(NO_COMPOSITES_NOTICE.to_string()));
        } else {
            blocks.push(Block::Table(composite_table(record.composites())));
        }
        blocks.push(Block::SubHeading("Subtest Scores".to_string()));
        if record.subtests().is_empty() {
            blocks.push(Block::Notice(NO_SUBTESTS_NOTICE.to_string()));
        } else {
            blocks.push(Block::Table(subtest_table(record.subtests())));
            blocks.push(Block::Note(narrative::SCALE_NOTE.to_string()));
        }

        // 4. 解釈
        blocks.push(Block::SectionHeading("INTERPRETATION OF RESULTS".to_string()));
        let full_scale_abbr = settings.instrument.full_scale_abbr();
        let full_scale = record.composite(full_scale_abbr);
        if let Some(entry) = full_scale {
            blocks.push(Block::Paragraph(vec![Span::plain(narrative::full_scale(
                student, entry,
            ))]));
        }
        for entry in record
            .composites()
            .iter()
            .filter(|c| !c.abbreviation().eq_ignore_ascii_case(full_scale_abbr))
        {
            let (lead, body) = narrative::composite(student, entry);
            blocks.push(Block::Paragraph(vec![Span::bold(lead), Span::plain(body)]));
        }
        if record.composites().is_empty() {
            blocks.push(Block::Notice(NO_COMPOSITES_NOTICE.to_string()));
        }

        // 5. まとめと提言
        blocks.push(Block::SectionHeading("SUMMARY AND RECOMMENDATIONS".to_string()));
        blocks.push(Block::Paragraph(vec![Span::plain(narrative::summary(
            student,
            record.test_name(),
            full_scale,
        ))]));
        blocks.push(Block::Paragraph(vec![Span::bold("Recommendations:")]));
        for n in 1..=narrative::RECOMMENDATION_COUNT {
            blocks.push(Block::ListItem(format!(
                "{}. {}",
                n,
                narrative::RECOMMENDATION_PLACEHOLDER
            )));
        }

        // 6. 署名欄
        blocks.push(Block::Signature(Signature {
            examiner: demo.examiner.clone(),
            title: settings.examiner_title.clone(),
            date: demo.date_of_testing.clone(),
        }));

        Self {
            title: REPORT_TITLE.to_string(),
            subtitle: settings.instrument.full_title().to_string(),
            blocks,
        }
    }

    /// 表示されるすべての文字列（出現順）
    ///
    /// 出力フォーマット間で内容が一致することの検証に使用します。
    pub fn text_fragments(&self) -> Vec<String> {
        let mut fragments = vec![self.title.clone(), self.subtitle.clone()];
        for block in &self.blocks {
            match block {
                Block::SectionHeading(text)
                | Block::SubHeading(text)
                | Block::Notice(text)
                | Block::Note(text)
                | Block::ListItem(text) => fragments.push(text.clone()),
                Block::FieldGrid(fields) => {
                    for (label, value) in fields {
                        fragments.push(format!("{}:", label));
                        fragments.push(value.clone());
                    }
                }
                Block::Paragraph(spans) => {
                    let joined: String = spans.iter().map(|s| s.text.as_str()).collect();
                    fragments.push(joined);
                }
                Block::Table(table) => {
                    fragments.extend(table.columns.iter().map(|c| c.header.to_string()));
                    for row in &table.rows {
                        fragments.extend(row.iter().cloned());
                    }
                }
                Block::Signature(signature) => {
                    fragments.push(Signature::RULE.to_string());
                    fragments.push(signature.examiner.clone());
                    fragments.push(signature.title.clone());
                    fragments.push(signature.date_line());
                }
            }
        }
        fragments
    }
}

fn cell(value: String) -> String {
    if value.trim().is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        value
    }
}

fn composite_table(entries: &[ScoreEntry]) -> Table {
    Table {
        columns: vec![
            Column::new("Index", 0.37, Align::Left),
            Column::new("Abbreviation", 0.15, Align::Center),
            Column::new("Standard Score", 0.12, Align::Center),
            Column::new("Percentile", 0.12, Align::Center),
            Column::new("Classification", 0.24, Align::Left),
        ],
        rows: entries
            .iter()
            .map(|e| {
                vec![
                    cell(e.name().to_string()),
                    cell(e.abbreviation().to_string()),
                    cell(e.standard_score().to_string()),
                    cell(e.percentile_rank().to_string()),
                    cell(e.classification().to_string()),
                ]
            })
            .collect(),
    }
}

fn subtest_table(entries: &[ScoreEntry]) -> Table {
    Table {
        columns: vec![
            Column::new("Subtest", 0.46, Align::Left),
            Column::new("Scaled Score", 0.20, Align::Center),
            Column::new("Percentile", 0.18, Align::Center),
            Column::new("Classification", 0.16, Align::Left),
        ],
        rows: entries
            .iter()
            .map(|e| {
                vec![
                    cell(e.name().to_string()),
                    cell(e.standard_score().to_string()),
                    cell(e.percentile_rank().to_string()),
                    cell(e.classification().to_string()),
                ]
            })
            .collect(),
    }
}
