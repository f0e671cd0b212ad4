//! Font Metrics
//!
//! PDF標準14フォント（Helvetica系）の文字幅とWinAnsiEncodingへの変換。
//! 折り返しと中央揃えに使用します。

use encoding_rs::WINDOWS_1252;

/// Helvetica（および Helvetica-Oblique）の文字幅（0x20..=0x7E、1/1000 em）
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0x30
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 0x50
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 0x60
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 0x70
];

/// Helvetica-Bold（および Helvetica-BoldOblique）の文字幅
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 0x30
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 0x50
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 0x60
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 0x70
];

/// 0x80以上の文字の概算幅
const FALLBACK_WIDTH: u16 = 556;

/// 1ポイントあたりのミリメートル
pub(crate) const MM_PER_PT: f32 = 25.4 / 72.0;

/// 使用するフォント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Font {
    Regular,
    Bold,
    Oblique,
    BoldOblique,
}

impl Font {
    pub const ALL: [Font; 4] = [Font::Regular, Font::Bold, Font::Oblique, Font::BoldOblique];

    pub fn for_style(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => Font::Regular,
            (true, false) => Font::Bold,
            (false, true) => Font::Oblique,
            (true, true) => Font::BoldOblique,
        }
    }

    /// ページリソース上の名前
    pub fn resource_name(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Oblique => "F3",
            Font::BoldOblique => "F4",
        }
    }

    pub fn base_font(&self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Oblique => "Helvetica-Oblique",
            Font::BoldOblique => "Helvetica-BoldOblique",
        }
    }

    fn widths(&self) -> &'static [u16; 95] {
        match self {
            Font::Regular | Font::Oblique => &HELVETICA_WIDTHS,
            Font::Bold | Font::BoldOblique => &HELVETICA_BOLD_WIDTHS,
        }
    }

    /// エンコード済みの1バイトの幅（1/1000 em）
    pub fn glyph_width(&self, byte: u8) -> u16 {
        match byte {
            0x20..=0x7E => self.widths()[(byte - 0x20) as usize],
            _ => FALLBACK_WIDTH,
        }
    }

    /// 文字列の幅（mm）
    pub fn text_width(&self, text: &str, size_pt: f32) -> f32 {
        let units: u32 = encode_win_ansi(text)
            .iter()
            .map(|&b| u32::from(self.glyph_width(b)))
            .sum();
        units as f32 / 1000.0 * size_pt * MM_PER_PT
    }
}

/// 文字列をWinAnsiEncodingに変換する（表現できない文字は`?`）
///
/// WinAnsiEncodingはWindows-1252と同じ文字集合なので、文字ごとに
/// Windows-1252へ変換します。
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        if c == '\t' {
            out.push(b' ');
            continue;
        }
        let (bytes, _, unmappable) = WINDOWS_1252.encode(c.encode_utf8(&mut buf));
        if unmappable {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}
