//! Date Formatter Module
//!
//! 基本情報の日付列（生年月日・検査日）の正規化と、生活年齢の算出。

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::api::DateFormat;

/// 受け付ける日付の入力形式（先に一致したものを採用）
const INPUT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d-%b-%Y",
];

const INPUT_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// 日付フォーマッター
///
/// エクスポートごとに異なる日付表記を解釈し、設定された出力形式に変換します。
#[derive(Debug, Clone)]
pub(crate) struct DateFormatter {
    format: DateFormat,
}

impl DateFormatter {
    pub fn new(format: DateFormat) -> Self {
        Self { format }
    }

    /// 日付文字列を出力形式に変換する
    ///
    /// `DateFormat::AsIs`の場合、または解釈できない文字列の場合は入力をそのまま返します。
    pub fn format(&self, raw: &str) -> String {
        let pattern = match &self.format {
            DateFormat::AsIs => return raw.to_string(),
            DateFormat::Iso8601 => "%Y-%m-%d",
            DateFormat::Custom(pattern) => pattern.as_str(),
        };

        match parse_date(raw) {
            Some(date) => render_date(date, pattern).unwrap_or_else(|| raw.to_string()),
            None => raw.to_string(),
        }
    }
}

/// chrono形式文字列で日付を文字列化する（不正な形式指定子は`None`）
pub(crate) fn render_date(date: NaiveDate, pattern: &str) -> Option<String> {
    use std::fmt::Write;

    let mut out = String::new();
    write!(out, "{}", date.format(pattern)).ok()?;
    Some(out)
}

/// 日付文字列を解釈する
///
/// 年は1900..=2100の範囲のみ有効とします（`%Y`が2桁の年を西暦1世紀と誤読するのを防ぐため）。
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    let plausible = |date: &NaiveDate| (1900..=2100).contains(&date.year());

    INPUT_DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .find(plausible)
        .or_else(|| {
            INPUT_DATETIME_FORMATS
                .iter()
                .filter_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
                .find(plausible)
        })
}

/// 生年月日と検査日から生活年齢を算出する（例: `"9 years, 3 months"`）
///
/// どちらかが解釈できない場合、または検査日が生年月日より前の場合は`None`。
pub(crate) fn chronological_age(date_of_birth: &str, date_of_testing: &str) -> Option<String> {
    let birth = parse_date(date_of_birth)?;
    let tested = parse_date(date_of_testing)?;
    if tested < birth {
        return None;
    }

    // 1. 満月数（日が未到達なら1か月引く）
    let mut months = (tested.year() - birth.year()) * 12 + tested.month() as i32
        - birth.month() as i32;
    if tested.day() < birth.day() {
        months -= 1;
    }

    // 2. 年と月に分解
    let years = months / 12;
    let rest = months % 12;

    Some(format!(
        "{} {}, {} {}",
        years,
        if years == 1 { "year" } else { "years" },
        rest,
        if rest == 1 { "month" } else { "months" }
    ))
}
