//! Score Normalizer Module
//!
//! スコア文字列の解析、標準得点の分類、正規分布に基づくパーセンタイル順位の算出。

use crate::decoder::clean_value;
use crate::types::Classification;

/// 標準得点の平均
const MEAN: f64 = 100.0;
/// 標準得点の標準偏差
const STANDARD_DEVIATION: f64 = 15.0;

// Abramowitz-Stegun 7.1.26
const ERF_A1: f64 = 0.254829592;
const ERF_A2: f64 = -0.284496736;
const ERF_A3: f64 = 1.421413741;
const ERF_A4: f64 = -1.453152027;
const ERF_A5: f64 = 1.061405429;
const ERF_P: f64 = 0.3275911;

/// スコア文字列を整数に変換する
///
/// BOMと前後空白を除去した後、先頭の10進整数部分を解釈します。
///
/// # 戻り値
///
/// * `Some(i32)` - 先頭に整数が読み取れた場合（`"105.6"` -> `105`）
/// * `None` - 空文字列、`%`または`<`を含む値（例: `"<0.1"`, `"99.9%"`）、数字がない値
///
/// # 使用例
///
/// ```rust
/// use wiscreport::parse_score;
///
/// assert_eq!(parse_score(" 105 "), Some(105));
/// assert_eq!(parse_score("<0.1"), None);
/// assert_eq!(parse_score(""), None);
/// ```
pub fn parse_score(raw: &str) -> Option<i32> {
    let value = clean_value(raw);
    if value.is_empty() || value.contains('%') || value.contains('<') {
        return None;
    }

    let (negative, digits) = match value.as_bytes()[0] {
        b'-' => (true, &value[1..]),
        b'+' => (false, &value[1..]),
        _ => (false, value.as_str()),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude: i64 = digits[..end].parse().ok()?;
    let signed = if negative { -magnitude } else { magnitude };
    i32::try_from(signed).ok()
}

/// 標準得点を分類帯に割り当てる
///
/// | 標準得点 | 分類 |
/// |---|---|
/// | 130以上 | Very Superior |
/// | 120-129 | Superior |
/// | 110-119 | High Average |
/// | 90-109 | Average |
/// | 80-89 | Low Average |
/// | 70-79 | Borderline |
/// | 69以下 | Extremely Low |
pub fn classify(score: i32) -> Classification {
    match score {
        s if s >= 130 => Classification::VerySuperior,
        s if s >= 120 => Classification::Superior,
        s if s >= 110 => Classification::HighAverage,
        s if s >= 90 => Classification::Average,
        s if s >= 80 => Classification::LowAverage,
        s if s >= 70 => Classification::Borderline,
        _ => Classification::ExtremelyLow,
    }
}

/// 標準得点のパーセンタイル順位（0..=100）
///
/// `z = (score - 100) / 15` として標準正規分布の累積分布関数を求め、
/// 100倍して四捨五入します。
///
/// # 使用例
///
/// ```rust
/// use wiscreport::percentile_rank;
///
/// assert_eq!(percentile_rank(100), 50);
/// assert_eq!(percentile_rank(115), 84);
/// assert_eq!(percentile_rank(70), 2);
/// ```
pub fn percentile_rank(score: i32) -> u8 {
    let z = (f64::from(score) - MEAN) / STANDARD_DEVIATION;
    let cdf = 0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2));
    (cdf * 100.0).round().clamp(0.0, 100.0) as u8
}

/// 誤差関数の近似（最大誤差 1.5e-7）
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + ERF_P * x);
    let poly = ((((ERF_A5 * t + ERF_A4) * t + ERF_A3) * t + ERF_A2) * t + ERF_A1) * t;
    let y = 1.0 - poly * (-x * x).exp();

    sign * y
}
