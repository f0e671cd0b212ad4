//! Narrative Text
//!
//! レポート本文の定型文を生成する。両出力フォーマットで同一の文章を使用します。

use crate::types::ScoreEntry;

pub(crate) const BACKGROUND_PLACEHOLDER: &str = "[Insert relevant background information including developmental history, educational history, and any pertinent medical or social history.]";

pub(crate) const RECOMMENDATION_PLACEHOLDER: &str =
    "[Insert specific recommendation based on assessment results]";

pub(crate) const RECOMMENDATION_COUNT: usize = 3;

pub(crate) const SCALE_NOTE: &str =
    "Note: Standard Scores have a mean of 100 and SD of 15. Scaled Scores have a mean of 10 and SD of 3.";

/// 序数表記（1st, 2nd, 3rd, 4th, 11th, 21st ...）
pub fn ordinal(n: u8) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

pub(crate) fn referral(student: &str) -> String {
    format!(
        "{} was referred for a comprehensive psychological evaluation to assess cognitive functioning and identify areas of strength or weakness that may impact academic performance.",
        student
    )
}

/// 全検査IQの解釈文
pub(crate) fn full_scale(student: &str, entry: &ScoreEntry) -> String {
    format!(
        "{student} obtained a {name} ({abbr}) of {ss}, which falls at the {pr} percentile and is classified in the {cat} range. This indicates that {student}'s overall cognitive abilities are {cat_lower} compared to same-age peers.",
        student = student,
        name = entry.name(),
        abbr = entry.abbreviation(),
        ss = entry.standard_score(),
        pr = ordinal(entry.percentile_rank()),
        cat = entry.classification(),
        cat_lower = entry.classification().label().to_lowercase(),
    )
}

/// その他の合成得点の解釈文（見出し部分と本文）
pub(crate) fn composite(student: &str, entry: &ScoreEntry) -> (String, String) {
    let lead = format!("{} ({}): ", entry.name(), entry.abbreviation());
    let body = format!(
        "{}'s score of {} ({} percentile) falls within the {} range.",
        student,
        entry.standard_score(),
        ordinal(entry.percentile_rank()),
        entry.classification()
    );
    (lead, body)
}

pub(crate) fn summary(student: &str, test_name: &str, full_scale: Option<&ScoreEntry>) -> String {
    let mut text = format!(
        "Based on the results of this evaluation, {} demonstrates cognitive abilities as measured by the {}",
        student, test_name
    );
    if let Some(entry) = full_scale {
        text.push_str(&format!(
            ", with an overall {} of {} ({})",
            entry.abbreviation(),
            entry.standard_score(),
            entry.classification()
        ));
    }
    text.push('.');
    text
}
