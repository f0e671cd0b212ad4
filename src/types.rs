//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。
//! デコード済みの行、ヘッダー索引、スコア、受検者レコード、プレースホルダーマップを含みます。

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::decoder::clean_value;

/// デコード済みの1行（セル文字列の並び）
pub type RawRow = Vec<String>;

/// ヘッダー名から列位置への索引
///
/// ヘッダー名はBOM除去・前後空白除去・小文字化して登録されます。
/// 同名のヘッダーが複数ある場合は、最後に出現した列が採用されます。
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    /// 正規化済みヘッダー名 -> 列位置
    positions: HashMap<String, usize>,
    /// 正規化済みヘッダー名（列順）
    headers: Vec<String>,
}

impl HeaderIndex {
    /// ヘッダー行から索引を構築する
    ///
    /// # 引数
    ///
    /// * `header_row` - デコード済みのヘッダー行
    pub fn from_row(header_row: &[String]) -> Self {
        let headers: Vec<String> = header_row.iter().map(|h| normalize_header(h)).collect();
        let mut positions = HashMap::with_capacity(headers.len());
        for (idx, name) in headers.iter().enumerate() {
            // 後勝ち
            positions.insert(name.clone(), idx);
        }
        Self { positions, headers }
    }

    /// ヘッダー名の列位置を取得する（大文字小文字・前後空白を無視）
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(&normalize_header(name)).copied()
    }

    /// 正規化済みヘッダー名を列順に返す
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// 列数
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// ヘッダーが空かどうか
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

fn normalize_header(name: &str) -> String {
    clean_value(name).to_lowercase()
}

/// 標準得点の分類帯
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Classification {
    #[serde(rename = "Extremely Low")]
    ExtremelyLow,
    #[serde(rename = "Borderline")]
    Borderline,
    #[serde(rename = "Low Average")]
    LowAverage,
    #[serde(rename = "Average")]
    Average,
    #[serde(rename = "High Average")]
    HighAverage,
    #[serde(rename = "Superior")]
    Superior,
    #[serde(rename = "Very Superior")]
    VerySuperior,
}

impl Classification {
    /// 表示用ラベル（例: "High Average"）
    pub fn label(&self) -> &'static str {
        match self {
            Classification::VerySuperior => "Very Superior",
            Classification::Superior => "Superior",
            Classification::HighAverage => "High Average",
            Classification::Average => "Average",
            Classification::LowAverage => "Low Average",
            Classification::Borderline => "Borderline",
            Classification::ExtremelyLow => "Extremely Low",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 1つのスコア（合成得点または下位検査）
///
/// パーセンタイル順位と分類は常に標準得点から導出されます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    name: String,
    abbreviation: String,
    standard_score: i32,
    percentile_rank: u8,
    classification: Classification,
}

impl ScoreEntry {
    /// 標準得点からスコアを生成する
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use wiscreport::{Classification, ScoreEntry};
    ///
    /// let entry = ScoreEntry::from_score("Verbal Comprehension Index", "VCI", 110);
    /// assert_eq!(entry.percentile_rank(), 75);
    /// assert_eq!(entry.classification(), Classification::HighAverage);
    /// ```
    pub fn from_score(name: &str, abbreviation: &str, standard_score: i32) -> Self {
        Self {
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
            standard_score,
            percentile_rank: crate::score::percentile_rank(standard_score),
            classification: crate::score::classify(standard_score),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abbreviation(&self) -> &str {
        &self.abbreviation
    }

    pub fn standard_score(&self) -> i32 {
        self.standard_score
    }

    pub fn percentile_rank(&self) -> u8 {
        self.percentile_rank
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }
}

/// 挿入順を保持するプレースホルダーマップ（`{{KEY}}` -> 値）
///
/// 既存キーへの再挿入は無視されます（先勝ち）。反復順は挿入順で決定的です。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl PlaceholderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// キーが未登録の場合のみ値を登録する
    ///
    /// # 戻り値
    ///
    /// 登録した場合は`true`、既に存在した場合は`false`
    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value.into()));
        true
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(|&i| self.entries[i].1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 挿入順にキーと値を返す
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// テンプレート文字列中の既知のプレースホルダーをすべて置換する
    ///
    /// 未知の`{{...}}`はそのまま残ります。
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use wiscreport::PlaceholderMap;
    ///
    /// let mut map = PlaceholderMap::new();
    /// map.insert_if_absent("{{FSIQ_SS}}", "105");
    /// assert_eq!(map.apply("FSIQ = {{FSIQ_SS}} {{X}}"), "FSIQ = 105 {{X}}");
    /// ```
    pub fn apply(&self, template: &str) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let candidate = &rest[start..];
            match candidate.find("}}") {
                Some(end) => {
                    let key = &candidate[..end + 2];
                    match self.get(key) {
                        Some(value) => result.push_str(value),
                        None => result.push_str(key),
                    }
                    rest = &candidate[end + 2..];
                }
                None => {
                    result.push_str(candidate);
                    rest = "";
                }
            }
        }
        result.push_str(rest);
        result
    }
}

impl Serialize for PlaceholderMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// 受検者の基本情報
///
/// 各項目は実際の値、または`[Grade]`のような角括弧付きの代替表記です。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    pub first_name: String,
    pub last_name: String,
    pub student_name: String,
    pub date_of_birth: String,
    pub date_of_testing: String,
    pub age: String,
    pub grade: String,
    pub school: String,
    pub examiner: String,
    pub gender: String,
}

/// 1行分の検査結果レコード
///
/// 構築後は変更されません（読み取り専用アクセサのみ）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRecord {
    row_position: usize,
    test_name: String,
    #[serde(flatten)]
    demographics: Demographics,
    subtests: Vec<ScoreEntry>,
    composites: Vec<ScoreEntry>,
    placeholders: PlaceholderMap,
}

impl AssessmentRecord {
    pub(crate) fn new(
        row_position: usize,
        test_name: &str,
        demographics: Demographics,
        subtests: Vec<ScoreEntry>,
        composites: Vec<ScoreEntry>,
        placeholders: PlaceholderMap,
    ) -> Self {
        Self {
            row_position,
            test_name: test_name.to_string(),
            demographics,
            subtests,
            composites,
            placeholders,
        }
    }

    /// 入力内のデータ行位置（1始まり）
    pub fn row_position(&self) -> usize {
        self.row_position
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn demographics(&self) -> &Demographics {
        &self.demographics
    }

    pub fn student_name(&self) -> &str {
        &self.demographics.student_name
    }

    /// 下位検査（カタログ順）
    pub fn subtests(&self) -> &[ScoreEntry] {
        &self.subtests
    }

    /// 合成得点（カタログ順）
    pub fn composites(&self) -> &[ScoreEntry] {
        &self.composites
    }

    /// 略称で合成得点を検索する（大文字小文字を無視）
    pub fn composite(&self, abbreviation: &str) -> Option<&ScoreEntry> {
        self.composites
            .iter()
            .find(|c| c.abbreviation.eq_ignore_ascii_case(abbreviation))
    }

    pub fn placeholders(&self) -> &PlaceholderMap {
        &self.placeholders
    }

    /// レコードを整形済みJSONに変換する
    pub fn to_json_pretty(&self) -> Result<String, crate::error::ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> RawRow {
        cells.iter().map(|s| s.to_string()).collect()
    }

    // ヘッダー索引は大文字小文字・前後空白・BOMを無視する
    #[test]
    fn test_header_index_normalizes_names() {
        let index = HeaderIndex::from_row(&row(&["\u{feff}FirstName", "  LastName ", "WISC5_FSIQ_SS"]));

        assert_eq!(index.position("firstname"), Some(0));
        assert_eq!(index.position("LASTNAME"), Some(1));
        assert_eq!(index.position(" wisc5_fsiq_ss "), Some(2));
        assert_eq!(index.position("grade"), None);
        assert_eq!(index.headers()[0], "firstname");
    }

    // 重複ヘッダーは最後の列が採用される
    #[test]
    fn test_header_index_last_duplicate_wins() {
        let index = HeaderIndex::from_row(&row(&["grade", "school", "Grade"]));
        assert_eq!(index.position("grade"), Some(2));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_placeholder_map_keeps_first_value() {
        let mut map = PlaceholderMap::new();
        assert!(map.insert_if_absent("{{A}}", "1"));
        assert!(map.insert_if_absent("{{B}}", "2"));
        assert!(!map.insert_if_absent("{{A}}", "3"));

        assert_eq!(map.get("{{A}}"), Some("1"));
        assert_eq!(map.len(), 2);
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["{{A}}", "{{B}}"]);
    }

    #[test]
    fn test_placeholder_map_apply_leaves_unknown_keys() {
        let mut map = PlaceholderMap::new();
        map.insert_if_absent("{{StudentName}}", "Jane Doe");

        assert_eq!(
            map.apply("Dear {{StudentName}}, {{Missing}} and {{"),
            "Dear Jane Doe, {{Missing}} and {{"
        );
    }

    #[test]
    fn test_placeholder_map_serializes_in_order() {
        let mut map = PlaceholderMap::new();
        map.insert_if_absent("{{Z}}", "1");
        map.insert_if_absent("{{A}}", "2");

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"{{Z}}":"1","{{A}}":"2"}"#);
    }

    #[test]
    fn test_score_entry_derives_rank_and_classification() {
        let entry = ScoreEntry::from_score("Full Scale IQ", "FSIQ", 100);
        assert_eq!(entry.percentile_rank(), 50);
        assert_eq!(entry.classification(), Classification::Average);
        assert_eq!(entry.classification().to_string(), "Average");
    }

    #[test]
    fn test_classification_serializes_as_label() {
        let json = serde_json::to_string(&Classification::HighAverage).unwrap();
        assert_eq!(json, "\"High Average\"");
    }
}
