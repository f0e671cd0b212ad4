//! Record Extractor Module
//!
//! デコード済みの行から受検者ごとの`AssessmentRecord`を構築するモジュール。
//! 基本情報は同義語リストで、スコアは固定カタログと動的スキャンで検出します。

use tracing::debug;

use crate::api::DateFormat;
use crate::catalog::{CatalogEntry, DemographicField, Instrument};
use crate::decoder::{clean_value, is_blank_row};
use crate::formatter::{chronological_age, DateFormatter};
use crate::score::parse_score;
use crate::types::{AssessmentRecord, Demographics, HeaderIndex, PlaceholderMap, RawRow, ScoreEntry};

/// カタログ外のスコア列を検出する規則
///
/// ヘッダー名が`marker`を含み、`denylist`のいずれも含まない列が対象です。
/// 既定では標準誤差（`_ssse`）や信頼区間（`_ssre`）の列を除外します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRules {
    /// 標準得点列の目印
    pub marker: String,
    /// 除外する部分文字列
    pub denylist: Vec<String>,
}

impl Default for ScanRules {
    fn default() -> Self {
        Self {
            marker: "_ss".to_string(),
            denylist: vec!["_ssse".to_string(), "_ssre".to_string()],
        }
    }
}

impl ScanRules {
    /// ヘッダー名が動的スキャンの対象かどうか
    pub fn matches(&self, header: &str) -> bool {
        header.contains(self.marker.as_str())
            && !self
                .denylist
                .iter()
                .any(|fragment| header.contains(fragment.as_str()))
    }
}

/// レコード抽出器
#[derive(Debug, Clone)]
pub(crate) struct Extractor {
    instrument: Instrument,
    rules: ScanRules,
    dates: DateFormatter,
    derive_age: bool,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(Instrument::default(), ScanRules::default(), DateFormat::AsIs, true)
    }
}

impl Extractor {
    pub fn new(
        instrument: Instrument,
        rules: ScanRules,
        date_format: DateFormat,
        derive_age: bool,
    ) -> Self {
        Self {
            instrument,
            rules,
            dates: DateFormatter::new(date_format),
            derive_age,
        }
    }

    /// データ行からレコードを抽出する
    ///
    /// # 引数
    ///
    /// * `rows` - データ行（ヘッダー行を含まない）
    /// * `header` - ヘッダー索引
    ///
    /// # 戻り値
    ///
    /// 空白でない行ごとに1レコード（入力順）。すべてのセルが空白の行はスキップされます。
    pub fn extract(&self, rows: &[RawRow], header: &HeaderIndex) -> Vec<AssessmentRecord> {
        let records: Vec<AssessmentRecord> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !is_blank_row(row))
            .map(|(idx, row)| self.extract_row(idx + 1, row, header))
            .collect();

        debug!(
            rows = rows.len(),
            records = records.len(),
            skipped = rows.len() - records.len(),
            "extracted assessment records"
        );

        records
    }

    fn extract_row(&self, row_position: usize, row: &RawRow, header: &HeaderIndex) -> AssessmentRecord {
        let cells = RowView { row, header };
        let mut placeholders = PlaceholderMap::new();

        // 1. 基本情報
        let demographics = self.demographics(row_position, &cells);
        let first = cells.field(DemographicField::FirstName);
        let last = cells.field(DemographicField::LastName);
        placeholders.insert_if_absent(
            "{{FirstName}}",
            first.unwrap_or_else(|| DemographicField::FirstName.sentinel().to_string()),
        );
        placeholders.insert_if_absent(
            "{{LastName}}",
            last.unwrap_or_else(|| DemographicField::LastName.sentinel().to_string()),
        );
        placeholders.insert_if_absent("{{StudentName}}", demographics.student_name.as_str());
        placeholders.insert_if_absent("{{DateOfBirth}}", demographics.date_of_birth.as_str());
        placeholders.insert_if_absent("{{DateOfTesting}}", demographics.date_of_testing.as_str());
        placeholders.insert_if_absent("{{Age}}", demographics.age.as_str());
        placeholders.insert_if_absent("{{Grade}}", demographics.grade.as_str());
        placeholders.insert_if_absent("{{School}}", demographics.school.as_str());
        placeholders.insert_if_absent("{{Examiner}}", demographics.examiner.as_str());
        placeholders.insert_if_absent("{{Gender}}", demographics.gender.as_str());

        // 2. カタログのスコア
        let composites = self.catalog_scores(self.instrument.composites(), &cells, &mut placeholders);
        let subtests = self.catalog_scores(self.instrument.subtests(), &cells, &mut placeholders);

        // 3. カタログ外のスコア列（プレースホルダーのみ）
        self.scan_extra_scores(&cells, &mut placeholders);

        AssessmentRecord::new(
            row_position,
            self.instrument.test_name(),
            demographics,
            subtests,
            composites,
            placeholders,
        )
    }

    fn demographics(&self, row_position: usize, cells: &RowView<'_>) -> Demographics {
        let value_or_sentinel = |field: DemographicField| {
            cells
                .field(field)
                .unwrap_or_else(|| field.sentinel().to_string())
        };

        let first = cells.field(DemographicField::FirstName);
        let last = cells.field(DemographicField::LastName);
        let joined = format!(
            "{} {}",
            first.as_deref().unwrap_or(""),
            last.as_deref().unwrap_or("")
        );
        let student_name = match joined.trim() {
            "" => format!("Student {}", row_position),
            name => name.to_string(),
        };

        let raw_birth = cells.field(DemographicField::DateOfBirth);
        let raw_tested = cells.field(DemographicField::DateOfTesting);

        let age = cells.field(DemographicField::Age).or_else(|| {
            if !self.derive_age {
                return None;
            }
            chronological_age(raw_birth.as_deref()?, raw_tested.as_deref()?)
        });

        let gender = match cells.field(DemographicField::Gender).as_deref() {
            Some("1") => "Male".to_string(),
            Some("2") => "Female".to_string(),
            Some(other) => other.to_string(),
            None => DemographicField::Gender.sentinel().to_string(),
        };

        Demographics {
            first_name: value_or_sentinel(DemographicField::FirstName),
            last_name: value_or_sentinel(DemographicField::LastName),
            student_name,
            date_of_birth: raw_birth
                .map(|d| self.dates.format(&d))
                .unwrap_or_else(|| DemographicField::DateOfBirth.sentinel().to_string()),
            date_of_testing: raw_tested
                .map(|d| self.dates.format(&d))
                .unwrap_or_else(|| DemographicField::DateOfTesting.sentinel().to_string()),
            age: age.unwrap_or_else(|| DemographicField::Age.sentinel().to_string()),
            grade: value_or_sentinel(DemographicField::Grade),
            school: value_or_sentinel(DemographicField::School),
            examiner: value_or_sentinel(DemographicField::Examiner),
            gender,
        }
    }

    fn catalog_scores(
        &self,
        catalog: &[CatalogEntry],
        cells: &RowView<'_>,
        placeholders: &mut PlaceholderMap,
    ) -> Vec<ScoreEntry> {
        catalog
            .iter()
            .filter_map(|entry| {
                let raw = cells.column(&self.instrument.source_key(entry))?;
                let score = parse_score(raw)?;
                let abbreviation = entry.abbreviation();
                let scored = ScoreEntry::from_score(entry.name, &abbreviation, score);
                insert_score_placeholders(placeholders, &abbreviation, &scored);
                Some(scored)
            })
            .collect()
    }

    fn scan_extra_scores(&self, cells: &RowView<'_>, placeholders: &mut PlaceholderMap) {
        for (idx, name) in cells.header.headers().iter().enumerate() {
            if !self.rules.matches(name) || self.instrument.is_catalog_key(name) {
                continue;
            }

            let key = self.display_key(name);
            if key.is_empty() || placeholders.contains_key(&format!("{{{{{}_SS}}}}", key)) {
                continue;
            }

            let score = match cells.row.get(idx).and_then(|raw| parse_score(raw)) {
                Some(score) => score,
                None => continue,
            };
            let scored = ScoreEntry::from_score(&key, &key, score);
            insert_score_placeholders(placeholders, &key, &scored);
        }
    }

    /// 列名からプレースホルダーのキーを導出する（例: `wisc5_vsi_ss` -> `VSI`）
    fn display_key(&self, header: &str) -> String {
        let base = header.strip_suffix(self.rules.marker.as_str()).unwrap_or(header);
        let base = base
            .strip_prefix(self.instrument.column_prefix())
            .unwrap_or(base);
        base.to_uppercase()
    }
}

fn insert_score_placeholders(placeholders: &mut PlaceholderMap, key: &str, entry: &ScoreEntry) {
    placeholders.insert_if_absent(
        format!("{{{{{}_SS}}}}", key),
        entry.standard_score().to_string(),
    );
    placeholders.insert_if_absent(
        format!("{{{{{}_PR}}}}", key),
        entry.percentile_rank().to_string(),
    );
    placeholders.insert_if_absent(
        format!("{{{{{}_CAT}}}}", key),
        entry.classification().label(),
    );
}

/// 1行分のセルへの名前付きアクセス
struct RowView<'a> {
    row: &'a RawRow,
    header: &'a HeaderIndex,
}

impl<'a> RowView<'a> {
    /// 列名のセル（列が存在しない場合、または行が短い場合は`None`）
    fn column(&self, name: &str) -> Option<&'a str> {
        let idx = self.header.position(name)?;
        self.row.get(idx).map(String::as_str)
    }

    /// 同義語のうち、最初に空白でない値を持つ列の値
    fn field(&self, field: DemographicField) -> Option<String> {
        field
            .synonyms()
            .iter()
            .filter_map(|name| self.column(name))
            .map(clean_value)
            .find(|value| !value.is_empty())
    }
}

/// 既定設定でレコードを抽出する
///
/// # 引数
///
/// * `rows` - データ行（ヘッダー行を含まない）
/// * `header` - ヘッダー索引
///
/// # 使用例
///
/// ```rust
/// use wiscreport::{decode, extract, HeaderIndex};
///
/// # fn main() -> Result<(), wiscreport::ReportError> {
/// let rows = decode("firstname,lastname,wisc5_fsiq_ss\nJohn,Smith,105\n")?;
/// let header = HeaderIndex::from_row(&rows[0]);
/// let records = extract(&rows[1..], &header);
/// assert_eq!(records[0].student_name(), "John Smith");
/// # Ok(())
/// # }
/// ```
pub fn extract(rows: &[RawRow], header: &HeaderIndex) -> Vec<AssessmentRecord> {
    Extractor::default().extract(rows, header)
}
