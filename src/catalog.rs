//! Instrument Catalog Module
//!
//! 検査ごとに固定された認識対象スコア列（合成得点・下位検査）と、
//! 基本情報列の同義語を定義するモジュール。

/// カタログの1項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    /// 略称（小文字、列名の構成要素）
    pub abbr: &'static str,
    /// 表示名
    pub name: &'static str,
}

impl CatalogEntry {
    const fn new(abbr: &'static str, name: &'static str) -> Self {
        Self { abbr, name }
    }

    /// 表示用略称（大文字）
    pub fn abbreviation(&self) -> String {
        self.abbr.to_ascii_uppercase()
    }
}

/// 検査の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum Instrument {
    /// Wechsler Intelligence Scale for Children - Fifth Edition
    #[default]
    WiscV,
}

impl Instrument {
    /// 検査名（レコードの`test_name`）
    pub fn test_name(&self) -> &'static str {
        match self {
            Instrument::WiscV => "WISC-V",
        }
    }

    /// 正式名称（レポートの副題）
    pub fn full_title(&self) -> &'static str {
        match self {
            Instrument::WiscV => {
                "Wechsler Intelligence Scale for Children - Fifth Edition (WISC-V)"
            }
        }
    }

    /// スコア列名の接頭辞
    pub fn column_prefix(&self) -> &'static str {
        match self {
            Instrument::WiscV => "wisc5_",
        }
    }

    /// 合成得点カタログ（表示順）
    pub fn composites(&self) -> &'static [CatalogEntry] {
        match self {
            Instrument::WiscV => WISC_V_COMPOSITES,
        }
    }

    /// 下位検査カタログ（表示順）
    pub fn subtests(&self) -> &'static [CatalogEntry] {
        match self {
            Instrument::WiscV => WISC_V_SUBTESTS,
        }
    }

    /// 全体を代表する合成得点の略称
    pub fn full_scale_abbr(&self) -> &'static str {
        match self {
            Instrument::WiscV => "fsiq",
        }
    }

    /// バッチアーカイブのファイル名
    pub fn archive_name(&self) -> &'static str {
        match self {
            Instrument::WiscV => "WISC-V_Reports.zip",
        }
    }

    /// カタログ項目の標準得点列名（例: `wisc5_fsiq_ss`）
    pub fn source_key(&self, entry: &CatalogEntry) -> String {
        format!("{}{}_ss", self.column_prefix(), entry.abbr)
    }

    /// ヘッダー名がカタログ項目の標準得点列かどうか
    pub fn is_catalog_key(&self, header: &str) -> bool {
        self.composites()
            .iter()
            .chain(self.subtests())
            .any(|entry| self.source_key(entry) == header)
    }
}

const WISC_V_COMPOSITES: &[CatalogEntry] = &[
    CatalogEntry::new("fsiq", "Full Scale IQ"),
    CatalogEntry::new("vci", "Verbal Comprehension Index"),
    CatalogEntry::new("vsi", "Visual Spatial Index"),
    CatalogEntry::new("fri", "Fluid Reasoning Index"),
    CatalogEntry::new("wmi", "Working Memory Index"),
    CatalogEntry::new("psi", "Processing Speed Index"),
    CatalogEntry::new("gai", "General Ability Index"),
    CatalogEntry::new("cpi", "Cognitive Proficiency Index"),
    CatalogEntry::new("nvi", "Nonverbal Index"),
    CatalogEntry::new("qri", "Quantitative Reasoning Index"),
    CatalogEntry::new("awmi", "Auditory Working Memory Index"),
    CatalogEntry::new("nsi", "Naming Speed Index"),
    CatalogEntry::new("sti", "Symbol Translation Index"),
    CatalogEntry::new("sri", "Storage and Retrieval Index"),
];

const WISC_V_SUBTESTS: &[CatalogEntry] = &[
    CatalogEntry::new("bd", "Block Design"),
    CatalogEntry::new("si", "Similarities"),
    CatalogEntry::new("mr", "Matrix Reasoning"),
    CatalogEntry::new("ds", "Digit Span"),
    CatalogEntry::new("cd", "Coding"),
    CatalogEntry::new("vc", "Vocabulary"),
    CatalogEntry::new("fw", "Figure Weights"),
    CatalogEntry::new("vp", "Visual Puzzles"),
    CatalogEntry::new("ps", "Picture Span"),
    CatalogEntry::new("ss", "Symbol Search"),
    CatalogEntry::new("in", "Information"),
    CatalogEntry::new("pc", "Picture Concepts"),
    CatalogEntry::new("ln", "Letter-Number Sequencing"),
    CatalogEntry::new("ca", "Cancellation"),
    CatalogEntry::new("co", "Comprehension"),
    CatalogEntry::new("ar", "Arithmetic"),
];

/// 基本情報の項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DemographicField {
    FirstName,
    LastName,
    DateOfBirth,
    DateOfTesting,
    Age,
    Grade,
    School,
    Examiner,
    Gender,
}

impl DemographicField {
    /// 列名の同義語（先に値があった列を採用）
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            DemographicField::FirstName => &["firstname", "first_name", "first name"],
            DemographicField::LastName => &["lastname", "last_name", "last name"],
            DemographicField::DateOfBirth => &["birthdate", "dateofbirth", "dob"],
            DemographicField::DateOfTesting => &["administrationdate", "testdate"],
            DemographicField::Age => &["ageatassessment", "age"],
            DemographicField::Grade => &["grade"],
            DemographicField::School => &["school"],
            DemographicField::Examiner => &["examiner"],
            DemographicField::Gender => &["gender"],
        }
    }

    /// 値がない場合の代替表記
    pub fn sentinel(&self) -> &'static str {
        match self {
            DemographicField::FirstName => "[First Name]",
            DemographicField::LastName => "[Last Name]",
            DemographicField::DateOfBirth => "[Date of Birth]",
            DemographicField::DateOfTesting => "[Date of Testing]",
            DemographicField::Age => "[Age]",
            DemographicField::Grade => "[Grade]",
            DemographicField::School => "[School]",
            DemographicField::Examiner => "[Examiner]",
            DemographicField::Gender => "[Gender]",
        }
    }
}
