use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 來源試算表中的一列 (活性成分, 核准國家)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugRecord {
    pub substance_name: String,
    pub country: String,
}

impl DrugRecord {
    pub fn new(substance_name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            substance_name: substance_name.into(),
            country: country.into(),
        }
    }
}

/// 一種要追蹤的藥物及其名稱比對規則
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationSpec {
    pub name: String,
    pub pattern: String,
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,
}

fn default_case_sensitive() -> bool {
    true
}

impl MedicationSpec {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, case_sensitive: bool) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            case_sensitive,
        }
    }
}

/// Normalizer 的輸出：ISO alpha-3 或「全部歐盟國家」
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResolvedCountry {
    Iso(String),
    EuropeanUnion,
}

impl fmt::Display for ResolvedCountry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedCountry::Iso(code) => f.write_str(code),
            ResolvedCountry::EuropeanUnion => f.write_str("Europe"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    #[default]
    Unavailable,
    Available,
}

impl Availability {
    pub fn as_z(self) -> u8 {
        match self {
            Availability::Unavailable => 0,
            Availability::Available => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryAvailability {
    pub iso_alpha3: String,
    pub country: String,
    pub medications_available: Vec<String>,
    pub per_medication_flag: BTreeMap<String, Availability>,
}

impl CountryAvailability {
    pub fn flag(&self, medication: &str) -> Availability {
        self.per_medication_flag
            .get(medication)
            .copied()
            .unwrap_or_default()
    }

    /// 滑鼠提示文字
    pub fn hover_text(&self) -> String {
        let medications = if self.medications_available.is_empty() {
            "none".to_string()
        } else {
            self.medications_available.join(", ")
        };
        format!("{}<br>{}", self.country, medications)
    }
}

/// 單一藥物的篩選與國家解析結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationCountries {
    pub medication: String,
    pub matched_rows: usize,
    pub countries: Vec<ResolvedCountry>,
}

/// transform 階段的完整輸出
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub medications: Vec<String>,
    pub per_medication: Vec<MedicationCountries>,
    pub countries: Vec<CountryAvailability>,
}

impl AvailabilityReport {
    pub fn country(&self, iso_alpha3: &str) -> Option<&CountryAvailability> {
        self.countries.iter().find(|c| c.iso_alpha3 == iso_alpha3)
    }
}
