//! 靜態參考地理資料 (國名 ↔ ISO 代碼 ↔ 歐盟成員)。
//!
//! 資料以 `data/countries.csv` 版本控管，編譯時內嵌。

use crate::utils::cache::DiskCache;
use crate::utils::error::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const BUNDLED_COUNTRIES: &str = include_str!("../../data/countries.csv");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    pub alpha2: String,
    pub alpha3: String,
    pub eu_member: bool,
    pub aliases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CountryRow {
    name: String,
    alpha2: String,
    alpha3: String,
    eu_member: bool,
    #[serde(default)]
    aliases: String,
}

#[derive(Debug, Clone)]
pub struct ReferenceGeography {
    countries: Vec<Country>,
    by_alpha3: HashMap<String, usize>,
    fingerprint: String,
}

impl ReferenceGeography {
    pub fn bundled() -> Result<Self> {
        Self::from_csv(BUNDLED_COUNTRIES.as_bytes())
    }

    pub fn from_csv(data: &[u8]) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(data);
        let mut countries = Vec::new();
        for row in reader.deserialize::<CountryRow>() {
            let row = row?;
            countries.push(Country {
                name: row.name.trim().to_string(),
                alpha2: row.alpha2.trim().to_uppercase(),
                alpha3: row.alpha3.trim().to_uppercase(),
                eu_member: row.eu_member,
                aliases: row
                    .aliases
                    .split(';')
                    .map(str::trim)
                    .filter(|alias| !alias.is_empty())
                    .map(String::from)
                    .collect(),
            });
        }
        Self::new(countries)
    }

    pub fn new(countries: Vec<Country>) -> Result<Self> {
        if countries.is_empty() {
            return Err(MapError::configuration("reference geography is empty"));
        }

        let mut by_alpha3 = HashMap::with_capacity(countries.len());
        for (index, country) in countries.iter().enumerate() {
            if by_alpha3.insert(country.alpha3.clone(), index).is_some() {
                return Err(MapError::configuration(format!(
                    "reference geography lists {} twice",
                    country.alpha3
                )));
            }
        }

        let fingerprint = DiskCache::key("reference_geography", &countries)?;
        Ok(Self {
            countries,
            by_alpha3,
            fingerprint,
        })
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    /// 在 [`countries`](Self::countries) 中的位置
    pub fn index_of(&self, alpha3: &str) -> Option<usize> {
        self.by_alpha3.get(alpha3).copied()
    }

    pub fn get(&self, alpha3: &str) -> Option<&Country> {
        self.index_of(alpha3).map(|index| &self.countries[index])
    }

    /// 整份表格內容的雜湊；表格一改，依賴它的快取項目就不再命中
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn eu_members(&self) -> impl Iterator<Item = &Country> {
        self.countries.iter().filter(|c| c.eu_member)
    }
}
