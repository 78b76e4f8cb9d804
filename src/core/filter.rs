use crate::domain::model::{DrugRecord, MedicationSpec};
use crate::utils::error::{MapError, Result};
use regex::{Regex, RegexBuilder};

/// 已編譯的藥物比對器
#[derive(Debug, Clone)]
pub struct MedicationMatcher {
    spec: MedicationSpec,
    regex: Regex,
}

impl MedicationMatcher {
    pub fn new(spec: MedicationSpec) -> Result<Self> {
        let regex = RegexBuilder::new(&spec.pattern)
            .case_insensitive(!spec.case_sensitive)
            .build()
            .map_err(|e| {
                MapError::configuration(format!(
                    "medication '{}' has an invalid pattern '{}': {}",
                    spec.name, spec.pattern, e
                ))
            })?;
        Ok(Self { spec, regex })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// 子字串搜尋，不是整串比對
    pub fn matches(&self, substance_name: &str) -> bool {
        self.regex.is_match(substance_name)
    }

    pub fn filter<'a>(&self, records: &'a [DrugRecord]) -> Vec<&'a DrugRecord> {
        records
            .iter()
            .filter(|record| self.matches(&record.substance_name))
            .collect()
    }
}

pub fn compile_all(specs: &[MedicationSpec]) -> Result<Vec<MedicationMatcher>> {
    specs.iter().cloned().map(MedicationMatcher::new).collect()
}
