use crate::domain::model::MedicationSpec;
use crate::utils::error::{MapError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_unique_names};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 預設追蹤的藥物，比對區分大小寫
pub fn default_medications() -> Vec<MedicationSpec> {
    [
        ("Atomoxetine", "Atomoxetin.*"),
        ("Clonidine", "Clonidine.*"),
        ("Dexamfetamine", "Dexamfetamin.*"),
        ("Guanfacine", "Guanfacin.*"),
        ("Lisdexamfetamine", "Lisdexamfetamine.*"),
        ("Methylphenidate", "Methylphenidat.*"),
    ]
    .into_iter()
    .map(|(name, pattern)| MedicationSpec::new(name, pattern, true))
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationFile {
    #[serde(rename = "medication")]
    pub medications: Vec<MedicationSpec>,
}

impl MedicationFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Vec<MedicationSpec>> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            MapError::configuration(format!(
                "cannot read medication file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Vec<MedicationSpec>> {
        let file: MedicationFile = toml::from_str(content)?;
        validate_medications(&file.medications)?;
        Ok(file.medications)
    }
}

pub fn validate_medications(medications: &[MedicationSpec]) -> Result<()> {
    if medications.is_empty() {
        return Err(MapError::configuration("at least one medication is required"));
    }
    for medication in medications {
        validate_non_empty_string("medication.name", &medication.name)?;
        validate_non_empty_string("medication.pattern", &medication.pattern)?;
    }
    validate_unique_names("medication.name", medications.iter().map(|m| m.name.as_str()))
}
