use crate::core::geography::ReferenceGeography;
use crate::domain::model::{Availability, CountryAvailability, MedicationCountries, ResolvedCountry};
use crate::utils::error::{MapError, Result};
use std::collections::BTreeMap;

/// 每個參考國家產生一筆 CountryAvailability，建構後不再修改。
///
/// `per_medication` 的順序即設定檔中的藥物順序，決定各國清單的排列。
pub fn aggregate(
    medications: &[String],
    per_medication: &[MedicationCountries],
    geography: &ReferenceGeography,
) -> Result<Vec<CountryAvailability>> {
    let countries = geography.countries();
    let mut lists: Vec<Vec<String>> = vec![Vec::new(); countries.len()];

    for entry in per_medication {
        if !medications.contains(&entry.medication) {
            return Err(MapError::configuration(format!(
                "medication '{}' is not configured",
                entry.medication
            )));
        }

        let mut targets: Vec<usize> = Vec::new();
        for resolved in &entry.countries {
            match resolved {
                ResolvedCountry::EuropeanUnion => targets.extend(0..countries.len()),
                ResolvedCountry::Iso(code) => {
                    let index = geography.index_of(code).ok_or_else(|| {
                        MapError::configuration(format!(
                            "{} (for {}) is not in the reference geography; it is stale and must be updated",
                            code, entry.medication
                        ))
                    })?;
                    targets.push(index);
                }
            }
        }

        for index in targets {
            let list = &mut lists[index];
            if !list.contains(&entry.medication) {
                list.push(entry.medication.clone());
            }
        }
    }

    let result = countries
        .iter()
        .zip(lists)
        .map(|(country, medications_available)| {
            let per_medication_flag: BTreeMap<String, Availability> = medications
                .iter()
                .map(|name| {
                    let flag = if medications_available.contains(name) {
                        Availability::Available
                    } else {
                        Availability::Unavailable
                    };
                    (name.clone(), flag)
                })
                .collect();
            CountryAvailability {
                iso_alpha3: country.alpha3.clone(),
                country: country.name.clone(),
                medications_available,
                per_medication_flag,
            }
        })
        .collect();

    Ok(result)
}
