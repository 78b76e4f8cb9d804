use crate::core::geography::ReferenceGeography;
use crate::domain::model::ResolvedCountry;
use crate::utils::cache::DiskCache;
use crate::utils::error::{MapError, Result};
use rapidfuzz::distance::jaro_winkler::similarity as jaro_similarity;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.88;
const EUROPEAN_UNION: &str = "european union";

/// "France (mainland)" → "France"
pub fn strip_annotation(label: &str) -> &str {
    label.split('(').next().unwrap_or(label).trim()
}

pub struct CountryNormalizer<'g> {
    geography: &'g ReferenceGeography,
    threshold: f64,
    cache: DiskCache,
    memo: RefCell<HashMap<String, ResolvedCountry>>,
}

impl<'g> CountryNormalizer<'g> {
    pub fn new(geography: &'g ReferenceGeography, threshold: f64, cache: DiskCache) -> Self {
        Self {
            geography,
            threshold,
            cache,
            memo: RefCell::new(HashMap::new()),
        }
    }

    pub fn normalize(&self, label: &str) -> Result<ResolvedCountry> {
        let trimmed = strip_annotation(label);
        if trimmed.to_lowercase() == EUROPEAN_UNION {
            return Ok(ResolvedCountry::EuropeanUnion);
        }

        if let Some(hit) = self.memo.borrow().get(trimmed) {
            return Ok(hit.clone());
        }

        // 門檻與參考表都會改變結果，一併納入快取鍵
        let args = (trimmed, self.threshold, self.geography.fingerprint());
        let resolved = match self.cache.get::<_, String>("resolve_country", &args)? {
            Some(code) => ResolvedCountry::Iso(code),
            None => {
                let code = self.resolve_iso(trimmed)?;
                self.cache.put("resolve_country", &args, &code)?;
                ResolvedCountry::Iso(code)
            }
        };

        self.memo
            .borrow_mut()
            .insert(trimmed.to_string(), resolved.clone());
        Ok(resolved)
    }

    /// 先精確比對名稱/代碼/別名，再以 Jaro-Winkler 模糊比對
    fn resolve_iso(&self, label: &str) -> Result<String> {
        let wanted = label.to_lowercase();
        if wanted.is_empty() {
            return Err(MapError::UnresolvedCountry {
                label: label.to_string(),
                candidate: None,
            });
        }

        for country in self.geography.countries() {
            let exact = country.name.to_lowercase() == wanted
                || country.alpha3.to_lowercase() == wanted
                || country.alpha2.to_lowercase() == wanted
                || country.aliases.iter().any(|a| a.to_lowercase() == wanted);
            if exact {
                return Ok(country.alpha3.clone());
            }
        }

        let mut best: Option<(&str, &str, f64)> = None;
        for country in self.geography.countries() {
            let names = std::iter::once(&country.name).chain(country.aliases.iter());
            for name in names {
                let score = jaro_similarity(wanted.chars(), name.to_lowercase().chars());
                if best.map_or(true, |(_, _, top)| score > top) {
                    best = Some((country.alpha3.as_str(), name.as_str(), score));
                }
            }
        }

        match best {
            Some((code, name, score)) if score >= self.threshold => {
                tracing::debug!("Fuzzy-matched '{}' to {} ({:.2})", label, name, score);
                Ok(code.to_string())
            }
            other => Err(MapError::UnresolvedCountry {
                label: label.to_string(),
                candidate: other.map(|(_, name, score)| (name.to_string(), score)),
            }),
        }
    }

    /// 一種藥物的國家清單：去重並排序
    pub fn normalize_all<'a, I>(&self, labels: I) -> Result<Vec<ResolvedCountry>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut resolved = BTreeSet::new();
        for label in labels {
            resolved.insert(self.normalize(label)?);
        }
        Ok(resolved.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn normalizer(geo: &ReferenceGeography) -> CountryNormalizer<'_> {
        CountryNormalizer::new(geo, DEFAULT_FUZZY_THRESHOLD, DiskCache::disabled("unused"))
    }

    #[test]
    fn test_strip_annotation() {
        assert_eq!(strip_annotation("France (mainland)"), "France");
        assert_eq!(strip_annotation("  Spain  "), "Spain");
        assert_eq!(strip_annotation("United Kingdom (Northern Ireland)"), "United Kingdom");
    }

    #[test]
    fn test_european_union_sentinel() {
        let geo = ReferenceGeography::bundled().unwrap();
        let n = normalizer(&geo);
        assert_eq!(n.normalize("European Union").unwrap(), ResolvedCountry::EuropeanUnion);
        assert_eq!(n.normalize(" european UNION (centralised) ").unwrap(), ResolvedCountry::EuropeanUnion);
    }

    #[test]
    fn test_exact_alias_and_fuzzy_resolution() {
        let geo = ReferenceGeography::bundled().unwrap();
        let n = normalizer(&geo);
        assert_eq!(n.normalize("France").unwrap(), ResolvedCountry::Iso("FRA".into()));
        assert_eq!(n.normalize("Czechia").unwrap(), ResolvedCountry::Iso("CZE".into()));
        assert_eq!(n.normalize("Luxemburg").unwrap(), ResolvedCountry::Iso("LUX".into()));
        assert_eq!(n.normalize("Slovenia").unwrap(), ResolvedCountry::Iso("SVN".into()));
        assert_eq!(n.normalize("Slovakia").unwrap(), ResolvedCountry::Iso("SVK".into()));
        assert_eq!(n.normalize("Germnay").unwrap(), ResolvedCountry::Iso("DEU".into()));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let geo = ReferenceGeography::bundled().unwrap();
        let n = normalizer(&geo);
        let first = n.normalize("Portugal (Azores)").unwrap();
        let second = n.normalize("Portugal (Azores)").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_country_is_structured_error() {
        let geo = ReferenceGeography::bundled().unwrap();
        let n = normalizer(&geo);
        match n.normalize("Atlantis").unwrap_err() {
            MapError::UnresolvedCountry { label, candidate } => {
                assert_eq!(label, "Atlantis");
                assert!(candidate.is_some());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_normalize_all_dedups_and_sorts() {
        let geo = ReferenceGeography::bundled().unwrap();
        let n = normalizer(&geo);
        let resolved = n
            .normalize_all(["Germany", "France", "France (overseas)", "European Union"])
            .unwrap();
        assert_eq!(
            resolved,
            vec![
                ResolvedCountry::Iso("DEU".into()),
                ResolvedCountry::Iso("FRA".into()),
                ResolvedCountry::EuropeanUnion,
            ]
        );
    }

    #[test]
    fn test_resolution_is_written_to_disk_cache() {
        let dir = TempDir::new().unwrap();
        let geo = ReferenceGeography::bundled().unwrap();
        let cache = DiskCache::new(dir.path());
        let n = CountryNormalizer::new(&geo, DEFAULT_FUZZY_THRESHOLD, cache.clone());
        n.normalize("Holland").unwrap();

        let args = ("Holland", DEFAULT_FUZZY_THRESHOLD, geo.fingerprint());
        let cached: Option<String> = cache.get("resolve_country", &args).unwrap();
        assert_eq!(cached.as_deref(), Some("NLD"));
    }

    #[test]
    fn test_stricter_threshold_ignores_looser_cached_match() {
        let dir = TempDir::new().unwrap();
        let geo = ReferenceGeography::bundled().unwrap();
        let cache = DiskCache::new(dir.path());

        let loose = CountryNormalizer::new(&geo, 0.80, cache.clone());
        assert_eq!(loose.normalize("Germnay").unwrap(), ResolvedCountry::Iso("DEU".into()));

        let strict = CountryNormalizer::new(&geo, 0.99, cache);
        match strict.normalize("Germnay").unwrap_err() {
            MapError::UnresolvedCountry { label, candidate } => {
                assert_eq!(label, "Germnay");
                assert_eq!(candidate.map(|(name, _)| name).as_deref(), Some("Germany"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_changed_geography_ignores_cached_match() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path());
        let aliased = "name,alpha2,alpha3,eu_member,aliases\nNetherlands,NL,NLD,true,Holland\n";
        let plain = "name,alpha2,alpha3,eu_member,aliases\nNetherlands,NL,NLD,true,\nPoland,PL,POL,true,\n";

        let old_geo = ReferenceGeography::from_csv(aliased.as_bytes()).unwrap();
        let old = CountryNormalizer::new(&old_geo, 0.95, cache.clone());
        assert_eq!(old.normalize("Holland").unwrap(), ResolvedCountry::Iso("NLD".into()));

        let new_geo = ReferenceGeography::from_csv(plain.as_bytes()).unwrap();
        let new = CountryNormalizer::new(&new_geo, 0.95, cache);
        assert!(matches!(
            new.normalize("Holland"),
            Err(MapError::UnresolvedCountry { .. })
        ));
    }
}
