use crate::adapters::viewer::SystemViewer;
use crate::config::medications::validate_medications;
use crate::core::geography::ReferenceGeography;
use crate::core::loader::Loader;
use crate::core::normalizer::CountryNormalizer;
use crate::core::{aggregator, filter, render};
use crate::domain::model::{AvailabilityReport, DrugRecord, MedicationCountries};
use crate::domain::ports::{ConfigProvider, OutputMode, Pipeline, Storage, Viewer};
use crate::utils::cache::DiskCache;
use crate::utils::error::Result;
use crate::utils::validation::validate_range;
use reqwest::Client;
use std::sync::Arc;

pub const HTML_FILE: &str = "adhd_map.html";
pub const FIGURE_FILE: &str = "adhd_map.json";
pub const REPORT_FILE: &str = "availability.json";

pub struct MapPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    pub(crate) client: Client,
    geography: ReferenceGeography,
    cache: DiskCache,
    viewer: Arc<dyn Viewer>,
}

impl<S: Storage, C: ConfigProvider> MapPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        Ok(Self::with_geography(storage, config, ReferenceGeography::bundled()?))
    }

    pub fn with_geography(storage: S, config: C, geography: ReferenceGeography) -> Self {
        let cache = if config.cache_enabled() {
            DiskCache::new(config.cache_dir())
        } else {
            DiskCache::disabled(config.cache_dir())
        };
        Self {
            storage,
            config,
            client: Client::new(),
            geography,
            cache,
            viewer: Arc::new(SystemViewer),
        }
    }

    pub fn with_viewer(mut self, viewer: Arc<dyn Viewer>) -> Self {
        self.viewer = viewer;
        self
    }

    fn output_mode(&self) -> Result<OutputMode> {
        self.config.output().parse()
    }

    async fn export(&self, report: &AvailabilityReport, figure: &serde_json::Value, html: &str) -> Result<String> {
        let run_dir = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        self.storage.create_fresh_dir(&run_dir).await?;

        self.storage
            .write_file(&format!("{}/{}", run_dir, HTML_FILE), html.as_bytes())
            .await?;
        self.storage
            .write_file(
                &format!("{}/{}", run_dir, FIGURE_FILE),
                serde_json::to_string_pretty(figure)?.as_bytes(),
            )
            .await?;
        self.storage
            .write_file(
                &format!("{}/{}", run_dir, REPORT_FILE),
                serde_json::to_string_pretty(report)?.as_bytes(),
            )
            .await?;

        for medication in &report.medications {
            let file = format!("{}/{}.svg", run_dir, render::slug(medication));
            tracing::debug!("Writing still image {}", file);
            self.storage
                .write_file(&file, render::layer_svg(report, medication).as_bytes())
                .await?;
        }

        let location = self.storage.full_path(&run_dir);
        tracing::info!(
            "💾 Exported {} layers to {}",
            report.medications.len(),
            location.display()
        );
        Ok(location.to_string_lossy().into_owned())
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for MapPipeline<S, C> {
    fn preflight(&self) -> Result<()> {
        self.output_mode()?;
        validate_range("fuzzy_threshold", self.config.fuzzy_threshold(), 0.0, 1.0)?;
        let medications = self.config.medications()?;
        validate_medications(&medications)?;
        filter::compile_all(&medications)?;
        Ok(())
    }

    async fn extract(&self) -> Result<Vec<DrugRecord>> {
        let loader = Loader::new(self.client.clone(), self.cache.clone());
        loader
            .load(self.config.source(), self.config.skip_rows())
            .await
    }

    async fn transform(&self, data: Vec<DrugRecord>) -> Result<AvailabilityReport> {
        let matchers = filter::compile_all(&self.config.medications()?)?;
        let normalizer = CountryNormalizer::new(
            &self.geography,
            self.config.fuzzy_threshold(),
            self.cache.clone(),
        );

        let mut per_medication = Vec::with_capacity(matchers.len());
        for matcher in &matchers {
            let rows = matcher.filter(&data);
            let countries =
                normalizer.normalize_all(rows.iter().map(|r| r.country.as_str()))?;
            tracing::info!(
                "💊 {}: {} rows, {} countries",
                matcher.name(),
                rows.len(),
                countries.len()
            );
            tracing::debug!(
                "{} → {}",
                matcher.name(),
                countries
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            per_medication.push(MedicationCountries {
                medication: matcher.name().to_string(),
                matched_rows: rows.len(),
                countries,
            });
        }

        let medications: Vec<String> = matchers.iter().map(|m| m.name().to_string()).collect();
        let countries = aggregator::aggregate(&medications, &per_medication, &self.geography)?;

        Ok(AvailabilityReport {
            medications,
            per_medication,
            countries,
        })
    }

    async fn load(&self, report: AvailabilityReport) -> Result<String> {
        let mode = self.output_mode()?;
        let figure = render::build_figure(&report);
        let html = render::to_html(&figure)?;

        let mut location = None;
        if mode.exports() {
            location = Some(self.export(&report, &figure, &html).await?);
        }

        if mode.shows() {
            let path = match &location {
                Some(dir) => std::path::Path::new(dir).join(HTML_FILE),
                None => {
                    let view_dir = self.cache.root().join("view");
                    tokio::fs::create_dir_all(&view_dir).await?;
                    let path = view_dir.join(HTML_FILE);
                    tokio::fs::write(&path, html.as_bytes()).await?;
                    path
                }
            };
            self.viewer.show(&path).await?;
            if location.is_none() {
                location = Some(path.to_string_lossy().into_owned());
            }
        }

        Ok(location.unwrap_or_default())
    }
}
