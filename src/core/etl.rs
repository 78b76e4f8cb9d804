use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("Starting map pipeline...");

        // 設定錯誤必須在載入試算表之前回報
        self.pipeline.preflight()?;

        // Extract
        tracing::info!("Extracting records...");
        let records = self.pipeline.extract().await?;
        tracing::info!("Extracted {} records", records.len());

        // Transform
        tracing::info!("Building availability...");
        let report = self.pipeline.transform(records).await?;
        let reached = report
            .countries
            .iter()
            .filter(|c| !c.medications_available.is_empty())
            .count();
        tracing::info!(
            "{} medications across {} of {} countries",
            report.medications.len(),
            reached,
            report.countries.len()
        );

        // Load
        tracing::info!("Rendering map...");
        let output = self.pipeline.load(report).await?;
        tracing::info!("Finished in {:?}", started.elapsed());

        Ok(output)
    }
}
