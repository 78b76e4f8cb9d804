use crate::domain::model::{AvailabilityReport, DrugRecord, MedicationSpec};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 建立新目錄；已存在時必須失敗
    fn create_fresh_dir(&self, path: &str)
        -> impl std::future::Future<Output = Result<()>> + Send;
    fn full_path(&self, path: &str) -> std::path::PathBuf;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Show,
    Export,
    Both,
}

impl OutputMode {
    pub fn shows(self) -> bool {
        matches!(self, OutputMode::Show | OutputMode::Both)
    }

    pub fn exports(self) -> bool {
        matches!(self, OutputMode::Export | OutputMode::Both)
    }
}

pub trait ConfigProvider: Send + Sync {
    fn source(&self) -> &str;
    fn skip_rows(&self) -> usize;
    fn output(&self) -> &str;
    fn cache_dir(&self) -> &Path;
    fn cache_enabled(&self) -> bool;
    fn fuzzy_threshold(&self) -> f64;
    fn medications(&self) -> Result<Vec<MedicationSpec>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    /// 載入資料前的檢查，設定錯誤須在此回報
    fn preflight(&self) -> Result<()> {
        Ok(())
    }
    async fn extract(&self) -> Result<Vec<DrugRecord>>;
    async fn transform(&self, data: Vec<DrugRecord>) -> Result<AvailabilityReport>;
    async fn load(&self, report: AvailabilityReport) -> Result<String>;
}

#[async_trait]
pub trait Viewer: Send + Sync {
    async fn show(&self, path: &Path) -> Result<()>;
}
