use crate::utils::error::{MapError, Result};
use crate::utils::validation::is_remote_source;
use reqwest::Client;

/// 取得來源原始位元組：URL 走 HTTP，其餘視為本機檔案
pub async fn fetch_bytes(client: &Client, source: &str) -> Result<Vec<u8>> {
    if is_remote_source(source) {
        tracing::info!("🌐 Downloading {}", source);
        let response = client.get(source).send().await?;
        tracing::debug!("HTTP response status: {}", response.status());
        let response = response.error_for_status()?;
        let bytes = response.bytes().await?;
        tracing::debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes.to_vec())
    } else {
        tracing::info!("📂 Reading {}", source);
        tokio::fs::read(source).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MapError::configuration(format!("source file '{}' does not exist", source))
            } else {
                MapError::IoError(e)
            }
        })
    }
}
