//! 明確的磁碟快取：鍵為函式名稱 + 參數 (JSON) 的 SHA-256。
//!
//! 不會自動失效，只能以 [`DiskCache::clear`] 手動清除。

use crate::utils::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
    enabled: bool,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            enabled: true,
        }
    }

    pub fn disabled(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            enabled: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn key<A: Serialize + ?Sized>(function: &str, args: &A) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(function.as_bytes());
        hasher.update([0u8]);
        hasher.update(serde_json::to_vec(args)?);
        Ok(hex::encode(hasher.finalize()))
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    pub fn get<A, T>(&self, function: &str, args: &A) -> Result<Option<T>>
    where
        A: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if !self.enabled {
            return Ok(None);
        }

        let key = Self::key(function, args)?;
        let path = self.entry_path(&key);
        if !path.exists() {
            tracing::debug!("Cache miss: {} ({})", function, &key[..12]);
            return Ok(None);
        }

        let data = fs::read(&path)?;
        match serde_json::from_slice(&data) {
            Ok(value) => {
                tracing::debug!("Cache hit: {} ({})", function, &key[..12]);
                Ok(Some(value))
            }
            Err(e) => {
                tracing::warn!("⚠️ Ignoring corrupt cache entry {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    pub fn put<A, T>(&self, function: &str, args: &A, value: &T) -> Result<()>
    where
        A: Serialize + ?Sized,
        T: Serialize + ?Sized,
    {
        if !self.enabled {
            return Ok(());
        }

        let key = Self::key(function, args)?;
        fs::create_dir_all(&self.root)?;
        fs::write(self.entry_path(&key), serde_json::to_vec(value)?)?;
        Ok(())
    }

    /// 刪除所有快取項目，回傳刪除數量
    pub fn clear(&self) -> Result<usize> {
        if !self.root.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        tracing::info!("🧹 Cleared {} cache entries from {}", removed, self.root.display());
        Ok(removed)
    }
}
