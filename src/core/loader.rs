use crate::adapters::{source, xlsx};
use crate::domain::model::DrugRecord;
use crate::utils::cache::DiskCache;
use crate::utils::error::{MapError, Result};
use reqwest::Client;

pub const SUBSTANCE_HEADER: &str = "Active substance";
pub const COUNTRY_HEADER: &str = "Product authorisation country";

/// 依副檔名與內容判斷格式，回傳原始儲存格
pub fn parse_rows(data: &[u8], source: &str) -> Result<Vec<Vec<String>>> {
    let is_csv = source.to_lowercase().ends_with(".csv");
    if !is_csv && xlsx::looks_like_xlsx(data) {
        return xlsx::read_first_sheet(data);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(String::from).collect());
    }
    Ok(rows)
}

/// 標題只取第一行並去除空白
fn header_key(cell: &str) -> String {
    cell.lines().next().unwrap_or("").trim().to_lowercase()
}

/// 略過 `offset` 列後，下一列即標題列
pub fn records_from_rows(rows: Vec<Vec<String>>, offset: usize) -> Result<Vec<DrugRecord>> {
    let mut rows = rows.into_iter().skip(offset);
    let header = rows.next().ok_or_else(|| {
        MapError::data_format(format!("no header row after skipping {} rows", offset))
    })?;

    let keys: Vec<String> = header.iter().map(|cell| header_key(cell)).collect();
    let find = |name: &str| {
        let wanted = name.to_lowercase();
        keys.iter().position(|key| *key == wanted).ok_or_else(|| {
            let found: Vec<&str> = header
                .iter()
                .map(|cell| cell.lines().next().unwrap_or("").trim())
                .filter(|cell| !cell.is_empty())
                .collect();
            MapError::data_format(format!(
                "column '{}' not found after skipping {} rows (headers: {:?})",
                name, offset, found
            ))
        })
    };
    let substance_col = find(SUBSTANCE_HEADER)?;
    let country_col = find(COUNTRY_HEADER)?;

    let cell = |row: &[String], col: usize| row.get(col).map(|s| s.trim().to_string()).unwrap_or_default();

    let mut missing_country = 0usize;
    let records: Vec<DrugRecord> = rows
        .filter_map(|row| {
            let substance_name = cell(row.as_slice(), substance_col);
            let country = cell(row.as_slice(), country_col);
            if country.is_empty() {
                // 沒有國家的列無法上圖，略過而不讓整次執行失敗
                if !substance_name.is_empty() {
                    tracing::debug!("Row for '{}' has no authorisation country", substance_name);
                    missing_country += 1;
                }
                None
            } else {
                Some(DrugRecord {
                    substance_name,
                    country,
                })
            }
        })
        .collect();

    if missing_country > 0 {
        tracing::warn!("⚠️ Skipped {} rows without an authorisation country", missing_country);
    }

    tracing::debug!(
        "Parsed {} records (substance column {}, country column {})",
        records.len(),
        substance_col,
        country_col
    );
    Ok(records)
}

pub struct Loader {
    client: Client,
    cache: DiskCache,
}

impl Loader {
    pub fn new(client: Client, cache: DiskCache) -> Self {
        Self { client, cache }
    }

    pub async fn load(&self, source: &str, offset: usize) -> Result<Vec<DrugRecord>> {
        let args = (source, offset);
        if let Some(records) = self.cache.get::<_, Vec<DrugRecord>>("load_table", &args)? {
            tracing::info!("♻️ Loaded {} records for {} from cache", records.len(), source);
            return Ok(records);
        }

        let data = source::fetch_bytes(&self.client, source).await?;
        let rows = parse_rows(&data, source)?;
        let records = records_from_rows(rows, offset)?;
        tracing::info!("📄 Loaded {} records from {}", records.len(), source);

        self.cache.put("load_table", &args, &records)?;
        Ok(records)
    }
}
