use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Data format error: {message}")]
    DataFormat { message: String },

    #[error("Cannot resolve country '{label}'{}", candidate_hint(.candidate))]
    UnresolvedCountry {
        label: String,
        candidate: Option<(String, f64)>,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },
}

fn candidate_hint(candidate: &Option<(String, f64)>) -> String {
    match candidate {
        Some((name, score)) => format!(" (closest: {} at {:.2})", name, score),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Data,
    Network,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    High,
    Critical,
}

impl MapError {
    pub fn data_format(message: impl Into<String>) -> Self {
        MapError::DataFormat {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        MapError::Configuration {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            MapError::Configuration { .. }
            | MapError::InvalidConfigValue { .. }
            | MapError::TomlError(_) => ErrorCategory::Configuration,
            MapError::DataFormat { .. }
            | MapError::UnresolvedCountry { .. }
            | MapError::CsvError(_)
            | MapError::XmlError(_)
            | MapError::ZipError(_)
            | MapError::SerializationError(_) => ErrorCategory::Data,
            MapError::HttpError(_) => ErrorCategory::Network,
            MapError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Network | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 依錯誤類別決定的結束碼
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration => 1,
            ErrorCategory::Data => 2,
            ErrorCategory::Network | ErrorCategory::System => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            MapError::DataFormat { .. } => {
                "Check --skip-rows and that the sheet still has the 'Active substance' and 'Product authorisation country' headers"
            }
            MapError::UnresolvedCountry { .. } => {
                "Add the label as an alias in data/countries.csv or lower --fuzzy-threshold"
            }
            MapError::Configuration { .. } | MapError::InvalidConfigValue { .. } => {
                "Fix the command-line arguments or the medication file and run again"
            }
            MapError::TomlError(_) => "Check the medication file syntax",
            MapError::HttpError(_) => "Check the network connection or use a local copy with --source",
            MapError::ZipError(_) | MapError::XmlError(_) | MapError::CsvError(_) => {
                "Make sure the source is a valid .xlsx or .csv file"
            }
            MapError::SerializationError(_) => "Clear the cache with --clear-cache and run again",
            MapError::IoError(_) => "Check file permissions and that the output directory does not already exist",
        }
    }
}

pub type Result<T> = std::result::Result<T, MapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_country_message_includes_candidate() {
        let err = MapError::UnresolvedCountry {
            label: "Frnace".to_string(),
            candidate: Some(("France".to_string(), 0.81)),
        };
        assert_eq!(
            err.to_string(),
            "Cannot resolve country 'Frnace' (closest: France at 0.81)"
        );
        assert_eq!(err.category(), ErrorCategory::Data);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_configuration_errors_exit_with_one() {
        let err = MapError::configuration("bad mode");
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }
}
