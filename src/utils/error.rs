use thiserror::Error;

#[derive(Error, Debug)]
pub enum SerialError {
    #[error("Serial does not fit in {max} characters (got {length})")]
    LengthOverflow { length: usize, max: usize },

    #[error("Storage unavailable: {0}")]
    ConnectivityError(#[from] rusqlite::Error),

    #[error("Row {line} of sheet {sheet} rejected: {message}")]
    RowImportError {
        sheet: String,
        line: usize,
        message: String,
    },

    #[error("Commit failed around row {line} of sheet {sheet}: {message}")]
    BatchCommitError {
        sheet: String,
        line: usize,
        message: String,
    },

    #[error("Notification request failed: {0}")]
    NotifierError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Access denied: {message}")]
    Unauthorized { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Storage,
    Network,
    Configuration,
    Access,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SerialError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SerialError::LengthOverflow { .. }
            | SerialError::RowImportError { .. }
            | SerialError::CsvError(_) => ErrorCategory::Input,
            SerialError::ConnectivityError(_)
            | SerialError::BatchCommitError { .. }
            | SerialError::IoError(_) => ErrorCategory::Storage,
            SerialError::NotifierError(_) => ErrorCategory::Network,
            SerialError::ConfigValidationError { .. }
            | SerialError::InvalidConfigValueError { .. }
            | SerialError::MissingConfigError { .. } => ErrorCategory::Configuration,
            SerialError::Unauthorized { .. } => ErrorCategory::Access,
            SerialError::SerializationError(_) | SerialError::ProcessingError { .. } => {
                ErrorCategory::Processing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單筆資料錯誤，不影響整批
            SerialError::LengthOverflow { .. } | SerialError::RowImportError { .. } => {
                ErrorSeverity::Low
            }
            SerialError::BatchCommitError { .. } | SerialError::NotifierError(_) => {
                ErrorSeverity::Medium
            }
            SerialError::CsvError(_)
            | SerialError::SerializationError(_)
            | SerialError::ProcessingError { .. }
            | SerialError::Unauthorized { .. }
            | SerialError::ConfigValidationError { .. }
            | SerialError::InvalidConfigValueError { .. }
            | SerialError::MissingConfigError { .. } => ErrorSeverity::High,
            SerialError::ConnectivityError(_) | SerialError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Check the serial or the sheet row and submit it again",
            ErrorCategory::Storage => "Check that the database file exists and is writable",
            ErrorCategory::Network => "Check the notifier endpoint and API key",
            ErrorCategory::Configuration => "Fix the configuration file and run again",
            ErrorCategory::Access => "Check the credentials or API key",
            ErrorCategory::Processing => "Inspect the input files for malformed content",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SerialError::LengthOverflow { max, .. } => {
                format!("The serial is longer than {} characters", max)
            }
            SerialError::ConnectivityError(_) => "The serial database is unavailable".to_string(),
            SerialError::Unauthorized { .. } => "Access denied".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SerialError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_of_row_and_storage_errors() {
        let row = SerialError::RowImportError {
            sheet: "SERIALS".to_string(),
            line: 4,
            message: "missing start serial".to_string(),
        };
        assert_eq!(row.severity(), ErrorSeverity::Low);
        assert_eq!(row.category(), ErrorCategory::Input);

        let storage = SerialError::ConnectivityError(rusqlite::Error::InvalidQuery);
        assert_eq!(storage.severity(), ErrorSeverity::Critical);
        assert_eq!(
            storage.user_friendly_message(),
            "The serial database is unavailable"
        );
    }
}
