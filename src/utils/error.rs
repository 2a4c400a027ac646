use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("Sales table query failed: {0}")]
    RepositoryError(String),

    #[error("Spreadsheet parsing error: {0}")]
    SpreadsheetError(#[from] calamine::XlsxError),

    #[error("Workbook write error: {0}")]
    WorkbookWriteError(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Background lookup task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Column '{column}' not found in dataset")]
    MissingColumnError { column: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

impl From<rusqlite::Error> for EnrichError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => EnrichError::RepositoryError(msg),
            _ => EnrichError::RepositoryError(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for EnrichError {
    fn from(err: toml::de::Error) -> Self {
        EnrichError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Connectivity,
    Data,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EnrichError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EnrichError::ConfigError { .. }
            | EnrichError::MissingConfigError { .. }
            | EnrichError::InvalidConfigValueError { .. }
            | EnrichError::ConfigValidationError { .. }
            | EnrichError::MissingColumnError { .. } => ErrorCategory::Configuration,
            EnrichError::RepositoryError(_) | EnrichError::TaskError(_) => {
                ErrorCategory::Connectivity
            }
            EnrichError::SpreadsheetError(_)
            | EnrichError::CsvError(_)
            | EnrichError::SerializationError(_)
            | EnrichError::ProcessingError { .. } => ErrorCategory::Data,
            EnrichError::IoError(_) | EnrichError::WorkbookWriteError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Connectivity => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EnrichError::RepositoryError(_) => {
                "Check that the database file exists and contains the sales table, then retry"
                    .to_string()
            }
            EnrichError::TaskError(_) => "Retry the run; the lookup task was interrupted".to_string(),
            EnrichError::SpreadsheetError(_) | EnrichError::CsvError(_) => {
                "Make sure the input file is a valid CSV or XLSX with headers in the first row"
                    .to_string()
            }
            EnrichError::IoError(_) => {
                "Check file permissions and that the input/output paths are reachable".to_string()
            }
            EnrichError::WorkbookWriteError(_) => {
                "Close the output workbook if it is open elsewhere and check the output path"
                    .to_string()
            }
            EnrichError::MissingColumnError { column } => format!(
                "Add a '{}' column to the input file or pass --item-column with the right header",
                column
            ),
            EnrichError::MissingConfigError { field } => {
                format!("Provide a value for '{}'", field)
            }
            EnrichError::InvalidConfigValueError { field, .. }
            | EnrichError::ConfigValidationError { field, .. } => {
                format!("Fix the value of '{}' and run again", field)
            }
            EnrichError::ConfigError { .. } => "Review the configuration file".to_string(),
            EnrichError::SerializationError(_) | EnrichError::ProcessingError { .. } => {
                "Inspect the input data around the reported row".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Connectivity => format!("Could not read the sales table: {}", self),
            ErrorCategory::Data => format!("Could not process the input data: {}", self),
            ErrorCategory::Io => format!("File access failed: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EnrichError>;
