use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum LciError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Ingestion error: {source_id} - {message}")]
    Ingestion { source_id: String, message: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Reference data error: {table} - {message}")]
    ReferenceData { table: String, message: String },

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("Empty input: {message}")]
    EmptyInput { message: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl LciError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn ingestion(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Ingestion {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn reference_data(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReferenceData {
            table: table.into(),
            message: message.into(),
        }
    }

    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive {
            message: message.into(),
        }
    }

    pub fn empty_input(message: impl Into<String>) -> Self {
        Self::EmptyInput {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Ingestion { .. } => "INGESTION_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::ReferenceData { .. } => "REFERENCE_DATA_ERROR",
            Self::Archive { .. } => "ARCHIVE_ERROR",
            Self::EmptyInput { .. } => "EMPTY_INPUT",
            Self::Io { .. } => "IO_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Whether the run must stop. Everything else degrades to partial data.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Validation { .. })
    }
}

pub type LciResult<T> = Result<T, LciError>;

impl From<std::io::Error> for LciError {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LciError {
    fn from(error: csv::Error) -> Self {
        Self::ingestion("CSV", error.to_string())
    }
}

impl From<serde_json::Error> for LciError {
    fn from(error: serde_json::Error) -> Self {
        Self::archive(error.to_string())
    }
}

impl From<config::ConfigError> for LciError {
    fn from(error: config::ConfigError) -> Self {
        Self::configuration(error.to_string())
    }
}

impl From<lci_models::UnitTableError> for LciError {
    fn from(error: lci_models::UnitTableError) -> Self {
        Self::reference_data("units", error.to_string())
    }
}
