//! Error types for Cheatsheet Composer
//!
//! This module defines all custom error types used throughout the application.
//! Error types are organized by category so that policy refusals, export
//! failures and configuration problems stay distinguishable.

use std::path::PathBuf;
use thiserror::Error;

/// Refused column operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColumnError {
    /// The addressed column does not exist
    #[error("Column {index} does not exist (have {len} columns)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Removing would leave the store without any column
    #[error("At least one column must remain")]
    MinimumColumns,
}

/// Errors raised by an isolated rendering surface
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// The surface could not be created
    #[error("Could not create rendering surface: {0}")]
    CreateFailed(String),

    /// The surface exists but its content handle is unavailable
    #[error("Rendering surface content is unavailable")]
    ContentUnavailable,

    /// The print side effect could not be started
    #[error("Could not open print dialog: {0}")]
    PrintFailed(String),

    /// I/O failure while materializing or removing the surface
    #[error("Surface I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors of a single export attempt
#[derive(Error, Debug)]
pub enum ExportError {
    /// Surface creation or materialization failed
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    /// The surface went away before it signalled it finished loading
    #[error("Export document never finished loading")]
    LoadAborted,

    /// The export task stopped before completing
    #[error("Export was interrupted: {0}")]
    Interrupted(String),
}

/// Configuration related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error loading configuration file
    #[error("Could not load configuration: {path}")]
    LoadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error saving configuration
    #[error("Could not save configuration: {path}")]
    SaveError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing configuration
    #[error("Invalid configuration format: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Invalid configuration value
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// Configuration directory error
    #[error("Could not access configuration directory")]
    DirectoryError,
}

/// Result type alias for column operations
pub type ColumnResult<T> = Result<T, ColumnError>;

/// Result type alias for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ColumnError {
    /// Create a user-friendly message suitable for a status line
    pub fn user_message(&self) -> String {
        match self {
            ColumnError::IndexOutOfRange { index, .. } => {
                format!("Column {} no longer exists.", index + 1)
            }
            ColumnError::MinimumColumns => {
                "The last column cannot be removed.".to_string()
            }
        }
    }
}

impl ExportError {
    /// Create a user-friendly error message suitable for display in dialogs
    pub fn user_message(&self) -> String {
        match self {
            ExportError::Surface(SurfaceError::CreateFailed(_))
            | ExportError::Surface(SurfaceError::ContentUnavailable) => {
                "Could not prepare the document for printing. Nothing was printed.".to_string()
            }
            ExportError::Surface(SurfaceError::PrintFailed(_)) => {
                "The print dialog could not be opened.".to_string()
            }
            ExportError::LoadAborted => {
                "The document stopped loading before it could be printed.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_error_display() {
        let err = ColumnError::IndexOutOfRange { index: 4, len: 3 };
        assert_eq!(err.to_string(), "Column 4 does not exist (have 3 columns)");
        assert!(err.user_message().contains("Column 5"));
    }

    #[test]
    fn test_export_error_user_message() {
        let err = ExportError::from(SurfaceError::ContentUnavailable);
        assert!(err.user_message().contains("Nothing was printed"));
    }

    #[test]
    fn test_surface_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ExportError = SurfaceError::from(io_err).into();
        assert!(err.to_string().contains("gone"));
    }
}
