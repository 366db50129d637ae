//! Sync error types.

use std::path::PathBuf;

use thiserror::Error;
use untiscal_core::FutureFetchError;
use untiscal_providers::ProviderError;

use crate::config::ConfigError;

/// Result type for CLI operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The timetable source failed.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The future semester is needed but could not be fetched.
    #[error(transparent)]
    FutureFetch(#[from] FutureFetchError),

    /// Reading input or writing the calendar failed.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An offline input file could not be parsed.
    #[error("invalid input {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SyncError {
    /// Wraps an IO error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn display_messages() {
        let err = SyncError::io("docs/calendar.ics", std::io::Error::other("disk full"));
        insta::assert_snapshot!(err, @"IO error on docs/calendar.ics: disk full");

        let err = SyncError::from(FutureFetchError {
            switch_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            reason: "timeout".to_string(),
        });
        insta::assert_snapshot!(err, @"future timetable required from 2024-02-01 but unavailable: timeout");

        let err = SyncError::from(ConfigError::Missing("webuntis.server"));
        assert!(err.to_string().starts_with("configuration error: "));
    }
}
