//! Error types for nowcast-core
//!
//! Fetch failures stay local to the slot that failed; `LoadReport` collects
//! them so the dashboard can render whatever did load.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for nowcast operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // Backend Errors
    // ===================
    #[error("Request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Backend returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {message}")]
    Decode {
        url: String,
        message: String,
        #[source]
        source: serde_json::Error,
    },

    // ===================
    // Config Errors
    // ===================
    #[error("Failed to read config: {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config in {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    // ===================
    // Playback Errors
    // ===================
    #[error("No tokio runtime available to drive playback")]
    RuntimeUnavailable,

    // ===================
    // Export Errors
    // ===================
    #[error("Failed to write export: {path}")]
    ExportIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    /// Whether a retry might succeed (network trouble, 5xx)
    pub fn is_transient(&self) -> bool {
        match self {
            CoreError::Http { source, .. } => source.is_timeout() || source.is_connect(),
            CoreError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// How much of the dashboard a failed slot takes down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// One panel shows a failure, the rest renders
    Warning,
    /// Nothing can be charted (national forecast missing)
    Fatal,
}

/// One failed slot in a refresh
#[derive(Debug, Clone)]
pub struct LoadError {
    /// Slot name, e.g. `national_forecast`
    pub source: String,
    pub message: String,
    pub severity: ErrorSeverity,
    /// What the user can do about it
    pub suggestion: Option<String>,
}

impl LoadError {
    /// Build a warning from a fetch error, with a hint for auth and network trouble
    pub fn from_core_error(source: impl Into<String>, error: &CoreError) -> Self {
        let (message, suggestion) = match error {
            CoreError::Status { status: 401 | 403, url } => (
                format!("Not authorized for {}", url),
                Some("Set a valid token with NOWCAST_BEARER_TOKEN".to_string()),
            ),
            CoreError::Http { url, .. } => (
                format!("Backend unreachable: {}", url),
                Some("Check api_base_url and network access".to_string()),
            ),
            _ => (error.to_string(), None),
        };

        Self {
            source: source.into(),
            message,
            severity: ErrorSeverity::Warning,
            suggestion,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == ErrorSeverity::Fatal
    }
}

/// Outcome of one refresh across all slots
#[derive(Debug, Default)]
pub struct LoadReport {
    pub errors: Vec<LoadError>,
    pub slots_loaded: usize,
    pub slots_failed: usize,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: LoadError) {
        self.errors.push(error);
    }

    pub fn has_fatal_errors(&self) -> bool {
        self.errors.iter().any(LoadError::is_fatal)
    }

    /// Names of the slots that failed, in refresh order
    pub fn missing_sources(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.source.clone()).collect()
    }
}

/// Health of the data store after the last refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradedState {
    /// Every slot loaded
    Healthy,
    /// Some panels have no data
    PartialData {
        missing: Vec<String>,
        reason: String,
    },
    /// The national forecast is unavailable, nothing can be charted
    Unavailable { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_error_marks_report() {
        let err = CoreError::Status {
            url: "https://api.example/v0/solar/GB/gsp/pvlive/all".to_string(),
            status: 500,
        };
        let mut report = LoadReport::new();
        report.add_error(LoadError::from_core_error("region_pv_live", &err));
        assert!(!report.has_fatal_errors());

        let mut fatal = LoadError::from_core_error("national_forecast", &err);
        fatal.severity = ErrorSeverity::Fatal;
        report.add_error(fatal);

        assert!(report.has_fatal_errors());
        assert_eq!(
            report.missing_sources(),
            vec!["region_pv_live".to_string(), "national_forecast".to_string()]
        );
    }

    #[test]
    fn test_unauthorized_status_suggests_token() {
        let err = CoreError::Status {
            url: "https://api.example/v0/solar/GB/national/forecast".to_string(),
            status: 401,
        };
        let load = LoadError::from_core_error("national_forecast", &err);
        assert!(load.suggestion.unwrap().contains("NOWCAST_BEARER_TOKEN"));
        assert!(!err.is_transient());

        let busy = CoreError::Status {
            url: "x".to_string(),
            status: 503,
        };
        assert!(busy.is_transient());
    }
}
