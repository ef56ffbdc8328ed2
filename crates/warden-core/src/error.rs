//! Unified error types for warden

use std::time::Duration;
use thiserror::Error;

/// Unified error type for all warden operations
#[derive(Error, Debug)]
pub enum WardenError {
    // Page driver errors
    #[error("Browser error: {0}")]
    Browser(String),

    // Degradations. Agents log these and keep going; they never surface
    // past a tick.
    #[error("Expected page structure missing: {0}")]
    StructureMissing(String),

    #[error("Action '{action}' not confirmed after {attempts} attempt(s)")]
    ActionNotConfirmed { action: String, attempts: u32 },

    #[error("Reload suppressed by guard ({}s remaining)", remaining.as_secs_f64().ceil() as u64)]
    ReloadSuppressed { remaining: Duration },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

/// Result type alias using WardenError
pub type Result<T> = std::result::Result<T, WardenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_suppressed_rounds_up() {
        let err = WardenError::ReloadSuppressed {
            remaining: Duration::from_millis(49_200),
        };
        assert_eq!(err.to_string(), "Reload suppressed by guard (50s remaining)");
    }

    #[test]
    fn test_action_not_confirmed_message() {
        let err = WardenError::ActionNotConfirmed {
            action: "start session".to_string(),
            attempts: 16,
        };
        assert!(err.to_string().contains("16 attempt(s)"));
    }
}
