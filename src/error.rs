//! Error types for capture setup and stream control.
//!
//! Steady-state byte processing never fails: malformed deliveries, frame
//! underruns and audio tears are resolved locally and reported through
//! outcome values. [`CaptureError`] covers the operations that can fail
//! hard, mostly at setup time.
//!
//! ## Error Categories
//!
//! - **Resource Errors**: buffer or PCM ring allocation failed
//! - **State Errors**: geometry change while busy, double start, missing device
//! - **Ownership Errors**: a buffer handed back in the wrong lifecycle state
//! - **Configuration Errors**: invalid or unreadable configuration
//!
//! ## Recovery
//!
//! ```rust
//! use easycap::CaptureError;
//!
//! let error = CaptureError::busy("frame height change");
//! assert!(!error.is_fatal());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::collections::TryReserveError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for capture operations.
pub type Result<T, E = CaptureError> = std::result::Result<T, E>;

/// Main error type for capture operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CaptureError {
    #[error("Failed to allocate {bytes} bytes for {context}")]
    Allocation {
        context: String,
        bytes: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("Cannot change {operation} while buffers are claimed")]
    Busy { operation: String },

    #[error("Input {index} out of range ({available} inputs)")]
    InvalidInput { index: usize, available: usize },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Buffer {handle} is {actual}, expected {expected}")]
    InvalidTransition { handle: usize, expected: &'static str, actual: &'static str },

    #[error("Buffer {handle} does not belong to this pool")]
    UnknownBuffer { handle: usize },

    #[error("Stream is already running")]
    AlreadyStreaming,

    #[error("Capture device is not connected")]
    NoDevice,

    #[error("Configuration parse error: {context}")]
    Config {
        context: String,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("Configuration file error: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CaptureError {
    /// Whether the error prevents the stream from running at all.
    pub fn is_fatal(&self) -> bool {
        match self {
            CaptureError::Allocation { .. } => true,
            CaptureError::NoDevice => true,
            CaptureError::Config { .. } => true,
            CaptureError::Io { .. } => true,
            CaptureError::InvalidConfig { .. } => true,
            CaptureError::Busy { .. } => false,
            CaptureError::InvalidInput { .. } => false,
            CaptureError::InvalidTransition { .. } => false,
            CaptureError::UnknownBuffer { .. } => false,
            CaptureError::AlreadyStreaming => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            CaptureError::Allocation { .. } => vec![
                "Request fewer or smaller buffers",
                "Reduce the PCM period size or period count",
                "Check available system memory",
            ],
            CaptureError::Busy { .. } => vec![
                "Stop the stream before changing geometry",
                "Drain completed buffers and stop recycling them",
            ],
            CaptureError::InvalidInput { .. } => {
                vec!["List inputs for the device model", "Check the product id"]
            }
            CaptureError::InvalidConfig { .. } => vec![
                "Check audio period and period count against hardware limits",
                "Check the input index against the device model",
            ],
            CaptureError::InvalidTransition { .. } | CaptureError::UnknownBuffer { .. } => vec![
                "Only recycle buffers received from a completion",
                "Do not recycle the same buffer twice",
            ],
            CaptureError::AlreadyStreaming => vec!["Call stop_stream before starting again"],
            CaptureError::NoDevice => {
                vec!["Reconnect the capture device", "Create a new stream after reconnecting"]
            }
            CaptureError::Config { .. } => {
                vec!["Check YAML syntax", "Compare against the documented configuration keys"]
            }
            CaptureError::Io { .. } => {
                vec!["Check the file exists and is readable", "Check file permissions"]
            }
        }
    }

    /// Helper constructor for allocation failures.
    pub fn allocation_failed(
        context: impl Into<String>,
        bytes: usize,
        source: TryReserveError,
    ) -> Self {
        CaptureError::Allocation { context: context.into(), bytes, source }
    }

    /// Helper constructor for operations rejected while buffers are claimed.
    pub fn busy(operation: impl Into<String>) -> Self {
        CaptureError::Busy { operation: operation.into() }
    }

    /// Helper constructor for configuration validation errors.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        CaptureError::InvalidConfig { reason: reason.into() }
    }

    /// Helper constructor for configuration file errors.
    pub fn io_error(path: PathBuf, source: std::io::Error) -> Self {
        CaptureError::Io { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reserve_failure() -> TryReserveError {
        let mut v: Vec<u8> = Vec::new();
        match v.try_reserve_exact(usize::MAX) {
            Err(e) => e,
            Ok(()) => unreachable!("reserving usize::MAX bytes cannot succeed"),
        }
    }

    #[cfg(test)]
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            operation in ".*",
            reason in ".*",
            index in 0usize..64,
            available in 0usize..8,
            bytes in 0usize..0x100000usize
          ) {
            let busy = CaptureError::busy(operation.clone());
            prop_assert!(busy.to_string().contains(&operation));

            let invalid = CaptureError::invalid_config(reason.clone());
            prop_assert!(invalid.to_string().contains(&reason));

            let input = CaptureError::InvalidInput { index, available };
            let msg = input.to_string();
            prop_assert!(msg.contains(&index.to_string()));
            prop_assert!(msg.contains(&available.to_string()));

            let alloc = CaptureError::allocation_failed("frame buffer", bytes, reserve_failure());
            prop_assert!(alloc.to_string().contains(&bytes.to_string()));
            prop_assert!(alloc.is_fatal());
          }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<CaptureError>();

        let error = CaptureError::NoDevice;
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn allocation_error_keeps_source() {
        let error = CaptureError::allocation_failed("pcm ring", 4096, reserve_failure());
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn setup_failures_are_fatal_and_control_errors_are_not() {
        assert!(CaptureError::NoDevice.is_fatal());
        assert!(CaptureError::invalid_config("periods").is_fatal());
        assert!(!CaptureError::AlreadyStreaming.is_fatal());
        assert!(!CaptureError::busy("standard").is_fatal());
        assert!(
            !CaptureError::InvalidTransition { handle: 1, expected: "a", actual: "b" }.is_fatal()
        );
    }

    #[test]
    fn recovery_suggestions_are_descriptive() {
        let errors = [
            CaptureError::NoDevice,
            CaptureError::AlreadyStreaming,
            CaptureError::busy("input"),
            CaptureError::UnknownBuffer { handle: 3 },
        ];
        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            for suggestion in suggestions {
                assert!(suggestion.len() > 5);
            }
        }
    }
}
