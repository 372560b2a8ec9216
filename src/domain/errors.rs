//! Structured error types for the converter
//!
//! Using thiserror for automatic Display implementation and error chaining.

use thiserror::Error;

use super::types::Tid;

/// Errors that can terminate a conversion run.
///
/// All variants here are fatal: the pipeline has no retry logic, so any of
/// these aborts the run with a non-zero exit status. Recoverable omissions
/// (unknown tids) are tracked separately as a summary warning, not surfaced
/// as an error.
#[derive(Error, Debug)]
pub enum ConverterError {
    #[error("event source failed while reading {path}: {source}")]
    EventSourceFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "clock assumption violated: expected monotonic clock at 1000000 Hz, got {class} at {frequency} Hz"
    )]
    ClockAssumptionViolated { class: String, frequency: u64 },

    #[error("event {event_name:?} on {tid} is missing required field {field:?}")]
    MissingPayloadField { event_name: String, tid: Tid, field: String },

    #[error("syscall index {0} is out of range for the {1}-entry syscall table")]
    SyscallIndexOutOfRange(i64, usize),

    #[error("failed to open output file {path}: {source}")]
    OutputOpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write output: {0}")]
    OutputWriteFailed(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_display() {
        let err = ConverterError::MissingPayloadField {
            event_name: "syscall_enter".to_string(),
            tid: Tid(7),
            field: "n".to_string(),
        };
        assert!(err.to_string().contains("syscall_enter"));
        assert!(err.to_string().contains("tid:7"));
    }

    #[test]
    fn test_clock_assumption_display() {
        let err =
            ConverterError::ClockAssumptionViolated { class: "wall".to_string(), frequency: 1000 };
        assert!(err.to_string().contains("wall"));
        assert!(err.to_string().contains("1000"));
    }
}
