//! Domain model for the converter
//!
//! This module contains core domain types and errors that provide:
//! - Compile-time safety via newtype pattern
//! - Self-documenting function signatures
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use errors::ConverterError;
pub use types::{
    CpuId, LockId, OutputNanos, Pid, Tid, TrackUid, UidGenerator, KERNEL_TID, UNKNOWN_TID,
};
