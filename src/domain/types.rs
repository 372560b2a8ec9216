//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent common bugs like passing a cpu id where a
//! track uid is expected, and make function signatures more expressive.

use std::fmt;

/// Thread id as carried by CTF events.
///
/// Signed because the kernel reserves [`KERNEL_TID`] as a distinguished
/// sentinel for events that originate in the kernel itself rather than a
/// specific thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tid(pub i64);

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tid:{}", self.0)
    }
}

/// Sentinel tid denoting "any kernel-mode event" (events with no `tid` payload field).
pub const KERNEL_TID: Tid = Tid(-1);

/// Sentinel tid for events that reference a thread never announced via `thread_create`.
pub const UNKNOWN_TID: Tid = Tid(999_999_999);

/// Process id as carried by CTF events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(pub i64);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid:{}", self.0)
    }
}

/// CPU core id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CpuId(pub i64);

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu:{}", self.0)
    }
}

/// Lock id as carried by lock-related event payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockId(pub i64);

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// A Perfetto track uid.
///
/// Allocated from a single monotonically increasing generator starting at
/// 42 (uids must be non-zero). Two uids are never equal unless they
/// identify the same track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackUid(pub u64);

impl fmt::Display for TrackUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uid:{}", self.0)
    }
}

/// Generator for [`TrackUid`] values, starting at 42.
#[derive(Debug, Clone)]
pub struct UidGenerator {
    next: u64,
}

impl Default for UidGenerator {
    fn default() -> Self {
        Self { next: 42 }
    }
}

impl UidGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next uid.
    pub fn next_uid(&mut self) -> TrackUid {
        let uid = TrackUid(self.next);
        self.next += 1;
        uid
    }
}

/// An output timestamp, nanoseconds since the first event in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OutputNanos(pub u64);

impl OutputNanos {
    #[must_use]
    pub fn plus_one(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for OutputNanos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_generator_starts_at_42() {
        let mut gen = UidGenerator::new();
        assert_eq!(gen.next_uid(), TrackUid(42));
        assert_eq!(gen.next_uid(), TrackUid(43));
    }

    #[test]
    fn test_tid_display() {
        assert_eq!(Tid(7).to_string(), "tid:7");
        assert_eq!(KERNEL_TID.to_string(), "tid:-1");
    }

    #[test]
    fn test_lock_id_renders_hex() {
        assert_eq!(LockId(0x10).to_string(), "0x10");
    }

    #[test]
    fn test_output_nanos_plus_one() {
        assert_eq!(OutputNanos(5).plus_one(), OutputNanos(6));
    }
}
