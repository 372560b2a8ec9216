//! Recognizes begin/end event-name pairs and reconstructs durational slices.
//!
//! The RTOS emits point events (`X_enter` / `X_exit` and similar pairs)
//! which the viewer should present as a single durational slice `X`. This
//! module owns the begin/end name table and the per-thread stack of
//! currently-open slices used to detect orphaned ends and force-close
//! slices when a thread dies.

use std::collections::HashMap;

use crate::domain::{Tid, TrackUid};

/// The six synthetic slice kinds this converter reconstructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntheticKind {
    Interrupt,
    LockSet,
    Locked,
    Syscall,
    Sched,
    Runnable,
}

impl SyntheticKind {
    /// The rendered name prefix/base for this synthetic kind.
    #[must_use]
    pub fn base_name(self) -> &'static str {
        match self {
            SyntheticKind::Interrupt => "interrupt",
            SyntheticKind::LockSet => "lockSet",
            SyntheticKind::Locked => "locked",
            SyntheticKind::Syscall => "syscall",
            SyntheticKind::Sched => "sched",
            SyntheticKind::Runnable => "runnable",
        }
    }
}

/// Which half of a begin/end pair an event name matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Begin,
    End,
}

/// Look up the synthetic kind and phase for a raw event name.
///
/// The begin and end tables are disjoint in practice (no event name is
/// shared between them); if one ever were, begin wins, since it is checked
/// first here.
#[must_use]
pub fn classify(event_name: &str) -> Option<(SyntheticKind, Phase)> {
    use Phase::{Begin, End};
    use SyntheticKind::{Interrupt, Locked, LockSet, Runnable, Sched, Syscall};

    match event_name {
        "interrupt_enter" => Some((Interrupt, Begin)),
        "lock_set_enter" => Some((LockSet, Begin)),
        "lock_set_acquired" => Some((Locked, Begin)),
        "syscall_enter" => Some((Syscall, Begin)),
        "sched_enter" => Some((Sched, Begin)),
        "thread_waking" => Some((Runnable, Begin)),
        "interrupt_exit" => Some((Interrupt, End)),
        "lock_set_exit" => Some((LockSet, End)),
        "lock_clear" => Some((Locked, End)),
        "syscall_exit" => Some((Syscall, End)),
        "sched_exit" => Some((Sched, End)),
        "thread_scheduling" => Some((Runnable, End)),
        _ => None,
    }
}

/// An open slice-begin, kept around only to reconstruct a matching end
/// packet if the thread dies before a natural end arrives.
#[derive(Debug, Clone)]
struct OpenSlice {
    track_uuid: TrackUid,
    flow_ids: Vec<u64>,
}

/// Per-thread stacks of open slices, keyed by final rendered event name.
///
/// Stacks are LIFO and bounded by event nesting depth. A natural end event
/// computes its own packet content independently (from its own payload);
/// this builder is consulted only to tell a real end from an orphan, and
/// to reconstruct ends for slices still open when their thread dies.
#[derive(Debug, Default)]
pub struct SyntheticSliceBuilder {
    ongoing: HashMap<Tid, HashMap<String, Vec<OpenSlice>>>,
}

impl SyntheticSliceBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly emitted slice-begin, so later it can be matched by
    /// an end, or force-closed on thread death.
    pub fn push_begin(
        &mut self,
        tid: Tid,
        event_name: &str,
        track_uuid: TrackUid,
        flow_ids: Vec<u64>,
    ) {
        self.ongoing
            .entry(tid)
            .or_default()
            .entry(event_name.to_string())
            .or_default()
            .push(OpenSlice { track_uuid, flow_ids });
    }

    /// Attempt to pop a matching begin for an arriving end.
    ///
    /// Returns `true` if a begin was open (the end should be emitted),
    /// `false` if the stack was empty (the end is an orphan and must be
    /// silently dropped).
    pub fn try_pop_end(&mut self, tid: Tid, event_name: &str) -> bool {
        let Some(by_name) = self.ongoing.get_mut(&tid) else {
            return false;
        };
        let Some(stack) = by_name.get_mut(event_name) else {
            return false;
        };
        stack.pop().is_some()
    }

    /// Drain every still-open slice for a dying thread, returning
    /// `(event_name, track_uuid, flow_ids)` for each so the caller can
    /// emit a matching end at the thread-end timestamp.
    pub fn force_close(&mut self, tid: Tid) -> Vec<(String, TrackUid, Vec<u64>)> {
        let Some(by_name) = self.ongoing.remove(&tid) else {
            return Vec::new();
        };
        by_name
            .into_iter()
            .flat_map(|(name, stack)| {
                stack.into_iter().map(move |slice| (name.clone(), slice.track_uuid, slice.flow_ids))
            })
            .collect()
    }
}
