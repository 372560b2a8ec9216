//! Adapter boundary over the external CTF reader.
//!
//! Decoding the CTF binary container format is out of scope for this
//! converter (see `SPEC_FULL.md`, §1 Non-goals): that job is delegated to
//! an external CTF-reader collaborator which yields a lazy sequence of
//! decoded event messages. This module defines the shape of that sequence
//! ([`EventMessage`]) and the trait ([`EventSource`]) the converter drives,
//! plus two implementations: [`ctf_dir::CtfDirEventSource`], a thin reader
//! over the collaborator's pre-decoded newline-delimited JSON output, and
//! [`VecEventSource`], an in-memory test double.

pub mod ctf_dir;

pub use ctf_dir::CtfDirEventSource;

use std::collections::HashMap;

use crate::domain::ConverterError;

/// A single scalar payload value carried by an [`EventMessage`].
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    Int(i64),
    Str(String),
}

/// Typed, permissive access to an event's payload fields.
///
/// Replaces dynamic "ask the runtime what type this is" access with a
/// lowering type that knows only two primitive kinds (integer, string),
/// matching what the CTF reader can actually produce for the event classes
/// this converter recognizes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPayload(HashMap<String, PayloadValue>);

impl EventPayload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_int(&mut self, key: impl Into<String>, value: i64) {
        self.0.insert(key.into(), PayloadValue::Int(value));
    }

    pub fn insert_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), PayloadValue::Str(value.into()));
    }

    /// Fetch a required integer field, or a [`ConverterError::MissingPayloadField`].
    pub fn require_int(
        &self,
        key: &str,
        event_name: &str,
        tid: crate::domain::Tid,
    ) -> Result<i64, ConverterError> {
        match self.0.get(key) {
            Some(PayloadValue::Int(v)) => Ok(*v),
            _ => Err(ConverterError::MissingPayloadField {
                event_name: event_name.to_string(),
                tid,
                field: key.to_string(),
            }),
        }
    }

    /// Fetch a required string field, or a [`ConverterError::MissingPayloadField`].
    pub fn require_str(
        &self,
        key: &str,
        event_name: &str,
        tid: crate::domain::Tid,
    ) -> Result<&str, ConverterError> {
        match self.0.get(key) {
            Some(PayloadValue::Str(v)) => Ok(v.as_str()),
            _ => Err(ConverterError::MissingPayloadField {
                event_name: event_name.to_string(),
                tid,
                field: key.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(PayloadValue::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

/// The source clock's declared class, asserted once by the [`crate::clock::ClockNormalizer`].
#[derive(Debug, Clone)]
pub struct ClockClass {
    pub name: String,
    pub frequency: u64,
}

/// A single decoded CTF event, as handed to the converter by the `EventSource`.
#[derive(Debug, Clone)]
pub struct EventMessage {
    pub name: String,
    /// Monotonic clock snapshot in the source clock's native units.
    pub clock_snapshot: u64,
    pub clock_class: ClockClass,
    pub cpu: i64,
    /// `None` for kernel events (no `tid` payload field).
    pub tid: Option<i64>,
    pub payload: EventPayload,
}

/// A lazy, ordered sequence of decoded CTF events.
///
/// Implementations guarantee non-decreasing `clock_snapshot` values.
/// Failure during iteration is fatal to the whole run.
pub trait EventSource {
    /// Pull the next event, or `None` at end of input.
    fn next_event(&mut self) -> Result<Option<EventMessage>, ConverterError>;
}

/// An in-memory [`EventSource`] backed by a fixed `Vec`, used by tests.
pub struct VecEventSource {
    events: std::vec::IntoIter<EventMessage>,
}

impl VecEventSource {
    #[must_use]
    pub fn new(events: Vec<EventMessage>) -> Self {
        Self { events: events.into_iter() }
    }
}

impl EventSource for VecEventSource {
    fn next_event(&mut self) -> Result<Option<EventMessage>, ConverterError> {
        Ok(self.events.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Tid;

    #[test]
    fn test_require_int_missing_field() {
        let payload = EventPayload::new();
        let err = payload.require_int("n", "syscall_enter", Tid(7)).unwrap_err();
        assert!(err.to_string().contains("\"n\""));
    }

    #[test]
    fn test_require_int_present() {
        let mut payload = EventPayload::new();
        payload.insert_int("n", 5);
        assert_eq!(payload.require_int("n", "syscall_enter", Tid(7)).unwrap(), 5);
    }

    #[test]
    fn test_vec_event_source_yields_in_order() {
        let events = vec![
            EventMessage {
                name: "a".into(),
                clock_snapshot: 0,
                clock_class: ClockClass { name: "monotonic".into(), frequency: 1_000_000 },
                cpu: 0,
                tid: Some(7),
                payload: EventPayload::new(),
            },
            EventMessage {
                name: "b".into(),
                clock_snapshot: 1,
                clock_class: ClockClass { name: "monotonic".into(), frequency: 1_000_000 },
                cpu: 0,
                tid: Some(7),
                payload: EventPayload::new(),
            },
        ];
        let mut source = VecEventSource::new(events);
        assert_eq!(source.next_event().unwrap().unwrap().name, "a");
        assert_eq!(source.next_event().unwrap().unwrap().name, "b");
        assert!(source.next_event().unwrap().is_none());
    }
}
