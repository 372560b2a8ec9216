//! Production [`super::EventSource`] backed by a decoded CTF trace directory.
//!
//! The actual CTF container format is not parsed here (see the module-level
//! doc on `event_source`): this reader consumes the external collaborator's
//! pre-decoded output, one JSON object per line, from `events.jsonl` inside
//! the given trace directory.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::{ClockClass, EventMessage, EventPayload, EventSource};
use crate::domain::ConverterError;

#[derive(Debug, Deserialize)]
struct WireEvent {
    name: String,
    ts: u64,
    clock_class: String,
    clock_freq: u64,
    cpu: i64,
    #[serde(default)]
    tid: Option<i64>,
    #[serde(default)]
    payload: serde_json::Map<String, Value>,
}

/// Reads `<trace_dir>/events.jsonl`, one decoded CTF event per line.
#[derive(Debug)]
pub struct CtfDirEventSource {
    path: String,
    lines: Lines<BufReader<File>>,
}

impl CtfDirEventSource {
    /// Open `events.jsonl` inside `trace_dir`.
    pub fn open(trace_dir: &Path) -> Result<Self, ConverterError> {
        let events_path = trace_dir.join("events.jsonl");
        let file = File::open(&events_path).map_err(|source| ConverterError::EventSourceFailed {
            path: events_path.display().to_string(),
            source,
        })?;
        Ok(Self { path: events_path.display().to_string(), lines: BufReader::new(file).lines() })
    }
}

fn lower_payload(raw: serde_json::Map<String, Value>) -> EventPayload {
    let mut payload = EventPayload::new();
    for (key, value) in raw {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    payload.insert_int(key, i);
                }
            }
            Value::String(s) => payload.insert_str(key, s),
            _ => {}
        }
    }
    payload
}

impl EventSource for CtfDirEventSource {
    fn next_event(&mut self) -> Result<Option<EventMessage>, ConverterError> {
        let Some(line) = self.lines.next() else {
            return Ok(None);
        };
        let line = line.map_err(|source| ConverterError::EventSourceFailed {
            path: self.path.clone(),
            source,
        })?;
        let wire: WireEvent = serde_json::from_str(&line).map_err(|err| {
            ConverterError::EventSourceFailed {
                path: self.path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, err),
            }
        })?;

        Ok(Some(EventMessage {
            name: wire.name,
            clock_snapshot: wire.ts,
            clock_class: ClockClass { name: wire.clock_class, frequency: wire.clock_freq },
            cpu: wire.cpu,
            tid: wire.tid,
            payload: lower_payload(wire.payload),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_events_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = File::create(dir.path().join("events.jsonl")).unwrap();
        writeln!(
            file,
            r#"{{"name":"thread_create","ts":0,"clock_class":"monotonic","clock_freq":1000000,"cpu":0,"tid":7,"payload":{{"pid":1,"name":"a","prio":4}}}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"name":"syscall_enter","ts":1000,"clock_class":"monotonic","clock_freq":1000000,"cpu":0,"tid":7,"payload":{{"n":0}}}}"#
        )
        .unwrap();
        drop(file);

        let mut source = CtfDirEventSource::open(dir.path()).unwrap();
        let first = source.next_event().unwrap().unwrap();
        assert_eq!(first.name, "thread_create");
        assert_eq!(first.payload.get_int("pid"), Some(1));

        let second = source.next_event().unwrap().unwrap();
        assert_eq!(second.name, "syscall_enter");
        assert_eq!(second.clock_snapshot, 1000);

        assert!(source.next_event().unwrap().is_none());
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let err = CtfDirEventSource::open(Path::new("/does/not/exist")).unwrap_err();
        assert!(err.to_string().contains("events.jsonl"));
    }
}
