use std::fs::File;
use std::io::Write as _;

use ctf2perfetto::converter::ConverterCore;
use ctf2perfetto::event_source::{CtfDirEventSource, EventSource};
use ctf2perfetto::perfetto::{PacketEmitter, Trace, TrackEventType};
use prost::Message;

fn write_jsonl(dir: &std::path::Path, lines: &[&str]) {
    let mut file = File::create(dir.join("events.jsonl")).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
}

fn convert_dir(dir: &std::path::Path) -> (Trace, bool) {
    let mut source = CtfDirEventSource::open(dir).unwrap();
    let mut buffer = Vec::new();
    let unknown_threads;
    {
        let mut emitter = PacketEmitter::new(&mut buffer);
        let mut core = ConverterCore::new(true);
        while let Some(event) = source.next_event().unwrap() {
            core.process_event(event, &mut emitter).unwrap();
        }
        unknown_threads = core.any_unknown_threads();
        emitter.flush().unwrap();
    }
    (Trace::decode(buffer.as_slice()).unwrap(), unknown_threads)
}

/// A full thread lifecycle through a decoded CTF directory: creation, a
/// syscall slice, a scheduling slice, and a clean thread_end. Exercises the
/// whole pipeline the way the batch CLI drives it, not just the converter's
/// internals in isolation.
#[test]
fn test_thread_lifecycle_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    write_jsonl(
        dir.path(),
        &[
            r#"{"name":"thread_create","ts":0,"clock_class":"monotonic","clock_freq":1000000,"cpu":0,"tid":7,"payload":{"pid":1,"name":"main","prio":4}}"#,
            r#"{"name":"thread_waking","ts":500,"clock_class":"monotonic","clock_freq":1000000,"cpu":0,"tid":7,"payload":{}}"#,
            r#"{"name":"syscall_enter","ts":1000,"clock_class":"monotonic","clock_freq":1000000,"cpu":0,"tid":7,"payload":{"n":0}}"#,
            r#"{"name":"syscall_exit","ts":2000,"clock_class":"monotonic","clock_freq":1000000,"cpu":0,"tid":7,"payload":{"n":0}}"#,
            r#"{"name":"thread_scheduling","ts":2500,"clock_class":"monotonic","clock_freq":1000000,"cpu":0,"tid":7,"payload":{}}"#,
            r#"{"name":"thread_end","ts":3000,"clock_class":"monotonic","clock_freq":1000000,"cpu":0,"tid":7,"payload":{}}"#,
        ],
    );

    let (trace, unknown_threads) = convert_dir(dir.path());
    assert!(!unknown_threads);

    let names: Vec<_> =
        trace.packet.iter().filter_map(|p| p.track_event.as_ref()?.name.clone()).collect();
    assert!(names.contains(&"syscall:debug".to_string()));

    let process_descriptor = trace
        .packet
        .iter()
        .find_map(|p| p.track_descriptor.as_ref().filter(|d| d.process.is_some()));
    assert!(process_descriptor.is_some());
    assert_eq!(
        process_descriptor.unwrap().process.as_ref().unwrap().process_name.as_deref(),
        Some("'main'")
    );

    // No trailing unmatched slice ends after thread_end force-closes the
    // waking -> scheduling pair.
    let ends = trace
        .packet
        .iter()
        .filter(|p| p.track_event.as_ref().is_some_and(|e| e.r#type == Some(TrackEventType::SliceEnd as i32)))
        .count();
    assert!(ends >= 1);
}

/// An orphan end event (no matching begin ever seen) must not surface as a
/// dangling slice end in the emitted trace.
#[test]
fn test_orphan_end_dropped_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_jsonl(
        dir.path(),
        &[
            r#"{"name":"thread_create","ts":0,"clock_class":"monotonic","clock_freq":1000000,"cpu":0,"tid":7,"payload":{"pid":1,"name":"main","prio":4}}"#,
            r#"{"name":"thread_scheduling","ts":1000,"clock_class":"monotonic","clock_freq":1000000,"cpu":0,"tid":7,"payload":{}}"#,
        ],
    );

    let (trace, _) = convert_dir(dir.path());
    let ends = trace
        .packet
        .iter()
        .filter(|p| p.track_event.as_ref().is_some_and(|e| e.r#type == Some(TrackEventType::SliceEnd as i32)))
        .count();
    assert_eq!(ends, 0);
}

/// An event referencing a tid that was never announced via thread_create
/// still converts (falls back to an unknown-thread descriptor) and flags
/// `any_unknown_threads()` for the CLI's post-run warning.
#[test]
fn test_unknown_thread_is_flagged() {
    let dir = tempfile::tempdir().unwrap();
    write_jsonl(
        dir.path(),
        &[
            r#"{"name":"syscall_enter","ts":0,"clock_class":"monotonic","clock_freq":1000000,"cpu":0,"tid":99,"payload":{"n":0}}"#,
            r#"{"name":"syscall_exit","ts":1000,"clock_class":"monotonic","clock_freq":1000000,"cpu":0,"tid":99,"payload":{"n":0}}"#,
        ],
    );

    let (_, unknown_threads) = convert_dir(dir.path());
    assert!(unknown_threads);
}

/// lock_name arriving after the lock is already referenced by id: the
/// earlier reference falls back to a hex name, later ones resolve by name.
#[test]
fn test_lock_naming_resolves_after_late_lock_name_event() {
    let dir = tempfile::tempdir().unwrap();
    write_jsonl(
        dir.path(),
        &[
            r#"{"name":"thread_create","ts":0,"clock_class":"monotonic","clock_freq":1000000,"cpu":0,"tid":7,"payload":{"pid":1,"name":"main","prio":4}}"#,
            r#"{"name":"lock_set_enter","ts":500,"clock_class":"monotonic","clock_freq":1000000,"cpu":0,"tid":7,"payload":{"lid":255}}"#,
            r#"{"name":"lock_name","ts":600,"clock_class":"monotonic","clock_freq":1000000,"cpu":0,"tid":7,"payload":{"lid":255,"name":"biglock"}}"#,
            r#"{"name":"lock_set_enter","ts":700,"clock_class":"monotonic","clock_freq":1000000,"cpu":0,"tid":7,"payload":{"lid":255}}"#,
        ],
    );

    let (trace, _) = convert_dir(dir.path());
    let names: Vec<_> =
        trace.packet.iter().filter_map(|p| p.track_event.as_ref()?.name.clone()).collect();
    assert!(names.iter().any(|n| n.contains("0xff") || n.contains("ff")));
    assert!(names.contains(&"lockSet:biglock".to_string()));
}
