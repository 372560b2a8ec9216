//! Orchestrates per-event dispatch across identity assignment, synthetic
//! slice reconstruction, and packet emission — the sixth and top-level
//! cooperating component.

use std::collections::HashMap;
use std::io::Write;

use crate::clock::ClockNormalizer;
use crate::domain::{ConverterError, CpuId, LockId, OutputNanos, Pid, Tid, TrackUid, KERNEL_TID};
use crate::event_source::EventMessage;
use crate::identity::IdentityRegistry;
use crate::perfetto::proto::TrackEventType;
use crate::perfetto::PacketEmitter;
use crate::slices::{classify, Phase, SyntheticKind, SyntheticSliceBuilder};
use crate::syscalls::syscall_name;

pub struct ConverterCore {
    identity: IdentityRegistry,
    slices: SyntheticSliceBuilder,
    clock: ClockNormalizer,
    first_event: bool,
    prev_cpu_slice: HashMap<CpuId, String>,
    prev_running_sched_uid: HashMap<CpuId, TrackUid>,
}

impl ConverterCore {
    #[must_use]
    pub fn new(merge_priorities: bool) -> Self {
        Self {
            identity: IdentityRegistry::new(merge_priorities),
            slices: SyntheticSliceBuilder::new(),
            clock: ClockNormalizer::new(),
            first_event: true,
            prev_cpu_slice: HashMap::new(),
            prev_running_sched_uid: HashMap::new(),
        }
    }

    /// Whether any event referenced a tid never announced via `thread_create`.
    #[must_use]
    pub fn any_unknown_threads(&self) -> bool {
        self.identity.any_unknown_threads()
    }

    pub fn process_event<W: Write>(
        &mut self,
        event: EventMessage,
        emitter: &mut PacketEmitter<W>,
    ) -> Result<(), ConverterError> {
        let ts = self.clock.to_output_ns(event.clock_snapshot, &event.clock_class)?;
        let tid = event.tid.map(Tid).unwrap_or(KERNEL_TID);
        let cpu = CpuId(event.cpu);
        let name = event.name.as_str();

        if self.first_event {
            self.identity.emit_initial_metadata(emitter)?;
            self.first_event = false;
        }

        if name == "thread_create" {
            let pid = Pid(event.payload.require_int("pid", name, tid)?);
            let thread_name = event.payload.require_str("name", name, tid)?.to_string();
            let prio = event.payload.require_int("prio", name, tid)?;
            self.identity.record_thread_create(tid, pid, thread_name, prio);
            return Ok(());
        }

        if tid != KERNEL_TID && !self.identity.has_emitted(tid) {
            let tracks = self.identity.ensure_thread_tracks(tid, emitter)?;
            let meta = self.identity.thread_of(tid);
            emitter.emit_track_event(
                ts,
                tracks.prio,
                TrackEventType::Counter,
                None,
                vec![],
                Some(meta.priority),
            )?;
        }

        match name {
            "thread_priority" => {
                let prio = event.payload.require_int("priority", name, tid)?;
                self.identity.set_priority(tid, prio);
                let tracks = self.identity.ensure_thread_tracks(tid, emitter)?;
                emitter.emit_track_event(
                    ts,
                    tracks.prio,
                    TrackEventType::Counter,
                    None,
                    vec![],
                    Some(prio),
                )?;
                return Ok(());
            }
            "lock_name" => {
                let lid = LockId(event.payload.require_int("lid", name, tid)?);
                let lock_name = event.payload.require_str("name", name, tid)?.to_string();
                self.identity.record_lock_name(lid, lock_name);
                return Ok(());
            }
            _ => {}
        }

        let mut event_name = name.to_string();
        let mut flow_ids = Vec::new();
        let mut shift_ns = false;
        let mut track_override = None;
        let mut update_cpu = false;
        let synthetic = classify(name);

        if let Some((kind, phase)) = synthetic {
            event_name = kind.base_name().to_string();
            match kind {
                SyntheticKind::Syscall => {
                    let n = event.payload.require_int("n", name, tid)?;
                    event_name = format!("syscall:{}", syscall_name(n)?);
                }
                SyntheticKind::Interrupt => {
                    let irq = event.payload.require_int("irq", name, tid)?;
                    event_name = format!("irq:{irq}");
                }
                SyntheticKind::LockSet => {
                    let lid = LockId(event.payload.require_int("lid", name, tid)?);
                    event_name = format!("lockSet:{}", self.identity.lock_name(lid));
                }
                SyntheticKind::Locked => {
                    let lid = event.payload.require_int("lid", name, tid)?;
                    event_name = format!("locked:{}", self.identity.lock_name(LockId(lid)));
                    flow_ids.push(lid as u64);
                    if phase == Phase::Begin {
                        shift_ns = true;
                    }
                }
                SyntheticKind::Sched => {}
                SyntheticKind::Runnable => {
                    if tid != KERNEL_TID {
                        let tracks = self.identity.ensure_thread_tracks(tid, emitter)?;
                        track_override = Some(tracks.sched);
                    }
                    if phase == Phase::End {
                        update_cpu = true;
                    }
                }
            }
        } else if name == "thread_end" {
            for (closed_name, track_uuid, closed_flow_ids) in self.slices.force_close(tid) {
                emitter.emit_track_event(
                    ts,
                    track_uuid,
                    TrackEventType::SliceEnd,
                    Some(closed_name),
                    closed_flow_ids,
                    None,
                )?;
            }
        } else if name.contains("lock_") {
            let lid = LockId(event.payload.require_int("lid", name, tid)?);
            event_name = format!("{name}({})", self.identity.lock_name(lid));
        }

        let track_uuid = if tid == KERNEL_TID {
            self.identity.ensure_kernel_cpu(cpu, emitter)?
        } else if let Some(track) = track_override {
            track
        } else {
            self.identity.ensure_thread_tracks(tid, emitter)?.events
        };

        let timestamp = if shift_ns { ts.plus_one() } else { ts };

        if let Some((_, Phase::End)) = synthetic {
            if !self.slices.try_pop_end(tid, &event_name) {
                // e.g. thread_scheduling without a prior thread_waking: dropped so
                // viewers don't render an end with no matching begin.
                if update_cpu {
                    self.update_cpu_virtual_thread(ts, cpu, tid, emitter)?;
                }
                return Ok(());
            }
        }

        let event_type = match synthetic {
            Some((_, Phase::Begin)) => TrackEventType::SliceBegin,
            Some((_, Phase::End)) => TrackEventType::SliceEnd,
            None => TrackEventType::Instant,
        };

        emitter.emit_track_event(
            timestamp,
            track_uuid,
            event_type,
            Some(event_name.clone()),
            flow_ids.clone(),
            None,
        )?;

        if let Some((_, Phase::Begin)) = synthetic {
            self.slices.push_begin(tid, &event_name, track_uuid, flow_ids);
        }

        if update_cpu {
            self.update_cpu_virtual_thread(ts, cpu, tid, emitter)?;
        }

        Ok(())
    }

    /// On a `runnable` end, closes the previous occupant's slice on the
    /// per-cpu virtual track (if different) and opens a new one, then
    /// mirrors the switch onto the new occupant's own `sched` track.
    fn update_cpu_virtual_thread<W: Write>(
        &mut self,
        ts: OutputNanos,
        cpu: CpuId,
        tid: Tid,
        emitter: &mut PacketEmitter<W>,
    ) -> Result<(), ConverterError> {
        let meta = self.identity.thread_of(tid);
        let slice_name = format!("{} {}", meta.name, tid.0);

        let (cpu_uid, _flow_id) = self.identity.ensure_cpu(cpu, emitter)?;

        if self.prev_cpu_slice.get(&cpu) == Some(&slice_name) {
            return Ok(());
        }

        if self.prev_cpu_slice.contains_key(&cpu) {
            emitter.emit_track_event(ts, cpu_uid, TrackEventType::SliceEnd, None, vec![], None)?;
        }
        emitter.emit_track_event(
            ts,
            cpu_uid,
            TrackEventType::SliceBegin,
            Some(slice_name.clone()),
            vec![],
            None,
        )?;
        self.prev_cpu_slice.insert(cpu, slice_name);

        self.update_running_thread(ts, cpu, tid, emitter)?;
        Ok(())
    }

    /// Closes the previous occupant's `running:cpu<N>` slice on its own
    /// `sched` track and opens a new one on the new occupant's `sched`
    /// track, carrying the cpu's flow id so the two timelines correlate.
    fn update_running_thread<W: Write>(
        &mut self,
        ts: OutputNanos,
        cpu: CpuId,
        tid: Tid,
        emitter: &mut PacketEmitter<W>,
    ) -> Result<(), ConverterError> {
        if let Some(prev_sched_uid) = self.prev_running_sched_uid.remove(&cpu) {
            emitter.emit_track_event(
                ts,
                prev_sched_uid,
                TrackEventType::SliceEnd,
                None,
                vec![],
                None,
            )?;
        }

        let (_, flow_id) = self.identity.ensure_cpu(cpu, emitter)?;
        let tracks = self.identity.ensure_thread_tracks(tid, emitter)?;
        emitter.emit_track_event(
            ts.plus_one(),
            tracks.sched,
            TrackEventType::SliceBegin,
            Some(format!("running:cpu{}", cpu.0)),
            vec![flow_id],
            None,
        )?;
        self.prev_running_sched_uid.insert(cpu, tracks.sched);
        Ok(())
    }
}
