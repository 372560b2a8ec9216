//! Assigns and caches stable track identities for processes, threads, and CPUs.
//!
//! Everything here is additive and idempotent: a given pid/tid/cpu is never
//! assigned more than one uid of a given role, and re-requesting an
//! already-known identity is a cache hit rather than a re-emission.

use std::collections::HashMap;
use std::io::Write;

use crate::domain::{ConverterError, CpuId, LockId, Pid, Tid, TrackUid, UidGenerator, UNKNOWN_TID};
use crate::perfetto::emitter::{
    counter_descriptor, named_descriptor, process_descriptor, thread_descriptor,
};
use crate::perfetto::PacketEmitter;

/// Recorded facts about a thread: its owning process, display name, and
/// current priority.
#[derive(Debug, Clone)]
pub struct ThreadMetadata {
    pub pid: Pid,
    pub name: String,
    pub priority: i64,
}

/// The four per-thread track uids assigned by [`IdentityRegistry::ensure_thread_tracks`].
#[derive(Debug, Clone, Copy)]
pub struct ThreadTracks {
    pub root: TrackUid,
    pub sched: TrackUid,
    pub events: TrackUid,
    pub prio: TrackUid,
}

/// Assigns and caches uids, and records thread metadata and the lock-name map.
pub struct IdentityRegistry {
    uid_gen: UidGenerator,
    merge_priorities: bool,

    cpus_parent: Option<TrackUid>,
    kernel_parent: Option<TrackUid>,
    priorities_parent: Option<TrackUid>,

    threads: HashMap<Tid, ThreadMetadata>,
    thread_tracks: HashMap<Tid, ThreadTracks>,
    process_uid: HashMap<Pid, TrackUid>,
    pid_priority_uid: HashMap<Pid, TrackUid>,

    cpu_tracks: HashMap<CpuId, (TrackUid, u64)>,
    kernel_cpu_tracks: HashMap<CpuId, TrackUid>,

    lock_names: HashMap<LockId, String>,

    warn_unknown_threads: bool,
}

impl IdentityRegistry {
    #[must_use]
    pub fn new(merge_priorities: bool) -> Self {
        Self {
            uid_gen: UidGenerator::new(),
            merge_priorities,
            cpus_parent: None,
            kernel_parent: None,
            priorities_parent: None,
            threads: HashMap::new(),
            thread_tracks: HashMap::new(),
            process_uid: HashMap::new(),
            pid_priority_uid: HashMap::new(),
            cpu_tracks: HashMap::new(),
            kernel_cpu_tracks: HashMap::new(),
            lock_names: HashMap::new(),
            warn_unknown_threads: false,
        }
    }

    /// One-shot emission of the CPUs parent, KERNEL parent, optional
    /// Priorities parent, and the UNKNOWN sentinel thread. Must run exactly
    /// once, before any other packet referencing these uids.
    pub fn emit_initial_metadata<W: Write>(
        &mut self,
        emitter: &mut PacketEmitter<W>,
    ) -> Result<(), ConverterError> {
        let cpus_uid = self.uid_gen.next_uid();
        emitter.emit_descriptor(named_descriptor(cpus_uid, None, "CPUs"))?;
        self.cpus_parent = Some(cpus_uid);

        let kernel_uid = self.uid_gen.next_uid();
        emitter.emit_descriptor(named_descriptor(kernel_uid, None, "KERNEL"))?;
        self.kernel_parent = Some(kernel_uid);

        if !self.merge_priorities {
            let priorities_uid = self.uid_gen.next_uid();
            emitter.emit_descriptor(named_descriptor(priorities_uid, None, "Priorities"))?;
            self.priorities_parent = Some(priorities_uid);
        }

        self.threads.insert(
            UNKNOWN_TID,
            ThreadMetadata { pid: Pid(999_999_999), name: "UNKNOWN".to_string(), priority: 999 },
        );

        Ok(())
    }

    pub fn record_thread_create(&mut self, tid: Tid, pid: Pid, name: String, priority: i64) {
        self.threads.insert(tid, ThreadMetadata { pid, name, priority });
    }

    /// Update the cached current priority for a tid, used both to answer
    /// `thread_priority` and to seed the first `prio` counter sample when a
    /// thread's descriptors have not yet been emitted.
    pub fn set_priority(&mut self, tid: Tid, priority: i64) {
        if let Some(meta) = self.threads.get_mut(&tid) {
            meta.priority = priority;
        }
    }

    /// Recorded metadata for `tid`, falling back to the UNKNOWN sentinel and
    /// flagging a run-end warning when the tid was never announced.
    pub fn thread_of(&mut self, tid: Tid) -> ThreadMetadata {
        if let Some(meta) = self.threads.get(&tid) {
            return meta.clone();
        }
        self.warn_unknown_threads = true;
        self.threads.get(&UNKNOWN_TID).cloned().expect("UNKNOWN sentinel registered at startup")
    }

    #[must_use]
    pub fn has_emitted(&self, tid: Tid) -> bool {
        self.thread_tracks.contains_key(&tid)
    }

    /// Idempotent per tid. Emits the per-pid process descriptor (and, when
    /// priorities aren't merged, a per-pid priority parent) the first time a
    /// new pid is seen, then the thread's own four descriptors.
    pub fn ensure_thread_tracks<W: Write>(
        &mut self,
        tid: Tid,
        emitter: &mut PacketEmitter<W>,
    ) -> Result<ThreadTracks, ConverterError> {
        if let Some(tracks) = self.thread_tracks.get(&tid) {
            return Ok(*tracks);
        }

        let meta = self.thread_of(tid);

        let process_uid = match self.process_uid.get(&meta.pid) {
            Some(uid) => *uid,
            None => {
                let uid = self.uid_gen.next_uid();
                emitter.emit_descriptor(process_descriptor(uid, meta.pid.0, &format!("'{}'", meta.name)))?;
                self.process_uid.insert(meta.pid, uid);
                log::info!("add process: '{}' pid={}", meta.name, meta.pid.0);

                if !self.merge_priorities {
                    let pid_prio_uid = self.uid_gen.next_uid();
                    let priorities_parent =
                        self.priorities_parent.expect("emit_initial_metadata runs first");
                    emitter.emit_descriptor(named_descriptor(
                        pid_prio_uid,
                        Some(priorities_parent),
                        &format!("'{}' {}", meta.name, meta.pid.0),
                    ))?;
                    self.pid_priority_uid.insert(meta.pid, pid_prio_uid);
                }

                uid
            }
        };

        let root = self.uid_gen.next_uid();
        emitter.emit_descriptor(thread_descriptor(root, process_uid, meta.pid.0, tid.0))?;

        let sched = self.uid_gen.next_uid();
        emitter.emit_descriptor(named_descriptor(sched, Some(root), "sched"))?;

        let events = self.uid_gen.next_uid();
        emitter.emit_descriptor(named_descriptor(events, Some(root), "events"))?;

        let prio = self.uid_gen.next_uid();
        let prio_parent = if self.merge_priorities {
            root
        } else {
            *self.pid_priority_uid.get(&meta.pid).expect("pid priority parent just ensured")
        };
        emitter.emit_descriptor(counter_descriptor(prio, prio_parent, "prio", "prio"))?;

        log::info!("add thread: tid={} pid={} prio={}", tid.0, meta.pid.0, meta.priority);

        let tracks = ThreadTracks { root, sched, events, prio };
        self.thread_tracks.insert(tid, tracks);
        Ok(tracks)
    }

    /// Idempotent; on first sight emits a descriptor parented under the
    /// CPUs track. Returns the virtual-thread track uid and its flow id.
    pub fn ensure_cpu<W: Write>(
        &mut self,
        cpu: CpuId,
        emitter: &mut PacketEmitter<W>,
    ) -> Result<(TrackUid, u64), ConverterError> {
        if let Some(existing) = self.cpu_tracks.get(&cpu) {
            return Ok(*existing);
        }
        let uid = self.uid_gen.next_uid();
        let flow_uid = self.uid_gen.next_uid();
        let parent = self.cpus_parent.expect("emit_initial_metadata runs first");
        emitter.emit_descriptor(named_descriptor(uid, Some(parent), &format!("CPU {}", cpu.0)))?;
        self.cpu_tracks.insert(cpu, (uid, flow_uid.0));
        Ok((uid, flow_uid.0))
    }

    /// Idempotent; on first sight emits a descriptor parented under KERNEL.
    pub fn ensure_kernel_cpu<W: Write>(
        &mut self,
        cpu: CpuId,
        emitter: &mut PacketEmitter<W>,
    ) -> Result<TrackUid, ConverterError> {
        if let Some(uid) = self.kernel_cpu_tracks.get(&cpu) {
            return Ok(*uid);
        }
        let uid = self.uid_gen.next_uid();
        let parent = self.kernel_parent.expect("emit_initial_metadata runs first");
        emitter.emit_descriptor(named_descriptor(uid, Some(parent), &format!("CPU {}", cpu.0)))?;
        self.kernel_cpu_tracks.insert(cpu, uid);
        Ok(uid)
    }

    pub fn record_lock_name(&mut self, lock_id: LockId, name: String) {
        self.lock_names.insert(lock_id, name);
    }

    /// The lock's human-readable name, or `0x<hex lock_id>` if never announced.
    #[must_use]
    pub fn lock_name(&self, lock_id: LockId) -> String {
        self.lock_names.get(&lock_id).cloned().unwrap_or_else(|| lock_id.to_string())
    }

    #[must_use]
    pub fn any_unknown_threads(&self) -> bool {
        self.warn_unknown_threads
    }
}
