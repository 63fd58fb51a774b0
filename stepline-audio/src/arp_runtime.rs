//! Arpeggiator runtime: at most one cancellable note-sequence task per track.
//!
//! Per track: Idle → Expanding → Scheduled → Idle. A new trigger first cancels
//! the live task, waits for it to exit, and sends one note-off for whatever it
//! left sounding, so a track never has two sequences alive and never keeps a
//! stuck note.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use stepline_types::{expand, ArpSequence, ArpeggioProgram, TRACK_COUNT};

use crate::client::{EngineClient, NoteOn};

/// Sending half of a cancellation pair. Cancelling (or dropping) it wakes the
/// task's current wait and makes every later check report cancelled.
pub struct CancelHandle(Sender<()>);

impl CancelHandle {
    pub fn cancel(self) {
        drop(self);
    }
}

/// Receiving half, polled by the task before each note and at each wait.
pub struct CancelToken(Receiver<()>);

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        !matches!(self.0.try_recv(), Err(TryRecvError::Empty))
    }

    /// Sleep up to `timeout`; returns `true` if cancelled while waiting.
    pub fn wait(&self, timeout: Duration) -> bool {
        !matches!(self.0.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (CancelHandle(tx), CancelToken(rx))
}

/// Per-note playback attributes shared by every note of a trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    /// 0.0-1.0
    pub velocity: f32,
    /// Fraction of the note slot the note is held for.
    pub gate: f64,
    pub synth: Option<String>,
    pub params: Vec<(&'static str, f32)>,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            velocity: 100.0 / 127.0,
            gate: 1.0,
            synth: None,
            params: Vec::new(),
        }
    }
}

impl Voice {
    pub fn note_on(&self, track: usize, notes: Vec<i32>, slot_secs: f64) -> NoteOn {
        NoteOn {
            track,
            notes,
            velocity: self.velocity,
            duration_secs: (slot_secs * self.gate).max(0.0),
            synth: self.synth.clone(),
            params: self.params.clone(),
        }
    }
}

struct ArpTask {
    id: u64,
    cancel: CancelHandle,
    join: JoinHandle<()>,
}

#[derive(Default)]
struct ArpSlot {
    task: Option<ArpTask>,
    sounding: Vec<i32>,
}

struct Shared {
    client: Arc<dyn EngineClient>,
    slots: [Mutex<ArpSlot>; TRACK_COUNT],
}

impl Shared {
    fn slot(&self, track: usize) -> MutexGuard<'_, ArpSlot> {
        self.slots[track]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: &NoteOn) {
        if let Err(e) = self.client.note_on(event) {
            log::debug!(target: "audio::arp", "note-on on track {} dropped: {}", event.track, e);
        }
    }
}

pub struct ArpRuntime {
    shared: Arc<Shared>,
    next_task_id: AtomicU64,
}

impl ArpRuntime {
    pub fn new(client: Arc<dyn EngineClient>) -> Self {
        Self {
            shared: Arc::new(Shared {
                client,
                slots: std::array::from_fn(|_| Mutex::new(ArpSlot::default())),
            }),
            next_task_id: AtomicU64::new(1),
        }
    }

    /// Play `chord` through `program`, spacing notes by `delta_secs / divisor`.
    ///
    /// An empty expansion (no program, or only skipped steps) plays the chord
    /// as one plain note-on instead.
    pub fn trigger(
        &self,
        track: usize,
        chord: &[i32],
        program: Option<&ArpeggioProgram>,
        delta_secs: f64,
        voice: &Voice,
    ) {
        if track >= TRACK_COUNT || chord.is_empty() {
            return;
        }
        self.cancel_and_flush(track);

        let sequence = program.map(|p| expand(chord, p)).unwrap_or_default();
        if sequence.is_empty() {
            self.shared.emit(&voice.note_on(track, chord.to_vec(), delta_secs));
            return;
        }

        let root = chord[0];
        let first_slot = delta_secs / sequence.divisors[0];
        self.shared.emit(&voice.note_on(track, vec![root], first_slot));
        self.shared.slot(track).sounding = vec![root];

        let id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
        let (cancel, token) = cancel_pair();
        let shared = Arc::clone(&self.shared);
        let voice = voice.clone();

        // Hold the slot while spawning so the task cannot try to release
        // itself before its handle is stored.
        let mut slot = self.shared.slot(track);
        let spawned = thread::Builder::new()
            .name(format!("arp-{}", track))
            .spawn(move || run_sequence(shared, track, id, sequence, delta_secs, voice, token));
        match spawned {
            Ok(join) => slot.task = Some(ArpTask { id, cancel, join }),
            Err(e) => log::warn!(target: "audio::arp", "could not spawn arpeggio task: {}", e),
        }
    }

    /// Play a plain note event after silencing any live arpeggio on the track.
    pub fn play(&self, track: usize, event: &NoteOn) {
        if track >= TRACK_COUNT {
            return;
        }
        self.cancel_and_flush(track);
        self.shared.emit(event);
    }

    /// Cancel the track's arpeggio and release whatever it left sounding.
    pub fn release(&self, track: usize) {
        if track < TRACK_COUNT {
            self.cancel_and_flush(track);
        }
    }

    pub fn release_all(&self) {
        for track in 0..TRACK_COUNT {
            self.cancel_and_flush(track);
        }
    }

    /// Whether an arpeggio task is alive on the track.
    pub fn is_active(&self, track: usize) -> bool {
        track < TRACK_COUNT && self.shared.slot(track).task.is_some()
    }

    pub fn sounding(&self, track: usize) -> Vec<i32> {
        if track >= TRACK_COUNT {
            return Vec::new();
        }
        self.shared.slot(track).sounding.clone()
    }

    fn cancel_and_flush(&self, track: usize) {
        let task = self.shared.slot(track).task.take();
        if let Some(task) = task {
            task.cancel.cancel();
            if task.join.join().is_err() {
                log::warn!(target: "audio::arp", "arpeggio task on track {} panicked", track);
            }
        }

        let sounding = std::mem::take(&mut self.shared.slot(track).sounding);
        if !sounding.is_empty() {
            if let Err(e) = self.shared.client.note_off(track, &sounding) {
                log::debug!(target: "audio::arp", "note-off on track {} dropped: {}", track, e);
            }
        }
    }
}

impl Drop for ArpRuntime {
    fn drop(&mut self) {
        self.release_all();
    }
}

fn run_sequence(
    shared: Arc<Shared>,
    track: usize,
    id: u64,
    sequence: ArpSequence,
    delta_secs: f64,
    voice: Voice,
    token: CancelToken,
) {
    if token.wait(step_duration(delta_secs, sequence.divisors[0])) {
        return;
    }

    for i in 1..sequence.len() {
        if token.is_cancelled() {
            return;
        }
        let slot_secs = delta_secs / sequence.divisors[i];
        shared.emit(&voice.note_on(track, vec![sequence.notes[i]], slot_secs));
        shared.slot(track).sounding = vec![sequence.notes[i]];

        if i + 1 < sequence.len() && token.wait(step_duration(delta_secs, sequence.divisors[i])) {
            return;
        }
    }

    let mut slot = shared.slot(track);
    if slot.task.as_ref().is_some_and(|t| t.id == id) {
        slot.task = None;
    }
}

fn step_duration(delta_secs: f64, divisor: f64) -> Duration {
    let secs = delta_secs / divisor;
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}
