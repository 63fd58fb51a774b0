//! Engine client trait: the outbound side of the sequencer.
//!
//! `EngineClient` captures what the sequencer *means* to send (a note, a
//! sample hit, a parameter change) independently of how it reaches the
//! synthesis engine. Delivery is best-effort; callers never wait for
//! acknowledgement.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Result type for client operations.
pub type ClientResult<T = ()> = Result<T, ClientError>;

/// Error from a client operation.
#[derive(Debug, Clone)]
pub struct ClientError(pub String);

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError(e.to_string())
    }
}

impl From<rosc::OscError> for ClientError {
    fn from(e: rosc::OscError) -> Self {
        ClientError(e.to_string())
    }
}

impl From<String> for ClientError {
    fn from(s: String) -> Self {
        ClientError(s)
    }
}

/// A note-on for one or more pitches on a track.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteOn {
    pub track: usize,
    pub notes: Vec<i32>,
    /// 0.0-1.0
    pub velocity: f32,
    pub duration_secs: f64,
    /// Engine-side synth definition; `None` uses the engine default.
    pub synth: Option<String>,
    /// Timbre parameters (envelope, filters, pan, ...).
    pub params: Vec<(&'static str, f32)>,
}

/// A sample slice trigger on a track.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTrigger {
    pub track: usize,
    pub path: PathBuf,
    pub slice: i32,
    pub slice_count: i32,
    /// Playback pitch offset in semitones.
    pub pitch: f32,
    pub source_bpm: f32,
    pub target_bpm: f32,
    /// Effect parameters (reverse, retrigger, stretch, filters, ...).
    pub params: Vec<(&'static str, f32)>,
}

/// Semantic-level engine client.
///
/// Implementations must not block on delivery; they are called from the tick
/// driver and from arpeggio tasks.
pub trait EngineClient: Send + Sync {
    fn note_on(&self, event: &NoteOn) -> ClientResult;

    fn note_off(&self, track: usize, notes: &[i32]) -> ClientResult;

    fn sample_trigger(&self, event: &SampleTrigger) -> ClientResult;

    /// Set a continuous mixer/global parameter.
    fn param_set(&self, name: &str, value: f32) -> ClientResult;
}

// ─── Test Client ────────────────────────────────────────────────────

/// An operation recorded by `TestClient` for assertion in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientOp {
    NoteOn(NoteOn),
    NoteOff { track: usize, notes: Vec<i32> },
    Sample(SampleTrigger),
    ParamSet { name: String, value: f32 },
}

impl ClientOp {
    pub fn track(&self) -> Option<usize> {
        match self {
            ClientOp::NoteOn(e) => Some(e.track),
            ClientOp::NoteOff { track, .. } => Some(*track),
            ClientOp::Sample(e) => Some(e.track),
            ClientOp::ParamSet { .. } => None,
        }
    }
}

/// A client that records all operations into a vector for assertions.
/// All operations succeed.
#[derive(Default)]
pub struct TestClient {
    ops: Mutex<Vec<ClientOp>>,
}

impl TestClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn operations(&self) -> Vec<ClientOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn count<F: Fn(&ClientOp) -> bool>(&self, f: F) -> usize {
        self.ops.lock().unwrap().iter().filter(|op| f(op)).count()
    }

    /// Operations on one track, in emission order.
    pub fn track_ops(&self, track: usize) -> Vec<ClientOp> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter(|op| op.track() == Some(track))
            .cloned()
            .collect()
    }

    /// Pitch lists of every note-on, in emission order.
    pub fn notes_on(&self) -> Vec<Vec<i32>> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                ClientOp::NoteOn(e) => Some(e.notes.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, op: ClientOp) -> ClientResult {
        self.ops.lock().unwrap().push(op);
        Ok(())
    }
}

impl EngineClient for TestClient {
    fn note_on(&self, event: &NoteOn) -> ClientResult {
        self.push(ClientOp::NoteOn(event.clone()))
    }

    fn note_off(&self, track: usize, notes: &[i32]) -> ClientResult {
        self.push(ClientOp::NoteOff {
            track,
            notes: notes.to_vec(),
        })
    }

    fn sample_trigger(&self, event: &SampleTrigger) -> ClientResult {
        self.push(ClientOp::Sample(event.clone()))
    }

    fn param_set(&self, name: &str, value: f32) -> ClientResult {
        self.push(ClientOp::ParamSet {
            name: name.to_string(),
            value,
        })
    }
}

// ─── NullClient ─────────────────────────────────────────────────────

/// A no-op client that silently succeeds. Used when no engine is connected.
pub struct NullClient;

impl EngineClient for NullClient {
    fn note_on(&self, _: &NoteOn) -> ClientResult { Ok(()) }
    fn note_off(&self, _: usize, _: &[i32]) -> ClientResult { Ok(()) }
    fn sample_trigger(&self, _: &SampleTrigger) -> ClientResult { Ok(()) }
    fn param_set(&self, _: &str, _: f32) -> ClientResult { Ok(()) }
}
