//! TransportHandle: control-side interface to the transport thread.
//!
//! Owns the command and feedback channels. The scheduler, the pattern store
//! copy it reads and the arpeggiator runtime all live on the transport thread.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use stepline_types::{ArpeggioProgram, Column, PatternStore, TrackCategory};

use crate::client::EngineClient;
use crate::commands::{TransportCmd, TransportFeedback};
use crate::dispatch::Tempo;
use crate::playback::{AdvancePolicy, PlaybackStart};
use crate::transport_thread::TransportThread;

#[derive(Debug, Clone)]
pub enum TransportError {
    /// The transport thread is gone.
    Disconnected,
    Spawn(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Disconnected => write!(f, "transport thread disconnected"),
            TransportError::Spawn(e) => write!(f, "failed to start transport thread: {}", e),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Spawn(e.to_string())
    }
}

/// Transport thread parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportSettings {
    pub tempo: Tempo,
    /// Driver pass period. Must be well below the tick period.
    pub tick_interval: Duration,
    /// Periodically log pass timings and report them as feedback.
    pub telemetry: bool,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            tempo: Tempo::default(),
            tick_interval: Duration::from_micros(500),
            telemetry: false,
        }
    }
}

pub struct TransportHandle {
    cmd_tx: Sender<TransportCmd>,
    feedback_rx: Receiver<TransportFeedback>,
    playing: bool,
    join_handle: Option<JoinHandle<()>>,
}

impl TransportHandle {
    pub fn spawn(client: Arc<dyn EngineClient>, settings: TransportSettings) -> Result<Self, TransportError> {
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let (feedback_tx, feedback_rx) = crossbeam_channel::unbounded();

        let join_handle = thread::Builder::new().name("transport".into()).spawn(move || {
            TransportThread::new(cmd_rx, feedback_tx, client, settings).run();
        })?;

        Ok(Self {
            cmd_tx,
            feedback_rx,
            playing: false,
            join_handle: Some(join_handle),
        })
    }

    pub fn send_cmd(&self, cmd: TransportCmd) -> Result<(), TransportError> {
        self.cmd_tx.send(cmd).map_err(|_| TransportError::Disconnected)
    }

    /// Collect pending feedback without blocking.
    pub fn drain_feedback(&mut self) -> Vec<TransportFeedback> {
        let mut out = Vec::new();
        while let Ok(msg) = self.feedback_rx.try_recv() {
            self.apply_feedback(&msg);
            out.push(msg);
        }
        out
    }

    /// Wait up to `timeout` for the next feedback message.
    pub fn recv_feedback(&mut self, timeout: Duration) -> Option<TransportFeedback> {
        let msg = self.feedback_rx.recv_timeout(timeout).ok()?;
        self.apply_feedback(&msg);
        Some(msg)
    }

    fn apply_feedback(&mut self, feedback: &TransportFeedback) {
        match feedback {
            TransportFeedback::RowPlayed(_) => self.playing = true,
            TransportFeedback::Stopped => self.playing = false,
            TransportFeedback::TrackStopped { .. } | TransportFeedback::Telemetry(_) => {}
        }
    }

    /// Whether the last feedback seen says a session is running.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_store(&self, store: PatternStore) -> Result<(), TransportError> {
        self.send_cmd(TransportCmd::SetStore(Box::new(store)))
    }

    pub fn set_cell(
        &self,
        pool: TrackCategory,
        phrase: usize,
        row: usize,
        column: Column,
        value: i32,
    ) -> Result<(), TransportError> {
        self.send_cmd(TransportCmd::SetCell {
            pool,
            phrase,
            row,
            column,
            value,
        })
    }

    pub fn set_chain_cell(&self, pool: TrackCategory, chain: usize, row: usize, phrase: i32) -> Result<(), TransportError> {
        self.send_cmd(TransportCmd::SetChainCell { pool, chain, row, phrase })
    }

    pub fn set_song_cell(&self, track: usize, row: usize, chain: i32) -> Result<(), TransportError> {
        self.send_cmd(TransportCmd::SetSongCell { track, row, chain })
    }

    pub fn set_track_category(&self, track: usize, category: TrackCategory) -> Result<(), TransportError> {
        self.send_cmd(TransportCmd::SetTrackCategory { track, category })
    }

    pub fn set_arpeggio(&self, index: usize, program: ArpeggioProgram) -> Result<(), TransportError> {
        self.send_cmd(TransportCmd::SetArpeggio { index, program })
    }

    pub fn set_tempo(&self, tempo: Tempo) -> Result<(), TransportError> {
        self.send_cmd(TransportCmd::SetTempo(tempo))
    }

    pub fn play(&self, start: PlaybackStart, policy: Box<dyn AdvancePolicy>) -> Result<(), TransportError> {
        self.send_cmd(TransportCmd::Play { start, policy })
    }

    pub fn stop(&self) -> Result<(), TransportError> {
        self.send_cmd(TransportCmd::Stop)
    }

    pub fn set_param(&self, name: &str, value: f32) -> Result<(), TransportError> {
        self.send_cmd(TransportCmd::SetParam {
            name: name.to_string(),
            value,
        })
    }

    /// Stop the thread and wait for it. Every sounding note is released first.
    pub fn shutdown(&mut self) {
        let _ = self.send_cmd(TransportCmd::Shutdown);
        if let Some(handle) = self.join_handle.take() {
            if handle.join().is_err() {
                log::error!(target: "transport", "transport thread panicked");
            }
        }
        self.playing = false;
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
