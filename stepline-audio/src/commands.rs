use stepline_types::{ArpeggioProgram, Column, PatternStore, TrackCategory};

use crate::dispatch::Tempo;
use crate::playback::{AdvancePolicy, PlaybackStart, RowEvent};
use crate::telemetry::TelemetrySummary;

/// Commands sent from the control side to the transport thread.
///
/// Store edits are applied between ticks, so a tick always reads one
/// consistent store.
pub enum TransportCmd {
    /// Replace the whole store.
    SetStore(Box<PatternStore>),
    SetCell {
        pool: TrackCategory,
        phrase: usize,
        row: usize,
        column: Column,
        value: i32,
    },
    SetChainCell {
        pool: TrackCategory,
        chain: usize,
        row: usize,
        phrase: i32,
    },
    SetSongCell {
        track: usize,
        row: usize,
        chain: i32,
    },
    SetTrackCategory {
        track: usize,
        category: TrackCategory,
    },
    SetArpeggio {
        index: usize,
        program: ArpeggioProgram,
    },
    /// Takes effect at the next `Play`; the tick rate is fixed per session.
    SetTempo(Tempo),
    Play {
        start: PlaybackStart,
        policy: Box<dyn AdvancePolicy>,
    },
    Stop,
    /// Forward a global parameter to the engine.
    SetParam {
        name: String,
        value: f32,
    },
    Shutdown,
}

impl std::fmt::Debug for TransportCmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportCmd::SetStore(_) => write!(f, "SetStore"),
            TransportCmd::SetCell { phrase, row, column, value, .. } => {
                write!(f, "SetCell({}:{} {}={})", phrase, row, column.name(), value)
            }
            TransportCmd::SetChainCell { chain, row, phrase, .. } => {
                write!(f, "SetChainCell({}:{}={})", chain, row, phrase)
            }
            TransportCmd::SetSongCell { track, row, chain } => {
                write!(f, "SetSongCell({}:{}={})", track, row, chain)
            }
            TransportCmd::SetTrackCategory { track, category } => {
                write!(f, "SetTrackCategory({}={})", track, category.name())
            }
            TransportCmd::SetArpeggio { index, .. } => write!(f, "SetArpeggio({})", index),
            TransportCmd::SetTempo(tempo) => write!(f, "SetTempo({:?})", tempo),
            TransportCmd::Play { start, .. } => write!(f, "Play({:?})", start),
            TransportCmd::Stop => write!(f, "Stop"),
            TransportCmd::SetParam { name, value } => write!(f, "SetParam({}={})", name, value),
            TransportCmd::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Feedback sent from the transport thread back to the control side.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportFeedback {
    RowPlayed(RowEvent),
    TrackStopped { track: usize },
    /// Every track is inactive; the session ended or was stopped.
    Stopped,
    Telemetry(TelemetrySummary),
}
