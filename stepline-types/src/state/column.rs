//! Phrase column model.

use serde::{Deserialize, Serialize};

/// Stored value meaning "nothing written in this cell".
pub const UNSET: i32 = -1;

/// A named column of a phrase row.
///
/// Both pools share one column layout; instrument phrases ignore the
/// sampler-only columns and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    Note,
    Pitch,
    DeltaTime,
    Gate,
    Retrigger,
    Timestretch,
    Reverse,
    Pan,
    LowPass,
    HighPass,
    Comb,
    Reverb,
    Filename,
    ChordType,
    ChordAddition,
    ChordTransposition,
    Attack,
    Decay,
    Sustain,
    Release,
    Arpeggio,
    MidiSettings,
    SoundMaker,
    Velocity,
}

impl Column {
    pub const COUNT: usize = 24;

    pub const ALL: [Column; Column::COUNT] = [
        Column::Note,
        Column::Pitch,
        Column::DeltaTime,
        Column::Gate,
        Column::Retrigger,
        Column::Timestretch,
        Column::Reverse,
        Column::Pan,
        Column::LowPass,
        Column::HighPass,
        Column::Comb,
        Column::Reverb,
        Column::Filename,
        Column::ChordType,
        Column::ChordAddition,
        Column::ChordTransposition,
        Column::Attack,
        Column::Decay,
        Column::Sustain,
        Column::Release,
        Column::Arpeggio,
        Column::MidiSettings,
        Column::SoundMaker,
        Column::Velocity,
    ];

    /// Position of this column inside a row.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether an unset cell inherits the previous explicit value in the phrase.
    ///
    /// Note and delta-time are per-row events: an empty note is silence and an
    /// empty delta-time is a rest.
    pub fn is_sticky(self) -> bool {
        !matches!(self, Column::Note | Column::DeltaTime)
    }

    /// Value used when no row at or above the cell sets the column.
    pub fn default_value(self) -> i32 {
        match self {
            Column::Note | Column::DeltaTime => UNSET,
            Column::Pitch => 128,
            Column::Gate => 128,
            Column::Pan => 128,
            Column::LowPass => 254,
            Column::HighPass | Column::Comb | Column::Reverb | Column::Reverse => 0,
            Column::ChordType | Column::ChordAddition | Column::ChordTransposition => 0,
            Column::Attack => 2,
            Column::Decay => 64,
            Column::Sustain => 200,
            Column::Release => 32,
            Column::Velocity => 100,
            Column::Retrigger
            | Column::Timestretch
            | Column::Filename
            | Column::Arpeggio
            | Column::MidiSettings
            | Column::SoundMaker => UNSET,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Column::Note => "note",
            Column::Pitch => "pitch",
            Column::DeltaTime => "dt",
            Column::Gate => "gate",
            Column::Retrigger => "retrig",
            Column::Timestretch => "stretch",
            Column::Reverse => "reverse",
            Column::Pan => "pan",
            Column::LowPass => "lpf",
            Column::HighPass => "hpf",
            Column::Comb => "comb",
            Column::Reverb => "reverb",
            Column::Filename => "file",
            Column::ChordType => "chord",
            Column::ChordAddition => "chord_add",
            Column::ChordTransposition => "chord_trans",
            Column::Attack => "attack",
            Column::Decay => "decay",
            Column::Sustain => "sustain",
            Column::Release => "release",
            Column::Arpeggio => "arp",
            Column::MidiSettings => "midi",
            Column::SoundMaker => "sound_maker",
            Column::Velocity => "velocity",
        }
    }
}

/// One phrase row: a fixed-width vector of column values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    values: [i32; Column::COUNT],
}

impl Default for Row {
    fn default() -> Self {
        Self {
            values: [UNSET; Column::COUNT],
        }
    }
}

impl Row {
    pub fn get(&self, column: Column) -> i32 {
        self.values[column.index()]
    }

    pub fn set(&mut self, column: Column, value: i32) {
        self.values[column.index()] = value;
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|&v| v == UNSET)
    }
}
