//! Pattern store: phrases, chains, the song grid and the lookup tables they
//! reference.
//!
//! Every read is O(1). Out-of-range addresses read as [`UNSET`] ("nothing
//! here") rather than failing; writes to them are ignored.

use serde::{Deserialize, Serialize};

use super::arpeggio::ArpeggioProgram;
use super::column::{Column, Row, UNSET};
use super::tables::{RetriggerSettings, SampleFile, SoundMaker, TimestretchSettings};

/// Number of tracks in the song.
pub const TRACK_COUNT: usize = 8;
/// Phrase, chain and table slots per pool.
pub const SLOT_COUNT: usize = 255;
/// Rows in a phrase.
pub const PHRASE_ROWS: usize = 255;
/// Rows in a chain.
pub const CHAIN_ROWS: usize = 16;
/// Rows in the song.
pub const SONG_ROWS: usize = 16;

/// Convert a stored reference (`-1` = empty) into a slot index.
pub fn slot_index(value: i32, len: usize) -> Option<usize> {
    if value >= 0 && (value as usize) < len {
        Some(value as usize)
    } else {
        None
    }
}

/// Which of the two pattern pools a track reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrackCategory {
    #[default]
    Instrument,
    Sampler,
}

impl TrackCategory {
    pub fn name(&self) -> &'static str {
        match self {
            TrackCategory::Instrument => "Instrument",
            TrackCategory::Sampler => "Sampler",
        }
    }
}

/// A phrase; rows are allocated on first write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    rows: Vec<Row>,
}

impl Phrase {
    pub fn get(&self, row: usize, column: Column) -> i32 {
        self.rows.get(row).map_or(UNSET, |r| r.get(column))
    }

    pub fn set(&mut self, row: usize, column: Column, value: i32) {
        if row >= PHRASE_ROWS {
            return;
        }
        if self.rows.is_empty() {
            self.rows = vec![Row::default(); PHRASE_ROWS];
        }
        self.rows[row].set(column, value);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Row::is_empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub rows: [i32; CHAIN_ROWS],
}

impl Default for Chain {
    fn default() -> Self {
        Self {
            rows: [UNSET; CHAIN_ROWS],
        }
    }
}

impl Chain {
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|&p| slot_index(p, SLOT_COUNT).is_none())
    }
}

/// Phrase and chain tables of one pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolTables {
    pub phrases: Vec<Phrase>,
    pub chains: Vec<Chain>,
}

impl Default for PoolTables {
    fn default() -> Self {
        Self {
            phrases: vec![Phrase::default(); SLOT_COUNT],
            chains: vec![Chain::default(); SLOT_COUNT],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub rows: [[i32; TRACK_COUNT]; SONG_ROWS],
    pub categories: [TrackCategory; TRACK_COUNT],
}

impl Default for Song {
    fn default() -> Self {
        Self {
            rows: [[UNSET; TRACK_COUNT]; SONG_ROWS],
            categories: [TrackCategory::Instrument; TRACK_COUNT],
        }
    }
}

/// All sequencer data of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternStore {
    instrument: PoolTables,
    sampler: PoolTables,
    pub song: Song,
    pub arpeggios: Vec<ArpeggioProgram>,
    pub retriggers: Vec<RetriggerSettings>,
    pub timestretches: Vec<TimestretchSettings>,
    pub sound_makers: Vec<SoundMaker>,
    pub files: Vec<SampleFile>,
}

impl Default for PatternStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternStore {
    pub fn new() -> Self {
        Self {
            instrument: PoolTables::default(),
            sampler: PoolTables::default(),
            song: Song::default(),
            arpeggios: vec![ArpeggioProgram::default(); SLOT_COUNT],
            retriggers: vec![RetriggerSettings::default(); SLOT_COUNT],
            timestretches: vec![TimestretchSettings::default(); SLOT_COUNT],
            sound_makers: vec![SoundMaker::default(); SLOT_COUNT],
            files: Vec::new(),
        }
    }

    /// The tables a pool reads from.
    pub fn pool(&self, pool: TrackCategory) -> &PoolTables {
        match pool {
            TrackCategory::Instrument => &self.instrument,
            TrackCategory::Sampler => &self.sampler,
        }
    }

    pub fn pool_mut(&mut self, pool: TrackCategory) -> &mut PoolTables {
        match pool {
            TrackCategory::Instrument => &mut self.instrument,
            TrackCategory::Sampler => &mut self.sampler,
        }
    }

    pub fn phrase(&self, pool: TrackCategory, phrase: usize) -> Option<&Phrase> {
        self.pool(pool).phrases.get(phrase)
    }

    /// Stored value of a single cell (no inheritance).
    pub fn column(&self, pool: TrackCategory, phrase: usize, row: usize, column: Column) -> i32 {
        self.phrase(pool, phrase)
            .map_or(UNSET, |p| p.get(row, column))
    }

    pub fn set_column(&mut self, pool: TrackCategory, phrase: usize, row: usize, column: Column, value: i32) {
        if let Some(p) = self.pool_mut(pool).phrases.get_mut(phrase) {
            p.set(row, column, value);
        }
    }

    pub fn chain_cell(&self, pool: TrackCategory, chain: usize, row: usize) -> i32 {
        self.pool(pool)
            .chains
            .get(chain)
            .and_then(|c| c.rows.get(row))
            .copied()
            .unwrap_or(UNSET)
    }

    pub fn set_chain_cell(&mut self, pool: TrackCategory, chain: usize, row: usize, phrase: i32) {
        if let Some(cell) = self
            .pool_mut(pool)
            .chains
            .get_mut(chain)
            .and_then(|c| c.rows.get_mut(row))
        {
            *cell = phrase;
        }
    }

    pub fn song_cell(&self, track: usize, row: usize) -> i32 {
        self.song
            .rows
            .get(row)
            .and_then(|r| r.get(track))
            .copied()
            .unwrap_or(UNSET)
    }

    pub fn set_song_cell(&mut self, track: usize, row: usize, chain: i32) {
        if let Some(cell) = self.song.rows.get_mut(row).and_then(|r| r.get_mut(track)) {
            *cell = chain;
        }
    }

    pub fn track_category(&self, track: usize) -> TrackCategory {
        self.song.categories.get(track).copied().unwrap_or_default()
    }

    pub fn set_track_category(&mut self, track: usize, category: TrackCategory) {
        if let Some(c) = self.song.categories.get_mut(track) {
            *c = category;
        }
    }

    pub fn arpeggio(&self, index: i32) -> Option<&ArpeggioProgram> {
        slot_index(index, self.arpeggios.len()).map(|i| &self.arpeggios[i])
    }

    pub fn retrigger(&self, index: i32) -> Option<&RetriggerSettings> {
        slot_index(index, self.retriggers.len()).map(|i| &self.retriggers[i])
    }

    pub fn timestretch(&self, index: i32) -> Option<&TimestretchSettings> {
        slot_index(index, self.timestretches.len()).map(|i| &self.timestretches[i])
    }

    pub fn sound_maker(&self, index: i32) -> Option<&SoundMaker> {
        slot_index(index, self.sound_makers.len())
            .map(|i| &self.sound_makers[i])
            .filter(|s| !s.synth.is_empty())
    }

    pub fn file(&self, index: i32) -> Option<&SampleFile> {
        slot_index(index, self.files.len()).map(|i| &self.files[i])
    }

    /// Append a sample file and return its filename-column index.
    pub fn add_file(&mut self, file: SampleFile) -> i32 {
        self.files.push(file);
        self.files.len() as i32 - 1
    }
}
