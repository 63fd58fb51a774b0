//! Advance policies: where a track goes once its chain runs out.

use std::fmt;
use std::str::FromStr;

use stepline_audio::{Advance, AdvancePolicy, PlaybackCursor, PlaybackStart, StartPoint};
use stepline_types::{PatternStore, SONG_ROWS, UNSET};

/// Playback mode selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    #[default]
    Song,
    Chain,
    Phrase,
    OneShot,
}

impl PlaybackMode {
    pub const ALL: [PlaybackMode; 4] = [
        PlaybackMode::Song,
        PlaybackMode::Chain,
        PlaybackMode::Phrase,
        PlaybackMode::OneShot,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PlaybackMode::Song => "song",
            PlaybackMode::Chain => "chain",
            PlaybackMode::Phrase => "phrase",
            PlaybackMode::OneShot => "oneshot",
        }
    }

    pub fn policy(&self) -> Box<dyn AdvancePolicy> {
        match self {
            PlaybackMode::Song => Box::new(SongLoop),
            PlaybackMode::Chain => Box::new(ChainLoop),
            PlaybackMode::Phrase => Box::new(PhraseLoop),
            PlaybackMode::OneShot => Box::new(OneShot),
        }
    }

    /// Start point matching the mode. `track` and `index` are ignored in song
    /// mode; in one-shot mode `index` is a song row.
    pub fn start(&self, track: usize, index: usize) -> PlaybackStart {
        match self {
            PlaybackMode::Song | PlaybackMode::OneShot => PlaybackStart::Song { row: index },
            PlaybackMode::Chain => PlaybackStart::Chain { track, chain: index },
            PlaybackMode::Phrase => PlaybackStart::Phrase { track, phrase: index },
        }
    }
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlaybackMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlaybackMode::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown playback mode '{}'", s))
    }
}

/// Song mode: next song row of the track; at an empty row or the end, back to
/// the top of the block of non-empty rows the track was in.
pub struct SongLoop;

impl AdvancePolicy for SongLoop {
    fn on_chain_exhausted(&mut self, track: usize, cursor: &PlaybackCursor, store: &PatternStore) -> Advance {
        let Some(row) = cursor.song_row else {
            return Advance::Stop;
        };
        let filled = |r: usize| store.song_cell(track, r) != UNSET;

        let next = row + 1;
        if next < SONG_ROWS && filled(next) {
            return Advance::Resume(StartPoint::SongRow(next));
        }

        let mut top = row.min(SONG_ROWS - 1);
        while top > 0 && filled(top - 1) {
            top -= 1;
        }
        if filled(top) {
            Advance::Resume(StartPoint::SongRow(top))
        } else {
            Advance::Stop
        }
    }
}

/// Chain mode: replay the chain from its first row.
pub struct ChainLoop;

impl AdvancePolicy for ChainLoop {
    fn on_chain_exhausted(&mut self, _track: usize, cursor: &PlaybackCursor, _store: &PatternStore) -> Advance {
        match cursor.chain {
            Some(chain) => Advance::Resume(StartPoint::Chain { chain, row: 0 }),
            None => Advance::Stop,
        }
    }
}

/// Phrase mode: replay the phrase.
pub struct PhraseLoop;

impl AdvancePolicy for PhraseLoop {
    fn on_chain_exhausted(&mut self, _track: usize, cursor: &PlaybackCursor, _store: &PatternStore) -> Advance {
        Advance::Resume(StartPoint::Phrase(cursor.phrase))
    }
}

/// Play through once and stop: song rows advance until an empty row.
pub struct OneShot;

impl AdvancePolicy for OneShot {
    fn on_chain_exhausted(&mut self, track: usize, cursor: &PlaybackCursor, store: &PatternStore) -> Advance {
        match cursor.song_row.map(|r| r + 1) {
            Some(next) if next < SONG_ROWS && store.song_cell(track, next) != UNSET => {
                Advance::Resume(StartPoint::SongRow(next))
            }
            _ => Advance::Stop,
        }
    }
}
