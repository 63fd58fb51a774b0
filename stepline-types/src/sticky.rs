//! Sticky value resolution.
//!
//! An unset cell in a sticky column keeps whatever the nearest row above it
//! in the same phrase set. Resolution never writes to the store.

use crate::state::{Column, PatternStore, TrackCategory, PHRASE_ROWS, UNSET};

/// Effective value of `column` at `(pool, phrase, row)`.
pub fn resolve(store: &PatternStore, pool: TrackCategory, phrase: usize, row: usize, column: Column) -> i32 {
    let Some(p) = store.phrase(pool, phrase).filter(|_| row < PHRASE_ROWS) else {
        return column.default_value();
    };

    let stored = p.get(row, column);
    if stored != UNSET || !column.is_sticky() {
        return stored;
    }

    (0..row)
        .rev()
        .map(|r| p.get(r, column))
        .find(|&v| v != UNSET)
        .unwrap_or_else(|| column.default_value())
}

/// Same as [`resolve`], with the pool picked by the track's current category.
pub fn resolve_for_track(store: &PatternStore, track: usize, phrase: usize, row: usize, column: Column) -> i32 {
    resolve(store, store.track_category(track), phrase, row, column)
}

/// Every column of a row, resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRow {
    values: [i32; Column::COUNT],
}

impl ResolvedRow {
    pub fn get(&self, column: Column) -> i32 {
        self.values[column.index()]
    }

    /// Row is triggered only with a delta-time of at least one tick.
    pub fn is_playable(&self) -> bool {
        self.get(Column::DeltaTime) >= 1
    }
}

pub fn resolve_row(store: &PatternStore, pool: TrackCategory, phrase: usize, row: usize) -> ResolvedRow {
    let mut values = [UNSET; Column::COUNT];
    for column in Column::ALL {
        values[column.index()] = resolve(store, pool, phrase, row, column);
    }
    ResolvedRow { values }
}

/// Whether the row would be emitted by the scheduler.
pub fn is_playable(store: &PatternStore, pool: TrackCategory, phrase: usize, row: usize) -> bool {
    resolve(store, pool, phrase, row, Column::DeltaTime) >= 1
}
