//! Multi-track playback scheduler.
//!
//! Eight independent cursors walk Song → Chain → Phrase → Row. Every cursor
//! sits on a playable row (resolved delta-time ≥ 1) or is inactive. Each tick
//! a cursor either burns one tick of its current row or moves to the next
//! playable row and emits it. Rows are emitted through a [`RowSink`]; where a
//! cursor goes after its chain runs out is decided by an [`AdvancePolicy`].

use stepline_types::{
    is_playable, resolve, slot_index, Column, PatternStore, TrackCategory, CHAIN_ROWS, PHRASE_ROWS, SLOT_COUNT,
    SONG_ROWS, TRACK_COUNT,
};

/// Consecutive policy hops that may find nothing playable before a track is
/// stopped. Bounds the walk when a looping policy points at empty material.
pub const MAX_ADVANCE_HOPS: usize = 64;

/// Per-track playback position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackCursor {
    pub active: bool,
    /// Song row being played; `None` outside song mode.
    pub song_row: Option<usize>,
    /// Chain being played; `None` in phrase mode.
    pub chain: Option<usize>,
    pub chain_row: usize,
    pub phrase: usize,
    pub row: usize,
    pub ticks_remaining: i32,
}

/// Where a track (re)starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPoint {
    /// The chain in this song row of the track.
    SongRow(usize),
    /// A chain, from the given chain row.
    Chain { chain: usize, row: usize },
    /// A phrase on its own.
    Phrase(usize),
}

/// Decision taken when a track's chain is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Resume(StartPoint),
    Stop,
}

/// Higher-level looping/stop behaviour, supplied by the caller.
pub trait AdvancePolicy: Send {
    fn on_chain_exhausted(&mut self, track: usize, cursor: &PlaybackCursor, store: &PatternStore) -> Advance;
}

/// How a playback session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStart {
    /// Every track from this song row.
    Song { row: usize },
    /// One track playing one chain.
    Chain { track: usize, chain: usize },
    /// One track playing one phrase.
    Phrase { track: usize, phrase: usize },
}

/// A row chosen for emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowEvent {
    pub track: usize,
    pub pool: TrackCategory,
    pub song_row: Option<usize>,
    pub chain: Option<usize>,
    pub chain_row: usize,
    pub phrase: usize,
    pub row: usize,
    /// Resolved delta-time of the row, in ticks.
    pub delta_ticks: i32,
}

/// Receiver of scheduler output.
pub trait RowSink {
    fn emit_row(&mut self, store: &PatternStore, event: &RowEvent);

    /// The track went inactive.
    fn track_stopped(&mut self, _track: usize) {}
}

impl RowSink for Vec<RowEvent> {
    fn emit_row(&mut self, _store: &PatternStore, event: &RowEvent) {
        self.push(*event);
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    cursors: [PlaybackCursor; TRACK_COUNT],
    ticks: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursors(&self) -> &[PlaybackCursor; TRACK_COUNT] {
        &self.cursors
    }

    pub fn cursor(&self, track: usize) -> Option<&PlaybackCursor> {
        self.cursors.get(track)
    }

    pub fn is_playing(&self) -> bool {
        self.cursors.iter().any(|c| c.active)
    }

    /// Ticks processed since the session started.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Reset all cursors and emit the first row of every started track.
    pub fn start(&mut self, store: &PatternStore, start: PlaybackStart, sink: &mut dyn RowSink) {
        self.stop();
        match start {
            PlaybackStart::Song { row } => {
                for track in 0..TRACK_COUNT {
                    self.start_track(store, track, StartPoint::SongRow(row), sink);
                }
            }
            PlaybackStart::Chain { track, chain } => {
                self.start_track(store, track, StartPoint::Chain { chain, row: 0 }, sink);
            }
            PlaybackStart::Phrase { track, phrase } => {
                self.start_track(store, track, StartPoint::Phrase(phrase), sink);
            }
        }
        log::debug!(
            target: "audio::playback",
            "session started ({:?}), {} track(s) active",
            start,
            self.cursors.iter().filter(|c| c.active).count()
        );
    }

    /// Deactivate every cursor.
    pub fn stop(&mut self) {
        self.cursors = [PlaybackCursor::default(); TRACK_COUNT];
        self.ticks = 0;
    }

    /// Deactivate one cursor.
    pub fn stop_track(&mut self, track: usize, sink: &mut dyn RowSink) {
        if let Some(cursor) = self.cursors.get_mut(track) {
            if cursor.active {
                cursor.active = false;
                sink.track_stopped(track);
            }
        }
    }

    /// Advance every active track by one tick.
    pub fn tick(&mut self, store: &PatternStore, policy: &mut dyn AdvancePolicy, sink: &mut dyn RowSink) {
        self.ticks += 1;
        for track in 0..TRACK_COUNT {
            if !self.cursors[track].active {
                continue;
            }
            if self.cursors[track].ticks_remaining > 0 {
                self.cursors[track].ticks_remaining -= 1;
                continue;
            }
            self.advance_track(store, track, policy, sink);
        }
    }

    fn start_track(&mut self, store: &PatternStore, track: usize, point: StartPoint, sink: &mut dyn RowSink) {
        if track >= TRACK_COUNT {
            return;
        }
        if self.enter(store, track, point) {
            self.emit_current(store, track, sink);
        } else {
            self.cursors[track].active = false;
        }
    }

    fn advance_track(
        &mut self,
        store: &PatternStore,
        track: usize,
        policy: &mut dyn AdvancePolicy,
        sink: &mut dyn RowSink,
    ) {
        let pool = store.track_category(track);
        let cursor = self.cursors[track];

        if let Some(row) = next_playable_row(store, pool, cursor.phrase, cursor.row + 1) {
            self.cursors[track].row = row;
            self.emit_current(store, track, sink);
            return;
        }

        if let Some(chain) = cursor.chain {
            if self.enter_chain(store, track, chain, cursor.chain_row + 1) {
                self.emit_current(store, track, sink);
                return;
            }
        }

        for _ in 0..MAX_ADVANCE_HOPS {
            match policy.on_chain_exhausted(track, &self.cursors[track], store) {
                Advance::Stop => break,
                Advance::Resume(point) => {
                    if self.enter(store, track, point) {
                        self.emit_current(store, track, sink);
                        return;
                    }
                }
            }
        }

        log::debug!(target: "audio::playback", "track {} stopped", track);
        self.stop_track(track, sink);
    }

    /// Point the cursor at the first playable row reachable from `point`.
    ///
    /// The cursor's song row / chain are updated even when nothing playable is
    /// found, so a policy consulted afterwards sees where the walk got to.
    fn enter(&mut self, store: &PatternStore, track: usize, point: StartPoint) -> bool {
        let pool = store.track_category(track);
        match point {
            StartPoint::SongRow(song_row) => {
                let cursor = &mut self.cursors[track];
                cursor.song_row = Some(song_row);
                cursor.chain = None;
                if song_row >= SONG_ROWS {
                    return false;
                }
                match slot_index(store.song_cell(track, song_row), SLOT_COUNT) {
                    Some(chain) => self.enter_chain(store, track, chain, 0),
                    None => false,
                }
            }
            StartPoint::Chain { chain, row } => {
                self.cursors[track].song_row = None;
                self.enter_chain(store, track, chain, row)
            }
            StartPoint::Phrase(phrase) => {
                let cursor = &mut self.cursors[track];
                cursor.song_row = None;
                cursor.chain = None;
                cursor.chain_row = 0;
                match next_playable_row(store, pool, phrase, 0) {
                    Some(row) => {
                        cursor.phrase = phrase;
                        cursor.row = row;
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Walk chain rows from `from_row`, skipping empty references and phrases
    /// with nothing playable.
    fn enter_chain(&mut self, store: &PatternStore, track: usize, chain: usize, from_row: usize) -> bool {
        let pool = store.track_category(track);
        let cursor = &mut self.cursors[track];
        if chain >= SLOT_COUNT {
            cursor.chain = None;
            return false;
        }
        cursor.chain = Some(chain);

        for chain_row in from_row..CHAIN_ROWS {
            let Some(phrase) = slot_index(store.chain_cell(pool, chain, chain_row), SLOT_COUNT) else {
                continue;
            };
            if let Some(row) = next_playable_row(store, pool, phrase, 0) {
                cursor.chain_row = chain_row;
                cursor.phrase = phrase;
                cursor.row = row;
                return true;
            }
        }
        cursor.chain_row = CHAIN_ROWS - 1;
        false
    }

    fn emit_current(&mut self, store: &PatternStore, track: usize, sink: &mut dyn RowSink) {
        let pool = store.track_category(track);
        let cursor = &mut self.cursors[track];
        let delta_ticks = resolve(store, pool, cursor.phrase, cursor.row, Column::DeltaTime);
        cursor.active = true;
        cursor.ticks_remaining = delta_ticks - 1;

        let event = RowEvent {
            track,
            pool,
            song_row: cursor.song_row,
            chain: cursor.chain,
            chain_row: cursor.chain_row,
            phrase: cursor.phrase,
            row: cursor.row,
            delta_ticks,
        };
        sink.emit_row(store, &event);
    }
}

/// First row at or after `from` with a resolved delta-time of at least 1.
pub fn next_playable_row(store: &PatternStore, pool: TrackCategory, phrase: usize, from: usize) -> Option<usize> {
    if phrase >= SLOT_COUNT {
        return None;
    }
    (from..PHRASE_ROWS).find(|&row| is_playable(store, pool, phrase, row))
}

#[cfg(test)]
mod tests {
    use super::*;

    const POOL: TrackCategory = TrackCategory::Instrument;

    /// Loops whatever the track was playing.
    struct LoopPolicy;

    impl AdvancePolicy for LoopPolicy {
        fn on_chain_exhausted(&mut self, _track: usize, cursor: &PlaybackCursor, _store: &PatternStore) -> Advance {
            match (cursor.song_row, cursor.chain) {
                (Some(row), _) => Advance::Resume(StartPoint::SongRow(row)),
                (None, Some(chain)) => Advance::Resume(StartPoint::Chain { chain, row: 0 }),
                (None, None) => Advance::Resume(StartPoint::Phrase(cursor.phrase)),
            }
        }
    }

    struct StopPolicy;

    impl AdvancePolicy for StopPolicy {
        fn on_chain_exhausted(&mut self, _: usize, _: &PlaybackCursor, _: &PatternStore) -> Advance {
            Advance::Stop
        }
    }

    fn set_dt(store: &mut PatternStore, phrase: usize, row: usize, dt: i32) {
        store.set_column(POOL, phrase, row, Column::DeltaTime, dt);
    }

    fn rows(events: &[RowEvent]) -> Vec<(usize, usize)> {
        events.iter().map(|e| (e.phrase, e.row)).collect()
    }

    #[test]
    fn start_emits_first_playable_row() {
        let mut store = PatternStore::new();
        set_dt(&mut store, 0, 2, 3);
        let mut scheduler = Scheduler::new();
        let mut events = Vec::new();
        scheduler.start(&store, PlaybackStart::Phrase { track: 0, phrase: 0 }, &mut events);

        assert_eq!(rows(&events), vec![(0, 2)]);
        let cursor = scheduler.cursor(0).unwrap();
        assert!(cursor.active);
        assert_eq!(cursor.ticks_remaining, 2);
    }

    #[test]
    fn phrase_without_playable_rows_stays_inactive() {
        let mut store = PatternStore::new();
        set_dt(&mut store, 0, 0, 0);
        set_dt(&mut store, 0, 1, -1);
        let mut scheduler = Scheduler::new();
        let mut events = Vec::new();
        scheduler.start(&store, PlaybackStart::Phrase { track: 0, phrase: 0 }, &mut events);
        assert!(events.is_empty());
        assert!(!scheduler.is_playing());
    }

    #[test]
    fn rests_are_never_emitted() {
        let mut store = PatternStore::new();
        set_dt(&mut store, 0, 0, 1);
        set_dt(&mut store, 0, 1, 0);
        set_dt(&mut store, 0, 2, -1);
        set_dt(&mut store, 0, 3, 1);
        let mut scheduler = Scheduler::new();
        let mut events = Vec::new();
        scheduler.start(&store, PlaybackStart::Phrase { track: 0, phrase: 0 }, &mut events);
        for _ in 0..5 {
            scheduler.tick(&store, &mut LoopPolicy, &mut events);
        }
        assert!(events.iter().all(|e| e.row == 0 || e.row == 3));
        assert_eq!(rows(&events), vec![(0, 0), (0, 3), (0, 0), (0, 3), (0, 0), (0, 3)]);
    }

    #[test]
    fn chain_walks_phrases_and_skips_empty_rows() {
        let mut store = PatternStore::new();
        set_dt(&mut store, 1, 0, 1);
        set_dt(&mut store, 2, 5, 1);
        store.set_chain_cell(POOL, 0, 0, 1);
        store.set_chain_cell(POOL, 0, 2, 2);

        let mut scheduler = Scheduler::new();
        let mut events = Vec::new();
        scheduler.start(&store, PlaybackStart::Chain { track: 4, chain: 0 }, &mut events);
        scheduler.tick(&store, &mut StopPolicy, &mut events);
        assert_eq!(rows(&events), vec![(1, 0), (2, 5)]);
        assert_eq!(events[1].chain_row, 2);

        scheduler.tick(&store, &mut StopPolicy, &mut events);
        assert!(!scheduler.cursor(4).unwrap().active);
    }

    #[test]
    fn song_start_skips_chain_rows_without_playable_phrases() {
        let mut store = PatternStore::new();
        set_dt(&mut store, 1, 0, 0);
        set_dt(&mut store, 3, 4, 2);
        store.set_chain_cell(POOL, 0, 0, 1);
        store.set_chain_cell(POOL, 0, 1, 3);
        store.set_song_cell(0, 0, 0);

        let mut scheduler = Scheduler::new();
        let mut events = Vec::new();
        scheduler.start(&store, PlaybackStart::Song { row: 0 }, &mut events);
        assert_eq!(rows(&events), vec![(3, 4)]);
        assert_eq!(events[0].chain_row, 1);
        assert_eq!(events[0].song_row, Some(0));
    }

    #[test]
    fn empty_chain_reference_is_not_an_error() {
        let store = PatternStore::new();
        let mut scheduler = Scheduler::new();
        let mut events = Vec::new();
        scheduler.start(&store, PlaybackStart::Song { row: 0 }, &mut events);
        scheduler.start(&store, PlaybackStart::Chain { track: 0, chain: 999 }, &mut events);
        scheduler.start(&store, PlaybackStart::Phrase { track: 99, phrase: 0 }, &mut events);
        assert!(events.is_empty());
        assert!(!scheduler.is_playing());
    }

    #[test]
    fn tracks_advance_independently() {
        let mut store = PatternStore::new();
        set_dt(&mut store, 0, 0, 2);
        set_dt(&mut store, 1, 0, 3);
        store.set_chain_cell(POOL, 0, 0, 0);
        store.set_chain_cell(POOL, 1, 0, 1);
        store.set_song_cell(0, 0, 0);
        store.set_song_cell(1, 0, 1);

        let mut scheduler = Scheduler::new();
        let mut events = Vec::new();
        scheduler.start(&store, PlaybackStart::Song { row: 0 }, &mut events);
        for _ in 0..6 {
            scheduler.tick(&store, &mut LoopPolicy, &mut events);
        }
        let track0 = events.iter().filter(|e| e.track == 0).count();
        let track1 = events.iter().filter(|e| e.track == 1).count();
        // 7 ticks of material: every 2 ticks on track 0, every 3 on track 1
        assert_eq!(track0, 4);
        assert_eq!(track1, 3);
    }

    #[test]
    fn policy_that_finds_nothing_stops_the_track() {
        struct Wander;
        impl AdvancePolicy for Wander {
            fn on_chain_exhausted(&mut self, _: usize, _: &PlaybackCursor, _: &PatternStore) -> Advance {
                Advance::Resume(StartPoint::Phrase(200))
            }
        }

        let mut store = PatternStore::new();
        set_dt(&mut store, 0, 0, 1);
        let mut scheduler = Scheduler::new();
        let mut events = Vec::new();
        scheduler.start(&store, PlaybackStart::Phrase { track: 2, phrase: 0 }, &mut events);
        scheduler.tick(&store, &mut Wander, &mut events);
        assert!(!scheduler.cursor(2).unwrap().active);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn category_switch_applies_on_next_read() {
        let mut store = PatternStore::new();
        set_dt(&mut store, 0, 0, 1);
        set_dt(&mut store, 0, 1, 1);
        store.set_column(TrackCategory::Sampler, 0, 7, Column::DeltaTime, 1);

        let mut scheduler = Scheduler::new();
        let mut events = Vec::new();
        scheduler.start(&store, PlaybackStart::Phrase { track: 0, phrase: 0 }, &mut events);
        store.set_track_category(0, TrackCategory::Sampler);
        scheduler.tick(&store, &mut StopPolicy, &mut events);

        assert_eq!(events[0].pool, TrackCategory::Instrument);
        assert_eq!(events[1].pool, TrackCategory::Sampler);
        assert_eq!(events[1].row, 7);
    }
}
