#![allow(dead_code)]
//! Shared helpers for stepline-audio integration tests.

use std::time::{Duration, Instant};

use stepline_audio::{Advance, AdvancePolicy, PlaybackCursor, StartPoint, TestClient, TransportFeedback, TransportHandle};
use stepline_types::{Column, PatternStore, TrackCategory};

pub const POOL: TrackCategory = TrackCategory::Instrument;

/// Write note and delta-time of one instrument row.
pub fn set_row(store: &mut PatternStore, phrase: usize, row: usize, note: i32, dt: i32) {
    store.set_column(POOL, phrase, row, Column::Note, note);
    store.set_column(POOL, phrase, row, Column::DeltaTime, dt);
}

/// Stops every track at the end of its chain.
pub struct OneShot;

impl AdvancePolicy for OneShot {
    fn on_chain_exhausted(&mut self, _: usize, _: &PlaybackCursor, _: &PatternStore) -> Advance {
        Advance::Stop
    }
}

/// Replays whatever the track was playing.
pub struct Repeat;

impl AdvancePolicy for Repeat {
    fn on_chain_exhausted(&mut self, _track: usize, cursor: &PlaybackCursor, _: &PatternStore) -> Advance {
        match (cursor.song_row, cursor.chain) {
            (Some(row), _) => Advance::Resume(StartPoint::SongRow(row)),
            (None, Some(chain)) => Advance::Resume(StartPoint::Chain { chain, row: 0 }),
            (None, None) => Advance::Resume(StartPoint::Phrase(cursor.phrase)),
        }
    }
}

/// Collect feedback until `Stopped` arrives, or panic after `timeout`.
pub fn feedback_until_stopped(handle: &mut TransportHandle, timeout: Duration) -> Vec<TransportFeedback> {
    let deadline = Instant::now() + timeout;
    let mut out = Vec::new();
    while Instant::now() < deadline {
        if let Some(msg) = handle.recv_feedback(Duration::from_millis(20)) {
            let done = msg == TransportFeedback::Stopped;
            out.push(msg);
            if done {
                return out;
            }
        }
    }
    panic!("transport did not stop within {:?} ({} messages)", timeout, out.len());
}

/// Poll `client` until `pred` holds, or panic after `timeout`.
pub fn wait_for<F: Fn(&TestClient) -> bool>(client: &TestClient, timeout: Duration, pred: F) {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if pred(client) {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("condition not met within {:?}", timeout);
}
