mod common;

use std::time::Duration;

use common::{set_row, OneShot, Repeat, POOL};
use stepline_audio::{
    ClientOp, PlaybackStart, RowDispatcher, RowEvent, RowSink, Scheduler, Tempo, TestClient, TransportFeedback,
    TransportHandle, TransportSettings,
};
use stepline_types::{Column, PatternStore};

/// Phrase 0: row 0 plays for four ticks, row 1 is unset, row 2 plays for two.
fn gated_phrase() -> PatternStore {
    let mut store = PatternStore::new();
    set_row(&mut store, 0, 0, 60, 4);
    store.set_column(POOL, 0, 1, Column::Note, 62);
    set_row(&mut store, 0, 2, 64, 2);
    store.set_chain_cell(POOL, 0, 0, 0);
    store.set_song_cell(0, 0, 0);
    store
}

/// Records which tick each row was emitted on.
struct TickLog {
    tick: u64,
    rows: Vec<(u64, RowEvent)>,
}

impl RowSink for TickLog {
    fn emit_row(&mut self, _: &PatternStore, event: &RowEvent) {
        self.rows.push((self.tick, *event));
    }
}

#[test]
fn bpm_120_ppq_2_row_timing() {
    let store = gated_phrase();
    let tempo = Tempo { bpm: 120.0, ppq: 2 };
    assert!((tempo.tick_rate_hz() - 4.0).abs() < 1e-9);

    let mut scheduler = Scheduler::new();
    let mut log = TickLog { tick: 0, rows: Vec::new() };
    scheduler.start(&store, PlaybackStart::Song { row: 0 }, &mut log);
    assert_eq!(scheduler.cursor(0).unwrap().ticks_remaining, 3);

    for tick in 1..=4 {
        log.tick = tick;
        scheduler.tick(&store, &mut OneShot, &mut log);
    }

    let emitted: Vec<(u64, usize)> = log.rows.iter().map(|(t, e)| (*t, e.row)).collect();
    // row 2 lands one second (four ticks at 4 Hz) after row 0
    assert_eq!(emitted, vec![(0, 0), (4, 2)]);
    assert_eq!(scheduler.cursor(0).unwrap().ticks_remaining, 1);
    assert!(log.rows.iter().all(|(_, e)| e.row != 1));

    log.tick = 5;
    scheduler.tick(&store, &mut OneShot, &mut log);
    log.tick = 6;
    scheduler.tick(&store, &mut OneShot, &mut log);
    assert!(!scheduler.is_playing());
}

#[test]
fn same_store_same_emissions() {
    let store = gated_phrase();
    let run = || {
        let mut scheduler = Scheduler::new();
        let mut events: Vec<RowEvent> = Vec::new();
        scheduler.start(&store, PlaybackStart::Song { row: 0 }, &mut events);
        for _ in 0..40 {
            scheduler.tick(&store, &mut Repeat, &mut events);
        }
        events
    };
    let first = run();
    assert!(first.len() > 10);
    assert_eq!(first, run());
}

#[test]
fn dispatched_note_lasts_one_row() {
    let store = gated_phrase();
    let client = TestClient::shared();
    let mut dispatcher = RowDispatcher::new(client.clone(), Tempo { bpm: 120.0, ppq: 2 });
    let mut scheduler = Scheduler::new();
    scheduler.start(&store, PlaybackStart::Song { row: 0 }, &mut dispatcher);

    let ops = client.operations();
    let ClientOp::NoteOn(first) = &ops[0] else {
        panic!("expected note-on, got {:?}", ops[0]);
    };
    assert_eq!(first.notes, vec![60]);
    assert!((first.duration_secs - 1.0).abs() < 1e-9);
}

#[test]
fn transport_plays_phrase_and_reports_stop() {
    let client = TestClient::shared();
    let settings = TransportSettings {
        tempo: Tempo { bpm: 240.0, ppq: 4 },
        ..TransportSettings::default()
    };
    let mut handle = TransportHandle::spawn(client.clone(), settings).unwrap();
    handle.set_store(gated_phrase()).unwrap();
    handle
        .play(PlaybackStart::Phrase { track: 0, phrase: 0 }, Box::new(OneShot))
        .unwrap();

    let feedback = common::feedback_until_stopped(&mut handle, Duration::from_secs(5));
    let rows: Vec<usize> = feedback
        .iter()
        .filter_map(|f| match f {
            TransportFeedback::RowPlayed(e) => Some(e.row),
            _ => None,
        })
        .collect();
    assert_eq!(rows, vec![0, 2]);
    assert!(feedback.contains(&TransportFeedback::TrackStopped { track: 0 }));
    assert!(!handle.is_playing());

    assert_eq!(client.notes_on(), vec![vec![60], vec![64]]);
    assert!(client
        .operations()
        .iter()
        .any(|op| matches!(op, ClientOp::ParamSet { name, value } if name == "bpm" && *value == 240.0)));
}

#[test]
fn stop_ends_a_looping_session() {
    let client = TestClient::shared();
    let mut handle = TransportHandle::spawn(client.clone(), TransportSettings::default()).unwrap();
    handle.set_store(gated_phrase()).unwrap();
    handle.play(PlaybackStart::Song { row: 0 }, Box::new(Repeat)).unwrap();

    common::wait_for(&client, Duration::from_secs(2), |c| !c.notes_on().is_empty());
    handle.stop().unwrap();
    let feedback = common::feedback_until_stopped(&mut handle, Duration::from_secs(2));
    assert_eq!(feedback.last(), Some(&TransportFeedback::Stopped));

    handle.shutdown();
    assert!(handle.send_cmd(stepline_audio::TransportCmd::Stop).is_err());
}

#[test]
fn empty_start_stops_immediately() {
    let client = TestClient::shared();
    let mut handle = TransportHandle::spawn(client.clone(), TransportSettings::default()).unwrap();
    handle
        .play(PlaybackStart::Chain { track: 3, chain: 9 }, Box::new(Repeat))
        .unwrap();
    let feedback = common::feedback_until_stopped(&mut handle, Duration::from_secs(2));
    assert_eq!(feedback, vec![TransportFeedback::Stopped]);
    assert!(client.notes_on().is_empty());
}

#[test]
fn edits_reach_the_running_store() {
    let client = TestClient::shared();
    let mut handle = TransportHandle::spawn(client.clone(), TransportSettings::default()).unwrap();
    handle.set_cell(POOL, 5, 0, Column::Note, 72).unwrap();
    handle.set_cell(POOL, 5, 0, Column::DeltaTime, 1).unwrap();
    handle
        .play(PlaybackStart::Phrase { track: 1, phrase: 5 }, Box::new(OneShot))
        .unwrap();
    common::feedback_until_stopped(&mut handle, Duration::from_secs(2));
    assert_eq!(client.notes_on(), vec![vec![72]]);
}
