//! Built-in demo project used by the command-line player.

use stepline_types::{
    ArpDirection, ArpStep, ArpeggioProgram, Column, PatternStore, RetriggerSettings, SampleFile, SoundMaker,
    TrackCategory,
};

const BASS: usize = 0;
const ARP: usize = 1;
const DRUMS: usize = 2;

/// Two song rows: a bassline, an arpeggiated chord track and a sliced drum
/// break. `samples_dir` is where the break file is expected.
pub fn demo_store(samples_dir: &str) -> PatternStore {
    let mut store = PatternStore::new();
    let inst = TrackCategory::Instrument;

    store.sound_makers[0] = SoundMaker { synth: "bass".into() };
    store.sound_makers[1] = SoundMaker { synth: "pluck".into() };
    store.arpeggios[0] = ArpeggioProgram::from_steps(&[
        ArpStep::new(ArpDirection::Up, 3, 4),
        ArpStep::new(ArpDirection::Down, 2, 2),
    ]);
    store.retriggers[0] = RetriggerSettings { times: 2, rate_divisor: 4 };

    // bass: phrases 0 and 1, root notes on every beat
    for (phrase, roots) in [(0usize, [36, 36, 43, 41]), (1, [38, 38, 45, 43])] {
        store.set_column(inst, phrase, 0, Column::SoundMaker, 0);
        store.set_column(inst, phrase, 0, Column::Gate, 96);
        for (i, root) in roots.into_iter().enumerate() {
            let row = i * 4;
            store.set_column(inst, phrase, row, Column::Note, root);
            store.set_column(inst, phrase, row, Column::DeltaTime, 4);
        }
    }

    // chords: phrases 2 and 3, one arpeggiated chord per bar
    for (phrase, root, chord) in [(2usize, 60, 1), (3, 62, 2)] {
        store.set_column(inst, phrase, 0, Column::Note, root);
        store.set_column(inst, phrase, 0, Column::DeltaTime, 16);
        store.set_column(inst, phrase, 0, Column::ChordType, chord);
        store.set_column(inst, phrase, 0, Column::ChordAddition, 1);
        store.set_column(inst, phrase, 0, Column::Arpeggio, 0);
        store.set_column(inst, phrase, 0, Column::SoundMaker, 1);
        store.set_column(inst, phrase, 0, Column::Reverb, 80);
    }

    // drums: one phrase of slices from the break
    let smp = TrackCategory::Sampler;
    let file = store.add_file(SampleFile::new(format!("{}/break.wav", samples_dir), 170.0, 8));
    store.set_column(smp, 0, 0, Column::Filename, file);
    for (row, slice) in [(0usize, 0), (4, 2), (8, 4), (12, 6), (14, 6)] {
        store.set_column(smp, 0, row, Column::Note, slice);
        store.set_column(smp, 0, row, Column::DeltaTime, if row >= 12 { 2 } else { 4 });
    }
    store.set_column(smp, 0, 14, Column::Retrigger, 0);

    for (chain, phrase) in [(0usize, 0), (1, 1), (2, 2), (3, 3)] {
        store.set_chain_cell(inst, chain, 0, phrase);
    }
    store.set_chain_cell(smp, 0, 0, 0);

    store.set_track_category(DRUMS, TrackCategory::Sampler);
    for song_row in 0..2 {
        store.set_song_cell(BASS, song_row, song_row as i32);
        store.set_song_cell(ARP, song_row, 2 + song_row as i32);
        store.set_song_cell(DRUMS, song_row, 0);
    }
    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepline_audio::{PlaybackStart, RowEvent, Scheduler};
    use stepline_types::is_playable;

    use crate::policy::PlaybackMode;

    #[test]
    fn demo_song_starts_three_tracks() {
        let store = demo_store("samples");
        let mut scheduler = Scheduler::new();
        let mut events: Vec<RowEvent> = Vec::new();
        scheduler.start(&store, PlaybackStart::Song { row: 0 }, &mut events);
        let tracks: Vec<usize> = events.iter().map(|e| e.track).collect();
        assert_eq!(tracks, vec![BASS, ARP, DRUMS]);
        assert_eq!(events[2].pool, TrackCategory::Sampler);
    }

    #[test]
    fn demo_phrases_are_one_bar() {
        let store = demo_store("samples");
        let bar = |pool: TrackCategory, phrase: usize| -> i32 {
            (0..16)
                .filter(|&row| is_playable(&store, pool, phrase, row))
                .map(|row| store.column(pool, phrase, row, Column::DeltaTime))
                .sum()
        };
        assert_eq!(bar(TrackCategory::Instrument, 0), 16);
        assert_eq!(bar(TrackCategory::Instrument, 2), 16);
        assert_eq!(bar(TrackCategory::Sampler, 0), 16);
    }

    #[test]
    fn demo_song_loops() {
        let store = demo_store("samples");
        let mut scheduler = Scheduler::new();
        let mut events: Vec<RowEvent> = Vec::new();
        let mut policy = PlaybackMode::Song.policy();
        scheduler.start(&store, PlaybackStart::Song { row: 0 }, &mut events);
        for _ in 0..64 {
            scheduler.tick(&store, policy.as_mut(), &mut events);
        }
        assert!(scheduler.is_playing());
        let arp_rows: Vec<Option<usize>> = events
            .iter()
            .filter(|e| e.track == ARP)
            .map(|e| e.song_row)
            .collect();
        assert_eq!(arp_rows, vec![Some(0), Some(1), Some(0), Some(1), Some(0)]);
    }
}
