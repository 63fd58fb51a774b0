//! Turns emitted rows into engine events.
//!
//! Instrument rows become a chord, played plain or through the arpeggiator
//! runtime. Sampler rows become a slice trigger. Every column is resolved
//! through the sticky rules before use.

use std::sync::Arc;

use stepline_types::{
    build_chord, resolve_row, ChordAddition, ChordType, Column, PatternStore, ResolvedRow, TrackCategory, UNSET,
};

use crate::arp_runtime::{ArpRuntime, Voice};
use crate::client::{EngineClient, SampleTrigger};
use crate::playback::{RowEvent, RowSink};

/// Column value that maps to a neutral pitch offset / centred pan.
const CENTER: i32 = 128;
/// Full-scale value of the filter and effect columns.
const FULL_SCALE: f32 = 254.0;

/// Tempo of the session as seen by dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    pub bpm: f32,
    /// Ticks per beat.
    pub ppq: u32,
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 120.0, ppq: 4 }
    }
}

impl Tempo {
    pub fn tick_secs(&self) -> f64 {
        let ticks_per_sec = self.bpm.max(1.0) as f64 / 60.0 * self.ppq.max(1) as f64;
        1.0 / ticks_per_sec
    }

    pub fn tick_rate_hz(&self) -> f64 {
        1.0 / self.tick_secs()
    }
}

pub struct RowDispatcher {
    client: Arc<dyn EngineClient>,
    arps: ArpRuntime,
    tempo: Tempo,
}

impl RowDispatcher {
    pub fn new(client: Arc<dyn EngineClient>, tempo: Tempo) -> Self {
        Self {
            arps: ArpRuntime::new(Arc::clone(&client)),
            client,
            tempo,
        }
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn set_tempo(&mut self, tempo: Tempo) {
        self.tempo = tempo;
    }

    pub fn arps(&self) -> &ArpRuntime {
        &self.arps
    }

    pub fn client(&self) -> &Arc<dyn EngineClient> {
        &self.client
    }

    /// Silence every track.
    pub fn release_all(&self) {
        self.arps.release_all();
    }

    fn dispatch_instrument(&self, store: &PatternStore, event: &RowEvent, row: &ResolvedRow) {
        let root = row.get(Column::Note);
        if root == UNSET {
            return;
        }
        let chord = build_chord(
            root,
            ChordType::from_index(row.get(Column::ChordType)),
            ChordAddition::from_index(row.get(Column::ChordAddition)),
            row.get(Column::ChordTransposition),
        );
        let voice = instrument_voice(store, row);
        let row_secs = event.delta_ticks as f64 * self.tempo.tick_secs();

        match row.get(Column::Arpeggio) {
            UNSET => self.arps.play(event.track, &voice.note_on(event.track, chord, row_secs)),
            index => self
                .arps
                .trigger(event.track, &chord, store.arpeggio(index), row_secs, &voice),
        }
    }

    fn dispatch_sampler(&self, store: &PatternStore, event: &RowEvent, row: &ResolvedRow) {
        let slice = row.get(Column::Note);
        if slice == UNSET {
            return;
        }
        self.arps.release(event.track);

        let Some(file) = store.file(row.get(Column::Filename)) else {
            log::debug!(target: "audio::dispatch", "track {} row {}: no sample file", event.track, event.row);
            return;
        };
        let trigger = SampleTrigger {
            track: event.track,
            path: file.path.clone(),
            slice: slice.rem_euclid(file.slices.max(1)),
            slice_count: file.slices,
            pitch: (row.get(Column::Pitch) - CENTER) as f32,
            source_bpm: file.bpm,
            target_bpm: self.tempo.bpm,
            params: sampler_params(store, row),
        };
        if let Err(e) = self.client.sample_trigger(&trigger) {
            log::debug!(target: "audio::dispatch", "sample trigger on track {} dropped: {}", event.track, e);
        }
    }
}

impl RowSink for RowDispatcher {
    fn emit_row(&mut self, store: &PatternStore, event: &RowEvent) {
        let row = resolve_row(store, event.pool, event.phrase, event.row);
        match event.pool {
            TrackCategory::Instrument => self.dispatch_instrument(store, event, &row),
            TrackCategory::Sampler => self.dispatch_sampler(store, event, &row),
        }
    }

    fn track_stopped(&mut self, track: usize) {
        self.arps.release(track);
    }
}

fn unit(value: i32) -> f32 {
    (value as f32 / FULL_SCALE).clamp(0.0, 1.0)
}

fn pan(value: i32) -> f32 {
    ((value - CENTER) as f32 / CENTER as f32).clamp(-1.0, 1.0)
}

fn velocity(row: &ResolvedRow) -> f32 {
    (row.get(Column::Velocity) as f32 / 127.0).clamp(0.0, 1.0)
}

fn instrument_voice(store: &PatternStore, row: &ResolvedRow) -> Voice {
    let mut params = vec![
        (Column::Pitch.name(), (row.get(Column::Pitch) - CENTER) as f32),
        (Column::Attack.name(), row.get(Column::Attack) as f32),
        (Column::Decay.name(), row.get(Column::Decay) as f32),
        (Column::Sustain.name(), row.get(Column::Sustain) as f32),
        (Column::Release.name(), row.get(Column::Release) as f32),
        (Column::Pan.name(), pan(row.get(Column::Pan))),
        (Column::LowPass.name(), unit(row.get(Column::LowPass))),
        (Column::HighPass.name(), unit(row.get(Column::HighPass))),
        (Column::Reverb.name(), unit(row.get(Column::Reverb))),
    ];
    let midi = row.get(Column::MidiSettings);
    if midi != UNSET {
        params.push((Column::MidiSettings.name(), midi as f32));
    }

    Voice {
        velocity: velocity(row),
        gate: row.get(Column::Gate).max(0) as f64 / CENTER as f64,
        synth: store.sound_maker(row.get(Column::SoundMaker)).map(|s| s.synth.clone()),
        params,
    }
}

fn sampler_params(store: &PatternStore, row: &ResolvedRow) -> Vec<(&'static str, f32)> {
    let mut params = vec![
        ("velocity", velocity(row)),
        (Column::Reverse.name(), if row.get(Column::Reverse) > 0 { 1.0 } else { 0.0 }),
        (Column::Pan.name(), pan(row.get(Column::Pan))),
        (Column::LowPass.name(), unit(row.get(Column::LowPass))),
        (Column::HighPass.name(), unit(row.get(Column::HighPass))),
        (Column::Comb.name(), unit(row.get(Column::Comb))),
        (Column::Reverb.name(), unit(row.get(Column::Reverb))),
    ];
    if let Some(retrig) = store.retrigger(row.get(Column::Retrigger)) {
        params.push(("retrig_times", retrig.times as f32));
        params.push(("retrig_rate", retrig.rate_divisor as f32));
    }
    if let Some(stretch) = store.timestretch(row.get(Column::Timestretch)) {
        params.push(("stretch_beats", stretch.beats as f32));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientOp, TestClient};
    use stepline_types::{ArpDirection, ArpStep, ArpeggioProgram, SampleFile, SoundMaker};

    fn event(pool: TrackCategory, row: usize, delta_ticks: i32) -> RowEvent {
        RowEvent {
            track: 1,
            pool,
            song_row: None,
            chain: None,
            chain_row: 0,
            phrase: 0,
            row,
            delta_ticks,
        }
    }

    fn dispatcher(client: &Arc<TestClient>) -> RowDispatcher {
        RowDispatcher::new(client.clone(), Tempo { bpm: 120.0, ppq: 2 })
    }

    #[test]
    fn tick_length_follows_tempo() {
        let tempo = Tempo { bpm: 120.0, ppq: 2 };
        assert!((tempo.tick_rate_hz() - 4.0).abs() < 1e-9);
        assert!((tempo.tick_secs() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn instrument_row_plays_chord_with_gate() {
        let client = TestClient::shared();
        let mut d = dispatcher(&client);
        let mut store = PatternStore::new();
        let pool = TrackCategory::Instrument;
        store.set_column(pool, 0, 0, Column::Note, 60);
        store.set_column(pool, 0, 0, Column::DeltaTime, 4);
        store.set_column(pool, 0, 0, Column::ChordType, 1);
        store.set_column(pool, 0, 0, Column::Gate, 64);
        store.sound_makers[3] = SoundMaker { synth: "saw".into() };
        store.set_column(pool, 0, 0, Column::SoundMaker, 3);

        d.emit_row(&store, &event(pool, 0, 4));

        let ops = client.operations();
        assert_eq!(ops.len(), 1);
        let ClientOp::NoteOn(on) = &ops[0] else {
            panic!("expected note-on");
        };
        assert_eq!(on.notes, vec![60, 64, 67]);
        assert_eq!(on.track, 1);
        assert!((on.duration_secs - 0.5).abs() < 1e-9);
        assert_eq!(on.synth.as_deref(), Some("saw"));
        assert!(on.params.contains(&("pan", 0.0)));
    }

    #[test]
    fn row_without_note_emits_nothing() {
        let client = TestClient::shared();
        let mut d = dispatcher(&client);
        let mut store = PatternStore::new();
        store.set_column(TrackCategory::Instrument, 0, 0, Column::DeltaTime, 1);
        d.emit_row(&store, &event(TrackCategory::Instrument, 0, 1));
        d.emit_row(&store, &event(TrackCategory::Sampler, 0, 1));
        assert!(client.operations().is_empty());
    }

    #[test]
    fn sticky_values_reach_later_rows() {
        let client = TestClient::shared();
        let mut d = dispatcher(&client);
        let mut store = PatternStore::new();
        let pool = TrackCategory::Instrument;
        store.set_column(pool, 0, 0, Column::Velocity, 127);
        store.set_column(pool, 0, 3, Column::Note, 48);
        store.set_column(pool, 0, 3, Column::DeltaTime, 1);

        d.emit_row(&store, &event(pool, 3, 1));
        let ClientOp::NoteOn(on) = &client.operations()[0] else {
            panic!("expected note-on");
        };
        assert_eq!(on.notes, vec![48]);
        assert!((on.velocity - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn arpeggio_index_starts_runtime() {
        let client = TestClient::shared();
        let mut d = dispatcher(&client);
        let mut store = PatternStore::new();
        let pool = TrackCategory::Instrument;
        store.arpeggios[2] = ArpeggioProgram::from_steps(&[ArpStep::new(ArpDirection::Up, 2, 4)]);
        store.set_column(pool, 0, 0, Column::Note, 60);
        store.set_column(pool, 0, 0, Column::DeltaTime, 4);
        store.set_column(pool, 0, 0, Column::Arpeggio, 2);

        d.emit_row(&store, &event(pool, 0, 4));
        assert_eq!(client.notes_on()[0], vec![60]);
        assert!(!d.arps().sounding(1).is_empty());

        d.track_stopped(1);
        assert!(!d.arps().is_active(1));
        assert!(d.arps().sounding(1).is_empty());
    }

    #[test]
    fn sampler_row_triggers_slice() {
        let client = TestClient::shared();
        let mut d = dispatcher(&client);
        let mut store = PatternStore::new();
        let pool = TrackCategory::Sampler;
        let file = store.add_file(SampleFile::new("/tmp/break.wav", 170.0, 8));
        store.set_column(pool, 0, 0, Column::Filename, file);
        store.set_column(pool, 0, 0, Column::Note, 10);
        store.set_column(pool, 0, 0, Column::Pitch, 130);
        store.set_column(pool, 0, 0, Column::DeltaTime, 2);

        d.emit_row(&store, &event(pool, 0, 2));

        let ops = client.operations();
        let ClientOp::Sample(hit) = &ops[0] else {
            panic!("expected sample trigger");
        };
        assert_eq!(hit.slice, 2);
        assert_eq!(hit.slice_count, 8);
        assert_eq!(hit.pitch, 2.0);
        assert_eq!(hit.source_bpm, 170.0);
        assert_eq!(hit.target_bpm, 120.0);
    }

    #[test]
    fn sampler_row_without_file_is_silent() {
        let client = TestClient::shared();
        let mut d = dispatcher(&client);
        let mut store = PatternStore::new();
        store.set_column(TrackCategory::Sampler, 0, 0, Column::Note, 1);
        store.set_column(TrackCategory::Sampler, 0, 0, Column::DeltaTime, 1);
        d.emit_row(&store, &event(TrackCategory::Sampler, 0, 1));
        assert!(client.operations().is_empty());
    }
}
