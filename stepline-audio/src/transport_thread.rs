//! Tick driver thread.
//!
//! Owns the pattern store, the scheduler and the row dispatcher. Commands from
//! the handle are applied between passes; each pass runs the scheduler ticks
//! owed since the previous one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use stepline_types::PatternStore;

use crate::client::EngineClient;
use crate::commands::{TransportCmd, TransportFeedback};
use crate::dispatch::{RowDispatcher, Tempo};
use crate::handle::TransportSettings;
use crate::playback::{AdvancePolicy, PlaybackStart, RowEvent, RowSink, Scheduler};
use crate::telemetry::TickTelemetry;

const TELEMETRY_PERIOD: Duration = Duration::from_secs(5);

/// Forwards scheduler output to the dispatcher and mirrors it as feedback.
struct FeedbackSink<'a> {
    dispatcher: &'a mut RowDispatcher,
    feedback_tx: &'a Sender<TransportFeedback>,
}

impl RowSink for FeedbackSink<'_> {
    fn emit_row(&mut self, store: &PatternStore, event: &RowEvent) {
        self.dispatcher.emit_row(store, event);
        let _ = self.feedback_tx.send(TransportFeedback::RowPlayed(*event));
    }

    fn track_stopped(&mut self, track: usize) {
        self.dispatcher.track_stopped(track);
        let _ = self.feedback_tx.send(TransportFeedback::TrackStopped { track });
    }
}

pub(crate) struct TransportThread {
    cmd_rx: Receiver<TransportCmd>,
    feedback_tx: Sender<TransportFeedback>,
    store: PatternStore,
    scheduler: Scheduler,
    dispatcher: RowDispatcher,
    /// Present while a session runs.
    policy: Option<Box<dyn AdvancePolicy>>,
    /// Tempo for the next session.
    next_tempo: Tempo,
    tick_interval: Duration,
    /// Fractional scheduler ticks owed since the last pass.
    tick_accumulator: f64,
    last_pass: Instant,
    telemetry: TickTelemetry,
    telemetry_enabled: bool,
    last_telemetry_emit: Instant,
}

impl TransportThread {
    pub(crate) fn new(
        cmd_rx: Receiver<TransportCmd>,
        feedback_tx: Sender<TransportFeedback>,
        client: Arc<dyn EngineClient>,
        settings: TransportSettings,
    ) -> Self {
        Self {
            cmd_rx,
            feedback_tx,
            store: PatternStore::new(),
            scheduler: Scheduler::new(),
            dispatcher: RowDispatcher::new(client, settings.tempo),
            policy: None,
            next_tempo: settings.tempo,
            tick_interval: settings.tick_interval,
            tick_accumulator: 0.0,
            last_pass: Instant::now(),
            telemetry: TickTelemetry::new(),
            telemetry_enabled: settings.telemetry,
            last_telemetry_emit: Instant::now(),
        }
    }

    pub(crate) fn run(mut self) {
        loop {
            let remaining = self.tick_interval.saturating_sub(self.last_pass.elapsed());

            crossbeam_channel::select! {
                recv(self.cmd_rx) -> result => {
                    match result {
                        Ok(cmd) => {
                            if self.handle_cmd(cmd) {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
                default(remaining) => {}
            }

            if self.drain_commands() {
                break;
            }

            let now = Instant::now();
            let elapsed = now.duration_since(self.last_pass);
            if elapsed >= self.tick_interval {
                self.last_pass = now;
                let pass_start = Instant::now();
                self.advance(elapsed);
                self.telemetry.record(pass_start.elapsed(), self.tick_interval);
                self.emit_telemetry();
            }
        }

        self.dispatcher.release_all();
        log::debug!(target: "transport", "transport thread exiting");
    }

    /// Handle queued commands within a small time budget so edits never
    /// starve the tick driver.
    fn drain_commands(&mut self) -> bool {
        const MAX_DURATION: Duration = Duration::from_micros(200);
        const MAX_COUNT: usize = 128;

        let start = Instant::now();
        for _ in 0..MAX_COUNT {
            if start.elapsed() >= MAX_DURATION {
                break;
            }
            match self.cmd_rx.try_recv() {
                Ok(cmd) => {
                    if self.handle_cmd(cmd) {
                        return true;
                    }
                }
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => return true,
            }
        }
        false
    }

    /// Returns true when the thread should exit.
    fn handle_cmd(&mut self, cmd: TransportCmd) -> bool {
        log::trace!(target: "transport", "{:?}", cmd);
        match cmd {
            TransportCmd::SetStore(store) => self.store = *store,
            TransportCmd::SetCell {
                pool,
                phrase,
                row,
                column,
                value,
            } => self.store.set_column(pool, phrase, row, column, value),
            TransportCmd::SetChainCell { pool, chain, row, phrase } => {
                self.store.set_chain_cell(pool, chain, row, phrase)
            }
            TransportCmd::SetSongCell { track, row, chain } => self.store.set_song_cell(track, row, chain),
            TransportCmd::SetTrackCategory { track, category } => self.store.set_track_category(track, category),
            TransportCmd::SetArpeggio { index, program } => match self.store.arpeggios.get_mut(index) {
                Some(slot) => *slot = program,
                None => log::warn!(target: "transport", "arpeggio index {} out of range", index),
            },
            TransportCmd::SetTempo(tempo) => self.next_tempo = tempo,
            TransportCmd::Play { start, policy } => self.start(start, policy),
            TransportCmd::Stop => self.stop(),
            TransportCmd::SetParam { name, value } => {
                if let Err(e) = self.dispatcher.client().param_set(&name, value) {
                    log::debug!(target: "transport", "param {} dropped: {}", name, e);
                }
            }
            TransportCmd::Shutdown => return true,
        }
        false
    }

    fn start(&mut self, start: PlaybackStart, policy: Box<dyn AdvancePolicy>) {
        self.dispatcher.release_all();
        self.dispatcher.set_tempo(self.next_tempo);
        if let Err(e) = self.dispatcher.client().param_set("bpm", self.next_tempo.bpm) {
            log::debug!(target: "transport", "tempo not sent to engine: {}", e);
        }
        log::info!(
            target: "transport",
            "play {:?} at {} bpm, {} ticks per beat",
            start,
            self.next_tempo.bpm,
            self.next_tempo.ppq
        );

        let mut sink = FeedbackSink {
            dispatcher: &mut self.dispatcher,
            feedback_tx: &self.feedback_tx,
        };
        self.scheduler.start(&self.store, start, &mut sink);
        self.tick_accumulator = 0.0;
        self.last_pass = Instant::now();

        if self.scheduler.is_playing() {
            self.policy = Some(policy);
        } else {
            log::info!(target: "transport", "nothing playable at {:?}", start);
            self.finish();
        }
    }

    fn stop(&mut self) {
        let was_playing = self.policy.is_some();
        self.scheduler.stop();
        self.dispatcher.release_all();
        if was_playing {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.policy = None;
        self.tick_accumulator = 0.0;
        let _ = self.feedback_tx.send(TransportFeedback::Stopped);
    }

    /// Run one scheduler tick per whole tick owed. Ticks late because of a
    /// slow pass are caught up, never dropped.
    fn advance(&mut self, elapsed: Duration) {
        let Some(policy) = self.policy.as_mut() else {
            return;
        };

        self.tick_accumulator += elapsed.as_secs_f64() * self.dispatcher.tempo().tick_rate_hz();
        let owed = self.tick_accumulator.floor();
        if owed < 1.0 {
            return;
        }
        self.tick_accumulator -= owed;
        let owed = owed as u64;
        if owed > 1 {
            self.telemetry.record_catch_up(owed - 1);
        }

        let mut sink = FeedbackSink {
            dispatcher: &mut self.dispatcher,
            feedback_tx: &self.feedback_tx,
        };
        for _ in 0..owed {
            self.scheduler.tick(&self.store, &mut **policy, &mut sink);
            if !self.scheduler.is_playing() {
                break;
            }
        }

        if !self.scheduler.is_playing() {
            log::info!(target: "transport", "all tracks finished");
            self.finish();
        }
    }

    fn emit_telemetry(&mut self) {
        if !self.telemetry_enabled || self.last_telemetry_emit.elapsed() < TELEMETRY_PERIOD {
            return;
        }
        self.last_telemetry_emit = Instant::now();
        let summary = self.telemetry.take_summary();
        log::debug!(
            target: "transport::telemetry",
            "pass avg {}us max {}us p95 {}us, {} overruns, {} late ticks",
            summary.avg_us,
            summary.max_us,
            summary.p95_us,
            summary.overruns,
            summary.late_ticks
        );
        let _ = self.feedback_tx.send(TransportFeedback::Telemetry(summary));
    }
}
