use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use stepline_audio::{Tempo, TransportSettings};

use crate::policy::PlaybackMode;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

const BPM_RANGE: (f32, f32) = (20.0, 999.0);
const PPQ_RANGE: (u32, u32) = (1, 96);
const TICK_INTERVAL_RANGE_US: (u64, u64) = (100, 5_000);

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    defaults: DefaultsConfig,
    #[serde(default)]
    engine: EngineConfig,
    #[serde(default)]
    runtime: RuntimeConfig,
}

#[derive(Deserialize, Default)]
struct DefaultsConfig {
    bpm: Option<f32>,
    ppq: Option<u32>,
    mode: Option<String>,
}

#[derive(Deserialize, Default)]
struct EngineConfig {
    host: Option<String>,
    port: Option<u16>,
    local_port: Option<u16>,
    latency: Option<f64>,
}

#[derive(Deserialize, Default)]
struct RuntimeConfig {
    tick_interval_us: Option<u64>,
    telemetry: Option<bool>,
}

pub struct Config {
    defaults: DefaultsConfig,
    engine: EngineConfig,
    runtime: RuntimeConfig,
}

impl Config {
    /// Embedded defaults overlaid with the user's config file, if any.
    pub fn load() -> Self {
        Self::load_with(user_config_path().as_deref())
    }

    /// Embedded defaults overlaid with the file at `path`. A missing or
    /// malformed file leaves the defaults in place.
    pub fn load_with(path: Option<&Path>) -> Self {
        let mut base: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
            log::error!(target: "config", "embedded config.toml is invalid: {}", e);
            ConfigFile::default()
        });

        if let Some(path) = path.filter(|p| p.exists()) {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                    Ok(user) => {
                        merge_defaults(&mut base.defaults, user.defaults);
                        merge_engine(&mut base.engine, user.engine);
                        merge_runtime(&mut base.runtime, user.runtime);
                        log::info!(target: "config", "loaded {}", path.display());
                    }
                    Err(e) => {
                        log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                    }
                },
                Err(e) => {
                    log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                }
            }
        }

        Config {
            defaults: base.defaults,
            engine: base.engine,
            runtime: base.runtime,
        }
    }

    pub fn bpm(&self) -> f32 {
        self.defaults.bpm.unwrap_or(120.0).clamp(BPM_RANGE.0, BPM_RANGE.1)
    }

    /// Ticks per beat.
    pub fn ppq(&self) -> u32 {
        self.defaults.ppq.unwrap_or(4).clamp(PPQ_RANGE.0, PPQ_RANGE.1)
    }

    pub fn tempo(&self) -> Tempo {
        Tempo {
            bpm: self.bpm(),
            ppq: self.ppq(),
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        match self.defaults.mode.as_deref().map(str::parse::<PlaybackMode>) {
            Some(Ok(mode)) => mode,
            Some(Err(e)) => {
                log::warn!(target: "config", "{}, using song mode", e);
                PlaybackMode::default()
            }
            None => PlaybackMode::default(),
        }
    }

    /// `host:port` of the synthesis engine.
    pub fn engine_addr(&self) -> String {
        format!(
            "{}:{}",
            self.engine.host.as_deref().unwrap_or("127.0.0.1"),
            self.engine.port.unwrap_or(57120)
        )
    }

    pub fn local_port(&self) -> u16 {
        self.engine.local_port.unwrap_or(0)
    }

    /// Scheduling lead time for engine events, in seconds (clamped to 0..1).
    pub fn latency_secs(&self) -> f64 {
        self.engine.latency.unwrap_or(0.05).clamp(0.0, 1.0)
    }

    pub fn tick_interval(&self) -> Duration {
        let us = self
            .runtime
            .tick_interval_us
            .unwrap_or(500)
            .clamp(TICK_INTERVAL_RANGE_US.0, TICK_INTERVAL_RANGE_US.1);
        Duration::from_micros(us)
    }

    pub fn telemetry_enabled(&self) -> bool {
        self.runtime.telemetry.unwrap_or(false)
    }

    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            tempo: self.tempo(),
            tick_interval: self.tick_interval(),
            telemetry: self.telemetry_enabled(),
        }
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("stepline").join("config.toml"))
}

fn merge_defaults(base: &mut DefaultsConfig, user: DefaultsConfig) {
    if user.bpm.is_some() {
        base.bpm = user.bpm;
    }
    if user.ppq.is_some() {
        base.ppq = user.ppq;
    }
    if user.mode.is_some() {
        base.mode = user.mode;
    }
}

fn merge_engine(base: &mut EngineConfig, user: EngineConfig) {
    if user.host.is_some() {
        base.host = user.host;
    }
    if user.port.is_some() {
        base.port = user.port;
    }
    if user.local_port.is_some() {
        base.local_port = user.local_port;
    }
    if user.latency.is_some() {
        base.latency = user.latency;
    }
}

fn merge_runtime(base: &mut RuntimeConfig, user: RuntimeConfig) {
    if user.tick_interval_us.is_some() {
        base.tick_interval_us = user.tick_interval_us;
    }
    if user.telemetry.is_some() {
        base.telemetry = user.telemetry;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn with_user_config(contents: &str) -> Config {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        Config::load_with(Some(file.path()))
    }

    #[test]
    fn test_load_embedded_config() {
        let config = Config::load_with(None);
        assert!((config.bpm() - 120.0).abs() < f32::EPSILON);
        assert_eq!(config.ppq(), 4);
        assert_eq!(config.mode(), PlaybackMode::Song);
        assert_eq!(config.engine_addr(), "127.0.0.1:57120");
        assert_eq!(config.local_port(), 0);
        assert!((config.latency_secs() - 0.05).abs() < 1e-9);
        assert_eq!(config.tick_interval(), Duration::from_micros(500));
        assert!(!config.telemetry_enabled());
    }

    #[test]
    fn test_user_config_overrides_fields() {
        let config = with_user_config(
            r#"
            [defaults]
            ppq = 2
            mode = "phrase"

            [engine]
            port = 9000
            "#,
        );
        assert_eq!(config.ppq(), 2);
        assert_eq!(config.mode(), PlaybackMode::Phrase);
        assert_eq!(config.engine_addr(), "127.0.0.1:9000");
        // untouched fields keep the embedded defaults
        assert!((config.bpm() - 120.0).abs() < f32::EPSILON);
        assert_eq!(config.tick_interval(), Duration::from_micros(500));
    }

    #[test]
    fn test_malformed_config_keeps_defaults() {
        let config = with_user_config("[defaults\nbpm = ");
        assert!((config.bpm() - 120.0).abs() < f32::EPSILON);
        assert_eq!(config.mode(), PlaybackMode::Song);
    }

    #[test]
    fn test_missing_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_with(Some(&dir.path().join("nope.toml")));
        assert_eq!(config.ppq(), 4);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let config = with_user_config(
            r#"
            [defaults]
            bpm = 5000.0
            ppq = 0
            mode = "sideways"

            [runtime]
            tick_interval_us = 1
            "#,
        );
        assert!((config.bpm() - 999.0).abs() < f32::EPSILON);
        assert_eq!(config.ppq(), 1);
        assert_eq!(config.mode(), PlaybackMode::Song);
        assert_eq!(config.tick_interval(), Duration::from_micros(100));
    }

    #[test]
    fn test_transport_settings() {
        let settings = with_user_config("[runtime]\ntelemetry = true\n").transport_settings();
        assert!(settings.telemetry);
        assert_eq!(settings.tempo, Tempo { bpm: 120.0, ppq: 4 });
    }
}
