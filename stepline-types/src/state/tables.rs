//! Index-addressed settings tables referenced from phrase columns.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Retrigger settings, referenced by the retrigger column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetriggerSettings {
    /// Extra repeats after the initial hit (0 = off).
    pub times: i32,
    /// Repeats per row length.
    pub rate_divisor: i32,
}

/// Timestretch settings, referenced by the timestretch column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimestretchSettings {
    /// Beats the sample is stretched to fill (0 = off).
    pub beats: i32,
}

/// Engine-side synth definition selected by the sound-maker column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SoundMaker {
    pub synth: String,
}

/// A sample file referenced by the filename column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleFile {
    pub path: PathBuf,
    /// Tempo the file was recorded at.
    pub bpm: f32,
    /// Number of equal slices the file is cut into.
    pub slices: i32,
}

impl SampleFile {
    pub fn new(path: impl Into<PathBuf>, bpm: f32, slices: i32) -> Self {
        Self {
            path: path.into(),
            bpm,
            slices: slices.max(1),
        }
    }
}
