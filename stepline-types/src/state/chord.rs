//! Chord construction from the chord-type, chord-addition and
//! chord-transposition columns.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChordType {
    #[default]
    None,
    Major,
    Minor,
    Diminished,
    Augmented,
    Sus2,
    Sus4,
    Power,
}

impl ChordType {
    pub fn from_index(index: i32) -> ChordType {
        match index {
            1 => ChordType::Major,
            2 => ChordType::Minor,
            3 => ChordType::Diminished,
            4 => ChordType::Augmented,
            5 => ChordType::Sus2,
            6 => ChordType::Sus4,
            7 => ChordType::Power,
            _ => ChordType::None,
        }
    }

    /// Semitone offsets including the root (0).
    pub fn intervals(&self) -> &'static [i32] {
        match self {
            ChordType::None => &[0],
            ChordType::Major => &[0, 4, 7],
            ChordType::Minor => &[0, 3, 7],
            ChordType::Diminished => &[0, 3, 6],
            ChordType::Augmented => &[0, 4, 8],
            ChordType::Sus2 => &[0, 2, 7],
            ChordType::Sus4 => &[0, 5, 7],
            ChordType::Power => &[0, 7],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChordAddition {
    #[default]
    None,
    Seventh,
    Ninth,
    Fourth,
}

impl ChordAddition {
    pub fn from_index(index: i32) -> ChordAddition {
        match index {
            1 => ChordAddition::Seventh,
            2 => ChordAddition::Ninth,
            3 => ChordAddition::Fourth,
            _ => ChordAddition::None,
        }
    }

    /// Extra interval for this addition on top of `chord`.
    /// Sevenths are major on major-sounding chords and minor otherwise.
    fn interval(&self, chord: ChordType) -> Option<i32> {
        match self {
            ChordAddition::None => None,
            ChordAddition::Seventh => match chord {
                ChordType::Major | ChordType::Augmented => Some(11),
                _ => Some(10),
            },
            ChordAddition::Ninth => Some(14),
            ChordAddition::Fourth => Some(5),
        }
    }
}

/// Build the sounding chord for `root`.
///
/// Notes are sorted ascending; each step of `transposition` moves the lowest
/// note up an octave (the next inversion).
pub fn build_chord(root: i32, chord: ChordType, addition: ChordAddition, transposition: i32) -> Vec<i32> {
    if chord == ChordType::None {
        return vec![root];
    }

    let mut notes: Vec<i32> = chord.intervals().iter().map(|&i| root + i).collect();
    if let Some(extra) = addition.interval(chord) {
        let note = root + extra;
        if !notes.contains(&note) {
            notes.push(note);
        }
    }
    notes.sort_unstable();

    for _ in 0..transposition.max(0) {
        let lowest = notes.remove(0);
        notes.push(lowest + 12);
    }
    notes
}
