//! Chord + arpeggio program expansion into a timed note list.

use crate::state::{ArpDirection, ArpeggioProgram, PatternStore};

/// Notes of an expanded arpeggio with the divisor that times each one.
///
/// `divisors[i]` is the divisor of the step that produced `notes[i]`; the wait
/// after note `i` is the row duration divided by it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArpSequence {
    pub notes: Vec<i32>,
    pub divisors: Vec<f64>,
}

impl ArpSequence {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }
}

/// Expand `chord` (root first, already transposed) through `program`.
pub fn expand(chord: &[i32], program: &ArpeggioProgram) -> ArpSequence {
    let mut out = ArpSequence::default();
    let Some(&first) = chord.first() else {
        return out;
    };

    let mut current = first;
    for step in program.active_steps() {
        for _ in 0..step.count {
            current = next_note(chord, current, step.direction);
            out.notes.push(current);
            out.divisors.push(step.divisor as f64);
        }
    }
    out
}

/// Expand with the program at `index`; an invalid index gives an empty sequence.
pub fn expand_indexed(store: &PatternStore, chord: &[i32], index: i32) -> ArpSequence {
    store
        .arpeggio(index)
        .map(|program| expand(chord, program))
        .unwrap_or_default()
}

fn next_note(chord: &[i32], current: i32, direction: ArpDirection) -> i32 {
    if chord.len() == 1 {
        return match direction {
            ArpDirection::Up => current + 12,
            ArpDirection::Down => current - 12,
            ArpDirection::None => current,
        };
    }

    let (index, octave_shift) = locate(chord, current);
    let last = chord.len() - 1;
    let next = match direction {
        ArpDirection::Up if index == last => chord[0] + 12,
        ArpDirection::Up => chord[index + 1],
        ArpDirection::Down if index == 0 => chord[last] - 12,
        ArpDirection::Down => chord[index - 1],
        ArpDirection::None => chord[index],
    };
    next + octave_shift
}

/// Position of `current` in the chord and how far (in whole octaves) it sits
/// from that chord tone.
///
/// Exact match first, then the closest tone with the same pitch class, then
/// the closest tone by absolute pitch.
fn locate(chord: &[i32], current: i32) -> (usize, i32) {
    if let Some(i) = chord.iter().position(|&n| n == current) {
        return (i, 0);
    }

    let pitch_class = current.rem_euclid(12);
    let same_class = chord
        .iter()
        .enumerate()
        .filter(|&(_, &n)| n.rem_euclid(12) == pitch_class)
        .min_by_key(|&(_, &n)| (current - n).abs());
    if let Some((i, &n)) = same_class {
        return (i, current - n);
    }

    let nearest = chord
        .iter()
        .enumerate()
        .min_by_key(|&(_, &n)| (current - n).abs())
        .map_or(0, |(i, _)| i);
    (nearest, 0)
}
