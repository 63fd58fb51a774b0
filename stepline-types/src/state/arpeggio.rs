use serde::{Deserialize, Serialize};

/// Steps in every arpeggio program.
pub const ARP_STEPS: usize = 16;

/// Largest count or divisor a step can hold, the same range as a phrase column.
pub const ARP_VALUE_MAX: i32 = 254;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArpDirection {
    #[default]
    None,
    Up,
    Down,
}

/// One row of an arpeggio program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArpStep {
    pub direction: ArpDirection,
    pub count: i32,
    /// Notes per row length: a divisor of 4 spaces notes a quarter row apart.
    pub divisor: i32,
}

impl Default for ArpStep {
    fn default() -> Self {
        Self {
            direction: ArpDirection::None,
            count: -1,
            divisor: -1,
        }
    }
}

impl ArpStep {
    pub fn new(direction: ArpDirection, count: i32, divisor: i32) -> Self {
        Self {
            direction,
            count,
            divisor,
        }
    }

    /// A step contributes notes only with a direction, a count and a usable divisor.
    /// A zero divisor would mean an infinitely fast rate, so it is skipped as well.
    /// Values past [`ARP_VALUE_MAX`] cannot come from the editor and are skipped.
    pub fn is_active(&self) -> bool {
        self.direction != ArpDirection::None
            && (0..=ARP_VALUE_MAX).contains(&self.count)
            && (1..=ARP_VALUE_MAX).contains(&self.divisor)
    }
}

/// A 16-step arpeggio program.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArpeggioProgram {
    pub steps: [ArpStep; ARP_STEPS],
}

impl ArpeggioProgram {
    /// Build a program from leading steps; the remainder stays skipped.
    pub fn from_steps(steps: &[ArpStep]) -> Self {
        let mut program = Self::default();
        for (slot, step) in program.steps.iter_mut().zip(steps) {
            *slot = *step;
        }
        program
    }

    pub fn active_steps(&self) -> impl Iterator<Item = &ArpStep> {
        self.steps.iter().filter(|s| s.is_active())
    }

    pub fn is_empty(&self) -> bool {
        self.active_steps().next().is_none()
    }
}
