//! # stepline-types
//!
//! Pattern data shared by the stepline crates: the phrase/chain/song store,
//! its lookup tables, and the pure functions that read it (sticky column
//! resolution, chord building, arpeggio expansion).

pub mod arp_expand;
pub mod state;
pub mod sticky;

pub use arp_expand::{expand, expand_indexed, ArpSequence};
pub use state::*;
pub use sticky::{is_playable, resolve, resolve_for_track, resolve_row, ResolvedRow};
