pub mod arpeggio;
pub mod chord;
pub mod column;
pub mod pattern;
pub mod tables;

pub use arpeggio::*;
pub use chord::*;
pub use column::*;
pub use pattern::*;
pub use tables::*;
