//! The volatile cell cache: entries, the key-to-entry map, and the
//! generation sweep.

mod entry;
mod map;

pub use entry::Entry;
pub use map::{LoadOutcome, VolatileCache};
