//! Musical time: tick-based positions, slot lengths and the transport.

pub mod beat;
pub mod note_value;
pub mod transport;

pub use beat::{Beat, TICKS_PER_BEAT};
pub use note_value::NoteValue;
pub use transport::{PlayState, Transport};
