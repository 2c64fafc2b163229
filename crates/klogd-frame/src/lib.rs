//! Newline reframing of raw kernel log reads.
//!
//! This is the core of klogd. Raw reads land in a fixed-capacity carry
//! buffer, which is split into lines:
//! - each line loses its trailing newline and an optional `<d>` priority tag
//! - an incomplete trailing line is carried over to the next read
//! - a single line that fills the whole buffer is flushed as-is
//!
//! No allocation growth, no partial messages in user code.

pub mod error;
pub mod priority;
pub mod processor;

pub use error::{FrameError, Result};
pub use priority::{decode_tag, Facility, Priority};
pub use processor::{
    CarryBuffer, DecodedMessage, FrameProcessor, Messages, DEFAULT_CAPACITY, MIN_CAPACITY,
};
