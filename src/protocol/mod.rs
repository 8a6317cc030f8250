//! Protocol module for decoding sensor notifications.
//!
//! The sensor speaks a single notification format: the temperature &
//! humidity frame decoded by [`frame::Reading`].

pub mod frame;

pub use frame::{Reading, FRAME_MARKER, MIN_FRAME_LEN};
