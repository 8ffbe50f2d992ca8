//! Display module
//!
//! The surface frames are rendered to and key presses are read from.

mod window;

use std::time::Duration;

use crate::video::Frame;

pub use window::launch;

/// Outcome of waiting for a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPoll {
    /// A character was typed
    Key(char),
    /// Nothing was typed before the timeout
    Timeout,
    /// The surface is gone and no more keys will arrive
    Closed,
}

/// A surface that shows frames and reports typed keys
///
/// Dropping the surface closes it.
pub trait FrameDisplay {
    /// Render a frame, replacing the previous one
    fn show(&mut self, frame: &Frame);

    /// Block up to `timeout` for the next typed key
    fn wait_key(&mut self, timeout: Duration) -> KeyPoll;
}
