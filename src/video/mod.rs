//! Video module
//!
//! Provides video decoding using FFmpeg and the frame type passed to the
//! playback loop.
//!
//! # Usage
//!
//! ```rust,ignore
//! use video::{FrameSource, VideoDecoder};
//!
//! let mut decoder = VideoDecoder::open("clip.mp4")?;
//!
//! while let Some(frame) = decoder.next_frame() {
//!     // Use the frame
//! }
//! ```

mod decoder;
mod frame;

pub use decoder::VideoDecoder;
pub use frame::Frame;

/// A sequence of decoded frames
///
/// The source is released when it is dropped.
pub trait FrameSource {
    /// Decode the next frame
    ///
    /// Returns None at end of stream or when decoding fails; the two are
    /// not distinguished.
    fn next_frame(&mut self) -> Option<Frame>;
}
