//! Playback state machine
//!
//! States a capture run moves through, from opening the video to releasing it.

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Opening the video source
    #[default]
    Opening,
    /// Reading and showing frames
    Playing,
    /// Saving the current frame
    Capturing,
    /// Quit key pressed or window closed
    Quitting,
    /// No more frames
    Ending,
    /// Source released and window closed
    Closed,
}

impl PlaybackState {
    /// Get display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            PlaybackState::Opening => "Opening",
            PlaybackState::Playing => "Playing",
            PlaybackState::Capturing => "Capturing",
            PlaybackState::Quitting => "Quitting",
            PlaybackState::Ending => "Ending",
            PlaybackState::Closed => "Closed",
        }
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The quit key was pressed
    Quit,
    /// The window was closed
    WindowClosed,
    /// End of stream or a frame that could not be decoded
    EndOfStream,
}

impl ExitReason {
    /// State the loop leaves through for this reason
    pub fn state(&self) -> PlaybackState {
        match self {
            ExitReason::Quit | ExitReason::WindowClosed => PlaybackState::Quitting,
            ExitReason::EndOfStream => PlaybackState::Ending,
        }
    }
}

/// Screenshot numbering for one run
///
/// The counter only moves forward after a file is written, so the saved
/// files are numbered 1, 2, 3... with no gaps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureCounter(u32);

impl CaptureCounter {
    pub fn new() -> Self {
        Self(0)
    }

    /// Number the next screenshot will get
    pub fn next_index(&self) -> u32 {
        self.0 + 1
    }

    /// Record that the screenshot at `next_index` was saved
    pub fn commit(&mut self) {
        self.0 += 1;
    }

    /// Screenshots saved so far
    pub fn count(&self) -> u32 {
        self.0
    }
}
