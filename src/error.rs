//! Error types for a capture run

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The video could not be opened or has no decodable video stream
    #[error("could not open video {}: {reason}", .path.display())]
    SourceOpen { path: PathBuf, reason: String },

    /// The screenshot folder could not be created
    #[error("could not create output folder {}: {source}", .path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A screenshot could not be written
    #[error("could not save screenshot {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The playback window failed
    #[error("display error: {0}")]
    Display(String),
}
