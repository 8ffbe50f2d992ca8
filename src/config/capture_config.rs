//! Capture configuration
//!
//! Fixed settings of a capture run, optionally read from a JSON file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Output image size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A single-character key matched without regard to case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureKey(char);

impl CaptureKey {
    pub fn new(key: char) -> Self {
        Self(key)
    }

    /// Parse user input that must be exactly one non-whitespace character
    pub fn parse(input: &str) -> Option<Self> {
        let mut chars = input.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_whitespace() => Some(Self(c)),
            _ => None,
        }
    }

    /// Whether a pressed key is this key in either case
    pub fn matches(&self, pressed: char) -> bool {
        self.0.to_lowercase().eq(pressed.to_lowercase())
    }

    pub fn upper(&self) -> String {
        self.0.to_uppercase().collect()
    }

    pub fn lower(&self) -> String {
        self.0.to_lowercase().collect()
    }
}

/// Settings that are fixed for the whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Folder for screenshots; `~/Desktop/Screenshots` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Size every screenshot is resized to
    #[serde(default)]
    pub resolution: Resolution,

    /// Key that ends playback
    #[serde(default = "default_quit_key")]
    pub quit_key: char,

    /// Title of the playback window
    #[serde(default = "default_window_title")]
    pub window_title: String,
}

fn default_quit_key() -> char {
    'q'
}

fn default_window_title() -> String {
    "Video".to_string()
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            resolution: Resolution::default(),
            quit_key: default_quit_key(),
            window_title: default_window_title(),
        }
    }
}

impl CaptureConfig {
    /// Load configuration from JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: CaptureConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        if config.resolution.width == 0 || config.resolution.height == 0 {
            anyhow::bail!("Resolution must be non-zero, got {}", config.resolution);
        }
        Ok(config)
    }

    /// Output folder, falling back to the desktop default
    pub fn resolve_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| default_output_dir(home_dir()))
    }
}

/// `<home>/Desktop/Screenshots`, or `./Desktop/Screenshots` without a home
pub fn default_output_dir(home: Option<PathBuf>) -> PathBuf {
    home.unwrap_or_else(|| PathBuf::from("."))
        .join("Desktop")
        .join("Screenshots")
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}
