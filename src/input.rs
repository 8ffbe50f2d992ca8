//! Terminal prompts for inputs not given on the command line

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::config::CaptureKey;

pub const VIDEO_PROMPT: &str = "Enter the path to the video file: ";
pub const KEY_PROMPT: &str = "Enter the key to use for taking a screenshot (e.g., 'S'): ";
pub const DELAY_PROMPT: &str =
    "Enter the playback speed (smaller number = faster, e.g., 10 for fast): ";

/// Parse a playback delay: a positive whole number of milliseconds
pub fn parse_delay(input: &str) -> Option<u64> {
    input.trim().parse::<u64>().ok().filter(|ms| *ms > 0)
}

/// Parse a video path, ignoring surrounding whitespace and quotes
pub fn parse_video_path(input: &str) -> Option<PathBuf> {
    let trimmed = input.trim().trim_matches(|c| c == '"' || c == '\'');
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

/// Ask until `parse` accepts the answer
///
/// Fails if the input ends before a valid answer is given.
pub fn prompt_until<T, R, W, P>(input: &mut R, output: &mut W, message: &str, parse: P) -> Result<T>
where
    R: BufRead,
    W: Write,
    P: Fn(&str) -> Option<T>,
{
    loop {
        write!(output, "{}", message)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            bail!("input closed before a value was entered");
        }
        if let Some(value) = parse(&line) {
            return Ok(value);
        }
        writeln!(output, "Invalid value {:?}, try again.", line.trim())?;
    }
}

pub fn prompt_video_path<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<PathBuf> {
    prompt_until(input, output, VIDEO_PROMPT, parse_video_path)
}

pub fn prompt_capture_key<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<CaptureKey> {
    prompt_until(input, output, KEY_PROMPT, CaptureKey::parse)
}

pub fn prompt_delay<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<u64> {
    prompt_until(input, output, DELAY_PROMPT, parse_delay)
}
