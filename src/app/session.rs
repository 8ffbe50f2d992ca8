//! Playback-and-capture session
//!
//! Opens a video, shows it frame by frame and saves the displayed frame as a
//! resized PNG whenever the capture key is pressed.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::error::{ImageError, ParameterError, ParameterErrorKind};
use image::imageops::{self, FilterType};
use image::ImageFormat;
use tracing::{debug, error, info};

use crate::config::{CaptureKey, Resolution};
use crate::display::{FrameDisplay, KeyPoll};
use crate::error::SessionError;
use crate::video::{Frame, FrameSource, VideoDecoder};

use super::state::{CaptureCounter, ExitReason, PlaybackState};

/// Everything a run needs besides the video itself
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Folder screenshots are written to
    pub output_dir: PathBuf,
    /// Key that saves the current frame, either case
    pub capture_key: CaptureKey,
    /// Key that stops playback, matched exactly
    pub quit_key: char,
    /// Size of every saved screenshot
    pub resolution: Resolution,
    /// How long each frame waits for a key; also the playback pace
    pub frame_delay: Duration,
}

/// What happened during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub exit: ExitReason,
    pub frames_shown: u64,
    /// Saved screenshots in capture order
    pub saved: Vec<PathBuf>,
}

/// Open a video file as a frame source
pub fn open_video(path: &Path) -> Result<VideoDecoder, SessionError> {
    VideoDecoder::open(path).map_err(|e| SessionError::SourceOpen {
        path: path.to_path_buf(),
        reason: format!("{:#}", e),
    })
}

/// Create the screenshot folder and any missing parents
pub fn prepare_output_dir(dir: &Path) -> Result<(), SessionError> {
    std::fs::create_dir_all(dir).map_err(|source| SessionError::OutputDirectory {
        path: dir.to_path_buf(),
        source,
    })?;
    debug!("Output folder ready: {}", dir.display());
    Ok(())
}

/// Path of the screenshot with the given number
pub fn screenshot_path(dir: &Path, index: u32) -> PathBuf {
    dir.join(format!("screenshot_{}.png", index))
}

/// Convert a frame to RGB, resize it with a Lanczos filter and write a PNG
pub fn save_screenshot(frame: &Frame, path: &Path, resolution: Resolution) -> Result<(), SessionError> {
    let rgb = frame.to_rgb_image().ok_or_else(|| SessionError::Write {
        path: path.to_path_buf(),
        source: ImageError::Parameter(ParameterError::from_kind(
            ParameterErrorKind::DimensionMismatch,
        )),
    })?;
    let resized = imageops::resize(&rgb, resolution.width, resolution.height, FilterType::Lanczos3);
    resized
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| SessionError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Open the video, prepare the output folder, then hand the source to `launch`
///
/// `launch` is only called once both steps succeeded, so a video that cannot
/// be opened never opens a window or touches the output folder. Status lines
/// for the user go to `out`.
pub fn run<S, O, L, W>(
    video_path: &Path,
    settings: &SessionSettings,
    out: &mut W,
    open: O,
    launch: L,
) -> Result<SessionSummary, SessionError>
where
    O: FnOnce(&Path) -> Result<S, SessionError>,
    L: FnOnce(S) -> Result<SessionSummary, SessionError>,
    W: Write,
{
    debug!("State: {}", PlaybackState::Opening.display_name());
    let source = match open(video_path) {
        Ok(source) => source,
        Err(e) => {
            let _ = writeln!(out, "Error: Could not open video.");
            return Err(e);
        }
    };

    prepare_output_dir(&settings.output_dir)?;

    let _ = writeln!(
        out,
        "Press '{}' or '{}' to take a screenshot.",
        settings.capture_key.upper(),
        settings.capture_key.lower()
    );
    let _ = writeln!(out, "Press '{}' to quit the video.", settings.quit_key);

    launch(source)
}

/// Run the playback loop until the quit key, a closed window or end of stream
///
/// Takes ownership of both the source and the display; both are released
/// before this returns, whichever way the loop ends.
pub fn play<S, D, W>(mut source: S, mut display: D, settings: &SessionSettings, out: &mut W) -> SessionSummary
where
    S: FrameSource,
    D: FrameDisplay,
    W: Write,
{
    let mut state = PlaybackState::Playing;
    let mut counter = CaptureCounter::new();
    let mut frames_shown = 0u64;
    let mut saved = Vec::new();

    info!(
        "Playback started: delay {:?}, screenshots {} into {}",
        settings.frame_delay,
        settings.resolution,
        settings.output_dir.display()
    );

    let exit = loop {
        let Some(frame) = source.next_frame() else {
            let _ = writeln!(out, "End of video or error.");
            break ExitReason::EndOfStream;
        };

        display.show(&frame);
        frames_shown += 1;

        let key = match display.wait_key(settings.frame_delay) {
            KeyPoll::Key(key) => key,
            KeyPoll::Timeout => continue,
            KeyPoll::Closed => break ExitReason::WindowClosed,
        };

        if settings.capture_key.matches(key) {
            transition(&mut state, PlaybackState::Capturing);
            if let Some(path) = capture(&frame, &mut counter, settings, out) {
                saved.push(path);
            }
            transition(&mut state, PlaybackState::Playing);
        }

        if key == settings.quit_key {
            break ExitReason::Quit;
        }
    };
    transition(&mut state, exit.state());

    drop(source);
    drop(display);
    transition(&mut state, PlaybackState::Closed);

    info!(
        "Playback finished ({:?}): {} frames shown, {} screenshots saved",
        exit, frames_shown, counter.count()
    );

    SessionSummary {
        exit,
        frames_shown,
        saved,
    }
}

/// Save one screenshot; a failed write is reported and playback goes on
fn capture<W: Write>(
    frame: &Frame,
    counter: &mut CaptureCounter,
    settings: &SessionSettings,
    out: &mut W,
) -> Option<PathBuf> {
    let index = counter.next_index();
    let path = screenshot_path(&settings.output_dir, index);

    match save_screenshot(frame, &path, settings.resolution) {
        Ok(()) => {
            counter.commit();
            let _ = writeln!(out, "Screenshot {} saved to {}", index, path.display());
            info!("Saved {} ({})", path.display(), settings.resolution);
            Some(path)
        }
        Err(e) => {
            let _ = writeln!(out, "Error: {}", e);
            error!("Screenshot {} failed: {:?}", index, e);
            None
        }
    }
}

fn transition(state: &mut PlaybackState, next: PlaybackState) {
    debug!("State: {} -> {}", state.display_name(), next.display_name());
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Frames from memory; counts how often it is dropped
    struct ScriptedSource {
        frames: VecDeque<Frame>,
        released: Rc<Cell<u32>>,
    }

    impl ScriptedSource {
        fn new(frames: Vec<Frame>) -> (Self, Rc<Cell<u32>>) {
            let released = Rc::new(Cell::new(0));
            let source = Self {
                frames: frames.into(),
                released: Rc::clone(&released),
            };
            (source, released)
        }
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self) -> Option<Frame> {
            self.frames.pop_front()
        }
    }

    impl Drop for ScriptedSource {
        fn drop(&mut self) {
            self.released.set(self.released.get() + 1);
        }
    }

    /// Replays key polls, one per frame, then times out forever
    #[derive(Default)]
    struct DisplayLog {
        shown: Vec<(u32, u32)>,
        waits: Vec<Duration>,
        closed: u32,
    }

    struct ScriptedDisplay {
        keys: VecDeque<KeyPoll>,
        log: Rc<RefCell<DisplayLog>>,
        /// Create this folder right before the given wait (0-based)
        mkdir_before_wait: Option<(usize, PathBuf)>,
    }

    impl ScriptedDisplay {
        fn new(keys: Vec<KeyPoll>) -> (Self, Rc<RefCell<DisplayLog>>) {
            let log = Rc::new(RefCell::new(DisplayLog::default()));
            let display = Self {
                keys: keys.into(),
                log: Rc::clone(&log),
                mkdir_before_wait: None,
            };
            (display, log)
        }
    }

    impl FrameDisplay for ScriptedDisplay {
        fn show(&mut self, frame: &Frame) {
            self.log.borrow_mut().shown.push((frame.width(), frame.height()));
        }

        fn wait_key(&mut self, timeout: Duration) -> KeyPoll {
            let wait_number = {
                let mut log = self.log.borrow_mut();
                log.waits.push(timeout);
                log.waits.len() - 1
            };
            if let Some((at, ref dir)) = self.mkdir_before_wait {
                if at == wait_number {
                    std::fs::create_dir_all(dir).unwrap();
                }
            }
            self.keys.pop_front().unwrap_or(KeyPoll::Timeout)
        }
    }

    impl Drop for ScriptedDisplay {
        fn drop(&mut self) {
            self.log.borrow_mut().closed += 1;
        }
    }

    fn settings(dir: &Path, key: char, resolution: Resolution) -> SessionSettings {
        SessionSettings {
            output_dir: dir.to_path_buf(),
            capture_key: CaptureKey::new(key),
            quit_key: 'q',
            resolution,
            frame_delay: Duration::from_millis(30),
        }
    }

    fn frames(count: usize, width: u32, height: u32) -> Vec<Frame> {
        (0..count)
            .map(|i| Frame::filled_bgr(width, height, [(i as u8).wrapping_mul(40), 90, 200]))
            .collect()
    }

    fn lines(out: Vec<u8>) -> Vec<String> {
        String::from_utf8(out).unwrap().lines().map(str::to_string).collect()
    }

    fn png_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_capture_then_quit_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), 'S', Resolution::new(640, 480));
        let (source, released) = ScriptedSource::new(frames(3, 32, 24));
        let (display, log) = ScriptedDisplay::new(vec![
            KeyPoll::Timeout,
            KeyPoll::Key('s'),
            KeyPoll::Key('q'),
        ]);
        let mut out = Vec::new();

        let summary = play(source, display, &settings, &mut out);

        assert_eq!(summary.exit, ExitReason::Quit);
        assert_eq!(summary.frames_shown, 3);
        assert_eq!(
            lines(out),
            vec![format!(
                "Screenshot 1 saved to {}",
                dir.path().join("screenshot_1.png").display()
            )]
        );
        assert_eq!(summary.saved, vec![dir.path().join("screenshot_1.png")]);
        assert_eq!(png_files(dir.path()), vec!["screenshot_1.png"]);

        let img = image::open(dir.path().join("screenshot_1.png")).unwrap();
        assert_eq!((img.width(), img.height()), (640, 480));
        assert_eq!(img.color(), image::ColorType::Rgb8);

        assert_eq!(released.get(), 1);
        let log = log.borrow();
        assert_eq!(log.closed, 1);
        assert_eq!(log.waits, vec![Duration::from_millis(30); 3]);
    }

    #[test]
    fn test_captures_are_numbered_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), 'c', Resolution::new(64, 36));
        let (source, _) = ScriptedSource::new(frames(5, 16, 16));
        let (display, _) = ScriptedDisplay::new(vec![
            KeyPoll::Key('c'),
            KeyPoll::Key('x'),
            KeyPoll::Key('C'),
            KeyPoll::Timeout,
            KeyPoll::Key('c'),
        ]);

        let summary = play(source, display, &settings, &mut Vec::new());

        assert_eq!(summary.exit, ExitReason::EndOfStream);
        assert_eq!(
            summary.saved,
            (1..=3).map(|i| screenshot_path(dir.path(), i)).collect::<Vec<_>>()
        );
        assert_eq!(
            png_files(dir.path()),
            vec!["screenshot_1.png", "screenshot_2.png", "screenshot_3.png"]
        );
    }

    #[test]
    fn test_saved_size_ignores_source_size() {
        let dir = tempfile::tempdir().unwrap();
        let resolution = Resolution::new(120, 90);

        for (i, (w, h)) in [(7, 5), (300, 20), (120, 90)].into_iter().enumerate() {
            let path = screenshot_path(dir.path(), i as u32 + 1);
            save_screenshot(&Frame::filled_bgr(w, h, [0, 0, 255]), &path, resolution).unwrap();
            let img = image::open(&path).unwrap().to_rgb8();
            assert_eq!(img.dimensions(), (120, 90));
        }
    }

    #[test]
    fn test_saved_image_is_rgb_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = screenshot_path(dir.path(), 1);
        // Solid red, stored as BGR
        save_screenshot(&Frame::filled_bgr(8, 8, [0, 0, 255]), &path, Resolution::new(4, 4)).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(2, 2).0, [255, 0, 0]);
    }

    #[test]
    fn test_save_rejects_mismatched_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = screenshot_path(dir.path(), 1);
        let frame = Frame::with_unchecked_data(4, 4, vec![0; 5]);

        let result = save_screenshot(&frame, &path, Resolution::new(8, 8));

        assert!(matches!(result, Err(SessionError::Write { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_end_of_stream_releases_like_quit() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), 's', Resolution::new(8, 8));
        let (source, released) = ScriptedSource::new(frames(4, 8, 8));
        let (display, log) = ScriptedDisplay::new(vec![]);
        let mut out = Vec::new();

        let summary = play(source, display, &settings, &mut out);

        assert_eq!(lines(out), vec!["End of video or error."]);
        assert_eq!(summary.exit, ExitReason::EndOfStream);
        assert_eq!(summary.frames_shown, 4);
        assert!(summary.saved.is_empty());
        assert_eq!(released.get(), 1);
        assert_eq!(log.borrow().closed, 1);
    }

    #[test]
    fn test_quit_stops_before_stream_end() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), 's', Resolution::new(8, 8));
        let (source, released) = ScriptedSource::new(frames(10, 8, 8));
        let (display, log) = ScriptedDisplay::new(vec![KeyPoll::Timeout, KeyPoll::Key('q')]);

        let summary = play(source, display, &settings, &mut Vec::new());

        assert_eq!(summary.exit, ExitReason::Quit);
        assert_eq!(summary.frames_shown, 2);
        assert_eq!(log.borrow().shown.len(), 2);
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn test_quit_key_is_case_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), 's', Resolution::new(8, 8));
        let (source, _) = ScriptedSource::new(frames(2, 8, 8));
        let (display, _) = ScriptedDisplay::new(vec![KeyPoll::Key('Q')]);

        let summary = play(source, display, &settings, &mut Vec::new());

        assert_eq!(summary.exit, ExitReason::EndOfStream);
        assert_eq!(summary.frames_shown, 2);
    }

    #[test]
    fn test_window_closed_ends_run() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), 's', Resolution::new(8, 8));
        let (source, released) = ScriptedSource::new(frames(5, 8, 8));
        let (display, log) = ScriptedDisplay::new(vec![KeyPoll::Closed]);

        let summary = play(source, display, &settings, &mut Vec::new());

        assert_eq!(summary.exit, ExitReason::WindowClosed);
        assert_eq!(summary.frames_shown, 1);
        assert_eq!(released.get(), 1);
        assert_eq!(log.borrow().closed, 1);
    }

    #[test]
    fn test_only_capture_key_captures() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), 'S', Resolution::new(8, 8));
        let keys = "abcxyzSA1 ".chars().map(KeyPoll::Key).collect::<Vec<_>>();
        let (source, _) = ScriptedSource::new(frames(keys.len(), 8, 8));
        let (display, _) = ScriptedDisplay::new(keys);

        let summary = play(source, display, &settings, &mut Vec::new());

        assert_eq!(summary.saved.len(), 1);
        assert_eq!(png_files(dir.path()), vec!["screenshot_1.png"]);
    }

    #[test]
    fn test_failed_write_keeps_playing_and_index() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("later");
        let settings = settings(&out, 's', Resolution::new(8, 8));
        let (source, _) = ScriptedSource::new(frames(3, 8, 8));
        let (mut display, _) = ScriptedDisplay::new(vec![
            KeyPoll::Key('s'),
            KeyPoll::Key('s'),
        ]);
        // The folder only appears after the first capture has failed
        display.mkdir_before_wait = Some((1, out.clone()));
        let mut console = Vec::new();

        let summary = play(source, display, &settings, &mut console);

        assert_eq!(summary.exit, ExitReason::EndOfStream);
        assert_eq!(summary.frames_shown, 3);
        let console = lines(console);
        assert_eq!(console.len(), 3);
        assert!(console[0].starts_with("Error: could not save screenshot"));
        assert!(console[1].starts_with("Screenshot 1 saved to "));
        assert_eq!(console[2], "End of video or error.");
        assert_eq!(summary.saved, vec![screenshot_path(&out, 1)]);
        assert_eq!(png_files(&out), vec!["screenshot_1.png"]);
    }

    #[test]
    fn test_run_open_failure_skips_launch() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("Screenshots");
        let settings = settings(&out, 's', Resolution::new(8, 8));
        let launched = Cell::new(false);
        let mut console = Vec::new();

        let result = run(
            &root.path().join("missing.mp4"),
            &settings,
            &mut console,
            |path| open_video(path),
            |_source| {
                launched.set(true);
                Err(SessionError::Display("unreachable".to_string()))
            },
        );

        assert!(matches!(result, Err(SessionError::SourceOpen { .. })));
        assert!(!launched.get());
        assert!(!out.exists());
        assert_eq!(lines(console), vec!["Error: Could not open video."]);
    }

    #[test]
    fn test_run_creates_nested_output_dir() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("a").join("b").join("Screenshots");
        let settings = settings(&out, 's', Resolution::new(16, 9));
        let mut console = Vec::new();

        let summary = run(
            Path::new("clip.mp4"),
            &settings,
            &mut console,
            |_| Ok(ScriptedSource::new(frames(2, 8, 8)).0),
            |source| {
                let (display, _) = ScriptedDisplay::new(vec![KeyPoll::Key('S')]);
                Ok(play(source, display, &settings, &mut Vec::new()))
            },
        )
        .unwrap();

        assert!(out.is_dir());
        assert_eq!(
            lines(console),
            vec![
                "Press 'S' or 's' to take a screenshot.",
                "Press 'q' to quit the video.",
            ]
        );
        assert_eq!(summary.saved, vec![screenshot_path(&out, 1)]);
    }

    #[test]
    fn test_output_dir_error() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let result = prepare_output_dir(&blocker.join("Screenshots"));
        assert!(matches!(result, Err(SessionError::OutputDirectory { .. })));
    }
}
