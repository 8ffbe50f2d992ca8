//! Playback window
//!
//! An egui window on the main thread, fed by a playback job on a worker
//! thread. Frames go to the window through a single-slot mailbox; typed
//! characters come back over a channel.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use egui::{Color32, ColorImage, RichText, TextureHandle, TextureOptions};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::video::Frame;

use super::{FrameDisplay, KeyPoll};

/// Largest initial window size; bigger videos are scaled down to fit
const MAX_INITIAL_SIZE: [f32; 2] = [1280.0, 720.0];

/// Latest frame waiting to be uploaded, plus how many have been sent
#[derive(Default)]
struct Mailbox {
    pending: Option<ColorImage>,
    frame_number: u64,
}

type SharedMailbox = Arc<Mutex<Mailbox>>;

/// Worker-side handle to the playback window
pub struct WindowDisplay {
    ctx: egui::Context,
    mailbox: SharedMailbox,
    keys: Receiver<char>,
}

impl FrameDisplay for WindowDisplay {
    fn show(&mut self, frame: &Frame) {
        let size = [frame.width() as usize, frame.height() as usize];
        let image = ColorImage::from_rgb(size, &frame.rgb_bytes());
        {
            let mut mailbox = self.mailbox.lock();
            mailbox.pending = Some(image);
            mailbox.frame_number += 1;
        }
        self.ctx.request_repaint();
    }

    fn wait_key(&mut self, timeout: Duration) -> KeyPoll {
        match self.keys.recv_timeout(timeout) {
            Ok(key) => KeyPoll::Key(key),
            Err(RecvTimeoutError::Timeout) => KeyPoll::Timeout,
            Err(RecvTimeoutError::Disconnected) => KeyPoll::Closed,
        }
    }
}

impl Drop for WindowDisplay {
    fn drop(&mut self) {
        debug!("Closing playback window");
        self.ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        self.ctx.request_repaint();
    }
}

/// The eframe application that renders frames and forwards key presses
pub struct PlaybackWindow {
    mailbox: SharedMailbox,
    /// Dropped when the user closes the window, which ends the worker's wait
    keys: Option<Sender<char>>,
    texture: Option<TextureHandle>,
    frame_number: u64,
    hint: String,
}

impl PlaybackWindow {
    fn new(mailbox: SharedMailbox, keys: Sender<char>, hint: String) -> Self {
        Self {
            mailbox,
            keys: Some(keys),
            texture: None,
            frame_number: 0,
            hint,
        }
    }

    /// Upload the newest frame, if one arrived since the last repaint
    fn upload_pending(&mut self, ctx: &egui::Context) {
        let (pending, frame_number) = {
            let mut mailbox = self.mailbox.lock();
            (mailbox.pending.take(), mailbox.frame_number)
        };
        let Some(image) = pending else {
            return;
        };
        self.frame_number = frame_number;

        if let Some(ref mut texture) = self.texture {
            texture.set(image, TextureOptions::LINEAR);
        } else {
            self.texture = Some(ctx.load_texture("frame", image, TextureOptions::LINEAR));
        }
    }

    fn forward_keys(&mut self, ctx: &egui::Context) {
        let typed = ctx.input(|i| typed_keys(&i.events));
        let delivered = match self.keys {
            Some(ref tx) => typed.into_iter().all(|key| tx.send(key).is_ok()),
            None => true,
        };
        if !delivered {
            // Playback already finished
            self.keys = None;
        }

        if ctx.input(|i| i.viewport().close_requested()) && self.keys.take().is_some() {
            info!("Playback window closed by user");
        }
    }
}

impl eframe::App for PlaybackWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.upload_pending(ctx);
        self.forward_keys(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::BLACK))
            .show(ctx, |ui| {
                ui.label(
                    RichText::new(format!("Frame {}  |  {}", self.frame_number, self.hint))
                        .color(Color32::LIGHT_GRAY),
                );
                ui.centered_and_justified(|ui| {
                    if let Some(ref texture) = self.texture {
                        ui.add(egui::Image::new(texture).shrink_to_fit());
                    }
                });
            });
    }
}

/// Characters typed since the last frame, in order
pub fn typed_keys(events: &[egui::Event]) -> Vec<char> {
    events
        .iter()
        .filter_map(|event| match event {
            egui::Event::Text(text) => Some(text.chars()),
            _ => None,
        })
        .flatten()
        .collect()
}

/// Scale `size` down, keeping its aspect ratio, until it fits within `max`
pub fn fit_within(size: [f32; 2], max: [f32; 2]) -> [f32; 2] {
    if size[0] <= 0.0 || size[1] <= 0.0 {
        return max;
    }
    let scale = (max[0] / size[0]).min(max[1] / size[1]).min(1.0);
    [size[0] * scale, size[1] * scale]
}

/// Open the playback window and run `job` against it on a worker thread
///
/// Blocks until the window is closed, then returns whatever `job` returned.
/// The window closes on its own once `job` drops its display handle.
pub fn launch<F, R>(title: &str, frame_size: [u32; 2], hint: String, job: F) -> Result<R, SessionError>
where
    F: FnOnce(WindowDisplay) -> R + Send + 'static,
    R: Send + 'static,
{
    let mailbox: SharedMailbox = Arc::new(Mutex::new(Mailbox::default()));
    let (key_tx, key_rx) = crossbeam_channel::unbounded();
    let worker: Arc<Mutex<Option<JoinHandle<R>>>> = Arc::new(Mutex::new(None));

    let inner_size = fit_within(
        [frame_size[0] as f32, frame_size[1] as f32],
        MAX_INITIAL_SIZE,
    );
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(inner_size)
            .with_title(title),
        ..Default::default()
    };

    let worker_slot = Arc::clone(&worker);
    let window_mailbox = Arc::clone(&mailbox);
    eframe::run_native(
        title,
        native_options,
        Box::new(move |cc| {
            let display = WindowDisplay {
                ctx: cc.egui_ctx.clone(),
                mailbox,
                keys: key_rx,
            };
            let handle = std::thread::Builder::new()
                .name("playback".to_string())
                .spawn(move || job(display))?;
            *worker_slot.lock() = Some(handle);
            Ok(Box::new(PlaybackWindow::new(window_mailbox, key_tx, hint)))
        }),
    )
    .map_err(|e| SessionError::Display(format!("eframe error: {}", e)))?;

    let handle = worker
        .lock()
        .take()
        .ok_or_else(|| SessionError::Display("playback window never started".to_string()))?;
    handle.join().map_err(|_| {
        warn!("Playback thread panicked");
        SessionError::Display("playback thread panicked".to_string())
    })
}
