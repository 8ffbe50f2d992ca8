//! Video decoder module
//!
//! Provides video frame decoding functionality using FFmpeg.

use std::path::Path;
use anyhow::{Result, Context};
use tracing::{info, debug, error};

use ffmpeg_next as ffmpeg;
use ffmpeg::format::input;
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{Context as Scaler, Flags};
use ffmpeg::util::frame::video::Video as VideoFrame;
use ffmpeg::format::Pixel;

use super::frame::Frame;
use super::FrameSource;

/// Video decoder that extracts BGR frames from video files using FFmpeg
pub struct VideoDecoder {
    /// FFmpeg format context
    input_ctx: ffmpeg::format::context::Input,
    /// Video stream index
    video_stream_index: usize,
    /// Video decoder
    decoder: ffmpeg::codec::decoder::Video,
    /// Scaler for pixel format conversion (size is kept)
    scaler: Scaler,
    /// Source width
    width: u32,
    /// Source height
    height: u32,
    /// Video FPS
    fps: f64,
    /// Packet iterator state
    packet_iter_exhausted: bool,
    /// Frames handed out so far
    frames_read: u64,
}

impl VideoDecoder {
    /// Open a video file for decoding
    ///
    /// Fails if the file is missing, has no video stream, or its codec
    /// cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            anyhow::bail!("Video file not found: {}", path.display());
        }

        // Initialize FFmpeg (safe to call multiple times)
        ffmpeg::init().context("Failed to initialize FFmpeg")?;

        let input_ctx = input(&path).context("Failed to open video file")?;

        let video_stream = input_ctx
            .streams()
            .best(Type::Video)
            .ok_or_else(|| anyhow::anyhow!("No video stream found in file"))?;

        let video_stream_index = video_stream.index();

        let rate = video_stream.rate();
        let fps = if rate.1 != 0 {
            rate.0 as f64 / rate.1 as f64
        } else {
            30.0
        };

        let context_decoder = ffmpeg::codec::context::Context::from_parameters(video_stream.parameters())
            .context("Failed to create decoder context")?;
        let decoder = context_decoder.decoder().video()
            .context("Failed to create video decoder")?;

        let width = decoder.width();
        let height = decoder.height();
        let src_format = decoder.format();

        if width == 0 || height == 0 {
            anyhow::bail!("Video stream reports an empty frame size");
        }

        info!(
            "Opened video {}: {}x{} @ {:.1}fps, format: {:?}",
            path.display(), width, height, fps, src_format
        );

        // Same size in and out, the scaler only changes the pixel layout
        let scaler = Scaler::get(
            src_format,
            width,
            height,
            Pixel::BGR24,
            width,
            height,
            Flags::BILINEAR,
        ).context("Failed to create scaler")?;

        Ok(Self {
            input_ctx,
            video_stream_index,
            decoder,
            scaler,
            width,
            height,
            fps,
            packet_iter_exhausted: false,
            frames_read: 0,
        })
    }

    /// Read the next frame from the video
    ///
    /// Returns None at end of video or on a conversion error
    pub fn read_frame(&mut self) -> Option<Frame> {
        // Try to receive already decoded frames first
        let mut decoded = VideoFrame::empty();
        if self.decoder.receive_frame(&mut decoded).is_ok() {
            return self.convert_frame(&decoded);
        }

        if self.packet_iter_exhausted {
            return None;
        }

        loop {
            let packet_result = self.input_ctx.packets().next();

            match packet_result {
                Some((stream, packet)) => {
                    if stream.index() != self.video_stream_index {
                        continue;
                    }

                    if let Err(e) = self.decoder.send_packet(&packet) {
                        debug!("Skipping undecodable packet: {}", e);
                        continue;
                    }

                    let mut decoded = VideoFrame::empty();
                    if self.decoder.receive_frame(&mut decoded).is_ok() {
                        return self.convert_frame(&decoded);
                    }
                }
                None => {
                    // End of stream, flush decoder
                    self.packet_iter_exhausted = true;
                    if let Err(e) = self.decoder.send_eof() {
                        debug!("Failed to flush decoder: {}", e);
                    }

                    let mut decoded = VideoFrame::empty();
                    if self.decoder.receive_frame(&mut decoded).is_ok() {
                        return self.convert_frame(&decoded);
                    }
                    return None;
                }
            }
        }
    }

    /// Convert an FFmpeg frame to a packed BGR frame
    fn convert_frame(&mut self, decoded: &VideoFrame) -> Option<Frame> {
        let mut bgr_frame = VideoFrame::empty();

        if let Err(e) = self.scaler.run(decoded, &mut bgr_frame) {
            error!("Failed to convert frame: {}", e);
            return None;
        }

        let frame = Frame::from_strided(
            self.width,
            self.height,
            bgr_frame.stride(0),
            bgr_frame.data(0),
        );
        if frame.is_none() {
            error!("Converted frame buffer is smaller than {}x{}", self.width, self.height);
        } else {
            self.frames_read += 1;
        }
        frame
    }

    /// Get the video FPS
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Get the source width
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the source height
    pub fn height(&self) -> u32 {
        self.height
    }
}

impl FrameSource for VideoDecoder {
    fn next_frame(&mut self) -> Option<Frame> {
        self.read_frame()
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        info!("Released video after {} frames", self.frames_read);
    }
}
