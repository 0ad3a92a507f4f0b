//! Handles media fetching and decoding.
//!
//! This module is responsible for:
//! - Fetching remote images and decoding them into egui color images.
//! - Running the video decoding thread, which turns a downloaded object into
//!   a stream of RGBA frames and a final end-of-stream signal.
//!
//! The decoder is treated as a single mutable slot: at most one `VideoData`
//! exists at a time, owned by the UI shell, and it must be shut down exactly
//! once (on replacement, on suspend, or at exit).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;
use std::time::Duration;

use egui::ColorImage as EguiColorImage;
use log::{debug, error, info, trace, warn};
use reqwest::Client as ReqwestClient;
use tempfile::NamedTempFile;

use ffmpeg_next as ffmpeg;
use ffmpeg::media::Type;
use ffmpeg::software::scaling::flag::Flags;
use ffmpeg::util::format::Pixel;

use super::errors::MediaError;

/// Bound on in-flight decoded frames; decodes stay a few frames ahead of the
/// display without buffering the whole file.
const FRAME_CHANNEL_BOUND: usize = 5;

/// A message from the decoding thread to the UI shell.
pub enum DecoderMessage {
    /// One decoded, display-ready RGBA frame.
    Frame(Arc<EguiColorImage>),
    /// The decoder consumed the whole stream. Sent exactly once, last.
    EndOfStream,
    /// Decoding failed; no further messages follow.
    Failed(MediaError),
}

/// Holds the state of the active video playback slot.
pub struct VideoData {
    /// Receives decoded frames, then a terminal end-of-stream or failure.
    pub frame_receiver: std_mpsc::Receiver<DecoderMessage>,
    /// Guards the temporary file; deleted when the slot is dropped.
    _temp_file: NamedTempFile,
    decoder_thread_handle: Option<thread::JoinHandle<()>>,
    stop_decoder_flag: Arc<AtomicBool>,
    /// Name of the catalog item this slot is playing.
    pub item_name: String,
}

impl VideoData {
    /// Stops and joins the decoding thread. The receiver is dropped before
    /// the join so a sender blocked on the bounded channel unblocks with an
    /// error instead of deadlocking the join.
    pub fn shutdown(mut self) {
        info!("Shutting down video decoder for '{}'", self.item_name);
        self.stop_decoder_flag.store(true, Ordering::SeqCst);
        drop(self.frame_receiver);
        if let Some(handle) = self.decoder_thread_handle.take() {
            if let Err(e) = handle.join() {
                error!("Error joining decoder thread for '{}': {:?}", self.item_name, e);
            } else {
                debug!("Joined decoder thread for '{}'", self.item_name);
            }
        }
    }
}

/// Fetches a remote image and decodes it into an egui color image.
#[must_use = "fetching an image can fail; the Result must be handled"]
pub async fn fetch_image(client: &ReqwestClient, url: &str) -> Result<EguiColorImage, MediaError> {
    debug!("Fetching image: {}", url);
    let response = client.get(url).send().await.map_err(|e| {
        error!("Request error fetching image '{}': {:?}", url, e);
        MediaError::Download(e)
    })?;
    let response = response.error_for_status().map_err(|e| {
        error!("HTTP error fetching image '{}': {}", url, e);
        MediaError::Download(e)
    })?;
    let image_bytes = response.bytes().await.map_err(|e| {
        error!("Error reading image bytes for '{}': {:?}", url, e);
        MediaError::Download(e)
    })?;

    trace!("Decoding image: {}", url);
    let img = image::load_from_memory(&image_bytes).map_err(|e| {
        error!("Error decoding image '{}': {:?}", url, e);
        MediaError::Image(e)
    })?;

    let size = [img.width() as _, img.height() as _];
    let image_buffer = img.to_rgba8();
    let pixels = image_buffer.as_flat_samples();
    let egui_image = EguiColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
    info!("Fetched and decoded image: {}", url);
    Ok(egui_image)
}

/// Spawns the decoding thread for a downloaded video and returns the
/// playback slot. Open/decode failures surface as a `Failed` message on the
/// frame channel rather than a synchronous error, so the caller wires the
/// slot up unconditionally.
pub fn start_video_decoder(item_name: String, temp_file: NamedTempFile) -> VideoData {
    let (tx_frames, rx_frames) = std_mpsc::sync_channel::<DecoderMessage>(FRAME_CHANNEL_BOUND);
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_thread = stop_flag.clone();
    let path = temp_file.path().to_path_buf();
    let name_thread = item_name.clone();

    debug!("Spawning video decoding thread for: {}", name_thread);
    let thread_handle = thread::spawn(move || {
        match decode_loop(&name_thread, &path, &tx_frames, &stop_flag_thread) {
            Ok(reached_eof) => {
                if reached_eof {
                    info!("Video '{}' reached end of stream.", name_thread);
                    let _ = tx_frames.send(DecoderMessage::EndOfStream);
                } else {
                    debug!("Decoder thread for '{}' stopped before EOF.", name_thread);
                }
            }
            Err(e) => {
                error!("Video decoding failed for '{}': {}", name_thread, e);
                let _ = tx_frames.send(DecoderMessage::Failed(e));
            }
        }
        info!("Video decoding thread for '{}' finished.", name_thread);
    });

    VideoData {
        frame_receiver: rx_frames,
        _temp_file: temp_file,
        decoder_thread_handle: Some(thread_handle),
        stop_decoder_flag: stop_flag,
        item_name,
    }
}

/// Decodes every video frame of `path`, sending RGBA frames at roughly the
/// source frame rate. Returns `Ok(true)` on end of stream and `Ok(false)`
/// when stopped early (stop flag set or receiver gone).
fn decode_loop(
    item_name: &str,
    path: &std::path::Path,
    tx_frames: &std_mpsc::SyncSender<DecoderMessage>,
    stop_flag: &AtomicBool,
) -> Result<bool, MediaError> {
    let mut ictx = ffmpeg::format::input(&path)?;
    let input_stream = ictx
        .streams()
        .best(Type::Video)
        .ok_or(MediaError::Ffmpeg(ffmpeg::Error::StreamNotFound))?;
    let video_stream_index = input_stream.index();

    let frame_rate = input_stream.avg_frame_rate();
    let frame_delay = if frame_rate.numerator() > 0 {
        Duration::from_secs_f64(f64::from(frame_rate.denominator()) / f64::from(frame_rate.numerator()))
    } else {
        Duration::from_millis(1000 / 30)
    };

    let context_decoder = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())?;
    let mut decoder = context_decoder.decoder().video()?;
    debug!(
        "Decoder ready for '{}': format {:?}, {}x{}, frame delay {:?}",
        item_name,
        decoder.format(),
        decoder.width(),
        decoder.height(),
        frame_delay
    );

    let mut scaler = ffmpeg::software::scaling::Context::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        Pixel::RGBA,
        decoder.width(),
        decoder.height(),
        Flags::BILINEAR,
    )?;

    let mut decoded_frame = ffmpeg::util::frame::video::Video::empty();
    let mut rgba_frame = ffmpeg::util::frame::video::Video::empty();

    let mut drain = |decoder: &mut ffmpeg::decoder::Video| -> Result<bool, MediaError> {
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            if stop_flag.load(Ordering::SeqCst) {
                return Ok(false);
            }
            scaler.run(&decoded_frame, &mut rgba_frame)?;
            let color_image = color_image_from_rgba_frame(&rgba_frame);
            if tx_frames.send(DecoderMessage::Frame(Arc::new(color_image))).is_err() {
                warn!("Frame receiver for '{}' dropped; stopping decode.", item_name);
                return Ok(false);
            }
            thread::sleep(frame_delay);
        }
        Ok(true)
    };

    for (stream, packet) in ictx.packets() {
        if stop_flag.load(Ordering::SeqCst) {
            info!("Decoder thread for '{}' received stop signal.", item_name);
            return Ok(false);
        }
        if stream.index() != video_stream_index {
            continue;
        }
        decoder.send_packet(&packet)?;
        if !drain(&mut decoder)? {
            return Ok(false);
        }
    }

    decoder.send_eof()?;
    if !drain(&mut decoder)? {
        return Ok(false);
    }
    Ok(true)
}

/// Copies a scaled RGBA frame row by row (the frame's stride may exceed
/// width * 4) into an egui color image.
fn color_image_from_rgba_frame(frame: &ffmpeg::util::frame::video::Video) -> EguiColorImage {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let stride = frame.stride(0);
    let row_len = width * 4;
    let data = frame.data(0);

    let mut pixels = Vec::with_capacity(row_len * height);
    for row in data.chunks(stride).take(height) {
        pixels.extend_from_slice(&row[..row_len]);
    }
    EguiColorImage::from_rgba_unmultiplied([width, height], &pixels)
}
