use eframe::{egui, NativeOptions};
use egui::{vec2, Align2, CentralPanel, Color32, Rect, RichText, TextureHandle, TextureOptions};
use egui_extras::RetainedImage;
use log::{debug, error, info, warn};
use reqwest::Client as ReqwestClient;
use std::collections::HashMap;
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

use ffmpeg_next as ffmpeg;

// Project Modules
mod catalog;
mod config;
mod connectivity;
mod errors;
mod media_pipeline;
mod model;
mod player;
mod storage_client;

use errors::{MediaError, StorageError};
use media_pipeline::{DecoderMessage, VideoData};
use model::{DisplayCommand, MediaItemRef, PlayerEvent};
use player::{PlaybackController, PlayerState};

// --- Constants ---
const DEFAULT_CONFIG_PATH: &str = "/etc/menuboard.conf";
/// How long a transient notice stays on screen.
const NOTICE_DURATION: Duration = Duration::from_secs(8);
/// UI frame pacing while a video is on screen.
const VIDEO_REPAINT_INTERVAL: Duration = Duration::from_millis(1000 / 30);

/// What the shell currently has on the display surface.
#[derive(Clone, Debug, PartialEq, Eq)]
enum ScreenContent {
    /// Nothing yet (startup with an empty catalog, or a guarded stall).
    Blank,
    /// The active video slot's frames.
    Video,
    /// A still image, letterboxed.
    Image(MediaItemRef),
    /// The "no connection" screen.
    Placeholder,
}

/// An asynchronous image fetch: `None` while the download is still running.
type PendingImage = Option<Result<Arc<egui::ColorImage>, MediaError>>;

struct MenuBoardApp {
    startup_error: Option<String>,
    http_client: ReqwestClient,

    controller: PlaybackController,
    /// The serialized event queue: every producer (listing task, probe task,
    /// decoder end-of-stream) reaches the controller through here, on this
    /// thread, one event at a time.
    events_rx: std_mpsc::Receiver<PlayerEvent>,

    /// Completed video downloads: the item plus its temp file (or the error).
    video_loaded_rx: std_mpsc::Receiver<(MediaItemRef, Result<NamedTempFile, StorageError>)>,
    video_loaded_tx: std_mpsc::Sender<(MediaItemRef, Result<NamedTempFile, StorageError>)>,
    /// The item whose download is in flight; a completed download for any
    /// other item is stale and discarded.
    expected_video: Option<MediaItemRef>,
    current_video: Option<VideoData>,
    current_video_texture: Option<TextureHandle>,

    image_cache: HashMap<String, RetainedImage>,
    pending_images: Arc<Mutex<HashMap<String, PendingImage>>>,

    screen: ScreenContent,
    notice: Option<(String, Instant)>,
}

impl MenuBoardApp {
    fn new(cc: &eframe::CreationContext<'_>) -> Self {
        info!("Initializing MenuBoardApp...");
        ffmpeg::init().expect("Failed to initialize FFmpeg");
        let http_client = ReqwestClient::new();
        let (events_tx, events_rx) = std_mpsc::channel();
        let (video_loaded_tx, video_loaded_rx) = std_mpsc::channel();

        let config_path = std::env::args()
            .nth(1)
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let mut startup_error = None;
        match config::load_config(&config_path) {
            Ok(cfg) => {
                info!("Configuration loaded successfully: {:?}", cfg);

                let listing_config = cfg.clone();
                let listing_client = http_client.clone();
                let listing_tx = events_tx.clone();
                let listing_ctx = cc.egui_ctx.clone();
                debug!("Spawning media listing task.");
                tokio::spawn(async move {
                    storage_client::run_listing(
                        listing_config,
                        listing_client,
                        listing_tx,
                        listing_ctx,
                    )
                    .await;
                });

                let probe_config = cfg.clone();
                let probe_client = http_client.clone();
                let probe_tx = events_tx.clone();
                let probe_ctx = cc.egui_ctx.clone();
                debug!("Spawning connectivity probe task.");
                tokio::spawn(async move {
                    connectivity::watch_connectivity(probe_config, probe_client, probe_tx, probe_ctx)
                        .await;
                });
            }
            Err(e) => {
                let err_msg = format!("Failed to load configuration: {}", e);
                error!("{}", err_msg);
                startup_error = Some(err_msg);
            }
        }

        Self {
            startup_error,
            http_client,
            controller: PlaybackController::new(),
            events_rx,
            video_loaded_rx,
            video_loaded_tx,
            expected_video: None,
            current_video: None,
            current_video_texture: None,
            image_cache: HashMap::new(),
            pending_images: Arc::new(Mutex::new(HashMap::new())),
            screen: ScreenContent::Blank,
            notice: None,
        }
    }

    /// Stops and joins the active decoder, exactly once per slot.
    fn cleanup_video_resources(&mut self) {
        if let Some(video) = self.current_video.take() {
            video.shutdown();
        }
        if self.current_video_texture.is_some() {
            debug!("Clearing current video texture.");
            self.current_video_texture = None;
        }
    }

    /// Executes the controller's display commands against the real
    /// collaborators (decoder slot, image cache, placeholder surface).
    fn apply_commands(&mut self, ctx: &egui::Context, commands: Vec<DisplayCommand>) {
        for command in commands {
            match command {
                DisplayCommand::PlayVideo(item) => self.start_video_download(ctx, item),
                DisplayCommand::ShowImage(item) => self.show_image(ctx, item),
                DisplayCommand::PauseVideo => {
                    self.expected_video = None;
                    self.cleanup_video_resources();
                }
                DisplayCommand::ShowPlaceholder => {
                    info!("Displaying no-connection placeholder.");
                    self.screen = ScreenContent::Placeholder;
                }
                DisplayCommand::Notice(message) => {
                    self.notice = Some((message, Instant::now()));
                }
            }
        }
    }

    fn start_video_download(&mut self, ctx: &egui::Context, item: MediaItemRef) {
        info!("Starting video download for: '{}'", item.name);
        self.cleanup_video_resources();
        self.screen = ScreenContent::Video;
        self.expected_video = Some(item.clone());

        let client = self.http_client.clone();
        let tx = self.video_loaded_tx.clone();
        let ctx_clone = ctx.clone();
        tokio::spawn(async move {
            let result = storage_client::fetch_object_to_temp_file(&client, &item.url).await;
            if tx.send((item, result)).is_err() {
                warn!("Video download finished after shutdown; discarding.");
            }
            ctx_clone.request_repaint();
        });
    }

    fn show_image(&mut self, ctx: &egui::Context, item: MediaItemRef) {
        self.cleanup_video_resources();
        self.screen = ScreenContent::Image(item.clone());

        let already_cached = self.image_cache.contains_key(&item.url);
        let already_pending = self.pending_images.lock().unwrap().contains_key(&item.url);
        if already_cached || already_pending {
            debug!("Image '{}' already cached or pending.", item.name);
            return;
        }

        info!("Initiating fetch for image: '{}'", item.name);
        self.pending_images
            .lock()
            .unwrap()
            .insert(item.url.clone(), None);
        let client = self.http_client.clone();
        let pending = self.pending_images.clone();
        let ctx_clone = ctx.clone();
        tokio::spawn(async move {
            let result = media_pipeline::fetch_image(&client, &item.url)
                .await
                .map(Arc::new);
            pending.lock().unwrap().insert(item.url, Some(result));
            ctx_clone.request_repaint();
        });
    }

    /// Moves completed image fetches into the retained-image cache.
    fn commit_fetched_images(&mut self) {
        let mut ready = Vec::new();
        self.pending_images
            .lock()
            .unwrap()
            .retain(|url, slot| match slot.take() {
                None => true, // still downloading
                Some(Ok(image)) => {
                    ready.push((url.clone(), image));
                    false
                }
                Some(Err(e)) => {
                    error!("Failed to fetch image '{}': {}", url, e);
                    false
                }
            });
        for (url, image) in ready {
            debug!("Caching image for url: {}", url);
            let retained = RetainedImage::from_color_image(url.clone(), (*image).clone());
            self.image_cache.insert(url, retained);
        }
    }

    /// Drains the completed-download channel and wires up the decoder slot
    /// for the video the controller is waiting on.
    fn process_loaded_videos(&mut self) {
        while let Ok((item, result)) = self.video_loaded_rx.try_recv() {
            let expected = self
                .expected_video
                .as_ref()
                .map_or(false, |e| e.name == item.name);
            if !expected {
                debug!("Discarding stale video download for '{}'", item.name);
                continue;
            }
            match result {
                Ok(temp_file) => {
                    info!("Video '{}' downloaded; starting decoder.", item.name);
                    self.cleanup_video_resources();
                    self.current_video = Some(media_pipeline::start_video_decoder(
                        item.name.clone(),
                        temp_file,
                    ));
                }
                Err(e) => {
                    // The playlist stays put: no synthetic end-of-stream, the
                    // controller keeps waiting just as a player with a failed
                    // source would.
                    error!("Failed to download video '{}': {}", item.name, e);
                }
            }
        }
    }

    /// Pulls at most one decoded frame per UI frame, and surfaces the
    /// decoder's end-of-stream to the controller.
    fn process_video_frames(&mut self, ctx: &egui::Context) {
        if self.screen != ScreenContent::Video {
            return;
        }
        let mut ended = false;
        if let Some(video) = self.current_video.as_ref() {
            match video.frame_receiver.try_recv() {
                Ok(DecoderMessage::Frame(frame)) => {
                    if let Some(texture) = &mut self.current_video_texture {
                        texture.set((*frame).clone(), TextureOptions::LINEAR);
                    } else {
                        self.current_video_texture = Some(ctx.load_texture(
                            format!("vid_{}", video.item_name),
                            (*frame).clone(),
                            TextureOptions::LINEAR,
                        ));
                    }
                }
                Ok(DecoderMessage::EndOfStream) => {
                    info!("End of stream for video '{}'", video.item_name);
                    ended = true;
                }
                Ok(DecoderMessage::Failed(e)) => {
                    error!("Video decoding failed for '{}': {}", video.item_name, e);
                }
                Err(_) => {} // no frame ready
            }
        }
        if ended {
            self.expected_video = None;
            self.cleanup_video_resources();
            let commands = self
                .controller
                .handle_event(PlayerEvent::VideoEnded, Instant::now());
            self.apply_commands(ctx, commands);
        }
    }

    fn schedule_repaint(&self, ctx: &egui::Context) {
        match self.controller.state() {
            PlayerState::PlayingVideo => ctx.request_repaint_after(VIDEO_REPAINT_INTERVAL),
            PlayerState::ShowingImage => {
                if let Some(deadline) = self.controller.dwell_deadline() {
                    ctx.request_repaint_after(deadline.saturating_duration_since(Instant::now()));
                }
            }
            _ => {}
        }
        if self.notice.is_some() {
            ctx.request_repaint_after(Duration::from_millis(500));
        }
    }

    fn draw_screen(&self, ctx: &egui::Context) {
        CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::BLACK))
            .show(ctx, |ui| {
                if let Some(err) = &self.startup_error {
                    ui.centered_and_justified(|ui| {
                        ui.colored_label(Color32::RED, format!("Error: {}", err));
                    });
                    return;
                }
                let available_rect = ui.available_rect_before_wrap();
                match &self.screen {
                    ScreenContent::Blank => {} // nothing to show yet
                    ScreenContent::Video => {
                        if let Some(texture) = &self.current_video_texture {
                            let size = texture.size_vec2();
                            let rect = letterbox_rect(size.x, size.y, available_rect);
                            ui.put(
                                rect,
                                egui::Image::new(egui::load::SizedTexture::new(
                                    texture.id(),
                                    rect.size(),
                                )),
                            );
                        } else {
                            ui.centered_and_justified(|ui| {
                                ui.colored_label(Color32::GRAY, "Loading video...");
                            });
                        }
                    }
                    ScreenContent::Image(item) => {
                        if let Some(image) = self.image_cache.get(&item.url) {
                            let rect = letterbox_rect(
                                image.width() as f32,
                                image.height() as f32,
                                available_rect,
                            );
                            let texture_id = image.texture_id(ctx);
                            ui.put(
                                rect,
                                egui::Image::new(egui::load::SizedTexture::new(
                                    texture_id,
                                    rect.size(),
                                )),
                            );
                        } else {
                            ui.centered_and_justified(|ui| {
                                ui.colored_label(Color32::GRAY, "Loading image...");
                            });
                        }
                    }
                    ScreenContent::Placeholder => {
                        ui.centered_and_justified(|ui| {
                            ui.vertical_centered(|ui| {
                                ui.label(
                                    RichText::new("No connection")
                                        .size(48.0)
                                        .color(Color32::WHITE),
                                );
                                ui.label(
                                    RichText::new("Playback will resume automatically.")
                                        .size(20.0)
                                        .color(Color32::GRAY),
                                );
                            });
                        });
                    }
                }
            });

        if let Some((message, _)) = &self.notice {
            let message = message.clone();
            egui::Area::new(egui::Id::new("transient_notice"))
                .anchor(Align2::CENTER_BOTTOM, vec2(0.0, -40.0))
                .show(ctx, |ui| {
                    egui::Frame::popup(&ctx.style()).show(ui, |ui| {
                        ui.label(RichText::new(message).color(Color32::LIGHT_YELLOW));
                    });
                });
        }
    }
}

impl eframe::App for MenuBoardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Completed downloads first, then controller events, then the dwell
        // tick: one serialized pass per UI frame.
        self.process_loaded_videos();

        while let Ok(event) = self.events_rx.try_recv() {
            let commands = self.controller.handle_event(event, Instant::now());
            self.apply_commands(ctx, commands);
        }

        let commands = self.controller.tick(Instant::now());
        self.apply_commands(ctx, commands);

        self.process_video_frames(ctx);
        self.commit_fetched_images();

        let notice_expired = self
            .notice
            .as_ref()
            .map_or(false, |(_, since)| since.elapsed() >= NOTICE_DURATION);
        if notice_expired {
            self.notice = None;
        }

        self.schedule_repaint(ctx);
        self.draw_screen(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("MenuBoardApp on_exit called. Cleaning up video resources.");
        self.cleanup_video_resources();
    }
}

/// Scales media dimensions to fit the available rect, preserving aspect
/// ratio and centering (letterboxing).
fn letterbox_rect(media_width: f32, media_height: f32, available_rect: Rect) -> Rect {
    let aspect_ratio = media_width / media_height;
    let mut draw_width = available_rect.width();
    let mut draw_height = available_rect.width() / aspect_ratio;
    if draw_height > available_rect.height() {
        draw_height = available_rect.height();
        draw_width = available_rect.height() * aspect_ratio;
    }
    Rect::from_center_size(available_rect.center(), vec2(draw_width, draw_height))
}

#[tokio::main]
async fn main() -> Result<(), eframe::Error> {
    env_logger::init();
    info!("Starting menuboard_rs application...");
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(egui::vec2(1920.0, 1080.0))
            .with_fullscreen(true),
        ..Default::default()
    };
    eframe::run_native(
        "MenuBoard RS",
        options,
        Box::new(|cc| Box::new(MenuBoardApp::new(cc))),
    )
}
