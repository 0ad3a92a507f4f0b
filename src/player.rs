//! The playback state machine.
//!
//! `PlaybackController` owns the media catalog and the playback cursor, and
//! is the only place either is mutated. It consumes `PlayerEvent`s one at a
//! time (plus a `tick` with the current instant for the image dwell), and
//! emits `DisplayCommand`s for the UI shell to execute. Because the current
//! time is injected, every transition is testable without a UI harness.
//!
//! The loop structure: all videos play in catalog order, then all images are
//! shown for a fixed dwell each, then back to the videos. Indices persist
//! across mode switches and across suspend/resume. A disconnect from any
//! state suspends playback behind a placeholder screen; reconnecting resumes
//! from the preserved cursor (the current video restarts from its
//! beginning).
//!
//! One deliberate asymmetry is kept from the product behavior: entering
//! Video mode with an empty video list does not fall back to the image list
//! (and vice versa) -- the controller goes idle until a matching item
//! arrives.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::catalog::MediaCatalog;
use super::model::{DisplayCommand, MediaItemRef, PlaybackCursor, PlaybackMode, PlayerEvent};

/// Fixed duration an image remains on screen before advancing.
pub const IMAGE_DWELL: Duration = Duration::from_millis(6000);

/// The controller's current activity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerState {
    /// Nothing is being played or shown: either startup with an empty
    /// catalog, or a guarded transition that found its target list empty.
    Idle,
    PlayingVideo,
    ShowingImage,
    /// All playback halted behind the placeholder while disconnected.
    Suspended,
}

pub struct PlaybackController {
    catalog: MediaCatalog,
    cursor: PlaybackCursor,
    state: PlayerState,
    connected: bool,
    /// Pending dwell expiry for the image currently on screen. Must be
    /// cleared whenever the controller leaves `ShowingImage`, so a stale
    /// deadline can never fire into the wrong state.
    dwell_deadline: Option<Instant>,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self {
            catalog: MediaCatalog::new(),
            cursor: PlaybackCursor::new(),
            state: PlayerState::Idle,
            connected: true,
            dwell_deadline: None,
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn cursor(&self) -> PlaybackCursor {
        self.cursor
    }

    pub fn catalog(&self) -> &MediaCatalog {
        &self.catalog
    }

    /// The instant at which the current image dwell expires, if one is armed.
    /// The shell uses this to schedule its next wakeup.
    pub fn dwell_deadline(&self) -> Option<Instant> {
        self.dwell_deadline
    }

    /// Consumes one event, returning the display commands it produced.
    pub fn handle_event(&mut self, event: PlayerEvent, now: Instant) -> Vec<DisplayCommand> {
        match event {
            PlayerEvent::VideoEnded => self.on_video_ended(now),
            PlayerEvent::ConnectivityChanged(connected) => self.on_connectivity(connected, now),
            PlayerEvent::CatalogItemAdded(item) => self.on_item_added(item, now),
            PlayerEvent::ListingFailed(message) => {
                warn!("Media listing failed: {}", message);
                vec![DisplayCommand::Notice(message)]
            }
        }
    }

    /// Advances the image dwell if its deadline has passed.
    pub fn tick(&mut self, now: Instant) -> Vec<DisplayCommand> {
        if self.state != PlayerState::ShowingImage {
            return Vec::new();
        }
        match self.dwell_deadline {
            Some(deadline) if now >= deadline => self.on_dwell_elapsed(now),
            _ => Vec::new(),
        }
    }

    fn on_video_ended(&mut self, now: Instant) -> Vec<DisplayCommand> {
        if self.state != PlayerState::PlayingVideo {
            debug!("Ignoring VideoEnded in state {:?}", self.state);
            return Vec::new();
        }
        self.cursor.video_index += 1;
        if self.cursor.video_index >= self.catalog.len(PlaybackMode::Video) {
            self.cursor.video_index = 0;
            self.cursor.mode = PlaybackMode::Image;
            info!("Video sequence complete; switching to images.");
            self.show_image(now)
        } else {
            self.play_video()
        }
    }

    fn on_dwell_elapsed(&mut self, now: Instant) -> Vec<DisplayCommand> {
        self.cursor.image_index += 1;
        if self.cursor.image_index >= self.catalog.len(PlaybackMode::Image) {
            self.cursor.image_index = 0;
            self.cursor.mode = PlaybackMode::Video;
            info!("Image sequence complete; switching to videos.");
            self.play_video()
        } else {
            self.show_image(now)
        }
    }

    fn on_connectivity(&mut self, connected: bool, now: Instant) -> Vec<DisplayCommand> {
        if connected == self.connected {
            debug!("Ignoring repeated connectivity state (connected={})", connected);
            return Vec::new();
        }
        self.connected = connected;
        if connected {
            self.resume(now)
        } else {
            self.suspend()
        }
    }

    /// Disconnect: cancel the dwell, pause any active video, show the
    /// placeholder. The cursor (mode and both indices) is preserved.
    fn suspend(&mut self) -> Vec<DisplayCommand> {
        info!(
            "Suspending playback (was {:?}, cursor {:?})",
            self.state, self.cursor
        );
        self.dwell_deadline = None;
        self.state = PlayerState::Suspended;
        vec![DisplayCommand::PauseVideo, DisplayCommand::ShowPlaceholder]
    }

    /// Reconnect: resume based on the preserved mode. The current video
    /// restarts from its beginning; the current image is re-displayed with a
    /// fresh dwell. If the relevant list is empty the controller goes idle,
    /// leaving the prior visual unchanged.
    fn resume(&mut self, now: Instant) -> Vec<DisplayCommand> {
        if self.state != PlayerState::Suspended {
            debug!("Reconnect observed in state {:?}; nothing to resume.", self.state);
            return Vec::new();
        }
        info!("Resuming playback at cursor {:?}", self.cursor);
        match self.cursor.mode {
            PlaybackMode::Video => self.play_video(),
            PlaybackMode::Image => self.show_image(now),
        }
    }

    /// A new catalog item arrived. If the controller is idle, connected, and
    /// the item's kind matches the current mode, playback starts; the state
    /// change guarantees later appends never start a second time.
    fn on_item_added(&mut self, item: MediaItemRef, now: Instant) -> Vec<DisplayCommand> {
        let kind = item.kind;
        self.catalog.add(item);
        if self.state != PlayerState::Idle {
            return Vec::new();
        }
        if !self.cursor.mode.matches(kind) {
            debug!(
                "Idle in {:?} mode; new {:?} item does not start playback.",
                self.cursor.mode, kind
            );
            return Vec::new();
        }
        match self.cursor.mode {
            PlaybackMode::Video => self.play_video(),
            PlaybackMode::Image => self.show_image(now),
        }
    }

    /// Guarded entry into `PlayingVideo`. With an empty video list or while
    /// disconnected this is a silent no-op into `Idle`: the prior visual is
    /// left unchanged, and no fallback to the image list is attempted.
    fn play_video(&mut self) -> Vec<DisplayCommand> {
        self.cursor.mode = PlaybackMode::Video;
        self.dwell_deadline = None;
        if !self.connected || self.catalog.is_empty(PlaybackMode::Video) {
            debug!(
                "Video playback skipped (connected={}, videos={})",
                self.connected,
                self.catalog.len(PlaybackMode::Video)
            );
            self.state = PlayerState::Idle;
            return Vec::new();
        }
        let item = self
            .catalog
            .get(PlaybackMode::Video, self.cursor.video_index)
            .cloned();
        match item {
            Some(item) => {
                info!(
                    "Playing video {} of {}: '{}'",
                    self.cursor.video_index + 1,
                    self.catalog.len(PlaybackMode::Video),
                    item.name
                );
                self.state = PlayerState::PlayingVideo;
                vec![DisplayCommand::PlayVideo(item)]
            }
            None => {
                // Unreachable while indices wrap before use; treated as a
                // guarded stall rather than a panic.
                warn!(
                    "Video index {} out of range; going idle.",
                    self.cursor.video_index
                );
                self.state = PlayerState::Idle;
                Vec::new()
            }
        }
    }

    /// Guarded entry into `ShowingImage`; arms a fresh dwell on success.
    fn show_image(&mut self, now: Instant) -> Vec<DisplayCommand> {
        self.cursor.mode = PlaybackMode::Image;
        if !self.connected || self.catalog.is_empty(PlaybackMode::Image) {
            debug!(
                "Image display skipped (connected={}, images={})",
                self.connected,
                self.catalog.len(PlaybackMode::Image)
            );
            self.dwell_deadline = None;
            self.state = PlayerState::Idle;
            return Vec::new();
        }
        let item = self
            .catalog
            .get(PlaybackMode::Image, self.cursor.image_index)
            .cloned();
        match item {
            Some(item) => {
                info!(
                    "Showing image {} of {}: '{}'",
                    self.cursor.image_index + 1,
                    self.catalog.len(PlaybackMode::Image),
                    item.name
                );
                self.state = PlayerState::ShowingImage;
                self.dwell_deadline = Some(now + IMAGE_DWELL);
                vec![DisplayCommand::ShowImage(item)]
            }
            None => {
                warn!(
                    "Image index {} out of range; going idle.",
                    self.cursor.image_index
                );
                self.dwell_deadline = None;
                self.state = PlayerState::Idle;
                Vec::new()
            }
        }
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaKind;

    fn video(name: &str) -> MediaItemRef {
        MediaItemRef {
            name: name.to_string(),
            url: format!("http://store/{}", name),
            kind: MediaKind::Video,
        }
    }

    fn image(name: &str) -> MediaItemRef {
        MediaItemRef {
            name: name.to_string(),
            url: format!("http://store/{}", name),
            kind: MediaKind::Image,
        }
    }

    fn controller_with(videos: &[&str], images: &[&str], now: Instant) -> PlaybackController {
        let mut controller = PlaybackController::new();
        for name in videos {
            controller.handle_event(PlayerEvent::CatalogItemAdded(video(name)), now);
        }
        for name in images {
            controller.handle_event(PlayerEvent::CatalogItemAdded(image(name)), now);
        }
        controller
    }

    #[test]
    fn first_video_kick_starts_playback_exactly_once() {
        let now = Instant::now();
        let mut controller = PlaybackController::new();
        assert_eq!(*controller.state(), PlayerState::Idle);

        let commands = controller.handle_event(PlayerEvent::CatalogItemAdded(video("v1.mp4")), now);
        assert_eq!(commands, vec![DisplayCommand::PlayVideo(video("v1.mp4"))]);
        assert_eq!(*controller.state(), PlayerState::PlayingVideo);

        // Subsequent appends never restart playback.
        let commands = controller.handle_event(PlayerEvent::CatalogItemAdded(video("v2.mp4")), now);
        assert!(commands.is_empty());
        assert_eq!(controller.cursor().video_index, 0);
    }

    #[test]
    fn video_cycle_visits_each_index_once_then_switches_to_images() {
        let now = Instant::now();
        let mut controller = controller_with(&["v1.mp4", "v2.mp4", "v3.mp4"], &["i1.png"], now);

        let commands = controller.handle_event(PlayerEvent::VideoEnded, now);
        assert_eq!(commands, vec![DisplayCommand::PlayVideo(video("v2.mp4"))]);
        let commands = controller.handle_event(PlayerEvent::VideoEnded, now);
        assert_eq!(commands, vec![DisplayCommand::PlayVideo(video("v3.mp4"))]);

        // End of the last video wraps the index to 0 and switches modes.
        let commands = controller.handle_event(PlayerEvent::VideoEnded, now);
        assert_eq!(commands, vec![DisplayCommand::ShowImage(image("i1.png"))]);
        assert_eq!(*controller.state(), PlayerState::ShowingImage);
        assert_eq!(controller.cursor().mode, PlaybackMode::Image);
        assert_eq!(controller.cursor().video_index, 0);
    }

    #[test]
    fn dwell_firing_len_images_times_returns_to_videos() {
        let start = Instant::now();
        let mut controller = controller_with(&["v1.mp4"], &["i1.png", "i2.png"], start);

        // Finish the single video to enter image mode.
        let commands = controller.handle_event(PlayerEvent::VideoEnded, start);
        assert_eq!(commands, vec![DisplayCommand::ShowImage(image("i1.png"))]);

        // Nothing happens before the dwell expires.
        assert!(controller.tick(start + IMAGE_DWELL / 2).is_empty());

        let t1 = start + IMAGE_DWELL;
        let commands = controller.tick(t1);
        assert_eq!(commands, vec![DisplayCommand::ShowImage(image("i2.png"))]);

        // The second expiry wraps the image index and resumes the videos.
        let t2 = t1 + IMAGE_DWELL;
        let commands = controller.tick(t2);
        assert_eq!(commands, vec![DisplayCommand::PlayVideo(video("v1.mp4"))]);
        assert_eq!(controller.cursor().image_index, 0);
        assert_eq!(controller.cursor().mode, PlaybackMode::Video);
        // Entering video playback cancels the dwell.
        assert_eq!(controller.dwell_deadline(), None);
    }

    #[test]
    fn disconnect_and_reconnect_restart_current_video_from_start() {
        let now = Instant::now();
        let mut controller = controller_with(&["v1.mp4", "v2.mp4"], &[], now);
        controller.handle_event(PlayerEvent::VideoEnded, now); // now playing v2
        assert_eq!(controller.cursor().video_index, 1);

        let commands = controller.handle_event(PlayerEvent::ConnectivityChanged(false), now);
        assert_eq!(
            commands,
            vec![DisplayCommand::PauseVideo, DisplayCommand::ShowPlaceholder]
        );
        assert_eq!(*controller.state(), PlayerState::Suspended);
        // Cursor is preserved, not reset.
        assert_eq!(controller.cursor().video_index, 1);

        let commands = controller.handle_event(PlayerEvent::ConnectivityChanged(true), now);
        assert_eq!(commands, vec![DisplayCommand::PlayVideo(video("v2.mp4"))]);
        assert_eq!(*controller.state(), PlayerState::PlayingVideo);
    }

    #[test]
    fn disconnect_during_image_cancels_dwell_and_reconnect_rearms_it() {
        let start = Instant::now();
        let mut controller = controller_with(&["v1.mp4"], &["i1.png", "i2.png"], start);
        controller.handle_event(PlayerEvent::VideoEnded, start); // showing i1
        assert!(controller.dwell_deadline().is_some());

        controller.handle_event(PlayerEvent::ConnectivityChanged(false), start);
        assert_eq!(controller.dwell_deadline(), None);

        // A tick past the original deadline must not advance while suspended.
        assert!(controller.tick(start + IMAGE_DWELL * 2).is_empty());
        assert_eq!(controller.cursor().image_index, 0);

        // Reconnect re-displays the current image with a fresh dwell, so the
        // deadline is measured from the reconnect instant, not from when the
        // image was first shown.
        let reconnect_at = start + IMAGE_DWELL * 3;
        let commands = controller.handle_event(PlayerEvent::ConnectivityChanged(true), reconnect_at);
        assert_eq!(commands, vec![DisplayCommand::ShowImage(image("i1.png"))]);
        assert_eq!(controller.dwell_deadline(), Some(reconnect_at + IMAGE_DWELL));
        assert!(controller.tick(reconnect_at).is_empty());
    }

    #[test]
    fn empty_videos_never_fall_back_to_images() {
        let now = Instant::now();
        let mut controller = PlaybackController::new();

        // Images arrive, but the controller starts in Video mode: it must
        // stall showing nothing rather than auto-fall back to the images.
        let commands = controller.handle_event(PlayerEvent::CatalogItemAdded(image("a.png")), now);
        assert!(commands.is_empty());
        let commands = controller.handle_event(PlayerEvent::CatalogItemAdded(image("b.png")), now);
        assert!(commands.is_empty());
        assert_eq!(*controller.state(), PlayerState::Idle);
        assert_eq!(controller.cursor().mode, PlaybackMode::Video);
        assert!(controller.tick(now + IMAGE_DWELL * 4).is_empty());
    }

    #[test]
    fn wraparound_into_empty_image_list_stalls_until_image_arrives() {
        let now = Instant::now();
        let mut controller = controller_with(&["v1.mp4"], &[], now);

        // The last video ends, mode switches to Image, but the list is
        // empty: guarded no-op, prior visual unchanged.
        let commands = controller.handle_event(PlayerEvent::VideoEnded, now);
        assert!(commands.is_empty());
        assert_eq!(*controller.state(), PlayerState::Idle);
        assert_eq!(controller.cursor().mode, PlaybackMode::Image);

        // An image arriving in the matching mode starts the image cycle.
        let commands = controller.handle_event(PlayerEvent::CatalogItemAdded(image("i1.png")), now);
        assert_eq!(commands, vec![DisplayCommand::ShowImage(image("i1.png"))]);
    }

    #[test]
    fn reconnect_with_empty_relevant_list_is_a_noop() {
        let now = Instant::now();
        let mut controller = PlaybackController::new();
        controller.handle_event(PlayerEvent::ConnectivityChanged(false), now);
        assert_eq!(*controller.state(), PlayerState::Suspended);

        let commands = controller.handle_event(PlayerEvent::ConnectivityChanged(true), now);
        assert!(commands.is_empty());
        assert_eq!(*controller.state(), PlayerState::Idle);

        // The catalog gaining a video afterwards starts playback.
        let commands = controller.handle_event(PlayerEvent::CatalogItemAdded(video("v1.mp4")), now);
        assert_eq!(commands, vec![DisplayCommand::PlayVideo(video("v1.mp4"))]);
    }

    #[test]
    fn items_arriving_while_disconnected_do_not_start_playback() {
        let now = Instant::now();
        let mut controller = PlaybackController::new();
        controller.handle_event(PlayerEvent::ConnectivityChanged(false), now);

        let commands = controller.handle_event(PlayerEvent::CatalogItemAdded(video("v1.mp4")), now);
        assert!(commands.is_empty());
        assert_eq!(*controller.state(), PlayerState::Suspended);

        // They are still in the catalog and play on reconnect.
        let commands = controller.handle_event(PlayerEvent::ConnectivityChanged(true), now);
        assert_eq!(commands, vec![DisplayCommand::PlayVideo(video("v1.mp4"))]);
    }

    #[test]
    fn stale_video_ended_is_ignored_outside_playing_state() {
        let now = Instant::now();
        let mut controller = controller_with(&["v1.mp4"], &["i1.png"], now);
        controller.handle_event(PlayerEvent::ConnectivityChanged(false), now);

        let commands = controller.handle_event(PlayerEvent::VideoEnded, now);
        assert!(commands.is_empty());
        assert_eq!(controller.cursor().video_index, 0);
        assert_eq!(*controller.state(), PlayerState::Suspended);
    }

    #[test]
    fn listing_failure_surfaces_one_notice_and_nothing_else() {
        let now = Instant::now();
        let mut controller = controller_with(&["v1.mp4"], &[], now);
        let commands =
            controller.handle_event(PlayerEvent::ListingFailed("boom".to_string()), now);
        assert_eq!(commands, vec![DisplayCommand::Notice("boom".to_string())]);
        // Playback state and catalog are untouched.
        assert_eq!(*controller.state(), PlayerState::PlayingVideo);
        assert_eq!(controller.catalog().len(PlaybackMode::Video), 1);
    }

    #[test]
    fn full_loop_interleaves_videos_then_images_repeatedly() {
        let mut now = Instant::now();
        let mut controller = controller_with(&["v1.mp4", "v2.mp4"], &["i1.png"], now);

        for _ in 0..3 {
            // v1 is playing; finishing it plays v2.
            let commands = controller.handle_event(PlayerEvent::VideoEnded, now);
            assert_eq!(commands, vec![DisplayCommand::PlayVideo(video("v2.mp4"))]);
            // Finishing v2 wraps into the image cycle.
            let commands = controller.handle_event(PlayerEvent::VideoEnded, now);
            assert_eq!(commands, vec![DisplayCommand::ShowImage(image("i1.png"))]);
            // The single image's dwell expiring resumes v1.
            now += IMAGE_DWELL;
            let commands = controller.tick(now);
            assert_eq!(commands, vec![DisplayCommand::PlayVideo(video("v1.mp4"))]);
        }
    }
}
