//! Defines the core data structures and enums used by the menu-board player.
//!
//! This includes the media locator type with its suffix classification, the
//! playback cursor, and the event/command vocabulary exchanged between the
//! background tasks, the playback controller and the UI shell.

use log::debug;

/// The kind of a remote media object, decided once at ingestion time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
}

/// A locator for a remote video or image. Immutable once added to the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaItemRef {
    /// Object name as reported by the listing endpoint (e.g., "promo.mp4").
    pub name: String,
    /// Stable fetch URL for the object.
    pub url: String,
    pub kind: MediaKind,
}

impl MediaItemRef {
    /// Classifies an object by filename suffix and builds a locator for it.
    ///
    /// `.mp4` is a video; `.jpg`, `.jpeg` and `.png` are images. Anything
    /// else is silently dropped (returns `None`).
    pub fn classify(name: &str, url: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        let kind = if lower.ends_with(".mp4") {
            MediaKind::Video
        } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") || lower.ends_with(".png") {
            MediaKind::Image
        } else {
            debug!("Skipping object with unrecognized suffix: '{}'", name);
            return None;
        };
        Some(Self {
            name: name.to_string(),
            url: url.to_string(),
            kind,
        })
    }
}

/// Which of the two catalog sequences the cursor currently walks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackMode {
    Video,
    Image,
}

impl PlaybackMode {
    pub fn matches(self, kind: MediaKind) -> bool {
        matches!(
            (self, kind),
            (PlaybackMode::Video, MediaKind::Video) | (PlaybackMode::Image, MediaKind::Image)
        )
    }
}

/// Identifies what is currently (or next) displayed.
///
/// Exactly one mode is active at a time. Both indices persist across mode
/// switches and across suspend/resume, wrapping to 0 on overflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackCursor {
    pub mode: PlaybackMode,
    pub video_index: usize,
    pub image_index: usize,
}

impl PlaybackCursor {
    /// The initial cursor: Video mode, both indices at 0.
    pub fn new() -> Self {
        Self {
            mode: PlaybackMode::Video,
            video_index: 0,
            image_index: 0,
        }
    }
}

impl Default for PlaybackCursor {
    fn default() -> Self {
        Self::new()
    }
}

/// An input to the playback state machine.
///
/// All four producers (decoder thread, dwell expiry, connectivity probe,
/// listing task) are funneled through one serialized queue, so the
/// controller consumes these one at a time and never needs locking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerEvent {
    /// The decoder reported end-of-stream for the active video.
    VideoEnded,
    /// Network reachability changed (edge-triggered, already de-duplicated).
    ConnectivityChanged(bool),
    /// The listing task discovered (and classified) a new media object.
    CatalogItemAdded(MediaItemRef),
    /// The listing call failed; reported exactly once, no retry.
    ListingFailed(String),
}

/// An output of the playback state machine, executed by the UI shell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayCommand {
    /// Load and play this video from the beginning.
    PlayVideo(MediaItemRef),
    /// Display this image (fire-and-forget load; the dwell runs regardless).
    ShowImage(MediaItemRef),
    /// Stop the active video, if any.
    PauseVideo,
    /// Display the static "no connection" placeholder.
    ShowPlaceholder,
    /// Show a transient user-visible notice.
    Notice(String),
}
