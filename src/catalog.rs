//! The media catalog: two append-only ordered sequences of remote locators.
//!
//! Insertion order defines playback order. The catalog grows asynchronously
//! while playback runs (listing results arrive as events on the serialized
//! queue), so readers must tolerate an empty sequence becoming non-empty
//! mid-session. Nothing is ever removed, reordered or deduplicated.

use log::info;

use super::model::{MediaItemRef, MediaKind, PlaybackMode};

#[derive(Debug, Default)]
pub struct MediaCatalog {
    videos: Vec<MediaItemRef>,
    images: Vec<MediaItemRef>,
}

impl MediaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item to the sequence matching its kind.
    pub fn add(&mut self, item: MediaItemRef) {
        match item.kind {
            MediaKind::Video => {
                info!("Catalog: added video #{}: '{}'", self.videos.len(), item.name);
                self.videos.push(item);
            }
            MediaKind::Image => {
                info!("Catalog: added image #{}: '{}'", self.images.len(), item.name);
                self.images.push(item);
            }
        }
    }

    pub fn len(&self, mode: PlaybackMode) -> usize {
        match mode {
            PlaybackMode::Video => self.videos.len(),
            PlaybackMode::Image => self.images.len(),
        }
    }

    pub fn is_empty(&self, mode: PlaybackMode) -> bool {
        self.len(mode) == 0
    }

    pub fn get(&self, mode: PlaybackMode, index: usize) -> Option<&MediaItemRef> {
        match mode {
            PlaybackMode::Video => self.videos.get(index),
            PlaybackMode::Image => self.images.get(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(name: &str) -> MediaItemRef {
        MediaItemRef::classify(name, &format!("http://store/{}", name)).unwrap()
    }

    #[test]
    fn append_preserves_insertion_order() {
        let mut catalog = MediaCatalog::new();
        catalog.add(video("b.mp4"));
        catalog.add(video("a.mp4"));
        catalog.add(MediaItemRef::classify("x.png", "http://store/x.png").unwrap());

        assert_eq!(catalog.len(PlaybackMode::Video), 2);
        assert_eq!(catalog.len(PlaybackMode::Image), 1);
        assert_eq!(catalog.get(PlaybackMode::Video, 0).unwrap().name, "b.mp4");
        assert_eq!(catalog.get(PlaybackMode::Video, 1).unwrap().name, "a.mp4");
        assert!(catalog.get(PlaybackMode::Video, 2).is_none());
    }

    #[test]
    fn empty_until_first_append() {
        let mut catalog = MediaCatalog::new();
        assert!(catalog.is_empty(PlaybackMode::Video));
        assert!(catalog.is_empty(PlaybackMode::Image));
        catalog.add(video("v.mp4"));
        assert!(!catalog.is_empty(PlaybackMode::Video));
        assert!(catalog.is_empty(PlaybackMode::Image));
    }
}
