//! Defines the custom error types used throughout the `menuboard_rs` application.
//!
//! This module centralizes error handling, providing specific error enums for
//! different categories of issues (configuration, object-store interactions,
//! media processing). Each error type implements `Debug`, `Display`, and
//! `std::error::Error`, and provides `From` implementations for common
//! underlying error types.

use std::error::Error as StdError;
use std::fmt;

// --- ConfigError ---
/// Errors related to application configuration loading and parsing.
#[must_use = "a configuration error should be handled or propagated"]
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O error occurred while trying to read the configuration file.
    Io(std::io::Error),
    /// An error occurred while parsing the configuration file content.
    Parse(String),
    /// A required configuration key was missing from the file.
    MissingKey(String),
    /// A configuration value was present but not usable (e.g., non-numeric interval).
    InvalidValue { key: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Configuration I/O error: {}", e),
            ConfigError::Parse(e) => write!(f, "Configuration parse error: {}", e),
            ConfigError::MissingKey(key) => write!(f, "Missing configuration key: '{}'", key),
            ConfigError::InvalidValue { key, message } => {
                write!(f, "Invalid value for configuration key '{}': {}", key, message)
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

// --- StorageError ---
/// Errors related to interactions with the remote object-store listing endpoint.
#[must_use = "a storage error should be handled or propagated"]
#[derive(Debug)]
pub enum StorageError {
    /// An error occurred during an HTTP request made by `reqwest`.
    Reqwest(reqwest::Error),
    /// An error occurred during JSON deserialization of a listing response.
    SerdeJson(serde_json::Error),
    /// An HTTP error status was returned (e.g., 401, 404, 500).
    HttpError { status: reqwest::StatusCode, message: String },
    /// A generic storage error not covered by other variants.
    Generic(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Reqwest(e) => write!(f, "Storage request error: {}", e),
            StorageError::SerdeJson(e) => write!(f, "Storage JSON deserialization error: {}", e),
            StorageError::HttpError { status, message } => {
                write!(f, "Storage HTTP error {}: {}", status, message)
            }
            StorageError::Generic(s) => write!(f, "Storage error: {}", s),
        }
    }
}

impl StdError for StorageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StorageError::Reqwest(e) => Some(e),
            StorageError::SerdeJson(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Reqwest(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerdeJson(err)
    }
}

// --- MediaError ---
/// Errors related to media processing (image decoding, video decoding).
#[must_use = "a media error should be handled or propagated"]
#[derive(Debug)]
pub enum MediaError {
    /// An I/O error occurred, usually while writing a temporary video file.
    Io(std::io::Error),
    /// An error occurred during image decoding via the `image` crate.
    Image(image::ImageError),
    /// An error occurred during video decoding via `ffmpeg-next`.
    Ffmpeg(ffmpeg_next::Error),
    /// An error occurred during the download of media content.
    Download(reqwest::Error),
    /// A generic media-related error.
    Generic(String),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::Io(e) => write!(f, "Media I/O error: {}", e),
            MediaError::Image(e) => write!(f, "Image decoding error: {}", e),
            MediaError::Ffmpeg(e) => write!(f, "FFmpeg error: {}", e),
            MediaError::Download(e) => write!(f, "Media download error: {}", e),
            MediaError::Generic(s) => write!(f, "Media error: {}", s),
        }
    }
}

impl StdError for MediaError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            MediaError::Io(e) => Some(e),
            MediaError::Image(e) => Some(e),
            MediaError::Ffmpeg(e) => Some(e),
            MediaError::Download(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MediaError {
    fn from(err: std::io::Error) -> Self {
        MediaError::Io(err)
    }
}
impl From<image::ImageError> for MediaError {
    fn from(err: image::ImageError) -> Self {
        MediaError::Image(err)
    }
}
impl From<ffmpeg_next::Error> for MediaError {
    fn from(err: ffmpeg_next::Error) -> Self {
        MediaError::Ffmpeg(err)
    }
}
impl From<reqwest::Error> for MediaError {
    fn from(err: reqwest::Error) -> Self {
        MediaError::Download(err)
    }
}
