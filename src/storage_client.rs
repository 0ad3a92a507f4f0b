//! Client for the remote object store.
//!
//! Two responsibilities: listing the media objects available under the
//! configured prefix (delivered incrementally into the UI event queue as
//! classified `CatalogItemAdded` events), and streaming a single object into
//! a temporary file for video playback. All functions are asynchronous and
//! use the shared `reqwest` client with the custom error types from
//! `src/errors.rs`.
//!
//! Listing failures are terminal for the session: the failure is reported
//! exactly once as a `ListingFailed` event (a transient on-screen notice)
//! and no retry is scheduled. The catalog keeps whatever it already had.

use std::sync::mpsc as std_mpsc;

use log::{debug, error, info, warn};
use reqwest::Client;
use serde::Deserialize;
use tempfile::NamedTempFile;
use tokio_stream::StreamExt;

use super::config::AppConfig;
use super::errors::StorageError;
use super::model::{MediaItemRef, PlayerEvent};

/// One object as reported by the listing endpoint. The fetch URL is
/// optional; when absent it is resolved against the listing base URL.
#[derive(Deserialize, Debug)]
struct ObjectEntry {
    name: String,
    url: Option<String>,
}

/// The listing response body: `{"objects": [{"name": ..., "url": ...}]}`.
#[derive(Deserialize, Debug)]
struct ListingResponse {
    objects: Vec<ObjectEntry>,
}

/// Fetches the object listing and classifies each entry by filename suffix.
///
/// Entries with an unrecognized suffix are silently dropped. Order is the
/// endpoint's order, which defines playback order.
#[must_use = "fetching the listing can fail; the Result must be handled"]
pub async fn list_media_objects(
    config: &AppConfig,
    client: &Client,
) -> Result<Vec<MediaItemRef>, StorageError> {
    let url = if config.storage_prefix.is_empty() {
        config.storage_url.clone()
    } else {
        format!("{}?prefix={}", config.storage_url, config.storage_prefix)
    };
    debug!("Fetching object listing from: {}", url);

    let response = client.get(&url).send().await.map_err(StorageError::Reqwest)?;
    let response = response.error_for_status().map_err(|e| {
        let status = e.status().unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        error!("HTTP error fetching object listing: {} - {}", status, e);
        StorageError::HttpError {
            status,
            message: e.to_string(),
        }
    })?;

    let body = response.text().await.map_err(StorageError::Reqwest)?;
    let listing: ListingResponse = serde_json::from_str(&body).map_err(|e| {
        error!("Failed to parse object listing: {:?}", e);
        StorageError::SerdeJson(e)
    })?;
    info!("Listing returned {} objects.", listing.objects.len());

    let base = config.storage_url.trim_end_matches('/');
    let items = listing
        .objects
        .into_iter()
        .filter_map(|entry| {
            let url = entry
                .url
                .clone()
                .unwrap_or_else(|| format!("{}/{}", base, entry.name));
            MediaItemRef::classify(&entry.name, &url)
        })
        .collect::<Vec<_>>();
    info!("Classified {} media objects from listing.", items.len());
    Ok(items)
}

/// Runs one listing pass, posting each discovered item into the event queue.
///
/// On failure a single `ListingFailed` event is posted instead.
pub async fn run_listing(
    config: AppConfig,
    client: Client,
    events: std_mpsc::Sender<PlayerEvent>,
    ctx: egui::Context,
) {
    match list_media_objects(&config, &client).await {
        Ok(items) => {
            for item in items {
                if events.send(PlayerEvent::CatalogItemAdded(item)).is_err() {
                    warn!("Event queue closed; abandoning listing delivery.");
                    return;
                }
                ctx.request_repaint();
            }
        }
        Err(e) => {
            error!("Media listing failed: {}", e);
            let _ = events.send(PlayerEvent::ListingFailed(
                "Could not fetch media files".to_string(),
            ));
            ctx.request_repaint();
        }
    }
}

/// Streams an object into a temporary file (used for video playback, which
/// decodes from disk rather than memory).
#[must_use = "fetching an object can fail; the Result must be handled"]
pub async fn fetch_object_to_temp_file(
    client: &Client,
    url: &str,
) -> Result<NamedTempFile, StorageError> {
    debug!("Fetching object to temp file: {}", url);
    let response = client.get(url).send().await.map_err(|e| {
        error!("Request error fetching object '{}': {:?}", url, e);
        StorageError::Reqwest(e)
    })?;
    let response = response.error_for_status().map_err(|e| {
        let status = e.status().unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        error!("HTTP error fetching object '{}': {} - {}", url, status, e);
        StorageError::HttpError {
            status,
            message: e.to_string(),
        }
    })?;

    let mut temp_file = NamedTempFile::new().map_err(|e| {
        error!("Failed to create temp file for '{}': {:?}", url, e);
        StorageError::Generic(format!("Failed to create temp file for '{}': {}", url, e))
    })?;
    let mut stream = response.bytes_stream();

    while let Some(item) = stream.next().await {
        let chunk = item.map_err(|e| {
            error!("Stream error while downloading '{}': {:?}", url, e);
            StorageError::Reqwest(e)
        })?;
        std::io::Write::write_all(&mut temp_file, &chunk).map_err(|e| {
            error!("Failed to write chunk to temp file for '{}': {:?}", url, e);
            StorageError::Generic(format!("Failed to write chunk for '{}': {}", url, e))
        })?;
    }
    std::io::Write::flush(&mut temp_file).map_err(|e| {
        error!("Failed to flush temp file for '{}': {:?}", url, e);
        StorageError::Generic(format!("Failed to flush temp file for '{}': {}", url, e))
    })?;
    info!(
        "Fetched object '{}' to temp file {:?}",
        url,
        temp_file.path()
    );
    Ok(temp_file)
}
