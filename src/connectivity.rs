//! Network reachability observation.
//!
//! `ConnectivityMonitor` de-duplicates raw reachability samples into
//! edge-triggered events: a transition is reported only when the observed
//! value differs from the previously observed one. The raw samples come from
//! `watch_connectivity`, a long-running task that probes a configured URL on
//! an interval and posts `ConnectivityChanged` events into the UI queue.

use std::sync::mpsc as std_mpsc;
use std::time::Duration;

use log::{debug, info, trace, warn};
use reqwest::Client;

use super::config::AppConfig;
use super::model::PlayerEvent;

/// Upper bound on a single probe round-trip.
const PROBE_TIMEOUT: Duration = Duration::from_secs(4);

/// Edge detector over a stream of reachability samples.
///
/// Starts out assuming the network is reachable, matching the player's
/// initial state; the first failed probe produces a disconnect edge.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    connected: bool,
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        Self { connected: true }
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    /// Feeds one raw sample. Returns `Some(new_state)` only on a transition.
    pub fn observe(&mut self, reachable: bool) -> Option<bool> {
        if reachable == self.connected {
            trace!("Connectivity sample unchanged (connected={})", reachable);
            return None;
        }
        self.connected = reachable;
        info!(
            "Connectivity transition: now {}",
            if reachable { "connected" } else { "disconnected" }
        );
        Some(reachable)
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Probes `probe_url` forever, posting an event on every reachability edge.
///
/// Any completed HTTP exchange counts as reachable, regardless of status
/// code; only transport-level failures (DNS, connect, timeout) count as
/// unreachable.
pub async fn watch_connectivity(
    config: AppConfig,
    client: Client,
    events: std_mpsc::Sender<PlayerEvent>,
    ctx: egui::Context,
) {
    info!(
        "Starting connectivity probe loop against {} (every {}s)",
        config.probe_url, config.probe_interval_secs
    );
    let mut monitor = ConnectivityMonitor::new();
    loop {
        let reachable = match client
            .head(&config.probe_url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => {
                trace!("Probe completed with status {}", response.status());
                true
            }
            Err(e) => {
                debug!("Probe failed: {}", e);
                false
            }
        };

        if let Some(connected) = monitor.observe(reachable) {
            if events.send(PlayerEvent::ConnectivityChanged(connected)).is_err() {
                warn!("Event queue closed; stopping connectivity probe loop.");
                return;
            }
            ctx.request_repaint();
        }

        tokio::time::sleep(Duration::from_secs(config.probe_interval_secs)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_only_transitions() {
        let mut monitor = ConnectivityMonitor::new();
        assert!(monitor.connected());

        // Repeated identical samples produce no events.
        assert_eq!(monitor.observe(true), None);
        assert_eq!(monitor.observe(true), None);

        assert_eq!(monitor.observe(false), Some(false));
        assert!(!monitor.connected());
        assert_eq!(monitor.observe(false), None);

        assert_eq!(monitor.observe(true), Some(true));
        assert_eq!(monitor.observe(true), None);
    }
}
