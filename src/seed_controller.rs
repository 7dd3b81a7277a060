// SPDX-FileCopyrightText: 2025 The superseedr Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::Settings;
use crate::errors::HostError;
use crate::host::{Download, DownloadState, PeerSession, PeerSnapshot};

use tracing::{event, Level};

use std::cmp::Ordering;
use std::sync::Arc;

/// What one periodic pass did to a download.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedPassReport {
    pub stopped: bool,
    pub evicted: Vec<String>,
}

/// Eviction preference: peers choking us first, then the ones that have
/// already given us the most.
pub fn eviction_order(a: &PeerSnapshot, b: &PeerSnapshot) -> Ordering {
    b.peer_choking
        .cmp(&a.peer_choking)
        .then_with(|| b.total_received.cmp(&a.total_received))
}

pub struct SeedConnectionController {
    settings: Arc<Settings>,
}

impl SeedConnectionController {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Periodic work for one download. Failures are logged and never abort the pass.
    pub fn process_download(
        &self,
        download: &dyn Download,
        enabled: bool,
        stop_when_complete: bool,
    ) -> SeedPassReport {
        let mut report = SeedPassReport::default();
        if !enabled {
            return report;
        }

        if download.state() == DownloadState::Seeding && stop_when_complete && !download.is_checking() {
            event!(Level::INFO, download = %download.name(), "Stopping as stop-when-complete.");
            match download.stop() {
                Ok(()) => report.stopped = true,
                Err(e) => {
                    event!(Level::WARN, download = %download.name(), error = %e, "Failed to stop download.");
                }
            }
        }

        if let Err(e) = download.set_max_upload_slots(self.settings.max_upload_slots) {
            event!(Level::WARN, download = %download.name(), error = %e, "Failed to set upload slots.");
        }

        let Some(session) = download.peer_session() else {
            return report;
        };
        match self.evict_excess_seeds(download.name(), session.as_ref()) {
            Ok(evicted) => report.evicted = evicted,
            Err(e) => {
                event!(Level::DEBUG, download = %download.name(), error = %e, "Skipping seed eviction.");
            }
        }
        report
    }

    /// Disconnects seeds until fewer than the cap remain connected.
    pub fn evict_excess_seeds(
        &self,
        download_name: &str,
        session: &dyn PeerSession,
    ) -> Result<Vec<String>, HostError> {
        let cap = self.settings.max_seeds_per_torrent;
        let mut connected_seeds = session.connected_seeds()?;
        let mut evicted = Vec::new();
        if connected_seeds < cap {
            return Ok(evicted);
        }

        let mut peers = session.peers()?;
        peers.sort_by(eviction_order);

        for peer in peers.iter().filter(|p| p.is_seed) {
            if connected_seeds < cap {
                break;
            }
            match session.remove_peer(&peer.id) {
                Ok(()) => {
                    connected_seeds -= 1;
                    evicted.push(peer.id.clone());
                }
                Err(e) => {
                    event!(Level::WARN, download = %download_name, peer = %peer.id, error = %e, "Failed to disconnect seed.");
                }
            }
        }

        if !evicted.is_empty() {
            event!(
                Level::DEBUG,
                download = %download_name,
                evicted = evicted.len(),
                connected_seeds,
                "Evicted excess seeds."
            );
        }
        Ok(evicted)
    }

    /// Reaction to a freshly connected peer. Returns true when it was disconnected.
    ///
    /// The new seed is dropped only while the seed count is *below* the cap.
    pub fn on_peer_added(
        &self,
        download_name: &str,
        session: &dyn PeerSession,
        peer: &PeerSnapshot,
    ) -> bool {
        let connected_seeds = match session.connected_seeds() {
            Ok(n) => n,
            Err(e) => {
                event!(Level::DEBUG, download = %download_name, error = %e, "Ignoring peer-added event.");
                return false;
            }
        };
        if connected_seeds >= self.settings.max_seeds_per_torrent || !peer.is_seed {
            return false;
        }
        match session.remove_peer(&peer.id) {
            Ok(()) => {
                event!(Level::DEBUG, download = %download_name, peer = %peer.id, "Disconnected newly added seed.");
                true
            }
            Err(e) => {
                event!(Level::DEBUG, download = %download_name, peer = %peer.id, error = %e, "Failed to disconnect new seed.");
                false
            }
        }
    }
}
