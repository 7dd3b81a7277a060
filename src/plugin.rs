// SPDX-FileCopyrightText: 2025 The superseedr Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::clock::Clock;
use crate::config::Settings;
use crate::country_gate::CountryGate;
use crate::host::{Download, DownloadFlag, DownloadRegistry, PeerSession, PeerSnapshot};
use crate::piece_scheduler::PieceSelectionScheduler;
use crate::seed_controller::{SeedConnectionController, SeedPassReport};
use crate::upload_average::UploadAverageTracker;

use parking_lot::Mutex;
use tracing::{event, Level};

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Per-download state shared between the timer and host callbacks.
struct PluginState {
    enabled: HashMap<String, bool>,
    tracked: HashMap<String, Arc<dyn Download>>,
    uploads: UploadAverageTracker,
}

/// Cached read of the host's enabled flag. The host is queried with the
/// state lock released; a value cached meanwhile by `set_enabled` wins.
fn cached_enabled(state: &Mutex<PluginState>, download: &dyn Download) -> bool {
    if let Some(&enabled) = state.lock().enabled.get(download.id()) {
        return enabled;
    }
    let from_host = download.flag(DownloadFlag::Enabled);
    *state
        .lock()
        .enabled
        .entry(download.id().to_string())
        .or_insert(from_host)
}

pub struct UploadMaximizer {
    settings: Arc<Settings>,
    clock: Arc<dyn Clock>,
    downloads: Arc<dyn DownloadRegistry>,
    country_gate: Arc<CountryGate>,
    seed_controller: SeedConnectionController,
    state: Arc<Mutex<PluginState>>,
    ticks: AtomicU64,
}

impl UploadMaximizer {
    /// The gate may already be installed in the host's admission path; the
    /// configured country list is applied to it here.
    pub fn new(
        settings: Arc<Settings>,
        clock: Arc<dyn Clock>,
        downloads: Arc<dyn DownloadRegistry>,
        country_gate: Arc<CountryGate>,
    ) -> Self {
        country_gate.set_blocked_countries(&settings.blocked_countries);
        let state = PluginState {
            enabled: HashMap::new(),
            tracked: HashMap::new(),
            uploads: UploadAverageTracker::new(settings.upload_average_window),
        };
        Self {
            seed_controller: SeedConnectionController::new(settings.clone()),
            settings,
            clock,
            downloads,
            country_gate,
            state: Arc::new(Mutex::new(state)),
            ticks: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn country_gate(&self) -> &Arc<CountryGate> {
        &self.country_gate
    }

    pub fn is_blocked(&self, torrent_hash: &[u8], ip: IpAddr) -> bool {
        self.country_gate.is_blocked(torrent_hash, ip)
    }

    pub fn is_enabled(&self, download: &dyn Download) -> bool {
        cached_enabled(&self.state, download)
    }

    pub fn set_enabled(&self, download: &dyn Download, enabled: bool) {
        self.state
            .lock()
            .enabled
            .insert(download.id().to_string(), enabled);
        download.set_flag(DownloadFlag::Enabled, enabled);
    }

    pub fn is_stop_when_complete(&self, download: &dyn Download) -> bool {
        !download.flag(DownloadFlag::ContinueWhenComplete)
    }

    pub fn set_stop_when_complete(&self, download: &dyn Download, stop: bool) {
        download.set_flag(DownloadFlag::ContinueWhenComplete, !stop);
    }

    pub fn status_label(&self, download: &dyn Download) -> &'static str {
        if self.is_enabled(download) {
            "Enabled"
        } else {
            "Disabled"
        }
    }

    pub fn upload_average(&self, download_id: &str) -> u64 {
        self.state.lock().uploads.average(download_id)
    }

    /// Downloads without metadata are ignored until they are added again.
    pub fn download_added(&self, download: Arc<dyn Download>) {
        if !download.has_torrent() {
            return;
        }
        self.state
            .lock()
            .tracked
            .insert(download.id().to_string(), download);
    }

    pub fn download_removed(&self, download_id: &str) {
        let mut state = self.state.lock();
        state.tracked.remove(download_id);
        state.enabled.remove(download_id);
        state.uploads.remove(download_id);
    }

    /// Builds the priority provider the host installs for a new peer session.
    pub fn peer_manager_added(&self, download: Arc<dyn Download>) -> Option<PriorityProvider> {
        let session = download.peer_session()?;
        let scheduler = PieceSelectionScheduler::new(
            download.name(),
            download.piece_count(),
            self.settings.clone(),
            self.clock.clone(),
        );
        Some(PriorityProvider {
            download,
            session,
            state: self.state.clone(),
            scheduler,
        })
    }

    /// Host event for a newly connected peer. Returns true if it was disconnected.
    pub fn peer_added(&self, download: &dyn Download, peer: &PeerSnapshot) -> bool {
        if !self.is_enabled(download) {
            return false;
        }
        let Some(session) = download.peer_session() else {
            return false;
        };
        self.seed_controller
            .on_peer_added(download.name(), session.as_ref(), peer)
    }

    /// Applies a saved configuration. Cached enable flags are dropped so the
    /// next read goes back to the host.
    pub fn config_saved(&self, blocked_countries: &str) {
        self.country_gate.set_blocked_countries(blocked_countries);
        self.state.lock().enabled.clear();
    }

    /// Once-per-second work: sample upload rates, and every Nth tick run the
    /// seed pass over all downloads.
    pub fn on_timer_tick(&self) {
        let tracked: Vec<Arc<dyn Download>> = self.state.lock().tracked.values().cloned().collect();
        let samples: Vec<(String, u64)> = tracked
            .iter()
            .filter(|d| self.is_enabled(d.as_ref()))
            .map(|d| (d.id().to_string(), d.upload_rate()))
            .collect();
        if !samples.is_empty() {
            let mut state = self.state.lock();
            for (id, rate) in samples {
                // Skip downloads removed while the rates were being read.
                if state.tracked.contains_key(&id) {
                    state.uploads.record(&id, rate);
                }
            }
        }

        let ticks = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        if ticks % self.settings.seed_pass_every_ticks.max(1) == 0 {
            self.run_seed_pass();
        }
    }

    pub fn run_seed_pass(&self) -> Vec<(String, SeedPassReport)> {
        let downloads = self.downloads.downloads();
        let mut reports = Vec::with_capacity(downloads.len());
        for download in downloads {
            let enabled = self.is_enabled(download.as_ref());
            let stop_when_complete = self.is_stop_when_complete(download.as_ref());
            let report = self
                .seed_controller
                .process_download(download.as_ref(), enabled, stop_when_complete);
            if report.stopped || !report.evicted.is_empty() {
                event!(
                    Level::DEBUG,
                    download = %download.name(),
                    stopped = report.stopped,
                    evicted = report.evicted.len(),
                    "Seed pass acted on download."
                );
            }
            reports.push((download.id().to_string(), report));
        }
        reports
    }
}

/// Per-session hook the host calls whenever it recomputes piece priorities.
pub struct PriorityProvider {
    download: Arc<dyn Download>,
    session: Arc<dyn PeerSession>,
    state: Arc<Mutex<PluginState>>,
    scheduler: PieceSelectionScheduler,
}

impl PriorityProvider {
    pub fn update_priorities(&mut self) -> Option<Vec<i64>> {
        let enabled = cached_enabled(&self.state, self.download.as_ref());
        self.scheduler
            .update_priorities(enabled, self.session.as_ref())
    }

    pub fn scheduler(&self) -> &PieceSelectionScheduler {
        &self.scheduler
    }
}
