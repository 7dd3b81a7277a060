// SPDX-FileCopyrightText: 2025 The superseedr Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Upload-maximizing policy for a BitTorrent host.
//!
//! The host drives four cooperating parts through [`UploadMaximizer`]:
//! rare-piece selection per peer session, seed connection limits, country
//! based admission, and a rolling upload average per download.

pub mod clock;
pub mod config;
pub mod country_gate;
pub mod driver;
pub mod errors;
pub mod host;
pub mod logging;
pub mod piece_scheduler;
pub mod plugin;
pub mod seed_controller;
pub mod upload_average;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, SystemClock};
pub use config::{load_settings, Settings};
pub use country_gate::geoip::GeoIpProvider;
pub use country_gate::provider::{LocationProvider, ProviderRegistry, StaticProviderRegistry};
pub use country_gate::CountryGate;
pub use errors::{ConfigError, GeoIpError, HostError};
pub use host::{Download, DownloadFlag, DownloadRegistry, DownloadState, PeerSession, PeerSnapshot, PieceInfo};
pub use piece_scheduler::{PieceSelectionScheduler, PRIORITY_NONE};
pub use plugin::{PriorityProvider, UploadMaximizer};
pub use seed_controller::{SeedConnectionController, SeedPassReport};
pub use upload_average::UploadAverageTracker;
