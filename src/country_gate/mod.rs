// SPDX-FileCopyrightText: 2025 The superseedr Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Connection admission by country of origin.
//!
//! The gate is inert until a location provider can be resolved. Once one is
//! available, lookups made before the blocked-country list has been loaded
//! are refused.

pub mod geoip;
pub mod provider;

use crate::clock::Clock;
use crate::config::{parse_country_list, Settings};

use provider::{LocationProvider, ProviderCache, ProviderRegistry};

use arc_swap::ArcSwapOption;
use tracing::{event, Level};

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

pub struct CountryGate {
    providers: ProviderCache,
    blocked_countries: ArcSwapOption<HashSet<String>>,
}

impl CountryGate {
    pub fn new(registry: Arc<dyn ProviderRegistry>, clock: Arc<dyn Clock>, provider_recheck: Duration) -> Self {
        Self {
            providers: ProviderCache::new(registry, clock, provider_recheck),
            blocked_countries: ArcSwapOption::empty(),
        }
    }

    pub fn from_settings(registry: Arc<dyn ProviderRegistry>, clock: Arc<dyn Clock>, settings: &Settings) -> Self {
        Self::new(registry, clock, settings.provider_recheck())
    }

    /// Replaces the blocked set with the entries of a comma separated list.
    /// Returns the number of entries now active.
    pub fn set_blocked_countries(&self, raw: &str) -> usize {
        let new_set = parse_country_list(raw);
        let mut listed: Vec<&str> = new_set.iter().map(String::as_str).collect();
        listed.sort_unstable();
        event!(
            Level::INFO,
            entries = new_set.len(),
            countries = %listed.join(","),
            "Blocked country list rebuilt."
        );
        let count = new_set.len();
        self.blocked_countries.store(Some(Arc::new(new_set)));
        count
    }

    /// Current blocked set, `None` until configuration has been applied once.
    pub fn blocked_countries(&self) -> Option<Arc<HashSet<String>>> {
        self.blocked_countries.load_full()
    }

    pub fn provider(&self) -> Option<Arc<dyn LocationProvider>> {
        self.providers.provider()
    }

    /// Admission check for a candidate connection. `_torrent_hash` identifies
    /// the swarm the connection is for.
    pub fn is_blocked(&self, _torrent_hash: &[u8], ip: IpAddr) -> bool {
        let Some(provider) = self.providers.provider() else {
            return false;
        };
        let code = provider.iso3166_code_for_ip(ip);

        let Some(blocked) = self.blocked_countries() else {
            event!(Level::WARN, %ip, "Blocking address, country list not initialised.");
            return true;
        };

        match code {
            Some(cc) if blocked.contains(&cc) => {
                event!(Level::INFO, %ip, country = %cc, "Blocking address by country.");
                true
            }
            _ => false,
        }
    }

    /// Textual form used by hosts that only carry the address as a string.
    /// Unparseable addresses are let through.
    pub fn is_blocked_str(&self, torrent_hash: &[u8], ip: &str) -> bool {
        match ip.trim().parse::<IpAddr>() {
            Ok(addr) => self.is_blocked(torrent_hash, addr),
            Err(_) => {
                event!(Level::DEBUG, ip, "Cannot parse address for country check.");
                false
            }
        }
    }
}
