// SPDX-FileCopyrightText: 2025 The superseedr Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::clock::Clock;

use parking_lot::Mutex;
use tracing::{event, Level};

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

pub const CAP_ISO3166_BY_IP: u32 = 0x01;
pub const CAP_COUNTRY_BY_IP: u32 = 0x02;
pub const CAP_FLAG_BY_IP: u32 = 0x04;

/// Something that can map an address to a country.
pub trait LocationProvider: Send + Sync {
    fn name(&self) -> &str;
    fn capabilities(&self) -> u32;
    /// ISO-3166 alpha-2 code, `None` when the address is unknown.
    fn iso3166_code_for_ip(&self, ip: IpAddr) -> Option<String>;
    fn is_destroyed(&self) -> bool;

    fn has_capabilities(&self, required: u32) -> bool {
        self.capabilities() & required == required
    }
}

pub trait ProviderRegistry: Send + Sync {
    fn location_providers(&self) -> Vec<Arc<dyn LocationProvider>>;
}

/// Registry over a fixed list, for hosts that load providers up front.
#[derive(Default)]
pub struct StaticProviderRegistry {
    providers: Vec<Arc<dyn LocationProvider>>,
}

impl StaticProviderRegistry {
    pub fn new(providers: Vec<Arc<dyn LocationProvider>>) -> Self {
        Self { providers }
    }
}

impl ProviderRegistry for StaticProviderRegistry {
    fn location_providers(&self) -> Vec<Arc<dyn LocationProvider>> {
        self.providers.clone()
    }
}

#[derive(Default)]
struct CacheSlot {
    provider: Option<Arc<dyn LocationProvider>>,
    last_check: Option<Duration>,
}

/// Lazily resolved provider handle.
///
/// While nothing is cached the registry is consulted at most once per
/// `recheck` interval. A cached provider is kept until it reports itself
/// destroyed.
pub struct ProviderCache {
    registry: Arc<dyn ProviderRegistry>,
    clock: Arc<dyn Clock>,
    recheck: Duration,
    slot: Mutex<CacheSlot>,
}

impl ProviderCache {
    pub fn new(registry: Arc<dyn ProviderRegistry>, clock: Arc<dyn Clock>, recheck: Duration) -> Self {
        Self {
            registry,
            clock,
            recheck,
            slot: Mutex::new(CacheSlot::default()),
        }
    }

    pub fn provider(&self) -> Option<Arc<dyn LocationProvider>> {
        let mut slot = self.slot.lock();

        if slot.provider.as_ref().is_some_and(|p| p.is_destroyed()) {
            event!(Level::DEBUG, "Location provider destroyed, dropping cached handle.");
            slot.provider = None;
            slot.last_check = None;
        }

        if slot.provider.is_none() {
            let now = self.clock.monotonic();
            let due = slot
                .last_check
                .map_or(true, |last| now.saturating_sub(last) > self.recheck);
            if due {
                slot.last_check = Some(now);
                slot.provider = self
                    .registry
                    .location_providers()
                    .into_iter()
                    .filter(|p| !p.is_destroyed())
                    .filter(|p| p.has_capabilities(CAP_ISO3166_BY_IP | CAP_COUNTRY_BY_IP))
                    .last();
                if let Some(provider) = &slot.provider {
                    event!(Level::INFO, provider = %provider.name(), "Resolved location provider.");
                }
            }
        }

        slot.provider.clone()
    }
}
