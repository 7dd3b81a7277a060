// SPDX-FileCopyrightText: 2025 The superseedr Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::{HashMap, VecDeque};

/// Moving average of a download's upload rate over the last `window` ticks.
///
/// The sum is always divided by the full window, so a download ramps up from
/// zero over its first `window` samples.
#[derive(Debug, Clone)]
pub struct UploadAverage {
    window: usize,
    samples: VecDeque<u64>,
    sum: u64,
}

impl UploadAverage {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
            sum: 0,
        }
    }

    pub fn add_sample(&mut self, rate_bps: u64) {
        if self.samples.len() == self.window {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum = self.sum.saturating_sub(oldest);
            }
        }
        self.samples.push_back(rate_bps);
        self.sum = self.sum.saturating_add(rate_bps);
    }

    pub fn average(&self) -> u64 {
        self.sum / self.window as u64
    }
}

/// Smoothed upload rates keyed by download id. Used for display only.
#[derive(Debug)]
pub struct UploadAverageTracker {
    window: usize,
    averages: HashMap<String, UploadAverage>,
}

impl UploadAverageTracker {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            averages: HashMap::new(),
        }
    }

    pub fn record(&mut self, download_id: &str, rate_bps: u64) {
        let window = self.window;
        self.averages
            .entry(download_id.to_string())
            .or_insert_with(|| UploadAverage::new(window))
            .add_sample(rate_bps);
    }

    pub fn average(&self, download_id: &str) -> u64 {
        self.averages
            .get(download_id)
            .map(UploadAverage::average)
            .unwrap_or(0)
    }

    pub fn remove(&mut self, download_id: &str) {
        self.averages.remove(download_id);
    }
}
