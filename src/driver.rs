// SPDX-FileCopyrightText: 2025 The superseedr Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::plugin::UploadMaximizer;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{event, Level};

use std::sync::Arc;
use std::time::Duration;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Drives [`UploadMaximizer::on_timer_tick`] once per second until `shutdown`
/// flips to true or its sender is dropped.
pub async fn run_timer(maximizer: Arc<UploadMaximizer>, mut shutdown: watch::Receiver<bool>) {
    let mut tick = tokio::time::interval(TICK_PERIOD);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    event!(Level::DEBUG, "Upload maximizer timer started.");
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = tick.tick() => {
                maximizer.on_timer_tick();
            }
        }
    }
    event!(Level::DEBUG, "Upload maximizer timer stopped.");
}
