// SPDX-FileCopyrightText: 2025 The superseedr Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

use std::fs;
use std::path::Path;

pub const LOG_FILE_NAME: &str = "upmaxer.log";

/// Installs a file subscriber under `log_dir`. The returned guard must be
/// kept alive for buffered lines to be flushed.
///
/// Returns `None` if the directory cannot be created or a global subscriber
/// is already set; events then go wherever the host routes them.
pub fn init(log_dir: &Path) -> Option<WorkerGuard> {
    if fs::create_dir_all(log_dir).is_err() {
        return None;
    }
    let file = rolling::never(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(LevelFilter::INFO);
    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .ok()
        .map(|_| guard)
}
