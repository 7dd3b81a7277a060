// SPDX-FileCopyrightText: 2025 The superseedr Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Download has no active peer session.")]
    NoPeerSession,

    #[error("Peer {0} is no longer connected.")]
    PeerGone(String),

    #[error("Piece {0} is out of range for this download.")]
    PieceOutOfRange(u32),

    #[error("Host command failed: {0}")]
    CommandFailed(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings")]
    Parse(#[from] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum GeoIpError {
    #[error("Failed to read location database")]
    Io(#[from] std::io::Error),

    #[error("Invalid location database entry on line {line}")]
    InvalidEntry { line: usize },
}
