// SPDX-FileCopyrightText: 2025 The superseedr Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! The narrow slice of the torrent host this crate reads from and commands.
//!
//! Everything here is implemented by the host. Reads are expected to be cheap,
//! in-memory lookups; nothing is cached on this side between calls.

use crate::errors::HostError;

use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    Waiting,
    Preparing,
    Ready,
    Downloading,
    Seeding,
    Stopping,
    Stopped,
    Error,
    Queued,
}

/// Boolean attributes persisted by the host on our behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadFlag {
    Enabled,
    ContinueWhenComplete,
}

impl DownloadFlag {
    pub fn key(self) -> &'static str {
        match self {
            DownloadFlag::Enabled => "enabled",
            DownloadFlag::ContinueWhenComplete => "continue_when_complete",
        }
    }
}

pub trait Download: Send + Sync {
    /// Stable identity, e.g. the hex info hash.
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    /// False while metadata is still being fetched.
    fn has_torrent(&self) -> bool;
    fn piece_count(&self) -> usize;
    fn state(&self) -> DownloadState;
    fn is_checking(&self) -> bool;
    fn flag(&self, flag: DownloadFlag) -> bool;
    fn set_flag(&self, flag: DownloadFlag, value: bool);
    fn stop(&self) -> Result<(), HostError>;
    fn set_max_upload_slots(&self, slots: u32) -> Result<(), HostError>;
    /// Current upload rate in bytes per second.
    fn upload_rate(&self) -> u64;
    fn peer_session(&self) -> Option<Arc<dyn PeerSession>>;
}

/// Point-in-time view of one connected peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSnapshot {
    pub id: String,
    /// We are choking the peer.
    pub am_choking: bool,
    /// The peer is choking us.
    pub peer_choking: bool,
    pub total_received: u64,
    pub is_seed: bool,
    /// `None` until the peer has sent its bitfield.
    pub bitfield: Option<Vec<bool>>,
}

impl PeerSnapshot {
    pub fn has_piece(&self, piece_index: usize) -> bool {
        self.bitfield
            .as_ref()
            .and_then(|bits| bits.get(piece_index).copied())
            .unwrap_or(false)
    }

    /// A peer with a known bitfield that does not hold the piece yet.
    pub fn lacks_piece(&self, piece_index: usize) -> bool {
        self.bitfield
            .as_ref()
            .is_some_and(|bits| !bits.get(piece_index).copied().unwrap_or(false))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PieceInfo {
    pub done: bool,
    pub needed: bool,
    /// Already being fetched by a request the host started.
    pub in_flight: bool,
}

pub trait PeerSession: Send + Sync {
    fn peers(&self) -> Result<Vec<PeerSnapshot>, HostError>;
    fn connected_seeds(&self) -> Result<usize, HostError>;
    fn remove_peer(&self, peer_id: &str) -> Result<(), HostError>;
    /// Number of peers holding each piece.
    fn availability(&self) -> Result<Vec<u32>, HostError>;
    fn pieces(&self) -> Result<Vec<PieceInfo>, HostError>;
    fn secs_since_last_data_sent(&self) -> Result<u64, HostError>;
}

pub trait DownloadRegistry: Send + Sync {
    fn downloads(&self) -> Vec<Arc<dyn Download>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(bitfield: Option<Vec<bool>>) -> PeerSnapshot {
        PeerSnapshot {
            id: "peer".to_string(),
            am_choking: true,
            peer_choking: true,
            total_received: 0,
            is_seed: false,
            bitfield,
        }
    }

    #[test]
    fn test_piece_membership() {
        let p = peer(Some(vec![true, false]));
        assert!(p.has_piece(0));
        assert!(!p.has_piece(1));
        assert!(p.lacks_piece(1));
        assert!(!p.lacks_piece(0));
        // Out of range counts as not held.
        assert!(p.lacks_piece(7));
    }

    #[test]
    fn test_unknown_bitfield_is_neither_held_nor_lacking() {
        let p = peer(None);
        assert!(!p.has_piece(0));
        assert!(!p.lacks_piece(0));
    }
}
