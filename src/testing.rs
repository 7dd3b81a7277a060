// SPDX-FileCopyrightText: 2025 The superseedr Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! In-memory host used by the unit tests.

use crate::errors::HostError;
use crate::host::{
    Download, DownloadFlag, DownloadRegistry, DownloadState, PeerSession, PeerSnapshot, PieceInfo,
};

use parking_lot::Mutex;

use std::collections::HashMap;
use std::sync::Arc;

pub fn peer(id: &str, bitfield: Vec<bool>) -> PeerSnapshot {
    PeerSnapshot {
        id: id.to_string(),
        am_choking: true,
        peer_choking: true,
        total_received: 0,
        is_seed: bitfield.iter().all(|&b| b),
        bitfield: Some(bitfield),
    }
}

pub fn seed(id: &str, peer_choking: bool, total_received: u64) -> PeerSnapshot {
    PeerSnapshot {
        id: id.to_string(),
        am_choking: true,
        peer_choking,
        total_received,
        is_seed: true,
        bitfield: None,
    }
}

#[derive(Default)]
pub struct FakeSession {
    pub peers: Mutex<Vec<PeerSnapshot>>,
    pub availability: Mutex<Vec<u32>>,
    pub pieces: Mutex<Vec<PieceInfo>>,
    pub idle_secs: Mutex<u64>,
    pub removed: Mutex<Vec<String>>,
    pub fail_removals: Mutex<bool>,
    pub fail_queries: Mutex<bool>,
}

impl FakeSession {
    pub fn with_pieces(count: usize) -> Self {
        let session = Self::default();
        *session.pieces.lock() = vec![
            PieceInfo {
                done: false,
                needed: true,
                in_flight: false,
            };
            count
        ];
        *session.availability.lock() = vec![0; count];
        session
    }

    pub fn set_peers(&self, peers: Vec<PeerSnapshot>) {
        *self.peers.lock() = peers;
    }

    /// Recomputes availability from the peers' bitfields.
    pub fn recount_availability(&self) {
        let peers = self.peers.lock();
        let mut availability = self.availability.lock();
        for (i, slot) in availability.iter_mut().enumerate() {
            *slot = peers.iter().filter(|p| p.has_piece(i)).count() as u32;
        }
    }

    pub fn mark_done(&self, piece_index: usize) {
        self.pieces.lock()[piece_index].done = true;
    }

    pub fn set_idle_secs(&self, secs: u64) {
        *self.idle_secs.lock() = secs;
    }

    fn check(&self) -> Result<(), HostError> {
        if *self.fail_queries.lock() {
            Err(HostError::NoPeerSession)
        } else {
            Ok(())
        }
    }
}

impl PeerSession for FakeSession {
    fn peers(&self) -> Result<Vec<PeerSnapshot>, HostError> {
        self.check()?;
        Ok(self.peers.lock().clone())
    }

    fn connected_seeds(&self) -> Result<usize, HostError> {
        self.check()?;
        Ok(self.peers.lock().iter().filter(|p| p.is_seed).count())
    }

    fn remove_peer(&self, peer_id: &str) -> Result<(), HostError> {
        if *self.fail_removals.lock() {
            return Err(HostError::PeerGone(peer_id.to_string()));
        }
        self.peers.lock().retain(|p| p.id != peer_id);
        self.removed.lock().push(peer_id.to_string());
        Ok(())
    }

    fn availability(&self) -> Result<Vec<u32>, HostError> {
        self.check()?;
        Ok(self.availability.lock().clone())
    }

    fn pieces(&self) -> Result<Vec<PieceInfo>, HostError> {
        self.check()?;
        Ok(self.pieces.lock().clone())
    }

    fn secs_since_last_data_sent(&self) -> Result<u64, HostError> {
        self.check()?;
        Ok(*self.idle_secs.lock())
    }
}

pub struct FakeDownload {
    pub id: String,
    pub piece_count: usize,
    pub state: Mutex<DownloadState>,
    pub checking: Mutex<bool>,
    pub flags: Mutex<HashMap<DownloadFlag, bool>>,
    pub upload_rate: Mutex<u64>,
    pub session: Mutex<Option<Arc<FakeSession>>>,
    pub stop_calls: Mutex<usize>,
    pub fail_stop: Mutex<bool>,
    pub max_upload_slots: Mutex<Option<u32>>,
    pub has_torrent: bool,
}

impl FakeDownload {
    pub fn new(id: &str, piece_count: usize) -> Self {
        Self {
            id: id.to_string(),
            piece_count,
            state: Mutex::new(DownloadState::Downloading),
            checking: Mutex::new(false),
            flags: Mutex::new(HashMap::new()),
            upload_rate: Mutex::new(0),
            session: Mutex::new(None),
            stop_calls: Mutex::new(0),
            fail_stop: Mutex::new(false),
            max_upload_slots: Mutex::new(None),
            has_torrent: true,
        }
    }

    pub fn enabled(self) -> Self {
        self.flags.lock().insert(DownloadFlag::Enabled, true);
        self
    }

    pub fn with_session(self, session: Arc<FakeSession>) -> Self {
        *self.session.lock() = Some(session);
        self
    }
}

impl Download for FakeDownload {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn has_torrent(&self) -> bool {
        self.has_torrent
    }

    fn piece_count(&self) -> usize {
        self.piece_count
    }

    fn state(&self) -> DownloadState {
        *self.state.lock()
    }

    fn is_checking(&self) -> bool {
        *self.checking.lock()
    }

    fn flag(&self, flag: DownloadFlag) -> bool {
        self.flags.lock().get(&flag).copied().unwrap_or(false)
    }

    fn set_flag(&self, flag: DownloadFlag, value: bool) {
        self.flags.lock().insert(flag, value);
    }

    fn stop(&self) -> Result<(), HostError> {
        *self.stop_calls.lock() += 1;
        if *self.fail_stop.lock() {
            return Err(HostError::CommandFailed("stop refused".to_string()));
        }
        *self.state.lock() = DownloadState::Stopped;
        Ok(())
    }

    fn set_max_upload_slots(&self, slots: u32) -> Result<(), HostError> {
        *self.max_upload_slots.lock() = Some(slots);
        Ok(())
    }

    fn upload_rate(&self) -> u64 {
        *self.upload_rate.lock()
    }

    fn peer_session(&self) -> Option<Arc<dyn PeerSession>> {
        self.session
            .lock()
            .clone()
            .map(|s| s as Arc<dyn PeerSession>)
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    pub downloads: Mutex<Vec<Arc<FakeDownload>>>,
}

impl DownloadRegistry for FakeRegistry {
    fn downloads(&self) -> Vec<Arc<dyn Download>> {
        self.downloads
            .lock()
            .iter()
            .map(|d| d.clone() as Arc<dyn Download>)
            .collect()
    }
}
