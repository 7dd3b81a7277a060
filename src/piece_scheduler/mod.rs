// SPDX-FileCopyrightText: 2025 The superseedr Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! One-piece-at-a-time download steering.
//!
//! While enabled, the scheduler lets the host fetch a single rare piece, waits
//! for the swarm to pull it from us, and only then moves on. Pieces that sit
//! idle with too few interested peers are abandoned; the idle allowance grows
//! each time it is exceeded and snaps back to the default once uploads resume.

pub mod selector;
pub mod state;

use crate::clock::Clock;
use crate::config::Settings;
use crate::errors::HostError;
use crate::host::PeerSession;

use selector::{count_interested, select_piece};
use state::{PieceSchedulerState, SchedulerPhase};

use rand::rngs::StdRng;
use rand::SeedableRng;

use tracing::{event, Level};

use std::sync::Arc;

/// Priority given to every piece we do not want the host to pick.
pub const PRIORITY_NONE: i64 = i64::MIN;

pub struct PieceSelectionScheduler {
    download_name: String,
    settings: Arc<Settings>,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    priorities: Vec<i64>,
    state: PieceSchedulerState,
}

impl PieceSelectionScheduler {
    pub fn new(
        download_name: impl Into<String>,
        piece_count: usize,
        settings: Arc<Settings>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_rng(
            download_name,
            piece_count,
            settings,
            clock,
            StdRng::seed_from_u64(rand::random()),
        )
    }

    /// Same as [`new`](Self::new) with a caller supplied RNG for the tie-break.
    pub fn with_rng(
        download_name: impl Into<String>,
        piece_count: usize,
        settings: Arc<Settings>,
        clock: Arc<dyn Clock>,
        rng: StdRng,
    ) -> Self {
        let state = PieceSchedulerState::new(clock.now_millis(), settings.up_idle_limit_secs_default);
        Self {
            download_name: download_name.into(),
            settings,
            clock,
            rng,
            priorities: vec![PRIORITY_NONE; piece_count],
            state,
        }
    }

    pub fn state(&self) -> &PieceSchedulerState {
        &self.state
    }

    /// Called by the host whenever it recomputes piece priorities.
    ///
    /// Returns `None` to leave the host's own priorities alone, otherwise one
    /// priority per piece with at most one entry above [`PRIORITY_NONE`].
    pub fn update_priorities(&mut self, enabled: bool, session: &dyn PeerSession) -> Option<Vec<i64>> {
        if !enabled {
            if self.state.phase != SchedulerPhase::Disabled {
                event!(Level::DEBUG, download = %self.download_name, "Piece steering disabled.");
                self.state.phase = SchedulerPhase::Disabled;
                self.priorities.fill(PRIORITY_NONE);
            }
            return None;
        }
        if self.state.phase == SchedulerPhase::Disabled {
            self.state.phase = SchedulerPhase::NoPieceSelected;
        }

        if let Err(e) = self.step(session) {
            event!(Level::DEBUG, download = %self.download_name, error = %e, "Skipping piece selection tick.");
        }
        Some(self.priorities.clone())
    }

    fn step(&mut self, session: &dyn PeerSession) -> Result<(), HostError> {
        let pieces = session.pieces()?;
        let now = self.clock.now_millis();

        match self.state.phase {
            SchedulerPhase::PieceInFlight { piece } => {
                let done = pieces
                    .get(piece as usize)
                    .ok_or(HostError::PieceOutOfRange(piece))?
                    .done;
                if done {
                    event!(Level::INFO, download = %self.download_name, piece, "Piece ready for upload.");
                    self.state.phase = SchedulerPhase::PieceDoneAwaitingUploadWindow {
                        piece,
                        done_at_ms: now,
                    };
                }
            }
            SchedulerPhase::PieceDoneAwaitingUploadWindow { piece, done_at_ms } => {
                let min_wait_ms = self.settings.min_piece_wait().as_millis() as u64;
                if done_at_ms > now || now - done_at_ms >= min_wait_ms {
                    self.reconsider_piece(piece, session)?;
                }
            }
            SchedulerPhase::Disabled | SchedulerPhase::NoPieceSelected => {}
        }

        if self.state.phase == SchedulerPhase::NoPieceSelected {
            self.priorities.fill(PRIORITY_NONE);
            self.priorities.resize(pieces.len(), PRIORITY_NONE);

            let initial_delay_ms = self.settings.initial_delay().as_millis() as u64;
            if let Some(elapsed) = now.checked_sub(self.state.started_at_ms) {
                if elapsed < initial_delay_ms {
                    return Ok(());
                }
            }

            let availability = session.availability()?;
            let peers = session.peers()?;
            if let Some(choice) = select_piece(
                &availability,
                &pieces,
                &peers,
                self.settings.min_interested_peers,
                &mut self.rng,
            ) {
                self.priorities[choice.piece as usize] = self.settings.selected_piece_priority;
                self.state.phase = SchedulerPhase::PieceInFlight {
                    piece: choice.piece,
                };
                event!(
                    Level::INFO,
                    download = %self.download_name,
                    piece = choice.piece,
                    availability = choice.availability,
                    unchoked = choice.unchoked,
                    "Selecting new piece."
                );
            }
        }
        Ok(())
    }

    /// Grows or resets the idle allowance and abandons the piece when the swarm
    /// has stopped pulling it and too few peers still want it.
    fn reconsider_piece(&mut self, piece: u32, session: &dyn PeerSession) -> Result<(), HostError> {
        let default_max = self.settings.up_idle_limit_secs_default;
        let up_idle_secs = session.secs_since_last_data_sent()?;

        if up_idle_secs > self.state.idle_secs_max {
            self.state.idle_secs_max += self.settings.up_idle_limit_secs_inc * 2;
            event!(
                Level::INFO,
                download = %self.download_name,
                idle_secs_max = self.state.idle_secs_max,
                "Increasing idle limit."
            );

            let peers = session.peers()?;
            let num_interested = count_interested(&peers, piece as usize);
            if num_interested < self.settings.min_interested_peers {
                event!(
                    Level::INFO,
                    download = %self.download_name,
                    piece,
                    num_interested,
                    "Abandoning piece, upload too slow and insufficient interested peers."
                );
                self.state.phase = SchedulerPhase::NoPieceSelected;
            }
        } else if up_idle_secs < default_max && self.state.idle_secs_max > default_max {
            self.state.idle_secs_max = default_max;
            event!(
                Level::INFO,
                download = %self.download_name,
                idle_secs_max = default_max,
                "Decreasing idle limit."
            );
        }
        Ok(())
    }
}
