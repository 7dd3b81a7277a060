// SPDX-FileCopyrightText: 2025 The superseedr Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SchedulerPhase {
    Disabled,
    NoPieceSelected,
    PieceInFlight { piece: u32 },
    /// The piece is complete locally; we wait for the swarm to pull it from us.
    PieceDoneAwaitingUploadWindow { piece: u32, done_at_ms: u64 },
}

#[derive(Debug, Clone)]
pub struct PieceSchedulerState {
    pub phase: SchedulerPhase,
    pub idle_secs_max: u64,
    pub started_at_ms: u64,
}

impl PieceSchedulerState {
    pub fn new(started_at_ms: u64, idle_secs_default: u64) -> Self {
        Self {
            phase: SchedulerPhase::NoPieceSelected,
            idle_secs_max: idle_secs_default,
            started_at_ms,
        }
    }

    pub fn current_piece(&self) -> Option<u32> {
        match self.phase {
            SchedulerPhase::PieceInFlight { piece }
            | SchedulerPhase::PieceDoneAwaitingUploadWindow { piece, .. } => Some(piece),
            SchedulerPhase::Disabled | SchedulerPhase::NoPieceSelected => None,
        }
    }

    pub fn piece_done_at_ms(&self) -> Option<u64> {
        match self.phase {
            SchedulerPhase::PieceDoneAwaitingUploadWindow { done_at_ms, .. } => Some(done_at_ms),
            _ => None,
        }
    }
}
