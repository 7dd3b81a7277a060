// SPDX-FileCopyrightText: 2025 The superseedr Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::host::{PeerSnapshot, PieceInfo};

use rand::seq::IndexedRandom;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceChoice {
    pub piece: u32,
    pub availability: u32,
    /// Some peer in the swarm was unchoking us when the piece was picked.
    pub unchoked: bool,
}

/// Peers with a known bitfield that do not hold `piece_index` yet.
pub fn count_interested(peers: &[PeerSnapshot], piece_index: usize) -> usize {
    peers.iter().filter(|p| p.lacks_piece(piece_index)).count()
}

/// Picks the next piece to fetch, or `None` when nothing qualifies.
///
/// Rarest-first over the pieces we still need, restricted to the rarest tier,
/// then to pieces at least `min_interested` peers would want from us. Ties
/// are broken with `rng`.
///
/// The unchoked preference looks at the whole swarm, not at the holders of
/// each piece, so it either admits every survivor or none of them and never
/// narrows the tier.
pub fn select_piece<R: Rng + ?Sized>(
    availability: &[u32],
    pieces: &[PieceInfo],
    peers: &[PeerSnapshot],
    min_interested: usize,
    rng: &mut R,
) -> Option<PieceChoice> {
    let candidates: Vec<usize> = availability
        .iter()
        .zip(pieces)
        .enumerate()
        .filter(|(_, (avail, info))| **avail > 0 && info.needed && !info.done && !info.in_flight)
        .map(|(i, _)| i)
        .collect();

    let min_avail = candidates.iter().map(|&i| availability[i]).min()?;

    let survivors: Vec<usize> = candidates
        .into_iter()
        .filter(|&i| availability[i] == min_avail)
        .filter(|&i| count_interested(peers, i) >= min_interested)
        .collect();

    let unchoked = peers.iter().any(|p| !p.peer_choking);

    survivors.choose(rng).map(|&i| PieceChoice {
        piece: i as u32,
        availability: min_avail,
        unchoked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::peer;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn needed(count: usize) -> Vec<PieceInfo> {
        vec![
            PieceInfo {
                done: false,
                needed: true,
                in_flight: false,
            };
            count
        ]
    }

    /// `holders` peers hold every piece in `held`; `others` hold nothing.
    fn swarm(num_pieces: usize, holders: &[&[usize]], others: usize) -> Vec<PeerSnapshot> {
        let mut peers = Vec::new();
        for (n, held) in holders.iter().enumerate() {
            let mut bits = vec![false; num_pieces];
            for &i in held.iter() {
                bits[i] = true;
            }
            peers.push(peer(&format!("holder{n}"), bits));
        }
        for n in 0..others {
            peers.push(peer(&format!("other{n}"), vec![false; num_pieces]));
        }
        peers
    }

    #[test]
    fn test_picks_rarest_piece() {
        let mut rng = StdRng::seed_from_u64(7);
        let availability = vec![3, 1, 2];
        let peers = swarm(3, &[&[0, 1, 2], &[0, 2], &[0]], 4);

        let choice = select_piece(&availability, &needed(3), &peers, 3, &mut rng);
        assert_eq!(
            choice,
            Some(PieceChoice {
                piece: 1,
                availability: 1,
                unchoked: false
            })
        );
    }

    #[test]
    fn test_skips_unavailable_done_unneeded_and_in_flight() {
        let mut rng = StdRng::seed_from_u64(7);
        let availability = vec![0, 1, 1, 1, 2];
        let mut pieces = needed(5);
        pieces[1].done = true;
        pieces[2].needed = false;
        pieces[3].in_flight = true;
        let peers = swarm(5, &[&[1, 2, 3, 4], &[4]], 5);

        let choice = select_piece(&availability, &pieces, &peers, 3, &mut rng);
        assert_eq!(choice.map(|c| c.piece), Some(4));
    }

    #[test]
    fn test_interest_filter_applies_to_rarest_tier_only() {
        let mut rng = StdRng::seed_from_u64(7);
        // Piece 0 is rarest but only two peers lack it.
        let availability = vec![1, 2];
        let peers = swarm(2, &[&[0, 1], &[1]], 1);
        assert_eq!(count_interested(&peers, 0), 2);

        let choice = select_piece(&availability, &needed(2), &peers, 3, &mut rng);
        assert_eq!(choice, None);
    }

    #[test]
    fn test_exactly_min_interested_is_enough() {
        let mut rng = StdRng::seed_from_u64(1);
        let availability = vec![1];
        let peers = swarm(1, &[&[0]], 3);

        let choice = select_piece(&availability, &needed(1), &peers, 3, &mut rng);
        assert_eq!(choice.map(|c| c.piece), Some(0));
    }

    #[test]
    fn test_unchoking_holder_does_not_narrow_rarest_tier() {
        let availability = vec![1, 1];
        let mut peers = swarm(2, &[&[0], &[1]], 3);
        // The holder of piece 0 is sending to us, the holder of piece 1 is not.
        peers[0].peer_choking = false;

        let mut seen = std::collections::HashSet::new();
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let choice = select_piece(&availability, &needed(2), &peers, 3, &mut rng).unwrap();
            assert!(choice.unchoked);
            seen.insert(choice.piece);
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_falls_back_to_choked_pool_and_spreads_choices() {
        let availability = vec![1, 1, 1, 1];
        let peers = swarm(4, &[&[0], &[1], &[2], &[3]], 4);

        let mut seen = std::collections::HashSet::new();
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let choice = select_piece(&availability, &needed(4), &peers, 3, &mut rng).unwrap();
            assert!(!choice.unchoked);
            seen.insert(choice.piece);
        }
        // Random tie-break, not first match.
        assert!(seen.len() > 1);
    }

    #[test]
    fn test_same_seed_same_choice() {
        let availability = vec![1, 1, 1, 1];
        let peers = swarm(4, &[&[0], &[1], &[2], &[3]], 4);
        let a = select_piece(
            &availability,
            &needed(4),
            &peers,
            3,
            &mut StdRng::seed_from_u64(42),
        );
        let b = select_piece(
            &availability,
            &needed(4),
            &peers,
            3,
            &mut StdRng::seed_from_u64(42),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_inputs() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(select_piece(&[], &[], &[], 3, &mut rng), None);
    }
}
