//! Round resolution: winner selection, clearing price and rewards.

use gavel_agent::{Bid, BidEntry, MarketState, RewardPolicy, RoundOutcome, RoundStatus};

/// One participant's submission for a round.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Participant name.
    pub agent: String,
    /// Validated bid.
    pub bid: Bid,
    /// Participant's private valuation for the round.
    pub valuation: f64,
}

/// Index of the highest valid bid. Ties go to the lowest index.
#[must_use]
pub fn resolve_winner(bids: &[Bid]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, bid) in bids.iter().enumerate() {
        if !bid.is_valid() {
            continue;
        }
        match best {
            Some((_, amount)) if bid.amount <= amount => {}
            _ => best = Some((index, bid.amount)),
        }
    }
    best.map(|(index, _)| index)
}

/// Resolve a round under the first-price rule and assign rewards.
///
/// Submissions must be in participant insertion order.
#[must_use]
pub fn resolve_round(
    round: u32,
    state: MarketState,
    submissions: Vec<Submission>,
    policy: &RewardPolicy,
) -> RoundOutcome {
    let bids: Vec<Bid> = submissions.iter().map(|s| s.bid).collect();
    let winner = resolve_winner(&bids);
    let clearing_price = winner.map_or(0.0, |w| bids[w].amount);

    let entries = submissions
        .into_iter()
        .enumerate()
        .map(|(index, submission)| {
            let reward = match winner {
                None => 0.0,
                Some(w) if w == index => policy.win(submission.valuation, clearing_price),
                Some(_) if submission.bid.is_valid() => policy.loss(),
                Some(_) => policy.no_bid(),
            };
            BidEntry {
                index,
                agent: submission.agent,
                bid: submission.bid,
                reward,
            }
        })
        .collect();

    RoundOutcome {
        round,
        state,
        entries,
        winner,
        clearing_price,
        status: if winner.is_some() {
            RoundStatus::Resolved
        } else {
            RoundStatus::NoValidBidders
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_agent::InvalidBid;
    use proptest::prelude::*;
    use test_case::test_case;

    fn submission(agent: &str, amount: f64, valuation: f64) -> Submission {
        Submission {
            agent: agent.to_string(),
            bid: Bid::checked(amount),
            valuation,
        }
    }

    // ==========================================================================
    // Winner selection
    // ==========================================================================

    #[test_case(&[10.0, 30.0, 20.0], Some(1) ; "highest wins")]
    #[test_case(&[30.0, 30.0, 20.0], Some(0) ; "tie goes to lowest index")]
    #[test_case(&[5.0, 40.0, 40.0], Some(1) ; "tie between later indices")]
    #[test_case(&[0.0, -1.0, f64::NAN], None ; "no valid bids")]
    #[test_case(&[0.0, 3.0, 0.0], Some(1) ; "single valid bid")]
    #[test_case(&[], None ; "empty round")]
    fn winner_selection(amounts: &[f64], expected: Option<usize>) {
        let bids: Vec<Bid> = amounts.iter().map(|a| Bid::checked(*a)).collect();
        assert_eq!(resolve_winner(&bids), expected);
    }

    // ==========================================================================
    // Round resolution
    // ==========================================================================

    #[test]
    fn winner_pays_own_bid_and_earns_surplus() {
        let outcome = resolve_round(
            0,
            MarketState::new(100.0, 5.0),
            vec![
                submission("a", 90.0, 110.0),
                submission("b", 105.0, 120.0),
                submission("c", 0.0, 130.0),
            ],
            &RewardPolicy::default(),
        );

        assert_eq!(outcome.status, RoundStatus::Resolved);
        assert_eq!(outcome.winner, Some(1));
        assert!((outcome.clearing_price - 105.0).abs() < f64::EPSILON);
        assert!((outcome.entries[1].reward - 15.0).abs() < 1e-9);
        assert!(outcome.entries[0].reward.abs() < f64::EPSILON);
        assert!(outcome.entries[2].reward.abs() < f64::EPSILON);
        assert_eq!(outcome.entries[2].bid.rejected, Some(InvalidBid::Zero));
    }

    #[test]
    fn overpaying_winner_gets_negative_reward() {
        let outcome = resolve_round(
            0,
            MarketState::new(100.0, 5.0),
            vec![submission("a", 150.0, 100.0)],
            &RewardPolicy::default(),
        );
        assert!((outcome.entries[0].reward + 50.0).abs() < 1e-9);
    }

    #[test]
    fn losers_pay_configured_penalty() {
        let policy = RewardPolicy { loss_penalty: 2.0 };
        let outcome = resolve_round(
            0,
            MarketState::new(100.0, 5.0),
            vec![submission("a", 90.0, 100.0), submission("b", 95.0, 100.0)],
            &policy,
        );
        assert!((outcome.entries[0].reward + 2.0).abs() < 1e-9);
    }

    #[test]
    fn all_zero_bids_have_no_winner_and_zero_rewards() {
        let outcome = resolve_round(
            4,
            MarketState::new(100.0, 1.0),
            vec![submission("a", 0.0, 100.0), submission("b", 0.0, 100.0)],
            &RewardPolicy { loss_penalty: 5.0 },
        );
        assert_eq!(outcome.status, RoundStatus::NoValidBidders);
        assert_eq!(outcome.winner, None);
        assert!(outcome.clearing_price.abs() < f64::EPSILON);
        assert!(outcome.entries.iter().all(|e| e.reward.abs() < f64::EPSILON));
        assert_eq!(outcome.round, 4);
    }

    proptest! {
        #[test]
        fn winner_holds_maximum_valid_bid(amounts in prop::collection::vec(-10.0f64..100.0, 1..12)) {
            let bids: Vec<Bid> = amounts.iter().map(|a| Bid::checked(*a)).collect();
            match resolve_winner(&bids) {
                Some(w) => {
                    prop_assert!(bids[w].is_valid());
                    for (i, bid) in bids.iter().enumerate() {
                        if bid.is_valid() {
                            prop_assert!(bid.amount <= bids[w].amount);
                            if i < w {
                                prop_assert!(bid.amount < bids[w].amount);
                            }
                        }
                    }
                }
                None => prop_assert!(bids.iter().all(|b| !b.is_valid())),
            }
        }
    }
}
