//! Immutable per-round auction records.

use serde::{Deserialize, Serialize};

use crate::market::{Bid, MarketState};

/// How a round was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// A winner was found.
    Resolved,
    /// Every bid was invalid; nobody won and nobody was rewarded.
    NoValidBidders,
}

/// One participant's line in a round outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidEntry {
    /// Insertion index of the participant.
    pub index: usize,
    /// Participant name.
    pub agent: String,
    /// The bid as submitted (after validation).
    pub bid: Bid,
    /// Reward assigned for the round.
    pub reward: f64,
}

/// Record of one auction round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// Zero-based round index.
    pub round: u32,
    /// Market snapshot the round was played on.
    pub state: MarketState,
    /// One entry per participant, in insertion order.
    pub entries: Vec<BidEntry>,
    /// Index of the winner, if any.
    pub winner: Option<usize>,
    /// Price paid by the winner, zero when nobody won.
    pub clearing_price: f64,
    /// Resolution status.
    pub status: RoundStatus,
}

impl RoundOutcome {
    /// Returns the entry for a participant by name.
    #[must_use]
    pub fn entry_for(&self, agent: &str) -> Option<&BidEntry> {
        self.entries.iter().find(|e| e.agent == agent)
    }

    /// Returns the winning entry.
    #[must_use]
    pub fn winner_entry(&self) -> Option<&BidEntry> {
        self.winner.and_then(|w| self.entries.get(w))
    }

    /// Returns true if the named participant won the round.
    #[must_use]
    pub fn is_winner(&self, agent: &str) -> bool {
        self.winner_entry().is_some_and(|e| e.agent == agent)
    }

    /// Number of valid bids in the round.
    #[must_use]
    pub fn valid_bids(&self) -> usize {
        self.entries.iter().filter(|e| e.bid.is_valid()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::InvalidBid;

    fn outcome() -> RoundOutcome {
        RoundOutcome {
            round: 3,
            state: MarketState::new(100.0, 7.0),
            entries: vec![
                BidEntry {
                    index: 0,
                    agent: "Agent 1".into(),
                    bid: Bid::checked(95.0),
                    reward: 0.0,
                },
                BidEntry {
                    index: 1,
                    agent: "Agent 2".into(),
                    bid: Bid::checked(110.0),
                    reward: 5.0,
                },
                BidEntry {
                    index: 2,
                    agent: "Agent 3".into(),
                    bid: Bid::non_bid(InvalidBid::Zero),
                    reward: 0.0,
                },
            ],
            winner: Some(1),
            clearing_price: 110.0,
            status: RoundStatus::Resolved,
        }
    }

    #[test]
    fn lookup_by_name() {
        let outcome = outcome();
        assert_eq!(outcome.entry_for("Agent 3").unwrap().index, 2);
        assert!(outcome.entry_for("Agent 9").is_none());
    }

    #[test]
    fn winner_lookup() {
        let outcome = outcome();
        assert!(outcome.is_winner("Agent 2"));
        assert!(!outcome.is_winner("Agent 1"));
        assert_eq!(outcome.winner_entry().unwrap().reward, 5.0);
        assert_eq!(outcome.valid_bids(), 2);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&RoundStatus::NoValidBidders).unwrap();
        assert_eq!(json, "\"no_valid_bidders\"");
    }
}
