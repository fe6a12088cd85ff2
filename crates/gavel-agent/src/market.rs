//! Market snapshots and bids.
//!
//! A [`MarketState`] is the immutable view of one auction round that every
//! participant sees. A [`Bid`] is what a participant hands back for that
//! round, either a valid amount or a flagged non-bid.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of features a [`MarketState`] exposes to an estimator.
pub const STATE_FEATURES: usize = 2;

/// Snapshot of the market for a single round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    /// Current price level of the item on auction.
    pub price: f64,
    /// Rounds left in the run, including the current one.
    pub remaining: f64,
}

impl MarketState {
    /// Creates a new market snapshot.
    #[must_use]
    pub const fn new(price: f64, remaining: f64) -> Self {
        Self { price, remaining }
    }

    /// Returns the feature vector `[price, remaining]`.
    #[must_use]
    pub const fn features(&self) -> [f64; STATE_FEATURES] {
        [self.price, self.remaining]
    }

    /// Returns true if both components are finite and non-negative.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.features().iter().all(|v| v.is_finite() && *v >= 0.0)
    }

    /// Short free-text description, used as the advisory prompt body.
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "Sealed-bid first-price auction. Current price level: {:.2}. Rounds remaining: {}.",
            self.price, self.remaining
        )
    }
}

/// Why a bid was not counted as a valid bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidBid {
    /// The computed bid was NaN or infinite.
    NonFinite,
    /// The computed bid was below zero.
    Negative,
    /// The bid was exactly zero.
    Zero,
    /// A negotiation ended without agreement.
    NoDeal,
    /// The agent has no budget left.
    BudgetExhausted,
}

impl fmt::Display for InvalidBid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NonFinite => "non-finite bid",
            Self::Negative => "negative bid",
            Self::Zero => "zero bid",
            Self::NoDeal => "negotiation ended without a deal",
            Self::BudgetExhausted => "budget exhausted",
        };
        f.write_str(reason)
    }
}

/// A bid for one round.
///
/// The amount is always finite and non-negative. Invalid amounts are clamped
/// to zero and carry the reason in `rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    /// Bid amount.
    pub amount: f64,
    /// Reason the bid does not count, if any.
    pub rejected: Option<InvalidBid>,
}

impl Bid {
    /// Validates a raw amount.
    ///
    /// Non-finite, negative and zero amounts become a non-bid of amount zero.
    #[must_use]
    pub fn checked(amount: f64) -> Self {
        if !amount.is_finite() {
            Self::non_bid(InvalidBid::NonFinite)
        } else if amount < 0.0 {
            Self::non_bid(InvalidBid::Negative)
        } else if amount == 0.0 {
            Self::non_bid(InvalidBid::Zero)
        } else {
            Self {
                amount,
                rejected: None,
            }
        }
    }

    /// Creates a non-bid with the given reason.
    #[must_use]
    pub const fn non_bid(reason: InvalidBid) -> Self {
        Self {
            amount: 0.0,
            rejected: Some(reason),
        }
    }

    /// Returns true if this bid competes in the round.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.rejected.is_none()
    }
}
