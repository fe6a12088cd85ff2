//! # gavel-agent
//!
//! Learning participants for repeated sealed-bid auctions.
//!
//! This crate provides:
//!
//! - **Market model** — [`MarketState`], [`Bid`] and the [`InvalidBid`] non-bid reasons
//! - **Bid estimator** — [`BidEstimator`], a small online regressor over the market state
//! - **Participants** — the [`Participant`] capability set, implemented by
//!   [`BiddingAgent`] and [`NegotiationAgent`]
//! - **Negotiation** — [`run_exchange`] between a [`Negotiator`] and a [`SellerDesk`]
//! - **Advisory** — the [`Advisor`] boundary, [`OpenAiAdvisor`], deadlines and a circuit breaker
//!
//! ## Example
//!
//! ```rust
//! use gavel_agent::{AgentConfig, BiddingAgent, MarketState, Participant};
//!
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! let mut agent = BiddingAgent::new("Agent 1", false, &AgentConfig::default(), 7);
//! let bid = rt.block_on(agent.decide_bid(&MarketState::new(100.0, 10.0)));
//! assert!(bid.is_valid());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod advisory;
pub mod bidder;
pub mod error;
pub mod estimator;
pub mod market;
pub mod negotiation;
pub mod openai;
pub mod outcome;
pub mod participant;
pub mod reward;
pub mod strategy;

pub use error::AgentError;

// Re-exports for convenience
pub use advisory::{Advice, AdvisoryConfig, AdvisoryError, AdvisoryRequest, Advisor, CircuitBreaker};
pub use bidder::BiddingAgent;
pub use estimator::{BidEstimator, EstimatorConfig, EstimatorError};
pub use market::{Bid, InvalidBid, MarketState, STATE_FEATURES};
pub use negotiation::{Exchange, NegotiationAgent, NegotiationParty, NegotiationPhase, Negotiator};
pub use negotiation::{NegotiatorConfig, Offer, Party, Response, SellerDesk, SellerTerms, run_exchange};
pub use openai::OpenAiAdvisor;
pub use outcome::{BidEntry, RoundOutcome, RoundStatus};
pub use participant::{AgentConfig, AgentPhase, AgentStats, LearnStatus, Participant, ParticipantKind};
pub use reward::{REWARD_BOUND, RewardPolicy, bound_reward};
pub use strategy::ExplorationPolicy;
