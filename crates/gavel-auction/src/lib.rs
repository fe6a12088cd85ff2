//! # gavel-auction
//!
//! Repeated sealed-bid auction simulation for gavel agents.
//!
//! This crate provides:
//!
//! - Simulation configuration loaded from TOML
//! - A seeded market-state generator
//! - First-price round resolution with lowest-index tie-breaking
//! - The sequential simulation loop with cancellation between rounds
//! - Run summaries and a text trend chart

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod market;
pub mod round;
pub mod simulation;
pub mod summary;
pub mod visualize;

pub use config::{MarketConfig, NegotiationSettings, PricePolicy, SimulationConfig};
pub use error::SimulationError;
pub use market::MarketGenerator;
pub use round::{Submission, resolve_round, resolve_winner};
pub use simulation::{AuctionSimulation, EstimateSample, SAMPLE_STATES, derive_seed};
pub use summary::{AgentSummary, RosterEntry, RunReport, SimulationSummary, summarize, trend_slope};
pub use visualize::{TrendVisualizer, render_trends};
