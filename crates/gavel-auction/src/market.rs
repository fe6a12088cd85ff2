//! Seeded market-state generator.

use gavel_agent::MarketState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{MarketConfig, PricePolicy};

/// Produces the market state for each round of a run.
///
/// Draws come from a dedicated seeded stream, so the price path depends only
/// on the market seed and never on what participants do.
#[derive(Debug, Clone)]
pub struct MarketGenerator {
    config: MarketConfig,
    rounds: u32,
    rng: StdRng,
    last_price: Option<f64>,
}

impl MarketGenerator {
    /// Creates a generator for a run of `rounds` rounds.
    #[must_use]
    pub fn new(config: MarketConfig, rounds: u32, seed: u64) -> Self {
        Self {
            config,
            rounds,
            rng: StdRng::seed_from_u64(seed),
            last_price: None,
        }
    }

    /// State for the next round. Must be called once per round, in order.
    pub fn next_state(&mut self, round: u32) -> MarketState {
        let price = match self.config.policy {
            PricePolicy::Fixed { price } => price,
            PricePolicy::Uniform { low, high } => {
                if high > low {
                    self.rng.gen_range(low..=high)
                } else {
                    low
                }
            }
            PricePolicy::RandomWalk { start, volatility } => match self.last_price {
                None => start,
                Some(last) => {
                    let step = if volatility > 0.0 {
                        self.rng.gen_range(-volatility..=volatility)
                    } else {
                        0.0
                    };
                    last * (1.0 + step)
                }
            },
        };
        let price = if price.is_finite() {
            price.max(self.config.floor)
        } else {
            self.config.floor
        };
        self.last_price = Some(price);

        MarketState::new(price, f64::from(self.rounds.saturating_sub(round)))
    }
}
