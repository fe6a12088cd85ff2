//! Simulation configuration.
//!
//! Every section has defaults, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! agents = 5
//! rounds = 50
//! seed = 42
//!
//! [market]
//! floor = 1.0
//!
//! [market.policy]
//! kind = "random_walk"
//! start = 100.0
//! volatility = 0.05
//! ```

use std::path::Path;

use gavel_agent::{AgentConfig, NegotiatorConfig, RewardPolicy, SellerTerms};
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

/// How the price level evolves from round to round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricePolicy {
    /// Same price every round.
    Fixed {
        /// The price level.
        price: f64,
    },
    /// Independent uniform draw per round.
    Uniform {
        /// Lower bound (inclusive).
        low: f64,
        /// Upper bound (inclusive).
        high: f64,
    },
    /// Multiplicative random walk.
    RandomWalk {
        /// Price in round 0.
        start: f64,
        /// Largest relative step per round.
        volatility: f64,
    },
}

impl Default for PricePolicy {
    fn default() -> Self {
        Self::RandomWalk {
            start: 100.0,
            volatility: 0.05,
        }
    }
}

/// Market-state generator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Price policy.
    pub policy: PricePolicy,
    /// Prices never fall below this floor.
    pub floor: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            policy: PricePolicy::default(),
            floor: 1.0,
        }
    }
}

impl MarketConfig {
    /// Validate the market settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the floor or any policy parameter is out of range.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.floor) {
            return Err(SimulationError::Config(
                "market floor must be a positive number".to_string(),
            ));
        }
        let ok = match self.policy {
            PricePolicy::Fixed { price } => positive(price),
            PricePolicy::Uniform { low, high } => positive(low) && positive(high) && low <= high,
            PricePolicy::RandomWalk { start, volatility } => {
                positive(start) && (0.0..1.0).contains(&volatility)
            }
        };
        if ok {
            Ok(())
        } else {
            Err(SimulationError::Config(format!(
                "invalid market policy: {:?}",
                self.policy
            )))
        }
    }
}

/// Negotiation settings for negotiating participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationSettings {
    /// Maximum responses per exchange before it fails.
    pub max_responses: u32,
    /// Buyer-side behaviour.
    pub buyer: NegotiatorConfig,
    /// Seller-desk terms.
    pub seller: SellerTerms,
}

impl Default for NegotiationSettings {
    fn default() -> Self {
        Self {
            max_responses: 6,
            buyer: NegotiatorConfig::default(),
            seller: SellerTerms::default(),
        }
    }
}

/// Main simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of bidding agents.
    pub agents: usize,
    /// Number of negotiating agents, added after the bidders.
    pub negotiators: usize,
    /// Rounds to run.
    pub rounds: u32,
    /// Run seed; per-agent and market seeds derive from it.
    pub seed: u64,
    /// Whether bidding agents consult the advisor.
    pub ai_enabled: bool,
    /// Whether the trend visualiser is available after the run.
    pub visualize: bool,
    /// Market-state generator.
    pub market: MarketConfig,
    /// Settings shared by every agent.
    pub agent: AgentConfig,
    /// Reward shaping.
    pub reward: RewardPolicy,
    /// Negotiation settings.
    pub negotiation: NegotiationSettings,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            agents: 5,
            negotiators: 0,
            rounds: 50,
            seed: 42,
            ai_enabled: false,
            visualize: false,
            market: MarketConfig::default(),
            agent: AgentConfig::default(),
            reward: RewardPolicy::default(),
            negotiation: NegotiationSettings::default(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SimulationError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SimulationError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, SimulationError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| SimulationError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.agents + self.negotiators == 0 {
            return Err(SimulationError::Config(
                "at least one agent or negotiator is required".to_string(),
            ));
        }
        if self.rounds == 0 {
            return Err(SimulationError::Config("rounds must be positive".to_string()));
        }

        self.market.validate()?;
        self.agent.validate()?;
        self.reward.validate().map_err(SimulationError::Config)?;
        self.negotiation.buyer.validate()?;
        self.negotiation.seller.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_agent::{AgentError, ExplorationPolicy};

    #[test]
    fn defaults_match_documented_values() {
        let config = SimulationConfig::default();
        assert_eq!(config.agents, 5);
        assert_eq!(config.rounds, 50);
        assert_eq!(config.seed, 42);
        assert_eq!(config.negotiators, 0);
        assert!(!config.visualize);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_toml_is_default() {
        let config = SimulationConfig::from_toml("").unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
agents = 3
negotiators = 2
rounds = 10
seed = 7
visualize = true

[market]
floor = 5.0

[market.policy]
kind = "uniform"
low = 50.0
high = 150.0

[agent]
valuation_factor = 1.25
budget = 500.0

[agent.exploration]
kind = "greedy"

[agent.advisory]
timeout_ms = 500

[reward]
loss_penalty = 1.0

[negotiation]
max_responses = 4

[negotiation.seller]
ask_markup = 1.3
"#;
        let config = SimulationConfig::from_toml(toml).unwrap();
        assert_eq!(config.agents, 3);
        assert_eq!(config.negotiators, 2);
        assert_eq!(config.rounds, 10);
        assert_eq!(config.seed, 7);
        assert!(config.visualize);
        assert_eq!(
            config.market.policy,
            PricePolicy::Uniform {
                low: 50.0,
                high: 150.0
            }
        );
        assert_eq!(config.agent.exploration, ExplorationPolicy::Greedy);
        assert_eq!(config.agent.valuation_factor, Some(1.25));
        assert_eq!(config.agent.advisory.timeout_ms, 500);
        assert_eq!(config.negotiation.max_responses, 4);
        assert!((config.negotiation.seller.ask_markup - 1.3).abs() < f64::EPSILON);
        // Untouched fields keep their defaults.
        assert!((config.negotiation.seller.reserve_ratio - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = SimulationConfig::from_toml("agents = \"many\"").unwrap_err();
        assert!(matches!(err, SimulationError::Config(_)));
    }

    #[test]
    fn no_participants_rejected() {
        let err = SimulationConfig::from_toml("agents = 0").unwrap_err();
        assert!(err.to_string().contains("at least one"));
    }

    #[test]
    fn zero_rounds_rejected() {
        let err = SimulationConfig::from_toml("rounds = 0").unwrap_err();
        assert!(matches!(err, SimulationError::Config(_)));
        assert!(err.to_string().contains("rounds must be positive"));
    }

    #[test]
    fn inverted_uniform_range_rejected() {
        let config = SimulationConfig {
            market: MarketConfig {
                policy: PricePolicy::Uniform {
                    low: 10.0,
                    high: 5.0,
                },
                floor: 1.0,
            },
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn nested_agent_errors_surface() {
        let mut config = SimulationConfig::default();
        config.agent.advisory.weight = 3.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SimulationError::Agent(AgentError::Config(_))));
        assert!(err.to_string().contains("weight"));
    }

    #[test]
    fn negotiation_terms_are_validated() {
        let mut config = SimulationConfig::default();
        config.negotiation.seller.reserve_ratio = 2.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SimulationError::Agent(AgentError::Config(_))));
        assert!(err.to_string().contains("reserve_ratio"));
    }

    #[test]
    fn from_file_missing_path() {
        let err = SimulationConfig::from_file("/nonexistent/gavel.toml").unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
