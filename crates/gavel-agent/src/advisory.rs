//! LLM advisory boundary.
//!
//! An [`Advisor`] is an untrusted, possibly slow external service that
//! suggests a multiplicative adjustment to a locally computed bid. Agents
//! consult it with a hard timeout, parse the reply defensively, clamp the
//! suggestion, and fall back to the local bid on any failure. A
//! [`CircuitBreaker`] stops an agent from waiting on an advisor that keeps
//! failing.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::market::MarketState;

/// Errors from an advisory call. All of them are recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdvisoryError {
    /// The call did not finish within the deadline.
    #[error("advisory call timed out after {0:?}")]
    Timeout(Duration),
    /// The service failed or could not be reached.
    #[error("advisory service unavailable: {0}")]
    Unavailable(String),
    /// The reply did not contain a usable suggestion.
    #[error("malformed advisory reply: {0}")]
    Malformed(String),
}

/// A request sent to the advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryRequest {
    /// Name of the asking agent.
    pub agent: String,
    /// Free-text description of the market and the local bid.
    pub prompt: String,
}

impl AdvisoryRequest {
    /// Build the prompt for a given state and local bid.
    #[must_use]
    pub fn for_bid(agent: &str, state: &MarketState, local_bid: f64, config: &AdvisoryConfig) -> Self {
        let prompt = format!(
            "{} My current bid is {:.2}. Reply with a single multiplier between {} and {} \
             to apply to this bid.",
            state.describe(),
            local_bid,
            config.min_factor,
            config.max_factor
        );
        Self {
            agent: agent.to_string(),
            prompt,
        }
    }
}

/// A parsed and clamped suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    /// Multiplicative bid factor, already clamped.
    pub factor: f64,
}

/// External advisory service.
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Ask for a suggestion. Returns the raw reply text.
    async fn advise(&self, request: &AdvisoryRequest) -> Result<String, AdvisoryError>;
}

/// Advisory settings for an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    /// Weight of the advised bid in the blend (0 ignores the advisor).
    pub weight: f64,
    /// Deadline for a single call in milliseconds.
    pub timeout_ms: u64,
    /// Smallest factor accepted from the advisor.
    pub min_factor: f64,
    /// Largest factor accepted from the advisor.
    pub max_factor: f64,
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,
    /// Decisions to skip the advisor once the breaker is open.
    pub cooldown_rounds: u32,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            weight: 0.5,
            timeout_ms: 2_000,
            min_factor: 0.8,
            max_factor: 1.2,
            failure_threshold: 3,
            cooldown_rounds: 10,
        }
    }
}

impl AdvisoryConfig {
    /// Call deadline.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.weight) {
            return Err("advisory weight must be within [0, 1]".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("advisory timeout_ms must be positive".to_string());
        }
        if !(self.min_factor.is_finite()
            && self.max_factor.is_finite()
            && self.min_factor > 0.0
            && self.min_factor <= self.max_factor)
        {
            return Err("advisory factors must satisfy 0 < min_factor <= max_factor".to_string());
        }
        Ok(())
    }
}

/// Extract the first number in a reply and clamp it to the configured range.
pub fn parse_advice(reply: &str, config: &AdvisoryConfig) -> Result<Advice, AdvisoryError> {
    let factor = reply
        .split(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .map(|token| token.trim_end_matches('.'))
        .filter(|token| !token.is_empty())
        .find_map(|token| token.parse::<f64>().ok().filter(|v| v.is_finite()))
        .ok_or_else(|| AdvisoryError::Malformed(truncate(reply, 80)))?;

    Ok(Advice {
        factor: factor.clamp(config.min_factor, config.max_factor),
    })
}

/// Blend the local bid with the advised one.
#[must_use]
pub fn blend(local: f64, advice: Advice, weight: f64) -> f64 {
    let weight = weight.clamp(0.0, 1.0);
    (1.0 - weight).mul_add(local, weight * local * advice.factor)
}

/// Call the advisor with a deadline and parse the reply.
pub async fn consult(
    advisor: &dyn Advisor,
    request: &AdvisoryRequest,
    config: &AdvisoryConfig,
) -> Result<Advice, AdvisoryError> {
    let deadline = config.timeout();
    let reply = tokio::time::timeout(deadline, advisor.advise(request))
        .await
        .map_err(|_| AdvisoryError::Timeout(deadline))??;
    debug!(agent = %request.agent, reply = %truncate(&reply, 80), "advisory reply");
    parse_advice(&reply, config)
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Stops consulting a failing advisor for a while.
///
/// Closed until `threshold` consecutive failures, then open for `cooldown`
/// decisions. After the cooldown the breaker is half-open: one trial call is
/// allowed, a success closes it and a failure reopens it at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: u32,
    consecutive_failures: u32,
    open_for: u32,
    half_open: bool,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    #[must_use]
    pub const fn new(threshold: u32, cooldown: u32) -> Self {
        Self {
            threshold,
            cooldown,
            consecutive_failures: 0,
            open_for: 0,
            half_open: false,
        }
    }

    /// Creates a breaker from advisory settings.
    #[must_use]
    pub const fn from_config(config: &AdvisoryConfig) -> Self {
        Self::new(config.failure_threshold, config.cooldown_rounds)
    }

    /// Returns whether a call may be made now. Consumes one cooldown step when open.
    pub fn allow(&mut self) -> bool {
        if self.open_for > 0 {
            self.open_for -= 1;
            if self.open_for == 0 {
                self.half_open = true;
            }
            false
        } else {
            true
        }
    }

    /// Record a successful call.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.half_open = false;
    }

    /// Record a failed call.
    pub fn record_failure(&mut self) {
        if self.half_open {
            self.trip();
            return;
        }
        self.consecutive_failures += 1;
        if self.threshold > 0 && self.consecutive_failures >= self.threshold {
            self.trip();
        }
    }

    fn trip(&mut self) {
        self.open_for = self.cooldown;
        self.consecutive_failures = 0;
        self.half_open = self.cooldown == 0;
    }

    /// Returns true while calls are being skipped.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open_for > 0
    }

    /// Returns true when the next call is a trial after a cooldown.
    #[must_use]
    pub const fn is_half_open(&self) -> bool {
        self.half_open
    }
}
