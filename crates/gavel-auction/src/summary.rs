//! Run summaries computed from the round history.

use chrono::{DateTime, Utc};
use gavel_agent::{ParticipantKind, RoundOutcome, RoundStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a participant, as listed in a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Participant name.
    pub name: String,
    /// Participant kind.
    pub kind: ParticipantKind,
    /// Whether the advisory was enabled.
    pub ai_enabled: bool,
}

/// Per-participant results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    /// Participant name.
    pub name: String,
    /// Participant kind.
    pub kind: ParticipantKind,
    /// Whether the advisory was enabled.
    pub ai_enabled: bool,
    /// Rounds won.
    pub wins: u32,
    /// Sum of clearing prices paid.
    pub total_spend: f64,
    /// Valid bids placed.
    pub valid_bids: u32,
    /// Rounds ending in a non-bid.
    pub non_bids: u32,
    /// Mean of the valid bids, if any.
    pub average_bid: Option<f64>,
    /// Sum of rewards.
    pub total_reward: f64,
    /// Least-squares slope of the reward sequence.
    pub reward_trend: f64,
}

/// Whole-run results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    /// Rounds in the history.
    pub rounds: u32,
    /// Rounds with a winner.
    pub resolved_rounds: u32,
    /// Rounds where every bid was invalid.
    pub rounds_without_winner: u32,
    /// Mean of every valid bid in the run.
    pub average_bid: Option<f64>,
    /// Mean clearing price over resolved rounds.
    pub average_clearing_price: Option<f64>,
    /// Per-participant results, in insertion order.
    pub agents: Vec<AgentSummary>,
}

/// Summary plus run metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique identifier of the run.
    pub run_id: Uuid,
    /// Run seed.
    pub seed: u64,
    /// When the first round started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the last configured round finished.
    pub finished_at: Option<DateTime<Utc>>,
    /// Results.
    pub summary: SimulationSummary,
}

/// Summarise a round history. Pure; the history is not modified.
#[must_use]
pub fn summarize(history: &[RoundOutcome], roster: &[RosterEntry]) -> SimulationSummary {
    let resolved: Vec<&RoundOutcome> = history
        .iter()
        .filter(|o| o.status == RoundStatus::Resolved)
        .collect();

    let all_valid_bids: Vec<f64> = history
        .iter()
        .flat_map(|o| o.entries.iter())
        .filter(|e| e.bid.is_valid())
        .map(|e| e.bid.amount)
        .collect();

    let clearing_prices: Vec<f64> = resolved.iter().map(|o| o.clearing_price).collect();

    let agents = roster
        .iter()
        .map(|member| summarize_agent(history, member))
        .collect();

    SimulationSummary {
        rounds: history.len() as u32,
        resolved_rounds: resolved.len() as u32,
        rounds_without_winner: (history.len() - resolved.len()) as u32,
        average_bid: mean(&all_valid_bids),
        average_clearing_price: mean(&clearing_prices),
        agents,
    }
}

fn summarize_agent(history: &[RoundOutcome], member: &RosterEntry) -> AgentSummary {
    let mut wins = 0;
    let mut total_spend = 0.0;
    let mut bids = Vec::new();
    let mut non_bids = 0;
    let mut rewards = Vec::with_capacity(history.len());

    for outcome in history {
        let Some(entry) = outcome.entry_for(&member.name) else {
            continue;
        };
        rewards.push(entry.reward);
        if entry.bid.is_valid() {
            bids.push(entry.bid.amount);
        } else {
            non_bids += 1;
        }
        if outcome.is_winner(&member.name) {
            wins += 1;
            total_spend += outcome.clearing_price;
        }
    }

    AgentSummary {
        name: member.name.clone(),
        kind: member.kind,
        ai_enabled: member.ai_enabled,
        wins,
        total_spend,
        valid_bids: bids.len() as u32,
        non_bids,
        average_bid: mean(&bids),
        total_reward: rewards.iter().sum(),
        reward_trend: trend_slope(&rewards),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Least-squares slope of `values` against their index. Zero for fewer
/// than two points.
#[must_use]
pub fn trend_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n_f;

    let (num, den) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - mean_x;
            (dx.mul_add(y - mean_y, num), dx.mul_add(dx, den))
        });

    if den > 0.0 { num / den } else { 0.0 }
}
