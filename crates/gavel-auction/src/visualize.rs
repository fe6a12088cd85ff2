//! Text rendering of bidding trends.

use std::io::Write;

use gavel_agent::RoundOutcome;

use crate::error::SimulationError;

const LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const NO_BID: char = '·';

/// Optional capability: render how bids evolved over a run.
pub trait TrendVisualizer {
    /// Write the chart to `out`.
    fn visualize_bidding_trends(&self, out: &mut dyn Write) -> Result<(), SimulationError>;
}

/// Render one sparkline row per participant plus a clearing-price row, then
/// a win table.
///
/// Bars are scaled between the smallest and largest valid bid of the run;
/// `·` marks rounds where the participant did not place a valid bid.
pub fn render_trends(
    history: &[RoundOutcome],
    names: &[&str],
    out: &mut dyn Write,
) -> Result<(), SimulationError> {
    if history.is_empty() {
        writeln!(out, "No rounds played.")?;
        return Ok(());
    }

    let (low, high) = history
        .iter()
        .flat_map(|o| o.entries.iter())
        .filter(|e| e.bid.is_valid())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), e| {
            (lo.min(e.bid.amount), hi.max(e.bid.amount))
        });

    let label_width = names
        .iter()
        .map(|n| n.chars().count())
        .chain(std::iter::once("clearing".len()))
        .max()
        .unwrap_or(8);

    writeln!(out, "Bidding trends over {} rounds", history.len())?;
    if low.is_finite() {
        writeln!(out, "scale: {low:.2} .. {high:.2}")?;
    }
    writeln!(out)?;

    for name in names {
        let line: String = history
            .iter()
            .map(|outcome| match outcome.entry_for(name) {
                Some(entry) if entry.bid.is_valid() => bar(entry.bid.amount, low, high),
                _ => NO_BID,
            })
            .collect();
        writeln!(out, "{name:<label_width$} |{line}|")?;
    }

    let clearing: String = history
        .iter()
        .map(|outcome| {
            if outcome.winner.is_some() {
                bar(outcome.clearing_price, low, high)
            } else {
                NO_BID
            }
        })
        .collect();
    writeln!(out, "{:<label_width$} |{clearing}|", "clearing")?;

    writeln!(out)?;
    writeln!(out, "{:<label_width$}  {:>5}  {:>6}", "agent", "wins", "share")?;
    for name in names {
        let wins = history.iter().filter(|o| o.is_winner(name)).count();
        let share = wins as f64 / history.len() as f64 * 100.0;
        writeln!(out, "{name:<label_width$}  {wins:>5}  {share:>5.1}%")?;
    }

    Ok(())
}

fn bar(value: f64, low: f64, high: f64) -> char {
    let span = high - low;
    let level = if span > 0.0 {
        ((value - low) / span * (LEVELS.len() - 1) as f64).round() as usize
    } else {
        LEVELS.len() - 1
    };
    LEVELS[level.min(LEVELS.len() - 1)]
}
