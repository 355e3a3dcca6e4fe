use serde::{Deserialize, Serialize};

use crate::stats::{HandicapDiff, PlayerRecord};

const OPPONENT_DAMPING: f64 = 0.4;
const PROB_FLOOR: f64 = 0.1;
const PROB_CEILING: f64 = 0.9;
const NEUTRAL_PROB: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// How far the opponent's overall win rate shifts the estimate.
    pub damping: f64,
    pub floor: f64,
    pub ceiling: f64,
    /// Used whenever there is nothing to go on.
    pub neutral: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            damping: OPPONENT_DAMPING,
            floor: PROB_FLOOR,
            ceiling: PROB_CEILING,
            neutral: NEUTRAL_PROB,
        }
    }
}

/// A computed pairing between one of our players and one of theirs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    pub win_probability: f64,
    pub our_handicap: i32,
    pub their_handicap: i32,
    pub differential: HandicapDiff,
}

pub fn handicap_differential(our: &PlayerRecord, their: &PlayerRecord) -> Option<HandicapDiff> {
    HandicapDiff::between(our.handicap?, their.handicap?)
}

pub fn estimate_win_probability(our: &PlayerRecord, their: &PlayerRecord) -> f64 {
    estimate_win_probability_with(our, their, &ModelParams::default())
}

/// Probability that `our` beats `their`, always within `[floor, ceiling]`.
///
/// Without a handicap on both sides there is no usable matchup and the neutral value is returned.
/// The same holds for handicaps so far apart that their difference does not fit an `i32`.
pub fn estimate_win_probability_with(
    our: &PlayerRecord,
    their: &PlayerRecord,
    params: &ModelParams,
) -> f64 {
    match matchup(our, their, params) {
        Some(m) => m.win_probability,
        None => clamp(params.neutral, params.floor, params.ceiling),
    }
}

pub fn matchup(our: &PlayerRecord, their: &PlayerRecord, params: &ModelParams) -> Option<Matchup> {
    let our_handicap = our.handicap?;
    let their_handicap = their.handicap?;
    let differential = HandicapDiff::between(our_handicap, their_handicap)?;

    let base = base_probability_with(our, differential, params.neutral);
    let opp_rate = their.overall().win_rate().unwrap_or(params.neutral);
    let adjustment = (opp_rate - NEUTRAL_PROB) * params.damping;

    Some(Matchup {
        win_probability: clamp(base - adjustment, params.floor, params.ceiling),
        our_handicap,
        their_handicap,
        differential,
    })
}

/// Observed win rate at exactly `diff`, else the overall rate, else a coin flip.
pub fn base_probability(record: &PlayerRecord, diff: HandicapDiff) -> f64 {
    base_probability_with(record, diff, NEUTRAL_PROB)
}

fn base_probability_with(record: &PlayerRecord, diff: HandicapDiff, neutral: f64) -> f64 {
    record
        .tally_at(diff)
        .and_then(|t| t.win_rate())
        .or_else(|| record.overall().win_rate())
        .unwrap_or(neutral)
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}
