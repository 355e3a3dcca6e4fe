//! Pool league matchup odds and lineup optimization.
//!
//! Feed a [`stats::LeagueSnapshot`] in, get per-pair win probabilities
//! ([`matrix::ProbabilityMatrix`]) and a one-to-one lineup ([`lineup::LineupAssignment`]) out.
//! Nothing here keeps state between calls.

pub mod assignment;
pub mod config;
pub mod lineup;
pub mod matrix;
pub mod report;
pub mod stats;
pub mod win_prob;
