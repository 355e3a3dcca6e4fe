use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::warn;

use crate::stats::{LeagueSnapshot, TeamRoster};
use crate::win_prob::{self, Matchup, ModelParams};

/// Win probabilities of every one of our players against every one of theirs.
///
/// Pairs where either handicap is unknown are left out. Every player on our roster still gets a
/// row so callers can tell "no usable matchups" apart from "not on the roster".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProbabilityMatrix {
    rows: BTreeMap<String, BTreeMap<String, Matchup>>,
}

impl ProbabilityMatrix {
    pub fn get(&self, our: &str, their: &str) -> Option<&Matchup> {
        self.rows.get(our).and_then(|row| row.get(their))
    }

    pub fn row(&self, our: &str) -> Option<&BTreeMap<String, Matchup>> {
        self.rows.get(our)
    }

    pub fn our_players(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Every opponent that appears in at least one row, sorted by name.
    pub fn opponents(&self) -> Vec<String> {
        let set: BTreeSet<&String> = self.rows.values().flat_map(|row| row.keys()).collect();
        set.into_iter().cloned().collect()
    }

    pub fn has_any_against(&self, our: &str, opponents: &[String]) -> bool {
        self.rows
            .get(our)
            .is_some_and(|row| opponents.iter().any(|o| row.contains_key(o)))
    }

    /// Opponents for `our`, best odds first.
    pub fn ranked_opponents(&self, our: &str) -> Vec<(&str, &Matchup)> {
        let Some(row) = self.rows.get(our) else {
            return Vec::new();
        };
        let mut out: Vec<(&str, &Matchup)> = row.iter().map(|(k, v)| (k.as_str(), v)).collect();
        out.sort_by(|a, b| {
            b.1.win_probability
                .total_cmp(&a.1.win_probability)
                .then_with(|| a.0.cmp(b.0))
        });
        out
    }

    /// Number of computed pairs.
    pub fn len(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert(&mut self, our: impl Into<String>, their: impl Into<String>, matchup: Matchup) {
        self.rows
            .entry(our.into())
            .or_default()
            .insert(their.into(), matchup);
    }

    pub fn ensure_row(&mut self, our: impl Into<String>) {
        self.rows.entry(our.into()).or_default();
    }
}

pub fn build_probability_matrix(our: &TeamRoster, their: &TeamRoster) -> ProbabilityMatrix {
    build_probability_matrix_with(our, their, &ModelParams::default())
}

pub fn build_probability_matrix_with(
    our: &TeamRoster,
    their: &TeamRoster,
    params: &ModelParams,
) -> ProbabilityMatrix {
    let mut matrix = ProbabilityMatrix::default();
    for (our_name, our_player) in &our.players {
        matrix.ensure_row(our_name.clone());
        for (their_name, their_player) in &their.players {
            if let Some(m) = win_prob::matchup(our_player, their_player, params) {
                matrix.insert(our_name.clone(), their_name.clone(), m);
            }
        }
    }
    matrix
}

/// Resolve both team names and build their matrix.
pub fn analyze_matchup(
    snapshot: &LeagueSnapshot,
    our_team: &str,
    their_team: &str,
    params: &ModelParams,
) -> Option<ProbabilityMatrix> {
    let our = snapshot.find_team(our_team);
    let their = snapshot.find_team(their_team);
    match (our, their) {
        (Some(our), Some(their)) => Some(build_probability_matrix_with(our, their, params)),
        _ => {
            let missing: Vec<&str> = [(our.is_none(), our_team), (their.is_none(), their_team)]
                .into_iter()
                .filter(|(absent, _)| *absent)
                .map(|(_, name)| name)
                .collect();
            warn!(teams = ?missing, "could not find team(s)");
            None
        }
    }
}
