use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::assignment::{self, WeightMatrix};
use crate::matrix::{ProbabilityMatrix, build_probability_matrix};
use crate::stats::{HandicapDiff, TeamRoster};

/// What the host asked for. `Auto` means exact when compiled in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverPreference {
    #[default]
    Auto,
    Exact,
    Greedy,
}

impl FromStr for SolverPreference {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(Self::Auto),
            "exact" | "hungarian" => Ok(Self::Exact),
            "greedy" => Ok(Self::Greedy),
            other => Err(anyhow::anyhow!("unknown solver {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverStrategy {
    Exact,
    Greedy,
}

impl SolverStrategy {
    pub const fn exact_available() -> bool {
        cfg!(feature = "exact-solver")
    }

    /// Startup capability check.
    pub fn detect(preference: SolverPreference) -> Self {
        let chosen = match preference {
            SolverPreference::Greedy => Self::Greedy,
            SolverPreference::Auto if Self::exact_available() => Self::Exact,
            SolverPreference::Auto => Self::Greedy,
            SolverPreference::Exact if Self::exact_available() => Self::Exact,
            SolverPreference::Exact => {
                warn!("exact assignment solver not compiled in; using greedy lineup heuristic");
                Self::Greedy
            }
        };
        debug!(?preference, strategy = ?chosen, "lineup solver selected");
        chosen
    }
}

impl fmt::Display for SolverStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => f.write_str("exact"),
            Self::Greedy => f.write_str("greedy (approximate)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pairing {
    pub our_player: String,
    pub their_player: String,
    pub win_probability: f64,
    pub our_handicap: i32,
    pub their_handicap: i32,
    pub differential: HandicapDiff,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineupAssignment {
    pub pairings: Vec<Pairing>,
    /// Mean of the chosen pairing probabilities, 0 when nothing was assigned.
    pub expected_win_probability: f64,
    /// The solver that actually produced the pairings.
    pub strategy: SolverStrategy,
}

impl LineupAssignment {
    pub fn empty(strategy: SolverStrategy) -> Self {
        Self {
            pairings: Vec::new(),
            expected_win_probability: 0.0,
            strategy,
        }
    }

    fn from_pairings(pairings: Vec<Pairing>, strategy: SolverStrategy) -> Self {
        if pairings.is_empty() {
            return Self::empty(strategy);
        }
        let total: f64 = pairings.iter().map(|p| p.win_probability).sum();
        Self {
            expected_win_probability: total / pairings.len() as f64,
            pairings,
            strategy,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairings.is_empty()
    }

    pub fn total_win_probability(&self) -> f64 {
        self.pairings.iter().map(|p| p.win_probability).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineupOptimizer {
    strategy: SolverStrategy,
}

impl Default for LineupOptimizer {
    fn default() -> Self {
        Self::new(SolverStrategy::detect(SolverPreference::Auto))
    }
}

impl LineupOptimizer {
    pub fn new(strategy: SolverStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> SolverStrategy {
        self.strategy
    }

    /// Pair our players one-to-one with the opponent side to maximize expected wins.
    ///
    /// The opponent side is `opponent_subset` when given, otherwise every opponent in the
    /// matrix. Our players without a single computed matchup against that side are never
    /// assigned. Pairs the solver picks without a computed matchup are dropped.
    pub fn optimal_lineup(
        &self,
        matrix: &ProbabilityMatrix,
        opponent_subset: Option<&[String]>,
    ) -> LineupAssignment {
        self.optimal_lineup_among(matrix, None, opponent_subset)
    }

    /// Like [`optimal_lineup`](Self::optimal_lineup), restricted to the players we have
    /// available tonight. `None` means the whole roster.
    pub fn optimal_lineup_among(
        &self,
        matrix: &ProbabilityMatrix,
        our_available: Option<&[String]>,
        opponent_subset: Option<&[String]>,
    ) -> LineupAssignment {
        let opponents = match opponent_subset {
            Some(names) => dedup_keep_order(names),
            None => matrix.opponents(),
        };
        let ours: Vec<String> = our_side(matrix, our_available)
            .into_iter()
            .filter(|p| matrix.has_any_against(p, &opponents))
            .collect();

        if ours.is_empty() || opponents.is_empty() {
            debug!("no valid matchups; lineup is empty");
            return LineupAssignment::empty(self.strategy);
        }

        let weights = weights_for(matrix, &ours, &opponents);
        let (pairs, used) = self.solve(&weights);

        let pairings = pairs
            .into_iter()
            .filter_map(|(i, j)| {
                let our = &ours[i];
                let their = &opponents[j];
                matrix.get(our, their).map(|m| Pairing {
                    our_player: our.clone(),
                    their_player: their.clone(),
                    win_probability: m.win_probability,
                    our_handicap: m.our_handicap,
                    their_handicap: m.their_handicap,
                    differential: m.differential,
                })
            })
            .collect();

        LineupAssignment::from_pairings(pairings, used)
    }

    /// Who we put up when we have to choose before seeing their player.
    ///
    /// Picks the available player with the best mean probability against everyone they may
    /// still send; pairs without a computed matchup count as a coin flip. Ties go to the
    /// first name in `our_available` (roster order when `None`).
    pub fn blind_pick(
        &self,
        matrix: &ProbabilityMatrix,
        our_available: Option<&[String]>,
        their_available: &[String],
    ) -> Option<String> {
        let ours = our_side(matrix, our_available);
        if ours.len() <= 1 {
            return ours.into_iter().next();
        }
        let theirs = dedup_keep_order(their_available);
        if theirs.is_empty() {
            return ours.into_iter().next();
        }

        let weights = weights_for(matrix, &ours, &theirs);
        let mut best: Option<(usize, f64)> = None;
        for i in 0..weights.rows() {
            let mean = (0..weights.cols())
                .map(|j| weights.weight_or_default(i, j))
                .sum::<f64>()
                / weights.cols() as f64;
            if best.is_none_or(|(_, score)| mean > score) {
                best = Some((i, mean));
            }
        }
        let (idx, score) = best?;
        debug!(player = %ours[idx], score, "blind pick");
        Some(ours[idx].clone())
    }

    /// Who we answer `revealed` with, keeping the rest of the night in mind.
    ///
    /// The revealed player is solved together with everyone else they may still send, and our
    /// player assigned to `revealed` is returned. When no one else remains, or the solver
    /// leaves `revealed` unassigned, the best direct matchup wins.
    pub fn best_response(
        &self,
        matrix: &ProbabilityMatrix,
        revealed: &str,
        our_available: Option<&[String]>,
        their_available: &[String],
    ) -> Option<String> {
        let ours = our_side(matrix, our_available);
        if ours.len() <= 1 {
            return ours.into_iter().next();
        }

        let mut columns = vec![revealed.to_string()];
        columns.extend(
            dedup_keep_order(their_available)
                .into_iter()
                .filter(|name| name != revealed),
        );
        let weights = weights_for(matrix, &ours, &columns);

        if columns.len() > 1 {
            let (pairs, used) = self.solve(&weights);
            if let Some(&(i, _)) = pairs.iter().find(|&&(_, j)| j == 0) {
                debug!(player = %ours[i], %revealed, strategy = %used, "best response");
                return Some(ours[i].clone());
            }
            debug!(%revealed, "solver left the revealed player open; using best direct matchup");
        }

        let mut best: Option<(usize, f64)> = None;
        for i in 0..weights.rows() {
            let p = weights.weight_or_default(i, 0);
            if best.is_none_or(|(_, score)| p > score) {
                best = Some((i, p));
            }
        }
        best.map(|(i, _)| ours[i].clone())
    }

    fn solve(&self, weights: &WeightMatrix) -> (Vec<(usize, usize)>, SolverStrategy) {
        match self.strategy {
            SolverStrategy::Exact => match exact_pairs(weights) {
                Some(pairs) => (pairs, SolverStrategy::Exact),
                None => {
                    warn!("exact assignment solver unavailable; falling back to greedy lineup");
                    (assignment::greedy_assignment(weights), SolverStrategy::Greedy)
                }
            },
            SolverStrategy::Greedy => (
                assignment::greedy_assignment(weights),
                SolverStrategy::Greedy,
            ),
        }
    }
}

/// Whether the home side names its player first for `game` (1 to 4).
///
/// The coin-flip winner answers in games 1 and 4 and goes first in games 2 and 3; the loser
/// gets the opposite schedule.
pub fn is_home_selecting_blind(game: u8, won_coin_flip: bool) -> bool {
    matches!((won_coin_flip, game), (true, 2 | 3) | (false, 1 | 4))
}

/// Our players to consider: the available list when given, otherwise every row. Names
/// without a row in the matrix are skipped.
fn our_side(matrix: &ProbabilityMatrix, our_available: Option<&[String]>) -> Vec<String> {
    match our_available {
        Some(names) => dedup_keep_order(names)
            .into_iter()
            .filter(|name| matrix.row(name).is_some())
            .collect(),
        None => matrix.our_players().map(str::to_string).collect(),
    }
}

fn weights_for(matrix: &ProbabilityMatrix, ours: &[String], theirs: &[String]) -> WeightMatrix {
    let mut weights = WeightMatrix::new(ours.len(), theirs.len());
    for (i, our) in ours.iter().enumerate() {
        for (j, their) in theirs.iter().enumerate() {
            weights.set(i, j, matrix.get(our, their).map(|m| m.win_probability));
        }
    }
    weights
}

#[cfg(feature = "exact-solver")]
fn exact_pairs(weights: &WeightMatrix) -> Option<Vec<(usize, usize)>> {
    Some(assignment::max_weight_assignment(weights))
}

#[cfg(not(feature = "exact-solver"))]
fn exact_pairs(_weights: &WeightMatrix) -> Option<Vec<(usize, usize)>> {
    None
}

fn dedup_keep_order(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .filter(|n| seen.insert(n.as_str()))
        .cloned()
        .collect()
}

/// Build the matrix for two rosters and solve it with the default solver.
pub fn optimal_lineup(
    our: &TeamRoster,
    their: &TeamRoster,
    opponent_subset: Option<&[String]>,
) -> LineupAssignment {
    let matrix = build_probability_matrix(our, their);
    LineupOptimizer::default().optimal_lineup(&matrix, opponent_subset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::win_prob::Matchup;

    fn matrix_from(rows: &[(&str, Vec<(&str, f64)>)]) -> ProbabilityMatrix {
        let mut m = ProbabilityMatrix::default();
        for (our, cells) in rows {
            m.ensure_row(*our);
            for (their, p) in cells {
                m.insert(
                    *our,
                    *their,
                    Matchup {
                        win_probability: *p,
                        our_handicap: 5,
                        their_handicap: 5,
                        differential: HandicapDiff(0),
                    },
                );
            }
        }
        m
    }

    #[test]
    fn parses_solver_preferences() {
        assert_eq!("EXACT".parse::<SolverPreference>().unwrap(), SolverPreference::Exact);
        assert_eq!(" greedy ".parse::<SolverPreference>().unwrap(), SolverPreference::Greedy);
        assert_eq!("".parse::<SolverPreference>().unwrap(), SolverPreference::Auto);
        assert!("simplex".parse::<SolverPreference>().is_err());
    }

    #[test]
    fn greedy_preference_is_always_honored() {
        assert_eq!(SolverStrategy::detect(SolverPreference::Greedy), SolverStrategy::Greedy);
    }

    #[test]
    fn players_without_matchups_are_filtered_out() {
        let m = matrix_from(&[("A", vec![("X", 0.7)]), ("B", vec![])]);
        let lineup = LineupOptimizer::new(SolverStrategy::Greedy).optimal_lineup(&m, None);
        assert_eq!(lineup.pairings.len(), 1);
        assert_eq!(lineup.pairings[0].our_player, "A");
        assert!((lineup.expected_win_probability - 0.7).abs() < 1e-12);
    }

    #[test]
    fn subset_duplicates_are_ignored() {
        let m = matrix_from(&[("A", vec![("X", 0.7), ("Y", 0.4)]), ("B", vec![("X", 0.6), ("Y", 0.5)])]);
        let subset = vec!["X".to_string(), "X".to_string()];
        let lineup = LineupOptimizer::new(SolverStrategy::Greedy).optimal_lineup(&m, Some(&subset));
        assert_eq!(lineup.pairings.len(), 1);
        assert_eq!(lineup.pairings[0].their_player, "X");
    }

    #[test]
    fn unknown_subset_yields_empty_lineup() {
        let m = matrix_from(&[("A", vec![("X", 0.7)])]);
        let subset = vec!["Nobody".to_string()];
        for strategy in [SolverStrategy::Exact, SolverStrategy::Greedy] {
            let lineup = LineupOptimizer::new(strategy).optimal_lineup(&m, Some(&subset));
            assert!(lineup.is_empty());
            assert_eq!(lineup.expected_win_probability, 0.0);
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn home_blind_schedule_follows_coin_flip() {
        let won: Vec<bool> = (1..=4).map(|g| is_home_selecting_blind(g, true)).collect();
        let lost: Vec<bool> = (1..=4).map(|g| is_home_selecting_blind(g, false)).collect();
        assert_eq!(won, vec![false, true, true, false]);
        assert_eq!(lost, vec![true, false, false, true]);
        assert!(!is_home_selecting_blind(0, true));
        assert!(!is_home_selecting_blind(5, false));
    }

    #[test]
    fn availability_limits_our_side() {
        let m = matrix_from(&[
            ("A", vec![("X", 0.9), ("Y", 0.6)]),
            ("B", vec![("X", 0.5), ("Y", 0.4)]),
            ("C", vec![("X", 0.8), ("Y", 0.3)]),
        ]);
        let available = names(&["C", "Zed", "B", "C"]);
        for strategy in [SolverStrategy::Exact, SolverStrategy::Greedy] {
            let lineup =
                LineupOptimizer::new(strategy).optimal_lineup_among(&m, Some(&available), None);
            assert_eq!(lineup.pairings.len(), 2);
            assert!(lineup.pairings.iter().all(|p| p.our_player != "A"));
            let c = lineup.pairings.iter().find(|p| p.our_player == "C").unwrap();
            assert_eq!(c.their_player, "X");
        }

        let nobody = LineupOptimizer::new(SolverStrategy::Greedy).optimal_lineup_among(
            &m,
            Some(&names(&["Zed"])),
            None,
        );
        assert!(nobody.is_empty());
    }

    #[test]
    fn blind_pick_takes_best_average() {
        let m = matrix_from(&[
            ("A", vec![("X", 0.9), ("Y", 0.2)]),
            ("B", vec![("X", 0.6), ("Y", 0.6)]),
            ("C", vec![("X", 0.7)]),
        ]);
        let optimizer = LineupOptimizer::new(SolverStrategy::Greedy);
        let theirs = names(&["X", "Y"]);

        assert_eq!(optimizer.blind_pick(&m, None, &theirs).as_deref(), Some("B"));
        // C has no matchup against Y, which counts as 0.5: mean 0.6, tied with B.
        let ours = names(&["C", "A", "B"]);
        assert_eq!(optimizer.blind_pick(&m, Some(&ours), &theirs).as_deref(), Some("C"));
        assert_eq!(optimizer.blind_pick(&m, Some(&names(&["A"])), &theirs).as_deref(), Some("A"));
        assert_eq!(optimizer.blind_pick(&m, Some(&ours), &[]).as_deref(), Some("C"));
        assert_eq!(optimizer.blind_pick(&m, Some(&names(&["Zed"])), &theirs), None);
    }

    #[test]
    fn best_response_on_the_last_game_is_the_best_direct_matchup() {
        let m = matrix_from(&[
            ("A", vec![("X", 0.9), ("Y", 0.85)]),
            ("B", vec![("X", 0.7), ("Y", 0.3)]),
        ]);
        for strategy in [SolverStrategy::Exact, SolverStrategy::Greedy] {
            let optimizer = LineupOptimizer::new(strategy);
            let pick = optimizer.best_response(&m, "X", None, &names(&["X"]));
            assert_eq!(pick.as_deref(), Some("A"));
            let pick = optimizer.best_response(&m, "X", None, &[]);
            assert_eq!(pick.as_deref(), Some("A"));
            let only = optimizer.best_response(&m, "X", Some(&names(&["B"])), &names(&["X", "Y"]));
            assert_eq!(only.as_deref(), Some("B"));
        }
    }

    #[test]
    fn best_response_falls_back_when_revealed_is_left_open() {
        // Two of us, three of them: both solvers spend A and B on Y and Z.
        let m = matrix_from(&[
            ("A", vec![("X", 0.2), ("Y", 0.9), ("Z", 0.8)]),
            ("B", vec![("X", 0.3), ("Y", 0.85), ("Z", 0.9)]),
        ]);
        for strategy in [SolverStrategy::Exact, SolverStrategy::Greedy] {
            let pick = LineupOptimizer::new(strategy).best_response(
                &m,
                "X",
                None,
                &names(&["X", "Y", "Z"]),
            );
            assert_eq!(pick.as_deref(), Some("B"));
        }
    }

    #[cfg(feature = "exact-solver")]
    #[test]
    fn best_response_saves_the_strong_player_for_later() {
        // A is best against X directly, but A-Y plus B-X wins more games overall.
        let m = matrix_from(&[
            ("A", vec![("X", 0.9), ("Y", 0.85)]),
            ("B", vec![("X", 0.7), ("Y", 0.3)]),
        ]);
        let theirs = names(&["X", "Y"]);
        let exact = LineupOptimizer::new(SolverStrategy::Exact).best_response(&m, "X", None, &theirs);
        assert_eq!(exact.as_deref(), Some("B"));
        let greedy =
            LineupOptimizer::new(SolverStrategy::Greedy).best_response(&m, "X", None, &theirs);
        assert_eq!(greedy.as_deref(), Some("A"));
    }

    #[cfg(feature = "exact-solver")]
    #[test]
    fn exact_drops_pairs_without_a_computed_matchup() {
        // B only has data against Y, but A is better on Y and nothing is known for B vs X.
        let m = matrix_from(&[("A", vec![("X", 0.2), ("Y", 0.9)]), ("B", vec![("Y", 0.3)])]);
        let lineup = LineupOptimizer::new(SolverStrategy::Exact).optimal_lineup(&m, None);
        // Solver picks A-Y (0.9) + B-X (0.5 default); B-X has no matchup and is dropped.
        assert_eq!(lineup.pairings.len(), 1);
        assert_eq!(lineup.pairings[0].our_player, "A");
        assert_eq!(lineup.pairings[0].their_player, "Y");
        assert_eq!(lineup.strategy, SolverStrategy::Exact);
    }

    #[cfg(not(feature = "exact-solver"))]
    #[test]
    fn exact_request_without_solver_falls_back() {
        let m = matrix_from(&[("A", vec![("X", 0.7)])]);
        let lineup = LineupOptimizer::new(SolverStrategy::Exact).optimal_lineup(&m, None);
        assert_eq!(lineup.strategy, SolverStrategy::Greedy);
        assert_eq!(lineup.pairings.len(), 1);
    }
}
