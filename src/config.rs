use std::path::PathBuf;

use crate::lineup::SolverPreference;
use crate::win_prob::ModelParams;

const DEFAULT_DATA_FILE: &str = "data/pool_stats.json";

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    pub data_file: PathBuf,
    pub solver: SolverPreference,
    pub model: ModelParams,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            solver: SolverPreference::Auto,
            model: ModelParams::default(),
        }
    }
}

impl AnalyzerConfig {
    /// `POOL_STATS_FILE`, `LINEUP_SOLVER`, `MODEL_DAMPING`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(path) = lookup("POOL_STATS_FILE")
            && !path.trim().is_empty()
        {
            cfg.data_file = PathBuf::from(path.trim());
        }

        cfg.solver = lookup("LINEUP_SOLVER")
            .and_then(|val| val.parse::<SolverPreference>().ok())
            .unwrap_or_default();

        if let Some(damping) = lookup("MODEL_DAMPING").and_then(|val| parse_damping(&val)) {
            cfg.model.damping = damping;
        }

        cfg
    }
}

pub fn parse_damping(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && (0.0..=1.0).contains(d))
}
