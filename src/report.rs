use std::fmt::Write;

use crate::lineup::LineupAssignment;
use crate::matrix::ProbabilityMatrix;
use crate::stats::PerformanceProfile;

fn pct(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}

pub fn render_matchups(matrix: &ProbabilityMatrix) -> String {
    let mut out = String::new();
    for our in matrix.our_players() {
        let ranked = matrix.ranked_opponents(our);
        // Players without any usable matchup are not worth a heading.
        if ranked.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{our} (HCP {})", ranked[0].1.our_handicap);
        for (their, m) in ranked {
            let _ = writeln!(
                out,
                "  vs {their:<24} HCP {:>2}  diff {:>3}  win {:>6}",
                m.their_handicap,
                m.differential.to_string(),
                pct(m.win_probability)
            );
        }
    }
    if out.is_empty() {
        out.push_str("No matchups with handicap data on both sides.\n");
    }
    out
}

pub fn render_lineup(lineup: &LineupAssignment) -> String {
    let mut out = String::new();
    if lineup.is_empty() {
        out.push_str("No valid matchups found. Insufficient data.\n");
        return out;
    }
    let _ = writeln!(out, "Optimal lineup ({}):", lineup.strategy);
    for (idx, p) in lineup.pairings.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>2}. {} ({}) vs {} ({})  diff {}  win {}",
            idx + 1,
            p.our_player,
            p.our_handicap,
            p.their_player,
            p.their_handicap,
            p.differential,
            pct(p.win_probability)
        );
    }
    let _ = writeln!(
        out,
        "Expected win probability: {}",
        pct(lineup.expected_win_probability)
    );
    out
}

pub fn render_profile(profile: &PerformanceProfile) -> String {
    let mut out = String::new();
    let hcp = profile
        .handicap
        .map(|h| h.to_string())
        .unwrap_or_else(|| "n/a".to_string());
    let _ = writeln!(out, "{} (HCP {hcp})", profile.player);
    let _ = writeln!(
        out,
        "Overall: {} ({} of {} games)",
        pct(profile.overall_win_rate),
        profile.total_games_won,
        profile.total_games
    );
    if profile.points.is_empty() {
        out.push_str("No handicap differential data.\n");
        return out;
    }
    for pt in &profile.points {
        let _ = writeln!(
            out,
            "  diff {:>3}  win {:>6}  ({} games)",
            pt.differential.to_string(),
            pct(pt.win_rate),
            pt.games
        );
    }
    out
}
