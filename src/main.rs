use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

use pool_lineup::config::{AnalyzerConfig, parse_damping};
use pool_lineup::lineup::{LineupOptimizer, SolverPreference, SolverStrategy};
use pool_lineup::matrix::analyze_matchup;
use pool_lineup::report::{render_lineup, render_matchups, render_profile};
use pool_lineup::stats::{load_league_snapshot, normalize_player_name, player_profile};

const USAGE: &str = "usage:
  pool_lineup <our team> <opponent team> [--opponents \"A,B,C\"] [--available \"D,E,F\"] [--respond-to NAME] [--solver auto|exact|greedy] [--damping X] [--data PATH]
  pool_lineup --profile <player> [--data PATH]
  pool_lineup --teams [--data PATH]";

#[derive(Debug, Default)]
struct Args {
    positional: Vec<String>,
    data: Option<PathBuf>,
    opponents: Option<Vec<String>>,
    available: Option<Vec<String>>,
    respond_to: Option<String>,
    solver: Option<SolverPreference>,
    damping: Option<f64>,
    profile: Option<String>,
    teams: bool,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1).collect())?;
    let mut cfg = AnalyzerConfig::from_env();
    if let Some(path) = args.data.clone() {
        cfg.data_file = path;
    }
    if let Some(solver) = args.solver {
        cfg.solver = solver;
    }
    if let Some(damping) = args.damping {
        cfg.model.damping = damping;
    }

    let snapshot = load_league_snapshot(&cfg.data_file)?;
    if let Some(date) = snapshot.scraped_date.as_deref() {
        println!("Data scraped on: {date}");
    }

    if args.teams {
        for name in snapshot.team_names() {
            println!("{name}");
        }
        return Ok(());
    }

    if let Some(player) = args.profile.as_deref() {
        let players = snapshot.consolidated_players();
        let record = players
            .get(&normalize_player_name(player))
            .with_context(|| format!("player {player:?} not found"))?;
        print!("{}", render_profile(&player_profile(record)));
        return Ok(());
    }

    let [our_team, their_team] = args.positional.as_slice() else {
        return Err(anyhow!("expected two team names\n{USAGE}"));
    };
    let matrix = analyze_matchup(&snapshot, our_team, their_team, &cfg.model)
        .with_context(|| format!("could not find team(s) {our_team:?} / {their_team:?}"))?;

    print!("{}", render_matchups(&matrix));
    println!();

    let optimizer = LineupOptimizer::new(SolverStrategy::detect(cfg.solver));
    let lineup =
        optimizer.optimal_lineup_among(&matrix, args.available.as_deref(), args.opponents.as_deref());
    print!("{}", render_lineup(&lineup));

    let theirs = args.opponents.clone().unwrap_or_else(|| matrix.opponents());
    let ours = args.available.as_deref();
    if let Some(revealed) = args.respond_to.as_deref() {
        let revealed = normalize_player_name(revealed);
        match optimizer.best_response(&matrix, &revealed, ours, &theirs) {
            Some(pick) => println!("\nBest response to {revealed}: {pick}"),
            None => println!("\nNo available player to answer {revealed}"),
        }
    } else if let Some(pick) = optimizer.blind_pick(&matrix, ours, &theirs) {
        println!("\nBest blind pick: {pick}");
    }

    Ok(())
}

fn parse_args(raw: Vec<String>) -> Result<Args> {
    let mut args = Args::default();
    let mut iter = raw.into_iter();
    while let Some(arg) = iter.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((f, v)) if f.starts_with("--") => (f.to_string(), Some(v.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| -> Result<String> {
            inline
                .clone()
                .or_else(|| iter.next())
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{name} needs a value\n{USAGE}"))
        };
        match flag.as_str() {
            "--data" => args.data = Some(PathBuf::from(value("--data")?.trim())),
            "--opponents" => args.opponents = Some(name_list(&value("--opponents")?)),
            "--available" => args.available = Some(name_list(&value("--available")?)),
            "--respond-to" => args.respond_to = Some(value("--respond-to")?),
            "--solver" => args.solver = Some(value("--solver")?.parse()?),
            "--damping" => {
                let raw = value("--damping")?;
                args.damping = Some(
                    parse_damping(&raw).ok_or_else(|| anyhow!("invalid damping {raw:?}"))?,
                );
            }
            "--profile" => args.profile = Some(value("--profile")?),
            "--teams" => args.teams = true,
            "-h" | "--help" => return Err(anyhow!("{USAGE}")),
            _ if flag.starts_with("--") => return Err(anyhow!("unknown flag {flag}\n{USAGE}")),
            _ => args.positional.push(arg),
        }
    }
    Ok(args)
}

fn name_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(normalize_player_name)
        .filter(|s| !s.is_empty())
        .collect()
}
