use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Opponent handicap minus own handicap.
///
/// The scraped data keys tallies by strings like `"+3"`, `"0"` and `"-3"`; this type owns that
/// format in one place so lookups always go through the integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HandicapDiff(pub i32);

impl HandicapDiff {
    /// `None` when the difference does not fit in an `i32`.
    pub fn between(own: i32, opponent: i32) -> Option<Self> {
        opponent.checked_sub(own).map(Self)
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for HandicapDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 > 0 {
            write!(f, "+{}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for HandicapDiff {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let s = raw.trim();
        let digits = s.strip_prefix('+').unwrap_or(s);
        // "+-3" would otherwise parse as -3.
        if digits.starts_with('+') || (s.starts_with('+') && digits.starts_with('-')) {
            return Err(anyhow!("invalid handicap differential {raw:?}"));
        }
        digits
            .parse::<i32>()
            .map(HandicapDiff)
            .map_err(|_| anyhow!("invalid handicap differential {raw:?}"))
    }
}

impl TryFrom<String> for HandicapDiff {
    type Error = anyhow::Error;

    fn try_from(raw: String) -> Result<Self> {
        raw.parse()
    }
}

impl From<HandicapDiff> for String {
    fn from(diff: HandicapDiff) -> Self {
        diff.to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTally {
    #[serde(default)]
    pub games_won: u32,
    #[serde(default)]
    pub games_lost: u32,
}

impl GameTally {
    pub fn new(games_won: u32, games_lost: u32) -> Self {
        Self {
            games_won,
            games_lost,
        }
    }

    pub fn total(&self) -> u32 {
        self.games_won.saturating_add(self.games_lost)
    }

    pub fn win_rate(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        Some(self.games_won as f64 / total as f64)
    }

    pub fn absorb(&mut self, other: &GameTally) {
        self.games_won = self.games_won.saturating_add(other.games_won);
        self.games_lost = self.games_lost.saturating_add(other.games_lost);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub handicap: Option<i32>,
    pub games_won: u32,
    pub games_lost: u32,
    /// Games without a handicap on both sides are counted in the aggregates only.
    pub handicap_performance: BTreeMap<HandicapDiff, GameTally>,
}

impl PlayerRecord {
    pub fn new(name: impl Into<String>, handicap: Option<i32>) -> Self {
        Self {
            name: name.into(),
            handicap,
            ..Self::default()
        }
    }

    pub fn overall(&self) -> GameTally {
        GameTally::new(self.games_won, self.games_lost)
    }

    pub fn tally_at(&self, diff: HandicapDiff) -> Option<&GameTally> {
        self.handicap_performance.get(&diff)
    }

    pub fn tallies_within_totals(&self) -> bool {
        let mut sum = GameTally::default();
        for tally in self.handicap_performance.values() {
            sum.absorb(tally);
        }
        sum.games_won <= self.games_won && sum.games_lost <= self.games_lost
    }

    /// Sums counters and per-differential tallies. The first known handicap is kept; a
    /// conflicting handicap from `other` is ignored.
    pub fn merge(&mut self, other: &PlayerRecord) {
        match (self.handicap, other.handicap) {
            (None, Some(h)) => self.handicap = Some(h),
            (Some(mine), Some(theirs)) if mine != theirs => {
                debug!(
                    player = %self.name,
                    kept = mine,
                    ignored = theirs,
                    "conflicting handicaps while merging player"
                );
            }
            _ => {}
        }
        self.games_won = self.games_won.saturating_add(other.games_won);
        self.games_lost = self.games_lost.saturating_add(other.games_lost);
        for (diff, tally) in &other.handicap_performance {
            self.handicap_performance
                .entry(*diff)
                .or_default()
                .absorb(tally);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRoster {
    pub id: String,
    pub name: String,
    pub players: BTreeMap<String, PlayerRecord>,
}

impl TeamRoster {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            players: BTreeMap::new(),
        }
    }

    pub fn with_player(mut self, player: PlayerRecord) -> Self {
        self.players.insert(player.name.clone(), player);
        self
    }

    pub fn player_names(&self) -> Vec<String> {
        self.players.keys().cloned().collect()
    }
}

/// Immutable statistics for one analysis session, keyed by team id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeagueSnapshot {
    pub scraped_date: Option<String>,
    pub teams: BTreeMap<String, TeamRoster>,
}

impl LeagueSnapshot {
    pub fn from_teams(teams: impl IntoIterator<Item = TeamRoster>) -> Self {
        Self {
            scraped_date: None,
            teams: teams.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    /// Case-insensitive exact name match, then substring match.
    pub fn find_team(&self, query: &str) -> Option<&TeamRoster> {
        let want = query.trim().to_lowercase();
        if want.is_empty() {
            return None;
        }
        self.teams
            .values()
            .find(|t| t.name.trim().to_lowercase() == want)
            .or_else(|| {
                self.teams
                    .values()
                    .find(|t| t.name.to_lowercase().contains(&want))
            })
    }

    pub fn team_names(&self) -> Vec<String> {
        self.teams.values().map(|t| t.name.clone()).collect()
    }

    pub fn team_players(&self, query: &str) -> Vec<String> {
        self.find_team(query)
            .map(TeamRoster::player_names)
            .unwrap_or_default()
    }

    /// One record per player name across every roster, in team-id order.
    pub fn consolidated_players(&self) -> BTreeMap<String, PlayerRecord> {
        let mut out: BTreeMap<String, PlayerRecord> = BTreeMap::new();
        for team in self.teams.values() {
            for (name, record) in &team.players {
                match out.get_mut(name) {
                    Some(existing) => existing.merge(record),
                    None => {
                        out.insert(name.clone(), record.clone());
                    }
                }
            }
        }
        out
    }
}

#[derive(Debug, Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    scraped_date: Option<String>,
    #[serde(default)]
    teams: BTreeMap<String, RawTeam>,
}

#[derive(Debug, Deserialize)]
struct RawTeam {
    #[serde(default)]
    name: String,
    #[serde(default)]
    players: BTreeMap<String, RawPlayer>,
}

#[derive(Debug, Deserialize)]
struct RawPlayer {
    #[serde(default)]
    handicap: Option<i32>,
    #[serde(default)]
    games_won: u32,
    #[serde(default)]
    games_lost: u32,
    #[serde(default)]
    handicap_performance: BTreeMap<String, GameTally>,
}

pub fn parse_league_snapshot_json(raw: &str) -> Result<LeagueSnapshot> {
    let parsed: Option<RawSnapshot> =
        serde_json::from_str(raw).context("parse league statistics json")?;
    let Some(parsed) = parsed else {
        return Ok(LeagueSnapshot::default());
    };

    let mut teams = BTreeMap::new();
    for (team_id, raw_team) in parsed.teams {
        let mut roster = TeamRoster::new(team_id.clone(), raw_team.name.trim());
        for (player_name, raw_player) in raw_team.players {
            let record = player_from_raw(&player_name, raw_player)
                .with_context(|| format!("team {team_id}, player {player_name:?}"))?;
            if !record.tallies_within_totals() {
                warn!(
                    team = %team_id,
                    player = %record.name,
                    "handicap tallies exceed aggregate game counts"
                );
            }
            match roster.players.entry(record.name.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(mut slot) => {
                    warn!(
                        team = %team_id,
                        player = %record.name,
                        raw = %player_name,
                        "player listed twice under whitespace variants; merging"
                    );
                    slot.get_mut().merge(&record);
                }
            }
        }
        teams.insert(team_id, roster);
    }

    Ok(LeagueSnapshot {
        scraped_date: parsed.scraped_date,
        teams,
    })
}

/// Trims and collapses inner runs of whitespace, the form player names are stored under.
pub fn normalize_player_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn player_from_raw(name: &str, raw: RawPlayer) -> Result<PlayerRecord> {
    let mut record = PlayerRecord::new(normalize_player_name(name), raw.handicap);
    record.games_won = raw.games_won;
    record.games_lost = raw.games_lost;
    // "3" and "+3" both land on the same bucket.
    for (key, tally) in raw.handicap_performance {
        let diff: HandicapDiff = key.parse()?;
        record
            .handicap_performance
            .entry(diff)
            .or_default()
            .absorb(&tally);
    }
    Ok(record)
}

pub fn load_league_snapshot(path: &Path) -> Result<LeagueSnapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read league statistics from {}", path.display()))?;
    parse_league_snapshot_json(&raw)
        .with_context(|| format!("load league statistics from {}", path.display()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfilePoint {
    pub differential: HandicapDiff,
    pub win_rate: f64,
    pub games: u32,
}

/// Win rate by handicap differential for one player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceProfile {
    pub player: String,
    pub handicap: Option<i32>,
    pub points: Vec<ProfilePoint>,
    pub total_games_won: u32,
    pub total_games_lost: u32,
    pub total_games: u32,
    pub overall_win_rate: f64,
}

pub fn player_profile(record: &PlayerRecord) -> PerformanceProfile {
    let points = record
        .handicap_performance
        .iter()
        .filter_map(|(diff, tally)| {
            tally.win_rate().map(|win_rate| ProfilePoint {
                differential: *diff,
                win_rate,
                games: tally.total(),
            })
        })
        .collect();

    let overall = record.overall();
    PerformanceProfile {
        player: record.name.clone(),
        handicap: record.handicap,
        points,
        total_games_won: overall.games_won,
        total_games_lost: overall.games_lost,
        total_games: overall.total(),
        overall_win_rate: overall.win_rate().unwrap_or(0.0),
    }
}
