//! Core data model: roster input, season averages, team records and the
//! enriched result persisted to the checkpoint.

use std::fmt;
use std::str::FromStr;

/// Placeholder written wherever a value was looked up and could not be found.
pub const SENTINEL: &str = "N/A";

/// A season label such as `"2009-10"`.
///
/// The start year is the first `-`-separated token; the end year is always
/// start + 1. Downstream exports depend on exactly this derivation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeasonLabel {
    label: String,
    start_year: i32,
}

impl SeasonLabel {
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        let start_year = label.split('-').next()?.trim().parse::<i32>().ok()?;
        Some(Self {
            label: label.to_string(),
            start_year,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.label
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn end_year(&self) -> i32 {
        self.start_year + 1
    }
}

impl fmt::Display for SeasonLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// One (candidate, season, voting points) tuple from the upstream vote table.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub candidate: String,
    pub season: SeasonLabel,
    pub points: f64,
}

impl RosterEntry {
    pub fn new(candidate: impl Into<String>, season: SeasonLabel, points: f64) -> Self {
        Self {
            candidate: candidate.into(),
            season,
            points,
        }
    }

    pub fn key(&self) -> CheckpointKey {
        CheckpointKey::new(&self.candidate, self.season.as_str())
    }

    pub fn season_year(&self) -> i32 {
        self.season.start_year()
    }
}

/// Uniqueness key of the checkpoint: (candidate name, season label).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CheckpointKey {
    pub candidate: String,
    pub season: String,
}

impl CheckpointKey {
    pub fn new(candidate: &str, season: &str) -> Self {
        Self {
            candidate: candidate.to_string(),
            season: season.to_string(),
        }
    }
}

impl fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.candidate, self.season)
    }
}

/// The source's internal identifier for a player.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerId(pub String);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIdentity {
    pub candidate: String,
    pub season: SeasonLabel,
    pub player_id: PlayerId,
}

/// Per-game averages for one player over one season.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonAverages {
    pub games_played: u32,
    pub minutes: f64,
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub steals: f64,
    pub blocks: f64,
    pub fg_pct: f64,
    pub fg3_pct: f64,
    pub ft_pct: f64,
    /// Team abbreviation from the first game row, or [`SENTINEL`].
    pub team: String,
    /// Wins in the games this player appeared in.
    pub team_wins: u32,
    pub team_losses: u32,
}

/// A team's season win/loss record, or unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamRecord {
    Known { wins: u32, losses: u32 },
    Unresolved,
}

impl TeamRecord {
    pub fn win_pct(&self) -> Option<f64> {
        match *self {
            TeamRecord::Known { wins, losses } if wins + losses > 0 => {
                Some(round1(f64::from(wins) / f64::from(wins + losses) * 100.0))
            }
            _ => None,
        }
    }
}

impl fmt::Display for TeamRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamRecord::Known { wins, losses } => write!(f, "{wins}-{losses}"),
            TeamRecord::Unresolved => f.write_str(SENTINEL),
        }
    }
}

impl FromStr for TeamRecord {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == SENTINEL {
            return Ok(TeamRecord::Unresolved);
        }
        let (w, l) = s
            .split_once('-')
            .ok_or_else(|| format!("team record {s:?} is not W-L"))?;
        let wins = w.trim().parse().map_err(|_| format!("bad wins in {s:?}"))?;
        let losses = l.trim().parse().map_err(|_| format!("bad losses in {s:?}"))?;
        Ok(TeamRecord::Known { wins, losses })
    }
}

/// Reserved advanced-metric columns. Nothing populates them yet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AdvancedMetrics {
    pub usage_pct: Option<f64>,
    pub off_rating: Option<f64>,
    pub def_rating: Option<f64>,
    pub net_rating: Option<f64>,
    pub pie: Option<f64>,
}

/// The unit written to the checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedResult {
    pub entry: RosterEntry,
    pub averages: SeasonAverages,
    pub team_record: TeamRecord,
    pub past_winner: bool,
    pub advanced: AdvancedMetrics,
}

impl EnrichedResult {
    pub fn key(&self) -> CheckpointKey {
        self.entry.key()
    }
}

/// Round half away from zero to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
