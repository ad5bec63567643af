//! Durable set of enriched results keyed by (player, season).
//!
//! The file is a CSV table. Every commit rewrites it as a whole through a
//! temp file and a rename, so a crash leaves either the old or the new table.
//! Committed rows are never modified and a key is never written twice.
//!
//! Tables written before the `TEAM_WINS`/`TEAM_LOSSES` columns existed still
//! load: their `TEAM_RECORD` was the game-log tally, so it fills both.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::error::CheckpointError;
use crate::model::{
    AdvancedMetrics, CheckpointKey, EnrichedResult, RosterEntry, SeasonAverages, SeasonLabel,
    TeamRecord,
};

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointRow {
    #[serde(rename = "Player")]
    player: String,
    #[serde(rename = "Season")]
    season: String,
    #[serde(rename = "MVP_Points")]
    mvp_points: f64,
    #[serde(rename = "GP")]
    gp: u32,
    #[serde(rename = "MPG")]
    mpg: f64,
    #[serde(rename = "PTS")]
    pts: f64,
    #[serde(rename = "REB")]
    reb: f64,
    #[serde(rename = "AST")]
    ast: f64,
    #[serde(rename = "STL")]
    stl: f64,
    #[serde(rename = "BLK")]
    blk: f64,
    #[serde(rename = "FG_PCT")]
    fg_pct: f64,
    #[serde(rename = "FG3_PCT")]
    fg3_pct: f64,
    #[serde(rename = "FT_PCT")]
    ft_pct: f64,
    #[serde(rename = "USG_PCT")]
    usg_pct: Option<f64>,
    #[serde(rename = "OFF_RATING")]
    off_rating: Option<f64>,
    #[serde(rename = "DEF_RATING")]
    def_rating: Option<f64>,
    #[serde(rename = "NET_RATING")]
    net_rating: Option<f64>,
    #[serde(rename = "PIE")]
    pie: Option<f64>,
    #[serde(rename = "TEAM")]
    team: String,
    #[serde(rename = "TEAM_WINS", default)]
    team_wins: Option<u32>,
    #[serde(rename = "TEAM_LOSSES", default)]
    team_losses: Option<u32>,
    #[serde(rename = "TEAM_RECORD")]
    team_record: String,
    #[serde(rename = "PAST_MVP_WINNER", deserialize_with = "deserialize_flag")]
    past_mvp_winner: bool,
}

// Accepts the spellings other tools write for booleans.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid PAST_MVP_WINNER value {other:?}"
        ))),
    }
}

impl From<&EnrichedResult> for CheckpointRow {
    fn from(result: &EnrichedResult) -> Self {
        let avg = &result.averages;
        Self {
            player: result.entry.candidate.clone(),
            season: result.entry.season.to_string(),
            mvp_points: result.entry.points,
            gp: avg.games_played,
            mpg: avg.minutes,
            pts: avg.points,
            reb: avg.rebounds,
            ast: avg.assists,
            stl: avg.steals,
            blk: avg.blocks,
            fg_pct: avg.fg_pct,
            fg3_pct: avg.fg3_pct,
            ft_pct: avg.ft_pct,
            usg_pct: result.advanced.usage_pct,
            off_rating: result.advanced.off_rating,
            def_rating: result.advanced.def_rating,
            net_rating: result.advanced.net_rating,
            pie: result.advanced.pie,
            team: avg.team.clone(),
            team_wins: Some(avg.team_wins),
            team_losses: Some(avg.team_losses),
            team_record: result.team_record.to_string(),
            past_mvp_winner: result.past_winner,
        }
    }
}

impl CheckpointRow {
    fn into_result(self, line: u64) -> Result<EnrichedResult, CheckpointError> {
        let season = SeasonLabel::parse(&self.season).ok_or_else(|| CheckpointError::InvalidRow {
            line,
            message: format!("bad season label {:?}", self.season),
        })?;
        let team_record = self
            .team_record
            .parse::<TeamRecord>()
            .map_err(|message| CheckpointError::InvalidRow { line, message })?;
        let (team_wins, team_losses) = match (self.team_wins, self.team_losses, team_record) {
            (Some(wins), Some(losses), _) => (wins, losses),
            (None, None, TeamRecord::Known { wins, losses }) => (wins, losses),
            (wins, losses, _) => (wins.unwrap_or(0), losses.unwrap_or(0)),
        };

        Ok(EnrichedResult {
            entry: RosterEntry::new(self.player, season, self.mvp_points),
            averages: SeasonAverages {
                games_played: self.gp,
                minutes: self.mpg,
                points: self.pts,
                rebounds: self.reb,
                assists: self.ast,
                steals: self.stl,
                blocks: self.blk,
                fg_pct: self.fg_pct,
                fg3_pct: self.fg3_pct,
                ft_pct: self.ft_pct,
                team: self.team,
                team_wins,
                team_losses,
            },
            team_record,
            past_winner: self.past_mvp_winner,
            advanced: AdvancedMetrics {
                usage_pct: self.usg_pct,
                off_rating: self.off_rating,
                def_rating: self.def_rating,
                net_rating: self.net_rating,
                pie: self.pie,
            },
        })
    }
}

/// Read every row of a checkpoint file. A missing file is an empty table.
pub fn read_results(path: &Path) -> Result<Vec<EnrichedResult>, CheckpointError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let csv_err = |source| CheckpointError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let mut results = Vec::new();
    for (i, record) in reader.deserialize::<CheckpointRow>().enumerate() {
        let row = record.map_err(csv_err)?;
        results.push(row.into_result(i as u64 + 2)?);
    }
    Ok(results)
}

fn write_rows(tmp: &Path, results: &[EnrichedResult]) -> Result<(), CheckpointError> {
    let csv_err = |source| CheckpointError::Csv {
        path: tmp.to_path_buf(),
        source,
    };
    let io_err = |source| CheckpointError::Io {
        path: tmp.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(tmp).map_err(csv_err)?;
    for result in results {
        writer.serialize(CheckpointRow::from(result)).map_err(csv_err)?;
    }
    writer.flush().map_err(io_err)?;
    drop(writer);
    File::open(tmp).and_then(|f| f.sync_all()).map_err(io_err)
}

fn write_atomic(path: &Path, results: &[EnrichedResult]) -> Result<(), CheckpointError> {
    let io_err = |source| CheckpointError::Io {
        path: path.to_path_buf(),
        source,
    };
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(io_err)?;

    let tmp = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("checkpoint"),
        std::process::id()
    ));
    let replaced =
        write_rows(&tmp, results).and_then(|()| std::fs::rename(&tmp, path).map_err(io_err));
    if let Err(e) = replaced {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    if let Ok(dir) = File::open(&parent) {
        let _ = dir.sync_all();
    }
    Ok(())
}

#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    results: Vec<EnrichedResult>,
    keys: HashSet<CheckpointKey>,
}

impl CheckpointStore {
    /// Load the checkpoint at `path`, or start empty when it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let path = path.into();
        let mut store = Self {
            results: Vec::new(),
            keys: HashSet::new(),
            path,
        };
        for result in read_results(&store.path)? {
            let key = result.key();
            if store.keys.insert(key.clone()) {
                store.results.push(result);
            } else {
                warn!(%key, "duplicate checkpoint row ignored");
            }
        }
        debug!(path = %store.path.display(), rows = store.results.len(), "checkpoint loaded");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn contains(&self, key: &CheckpointKey) -> bool {
        self.keys.contains(key)
    }

    pub fn results(&self) -> &[EnrichedResult] {
        &self.results
    }

    /// Append `batch` and rewrite the file. Rows whose key is already
    /// committed are dropped. Returns how many rows were added.
    ///
    /// In-memory state only changes once the file is safely replaced.
    pub fn commit(&mut self, batch: Vec<EnrichedResult>) -> Result<usize, CheckpointError> {
        let mut fresh_keys = HashSet::new();
        let mut fresh = Vec::with_capacity(batch.len());
        for result in batch {
            let key = result.key();
            if self.keys.contains(&key) || !fresh_keys.insert(key.clone()) {
                warn!(%key, "already checkpointed, row dropped");
                continue;
            }
            fresh.push(result);
        }
        if fresh.is_empty() {
            return Ok(0);
        }

        let mut next = self.results.clone();
        next.extend(fresh.iter().cloned());
        write_atomic(&self.path, &next)?;

        let added = fresh.len();
        self.results = next;
        self.keys.extend(fresh_keys);
        Ok(added)
    }

    /// Number of distinct seasons and the earliest/latest season labels.
    pub fn season_coverage(&self) -> Option<(usize, &SeasonLabel, &SeasonLabel)> {
        season_coverage(&self.results)
    }
}

pub fn season_coverage(results: &[EnrichedResult]) -> Option<(usize, &SeasonLabel, &SeasonLabel)> {
    let seasons: HashSet<&SeasonLabel> = results.iter().map(|r| &r.entry.season).collect();
    let chronological = |a: &&SeasonLabel, b: &&SeasonLabel| {
        (a.start_year(), a.as_str()).cmp(&(b.start_year(), b.as_str()))
    };
    let first = seasons.iter().copied().min_by(chronological)?;
    let last = seasons.iter().copied().max_by(chronological)?;
    Some((seasons.len(), first, last))
}
