#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use mvp_stats_collector::checkpoint::read_results;
use mvp_stats_collector::error::SourceError;
use mvp_stats_collector::model::{PlayerId, RosterEntry, SeasonLabel};
use mvp_stats_collector::pacing::Pacer;
use mvp_stats_collector::source::{
    DirectoryEntry, GameLogRow, StandingsRow, StatsSource, WinLoss,
};

pub fn tmp_dir(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("mvp_it_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&p);
    std::fs::create_dir_all(&p).unwrap();
    p
}

/// `count` candidates named `Player NN`, all in one season.
pub fn roster(count: usize, season: &str) -> Vec<RosterEntry> {
    let season = SeasonLabel::parse(season).unwrap();
    (0..count)
        .map(|i| RosterEntry::new(format!("Player {i:02}"), season.clone(), 100.0 + i as f64))
        .collect()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Calls {
    pub directory: usize,
    pub game_log: usize,
    pub standings: usize,
    pub team_info: usize,
}

/// Every directory name resolves; every game log has three games built from
/// the player id. Names in `missing` get an empty game log.
#[derive(Default)]
pub struct ScriptedSource {
    calls: Mutex<Calls>,
    names: Mutex<Vec<String>>,
    missing: Mutex<HashSet<String>>,
}

impl ScriptedSource {
    pub fn with_roster(roster: &[RosterEntry]) -> Arc<Self> {
        let source = Self::default();
        *source.names.lock().unwrap() = roster.iter().map(|e| e.candidate.clone()).collect();
        Arc::new(source)
    }

    pub fn set_missing(&self, name: &str, missing: bool) {
        let mut set = self.missing.lock().unwrap();
        if missing {
            set.insert(name.to_string());
        } else {
            set.remove(name);
        }
    }

    pub fn calls(&self) -> Calls {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl StatsSource for ScriptedSource {
    async fn player_directory(
        &self,
        _season: &SeasonLabel,
    ) -> Result<Vec<DirectoryEntry>, SourceError> {
        self.calls.lock().unwrap().directory += 1;
        Ok(self
            .names
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, name)| DirectoryEntry {
                player_id: PlayerId(format!("{}", 1000 + i)),
                name: name.clone(),
            })
            .collect())
    }

    async fn game_log(
        &self,
        player_id: &PlayerId,
        _season: &SeasonLabel,
    ) -> Result<Vec<GameLogRow>, SourceError> {
        self.calls.lock().unwrap().game_log += 1;
        let idx: usize = player_id.0.parse::<usize>().unwrap() - 1000;
        let name = self.names.lock().unwrap()[idx].clone();
        if self.missing.lock().unwrap().contains(&name) {
            return Ok(Vec::new());
        }
        let base = idx as f64;
        Ok((0..3)
            .map(|g| GameLogRow {
                minutes: 30.0 + g as f64,
                points: 20.0 + base,
                rebounds: 5.0,
                assists: 4.0 + g as f64,
                steals: 1.0,
                blocks: 0.0,
                fgm: 8.0,
                fga: 17.0,
                fg3m: 0.0,
                fg3a: 0.0,
                ftm: 4.0,
                fta: 5.0,
                result: if g == 1 { "L".into() } else { "W".into() },
                matchup: "BOS vs. NYK".into(),
            })
            .collect())
    }

    async fn standings(&self, _season: &SeasonLabel) -> Result<Vec<StandingsRow>, SourceError> {
        self.calls.lock().unwrap().standings += 1;
        Ok(vec![StandingsRow {
            abbreviation: "BOS".into(),
            wins: 60,
            losses: 22,
        }])
    }

    async fn team_info(
        &self,
        _team_id: &str,
        _season: &SeasonLabel,
    ) -> Result<Option<WinLoss>, SourceError> {
        self.calls.lock().unwrap().team_info += 1;
        Ok(None)
    }
}

/// Counts pauses and records how many rows the checkpoint held at each one.
pub struct ObservingPacer {
    checkpoint: PathBuf,
    pauses: AtomicUsize,
    rows_seen: Mutex<Vec<usize>>,
}

impl ObservingPacer {
    pub fn new(checkpoint: &Path) -> Arc<Self> {
        Arc::new(Self {
            checkpoint: checkpoint.to_path_buf(),
            pauses: AtomicUsize::new(0),
            rows_seen: Mutex::new(Vec::new()),
        })
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn rows_seen(&self) -> Vec<usize> {
        self.rows_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pacer for ObservingPacer {
    async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        let rows = read_results(&self.checkpoint).unwrap().len();
        self.rows_seen.lock().unwrap().push(rows);
    }
}
