//! In-memory stats source for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::model::{PlayerId, SeasonLabel};
use crate::source::{DirectoryEntry, GameLogRow, StandingsRow, StatsSource, WinLoss};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calls {
    pub directory: usize,
    pub game_log: usize,
    pub standings: usize,
    pub team_info: usize,
}

#[derive(Default)]
struct State {
    directories: HashMap<String, Vec<DirectoryEntry>>,
    game_logs: HashMap<(String, String), Vec<GameLogRow>>,
    standings: HashMap<String, Vec<StandingsRow>>,
    team_info: HashMap<(String, String), Option<WinLoss>>,
    failing: HashSet<String>,
    calls: Calls,
}

#[derive(Default)]
pub struct FakeSource {
    state: Mutex<State>,
}

fn unavailable(what: &str) -> SourceError {
    SourceError::Status {
        endpoint: what.to_string(),
        status: 503,
    }
}

impl FakeSource {
    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls
    }

    pub fn add_player(&self, id: &str, name: &str, season: &SeasonLabel) {
        self.state
            .lock()
            .unwrap()
            .directories
            .entry(season.to_string())
            .or_default()
            .push(DirectoryEntry {
                player_id: PlayerId(id.into()),
                name: name.into(),
            });
    }

    pub fn set_game_log(&self, id: &str, season: &SeasonLabel, rows: Vec<GameLogRow>) {
        self.state
            .lock()
            .unwrap()
            .game_logs
            .insert((id.into(), season.to_string()), rows);
    }

    pub fn set_standings(&self, season: &SeasonLabel, rows: Vec<StandingsRow>) {
        self.state
            .lock()
            .unwrap()
            .standings
            .insert(season.to_string(), rows);
    }

    pub fn set_team_info(&self, team_id: &str, season: &SeasonLabel, record: Option<WinLoss>) {
        self.state
            .lock()
            .unwrap()
            .team_info
            .insert((team_id.into(), season.to_string()), record);
    }

    pub fn fail_directory(&self, season: &SeasonLabel) {
        self.fail(format!("directory/{season}"));
    }

    pub fn fail_standings(&self, season: &SeasonLabel) {
        self.fail(format!("standings/{season}"));
    }

    pub fn fail_team_info(&self, team_id: &str, season: &SeasonLabel) {
        self.fail(format!("teaminfo/{team_id}/{season}"));
    }

    pub fn fail_game_log(&self, id: &str, season: &SeasonLabel) {
        self.fail(format!("gamelog/{id}/{season}"));
    }

    fn fail(&self, key: String) {
        self.state.lock().unwrap().failing.insert(key);
    }
}

#[async_trait]
impl StatsSource for FakeSource {
    async fn player_directory(
        &self,
        season: &SeasonLabel,
    ) -> Result<Vec<DirectoryEntry>, SourceError> {
        let mut state = self.state.lock().unwrap();
        state.calls.directory += 1;
        let key = format!("directory/{season}");
        if state.failing.contains(&key) {
            return Err(unavailable(&key));
        }
        Ok(state
            .directories
            .get(season.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn game_log(
        &self,
        player_id: &PlayerId,
        season: &SeasonLabel,
    ) -> Result<Vec<GameLogRow>, SourceError> {
        let mut state = self.state.lock().unwrap();
        state.calls.game_log += 1;
        let key = format!("gamelog/{player_id}/{season}");
        if state.failing.contains(&key) {
            return Err(unavailable(&key));
        }
        Ok(state
            .game_logs
            .get(&(player_id.0.clone(), season.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn standings(&self, season: &SeasonLabel) -> Result<Vec<StandingsRow>, SourceError> {
        let mut state = self.state.lock().unwrap();
        state.calls.standings += 1;
        let key = format!("standings/{season}");
        if state.failing.contains(&key) {
            return Err(unavailable(&key));
        }
        Ok(state
            .standings
            .get(season.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn team_info(
        &self,
        team_id: &str,
        season: &SeasonLabel,
    ) -> Result<Option<WinLoss>, SourceError> {
        let mut state = self.state.lock().unwrap();
        state.calls.team_info += 1;
        let key = format!("teaminfo/{team_id}/{season}");
        if state.failing.contains(&key) {
            return Err(unavailable(&key));
        }
        Ok(state
            .team_info
            .get(&(team_id.to_string(), season.to_string()))
            .copied()
            .flatten())
    }
}
