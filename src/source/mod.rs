//! The four capabilities the collector needs from the external stats source.

pub mod nba;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::model::{PlayerId, SeasonLabel};

pub use nba::NbaStatsClient;

/// One row of the season's player directory.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryEntry {
    pub player_id: PlayerId,
    pub name: String,
}

/// One game from a player's game log. Counting stats are already
/// null-coerced to zero by the adapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameLogRow {
    pub minutes: f64,
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub steals: f64,
    pub blocks: f64,
    pub fgm: f64,
    pub fga: f64,
    pub fg3m: f64,
    pub fg3a: f64,
    pub ftm: f64,
    pub fta: f64,
    /// `"W"`, `"L"`, or empty when unknown.
    pub result: String,
    /// e.g. `"LAL vs. DEN"` or `"LAL @ DEN"`.
    pub matchup: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandingsRow {
    pub abbreviation: String,
    pub wins: u32,
    pub losses: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinLoss {
    pub wins: u32,
    pub losses: u32,
}

#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn player_directory(
        &self,
        season: &SeasonLabel,
    ) -> Result<Vec<DirectoryEntry>, SourceError>;

    async fn game_log(
        &self,
        player_id: &PlayerId,
        season: &SeasonLabel,
    ) -> Result<Vec<GameLogRow>, SourceError>;

    async fn standings(&self, season: &SeasonLabel) -> Result<Vec<StandingsRow>, SourceError>;

    /// Record from the first team-info row; `None` when the endpoint
    /// returned no rows.
    async fn team_info(
        &self,
        team_id: &str,
        season: &SeasonLabel,
    ) -> Result<Option<WinLoss>, SourceError>;
}
