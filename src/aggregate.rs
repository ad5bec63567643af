//! Reduces a season's game log to per-game averages.

use std::sync::Arc;

use crate::error::EntryFailure;
use crate::model::{round1, PlayerId, SeasonAverages, SeasonLabel, SENTINEL};
use crate::source::{GameLogRow, StatsSource};

#[derive(Debug, Default)]
struct Totals {
    minutes: f64,
    points: f64,
    rebounds: f64,
    assists: f64,
    steals: f64,
    blocks: f64,
    fgm: f64,
    fga: f64,
    fg3m: f64,
    fg3a: f64,
    ftm: f64,
    fta: f64,
    wins: u32,
    losses: u32,
}

impl Totals {
    fn add(mut self, row: &GameLogRow) -> Self {
        self.minutes += row.minutes;
        self.points += row.points;
        self.rebounds += row.rebounds;
        self.assists += row.assists;
        self.steals += row.steals;
        self.blocks += row.blocks;
        self.fgm += row.fgm;
        self.fga += row.fga;
        self.fg3m += row.fg3m;
        self.fg3a += row.fg3a;
        self.ftm += row.ftm;
        self.fta += row.fta;
        match row.result.trim() {
            "W" => self.wins += 1,
            "L" => self.losses += 1,
            _ => {}
        }
        self
    }
}

/// Makes over attempts as a percentage; zero when nothing was attempted.
pub fn shooting_pct(makes: f64, attempts: f64) -> f64 {
    if attempts > 0.0 {
        round1(makes / attempts * 100.0)
    } else {
        0.0
    }
}

/// Team abbreviation from a matchup such as `"LAL @ DEN"`.
pub fn team_from_matchup(matchup: &str) -> Option<&str> {
    matchup.split_whitespace().next()
}

/// Averages over the full log. `None` when the log is empty.
///
/// The team is read from the first row only, so a mid-season trade still
/// reports the original team.
pub fn summarize(rows: &[GameLogRow]) -> Option<SeasonAverages> {
    let first = rows.first()?;
    let games = rows.len() as u32;
    let totals = rows.iter().fold(Totals::default(), Totals::add);
    let per_game = |total: f64| round1(total / f64::from(games));

    Some(SeasonAverages {
        games_played: games,
        minutes: per_game(totals.minutes),
        points: per_game(totals.points),
        rebounds: per_game(totals.rebounds),
        assists: per_game(totals.assists),
        steals: per_game(totals.steals),
        blocks: per_game(totals.blocks),
        fg_pct: shooting_pct(totals.fgm, totals.fga),
        fg3_pct: shooting_pct(totals.fg3m, totals.fg3a),
        ft_pct: shooting_pct(totals.ftm, totals.fta),
        team: team_from_matchup(&first.matchup)
            .unwrap_or(SENTINEL)
            .to_string(),
        team_wins: totals.wins,
        team_losses: totals.losses,
    })
}

pub struct SeasonStatsAggregator {
    source: Arc<dyn StatsSource>,
}

impl SeasonStatsAggregator {
    pub fn new(source: Arc<dyn StatsSource>) -> Self {
        Self { source }
    }

    pub async fn aggregate(
        &self,
        player_id: &PlayerId,
        season: &SeasonLabel,
    ) -> Result<SeasonAverages, EntryFailure> {
        let rows = self
            .source
            .game_log(player_id, season)
            .await
            .map_err(EntryFailure::SourceUnavailable)?;
        summarize(&rows).ok_or_else(|| EntryFailure::AggregationEmpty {
            season: season.to_string(),
        })
    }
}
