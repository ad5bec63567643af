//! Team win/loss lookup through standings, then team info, then the sentinel.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::model::{SeasonLabel, TeamRecord, SENTINEL};
use crate::source::{StandingsRow, StatsSource};

/// Which lookup produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordTier {
    Standings,
    TeamInfo,
    Unresolved,
}

pub struct TeamRecordResolver {
    source: Arc<dyn StatsSource>,
    team_ids: BTreeMap<String, String>,
    standings: HashMap<SeasonLabel, Arc<Vec<StandingsRow>>>,
}

impl TeamRecordResolver {
    pub fn new(source: Arc<dyn StatsSource>, team_ids: BTreeMap<String, String>) -> Self {
        Self {
            source,
            team_ids,
            standings: HashMap::new(),
        }
    }

    pub async fn resolve(&mut self, team: &str, season: &SeasonLabel) -> TeamRecord {
        self.resolve_with_tier(team, season).await.0
    }

    pub async fn resolve_with_tier(
        &mut self,
        team: &str,
        season: &SeasonLabel,
    ) -> (TeamRecord, RecordTier) {
        if team.is_empty() || team == SENTINEL {
            return (TeamRecord::Unresolved, RecordTier::Unresolved);
        }

        if let Some(rows) = self.standings(season).await {
            if let Some(row) = rows.iter().find(|row| row.abbreviation == team) {
                return (
                    TeamRecord::Known {
                        wins: row.wins,
                        losses: row.losses,
                    },
                    RecordTier::Standings,
                );
            }
            debug!(team, %season, "team missing from standings");
        }

        let Some(team_id) = self.team_ids.get(team) else {
            debug!(team, "no team id mapping");
            return (TeamRecord::Unresolved, RecordTier::Unresolved);
        };

        match self.source.team_info(team_id, season).await {
            Ok(Some(record)) => (
                TeamRecord::Known {
                    wins: record.wins,
                    losses: record.losses,
                },
                RecordTier::TeamInfo,
            ),
            Ok(None) => (TeamRecord::Unresolved, RecordTier::Unresolved),
            Err(e) => {
                warn!(team, %season, error = %e, "team info lookup failed");
                (TeamRecord::Unresolved, RecordTier::Unresolved)
            }
        }
    }

    async fn standings(&mut self, season: &SeasonLabel) -> Option<Arc<Vec<StandingsRow>>> {
        if let Some(cached) = self.standings.get(season) {
            return Some(Arc::clone(cached));
        }
        match self.source.standings(season).await {
            Ok(rows) => {
                let rows = Arc::new(rows);
                self.standings.insert(season.clone(), Arc::clone(&rows));
                Some(rows)
            }
            Err(e) => {
                warn!(%season, error = %e, "standings lookup failed");
                None
            }
        }
    }
}
