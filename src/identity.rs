//! Maps a candidate's display name to the source's player identifier.
//!
//! Strategies run in priority order over the whole season directory: a
//! later, looser strategy is only consulted when every earlier one found
//! nothing. Within one strategy the first directory match wins.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use crate::error::EntryFailure;
use crate::model::{ResolvedIdentity, SeasonLabel};
use crate::source::{DirectoryEntry, StatsSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Byte-for-byte equal after trimming.
    Exact,
    /// Equal after case folding and whitespace collapsing.
    Normalized,
    /// Either normalized name contains the other.
    Substring,
}

impl MatchStrategy {
    pub fn matches(&self, query: &str, candidate: &str) -> bool {
        match self {
            MatchStrategy::Exact => query.trim() == candidate.trim(),
            MatchStrategy::Normalized => normalize(query) == normalize(candidate),
            MatchStrategy::Substring => {
                let (q, c) = (normalize(query), normalize(candidate));
                if q.is_empty() || c.is_empty() {
                    return false;
                }
                c.contains(&q) || q.contains(&c)
            }
        }
    }
}

impl FromStr for MatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(MatchStrategy::Exact),
            "normalized" => Ok(MatchStrategy::Normalized),
            "substring" => Ok(MatchStrategy::Substring),
            other => Err(format!("unknown identity strategy {other:?}")),
        }
    }
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Pick the directory entry for `name` using `strategies` in order.
pub fn find_in_directory<'a>(
    strategies: &[MatchStrategy],
    name: &str,
    directory: &'a [DirectoryEntry],
) -> Option<(MatchStrategy, &'a DirectoryEntry)> {
    strategies.iter().find_map(|strategy| {
        directory
            .iter()
            .find(|entry| strategy.matches(name, &entry.name))
            .map(|entry| (*strategy, entry))
    })
}

pub struct IdentityResolver {
    source: Arc<dyn StatsSource>,
    strategies: Vec<MatchStrategy>,
    directories: HashMap<SeasonLabel, Arc<Vec<DirectoryEntry>>>,
}

impl IdentityResolver {
    pub fn new(source: Arc<dyn StatsSource>, strategies: Vec<MatchStrategy>) -> Self {
        Self {
            source,
            strategies,
            directories: HashMap::new(),
        }
    }

    pub async fn resolve(
        &mut self,
        name: &str,
        season: &SeasonLabel,
    ) -> Result<ResolvedIdentity, EntryFailure> {
        let directory = self.directory(name, season).await?;

        match find_in_directory(&self.strategies, name, &directory) {
            Some((strategy, entry)) => {
                debug!(
                    candidate = name,
                    matched = %entry.name,
                    ?strategy,
                    "resolved identity"
                );
                Ok(ResolvedIdentity {
                    candidate: name.to_string(),
                    season: season.clone(),
                    player_id: entry.player_id.clone(),
                })
            }
            None => Err(EntryFailure::NotFound {
                candidate: name.to_string(),
                season: season.to_string(),
                cause: None,
            }),
        }
    }

    async fn directory(
        &mut self,
        name: &str,
        season: &SeasonLabel,
    ) -> Result<Arc<Vec<DirectoryEntry>>, EntryFailure> {
        if let Some(cached) = self.directories.get(season) {
            return Ok(Arc::clone(cached));
        }
        let fetched = self
            .source
            .player_directory(season)
            .await
            .map_err(|e| EntryFailure::NotFound {
                candidate: name.to_string(),
                season: season.to_string(),
                cause: Some(e),
            })?;
        let fetched = Arc::new(fetched);
        self.directories.insert(season.clone(), Arc::clone(&fetched));
        Ok(fetched)
    }

    #[cfg(test)]
    fn cached_seasons(&self) -> usize {
        self.directories.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlayerId;
    use crate::testing::FakeSource;

    fn entry(id: &str, name: &str) -> DirectoryEntry {
        DirectoryEntry {
            player_id: PlayerId(id.into()),
            name: name.into(),
        }
    }

    const ALL: [MatchStrategy; 3] = [
        MatchStrategy::Exact,
        MatchStrategy::Normalized,
        MatchStrategy::Substring,
    ];

    #[test]
    fn exact_match_beats_earlier_substring_match() {
        // "Anthony Davis" would be a substring hit on "Anthony Davis Jr." first
        let directory = vec![entry("1", "Anthony Davis Jr."), entry("2", "Anthony Davis")];
        let (strategy, found) = find_in_directory(&ALL, "Anthony Davis", &directory).unwrap();
        assert_eq!(strategy, MatchStrategy::Exact);
        assert_eq!(found.player_id, PlayerId("2".into()));
    }

    #[test]
    fn normalized_match_ignores_case_and_spacing() {
        let directory = vec![entry("7", "Kevin  Durant")];
        let (strategy, found) = find_in_directory(&ALL, " kevin durant ", &directory).unwrap();
        assert_eq!(strategy, MatchStrategy::Normalized);
        assert_eq!(found.player_id, PlayerId("7".into()));
    }

    #[test]
    fn substring_takes_first_directory_hit() {
        let directory = vec![entry("10", "Stephen Curry"), entry("11", "Seth Curry")];
        let (strategy, found) = find_in_directory(&ALL, "Curry", &directory).unwrap();
        assert_eq!(strategy, MatchStrategy::Substring);
        assert_eq!(found.player_id, PlayerId("10".into()));

        // query longer than the directory name also matches
        let directory = vec![entry("3", "Nene")];
        assert!(find_in_directory(&ALL, "Nene Hilario", &directory).is_some());
    }

    #[test]
    fn substring_can_be_disabled() {
        let directory = vec![entry("10", "Stephen Curry")];
        let strict = [MatchStrategy::Exact, MatchStrategy::Normalized];
        assert!(find_in_directory(&strict, "Curry", &directory).is_none());
    }

    #[test]
    fn strategy_names_parse() {
        assert_eq!("Exact".parse::<MatchStrategy>(), Ok(MatchStrategy::Exact));
        assert!("fuzzy".parse::<MatchStrategy>().is_err());
    }

    #[tokio::test]
    async fn directory_is_fetched_once_per_season() {
        let season = SeasonLabel::parse("2015-16").unwrap();
        let source = Arc::new(FakeSource::default());
        source.add_player("201939", "Stephen Curry", &season);
        source.add_player("2544", "LeBron James", &season);

        let mut resolver = IdentityResolver::new(source.clone(), ALL.to_vec());
        let curry = resolver.resolve("Stephen Curry", &season).await.unwrap();
        let james = resolver.resolve("LeBron James", &season).await.unwrap();

        assert_eq!(curry.player_id, PlayerId("201939".into()));
        assert_eq!(james.player_id, PlayerId("2544".into()));
        assert_eq!(source.calls().directory, 1);
        assert_eq!(resolver.cached_seasons(), 1);
    }

    #[tokio::test]
    async fn directory_failure_is_not_found_and_not_cached() {
        let season = SeasonLabel::parse("2015-16").unwrap();
        let source = Arc::new(FakeSource::default());
        source.fail_directory(&season);

        let mut resolver = IdentityResolver::new(source.clone(), ALL.to_vec());
        let err = resolver.resolve("Stephen Curry", &season).await.unwrap_err();
        assert!(matches!(err, EntryFailure::NotFound { cause: Some(_), .. }));
        assert_eq!(resolver.cached_seasons(), 0);
    }

    #[tokio::test]
    async fn unknown_name_is_not_found() {
        let season = SeasonLabel::parse("2015-16").unwrap();
        let source = Arc::new(FakeSource::default());
        source.add_player("2544", "LeBron James", &season);

        let mut resolver = IdentityResolver::new(source, ALL.to_vec());
        let err = resolver.resolve("Michael Jordan", &season).await.unwrap_err();
        assert!(matches!(err, EntryFailure::NotFound { cause: None, .. }));
    }
}
