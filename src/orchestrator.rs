//! Drives enrichment over the roster and commits results in batches.
//!
//! Entries already in the checkpoint are skipped without touching the source
//! or the pacer. A failed entry is logged and left out of the checkpoint so
//! the next run retries it. Only checkpoint write failures end the run.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::aggregate::SeasonStatsAggregator;
use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::error::{CheckpointError, ConfigError, EntryFailure};
use crate::history::was_past_winner;
use crate::identity::{IdentityResolver, MatchStrategy};
use crate::model::{AdvancedMetrics, CheckpointKey, EnrichedResult, RosterEntry};
use crate::pacing::{Pacer, RandomDelay};
use crate::source::StatsSource;
use crate::team_record::TeamRecordResolver;

pub const DEFAULT_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone)]
pub struct CollectorOptions {
    pub batch_size: usize,
    pub strategies: Vec<MatchStrategy>,
    pub team_ids: BTreeMap<String, String>,
    pub failure_delay: Duration,
}

impl CollectorOptions {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            batch_size: config.collection.batch_size,
            strategies: config.identity.parsed_strategies()?,
            team_ids: config.team_ids.clone(),
            failure_delay: Duration::from_millis(config.collection.failure_delay_ms),
        })
    }
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self::from_config(&Config::default()).unwrap_or_else(|_| Self {
            batch_size: DEFAULT_BATCH_SIZE,
            strategies: vec![MatchStrategy::Exact],
            team_ids: BTreeMap::new(),
            failure_delay: Duration::from_millis(1000),
        })
    }
}

/// What happened to one roster entry.
#[derive(Debug)]
pub enum EntryOutcome {
    Skipped,
    Collected(Box<EnrichedResult>),
    Failed(EntryFailure),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub skipped: usize,
    pub collected: usize,
    pub flushes: usize,
    /// Entries left for the next run, with the reason.
    pub failed: Vec<(CheckpointKey, String)>,
}

pub struct Collector {
    identity: IdentityResolver,
    aggregator: SeasonStatsAggregator,
    team_records: TeamRecordResolver,
    pacer: Arc<dyn Pacer>,
    batch_size: usize,
    failure_delay: Duration,
}

impl Collector {
    pub fn new(
        source: Arc<dyn StatsSource>,
        options: CollectorOptions,
        pacer: Arc<dyn Pacer>,
    ) -> Self {
        Self {
            identity: IdentityResolver::new(Arc::clone(&source), options.strategies),
            aggregator: SeasonStatsAggregator::new(Arc::clone(&source)),
            team_records: TeamRecordResolver::new(source, options.team_ids),
            pacer,
            batch_size: options.batch_size.max(1),
            failure_delay: options.failure_delay,
        }
    }

    pub fn from_config(source: Arc<dyn StatsSource>, config: &Config) -> Result<Self, ConfigError> {
        let pacer = RandomDelay::from_millis(
            config.collection.min_delay_ms,
            config.collection.max_delay_ms,
        );
        Ok(Self::new(
            source,
            CollectorOptions::from_config(config)?,
            Arc::new(pacer),
        ))
    }

    /// Run every roster entry in order, committing to `store` every
    /// `batch_size` new results and once more at the end.
    pub async fn run(
        &mut self,
        roster: &[RosterEntry],
        store: &mut CheckpointStore,
    ) -> Result<RunSummary, CheckpointError> {
        let total = roster.len();
        let mut summary = RunSummary {
            total,
            ..RunSummary::default()
        };
        let mut buffer: Vec<EnrichedResult> = Vec::with_capacity(self.batch_size);
        let mut buffered: HashSet<CheckpointKey> = HashSet::new();

        info!(
            entries = total,
            completed = store.len(),
            "starting collection"
        );

        for (idx, entry) in roster.iter().enumerate() {
            let position = idx + 1;
            let key = entry.key();

            if buffered.contains(&key) {
                info!(position, total, %key, "already collected, skipping");
                summary.skipped += 1;
                continue;
            }

            match self.process(entry, roster, store).await {
                EntryOutcome::Skipped => {
                    info!(position, total, %key, "already collected, skipping");
                    summary.skipped += 1;
                }
                EntryOutcome::Collected(result) => {
                    info!(
                        position,
                        total,
                        %key,
                        pts = result.averages.points,
                        reb = result.averages.rebounds,
                        ast = result.averages.assists,
                        record = %result.team_record,
                        "stats collected"
                    );
                    buffered.insert(key);
                    buffer.push(*result);
                    summary.collected += 1;

                    if buffer.len() >= self.batch_size {
                        Self::flush(store, &mut buffer, &mut buffered)?;
                        summary.flushes += 1;
                    }
                    self.pacer.pause().await;
                }
                EntryOutcome::Failed(failure) => {
                    warn!(
                        position,
                        total,
                        %key,
                        reason = %failure,
                        "entry skipped, will retry next run"
                    );
                    summary.failed.push((key, failure.to_string()));
                    if !self.failure_delay.is_zero() {
                        sleep(self.failure_delay).await;
                    }
                }
            }
        }

        if !buffer.is_empty() {
            Self::flush(store, &mut buffer, &mut buffered)?;
            summary.flushes += 1;
        }

        Ok(summary)
    }

    /// Process one entry against the current checkpoint without committing.
    pub(crate) async fn process(
        &mut self,
        entry: &RosterEntry,
        roster: &[RosterEntry],
        store: &CheckpointStore,
    ) -> EntryOutcome {
        if store.contains(&entry.key()) {
            return EntryOutcome::Skipped;
        }
        debug!(key = %entry.key(), "processing");
        match self.enrich(entry, roster).await {
            Ok(result) => EntryOutcome::Collected(Box::new(result)),
            Err(failure) => EntryOutcome::Failed(failure),
        }
    }

    async fn enrich(
        &mut self,
        entry: &RosterEntry,
        roster: &[RosterEntry],
    ) -> Result<EnrichedResult, EntryFailure> {
        let identity = self.identity.resolve(&entry.candidate, &entry.season).await?;
        debug!(player_id = %identity.player_id, "found player id");

        let averages = self
            .aggregator
            .aggregate(&identity.player_id, &entry.season)
            .await?;
        let team_record = self
            .team_records
            .resolve(&averages.team, &entry.season)
            .await;
        let past_winner = was_past_winner(&entry.candidate, &entry.season, roster);

        Ok(EnrichedResult {
            entry: entry.clone(),
            averages,
            team_record,
            past_winner,
            advanced: AdvancedMetrics::default(),
        })
    }

    fn flush(
        store: &mut CheckpointStore,
        buffer: &mut Vec<EnrichedResult>,
        buffered: &mut HashSet<CheckpointKey>,
    ) -> Result<(), CheckpointError> {
        let batch = std::mem::take(buffer);
        let size = batch.len();
        let added = store.commit(batch)?;
        buffered.clear();
        info!(batch = size, added, total = store.len(), "progress saved");
        Ok(())
    }
}
