//! Resumable collection of per-season player statistics for award candidates.
//!
//! The collector walks a vote table, resolves each candidate against the
//! stats source, reduces their game log to season averages, attaches the
//! team's record and a past-winner flag, and checkpoints results to a CSV
//! table so an interrupted run continues where it stopped.

pub mod aggregate;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod identity;
pub mod model;
pub mod orchestrator;
pub mod pacing;
pub mod report;
pub mod roster;
pub mod source;
pub mod team_record;

#[cfg(test)]
pub(crate) mod testing;

pub use checkpoint::CheckpointStore;
pub use config::Config;
pub use orchestrator::{Collector, CollectorOptions, RunSummary};
pub use source::{NbaStatsClient, StatsSource};
