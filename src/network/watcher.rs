//! Feeds the change feed from the database change log.
//!
//! Every connection to the same database file (another window, the `post`
//! subcommand) appends to the log, so polling it is what makes writes from
//! other processes show up live.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;

use super::feed::ChangeFeed;
use crate::common::FeedEvent;
use crate::error::Result;

/// Polls between prunes of the change log.
const PRUNE_EVERY: u64 = 240;

/// A slice of the change log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBatch {
    /// Sequence number of the last entry read, or the requested cursor if
    /// nothing was read.
    pub last_seq: i64,
    pub events: Vec<FeedEvent>,
}

/// Ordered record of row changes, readable from a cursor.
pub trait ChangeLog: Send + Sync + 'static {
    fn latest_change(&self) -> Result<i64>;

    fn changes_since(&self, after: i64, limit: usize) -> Result<ChangeBatch>;

    /// Forget entries recorded before `cutoff_ms` (Unix milliseconds).
    fn prune_before(&self, cutoff_ms: i64) -> Result<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherSettings {
    pub interval: Duration,
    pub batch_size: usize,
    pub retention: Duration,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
            batch_size: 100,
            retention: Duration::from_secs(600),
        }
    }
}

pub struct ChangeWatcher<L> {
    log: Arc<L>,
    feed: Arc<ChangeFeed>,
    settings: WatcherSettings,
    cursor: i64,
}

impl<L: ChangeLog> ChangeWatcher<L> {
    /// Starts at the newest change. Anything older reaches pages through
    /// their bulk load.
    pub fn new(log: Arc<L>, feed: Arc<ChangeFeed>, settings: WatcherSettings) -> Result<Self> {
        let cursor = log.latest_change()?;
        Ok(Self {
            log,
            feed,
            settings,
            cursor,
        })
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Publish everything recorded since the last poll. Returns how many
    /// events were published.
    pub fn poll_once(&mut self) -> Result<usize> {
        let mut published = 0;
        loop {
            let batch = self
                .log
                .changes_since(self.cursor, self.settings.batch_size.max(1))?;
            if batch.last_seq == self.cursor {
                return Ok(published);
            }
            for event in &batch.events {
                self.feed.publish(event);
                published += 1;
            }
            self.cursor = batch.last_seq;
        }
    }

    pub fn prune(&self) -> Result<usize> {
        let retention = i64::try_from(self.settings.retention.as_millis()).unwrap_or(i64::MAX);
        let cutoff = Utc::now().timestamp_millis().saturating_sub(retention);
        self.log.prune_before(cutoff)
    }

    pub async fn run(mut self) {
        log::info!("Change watcher started at change {}", self.cursor);
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls: u64 = 0;

        loop {
            ticker.tick().await;
            polls += 1;
            let prune_due = polls % PRUNE_EVERY == 0;

            let joined = tokio::task::spawn_blocking(move || {
                if let Err(err) = self.poll_once() {
                    log::warn!("Failed to read change log: {err}");
                }
                if prune_due {
                    match self.prune() {
                        Ok(0) => {}
                        Ok(pruned) => log::debug!("Pruned {pruned} change log entries"),
                        Err(err) => log::warn!("Failed to prune change log: {err}"),
                    }
                }
                self
            })
            .await;

            self = match joined {
                Ok(watcher) => watcher,
                Err(err) => {
                    log::error!("Change watcher stopped: {err}");
                    return;
                }
            };
        }
    }
}
