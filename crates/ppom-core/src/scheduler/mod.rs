//! Paced background downloads and the periodic manifest sync.
//!
//! Two kinds of task may run at once, each owned through its `JoinHandle`:
//!
//! - the **periodic sync**: prune inactive chains, run
//!   [`ManifestSync::update_all`], hand any backlog to the backlog task
//! - the **backlog drain**: one file per tick, spread so the whole backlog
//!   finishes inside the configured window
//!
//! Neither task touches the engine handle, so both run outside the session
//! lock. The eager current-chain fetch ([`FetchScheduler::fetch_chain_now`])
//! is the exception: it runs inline for the caller and propagates failures.

use chrono::Utc;
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{interval, interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::{
    manifest::{ManifestError, ManifestSync, SyncOutcome},
    metrics::{self, FetchMode},
    types::FileDescriptor,
};

/// Pacing for background downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Upper bound on the delay between two background downloads.
    pub file_fetch_tick: Duration,
    /// Time budget for draining a whole backlog.
    pub file_fetch_window: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            file_fetch_tick: Duration::from_secs(300),
            file_fetch_window: Duration::from_secs(3600),
        }
    }
}

#[derive(Default)]
struct ScheduledTasks {
    periodic: Option<JoinHandle<()>>,
    backlog: Option<JoinHandle<()>>,
}

/// Owns the background tasks that keep data files fresh.
///
/// Methods that spawn take `self: &Arc<Self>`; hold the scheduler in an `Arc`.
pub struct FetchScheduler {
    sync: Arc<ManifestSync>,
    config: SchedulerConfig,
    tasks: Mutex<ScheduledTasks>,
}

impl FetchScheduler {
    #[must_use]
    pub fn new(sync: Arc<ManifestSync>, config: SchedulerConfig) -> Self {
        Self { sync, config, tasks: Mutex::new(ScheduledTasks::default()) }
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Eagerly fetches every missing file of the current chain.
    ///
    /// # Errors
    ///
    /// See [`Self::fetch_chain_now`].
    pub async fn fetch_current_chain_now(self: &Arc<Self>) -> Result<(), ManifestError> {
        match self.sync.chains().current_chain() {
            Some(chain_id) => self.fetch_chain_now(&chain_id).await,
            None => {
                debug!("no current chain to fetch");
                Ok(())
            }
        }
    }

    /// Refreshes the manifest, then fetches the missing files of `chain_id`
    /// one after another and marks the chain fetched.
    ///
    /// Backlog for other chains uncovered by the refresh is scheduled in the
    /// background.
    ///
    /// # Errors
    ///
    /// The first manifest or file failure aborts the fetch and is returned;
    /// the chain then stays flagged as needing data.
    pub async fn fetch_chain_now(self: &Arc<Self>, chain_id: &str) -> Result<(), ManifestError> {
        let backlog: Vec<FileDescriptor> = self
            .sync
            .update_all()
            .await?
            .into_backlog()
            .into_iter()
            .filter(|descriptor| descriptor.chain_id != chain_id)
            .collect();
        if !backlog.is_empty() {
            self.schedule_all_chains(backlog, self.config.file_fetch_window);
        }

        let missing = self.sync.storage().missing_files(&self.sync.manifest(), chain_id);
        debug!(chain_id = %chain_id, files = missing.len(), "fetching current chain data");
        for descriptor in &missing {
            self.sync.fetch_and_store(descriptor, FetchMode::Eager).await?;
        }

        self.sync.chains().mark_fetched(chain_id);
        Ok(())
    }

    /// Delay between two background downloads for a backlog of `pending` files.
    #[must_use]
    pub fn tick_interval(&self, pending: usize, total_window: Duration) -> Duration {
        let slots = u32::try_from(pending.saturating_add(1)).unwrap_or(u32::MAX);
        (total_window / slots).min(self.config.file_fetch_tick).max(Duration::from_millis(1))
    }

    /// Replaces any pending background schedule with one draining `files`.
    ///
    /// The first download happens one interval from now.
    pub fn schedule_all_chains(self: &Arc<Self>, files: Vec<FileDescriptor>, total_window: Duration) {
        let mut tasks = self.tasks.lock();
        if let Some(previous) = tasks.backlog.take() {
            if !previous.is_finished() {
                debug!("cancelling previous fetch schedule");
            }
            previous.abort();
        }
        if files.is_empty() {
            return;
        }

        let period = self.tick_interval(files.len(), total_window);
        info!(
            files = files.len(),
            interval_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
            "scheduled background file fetch"
        );

        let this = Arc::clone(self);
        tasks.backlog = Some(tokio::spawn(async move { this.drain_backlog(files, period).await }));
    }

    async fn drain_backlog(&self, mut pending: Vec<FileDescriptor>, period: Duration) {
        let chains = self.sync.chains();
        let storage = self.sync.storage();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while let Some(descriptor) = pending.pop() {
            ticker.tick().await;

            let chain_id = descriptor.chain_id.as_str();
            if !chains.is_tracked(chain_id) {
                debug!(file = %descriptor.key(), "chain no longer tracked, skipping file");
                metrics::record_file_fetch(FetchMode::Background, "skipped");
                continue;
            }

            if storage.metadata().iter().any(|entry| descriptor.matches(entry)) {
                metrics::record_file_fetch(FetchMode::Background, "skipped");
            } else if let Err(e) = self.sync.fetch_and_store(&descriptor, FetchMode::Background).await
            {
                warn!(file = %descriptor.key(), error = %e, "background file fetch failed");
            }

            let chain_queued = pending.iter().any(|next| next.chain_id == chain_id);
            if !chain_queued && storage.missing_files(&self.sync.manifest(), chain_id).is_empty() {
                chains.mark_fetched(chain_id);
            }
        }

        debug!("background fetch backlog drained");
    }

    /// Starts the periodic sync: once now, then every `period`.
    ///
    /// Restarting replaces the previous periodic task.
    pub fn start_periodic(self: &Arc<Self>, period: Duration) {
        let mut tasks = self.tasks.lock();
        if let Some(previous) = tasks.periodic.take() {
            previous.abort();
        }

        info!(interval_secs = period.as_secs(), "starting periodic manifest sync");
        let this = Arc::clone(self);
        tasks.periodic = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                this.run_periodic_sync().await;
            }
        }));
    }

    async fn run_periodic_sync(self: &Arc<Self>) {
        let pruned = self.sync.chains().prune(Utc::now());
        if !pruned.is_empty() {
            info!(chains = ?pruned, "pruned inactive chains");
        }

        match self.sync.update_all().await {
            Ok(SyncOutcome::Updated { backlog }) => {
                self.schedule_all_chains(backlog, self.config.file_fetch_window);
            }
            Ok(SyncOutcome::Unchanged) => {
                if !self.backlog_running() {
                    let pending = self.sync.pending_files();
                    if !pending.is_empty() {
                        debug!(files = pending.len(), "retrying missing files");
                        self.schedule_all_chains(pending, self.config.file_fetch_window);
                    }
                }
            }
            Err(e) => error!(error = %e, "periodic manifest sync failed"),
        }
    }

    /// Returns `true` while the periodic sync is scheduled.
    #[must_use]
    pub fn is_periodic_running(&self) -> bool {
        self.tasks.lock().periodic.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Returns `true` while a backlog is being drained.
    #[must_use]
    pub fn backlog_running(&self) -> bool {
        self.tasks.lock().backlog.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Cancels the periodic sync and any pending backlog. Idempotent.
    pub fn stop(&self) {
        let mut tasks = self.tasks.lock();
        let periodic = tasks.periodic.take();
        let backlog = tasks.backlog.take();
        if periodic.is_none() && backlog.is_none() {
            return;
        }
        for task in periodic.into_iter().chain(backlog) {
            task.abort();
        }
        info!("background fetch scheduler stopped");
    }
}
