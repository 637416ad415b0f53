//! One scheduler tick over every campaign.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::dispatch::Dispatcher;
use super::locks::PairLocks;
use super::selector::{is_due, select_due};
use super::status::update_statuses;
use crate::audience::{AudienceRepository, Recipient};
use crate::campaign::{Campaign, CampaignRepository, CampaignStatus};
use crate::config::Config;
use crate::db::Database;
use crate::delivery::{DeliveryLogRepository, DeliveryOutcome};
use crate::store::{CampaignStore, DeliveryLog, RecipientDirectory};
use crate::transport::MailTransport;
use crate::{Error, Result};

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Campaigns whose status changed.
    pub status_changes: usize,
    /// Started campaigns processed.
    pub campaigns: usize,
    /// Send attempts made (one log entry each).
    pub attempted: usize,
    /// Attempts that delivered.
    pub succeeded: usize,
    /// Attempts nobody accepted.
    pub failed: usize,
    /// Attempts that raised a transport error.
    pub errored: usize,
    /// Campaigns or recipients skipped because a reference did not resolve.
    pub skipped: usize,
}

impl TickReport {
    fn record(&mut self, outcome: &DeliveryOutcome) {
        self.attempted += 1;
        match outcome {
            DeliveryOutcome::Success => self.succeeded += 1,
            DeliveryOutcome::Failed => self.failed += 1,
            DeliveryOutcome::Error(_) => self.errored += 1,
        }
    }

    fn merge(&mut self, other: &Self) {
        self.status_changes += other.status_changes;
        self.campaigns += other.campaigns;
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.errored += other.errored;
        self.skipped += other.skipped;
    }
}

/// The batch driver: status transitions, due selection and dispatch.
///
/// Cheap to clone; clones share stores, the send limit and the pair locks,
/// so overlapping ticks from one service never double-send to a recipient.
#[derive(Clone)]
pub struct MailingService {
    campaigns: Arc<dyn CampaignStore>,
    directory: Arc<dyn RecipientDirectory>,
    log: Arc<dyn DeliveryLog>,
    dispatcher: Dispatcher,
    send_limit: Arc<Semaphore>,
    locks: Arc<PairLocks>,
}

impl std::fmt::Debug for MailingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailingService")
            .field("dispatcher", &self.dispatcher)
            .field("available_sends", &self.send_limit.available_permits())
            .finish_non_exhaustive()
    }
}

impl MailingService {
    /// Creates a service over the given stores and transport.
    ///
    /// `max_concurrent_sends` is clamped to at least one.
    #[must_use]
    pub fn new(
        campaigns: Arc<dyn CampaignStore>,
        directory: Arc<dyn RecipientDirectory>,
        log: Arc<dyn DeliveryLog>,
        transport: Arc<dyn MailTransport>,
        config: &Config,
    ) -> Self {
        let dispatcher = Dispatcher::new(transport, Arc::clone(&log), config.sender.clone());
        Self {
            campaigns,
            directory,
            log,
            dispatcher,
            send_limit: Arc::new(Semaphore::new(config.dispatch.max_concurrent_sends.max(1))),
            locks: Arc::new(PairLocks::new()),
        }
    }

    /// Creates a service backed by the `SQLite` repositories of `db`.
    #[must_use]
    pub fn from_database(
        db: &Database,
        transport: Arc<dyn MailTransport>,
        config: &Config,
    ) -> Self {
        Self::new(
            Arc::new(CampaignRepository::new(db)),
            Arc::new(AudienceRepository::new(db)),
            Arc::new(DeliveryLogRepository::new(db)),
            transport,
            config,
        )
    }

    /// Runs one tick at the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if a store fails; per-recipient send failures are
    /// logged, not returned.
    pub async fn tick(&self) -> Result<TickReport> {
        self.tick_at(Utc::now()).await
    }

    /// Runs one tick as if the time were `now`.
    ///
    /// Log entries are still stamped with the wall clock when each attempt
    /// finishes.
    ///
    /// # Errors
    ///
    /// Returns an error if a store fails. All in-flight work is allowed to
    /// finish first, so every attempt made is also logged.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let mut report = TickReport {
            status_changes: update_statuses(self.campaigns.as_ref(), now).await?,
            ..TickReport::default()
        };

        let started = self.campaigns.list_by_status(CampaignStatus::Started).await?;
        if started.is_empty() {
            debug!("No started campaigns");
            return Ok(report);
        }

        let mut tasks = JoinSet::new();
        for campaign in started {
            let service = self.clone();
            tasks.spawn(async move { service.run_campaign(campaign, now).await });
        }

        let first_error = collect(&mut tasks, |campaign_report| report.merge(&campaign_report)).await;
        if let Some(e) = first_error {
            return Err(e);
        }

        info!(
            status_changes = report.status_changes,
            campaigns = report.campaigns,
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            errored = report.errored,
            skipped = report.skipped,
            "Tick complete"
        );
        Ok(report)
    }

    async fn run_campaign(&self, campaign: Campaign, now: DateTime<Utc>) -> Result<TickReport> {
        let mut report = TickReport {
            campaigns: 1,
            ..TickReport::default()
        };

        let members = match self.directory.members_of(campaign.group_id).await {
            Ok(members) => members,
            Err(Error::NotFound(what)) => {
                warn!(campaign = %campaign.id, missing = %what, "Skipping campaign");
                report.skipped += 1;
                return Ok(report);
            }
            Err(e) => return Err(e),
        };

        let due = select_due(self.log.as_ref(), &campaign, members, now).await?;
        debug!(campaign = %campaign.id, due = due.len(), "Recipients due");

        let campaign = Arc::new(campaign);
        let mut tasks = JoinSet::new();
        for recipient in due {
            let service = self.clone();
            let campaign = Arc::clone(&campaign);
            tasks.spawn(async move { service.send_one(&campaign, recipient, now).await });
        }

        let first_error = collect(&mut tasks, |outcome| {
            if let Some(outcome) = outcome {
                report.record(&outcome);
            }
        })
        .await;

        first_error.map_or(Ok(report), Err)
    }

    /// Sends to one recipient unless another attempt got there first.
    ///
    /// Returns `None` when the recipient stopped being due while waiting
    /// for the pair lock.
    async fn send_one(
        &self,
        campaign: &Campaign,
        recipient: Recipient,
        now: DateTime<Utc>,
    ) -> Result<Option<DeliveryOutcome>> {
        let _permit = self
            .send_limit
            .acquire()
            .await
            .map_err(|e| Error::Task(e.to_string()))?;
        let _guard = self.locks.acquire(campaign.id, recipient.id).await;

        let last = self.log.most_recent(campaign.id, recipient.id).await?;
        if !is_due(last.as_ref(), campaign.repeat_period, now) {
            debug!(
                campaign = %campaign.id,
                recipient = %recipient.id,
                "Recipient already handled by a concurrent tick"
            );
            return Ok(None);
        }

        let entry = self.dispatcher.dispatch(campaign, &recipient).await?;
        Ok(Some(entry.outcome))
    }
}

/// Drains a join set, feeding successes to `on_ok` and keeping the first error.
async fn collect<T: 'static>(
    tasks: &mut JoinSet<Result<T>>,
    mut on_ok: impl FnMut(T),
) -> Option<Error> {
    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let result = joined.map_err(|e| Error::Task(e.to_string())).and_then(|r| r);
        match result {
            Ok(value) => on_ok(value),
            Err(e) => {
                warn!(error = %e, "Tick task failed");
                first_error.get_or_insert(e);
            }
        }
    }
    first_error
}
