//! Shared fixtures for the dispatch engine tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use mailcron_core::{
    AudienceRepository, Campaign, CampaignRepository, Config, Database, DeliveryLog,
    DeliveryLogEntry, DeliveryLogRepository, GroupId, MailTransport, MailingService, NewCampaign,
    NewRecipient, OutgoingMessage, PeriodId, Recipient, RepeatPeriod, TransportError,
};

type Script = dyn Fn(&OutgoingMessage) -> Result<usize, TransportError> + Send + Sync;

/// Transport that answers from a script and remembers what it was asked to send.
pub struct MockTransport {
    script: Box<Script>,
    delay: Option<StdDuration>,
    sent: Mutex<Vec<OutgoingMessage>>,
}

impl MockTransport {
    pub fn new(
        script: impl Fn(&OutgoingMessage) -> Result<usize, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            delay: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Every address accepted.
    pub fn accepting() -> Self {
        Self::new(|message| Ok(message.to.len()))
    }

    /// Holds each send for `delay` before answering.
    pub fn slow(mut self, delay: StdDuration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, email: &str) -> usize {
        self.sent()
            .iter()
            .filter(|m| m.to.iter().any(|to| to == email))
            .count()
    }
}

#[async_trait]
impl MailTransport for MockTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<usize, TransportError> {
        self.sent.lock().unwrap().push(message.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.script)(message)
    }
}

/// One database with a weekly period, a group and its members.
pub struct Fixture {
    pub db: Database,
    pub campaigns: CampaignRepository,
    pub audience: AudienceRepository,
    pub log: DeliveryLogRepository,
    pub weekly: PeriodId,
    pub group: GroupId,
    pub recipients: Vec<Recipient>,
}

impl Fixture {
    pub async fn new(emails: &[&str]) -> Self {
        let db = Database::in_memory().await.unwrap();
        let campaigns = CampaignRepository::new(&db);
        let audience = AudienceRepository::new(&db);
        let log = DeliveryLogRepository::new(&db);

        let weekly = campaigns
            .create_period(&RepeatPeriod::weekly())
            .await
            .unwrap()
            .id
            .unwrap();
        let group = audience.create_group("Subscribers").await.unwrap().id;

        let mut recipients = Vec::new();
        for (i, email) in emails.iter().enumerate() {
            let recipient = audience
                .create_recipient(&NewRecipient::new(format!("Reader{i}"), "Test", *email))
                .await
                .unwrap();
            audience.add_member(group, recipient.id).await.unwrap();
            recipients.push(recipient);
        }

        Self {
            db,
            campaigns,
            audience,
            log,
            weekly,
            group,
            recipients,
        }
    }

    /// Campaign for the fixture group with a weekly period.
    pub async fn campaign(
        &self,
        title: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Campaign {
        self.campaign_for(self.group, title, start_time, end_time)
            .await
    }

    pub async fn campaign_for(
        &self,
        group_id: GroupId,
        title: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Campaign {
        self.campaigns
            .create(&NewCampaign {
                name: title.to_string(),
                title: title.to_string(),
                body: format!("{title} body"),
                start_time,
                end_time,
                period_id: self.weekly,
                group_id,
            })
            .await
            .unwrap()
    }

    /// A campaign whose window is open at `now`.
    pub async fn running_campaign(&self, title: &str, now: DateTime<Utc>) -> Campaign {
        self.campaign(title, now - Duration::hours(1), now + Duration::hours(1))
            .await
    }

    pub fn service(&self, transport: Arc<dyn MailTransport>) -> MailingService {
        MailingService::from_database(&self.db, transport, &Config::default())
    }

    pub async fn entries(&self, campaign: &Campaign) -> Vec<DeliveryLogEntry> {
        self.log.list(Some(campaign.id), 1000).await.unwrap()
    }

    pub async fn last_entry(
        &self,
        campaign: &Campaign,
        recipient: &Recipient,
    ) -> Option<DeliveryLogEntry> {
        self.log.most_recent(campaign.id, recipient.id).await.unwrap()
    }
}
