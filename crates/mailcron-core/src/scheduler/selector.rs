//! Due-recipient selection.

use chrono::{DateTime, Duration, Utc};

use crate::Result;
use crate::audience::Recipient;
use crate::campaign::{Campaign, CampaignStatus};
use crate::delivery::DeliveryLogEntry;
use crate::store::DeliveryLog;

/// Whether a recipient should be mailed again at `now`.
///
/// Never-mailed recipients are always due. Otherwise a full repeat period
/// must have passed since the last attempt, whatever its outcome; the
/// boundary itself counts as due.
#[must_use]
pub fn is_due(
    last: Option<&DeliveryLogEntry>,
    repeat_period: Duration,
    now: DateTime<Utc>,
) -> bool {
    last.is_none_or(|entry| now - entry.timestamp >= repeat_period)
}

/// Members of a campaign's group that are due at `now`.
///
/// Campaigns that are not started yield nobody.
///
/// # Errors
///
/// Returns an error if the delivery log cannot be read.
pub async fn select_due(
    log: &dyn DeliveryLog,
    campaign: &Campaign,
    members: Vec<Recipient>,
    now: DateTime<Utc>,
) -> Result<Vec<Recipient>> {
    if campaign.status != CampaignStatus::Started {
        return Ok(Vec::new());
    }

    let mut due = Vec::with_capacity(members.len());
    for recipient in members {
        let last = log.most_recent(campaign.id, recipient.id).await?;
        if is_due(last.as_ref(), campaign.repeat_period, now) {
            due.push(recipient);
        }
    }

    Ok(due)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::audience::RecipientId;
    use crate::campaign::CampaignId;
    use crate::delivery::DeliveryOutcome;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, 12, 0, 0).unwrap()
    }

    fn sent_at(timestamp: DateTime<Utc>, outcome: DeliveryOutcome) -> DeliveryLogEntry {
        DeliveryLogEntry::at(timestamp, CampaignId(1), RecipientId(1), outcome)
    }

    #[test]
    fn test_never_sent_is_due() {
        assert!(is_due(None, Duration::days(7), now()));
    }

    #[test]
    fn test_week_boundary() {
        let week = Duration::days(7);

        let just_over = sent_at(now() - week - Duration::seconds(1), DeliveryOutcome::Success);
        assert!(is_due(Some(&just_over), week, now()));

        let just_under = sent_at(now() - week + Duration::seconds(1), DeliveryOutcome::Success);
        assert!(!is_due(Some(&just_under), week, now()));

        let exactly = sent_at(now() - week, DeliveryOutcome::Success);
        assert!(is_due(Some(&exactly), week, now()));
    }

    #[test]
    fn test_failed_attempts_reset_the_clock() {
        let week = Duration::days(7);
        for outcome in [
            DeliveryOutcome::Failed,
            DeliveryOutcome::Error("connection refused".to_string()),
        ] {
            let recent = sent_at(now() - Duration::hours(1), outcome);
            assert!(!is_due(Some(&recent), week, now()));
        }
    }

    #[test]
    fn test_future_entry_is_not_due() {
        let ahead = sent_at(now() + Duration::minutes(5), DeliveryOutcome::Success);
        assert!(!is_due(Some(&ahead), Duration::days(1), now()));
    }
}
