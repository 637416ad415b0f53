//! Campaign status lifecycle.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::Result;
use crate::campaign::CampaignStatus;
use crate::store::CampaignStore;

/// Status a campaign should have at `now`.
///
/// Inside `[start, end)` the campaign is started; at or after `end` it is
/// finished; before `start` it keeps whatever status it had.
#[must_use]
pub fn compute_status(
    now: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    current: CampaignStatus,
) -> CampaignStatus {
    if start <= now && now < end {
        CampaignStatus::Started
    } else if now >= end {
        CampaignStatus::Finished
    } else {
        current
    }
}

/// Recompute and persist the status of every campaign.
///
/// Only campaigns whose status changes are written. Returns how many were.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub async fn update_statuses(store: &dyn CampaignStore, now: DateTime<Utc>) -> Result<usize> {
    let mut changed = 0;

    for campaign in store.list_all().await? {
        let status = compute_status(now, campaign.start_time, campaign.end_time, campaign.status);
        if status == campaign.status {
            continue;
        }

        store.save_status(campaign.id, status).await?;
        debug!(
            campaign = %campaign.id,
            from = %campaign.status,
            to = %status,
            "Campaign status changed"
        );
        changed += 1;
    }

    Ok(changed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn t() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, 12, 0, 0).unwrap()
    }

    fn status_strategy() -> impl Strategy<Value = CampaignStatus> {
        prop::sample::select(CampaignStatus::ALL.to_vec())
    }

    #[test]
    fn test_window_open_starts() {
        let now = t();
        let status = compute_status(
            now,
            now - Duration::hours(1),
            now + Duration::hours(1),
            CampaignStatus::Created,
        );
        assert_eq!(status, CampaignStatus::Started);
    }

    #[test]
    fn test_window_closed_finishes_from_any_status() {
        let now = t();
        for current in CampaignStatus::ALL {
            let status = compute_status(
                now,
                now - Duration::days(2),
                now - Duration::minutes(1),
                current,
            );
            assert_eq!(status, CampaignStatus::Finished);
        }
    }

    #[test]
    fn test_boundaries() {
        let now = t();
        // start is inclusive, end is exclusive
        assert_eq!(
            compute_status(now, now, now + Duration::seconds(1), CampaignStatus::Created),
            CampaignStatus::Started
        );
        assert_eq!(
            compute_status(now, now - Duration::seconds(1), now, CampaignStatus::Started),
            CampaignStatus::Finished
        );
    }

    #[test]
    fn test_before_window_keeps_status() {
        let now = t();
        for current in CampaignStatus::ALL {
            assert_eq!(
                compute_status(now, now + Duration::hours(1), now + Duration::hours(2), current),
                current
            );
        }
    }

    #[test]
    fn test_inverted_window_never_starts() {
        let now = t();
        let start = now - Duration::hours(1);
        let end = now - Duration::hours(2);
        assert_eq!(
            compute_status(now, start, end, CampaignStatus::Created),
            CampaignStatus::Finished
        );
        let before = end - Duration::hours(1);
        assert_eq!(
            compute_status(before, start, end, CampaignStatus::Created),
            CampaignStatus::Created
        );
    }

    proptest! {
        #[test]
        fn prop_status_matches_window(
            now in -1_000_000i64..1_000_000,
            start in -1_000_000i64..1_000_000,
            end in -1_000_000i64..1_000_000,
            current in status_strategy(),
        ) {
            let base = t();
            let now = base + Duration::seconds(now);
            let start = base + Duration::seconds(start);
            let end = base + Duration::seconds(end);

            let status = compute_status(now, start, end, current);

            let before_window = now < start && now < end;
            prop_assert_eq!(
                status == CampaignStatus::Started,
                (start <= now && now < end) || (before_window && current == CampaignStatus::Started)
            );
            prop_assert_eq!(
                status == CampaignStatus::Finished,
                now >= end || (before_window && current == CampaignStatus::Finished)
            );
            if before_window {
                prop_assert_eq!(status, current);
            }
        }

        #[test]
        fn prop_compute_status_is_idempotent(
            now in -1_000_000i64..1_000_000,
            start in -1_000_000i64..1_000_000,
            len in 0i64..1_000_000,
            current in status_strategy(),
        ) {
            let base = t();
            let now = base + Duration::seconds(now);
            let start = base + Duration::seconds(start);
            let end = start + Duration::seconds(len);

            let once = compute_status(now, start, end, current);
            prop_assert_eq!(compute_status(now, start, end, once), once);
        }
    }
}
