//! Recency classifier: last-contact timestamp → lifecycle status.
//!
//! Rules, applied in order:
//! 1. never contacted → `stalled`
//! 2. `days <= active_days` → `active`
//! 3. `needs_followup_min_days <= days <= needs_followup_max_days` → `needs_followup`
//! 4. anything else → `stalled` (including the gap between the active and
//!    follow-up windows)

use chrono::{DateTime, Utc};
use followup_core::config::ClassifierConfig;
use followup_core::types::LeadStatus;

/// Reported by [`days_since_contact`] for prospects never contacted.
pub const NEVER_CONTACTED_DAYS: i64 = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierThresholds {
    pub active_days: i64,
    pub needs_followup_min_days: i64,
    pub needs_followup_max_days: i64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self::from(&ClassifierConfig::default())
    }
}

impl From<&ClassifierConfig> for ClassifierThresholds {
    fn from(config: &ClassifierConfig) -> Self {
        Self {
            active_days: config.active_days,
            needs_followup_min_days: config.needs_followup_min_days,
            needs_followup_max_days: config.needs_followup_max_days,
        }
    }
}

/// Whole elapsed days, or [`NEVER_CONTACTED_DAYS`].
pub fn days_since_contact(last_contacted: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    match last_contacted {
        Some(at) => elapsed_days(at, now),
        None => NEVER_CONTACTED_DAYS,
    }
}

pub fn classify(
    last_contacted: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    thresholds: &ClassifierThresholds,
) -> LeadStatus {
    let Some(at) = last_contacted else {
        return LeadStatus::Stalled;
    };
    let days = elapsed_days(at, now);

    if days <= thresholds.active_days {
        LeadStatus::Active
    } else if (thresholds.needs_followup_min_days..=thresholds.needs_followup_max_days)
        .contains(&days)
    {
        LeadStatus::NeedsFollowup
    } else {
        LeadStatus::Stalled
    }
}

/// Floor of the elapsed duration in days.
fn elapsed_days(at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - at).num_seconds().div_euclid(86_400)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn status_after(days: i64) -> LeadStatus {
        classify(
            Some(now() - Duration::days(days)),
            now(),
            &ClassifierThresholds::default(),
        )
    }

    #[test]
    fn test_reference_points() {
        assert_eq!(status_after(2), LeadStatus::Active);
        assert_eq!(status_after(10), LeadStatus::NeedsFollowup);
        assert_eq!(status_after(30), LeadStatus::Stalled);
        assert_eq!(
            classify(None, now(), &ClassifierThresholds::default()),
            LeadStatus::Stalled
        );
    }

    #[test]
    fn test_boundaries_inclusive() {
        assert_eq!(status_after(3), LeadStatus::Active);
        assert_eq!(status_after(7), LeadStatus::NeedsFollowup);
        assert_eq!(status_after(20), LeadStatus::NeedsFollowup);
        assert_eq!(status_after(21), LeadStatus::Stalled);
    }

    #[test]
    fn test_gap_between_windows_is_stalled() {
        for days in 4..7 {
            assert_eq!(status_after(days), LeadStatus::Stalled, "day {days}");
        }
    }

    #[test]
    fn test_partial_days_floor() {
        let at = now() - Duration::days(3) - Duration::hours(23);
        assert_eq!(days_since_contact(Some(at), now()), 3);
        assert_eq!(
            classify(Some(at), now(), &ClassifierThresholds::default()),
            LeadStatus::Active
        );
    }

    #[test]
    fn test_never_contacted_sentinel() {
        assert_eq!(days_since_contact(None, now()), NEVER_CONTACTED_DAYS);
    }

    #[test]
    fn test_custom_thresholds() {
        let t = ClassifierThresholds {
            active_days: 1,
            needs_followup_min_days: 2,
            needs_followup_max_days: 4,
        };
        let at = |d| Some(now() - Duration::days(d));
        assert_eq!(classify(at(1), now(), &t), LeadStatus::Active);
        assert_eq!(classify(at(2), now(), &t), LeadStatus::NeedsFollowup);
        assert_eq!(classify(at(5), now(), &t), LeadStatus::Stalled);
    }

    proptest! {
        #[test]
        fn prop_classify_agrees_with_day_count(secs in 0i64..(60 * 86_400)) {
            let at = now() - Duration::seconds(secs);
            let days = days_since_contact(Some(at), now());
            prop_assert_eq!(days, secs / 86_400);

            let expected = if days <= 3 {
                LeadStatus::Active
            } else if (7..=20).contains(&days) {
                LeadStatus::NeedsFollowup
            } else {
                LeadStatus::Stalled
            };
            prop_assert_eq!(classify(Some(at), now(), &ClassifierThresholds::default()), expected);
        }

        #[test]
        fn prop_older_contact_never_more_active(a in 0i64..60, b in 0i64..60) {
            // Once past the follow-up window nothing moves back to active.
            let (young, old) = if a <= b { (a, b) } else { (b, a) };
            if status_after(young) == LeadStatus::Stalled && young > 20 {
                prop_assert_eq!(status_after(old), LeadStatus::Stalled);
            }
            if status_after(old) == LeadStatus::Active {
                prop_assert_eq!(status_after(young), LeadStatus::Active);
            }
        }
    }
}
