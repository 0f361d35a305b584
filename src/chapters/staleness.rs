/// Decides when skip segments for a video are worth fetching again
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Longest configurable window, a century
pub const MAX_WINDOW_HOURS: u64 = 24 * 365 * 100;

/// Per-video timestamps the policy looks at
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StalenessRecord {
    pub published_date: Option<DateTime<Utc>>,
    pub last_skip_segment_check: Option<DateTime<Utc>>,
}

/// Why a refresh was (or was not) granted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    Forced,
    RecentUpload,
    NeverChecked,
    CheckExpired,
}

/// Refresh windows for skip-segment data
#[derive(Debug, Clone, Copy)]
pub struct StalenessPolicy {
    /// Uploads younger than this keep getting new submissions
    pub recent_upload_window: Duration,
    /// Re-fetch once the last check is older than this
    pub recheck_interval: Duration,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            recent_upload_window: Duration::hours(24),
            recheck_interval: Duration::hours(72),
        }
    }
}

impl StalenessPolicy {
    /// Windows longer than [`MAX_WINDOW_HOURS`] are capped
    pub fn new(recent_upload_hours: u64, recheck_interval_hours: u64) -> Self {
        let hours = |h: u64| Duration::hours(h.min(MAX_WINDOW_HOURS) as i64);
        Self {
            recent_upload_window: hours(recent_upload_hours),
            recheck_interval: hours(recheck_interval_hours),
        }
    }

    /// First reason that warrants a fetch, if any
    pub fn refresh_reason(
        &self,
        record: &StalenessRecord,
        force: bool,
        now: DateTime<Utc>,
    ) -> Option<RefreshReason> {
        if force {
            return Some(RefreshReason::Forced);
        }
        if let Some(published) = record.published_date {
            if now - published < self.recent_upload_window {
                return Some(RefreshReason::RecentUpload);
            }
        }
        match record.last_skip_segment_check {
            None => Some(RefreshReason::NeverChecked),
            Some(checked) if now - checked > self.recheck_interval => {
                Some(RefreshReason::CheckExpired)
            }
            Some(_) => None,
        }
    }

    /// Pure decision; persisting the stamp is the caller's job
    pub fn should_refresh(&self, record: &StalenessRecord, force: bool, now: DateTime<Utc>) -> bool {
        self.refresh_reason(record, force, now).is_some()
    }
}
