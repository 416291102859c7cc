use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Snapshot younger than this is served without a remote call.
const DEFAULT_FRESH_SECS: u64 = 5 * 60;

/// Snapshot at least this old is expired (still served when nothing better exists).
const DEFAULT_EXPIRE_SECS: u64 = 24 * 60 * 60;

/// How old a snapshot is, in three levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Freshness {
    Fresh,
    Stale,
    Expired,
}

impl std::fmt::Display for Freshness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Freshness::Fresh => write!(f, "fresh"),
            Freshness::Stale => write!(f, "stale"),
            Freshness::Expired => write!(f, "expired"),
        }
    }
}

/// Age thresholds separating the freshness levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePolicy {
    pub fresh_for_secs: u64,
    pub expire_after_secs: u64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            fresh_for_secs: DEFAULT_FRESH_SECS,
            expire_after_secs: DEFAULT_EXPIRE_SECS,
        }
    }
}

impl CachePolicy {
    /// Classify an age; negative ages (clock skew) count as zero.
    pub fn classify(&self, age: Duration) -> Freshness {
        let secs = age.num_seconds().max(0) as u64;
        if secs < self.fresh_for_secs {
            Freshness::Fresh
        } else if secs < self.expire_after_secs {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let policy = CachePolicy::default();
        assert_eq!(policy.classify(Duration::zero()), Freshness::Fresh);
        assert_eq!(policy.classify(Duration::seconds(299)), Freshness::Fresh);
        assert_eq!(policy.classify(Duration::minutes(5)), Freshness::Stale);
        assert_eq!(policy.classify(Duration::minutes(6)), Freshness::Stale);
        assert_eq!(policy.classify(Duration::hours(23)), Freshness::Stale);
        assert_eq!(policy.classify(Duration::hours(24)), Freshness::Expired);
        assert_eq!(policy.classify(Duration::hours(25)), Freshness::Expired);
    }

    #[test]
    fn test_clock_skew_is_fresh() {
        let policy = CachePolicy::default();
        assert_eq!(policy.classify(Duration::minutes(-10)), Freshness::Fresh);
    }

    #[test]
    fn test_partial_policy_uses_defaults() {
        let policy: CachePolicy = serde_json::from_str(r#"{"fresh_for_secs": 60}"#).unwrap();
        assert_eq!(policy.fresh_for_secs, 60);
        assert_eq!(policy.expire_after_secs, DEFAULT_EXPIRE_SECS);
    }
}
