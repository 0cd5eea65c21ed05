//! Deterministic usage-counter period keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{LimitPeriod, ResourceKind};

/// Identifies the usage window a counter belongs to.
///
/// Keys derive from UTC: `"2024-05"` for monthly kinds, `"2024-05-17"` for
/// daily kinds. A counter whose key does not match the current period is
/// simply never read again - rollover needs no sweep and no rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodKey(String);

impl PeriodKey {
    /// Derives the key for `now` at the given granularity.
    #[must_use]
    pub fn at(period: LimitPeriod, now: DateTime<Utc>) -> Self {
        let key = match period {
            LimitPeriod::Monthly => now.format("%Y-%m").to_string(),
            LimitPeriod::Daily => now.format("%Y-%m-%d").to_string(),
        };
        Self(key)
    }

    /// Derives the current key for a resource kind's configured period.
    #[must_use]
    pub fn for_kind(kind: ResourceKind, now: DateTime<Utc>) -> Self {
        Self::at(kind.period(), now)
    }

    /// Returns the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_monthly_key_format() {
        let at = Utc.with_ymd_and_hms(2024, 5, 17, 23, 59, 59).unwrap();
        assert_eq!(PeriodKey::at(LimitPeriod::Monthly, at).as_str(), "2024-05");
    }

    #[test]
    fn test_daily_key_format() {
        let at = Utc.with_ymd_and_hms(2024, 5, 17, 0, 0, 0).unwrap();
        assert_eq!(PeriodKey::at(LimitPeriod::Daily, at).as_str(), "2024-05-17");
    }

    #[test]
    fn test_period_rollover_changes_key() {
        let may = Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 59).unwrap();
        let june = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_ne!(
            PeriodKey::at(LimitPeriod::Monthly, may),
            PeriodKey::at(LimitPeriod::Monthly, june)
        );
    }

    #[test]
    fn test_kind_selects_granularity() {
        let at = Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap();
        assert_eq!(PeriodKey::for_kind(ResourceKind::Track, at).as_str(), "2024-05-17");
        assert_eq!(PeriodKey::for_kind(ResourceKind::Post, at).as_str(), "2024-05");
    }
}
