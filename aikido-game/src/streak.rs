//! Daily streak policy.
//!
//! A streak restarts at 1 once more than the grace window (36h by default)
//! has passed since the last activity. Otherwise it grows by one on the first
//! activity of each new calendar day and is left alone for repeat activity
//! on the same day.
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, StreakMilestone};
use crate::record::UserGamificationRecord;

/// What the policy did to the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreakDecision {
    /// Never active, or the grace window elapsed: streak restarts at 1.
    Reset,
    /// First activity of a new calendar day inside the grace window.
    Increment,
    /// Repeat activity on the same calendar day.
    Unchanged,
}

impl StreakDecision {
    /// Whether the streak value was written.
    #[must_use]
    pub const fn fired(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Display state of a streak at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreakStatus {
    /// Today's activity is already counted.
    Active,
    /// Alive, but nothing counted yet today.
    AtRisk,
    /// Grace window exceeded or never active.
    Broken,
}

/// Result of applying the policy to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakUpdate {
    pub previous: u32,
    pub current: u32,
    pub decision: StreakDecision,
    /// Milestone reached by this increment, if any.
    pub milestone: Option<StreakMilestone>,
}

impl StreakUpdate {
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.decision.fired()
    }

    #[must_use]
    pub fn bonus_xp(&self) -> u64 {
        self.milestone.map_or(0, |milestone| milestone.bonus_xp)
    }
}

/// Streak timing parameters resolved from [`EngineConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakPolicy {
    grace: Duration,
    offset: FixedOffset,
}

impl Default for StreakPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl StreakPolicy {
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix());
        Self {
            grace: Duration::try_hours(config.streak_grace_hours).unwrap_or(Duration::MAX),
            offset,
        }
    }

    fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// True when there was no prior activity or the grace window has elapsed.
    #[must_use]
    pub fn should_reset_streak(
        &self,
        last_activity: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        last_activity.is_none_or(|last| now.signed_duration_since(last) > self.grace)
    }

    /// True when `now` falls on a different calendar day than the last activity.
    #[must_use]
    pub fn is_new_day_for_streak(
        &self,
        last_activity: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        last_activity.is_none_or(|last| self.local_date(last) != self.local_date(now))
    }

    /// Decide without mutating anything.
    #[must_use]
    pub fn decide(&self, last_activity: Option<DateTime<Utc>>, now: DateTime<Utc>) -> StreakDecision {
        if self.should_reset_streak(last_activity, now) {
            StreakDecision::Reset
        } else if self.is_new_day_for_streak(last_activity, now) {
            StreakDecision::Increment
        } else {
            StreakDecision::Unchanged
        }
    }

    #[must_use]
    pub fn status(&self, last_activity: Option<DateTime<Utc>>, now: DateTime<Utc>) -> StreakStatus {
        match self.decide(last_activity, now) {
            StreakDecision::Reset => StreakStatus::Broken,
            StreakDecision::Increment => StreakStatus::AtRisk,
            StreakDecision::Unchanged => StreakStatus::Active,
        }
    }

    /// Apply the policy to `record`, stamping `last_activity = now`.
    ///
    /// Milestone bonuses are reported, not awarded; the caller adds the XP.
    pub fn apply(
        &self,
        record: &mut UserGamificationRecord,
        now: DateTime<Utc>,
        config: &EngineConfig,
    ) -> StreakUpdate {
        let previous = record.streak;
        let decision = self.decide(record.last_activity, now);
        let mut milestone = None;
        match decision {
            StreakDecision::Reset => record.streak = 1,
            StreakDecision::Increment => {
                record.streak = record.streak.saturating_add(1);
                milestone = config.rewards.milestone_bonus(record.streak);
            }
            StreakDecision::Unchanged => {}
        }
        record.best_streak = record.best_streak.max(record.streak);
        record.last_activity = Some(now);
        log::debug!(
            "streak {previous} -> {} ({decision:?}{})",
            record.streak,
            milestone.map_or_else(String::new, |m| format!(", milestone {}d", m.days))
        );
        StreakUpdate {
            previous,
            current: record.streak,
            decision,
            milestone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).single().unwrap()
    }

    #[test]
    fn reset_without_history_or_after_grace() {
        let policy = StreakPolicy::default();
        let now = at(2024, 3, 10, 12);
        assert!(policy.should_reset_streak(None, now));
        assert!(!policy.should_reset_streak(Some(now - Duration::hours(30)), now));
        assert!(!policy.should_reset_streak(Some(now - Duration::hours(36)), now));
        assert!(policy.should_reset_streak(Some(now - Duration::hours(40)), now));
    }

    #[test]
    fn new_day_uses_calendar_dates() {
        let policy = StreakPolicy::default();
        let late = at(2024, 3, 10, 23);
        assert!(policy.is_new_day_for_streak(Some(late), at(2024, 3, 11, 1)));
        assert!(!policy.is_new_day_for_streak(Some(at(2024, 3, 10, 1)), late));
        assert!(policy.is_new_day_for_streak(None, late));
    }

    #[test]
    fn offset_moves_the_day_boundary() {
        let config = EngineConfig {
            utc_offset_minutes: 120,
            ..EngineConfig::default()
        };
        let policy = StreakPolicy::from_config(&config);
        // 21:00 and 23:00 UTC are 23:00 and 01:00 at UTC+2.
        assert!(policy.is_new_day_for_streak(Some(at(2024, 3, 10, 21)), at(2024, 3, 10, 23)));
        assert!(!StreakPolicy::default()
            .is_new_day_for_streak(Some(at(2024, 3, 10, 21)), at(2024, 3, 10, 23)));
    }

    #[test]
    fn apply_follows_reset_increment_unchanged_order() {
        let config = EngineConfig::default();
        let policy = StreakPolicy::from_config(&config);
        let mut record = UserGamificationRecord::new();

        let first = policy.apply(&mut record, at(2024, 3, 10, 8), &config);
        assert_eq!(first.decision, StreakDecision::Reset);
        assert_eq!(record.streak, 1);

        let repeat = policy.apply(&mut record, at(2024, 3, 10, 20), &config);
        assert_eq!(repeat.decision, StreakDecision::Unchanged);
        assert!(!repeat.changed());
        assert_eq!(record.streak, 1);

        let next = policy.apply(&mut record, at(2024, 3, 11, 18), &config);
        assert_eq!(next.decision, StreakDecision::Increment);
        assert_eq!(record.streak, 2);

        let gap = policy.apply(&mut record, at(2024, 3, 14, 18), &config);
        assert_eq!(gap.decision, StreakDecision::Reset);
        assert_eq!(record.streak, 1);
        assert_eq!(record.best_streak, 2);
        assert_eq!(record.last_activity, Some(at(2024, 3, 14, 18)));
    }

    #[test]
    fn milestone_reported_only_on_landing_increment() {
        let config = EngineConfig::default();
        let policy = StreakPolicy::from_config(&config);
        let mut record = UserGamificationRecord {
            streak: 6,
            last_activity: Some(at(2024, 3, 10, 9)),
            ..UserGamificationRecord::default()
        };
        let update = policy.apply(&mut record, at(2024, 3, 11, 9), &config);
        assert_eq!(update.current, 7);
        assert_eq!(update.bonus_xp(), 50);

        let same_day = policy.apply(&mut record, at(2024, 3, 11, 19), &config);
        assert_eq!(same_day.current, 7);
        assert_eq!(same_day.bonus_xp(), 0);
    }

    #[test]
    fn status_reflects_todays_activity() {
        let policy = StreakPolicy::default();
        let now = at(2024, 3, 11, 12);
        assert_eq!(policy.status(None, now), StreakStatus::Broken);
        assert_eq!(policy.status(Some(at(2024, 3, 11, 7)), now), StreakStatus::Active);
        assert_eq!(policy.status(Some(at(2024, 3, 10, 20)), now), StreakStatus::AtRisk);
        assert_eq!(policy.status(Some(at(2024, 3, 8, 20)), now), StreakStatus::Broken);
    }
}
