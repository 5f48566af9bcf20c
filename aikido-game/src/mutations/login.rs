use serde::{Deserialize, Serialize};

use super::{Baseline, BadgeSummary, LevelSummary, RuleContext, XpSummary, finish, run_streak};
use crate::record::UserGamificationRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLoginSummary {
    /// False for a repeat login on the same calendar day.
    pub recorded: bool,
    pub xp_earned: u64,
    pub streak_bonus: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginStreakSummary {
    pub current: u32,
    pub is_new: bool,
    pub best: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLoginResult {
    pub daily_login: DailyLoginSummary,
    pub streak: LoginStreakSummary,
    pub xp: XpSummary,
    pub level: LevelSummary,
    pub badges: BadgeSummary,
    pub title: String,
    #[serde(skip)]
    pub(crate) previous_level: u32,
}

impl DailyLoginResult {
    #[must_use]
    pub const fn previous_level(&self) -> u32 {
        self.previous_level
    }
}

/// Count a practice day. Only the first login of a calendar day earns the
/// login reward; later ones still refresh `last_activity`.
pub fn record_daily_login(
    ctx: &RuleContext<'_>,
    record: &mut UserGamificationRecord,
) -> DailyLoginResult {
    let baseline = Baseline::capture(record);
    let streak = run_streak(ctx, record);
    let recorded = streak.changed();
    let xp_earned = if recorded {
        record.login_days = record.login_days.saturating_add(1);
        record.add_xp(ctx.config.rewards.daily_login);
        ctx.config.rewards.daily_login
    } else {
        0
    };

    let summary = finish(ctx, record, baseline, &streak);
    DailyLoginResult {
        daily_login: DailyLoginSummary {
            recorded,
            xp_earned,
            streak_bonus: streak.bonus_xp(),
        },
        streak: LoginStreakSummary {
            current: summary.streak.current,
            is_new: recorded,
            best: summary.streak.best,
        },
        xp: summary.xp,
        level: summary.level,
        badges: summary.badges,
        title: summary.title,
        previous_level: summary.previous_level,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{at, ctx};
    use super::*;
    use chrono::Duration;

    #[test]
    fn first_login_starts_the_streak() {
        let now = at(2024, 8, 1, 7);
        let mut record = UserGamificationRecord::new();
        let result = record_daily_login(&ctx(now), &mut record);
        assert!(result.daily_login.recorded);
        assert_eq!(result.daily_login.xp_earned, 5);
        assert_eq!(result.streak.current, 1);
        assert!(result.streak.is_new);
        assert_eq!(record.login_days, 1);
        assert!(record.badges.contains("first_login"));
    }

    #[test]
    fn second_login_same_day_earns_nothing() {
        let mut record = UserGamificationRecord::new();
        record_daily_login(&ctx(at(2024, 8, 1, 7)), &mut record);
        let xp = record.xp;
        let result = record_daily_login(&ctx(at(2024, 8, 1, 21)), &mut record);
        assert!(!result.daily_login.recorded);
        assert_eq!(result.daily_login.xp_earned, 0);
        assert!(!result.streak.is_new);
        assert_eq!(record.xp, xp);
        assert_eq!(record.login_days, 1);
        assert_eq!(record.last_activity, Some(at(2024, 8, 1, 21)));
    }

    #[test]
    fn login_within_grace_increments_and_late_login_resets() {
        let now = at(2024, 8, 2, 12);
        let mut record = UserGamificationRecord {
            streak: 4,
            last_activity: Some(now - Duration::hours(30)),
            ..UserGamificationRecord::new()
        };
        assert_eq!(record_daily_login(&ctx(now), &mut record).streak.current, 5);

        let mut stale = UserGamificationRecord {
            streak: 4,
            last_activity: Some(now - Duration::hours(40)),
            ..UserGamificationRecord::new()
        };
        assert_eq!(record_daily_login(&ctx(now), &mut stale).streak.current, 1);
    }

    #[test]
    fn milestone_login_reports_bonus() {
        let now = at(2024, 8, 2, 12);
        let mut record = UserGamificationRecord {
            streak: 29,
            last_activity: Some(now - Duration::hours(20)),
            ..UserGamificationRecord::new()
        };
        let result = record_daily_login(&ctx(now), &mut record);
        assert_eq!(result.streak.current, 30);
        assert_eq!(result.daily_login.streak_bonus, 200);
        assert_eq!(result.xp.added, 205);
    }
}
