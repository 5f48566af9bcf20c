//! Mutation handlers.
//!
//! Every handler works on a caller-owned copy of the record and follows the
//! same order: apply the domain change, run the streak policy, award any
//! milestone bonus, recompute the level, scan badges. Outcomes that change
//! nothing return before touching the record.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::badges::check_new_badges;
use crate::catalog::{BadgeDef, RuleCatalog};
use crate::condition::UserStats;
use crate::config::{EngineConfig, StreakMilestone};
use crate::level::{LevelProgress, calculate_level, xp_to_next_level};
use crate::record::UserGamificationRecord;
use crate::streak::{StreakPolicy, StreakUpdate};

mod add_xp;
mod challenge;
mod login;
pub mod requests;
mod technique;

pub use add_xp::{AddXpResult, add_xp};
pub use challenge::{ChallengeOutcome, ChallengeResult, ChallengeSummary, complete_challenge};
pub use login::{DailyLoginResult, DailyLoginSummary, LoginStreakSummary, record_daily_login};
pub use technique::{TechniqueOutcome, TechniqueResult, TechniqueSummary, advance_technique};

/// Everything a handler reads besides the record itself.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub catalog: &'a RuleCatalog,
    pub config: &'a EngineConfig,
    pub policy: StreakPolicy,
    pub now: DateTime<Utc>,
}

impl<'a> RuleContext<'a> {
    #[must_use]
    pub fn new(catalog: &'a RuleCatalog, config: &'a EngineConfig, now: DateTime<Utc>) -> Self {
        Self {
            catalog,
            config,
            policy: StreakPolicy::from_config(config),
            now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpSummary {
    /// Everything awarded by this call, milestone bonus included.
    pub added: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelSummary {
    pub current: u32,
    pub level_up: bool,
    pub progress: LevelProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakSummary {
    pub current: u32,
    pub updated: bool,
    pub best: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<StreakMilestone>,
}

/// A badge granted by the scan at the end of a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedBadge {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl From<&BadgeDef> for UnlockedBadge {
    fn from(badge: &BadgeDef) -> Self {
        Self {
            id: badge.id.clone(),
            name: badge.name.clone(),
            description: badge.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeSummary {
    pub newly_unlocked: Vec<UnlockedBadge>,
    pub total: usize,
}

/// Shared tail of every successful mutation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationSummary {
    pub xp: XpSummary,
    pub level: LevelSummary,
    pub streak: StreakSummary,
    pub badges: BadgeSummary,
    pub title: String,
    #[serde(skip)]
    pub(crate) previous_level: u32,
}

impl MutationSummary {
    /// Level before the call; differs from `level.current` on a level-up.
    #[must_use]
    pub const fn previous_level(&self) -> u32 {
        self.previous_level
    }
}

/// Record state captured before the domain change.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Baseline {
    xp: u64,
    level: u32,
}

impl Baseline {
    pub(crate) fn capture(record: &UserGamificationRecord) -> Self {
        Self {
            xp: record.xp,
            level: calculate_level(record.xp),
        }
    }
}

/// Run the streak policy and award its milestone bonus.
pub(crate) fn run_streak(ctx: &RuleContext<'_>, record: &mut UserGamificationRecord) -> StreakUpdate {
    let update = ctx.policy.apply(record, ctx.now, ctx.config);
    if update.bonus_xp() > 0 {
        record.add_xp(update.bonus_xp());
    }
    update
}

/// Recompute the level, merge newly earned badges, and build the summary.
pub(crate) fn finish(
    ctx: &RuleContext<'_>,
    record: &mut UserGamificationRecord,
    baseline: Baseline,
    streak: &StreakUpdate,
) -> MutationSummary {
    record.sync_level();
    let stats = UserStats::from(&*record);
    let newly_unlocked: Vec<UnlockedBadge> = check_new_badges(ctx.catalog, &record.badges, &stats)
        .into_iter()
        .map(UnlockedBadge::from)
        .collect();
    for badge in &newly_unlocked {
        log::debug!("badge `{}` unlocked", badge.id);
        record.badges.insert(badge.id.clone());
    }

    MutationSummary {
        xp: XpSummary {
            added: record.xp.saturating_sub(baseline.xp),
            total: record.xp,
        },
        level: LevelSummary {
            current: record.level,
            level_up: record.level > baseline.level,
            progress: xp_to_next_level(record.xp),
        },
        streak: StreakSummary {
            current: record.streak,
            updated: streak.changed(),
            best: record.best_streak,
            milestone: streak.milestone,
        },
        badges: BadgeSummary {
            newly_unlocked,
            total: record.badges.len(),
        },
        title: ctx.catalog.title_for_xp(record.xp).to_string(),
        previous_level: baseline.level,
    }
}
