//! Read-only progress snapshot.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::badges::{BadgeStatus, get_all_badges_with_status, next_to_unlock};
use crate::catalog::RuleCatalog;
use crate::condition::UserStats;
use crate::level::{LevelProgress, calculate_level, xp_to_next_level};
use crate::record::{TechniqueStatus, UserGamificationRecord};
use crate::streak::{StreakPolicy, StreakStatus};
use crate::virtues::{VirtueSummary, summarize_virtues};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelView {
    pub current: u32,
    pub progress: LevelProgress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakView {
    pub current: u32,
    pub best: u32,
    pub status: StreakStatus,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgesView {
    pub unlocked: Vec<BadgeStatus>,
    pub locked: Vec<BadgeStatus>,
    pub next_to_unlock: Vec<BadgeStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechniquesView {
    pub by_status: BTreeMap<TechniqueStatus, usize>,
    pub completed: Vec<String>,
    pub total_completed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengesView {
    pub completed: Vec<String>,
    pub total_completed: u32,
    pub available: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub xp: u64,
    pub level: LevelView,
    pub streak: StreakView,
    pub badges: BadgesView,
    pub virtues: Vec<VirtueSummary>,
    pub techniques: TechniquesView,
    pub challenges: ChallengesView,
    pub title: String,
    pub special_titles: Vec<String>,
    pub login_days: u32,
}

fn technique_counts(record: &UserGamificationRecord) -> BTreeMap<TechniqueStatus, usize> {
    let mut counts: BTreeMap<TechniqueStatus, usize> =
        TechniqueStatus::ALL.iter().map(|status| (*status, 0)).collect();
    for status in record.technique_progress.values() {
        *counts.entry(*status).or_default() += 1;
    }
    counts
}

/// Assemble the snapshot for `record` as of `now`.
#[must_use]
pub fn build_progress(
    catalog: &RuleCatalog,
    policy: &StreakPolicy,
    record: &UserGamificationRecord,
    now: DateTime<Utc>,
) -> ProgressSnapshot {
    let stats = UserStats::from(record);
    let (unlocked, locked): (Vec<BadgeStatus>, Vec<BadgeStatus>) =
        get_all_badges_with_status(catalog, &record.badges, &stats)
            .into_iter()
            .partition(|badge| badge.unlocked);

    ProgressSnapshot {
        xp: record.xp,
        level: LevelView {
            current: calculate_level(record.xp),
            progress: xp_to_next_level(record.xp),
        },
        streak: StreakView {
            current: record.streak,
            best: record.best_streak,
            status: policy.status(record.last_activity, now),
            last_activity: record.last_activity,
        },
        badges: BadgesView {
            unlocked,
            locked,
            next_to_unlock: next_to_unlock(catalog, &record.badges, &stats),
        },
        virtues: summarize_virtues(catalog, &record.completed_challenges),
        techniques: TechniquesView {
            by_status: technique_counts(record),
            completed: record.completed_techniques.iter().cloned().collect(),
            total_completed: record.total_techniques_completed,
        },
        challenges: ChallengesView {
            completed: record.completed_challenges.iter().cloned().collect(),
            total_completed: record.total_challenges_completed,
            available: catalog.total_challenges(),
        },
        title: catalog.title_for_xp(record.xp).to_string(),
        special_titles: catalog
            .special_titles_for(&record.badges)
            .into_iter()
            .map(str::to_string)
            .collect(),
        login_days: record.login_days,
    }
}
