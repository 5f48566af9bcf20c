//! Badge scanning over the rule catalog.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::catalog::{BadgeDef, RuleCatalog};
use crate::condition::{ConditionProgress, UserStats};
use crate::constants::NEXT_TO_UNLOCK_LIMIT;

/// A catalog badge annotated with the user's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeStatus {
    pub id: String,
    pub name: String,
    pub description: String,
    pub condition: String,
    pub unlocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ConditionProgress>,
}

impl BadgeStatus {
    fn from_def(badge: &BadgeDef, unlocked: bool, stats: &UserStats) -> Self {
        Self {
            id: badge.id.clone(),
            name: badge.name.clone(),
            description: badge.description.clone(),
            condition: badge.condition.to_string(),
            unlocked,
            progress: badge.condition.progress(stats),
        }
    }
}

/// Every catalog badge with its unlocked/locked state. Never mutates.
///
/// A badge already in `earned` stays unlocked even if its condition no
/// longer holds.
#[must_use]
pub fn get_all_badges_with_status(
    catalog: &RuleCatalog,
    earned: &BTreeSet<String>,
    stats: &UserStats,
) -> Vec<BadgeStatus> {
    catalog
        .badges()
        .map(|badge| BadgeStatus::from_def(badge, earned.contains(&badge.id), stats))
        .collect()
}

/// Badges not yet in `earned` whose condition now holds, in catalog order.
#[must_use]
pub fn check_new_badges<'a>(
    catalog: &'a RuleCatalog,
    earned: &BTreeSet<String>,
    stats: &UserStats,
) -> Vec<&'a BadgeDef> {
    catalog
        .badges()
        .filter(|badge| !earned.contains(&badge.id) && badge.condition.is_met(stats))
        .collect()
}

/// Locked badges closest to completion, highest ratio first.
#[must_use]
pub fn next_to_unlock(
    catalog: &RuleCatalog,
    earned: &BTreeSet<String>,
    stats: &UserStats,
) -> Vec<BadgeStatus> {
    let mut candidates: Vec<(f64, BadgeStatus)> = catalog
        .badges()
        .filter(|badge| !earned.contains(&badge.id))
        .filter_map(|badge| {
            let status = BadgeStatus::from_def(badge, false, stats);
            status.progress.map(|progress| (progress.ratio(), status))
        })
        .collect();
    // Stable sort keeps catalog order among equal ratios.
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
    candidates
        .into_iter()
        .take(NEXT_TO_UNLOCK_LIMIT)
        .map(|(_, status)| status)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::catalog;
    use std::collections::BTreeMap;

    fn stats_with(xp: u64, streak: u32) -> UserStats {
        UserStats {
            xp,
            level: crate::level::calculate_level(xp),
            streak,
            ..UserStats::default()
        }
    }

    fn ids(badges: &[&BadgeDef]) -> Vec<String> {
        badges.iter().map(|b| b.id.clone()).collect()
    }

    #[test]
    fn fresh_user_unlocks_nothing() {
        let found = check_new_badges(catalog(), &BTreeSet::new(), &UserStats::default());
        assert!(found.is_empty());
    }

    #[test]
    fn xp_and_level_badges_unlock_together() {
        let found = check_new_badges(catalog(), &BTreeSet::new(), &stats_with(520, 0));
        let found = ids(&found);
        assert!(found.contains(&"xp_100".to_string()));
        assert!(found.contains(&"xp_500".to_string()));
        assert!(found.contains(&"level_5".to_string()));
        assert!(!found.contains(&"xp_1000".to_string()));
    }

    #[test]
    fn scanning_is_idempotent_and_reaches_fixed_point() {
        let stats = UserStats {
            virtue_progress: BTreeMap::from([("rei".to_string(), 100)]),
            total_challenges_completed: 4,
            challenges_completed: 4,
            login_days: 7,
            ..stats_with(1_200, 7)
        };
        let earned = BTreeSet::from(["xp_100".to_string()]);
        let first = ids(&check_new_badges(catalog(), &earned, &stats));
        let second = ids(&check_new_badges(catalog(), &earned, &stats));
        assert_eq!(first, second);
        assert!(!first.contains(&"xp_100".to_string()));

        let mut merged = earned.clone();
        merged.extend(first);
        assert!(check_new_badges(catalog(), &merged, &stats).is_empty());
    }

    #[test]
    fn status_listing_covers_every_badge_and_keeps_earned() {
        let earned = BTreeSet::from(["streak_100".to_string()]);
        let listing = get_all_badges_with_status(catalog(), &earned, &stats_with(0, 0));
        assert_eq!(listing.len(), catalog().badges().count());
        let streak = listing.iter().find(|b| b.id == "streak_100").unwrap();
        assert!(streak.unlocked);
        assert!(listing.iter().filter(|b| b.unlocked).count() == 1);
        assert_eq!(listing[0].id, catalog().virtues[0].badges[0].id);
    }

    #[test]
    fn next_to_unlock_prefers_closest_badges() {
        let stats = stats_with(90, 2);
        let next = next_to_unlock(catalog(), &BTreeSet::new(), &stats);
        assert_eq!(next.len(), 3);
        assert_eq!(next[0].id, "xp_100");
        assert!(next.iter().all(|b| !b.unlocked));
        let ratios: Vec<f64> = next
            .iter()
            .map(|b| b.progress.unwrap().ratio())
            .collect();
        assert!(ratios.windows(2).all(|w| w[0] >= w[1]));
    }
}
