//! Checks that must hold across every engine call, whatever the outcome.
use chrono::{DateTime, Utc};

use aikido_game::{
    RuleCatalog, StreakDecision, StreakPolicy, TechniqueStatus, UserGamificationRecord, UserStats,
    calculate_level, calculate_virtue_progress, check_new_badges,
};

/// One observed engine call: the stored record before and after it.
#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
    pub before: &'a UserGamificationRecord,
    pub after: &'a UserGamificationRecord,
    /// Whether the handler reported an applied change rather than a no-op.
    pub applied: bool,
    pub now: DateTime<Utc>,
}

/// Every broken invariant, described in one line each.
pub fn check_transition(
    catalog: &RuleCatalog,
    policy: &StreakPolicy,
    transition: &Transition<'_>,
) -> Vec<String> {
    let Transition {
        before,
        after,
        applied,
        now,
    } = *transition;
    let mut violations = Vec::new();

    if !applied {
        if after != before {
            violations.push("no-op outcome changed the stored record".to_string());
        }
        return violations;
    }

    check_totals(after, &mut violations);
    check_growth(before, after, &mut violations);

    let expected_streak = match policy.decide(before.last_activity, now) {
        StreakDecision::Reset => 1,
        StreakDecision::Increment => before.streak.saturating_add(1),
        StreakDecision::Unchanged => before.streak,
    };
    if after.streak != expected_streak {
        violations.push(format!(
            "streak {} -> {} but the policy expects {expected_streak}",
            before.streak, after.streak
        ));
    }
    if after.last_activity != Some(now) {
        violations.push(format!(
            "last activity {:?} was not stamped with {now}",
            after.last_activity
        ));
    }

    for (virtue_id, stored) in &after.virtues_progress {
        if catalog.virtue(virtue_id).is_none() {
            violations.push(format!("progress stored for unknown virtue `{virtue_id}`"));
            continue;
        }
        let derived = calculate_virtue_progress(catalog, &after.completed_challenges, virtue_id);
        if *stored != derived {
            violations.push(format!(
                "virtue `{virtue_id}` stored {stored}% but completions give {derived}%"
            ));
        }
    }

    let unclaimed: Vec<&str> = check_new_badges(catalog, &after.badges, &UserStats::from(after))
        .into_iter()
        .map(|badge| badge.id.as_str())
        .collect();
    if !unclaimed.is_empty() {
        violations.push(format!("earned badges left unclaimed: {unclaimed:?}"));
    }

    violations
}

fn check_totals(after: &UserGamificationRecord, violations: &mut Vec<String>) {
    if after.level != calculate_level(after.xp) {
        violations.push(format!(
            "level {} does not match {} xp",
            after.level, after.xp
        ));
    }
    if after.completed_challenges.len() != after.total_challenges_completed as usize {
        violations.push(format!(
            "{} completed challenges but counter says {}",
            after.completed_challenges.len(),
            after.total_challenges_completed
        ));
    }
    if after.completed_techniques.len() != after.total_techniques_completed as usize {
        violations.push(format!(
            "{} completed techniques but counter says {}",
            after.completed_techniques.len(),
            after.total_techniques_completed
        ));
    }
    for technique_id in &after.completed_techniques {
        if after.technique_status(technique_id) != Some(TechniqueStatus::Mastered) {
            violations.push(format!("`{technique_id}` counted complete but not mastered"));
        }
    }
    if after.best_streak < after.streak {
        violations.push(format!(
            "best streak {} below current {}",
            after.best_streak, after.streak
        ));
    }
}

fn check_growth(
    before: &UserGamificationRecord,
    after: &UserGamificationRecord,
    violations: &mut Vec<String>,
) {
    if after.xp < before.xp {
        violations.push(format!("xp fell from {} to {}", before.xp, after.xp));
    }
    if after.best_streak < before.best_streak {
        violations.push(format!(
            "best streak fell from {} to {}",
            before.best_streak, after.best_streak
        ));
    }
    if after.login_days < before.login_days {
        violations.push("login days went backwards".to_string());
    }
    let lost: Vec<&String> = before.badges.difference(&after.badges).collect();
    if !lost.is_empty() {
        violations.push(format!("badges revoked: {lost:?}"));
    }
    for (technique_id, previous) in &before.technique_progress {
        match after.technique_status(technique_id) {
            Some(current) if current >= *previous => {}
            current => violations.push(format!(
                "`{technique_id}` regressed from {previous} to {current:?}"
            )),
        }
    }
    if !before
        .completed_challenges
        .is_subset(&after.completed_challenges)
    {
        violations.push("a completed challenge was forgotten".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aikido_game::{EngineConfig, catalog};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 18, 0, 0).single().unwrap()
    }

    fn check(before: &UserGamificationRecord, after: &UserGamificationRecord, applied: bool) -> Vec<String> {
        let policy = StreakPolicy::from_config(&EngineConfig::default());
        check_transition(
            catalog(),
            &policy,
            &Transition {
                before,
                after,
                applied,
                now: now(),
            },
        )
    }

    fn stamped(streak: u32) -> UserGamificationRecord {
        UserGamificationRecord {
            streak,
            best_streak: streak,
            last_activity: Some(now()),
            ..UserGamificationRecord::new()
        }
    }

    #[test]
    fn clean_first_activity_passes() {
        let before = UserGamificationRecord::new();
        let after = stamped(1);
        assert!(check(&before, &after, true).is_empty());
    }

    #[test]
    fn no_op_must_not_touch_the_record() {
        let before = stamped(2);
        let mut after = before.clone();
        after.xp = 5;
        let violations = check(&before, &after, false);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("no-op"));
    }

    #[test]
    fn flags_stale_level_and_regression() {
        let mut before = stamped(1);
        before.last_activity = Some(now() - Duration::hours(3));
        before
            .technique_progress
            .insert("ikkyo".into(), TechniqueStatus::Practicing);
        let mut after = stamped(1);
        after.xp = 250;
        after
            .technique_progress
            .insert("ikkyo".into(), TechniqueStatus::Learning);
        let violations = check(&before, &after, true);
        assert!(violations.iter().any(|v| v.starts_with("level 1")));
        assert!(violations.iter().any(|v| v.contains("regressed")));
        assert!(violations.iter().any(|v| v.contains("unclaimed")));
    }

    #[test]
    fn flags_a_streak_the_policy_would_not_produce() {
        let mut before = stamped(3);
        before.last_activity = Some(now() - Duration::hours(40));
        let after = stamped(4);
        let violations = check(&before, &after, true);
        assert!(violations.iter().any(|v| v.contains("policy expects 1")));
    }
}
