use std::collections::HashSet;

use aikido_game::{
    BadgeCondition, CatalogError, GamificationEngine, ManualClock, MemoryStore, RuleCatalog,
    catalog,
};
use chrono::Utc;

#[test]
fn embedded_catalog_is_complete() {
    let catalog = catalog();
    assert_eq!(catalog.virtues.len(), 7);
    assert_eq!(catalog.total_challenges(), 27);
    assert!(catalog.validate().is_ok());

    let mut ids = HashSet::new();
    for badge in catalog.badges() {
        assert!(ids.insert(badge.id.as_str()), "duplicate badge {}", badge.id);
        assert!(
            badge.condition.is_recognized(),
            "badge {} has condition {}",
            badge.id,
            badge.condition
        );
    }
    for virtue in &catalog.virtues {
        assert!(!virtue.challenges.is_empty());
        assert!(virtue.challenges.iter().all(|challenge| challenge.xp > 0));
        for badge in &virtue.badges {
            assert!(matches!(
                &badge.condition,
                BadgeCondition::Virtue { virtue_id, .. } if *virtue_id == virtue.id
            ));
        }
    }
}

#[test]
fn rei_has_four_challenges_worth_ten() {
    let rei = catalog().virtue("rei").unwrap();
    assert_eq!(rei.challenges.len(), 4);
    assert!(rei.challenges.iter().all(|challenge| challenge.xp == 10));
}

#[test]
fn title_ladder_is_ordered_from_zero() {
    let titles = &catalog().titles;
    assert_eq!(titles[0].threshold, 0);
    assert!(titles.windows(2).all(|pair| pair[0].threshold < pair[1].threshold));
    assert_eq!(catalog().title_for_xp(999), "Deshi");
    assert_eq!(catalog().title_for_xp(1_000), "Senpai");
}

#[test]
fn special_titles_point_at_real_badges() {
    for special in &catalog().special_titles {
        assert!(catalog().badge(&special.badge).is_some(), "{}", special.badge);
    }
}

#[test]
fn custom_catalog_rejects_unknown_conditions() {
    let json = r#"{
        "virtues": [],
        "trophies": [
            { "id": "odd", "name": "Odd", "description": "", "condition": "karma_9000" }
        ],
        "titles": [{ "threshold": 0, "title": "Guest" }]
    }"#;
    assert!(matches!(
        RuleCatalog::from_json(json),
        Err(CatalogError::UnsupportedCondition { .. })
    ));
}

#[test]
fn engine_accepts_a_small_custom_catalog() {
    let json = r#"{
        "virtues": [{
            "id": "wa",
            "name": "Wa",
            "meaning": "Harmony",
            "challenges": [{ "id": "wa_bow", "name": "Bow", "xp": 15 }],
            "badges": [
                { "id": "wa_master", "name": "Harmonious", "description": "", "condition": "virtue_wa_100" }
            ]
        }],
        "trophies": [],
        "titles": [{ "threshold": 0, "title": "Guest" }]
    }"#;
    let custom = RuleCatalog::from_json(json).unwrap();
    let engine = GamificationEngine::new(MemoryStore::with_users(["u"]), ManualClock::new(Utc::now()))
        .with_catalog(custom)
        .unwrap();
    let outcome = engine
        .complete_challenge("u", aikido_game::CompleteChallengeRequest::new("wa_bow"))
        .unwrap();
    let aikido_game::ChallengeOutcome::Completed(result) = outcome else {
        panic!("wa_bow should complete");
    };
    assert_eq!(result.challenge.xp_earned, 15);
    assert_eq!(result.virtue_progress, Some(100));
    assert_eq!(result.summary.title, "Guest");
    assert_eq!(result.summary.badges.newly_unlocked[0].id, "wa_master");
}
