//! Persisted per-user gamification state.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::GamificationError;
use crate::level::calculate_level;

/// Ordered mastery stages of a technique.
///
/// Declaration order is the progression order; comparisons follow it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TechniqueStatus {
    Discovered,
    Learning,
    Practicing,
    Mastered,
}

impl TechniqueStatus {
    pub const ALL: [Self; 4] = [
        Self::Discovered,
        Self::Learning,
        Self::Practicing,
        Self::Mastered,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Learning => "learning",
            Self::Practicing => "practicing",
            Self::Mastered => "mastered",
        }
    }
}

impl fmt::Display for TechniqueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TechniqueStatus {
    type Err = GamificationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.key() == value)
            .ok_or_else(|| GamificationError::InvalidStatus(value.to_string()))
    }
}

/// A user's gamification record.
///
/// `level` is a cached value derived from `xp`; it is rewritten by
/// [`UserGamificationRecord::sync_level`] on every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserGamificationRecord {
    pub xp: u64,
    pub level: u32,
    pub streak: u32,
    pub best_streak: u32,
    pub last_activity: Option<DateTime<Utc>>,
    pub badges: BTreeSet<String>,
    pub completed_challenges: BTreeSet<String>,
    pub completed_techniques: BTreeSet<String>,
    pub technique_progress: BTreeMap<String, TechniqueStatus>,
    pub virtues_progress: BTreeMap<String, u32>,
    pub total_challenges_completed: u32,
    pub total_techniques_completed: u32,
    pub login_days: u32,
}

impl Default for UserGamificationRecord {
    fn default() -> Self {
        Self {
            xp: 0,
            level: 1,
            streak: 0,
            best_streak: 0,
            last_activity: None,
            badges: BTreeSet::new(),
            completed_challenges: BTreeSet::new(),
            completed_techniques: BTreeSet::new(),
            technique_progress: BTreeMap::new(),
            virtues_progress: BTreeMap::new(),
            total_challenges_completed: 0,
            total_techniques_completed: 0,
            login_days: 0,
        }
    }
}

impl UserGamificationRecord {
    /// Creates a zero-valued record for a first-time user.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds XP (saturating) and refreshes the cached level.
    pub fn add_xp(&mut self, amount: u64) -> u64 {
        self.xp = self.xp.saturating_add(amount);
        self.sync_level();
        self.xp
    }

    /// Recomputes `level` from `xp`.
    pub fn sync_level(&mut self) {
        self.level = calculate_level(self.xp);
    }

    /// Current recorded status of a technique, if any.
    #[must_use]
    pub fn technique_status(&self, technique_id: &str) -> Option<TechniqueStatus> {
        self.technique_progress.get(technique_id).copied()
    }

    #[must_use]
    pub fn has_completed_challenge(&self, challenge_id: &str) -> bool {
        self.completed_challenges.contains(challenge_id)
    }
}

/// A user as seen by the progress store: identity plus an optional
/// gamification sub-record (absent until the first gamification action).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: String,
    #[serde(default)]
    pub gamification: Option<UserGamificationRecord>,
}

impl UserAccount {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            gamification: None,
        }
    }

    /// The stored record, or a fresh zero record on first use.
    ///
    /// The cached level is recomputed from XP, so a stale or missing stored
    /// level never leaks into results.
    #[must_use]
    pub fn record_or_default(&self) -> UserGamificationRecord {
        let mut record = self.gamification.clone().unwrap_or_default();
        record.sync_level();
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_are_ordered() {
        assert!(TechniqueStatus::Discovered < TechniqueStatus::Learning);
        assert!(TechniqueStatus::Learning < TechniqueStatus::Practicing);
        assert!(TechniqueStatus::Practicing < TechniqueStatus::Mastered);
        assert_eq!(
            TechniqueStatus::ALL.iter().max(),
            Some(&TechniqueStatus::Mastered)
        );
    }

    #[test]
    fn status_parses_known_keys_only() {
        assert_eq!(
            "practicing".parse::<TechniqueStatus>().unwrap(),
            TechniqueStatus::Practicing
        );
        let err = "expert".parse::<TechniqueStatus>().unwrap_err();
        assert_eq!(err, GamificationError::InvalidStatus("expert".to_string()));
    }

    #[test]
    fn default_record_is_zero_valued_level_one() {
        let record = UserGamificationRecord::new();
        assert_eq!(record.xp, 0);
        assert_eq!(record.level, 1);
        assert_eq!(record.streak, 0);
        assert!(record.last_activity.is_none());
        assert!(record.badges.is_empty());
    }

    #[test]
    fn add_xp_keeps_level_in_sync() {
        let mut record = UserGamificationRecord::new();
        record.add_xp(250);
        assert_eq!(record.level, 3);
        record.add_xp(u64::MAX);
        assert_eq!(record.xp, u64::MAX);
        assert_eq!(record.level, calculate_level(u64::MAX));
    }

    #[test]
    fn record_deserializes_partial_documents() {
        let json = r#"{
            "xp": 120,
            "level": 2,
            "badges": ["first_login"],
            "techniqueProgress": {"ikkyo": "learning"}
        }"#;
        let record: UserGamificationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.xp, 120);
        assert!(record.badges.contains("first_login"));
        assert_eq!(
            record.technique_status("ikkyo"),
            Some(TechniqueStatus::Learning)
        );
        assert_eq!(record.login_days, 0);
    }

    #[test]
    fn account_without_record_initializes_lazily() {
        let account = UserAccount::new("u-1");
        assert_eq!(account.record_or_default(), UserGamificationRecord::default());
    }

    #[test]
    fn stored_level_is_recomputed_from_xp() {
        let account = UserAccount {
            id: "u-2".to_string(),
            gamification: Some(serde_json::from_str(r#"{"xp": 150}"#).unwrap()),
        };
        assert_eq!(account.gamification.as_ref().unwrap().level, 1);
        assert_eq!(account.record_or_default().level, 2);
    }
}
