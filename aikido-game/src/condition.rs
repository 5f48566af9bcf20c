//! Badge unlock conditions.
//!
//! Catalog entries express their unlock rule as a short string such as
//! `streak_7` or `virtue_rei_100`. Strings are parsed once into
//! [`BadgeCondition`]; anything outside the grammar becomes
//! [`BadgeCondition::Unrecognized`], which never evaluates true. Catalog
//! validation rejects unrecognized conditions up front.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use crate::numbers::len_to_u64;
use crate::record::UserGamificationRecord;

/// Snapshot of the stats a condition can test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub xp: u64,
    pub level: u32,
    pub streak: u32,
    pub techniques_completed: u64,
    pub challenges_completed: u64,
    pub virtue_progress: BTreeMap<String, u32>,
    pub total_challenges_completed: u32,
    pub total_techniques_completed: u32,
    pub login_days: u32,
}

impl From<&UserGamificationRecord> for UserStats {
    fn from(record: &UserGamificationRecord) -> Self {
        Self {
            xp: record.xp,
            level: record.level,
            streak: record.streak,
            techniques_completed: len_to_u64(record.completed_techniques.len()),
            challenges_completed: len_to_u64(record.completed_challenges.len()),
            virtue_progress: record.virtues_progress.clone(),
            total_challenges_completed: record.total_challenges_completed,
            total_techniques_completed: record.total_techniques_completed,
            login_days: record.login_days,
        }
    }
}

/// A parsed unlock rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BadgeCondition {
    Xp(u64),
    Level(u64),
    Streak(u64),
    Techniques(u64),
    Challenges(u64),
    Virtue { virtue_id: String, threshold: u64 },
    LoginDays(u64),
    FirstChallenge,
    FirstTechnique,
    FirstLogin,
    Unrecognized(String),
}

/// How far a user is toward a numeric condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionProgress {
    pub current: u64,
    pub target: u64,
}

impl ConditionProgress {
    /// Completion ratio clamped to `0.0..=1.0`.
    #[must_use]
    pub fn ratio(self) -> f64 {
        if self.target == 0 {
            return 1.0;
        }
        let ratio = crate::numbers::u64_to_f64(self.current)
            / crate::numbers::u64_to_f64(self.target);
        ratio.clamp(0.0, 1.0)
    }
}

fn counter_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^(xp|level|streak|techniques|challenges|login_days)_(\d+)$").ok()
        })
        .as_ref()
}

fn virtue_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^virtue_([a-z][a-z0-9]*)_(\d+)$").ok())
        .as_ref()
}

impl BadgeCondition {
    /// Parse a condition string; unknown shapes become `Unrecognized`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "first_challenge" => return Self::FirstChallenge,
            "first_technique" => return Self::FirstTechnique,
            "first_login" => return Self::FirstLogin,
            _ => {}
        }

        if let Some(caps) = virtue_pattern().and_then(|re| re.captures(raw))
            && let Ok(threshold) = caps[2].parse::<u64>()
        {
            return Self::Virtue {
                virtue_id: caps[1].to_string(),
                threshold,
            };
        }

        if let Some(caps) = counter_pattern().and_then(|re| re.captures(raw))
            && let Ok(threshold) = caps[2].parse::<u64>()
        {
            return match &caps[1] {
                "xp" => Self::Xp(threshold),
                "level" => Self::Level(threshold),
                "streak" => Self::Streak(threshold),
                "techniques" => Self::Techniques(threshold),
                "challenges" => Self::Challenges(threshold),
                _ => Self::LoginDays(threshold),
            };
        }

        Self::Unrecognized(raw.to_string())
    }

    #[must_use]
    pub const fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// Current value and target for this condition, `None` when unrecognized.
    #[must_use]
    pub fn progress(&self, stats: &UserStats) -> Option<ConditionProgress> {
        let (current, target) = match self {
            Self::Xp(target) => (stats.xp, *target),
            Self::Level(target) => (u64::from(stats.level), *target),
            Self::Streak(target) => (u64::from(stats.streak), *target),
            Self::Techniques(target) => (stats.techniques_completed, *target),
            Self::Challenges(target) => (stats.challenges_completed, *target),
            Self::Virtue {
                virtue_id,
                threshold,
            } => (
                stats
                    .virtue_progress
                    .get(virtue_id)
                    .copied()
                    .map_or(0, u64::from),
                *threshold,
            ),
            Self::LoginDays(target) => (u64::from(stats.login_days), *target),
            Self::FirstChallenge => (u64::from(stats.total_challenges_completed), 1),
            Self::FirstTechnique => (u64::from(stats.total_techniques_completed), 1),
            Self::FirstLogin => (u64::from(stats.login_days), 1),
            Self::Unrecognized(_) => return None,
        };
        Some(ConditionProgress { current, target })
    }

    /// True iff the stat meets or exceeds the threshold.
    #[must_use]
    pub fn is_met(&self, stats: &UserStats) -> bool {
        self.progress(stats)
            .is_some_and(|progress| progress.current >= progress.target)
    }
}

/// Evaluate a raw condition string. Unknown conditions are never eligible.
#[must_use]
pub fn evaluate_condition(condition: &str, stats: &UserStats) -> bool {
    BadgeCondition::parse(condition).is_met(stats)
}

impl From<String> for BadgeCondition {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<BadgeCondition> for String {
    fn from(condition: BadgeCondition) -> Self {
        condition.to_string()
    }
}

impl fmt::Display for BadgeCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xp(n) => write!(f, "xp_{n}"),
            Self::Level(n) => write!(f, "level_{n}"),
            Self::Streak(n) => write!(f, "streak_{n}"),
            Self::Techniques(n) => write!(f, "techniques_{n}"),
            Self::Challenges(n) => write!(f, "challenges_{n}"),
            Self::Virtue {
                virtue_id,
                threshold,
            } => write!(f, "virtue_{virtue_id}_{threshold}"),
            Self::LoginDays(n) => write!(f, "login_days_{n}"),
            Self::FirstChallenge => f.write_str("first_challenge"),
            Self::FirstTechnique => f.write_str("first_technique"),
            Self::FirstLogin => f.write_str("first_login"),
            Self::Unrecognized(raw) => f.write_str(raw),
        }
    }
}
