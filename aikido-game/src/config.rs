//! Engine configuration: streak timing and XP rewards.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_CHALLENGE_XP, DEFAULT_DAILY_LOGIN_XP, DEFAULT_DISCOVERED_XP, DEFAULT_LEARNING_XP,
    DEFAULT_MASTERED_XP, DEFAULT_PRACTICING_XP, DEFAULT_STREAK_GRACE_HOURS,
    DEFAULT_STREAK_MILESTONES, MAX_UTC_OFFSET_MINUTES, MIN_STREAK_GRACE_HOURS,
    MIN_STREAK_MILESTONE_DAYS,
};
use crate::record::TechniqueStatus;

/// Errors raised when engine configuration invariants are violated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    Parse(String),
    #[error("streak grace window must be at least {min}h (got {value}h)")]
    GraceTooShort { min: i64, value: i64 },
    #[error("UTC offset must be within ±{max} minutes (got {value})")]
    OffsetOutOfRange { max: i32, value: i32 },
    #[error("technique XP must increase along the status order ({lower} -> {higher})")]
    TechniqueXpNotIncreasing {
        lower: TechniqueStatus,
        higher: TechniqueStatus,
    },
    #[error("streak milestones must be strictly increasing and non-zero (at {days} days)")]
    MilestoneOrder { days: u32 },
    #[error("streak milestone at {days} days can never be reached by an increment (minimum {min})")]
    MilestoneUnreachable { days: u32, min: u32 },
}

/// Bonus awarded when a streak increment lands exactly on `days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakMilestone {
    pub days: u32,
    pub bonus_xp: u64,
}

/// XP granted at each technique status. A technique advance awards the
/// difference between the target and previous status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechniqueXp {
    pub discovered: u64,
    pub learning: u64,
    pub practicing: u64,
    pub mastered: u64,
}

impl TechniqueXp {
    #[must_use]
    pub const fn value(&self, status: TechniqueStatus) -> u64 {
        match status {
            TechniqueStatus::Discovered => self.discovered,
            TechniqueStatus::Learning => self.learning,
            TechniqueStatus::Practicing => self.practicing,
            TechniqueStatus::Mastered => self.mastered,
        }
    }

    /// XP for moving from `previous` (or from nothing) to `target`.
    #[must_use]
    pub const fn advance_reward(
        &self,
        previous: Option<TechniqueStatus>,
        target: TechniqueStatus,
    ) -> u64 {
        let baseline = match previous {
            Some(status) => self.value(status),
            None => 0,
        };
        self.value(target).saturating_sub(baseline)
    }
}

impl Default for TechniqueXp {
    fn default() -> Self {
        Self {
            discovered: DEFAULT_DISCOVERED_XP,
            learning: DEFAULT_LEARNING_XP,
            practicing: DEFAULT_PRACTICING_XP,
            mastered: DEFAULT_MASTERED_XP,
        }
    }
}

/// XP reward table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Awarded for challenges that are not in the catalog.
    #[serde(default = "RewardConfig::default_challenge_complete")]
    pub challenge_complete: u64,
    #[serde(default = "RewardConfig::default_daily_login")]
    pub daily_login: u64,
    #[serde(default)]
    pub technique: TechniqueXp,
    #[serde(default = "RewardConfig::default_streak_milestones")]
    pub streak_milestones: Vec<StreakMilestone>,
}

impl RewardConfig {
    const fn default_challenge_complete() -> u64 {
        DEFAULT_CHALLENGE_XP
    }

    const fn default_daily_login() -> u64 {
        DEFAULT_DAILY_LOGIN_XP
    }

    fn default_streak_milestones() -> Vec<StreakMilestone> {
        DEFAULT_STREAK_MILESTONES
            .iter()
            .map(|&(days, bonus_xp)| StreakMilestone { days, bonus_xp })
            .collect()
    }

    /// Bonus for a streak that just became `streak`, if it is a milestone.
    #[must_use]
    pub fn milestone_bonus(&self, streak: u32) -> Option<StreakMilestone> {
        self.streak_milestones
            .iter()
            .find(|milestone| milestone.days == streak)
            .copied()
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            challenge_complete: Self::default_challenge_complete(),
            daily_login: Self::default_daily_login(),
            technique: TechniqueXp::default(),
            streak_milestones: Self::default_streak_milestones(),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hours of inactivity after which a streak restarts at 1.
    #[serde(default = "EngineConfig::default_streak_grace_hours")]
    pub streak_grace_hours: i64,
    /// Offset used to decide where one calendar day ends.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub rewards: RewardConfig,
}

impl EngineConfig {
    const fn default_streak_grace_hours() -> i64 {
        DEFAULT_STREAK_GRACE_HOURS
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or validation fails.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.streak_grace_hours < MIN_STREAK_GRACE_HOURS {
            return Err(ConfigError::GraceTooShort {
                min: MIN_STREAK_GRACE_HOURS,
                value: self.streak_grace_hours,
            });
        }
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(ConfigError::OffsetOutOfRange {
                max: MAX_UTC_OFFSET_MINUTES,
                value: self.utc_offset_minutes,
            });
        }

        let technique = &self.rewards.technique;
        for pair in TechniqueStatus::ALL.windows(2) {
            let (lower, higher) = (pair[0], pair[1]);
            if technique.value(lower) >= technique.value(higher) {
                return Err(ConfigError::TechniqueXpNotIncreasing { lower, higher });
            }
        }

        let mut previous = 0;
        for milestone in &self.rewards.streak_milestones {
            if milestone.days != 0 && milestone.days < MIN_STREAK_MILESTONE_DAYS {
                return Err(ConfigError::MilestoneUnreachable {
                    days: milestone.days,
                    min: MIN_STREAK_MILESTONE_DAYS,
                });
            }
            if milestone.days <= previous {
                return Err(ConfigError::MilestoneOrder {
                    days: milestone.days,
                });
            }
            previous = milestone.days;
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            streak_grace_hours: Self::default_streak_grace_hours(),
            utc_offset_minutes: 0,
            rewards: RewardConfig::default(),
        }
    }
}
