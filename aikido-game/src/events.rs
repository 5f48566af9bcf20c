//! Notifications emitted after a mutation has been persisted.
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

use crate::config::StreakMilestone;
use crate::mutations::{
    AddXpResult, ChallengeOutcome, DailyLoginResult, MutationSummary, TechniqueOutcome,
    UnlockedBadge,
};
use crate::record::TechniqueStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GamificationEvent {
    #[serde(rename_all = "camelCase")]
    XpAwarded {
        user_id: String,
        amount: u64,
        total: u64,
    },
    #[serde(rename_all = "camelCase")]
    LevelUp {
        user_id: String,
        from: u32,
        to: u32,
    },
    #[serde(rename_all = "camelCase")]
    BadgeUnlocked {
        user_id: String,
        badge_id: String,
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    StreakChanged {
        user_id: String,
        current: u32,
        best: u32,
    },
    #[serde(rename_all = "camelCase")]
    StreakMilestone {
        user_id: String,
        days: u32,
        bonus_xp: u64,
    },
    #[serde(rename_all = "camelCase")]
    ChallengeCompleted {
        user_id: String,
        challenge_id: String,
        virtue_id: Option<String>,
        xp: u64,
    },
    #[serde(rename_all = "camelCase")]
    TechniqueAdvanced {
        user_id: String,
        technique_id: String,
        from: Option<TechniqueStatus>,
        to: TechniqueStatus,
        xp: u64,
    },
    #[serde(rename_all = "camelCase")]
    DailyLoginRecorded {
        user_id: String,
        xp: u64,
        streak: u32,
    },
}

impl GamificationEvent {
    #[must_use]
    pub fn user_id(&self) -> &str {
        match self {
            Self::XpAwarded { user_id, .. }
            | Self::LevelUp { user_id, .. }
            | Self::BadgeUnlocked { user_id, .. }
            | Self::StreakChanged { user_id, .. }
            | Self::StreakMilestone { user_id, .. }
            | Self::ChallengeCompleted { user_id, .. }
            | Self::TechniqueAdvanced { user_id, .. }
            | Self::DailyLoginRecorded { user_id, .. } => user_id,
        }
    }
}

/// Receiver of engine notifications.
pub trait EventSink {
    fn emit(&self, event: &GamificationEvent);
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<GamificationEvent>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<GamificationEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Take and clear everything recorded so far.
    pub fn drain(&self) -> Vec<GamificationEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &GamificationEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// The parts of a mutation result that every handler reports alike.
pub(crate) struct Changes<'a> {
    pub xp_added: u64,
    pub xp_total: u64,
    pub previous_level: u32,
    pub level: u32,
    pub streak_updated: bool,
    pub streak: u32,
    pub best_streak: u32,
    pub milestone: Option<StreakMilestone>,
    pub badges: &'a [UnlockedBadge],
}

impl MutationSummary {
    pub(crate) fn changes(&self) -> Changes<'_> {
        Changes {
            xp_added: self.xp.added,
            xp_total: self.xp.total,
            previous_level: self.previous_level(),
            level: self.level.current,
            streak_updated: self.streak.updated,
            streak: self.streak.current,
            best_streak: self.streak.best,
            milestone: self.streak.milestone,
            badges: &self.badges.newly_unlocked,
        }
    }
}

impl DailyLoginResult {
    pub(crate) fn changes(&self) -> Changes<'_> {
        let bonus = self.daily_login.streak_bonus;
        Changes {
            xp_added: self.xp.added,
            xp_total: self.xp.total,
            previous_level: self.previous_level(),
            level: self.level.current,
            streak_updated: self.streak.is_new,
            streak: self.streak.current,
            best_streak: self.streak.best,
            milestone: (bonus > 0).then_some(StreakMilestone {
                days: self.streak.current,
                bonus_xp: bonus,
            }),
            badges: &self.badges.newly_unlocked,
        }
    }
}

/// Events for the shared part of a mutation, in a fixed order.
pub(crate) fn change_events(user_id: &str, changes: &Changes<'_>) -> Vec<GamificationEvent> {
    let mut events = Vec::new();
    if changes.xp_added > 0 {
        events.push(GamificationEvent::XpAwarded {
            user_id: user_id.to_string(),
            amount: changes.xp_added,
            total: changes.xp_total,
        });
    }
    if changes.level > changes.previous_level {
        events.push(GamificationEvent::LevelUp {
            user_id: user_id.to_string(),
            from: changes.previous_level,
            to: changes.level,
        });
    }
    if changes.streak_updated {
        events.push(GamificationEvent::StreakChanged {
            user_id: user_id.to_string(),
            current: changes.streak,
            best: changes.best_streak,
        });
    }
    if let Some(milestone) = changes.milestone {
        events.push(GamificationEvent::StreakMilestone {
            user_id: user_id.to_string(),
            days: milestone.days,
            bonus_xp: milestone.bonus_xp,
        });
    }
    events.extend(
        changes
            .badges
            .iter()
            .map(|badge| GamificationEvent::BadgeUnlocked {
                user_id: user_id.to_string(),
                badge_id: badge.id.clone(),
                name: badge.name.clone(),
            }),
    );
    events
}

/// Mutation results that know which events they imply.
pub(crate) trait Notify {
    fn events(&self, user_id: &str) -> Vec<GamificationEvent>;
}

impl Notify for AddXpResult {
    fn events(&self, user_id: &str) -> Vec<GamificationEvent> {
        change_events(user_id, &self.summary.changes())
    }
}

impl Notify for ChallengeOutcome {
    fn events(&self, user_id: &str) -> Vec<GamificationEvent> {
        let Self::Completed(result) = self else {
            return Vec::new();
        };
        let mut events = vec![GamificationEvent::ChallengeCompleted {
            user_id: user_id.to_string(),
            challenge_id: result.challenge.id.clone(),
            virtue_id: result.challenge.virtue_id.clone(),
            xp: result.challenge.xp_earned,
        }];
        events.extend(change_events(user_id, &result.summary.changes()));
        events
    }
}

impl Notify for TechniqueOutcome {
    fn events(&self, user_id: &str) -> Vec<GamificationEvent> {
        let Self::Advanced(result) = self else {
            return Vec::new();
        };
        let mut events = vec![GamificationEvent::TechniqueAdvanced {
            user_id: user_id.to_string(),
            technique_id: result.technique.id.clone(),
            from: result.technique.previous_status,
            to: result.technique.new_status,
            xp: result.technique.xp_earned,
        }];
        events.extend(change_events(user_id, &result.summary.changes()));
        events
    }
}

impl Notify for DailyLoginResult {
    fn events(&self, user_id: &str) -> Vec<GamificationEvent> {
        let mut events = Vec::new();
        if self.daily_login.recorded {
            events.push(GamificationEvent::DailyLoginRecorded {
                user_id: user_id.to_string(),
                xp: self.daily_login.xp_earned,
                streak: self.streak.current,
            });
        }
        events.extend(change_events(user_id, &self.changes()));
        events
    }
}
