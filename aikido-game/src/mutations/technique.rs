use serde::{Deserialize, Serialize};

use super::requests::TechniqueAdvance;
use super::{Baseline, MutationSummary, RuleContext, finish, run_streak};
use crate::record::{TechniqueStatus, UserGamificationRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechniqueSummary {
    pub id: String,
    pub previous_status: Option<TechniqueStatus>,
    pub new_status: TechniqueStatus,
    pub xp_earned: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kyu_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechniqueResult {
    pub technique: TechniqueSummary,
    pub total_techniques_completed: u32,
    #[serde(flatten)]
    pub summary: MutationSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum TechniqueOutcome {
    Advanced(TechniqueResult),
    /// Requested status is not above the recorded one; nothing was changed.
    #[serde(rename_all = "camelCase")]
    NotAdvancing {
        technique_id: String,
        current: TechniqueStatus,
        requested: TechniqueStatus,
    },
}

impl TechniqueOutcome {
    #[must_use]
    pub const fn is_advanced(&self) -> bool {
        matches!(self, Self::Advanced(_))
    }
}

/// Move a technique forward. XP is the difference between the target
/// reward and the reward already paid for the previous status, so skipping
/// statuses pays the same as walking through them.
pub fn advance_technique(
    ctx: &RuleContext<'_>,
    record: &mut UserGamificationRecord,
    advance: TechniqueAdvance,
) -> TechniqueOutcome {
    let TechniqueAdvance {
        technique_id,
        status,
        kyu_id,
    } = advance;
    let previous = record.technique_status(&technique_id);
    if let Some(current) = previous
        && current >= status
    {
        log::debug!("technique `{technique_id}` stays at {current} (requested {status})");
        return TechniqueOutcome::NotAdvancing {
            technique_id,
            current,
            requested: status,
        };
    }

    let baseline = Baseline::capture(record);
    let xp_earned = ctx.config.rewards.technique.advance_reward(previous, status);
    record.technique_progress.insert(technique_id.clone(), status);
    if status == TechniqueStatus::Mastered
        && record.completed_techniques.insert(technique_id.clone())
    {
        record.total_techniques_completed = record.total_techniques_completed.saturating_add(1);
    }
    record.add_xp(xp_earned);

    let streak = run_streak(ctx, record);
    TechniqueOutcome::Advanced(TechniqueResult {
        technique: TechniqueSummary {
            id: technique_id,
            previous_status: previous,
            new_status: status,
            xp_earned,
            kyu_id,
        },
        total_techniques_completed: record.total_techniques_completed,
        summary: finish(ctx, record, baseline, &streak),
    })
}
