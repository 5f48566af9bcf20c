use serde::{Deserialize, Serialize};

use super::requests::ChallengeCompletion;
use super::{Baseline, MutationSummary, RuleContext, finish, run_streak};
use crate::record::UserGamificationRecord;
use crate::virtues::calculate_virtue_progress;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeSummary {
    pub id: String,
    pub xp_earned: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtue_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResult {
    pub challenge: ChallengeSummary,
    /// Recomputed percentage of the owning virtue, when the catalog knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtue_progress: Option<u32>,
    #[serde(flatten)]
    pub summary: MutationSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ChallengeOutcome {
    Completed(ChallengeResult),
    /// Second completion of the same challenge; nothing was changed.
    #[serde(rename_all = "camelCase")]
    AlreadyCompleted { challenge_id: String },
}

impl ChallengeOutcome {
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Record a challenge completion. Each challenge id completes at most once.
pub fn complete_challenge(
    ctx: &RuleContext<'_>,
    record: &mut UserGamificationRecord,
    completion: ChallengeCompletion,
) -> ChallengeOutcome {
    let ChallengeCompletion {
        challenge_id,
        virtue_hint,
    } = completion;
    if record.has_completed_challenge(&challenge_id) {
        log::debug!("challenge `{challenge_id}` already completed");
        return ChallengeOutcome::AlreadyCompleted { challenge_id };
    }

    let baseline = Baseline::capture(record);
    let (xp_earned, virtue_id) = match ctx.catalog.find_challenge(&challenge_id) {
        Some(found) => (found.challenge.xp, Some(found.virtue.id.clone())),
        None => {
            log::warn!("challenge `{challenge_id}` is not in the catalog; using default reward");
            (ctx.config.rewards.challenge_complete, virtue_hint)
        }
    };

    record.completed_challenges.insert(challenge_id.clone());
    record.total_challenges_completed = record.total_challenges_completed.saturating_add(1);
    record.add_xp(xp_earned);

    let virtue_progress = virtue_id
        .as_deref()
        .filter(|id| ctx.catalog.virtue(id).is_some())
        .map(|id| {
            let progress = calculate_virtue_progress(ctx.catalog, &record.completed_challenges, id);
            record.virtues_progress.insert(id.to_string(), progress);
            progress
        });

    let streak = run_streak(ctx, record);
    ChallengeOutcome::Completed(ChallengeResult {
        challenge: ChallengeSummary {
            id: challenge_id,
            xp_earned,
            virtue_id,
        },
        virtue_progress,
        summary: finish(ctx, record, baseline, &streak),
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{at, ctx};
    use super::*;

    fn completion(id: &str) -> ChallengeCompletion {
        ChallengeCompletion {
            challenge_id: id.into(),
            virtue_hint: None,
        }
    }

    fn completed(outcome: ChallengeOutcome) -> ChallengeResult {
        match outcome {
            ChallengeOutcome::Completed(result) => result,
            ChallengeOutcome::AlreadyCompleted { challenge_id } => {
                panic!("expected completion of {challenge_id}")
            }
        }
    }

    #[test]
    fn second_rei_challenge_reaches_half_and_unlocks_initiate() {
        let ctx = ctx(at(2024, 6, 1, 18));
        let mut record = UserGamificationRecord::new();
        completed(complete_challenge(&ctx, &mut record, completion("rei_bow_dojo")));
        let result = completed(complete_challenge(&ctx, &mut record, completion("rei_thank_partner")));

        assert_eq!(result.virtue_progress, Some(50));
        assert_eq!(result.challenge.virtue_id.as_deref(), Some("rei"));
        assert_eq!(record.virtues_progress.get("rei"), Some(&50));
        assert_eq!(record.total_challenges_completed, 2);
        let unlocked: Vec<&str> = result
            .summary
            .badges
            .newly_unlocked
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(unlocked, ["rei_initiate"]);
        assert!(record.badges.contains("first_challenge"));
    }

    #[test]
    fn repeat_completion_changes_nothing() {
        let ctx = ctx(at(2024, 6, 1, 18));
        let mut record = UserGamificationRecord::new();
        completed(complete_challenge(&ctx, &mut record, completion("yu_randori")));
        let before = record.clone();

        let later = super::super::test_support::ctx(at(2024, 6, 2, 18));
        let outcome = complete_challenge(&later, &mut record, completion("yu_randori"));
        assert_eq!(
            outcome,
            ChallengeOutcome::AlreadyCompleted {
                challenge_id: "yu_randori".into()
            }
        );
        assert_eq!(record, before);
    }

    #[test]
    fn unknown_challenge_uses_default_reward_and_hint() {
        let ctx = ctx(at(2024, 6, 1, 18));
        let mut record = UserGamificationRecord::new();
        let result = completed(complete_challenge(
            &ctx,
            &mut record,
            ChallengeCompletion {
                challenge_id: "guest_seminar".into(),
                virtue_hint: Some("rei".into()),
            },
        ));
        assert_eq!(result.challenge.xp_earned, 20);
        assert_eq!(result.virtue_progress, Some(0));
        assert_eq!(record.xp, 20);
        assert!(record.completed_challenges.contains("guest_seminar"));
    }

    #[test]
    fn unknown_hint_is_echoed_without_progress() {
        let ctx = ctx(at(2024, 6, 1, 18));
        let mut record = UserGamificationRecord::new();
        let result = completed(complete_challenge(
            &ctx,
            &mut record,
            ChallengeCompletion {
                challenge_id: "tea_ceremony".into(),
                virtue_hint: Some("wa".into()),
            },
        ));
        assert_eq!(result.challenge.virtue_id.as_deref(), Some("wa"));
        assert_eq!(result.virtue_progress, None);
        assert!(record.virtues_progress.is_empty());
    }

    #[test]
    fn outcome_is_tagged_in_json() {
        let outcome = ChallengeOutcome::AlreadyCompleted {
            challenge_id: "gi_on_time".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "alreadyCompleted");
        assert_eq!(json["challengeId"], "gi_on_time");
    }
}
