use serde::{Deserialize, Serialize};

use super::requests::XpGrant;
use super::{Baseline, MutationSummary, RuleContext, finish, run_streak};
use crate::record::UserGamificationRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddXpResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub summary: MutationSummary,
}

/// Grant `grant.amount` XP to the record.
pub fn add_xp(
    ctx: &RuleContext<'_>,
    record: &mut UserGamificationRecord,
    grant: XpGrant,
) -> AddXpResult {
    let baseline = Baseline::capture(record);
    record.add_xp(grant.amount);
    let streak = run_streak(ctx, record);
    AddXpResult {
        reason: grant.reason,
        summary: finish(ctx, record, baseline, &streak),
    }
}
