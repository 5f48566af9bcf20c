//! Virtue completion percentages.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::catalog::{RuleCatalog, VirtueDef};
use crate::numbers::{len_to_u64, rounded_percent};

/// Per-virtue view used by the progress snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtueSummary {
    pub id: String,
    pub name: String,
    pub meaning: String,
    pub progress: u32,
    pub completed: usize,
    pub total: usize,
}

fn completed_in(virtue: &VirtueDef, completed: &BTreeSet<String>) -> usize {
    virtue
        .challenges
        .iter()
        .filter(|challenge| completed.contains(&challenge.id))
        .count()
}

/// `round(completed / total * 100)` for one virtue; 0 for an unknown virtue.
#[must_use]
pub fn calculate_virtue_progress(
    catalog: &RuleCatalog,
    completed_challenges: &BTreeSet<String>,
    virtue_id: &str,
) -> u32 {
    let Some(virtue) = catalog.virtue(virtue_id) else {
        log::warn!("progress requested for unknown virtue `{virtue_id}`");
        return 0;
    };
    rounded_percent(
        len_to_u64(completed_in(virtue, completed_challenges)),
        len_to_u64(virtue.challenges.len()),
    )
}

/// Summaries for every virtue in catalog order.
#[must_use]
pub fn summarize_virtues(
    catalog: &RuleCatalog,
    completed_challenges: &BTreeSet<String>,
) -> Vec<VirtueSummary> {
    catalog
        .virtues
        .iter()
        .map(|virtue| {
            let completed = completed_in(virtue, completed_challenges);
            let total = virtue.challenges.len();
            VirtueSummary {
                id: virtue.id.clone(),
                name: virtue.name.clone(),
                meaning: virtue.meaning.clone(),
                progress: rounded_percent(len_to_u64(completed), len_to_u64(total)),
                completed,
                total,
            }
        })
        .collect()
}
