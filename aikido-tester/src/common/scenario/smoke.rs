use anyhow::{Result, ensure};

use super::{TestScenario, no_violations};
use crate::logic::{PracticeStyle, SimulationPlan, SimulationSummary};

/// Calls made by the scripted walk: four logins, two grants, three
/// completions and three technique updates.
const SMOKE_CALLS: usize = 12;

pub struct SmokeScenario;

impl SmokeScenario {
    pub fn plan() -> SimulationPlan {
        SimulationPlan::new(PracticeStyle::Smoke)
            .with_expectation(no_violations)
            .with_expectation(smoke_expectation)
    }

    pub fn scenario() -> TestScenario {
        TestScenario::simulation("Smoke Test", Self::plan())
    }
}

fn smoke_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.calls == SMOKE_CALLS,
        "smoke walk made {} calls, expected {SMOKE_CALLS}",
        summary.calls
    );
    ensure!(
        summary.tally.already_completed == 1 && summary.tally.not_advancing == 1,
        "smoke walk should hit exactly one repeat and one regression"
    );
    // Every call but the two no-ops persists.
    ensure!(
        summary.saves == SMOKE_CALLS - 2,
        "expected {} saves, store saw {}",
        SMOKE_CALLS - 2,
        summary.saves
    );
    let progress = summary
        .final_progress
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("progress snapshot missing"))?;
    ensure!(
        progress.challenges.completed.len() == 2,
        "two challenges should show as completed"
    );
    Ok(())
}
