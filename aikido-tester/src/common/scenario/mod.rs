use anyhow::{Result, ensure};

use crate::logic::{PracticeStyle, SimulationPlan, SimulationSummary};

pub mod smoke;

// Logic test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }

    /// Same scenario, simulated over `days` days.
    #[must_use]
    pub fn with_days(mut self, days: u32) -> Self {
        self.plan = self.plan.with_days(days);
        self
    }
}

pub(crate) fn no_violations(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.violations.is_empty(),
        "{} invariant violation(s), first: {}",
        summary.violations.len(),
        summary.violations.first().map_or("", String::as_str)
    );
    Ok(())
}

fn daily_practice_expectation(summary: &SimulationSummary) -> Result<()> {
    let record = &summary.final_record;
    ensure!(
        record.login_days > 0 && record.xp > 0,
        "a month of practice should log days and earn XP"
    );
    ensure!(
        summary.final_progress.is_some(),
        "progress snapshot should be readable after practice"
    );
    Ok(())
}

fn streak_breaker_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.calls >= summary.days_simulated as usize,
        "streak breaker should log in every simulated day"
    );
    ensure!(
        summary.final_record.best_streak >= summary.final_record.streak,
        "best streak fell below the current streak"
    );
    Ok(())
}

fn technique_climber_expectation(summary: &SimulationSummary) -> Result<()> {
    let record = &summary.final_record;
    ensure!(
        summary.days_simulated == 0 || !record.technique_progress.is_empty(),
        "technique climber never recorded a technique"
    );
    ensure!(
        record.completed_techniques.len() <= record.technique_progress.len(),
        "more completed techniques than tracked ones"
    );
    Ok(())
}

fn challenge_hunter_expectation(summary: &SimulationSummary) -> Result<()> {
    let record = &summary.final_record;
    ensure!(
        summary.days_simulated == 0 || record.total_challenges_completed > 0,
        "challenge hunter never completed a challenge"
    );
    ensure!(
        record.virtues_progress.values().all(|progress| *progress <= 100),
        "virtue progress above 100%"
    );
    Ok(())
}

fn practice_scenario(
    name: &str,
    style: PracticeStyle,
    expectation: fn(&SimulationSummary) -> Result<()>,
) -> TestScenario {
    TestScenario::simulation(
        name,
        SimulationPlan::new(style)
            .with_expectation(no_violations)
            .with_expectation(expectation),
    )
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    match name.to_lowercase().as_str() {
        "smoke" => Some(smoke::SmokeScenario::scenario()),
        "daily-practice" | "daily" => Some(practice_scenario(
            "Daily Practice",
            PracticeStyle::DailyPractice,
            daily_practice_expectation,
        )),
        "streak-breaker" | "streaks" => Some(practice_scenario(
            "Streak Breaker",
            PracticeStyle::StreakBreaker,
            streak_breaker_expectation,
        )),
        "technique-climber" | "techniques" => Some(practice_scenario(
            "Technique Climber",
            PracticeStyle::TechniqueClimber,
            technique_climber_expectation,
        )),
        "challenge-hunter" | "challenges" => Some(practice_scenario(
            "Challenge Hunter",
            PracticeStyle::ChallengeHunter,
            challenge_hunter_expectation,
        )),
        _ => None,
    }
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "Smoke Test"),
        ("daily-practice", "Daily Practice"),
        ("streak-breaker", "Streak Breaker"),
        ("technique-climber", "Technique Climber"),
        ("challenge-hunter", "Challenge Hunter"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_resolves() {
        for (key, description) in list_scenarios() {
            let scenario = get_scenario(key).unwrap();
            assert_eq!(scenario.name, description);
            assert!(!scenario.plan.expectations.is_empty());
        }
    }

    #[test]
    fn aliases_and_case_resolve() {
        assert_eq!(get_scenario("STREAKS").unwrap().name, "Streak Breaker");
        assert_eq!(get_scenario("techniques").unwrap().plan.style, PracticeStyle::TechniqueClimber);
        assert!(get_scenario("randori").is_none());
    }

    #[test]
    fn with_days_overrides_the_plan() {
        let scenario = get_scenario("daily").unwrap().with_days(3);
        assert_eq!(scenario.plan.days, Some(3));
    }

    #[test]
    fn no_violations_quotes_the_first_one() {
        let plan = SimulationPlan::new(PracticeStyle::StreakBreaker).with_days(2);
        let mut summary = crate::logic::GameTester::try_new(false)
            .run_plan(&plan, 11)
            .unwrap();
        assert!(no_violations(&summary).is_ok());
        summary.violations.push("day 2 login: streak drifted".into());
        let err = no_violations(&summary).unwrap_err();
        assert!(err.to_string().contains("streak drifted"));
    }
}
