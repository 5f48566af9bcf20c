use anyhow::{Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use aikido_game::{
    AddXpRequest, AdvanceTechniqueRequest, ChallengeOutcome, Clock, CompleteChallengeRequest,
    EngineConfig, EngineError, GamificationEngine, GamificationEvent, ManualClock, MemoryStore,
    MemoryStoreError, ProgressSnapshot, RecordingSink, RuleCatalog, StreakPolicy,
    TechniqueOutcome, TechniqueStatus, UserGamificationRecord, calculate_level, catalog,
};

use super::invariants::{Transition, check_transition};

pub const DEFAULT_SIM_DAYS: u32 = 30;
const SIM_USER: &str = "deshi";

const TECHNIQUES: [&str; 6] = [
    "ikkyo",
    "nikyo",
    "sankyo",
    "iriminage",
    "shihonage",
    "kotegaeshi",
];

/// Challenge ids the catalog does not know; they still complete with default XP.
const OFF_CATALOG_CHALLENGES: [&str; 2] = ["open_mat_visit", "seminar_helper"];

/// Hours between sessions for the streak breaker: same day, next day, the
/// edge of the grace window, and well past it.
const STREAK_GAPS: [i64; 7] = [3, 20, 24, 30, 35, 37, 60];

type Engine = GamificationEngine<MemoryStore, Arc<ManualClock>>;
type CallResult<T> = Result<T, EngineError<MemoryStoreError>>;

/// Rule data shared by every simulation.
#[derive(Debug, Clone)]
pub struct TesterAssets {
    pub config: EngineConfig,
    pub catalog: RuleCatalog,
}

impl TesterAssets {
    #[must_use]
    pub fn load_default() -> Self {
        Self {
            config: EngineConfig::default(),
            catalog: catalog().clone(),
        }
    }

    /// Defaults, with either part replaced from a JSON file.
    pub fn load(config_path: Option<&Path>, catalog_path: Option<&Path>) -> Result<Self> {
        let mut assets = Self::load_default();
        if let Some(path) = config_path {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            assets.config = EngineConfig::from_json(&raw)
                .with_context(|| format!("invalid engine config in {}", path.display()))?;
        }
        if let Some(path) = catalog_path {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read catalog {}", path.display()))?;
            assets.catalog = RuleCatalog::from_json(&raw)
                .with_context(|| format!("invalid rule catalog in {}", path.display()))?;
        }
        Ok(assets)
    }
}

/// How the simulated student practices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PracticeStyle {
    /// Fixed walk through the documented flows.
    Smoke,
    /// Near-daily logins mixed with challenges, techniques and bonus XP.
    DailyPractice,
    /// Logins at irregular gaps around the grace window.
    StreakBreaker,
    /// Random technique statuses, including regressions.
    TechniqueClimber,
    /// Repeated challenge completions, on and off the catalog.
    ChallengeHunter,
}

impl PracticeStyle {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Smoke => "smoke",
            Self::DailyPractice => "daily-practice",
            Self::StreakBreaker => "streak-breaker",
            Self::TechniqueClimber => "technique-climber",
            Self::ChallengeHunter => "challenge-hunter",
        }
    }
}

type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    #[must_use]
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub style: PracticeStyle,
    pub days: Option<u32>,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(style: PracticeStyle) -> Self {
        Self {
            style,
            days: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_days(mut self, days: u32) -> Self {
        self.days = Some(days);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Counts of the notable outcomes seen during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeTally {
    pub level_ups: usize,
    pub badges_unlocked: usize,
    pub milestones: usize,
    pub streak_resets: usize,
    pub already_completed: usize,
    pub not_advancing: usize,
}

#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub style: PracticeStyle,
    pub days_simulated: u32,
    pub calls: usize,
    pub saves: usize,
    pub events: usize,
    pub tally: OutcomeTally,
    pub violations: Vec<String>,
    pub final_record: UserGamificationRecord,
    pub final_progress: Option<ProgressSnapshot>,
}

#[derive(Debug, Clone)]
pub struct GameTester {
    assets: Arc<TesterAssets>,
    verbose: bool,
}

impl GameTester {
    #[must_use]
    pub const fn new(assets: Arc<TesterAssets>, verbose: bool) -> Self {
        Self { assets, verbose }
    }

    #[must_use]
    pub fn try_new(verbose: bool) -> Self {
        Self::new(Arc::new(TesterAssets::load_default()), verbose)
    }

    /// Run one seeded simulation of `plan` and collect what it observed.
    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
        let days = plan.days.unwrap_or(DEFAULT_SIM_DAYS);
        let mut session = SimulationSession::new(&self.assets, seed)?;
        if self.verbose {
            println!(
                "🥋 Starting simulation | seed:{seed} style:{} days:{days}",
                plan.style.label()
            );
        }

        if plan.style == PracticeStyle::Smoke {
            session.play_smoke();
        } else {
            for day in 1..=days {
                session.day = day;
                session.play_day(plan.style);
            }
        }

        Ok(session.finish(plan.style, days))
    }
}

fn simulation_start() -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0)
        .single()
        .context("simulation start is not a valid instant")
}

/// One simulated student against a fresh engine.
struct SimulationSession<'a> {
    assets: &'a TesterAssets,
    policy: StreakPolicy,
    engine: Engine,
    clock: Arc<ManualClock>,
    sink: Arc<RecordingSink>,
    rng: ChaCha8Rng,
    seed: u64,
    day: u32,
    calls: usize,
    tally: OutcomeTally,
    violations: Vec<String>,
}

impl<'a> SimulationSession<'a> {
    fn new(assets: &'a TesterAssets, seed: u64) -> Result<Self> {
        let clock = Arc::new(ManualClock::new(simulation_start()?));
        let sink = Arc::new(RecordingSink::new());
        let engine = GamificationEngine::new(MemoryStore::with_users([SIM_USER]), Arc::clone(&clock))
            .with_config(assets.config.clone())?
            .with_catalog(assets.catalog.clone())?
            .subscribe(sink.clone());
        Ok(Self {
            assets,
            policy: StreakPolicy::from_config(&assets.config),
            engine,
            clock,
            sink,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            day: 0,
            calls: 0,
            tally: OutcomeTally::default(),
            violations: Vec::new(),
        })
    }

    fn record(&self) -> UserGamificationRecord {
        self.engine.store().record(SIM_USER).unwrap_or_default()
    }

    fn advance_hours(&self, hours: i64) {
        self.clock.advance(Duration::hours(hours));
    }

    fn violation(&mut self, label: &str, message: impl fmt::Display) {
        self.violations
            .push(format!("day {} {label}: {message}", self.day));
    }

    fn require(&mut self, holds: bool, label: &str, message: &str) {
        if !holds {
            self.violation(label, message);
        }
    }

    /// Run one engine call and check every invariant across it.
    fn step<T>(
        &mut self,
        label: &str,
        call: impl FnOnce(&Engine) -> CallResult<T>,
        applied: impl FnOnce(&T) -> bool,
    ) -> Option<T> {
        let before = self.record();
        let now = self.clock.now();
        self.calls += 1;
        let outcome = match call(&self.engine) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.violation(label, format!("unexpected error: {err}"));
                return None;
            }
        };
        let after = self.record();
        let transition = Transition {
            before: &before,
            after: &after,
            applied: applied(&outcome),
            now,
        };
        for message in check_transition(&self.assets.catalog, &self.policy, &transition) {
            self.violation(label, message);
        }
        if transition.applied && after.streak == 1 && before.streak > 1 {
            self.tally.streak_resets += 1;
        }
        Some(outcome)
    }

    fn login(&mut self) {
        self.step("login", |engine| engine.record_daily_login(SIM_USER), |_| true);
    }

    fn grant(&mut self, amount: i64) {
        self.step(
            "add-xp",
            |engine| engine.add_xp(SIM_USER, AddXpRequest::new(amount, Some("open mat"))),
            |_| true,
        );
    }

    fn complete(&mut self, challenge_id: &str, virtue_hint: Option<&str>) -> Option<ChallengeOutcome> {
        let seen = self.record().has_completed_challenge(challenge_id);
        let mut request = CompleteChallengeRequest::new(challenge_id);
        if let Some(virtue_id) = virtue_hint {
            request = request.with_virtue(virtue_id);
        }
        let outcome = self.step(
            "complete-challenge",
            |engine| engine.complete_challenge(SIM_USER, request),
            ChallengeOutcome::is_completed,
        )?;
        if outcome.is_completed() == seen {
            self.violation(
                "complete-challenge",
                format!("`{challenge_id}` seen before: {seen}, completed again: {}", outcome.is_completed()),
            );
        }
        if !outcome.is_completed() {
            self.tally.already_completed += 1;
        }
        Some(outcome)
    }

    fn practice(&mut self, technique_id: &str, status: TechniqueStatus) -> Option<TechniqueOutcome> {
        let current = self.record().technique_status(technique_id);
        let outcome = self.step(
            "advance-technique",
            |engine| {
                engine.advance_technique(SIM_USER, AdvanceTechniqueRequest::new(technique_id, status))
            },
            TechniqueOutcome::is_advanced,
        )?;
        let should_advance = current.is_none_or(|current| status > current);
        if outcome.is_advanced() != should_advance {
            self.violation(
                "advance-technique",
                format!("`{technique_id}` {current:?} -> {status}: advanced {}", outcome.is_advanced()),
            );
        }
        if !outcome.is_advanced() {
            self.tally.not_advancing += 1;
        }
        Some(outcome)
    }

    fn random_catalog_challenge(&mut self) -> Option<String> {
        let ids: Vec<&str> = self
            .assets
            .catalog
            .virtues
            .iter()
            .flat_map(|virtue| virtue.challenges.iter().map(|challenge| challenge.id.as_str()))
            .collect();
        ids.choose(&mut self.rng).map(|id| (*id).to_string())
    }

    fn next_status(&mut self, technique_id: &str) -> TechniqueStatus {
        let current = self.record().technique_status(technique_id);
        let next = TechniqueStatus::ALL
            .iter()
            .copied()
            .find(|status| current.is_none_or(|current| *status > current));
        next.unwrap_or(TechniqueStatus::Mastered)
    }

    fn play_day(&mut self, style: PracticeStyle) {
        match style {
            PracticeStyle::Smoke => self.play_smoke(),
            PracticeStyle::DailyPractice => {
                let gap = self.rng.gen_range(20..=28);
                self.advance_hours(gap);
                self.login();
                if self.rng.gen_bool(0.6)
                    && let Some(challenge_id) = self.random_catalog_challenge()
                {
                    self.complete(&challenge_id, None);
                }
                if self.rng.gen_bool(0.4) {
                    let technique_id = TECHNIQUES[self.rng.gen_range(0..TECHNIQUES.len())];
                    let status = self.next_status(technique_id);
                    self.practice(technique_id, status);
                }
                if self.rng.gen_bool(0.3) {
                    let amount = self.rng.gen_range(1..=40);
                    self.grant(amount);
                }
            }
            PracticeStyle::StreakBreaker => {
                let gap = STREAK_GAPS[self.rng.gen_range(0..STREAK_GAPS.len())];
                self.advance_hours(gap);
                self.login();
                if self.rng.gen_bool(0.3) {
                    self.advance_hours(1);
                    self.login();
                }
            }
            PracticeStyle::TechniqueClimber => {
                self.advance_hours(24);
                for _ in 0..self.rng.gen_range(1..=3) {
                    let technique_id = TECHNIQUES[self.rng.gen_range(0..TECHNIQUES.len())];
                    let status = TechniqueStatus::ALL[self.rng.gen_range(0..TechniqueStatus::ALL.len())];
                    self.practice(technique_id, status);
                }
            }
            PracticeStyle::ChallengeHunter => {
                self.advance_hours(24);
                for _ in 0..self.rng.gen_range(1..=4) {
                    if self.rng.gen_bool(0.15) {
                        let challenge_id =
                            OFF_CATALOG_CHALLENGES[self.rng.gen_range(0..OFF_CATALOG_CHALLENGES.len())];
                        self.complete(challenge_id, Some("chugi"));
                    } else if let Some(challenge_id) = self.random_catalog_challenge() {
                        self.complete(&challenge_id, None);
                    }
                }
            }
        }
    }

    /// The documented flows, checked against their exact results.
    fn play_smoke(&mut self) {
        self.day = 1;
        let label = "smoke";

        self.login();
        self.advance_hours(2);
        self.login();
        let record = self.record();
        self.require(
            record.login_days == 1 && record.streak == 1,
            label,
            "same-day logins should count once",
        );

        self.advance_hours(30);
        self.login();
        self.require(
            self.record().streak == 2,
            label,
            "a login 30 hours later on the next day should extend the streak",
        );
        self.advance_hours(40);
        self.login();
        self.require(
            self.record().streak == 1,
            label,
            "a 40 hour gap should reset the streak",
        );

        let base = self.record().xp;
        if let Some(first) = self.step(
            label,
            |engine| engine.add_xp(SIM_USER, AddXpRequest::new(50, None)),
            |_| true,
        ) {
            let summary = &first.summary;
            self.require(
                summary.xp.added == 50 && summary.xp.total == base + 50,
                label,
                "a grant of 50 should add exactly 50",
            );
        }
        if let Some(second) = self.step(
            label,
            |engine| engine.add_xp(SIM_USER, AddXpRequest::new(60, None)),
            |_| true,
        ) {
            let summary = &second.summary;
            let crossed = calculate_level(base + 110) > calculate_level(base + 50);
            self.require(
                summary.xp.total == base + 110
                    && summary.level.current == calculate_level(base + 110)
                    && summary.level.level_up == crossed,
                label,
                "the second grant should report the level it reached",
            );
        }

        self.complete("rei_bow_dojo", None);
        if let Some(ChallengeOutcome::Completed(result)) = self.complete("rei_clean_tatami", None) {
            self.require(
                result.virtue_progress == Some(50),
                label,
                "two of four rei challenges should be 50%",
            );
        }
        let repeat = self.complete("rei_clean_tatami", None);
        self.require(
            repeat.is_some_and(|outcome| !outcome.is_completed()),
            label,
            "repeating a challenge should report it as already completed",
        );

        self.practice("kotegaeshi", TechniqueStatus::Learning);
        self.practice("kotegaeshi", TechniqueStatus::Practicing);
        let back = self.practice("kotegaeshi", TechniqueStatus::Learning);
        self.require(
            matches!(back, Some(TechniqueOutcome::NotAdvancing { .. })),
            label,
            "moving back to learning should not advance",
        );
    }

    fn finish(mut self, style: PracticeStyle, days: u32) -> SimulationSummary {
        let saves = self.engine.store().save_count();
        let final_progress = match self.engine.get_progress(SIM_USER) {
            Ok(progress) => Some(progress),
            Err(err) => {
                self.violation("get-progress", format!("unexpected error: {err}"));
                None
            }
        };
        if self.engine.store().save_count() != saves {
            self.violation("get-progress", "progress query wrote to the store");
        }
        let final_record = self.record();
        if let Some(progress) = &final_progress
            && (progress.xp != final_record.xp || progress.level.current != final_record.level)
        {
            self.violation("get-progress", "snapshot disagrees with the stored record");
        }

        let events = self.sink.events();
        for event in &events {
            match event {
                GamificationEvent::LevelUp { .. } => self.tally.level_ups += 1,
                GamificationEvent::BadgeUnlocked { .. } => self.tally.badges_unlocked += 1,
                GamificationEvent::StreakMilestone { .. } => self.tally.milestones += 1,
                _ => {}
            }
        }
        if self.tally.badges_unlocked != final_record.badges.len() {
            self.violation(
                "events",
                format!(
                    "{} badge events for {} stored badges",
                    self.tally.badges_unlocked,
                    final_record.badges.len()
                ),
            );
        }

        SimulationSummary {
            seed: self.seed,
            style,
            days_simulated: if style == PracticeStyle::Smoke { 1 } else { days },
            calls: self.calls,
            saves,
            events: events.len(),
            tally: self.tally,
            violations: self.violations,
            final_record,
            final_progress,
        }
    }
}
