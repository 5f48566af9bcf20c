//! Aikido@Game gamification core
//!
//! Platform-agnostic rules for XP, levels, badges, practice streaks and
//! virtue progress, plus a storage-agnostic engine that loads a user's
//! record, applies one mutation in memory and saves it once.

pub mod badges;
pub mod catalog;
pub mod clock;
pub mod condition;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod level;
pub mod mutations;
pub mod numbers;
pub mod progress;
pub mod record;
pub mod storage;
pub mod streak;
pub mod virtues;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// Re-export commonly used types
pub use badges::{BadgeStatus, check_new_badges, get_all_badges_with_status, next_to_unlock};
pub use catalog::{BadgeDef, CatalogError, ChallengeDef, RuleCatalog, VirtueDef, catalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use condition::{BadgeCondition, ConditionProgress, UserStats, evaluate_condition};
pub use config::{ConfigError, EngineConfig, RewardConfig, StreakMilestone, TechniqueXp};
pub use error::{EngineError, GamificationError};
pub use events::{EventSink, GamificationEvent, RecordingSink};
pub use level::{LevelProgress, calculate_level, xp_for_level, xp_to_next_level};
pub use mutations::requests::{
    AddXpRequest, AdvanceTechniqueRequest, CompleteChallengeRequest, decode_request,
};
pub use mutations::{
    AddXpResult, ChallengeOutcome, ChallengeResult, DailyLoginResult, MutationSummary,
    RuleContext, TechniqueOutcome, TechniqueResult,
};
pub use progress::{ProgressSnapshot, build_progress};
pub use record::{TechniqueStatus, UserAccount, UserGamificationRecord};
pub use storage::{MemoryStore, MemoryStoreError, ProgressStore};
pub use streak::{StreakDecision, StreakPolicy, StreakStatus, StreakUpdate};
pub use virtues::{VirtueSummary, calculate_virtue_progress, summarize_virtues};

use events::Notify;

type SharedSink = Arc<dyn EventSink + Send + Sync>;

/// Engine that runs gamification mutations against a [`ProgressStore`].
pub struct GamificationEngine<S, C = SystemClock>
where
    S: ProgressStore,
    C: Clock,
{
    store: S,
    clock: C,
    catalog: Arc<RuleCatalog>,
    config: EngineConfig,
    policy: StreakPolicy,
    sinks: Vec<SharedSink>,
    user_locks: LockTable,
}

impl<S> GamificationEngine<S, SystemClock>
where
    S: ProgressStore,
{
    /// Engine over `store` using wall-clock time and the embedded catalog.
    pub fn with_system_clock(store: S) -> Self {
        Self::new(store, SystemClock)
    }
}

impl<S, C> GamificationEngine<S, C>
where
    S: ProgressStore,
    C: Clock,
{
    /// Create an engine with the embedded catalog and default configuration.
    pub fn new(store: S, clock: C) -> Self {
        let config = EngineConfig::default();
        Self {
            store,
            clock,
            catalog: Arc::new(catalog().clone()),
            policy: StreakPolicy::from_config(&config),
            config,
            sinks: Vec::new(),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the engine configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration violates its invariants.
    pub fn with_config(mut self, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.policy = StreakPolicy::from_config(&config);
        self.config = config;
        Ok(self)
    }

    /// Replace the rule catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog fails validation.
    pub fn with_catalog(mut self, catalog: RuleCatalog) -> Result<Self, CatalogError> {
        catalog.validate()?;
        self.catalog = Arc::new(catalog);
        Ok(self)
    }

    /// Register a sink for events emitted after successful saves.
    #[must_use]
    pub fn subscribe(mut self, sink: SharedSink) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Award XP directly.
    ///
    /// # Errors
    ///
    /// Rejects a non-positive or non-integer amount, an unknown user, or a
    /// store failure. Nothing is written on error.
    pub fn add_xp(
        &self,
        user_id: &str,
        request: AddXpRequest,
    ) -> Result<AddXpResult, EngineError<S::Error>> {
        let grant = request.validate()?;
        if let Some(reason) = &grant.reason {
            log::debug!("xp grant for `{user_id}`: {} ({reason})", grant.amount);
        }
        self.mutate(user_id, |ctx, record| mutations::add_xp(ctx, record, grant))
    }

    /// Mark a challenge complete.
    ///
    /// # Errors
    ///
    /// Rejects a missing challenge id, an unknown user, or a store failure.
    /// A repeated completion is [`ChallengeOutcome::AlreadyCompleted`], not an error.
    pub fn complete_challenge(
        &self,
        user_id: &str,
        request: CompleteChallengeRequest,
    ) -> Result<ChallengeOutcome, EngineError<S::Error>> {
        let completion = request.validate()?;
        self.mutate(user_id, |ctx, record| {
            mutations::complete_challenge(ctx, record, completion)
        })
    }

    /// Move a technique to a higher status.
    ///
    /// # Errors
    ///
    /// Rejects a missing id, an unknown status, an unknown user, or a store
    /// failure. A non-advancing status is [`TechniqueOutcome::NotAdvancing`].
    pub fn advance_technique(
        &self,
        user_id: &str,
        request: AdvanceTechniqueRequest,
    ) -> Result<TechniqueOutcome, EngineError<S::Error>> {
        let advance = request.validate()?;
        self.mutate(user_id, |ctx, record| {
            mutations::advance_technique(ctx, record, advance)
        })
    }

    /// Count today as a practice day.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown user or a store failure.
    pub fn record_daily_login(
        &self,
        user_id: &str,
    ) -> Result<DailyLoginResult, EngineError<S::Error>> {
        self.mutate(user_id, mutations::record_daily_login)
    }

    /// Read-only progress snapshot. Never writes.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown user or a store failure.
    pub fn get_progress(&self, user_id: &str) -> Result<ProgressSnapshot, EngineError<S::Error>> {
        let account = self.load(user_id)?;
        Ok(build_progress(
            &self.catalog,
            &self.policy,
            &account.record_or_default(),
            self.clock.now(),
        ))
    }

    fn load(&self, user_id: &str) -> Result<UserAccount, EngineError<S::Error>> {
        self.store
            .load_user(user_id)
            .map_err(EngineError::Store)?
            .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))
    }

    fn user_lock(&self, user_id: &str) -> UserLease<'_> {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let lock = Arc::clone(locks.entry(user_id.to_string()).or_default());
        UserLease {
            table: &self.user_locks,
            user_id: user_id.to_string(),
            lock: Some(lock),
        }
    }

    /// Load, apply in memory, save once if anything changed, then notify.
    fn mutate<T, F>(&self, user_id: &str, apply: F) -> Result<T, EngineError<S::Error>>
    where
        T: Notify,
        F: FnOnce(&RuleContext<'_>, &mut UserGamificationRecord) -> T,
    {
        let lease = self.user_lock(user_id);
        let _guard = lease.acquire();

        let account = self.load(user_id)?;
        let loaded = account.record_or_default();
        let mut record = loaded.clone();
        let ctx = RuleContext::new(&self.catalog, &self.config, self.clock.now());
        let outcome = apply(&ctx, &mut record);
        if record == loaded {
            log::debug!("no change for `{user_id}`; skipping save");
            return Ok(outcome);
        }

        self.store
            .save_progress(user_id, &record)
            .map_err(EngineError::Store)?;
        let events = outcome.events(user_id);
        self.publish(&events);
        Ok(outcome)
    }

    fn publish(&self, events: &[GamificationEvent]) {
        for event in events {
            match event {
                GamificationEvent::LevelUp { user_id, from, to } => {
                    log::info!("`{user_id}` reached level {to} (from {from})");
                }
                GamificationEvent::BadgeUnlocked {
                    user_id, badge_id, ..
                } => log::info!("`{user_id}` unlocked badge `{badge_id}`"),
                _ => {}
            }
            for sink in &self.sinks {
                sink.emit(event);
            }
        }
    }
}

type LockTable = Mutex<HashMap<String, Arc<Mutex<()>>>>;

/// A caller's hold on one user's lock. The table entry is dropped with the
/// last lease, so ids that are no longer in flight do not accumulate.
struct UserLease<'a> {
    table: &'a LockTable,
    user_id: String,
    lock: Option<Arc<Mutex<()>>>,
}

impl UserLease<'_> {
    fn acquire(&self) -> Option<MutexGuard<'_, ()>> {
        self.lock
            .as_ref()
            .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Drop for UserLease<'_> {
    fn drop(&mut self) {
        let Some(lock) = self.lock.take() else {
            return;
        };
        let mut locks = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // The count only changes under the table lock: one for the table, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&self.user_id);
        }
        drop(lock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn engine() -> GamificationEngine<MemoryStore, ManualClock> {
        let start = Utc.with_ymd_and_hms(2024, 10, 1, 18, 0, 0).single().unwrap();
        GamificationEngine::new(MemoryStore::with_users(["u1"]), ManualClock::new(start))
    }

    #[test]
    fn engine_creates_record_lazily() {
        let engine = engine();
        assert!(engine.store().record("u1").is_none());
        let result = engine.add_xp("u1", AddXpRequest::new(10, None)).unwrap();
        assert_eq!(result.summary.xp.total, 10);
        assert_eq!(engine.store().record("u1").unwrap().xp, 10);
        assert_eq!(engine.store().save_count(), 1);
    }

    #[test]
    fn rejects_before_loading() {
        let engine = engine();
        let err = engine.add_xp("u1", AddXpRequest::new(0, None)).unwrap_err();
        assert!(matches!(err, EngineError::Rejected(GamificationError::InvalidAmount(_))));
        assert!(err.is_client_error());
        assert_eq!(engine.store().save_count(), 0);
    }

    #[test]
    fn unknown_user_is_not_found() {
        let engine = engine();
        let err = engine.record_daily_login("ghost").unwrap_err();
        assert!(matches!(err, EngineError::UserNotFound(ref id) if id == "ghost"));
        assert!(engine.get_progress("ghost").is_err());
    }

    fn lock_table_len(engine: &GamificationEngine<MemoryStore, ManualClock>) -> usize {
        engine
            .user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[test]
    fn lock_table_does_not_grow_with_unknown_users() {
        let engine = engine();
        for i in 0..1000 {
            let err = engine.record_daily_login(&format!("ghost-{i}")).unwrap_err();
            assert!(matches!(err, EngineError::UserNotFound(_)));
        }
        assert_eq!(lock_table_len(&engine), 0);
    }

    #[test]
    fn lock_entries_are_released_after_each_call() {
        let engine = engine();
        engine.record_daily_login("u1").unwrap();
        engine.add_xp("u1", AddXpRequest::new(5, None)).unwrap();
        assert_eq!(lock_table_len(&engine), 0);

        let lease = engine.user_lock("u1");
        let second = engine.user_lock("u1");
        drop(lease);
        assert_eq!(lock_table_len(&engine), 1);
        drop(second);
        assert_eq!(lock_table_len(&engine), 0);
    }

    #[test]
    fn config_is_validated() {
        let config = EngineConfig {
            streak_grace_hours: 12,
            ..EngineConfig::default()
        };
        assert!(engine().with_config(config).is_err());
    }
}
