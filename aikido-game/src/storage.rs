//! Persistence boundary.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

use crate::record::{UserAccount, UserGamificationRecord};

/// Storage of user accounts and their gamification records.
/// Platform-specific implementations should provide this.
pub trait ProgressStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load a user account.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read. A missing user is
    /// `Ok(None)`.
    fn load_user(&self, user_id: &str) -> Result<Option<UserAccount>, Self::Error>;

    /// Replace the gamification record of an existing user.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save_progress(
        &self,
        user_id: &str,
        record: &UserGamificationRecord,
    ) -> Result<(), Self::Error>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryStoreError {
    #[error("user `{0}` does not exist")]
    UnknownUser(String),
    #[error("store is unavailable")]
    Unavailable,
}

/// In-process store keyed by user id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<String, UserAccount>>,
    saves: AtomicUsize,
    offline: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the given user ids registered and no gamification data.
    #[must_use]
    pub fn with_users<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for id in ids {
            store.insert_user(UserAccount::new(id));
        }
        store
    }

    pub fn insert_user(&self, account: UserAccount) {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(account.id.clone(), account);
    }

    /// Current gamification record of a user, if any.
    #[must_use]
    pub fn record(&self, user_id: &str) -> Option<UserGamificationRecord> {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .and_then(|account| account.gamification.clone())
    }

    /// Number of successful `save_progress` calls.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every call fail with [`MemoryStoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), MemoryStoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(MemoryStoreError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl ProgressStore for MemoryStore {
    type Error = MemoryStoreError;

    fn load_user(&self, user_id: &str) -> Result<Option<UserAccount>, Self::Error> {
        self.check_online()?;
        Ok(self
            .users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned())
    }

    fn save_progress(
        &self,
        user_id: &str,
        record: &UserGamificationRecord,
    ) -> Result<(), Self::Error> {
        self.check_online()?;
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        let account = users
            .get_mut(user_id)
            .ok_or_else(|| MemoryStoreError::UnknownUser(user_id.to_string()))?;
        account.gamification = Some(record.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saves_replace_the_sub_record() {
        let store = MemoryStore::with_users(["u1"]);
        assert!(store.load_user("u1").unwrap().unwrap().gamification.is_none());
        let record = UserGamificationRecord {
            xp: 30,
            ..UserGamificationRecord::new()
        };
        store.save_progress("u1", &record).unwrap();
        assert_eq!(store.record("u1").unwrap().xp, 30);
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn unknown_users_are_not_created() {
        let store = MemoryStore::new();
        assert!(store.load_user("ghost").unwrap().is_none());
        assert_eq!(
            store.save_progress("ghost", &UserGamificationRecord::new()),
            Err(MemoryStoreError::UnknownUser("ghost".into()))
        );
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn offline_store_fails_every_call() {
        let store = MemoryStore::with_users(["u1"]);
        store.set_offline(true);
        assert_eq!(store.load_user("u1"), Err(MemoryStoreError::Unavailable));
        store.set_offline(false);
        assert!(store.load_user("u1").is_ok());
    }
}
