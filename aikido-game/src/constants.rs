//! Centralized tuning constants for the gamification core.
//!
//! Values that operators may want to retune live in [`crate::config::EngineConfig`]
//! instead. The constants here are fixed by the rules of the system and only
//! change through reviewed code changes.

// Levels -------------------------------------------------------------------
/// Width of every level band, in XP.
pub const XP_PER_LEVEL: u64 = 100;

// Streaks ------------------------------------------------------------------
pub(crate) const DEFAULT_STREAK_GRACE_HOURS: i64 = 36;
/// A grace window shorter than one day would break streaks of daily users.
pub(crate) const MIN_STREAK_GRACE_HOURS: i64 = 24;
pub(crate) const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

// Rewards ------------------------------------------------------------------
pub(crate) const DEFAULT_CHALLENGE_XP: u64 = 20;
pub(crate) const DEFAULT_DAILY_LOGIN_XP: u64 = 5;
pub(crate) const DEFAULT_DISCOVERED_XP: u64 = 10;
pub(crate) const DEFAULT_LEARNING_XP: u64 = 25;
pub(crate) const DEFAULT_PRACTICING_XP: u64 = 50;
pub(crate) const DEFAULT_MASTERED_XP: u64 = 100;
pub(crate) const DEFAULT_STREAK_MILESTONES: [(u32, u64); 3] = [(7, 50), (30, 200), (100, 500)];
/// A streak only increments from day two; day one is always a fresh start.
pub(crate) const MIN_STREAK_MILESTONE_DAYS: u32 = 2;

// Progress snapshot --------------------------------------------------------
pub(crate) const NEXT_TO_UNLOCK_LIMIT: usize = 3;
