//! Level and XP arithmetic.
//!
//! Levels are fixed-width bands of [`XP_PER_LEVEL`] points: level 1 covers
//! `0..100`, level 2 covers `100..200`, and so on.

use serde::{Deserialize, Serialize};

use crate::constants::XP_PER_LEVEL;
use crate::numbers::rounded_percent;

/// Calculate level from total XP: `floor(xp / 100) + 1`.
#[must_use]
pub fn calculate_level(xp: u64) -> u32 {
    u32::try_from(xp / XP_PER_LEVEL).map_or(u32::MAX, |band| band.saturating_add(1))
}

/// XP at which `level` begins: `(level - 1) * 100`.
#[must_use]
pub fn xp_for_level(level: u32) -> u64 {
    u64::from(level.saturating_sub(1)).saturating_mul(XP_PER_LEVEL)
}

/// Progress within the current level band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    /// XP earned since the current level began.
    pub current: u64,
    /// XP span of the current level.
    pub required: u64,
    /// `round(current / required * 100)`.
    pub progress: u32,
}

/// Calculate XP progress toward the next level.
#[must_use]
pub fn xp_to_next_level(xp: u64) -> LevelProgress {
    let level = calculate_level(xp);
    let floor = xp_for_level(level);
    let current = xp.saturating_sub(floor);
    let required = xp_for_level(level.saturating_add(1)).saturating_sub(floor);
    LevelProgress {
        current,
        required,
        progress: rounded_percent(current, required),
    }
}
