//! Static rule catalog: virtues and their challenges, badges, trophies and titles.
//!
//! The catalog is plain data consulted by the generic evaluators in
//! [`crate::badges`] and [`crate::virtues`]. The default catalog is embedded
//! at build time and parsed once per process.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;
use thiserror::Error;

use crate::condition::BadgeCondition;

const DEFAULT_CATALOG_DATA: &str = include_str!("../assets/data/gamification.json");

/// Errors raised when catalog data is malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("JSON parse error: {0}")]
    Parse(String),
    #[error("duplicate {kind} id `{id}`")]
    DuplicateId { kind: &'static str, id: String },
    #[error("virtue `{0}` has no challenges")]
    EmptyVirtue(String),
    #[error("badge `{badge}` uses unsupported condition `{condition}`")]
    UnsupportedCondition { badge: String, condition: String },
    #[error("badge `{badge}` references unknown virtue `{virtue}`")]
    UnknownVirtue { badge: String, virtue: String },
    #[error("title ladder must start at 0 XP and strictly increase")]
    TitleLadder,
    #[error("special title references unknown badge `{0}`")]
    UnknownBadge(String),
}

/// One challenge inside a virtue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeDef {
    pub id: String,
    pub name: String,
    pub xp: u64,
}

/// A badge and the condition that unlocks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub condition: BadgeCondition,
}

/// A virtue with its own challenge list and badges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtueDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub meaning: String,
    pub challenges: Vec<ChallengeDef>,
    #[serde(default)]
    pub badges: Vec<BadgeDef>,
}

/// Rung of the XP title ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleTier {
    pub threshold: u64,
    pub title: String,
}

/// Honorific granted by holding a particular badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTitle {
    pub badge: String,
    pub title: String,
}

/// Where a challenge id resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeLookup<'a> {
    pub virtue: &'a VirtueDef,
    pub challenge: &'a ChallengeDef,
}

/// Immutable, loaded-once rule table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCatalog {
    #[serde(default)]
    pub virtues: Vec<VirtueDef>,
    #[serde(default)]
    pub trophies: Vec<BadgeDef>,
    #[serde(default)]
    pub titles: Vec<TitleTier>,
    #[serde(default)]
    pub special_titles: Vec<SpecialTitle>,
}

impl RuleCatalog {
    /// Load and validate a catalog from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or validation fails.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self =
            serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// The catalog embedded in the crate.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_CATALOG_DATA).unwrap_or_else(|err| {
            log::error!("embedded rule catalog rejected: {err}");
            Self::default()
        })
    }

    /// Check catalog invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut virtue_ids = HashSet::new();
        let mut challenge_ids = HashSet::new();
        for virtue in &self.virtues {
            if !virtue_ids.insert(virtue.id.as_str()) {
                return Err(CatalogError::DuplicateId {
                    kind: "virtue",
                    id: virtue.id.clone(),
                });
            }
            if virtue.challenges.is_empty() {
                return Err(CatalogError::EmptyVirtue(virtue.id.clone()));
            }
            for challenge in &virtue.challenges {
                if !challenge_ids.insert(challenge.id.as_str()) {
                    return Err(CatalogError::DuplicateId {
                        kind: "challenge",
                        id: challenge.id.clone(),
                    });
                }
            }
        }

        let mut badge_ids = HashSet::new();
        for badge in self.badges() {
            if !badge_ids.insert(badge.id.as_str()) {
                return Err(CatalogError::DuplicateId {
                    kind: "badge",
                    id: badge.id.clone(),
                });
            }
            match &badge.condition {
                BadgeCondition::Unrecognized(raw) => {
                    return Err(CatalogError::UnsupportedCondition {
                        badge: badge.id.clone(),
                        condition: raw.clone(),
                    });
                }
                BadgeCondition::Virtue { virtue_id, .. }
                    if !virtue_ids.contains(virtue_id.as_str()) =>
                {
                    return Err(CatalogError::UnknownVirtue {
                        badge: badge.id.clone(),
                        virtue: virtue_id.clone(),
                    });
                }
                _ => {}
            }
        }

        let ladder_ok = self.titles.first().is_some_and(|tier| tier.threshold == 0)
            && self
                .titles
                .windows(2)
                .all(|pair| pair[0].threshold < pair[1].threshold);
        if !ladder_ok {
            return Err(CatalogError::TitleLadder);
        }

        if let Some(special) = self
            .special_titles
            .iter()
            .find(|special| !badge_ids.contains(special.badge.as_str()))
        {
            return Err(CatalogError::UnknownBadge(special.badge.clone()));
        }

        Ok(())
    }

    /// Every badge in stable order: virtue badges in declaration order, then trophies.
    pub fn badges(&self) -> impl Iterator<Item = &BadgeDef> {
        self.virtues
            .iter()
            .flat_map(|virtue| virtue.badges.iter())
            .chain(self.trophies.iter())
    }

    #[must_use]
    pub fn badge(&self, badge_id: &str) -> Option<&BadgeDef> {
        self.badges().find(|badge| badge.id == badge_id)
    }

    #[must_use]
    pub fn virtue(&self, virtue_id: &str) -> Option<&VirtueDef> {
        self.virtues.iter().find(|virtue| virtue.id == virtue_id)
    }

    /// Resolve a challenge id to its owning virtue.
    #[must_use]
    pub fn find_challenge(&self, challenge_id: &str) -> Option<ChallengeLookup<'_>> {
        self.virtues.iter().find_map(|virtue| {
            virtue
                .challenges
                .iter()
                .find(|challenge| challenge.id == challenge_id)
                .map(|challenge| ChallengeLookup { virtue, challenge })
        })
    }

    /// Title for the highest ladder threshold not above `xp`.
    #[must_use]
    pub fn title_for_xp(&self, xp: u64) -> &str {
        self.titles
            .iter()
            .rev()
            .find(|tier| tier.threshold <= xp)
            .map_or("", |tier| tier.title.as_str())
    }

    /// Special titles unlocked by the given badge set, in catalog order.
    pub fn special_titles_for<'a, I>(&'a self, earned: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let earned: HashSet<&str> = earned.into_iter().map(String::as_str).collect();
        self.special_titles
            .iter()
            .filter(|special| earned.contains(special.badge.as_str()))
            .map(|special| special.title.as_str())
            .collect()
    }

    /// Number of challenges across every virtue.
    #[must_use]
    pub fn total_challenges(&self) -> usize {
        self.virtues.iter().map(|virtue| virtue.challenges.len()).sum()
    }
}

/// Process-wide embedded catalog.
#[must_use]
pub fn catalog() -> &'static RuleCatalog {
    static CATALOG: OnceLock<RuleCatalog> = OnceLock::new();
    CATALOG.get_or_init(RuleCatalog::load_from_static)
}
