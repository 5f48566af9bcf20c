//! Mutation requests as sent by the API layer, and their validated forms.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GamificationError;
use crate::record::TechniqueStatus;

fn required_text(value: Option<String>, field: &'static str) -> Result<String, GamificationError> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(GamificationError::MissingField(field))
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Direct XP grant. `amount` stays untyped so malformed input can be
/// reported as an invalid amount instead of a decoding failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddXpRequest {
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub reason: Option<String>,
}

/// A validated XP grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpGrant {
    pub amount: u64,
    pub reason: Option<String>,
}

impl AddXpRequest {
    #[must_use]
    pub fn new(amount: i64, reason: Option<&str>) -> Self {
        Self {
            amount: Value::from(amount),
            reason: reason.map(str::to_string),
        }
    }

    /// # Errors
    ///
    /// Returns [`GamificationError::InvalidAmount`] unless `amount` is a
    /// positive integer.
    pub fn validate(self) -> Result<XpGrant, GamificationError> {
        let amount = self
            .amount
            .as_u64()
            .filter(|amount| *amount > 0)
            .ok_or_else(|| GamificationError::InvalidAmount(self.amount.to_string()))?;
        Ok(XpGrant {
            amount,
            reason: optional_text(self.reason),
        })
    }
}

/// Challenge completion request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteChallengeRequest {
    #[serde(default)]
    pub challenge_id: Option<String>,
    /// Owning virtue for challenges the catalog does not know.
    #[serde(default)]
    pub virtue_id: Option<String>,
}

/// A validated challenge completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeCompletion {
    pub challenge_id: String,
    pub virtue_hint: Option<String>,
}

impl CompleteChallengeRequest {
    #[must_use]
    pub fn new(challenge_id: &str) -> Self {
        Self {
            challenge_id: Some(challenge_id.to_string()),
            virtue_id: None,
        }
    }

    #[must_use]
    pub fn with_virtue(mut self, virtue_id: &str) -> Self {
        self.virtue_id = Some(virtue_id.to_string());
        self
    }

    /// # Errors
    ///
    /// Returns [`GamificationError::MissingField`] when `challengeId` is absent or blank.
    pub fn validate(self) -> Result<ChallengeCompletion, GamificationError> {
        Ok(ChallengeCompletion {
            challenge_id: required_text(self.challenge_id, "challengeId")?,
            virtue_hint: optional_text(self.virtue_id),
        })
    }
}

/// Technique status advance request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceTechniqueRequest {
    #[serde(default)]
    pub technique_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub kyu_id: Option<String>,
}

/// A validated technique advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TechniqueAdvance {
    pub technique_id: String,
    pub status: TechniqueStatus,
    pub kyu_id: Option<String>,
}

impl AdvanceTechniqueRequest {
    #[must_use]
    pub fn new(technique_id: &str, status: TechniqueStatus) -> Self {
        Self {
            technique_id: Some(technique_id.to_string()),
            status: Some(status.key().to_string()),
            kyu_id: None,
        }
    }

    #[must_use]
    pub fn with_kyu(mut self, kyu_id: &str) -> Self {
        self.kyu_id = Some(kyu_id.to_string());
        self
    }

    /// # Errors
    ///
    /// Returns [`GamificationError::MissingField`] for absent fields and
    /// [`GamificationError::InvalidStatus`] for a status outside the vocabulary.
    pub fn validate(self) -> Result<TechniqueAdvance, GamificationError> {
        let technique_id = required_text(self.technique_id, "techniqueId")?;
        let status = required_text(self.status, "status")?.parse()?;
        Ok(TechniqueAdvance {
            technique_id,
            status,
            kyu_id: optional_text(self.kyu_id),
        })
    }
}

/// Decode a request body, reporting undecodable shapes as a missing field.
///
/// # Errors
///
/// Returns [`GamificationError::MissingField`] naming `body` when the JSON
/// value is not an object of the expected shape.
pub fn decode_request<T>(body: Value) -> Result<T, GamificationError>
where
    T: serde::de::DeserializeOwned,
{
    if !body.is_object() {
        return Err(GamificationError::MissingField("body"));
    }
    serde_json::from_value(body).map_err(|_| GamificationError::MissingField("body"))
}
