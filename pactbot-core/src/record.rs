//! Contract analysis records.
//!
//! A [`ContractRecord`] is the unit the record store reads, caches and
//! deletes. Its JSON form is camelCase with the analysis fields flattened to
//! the top level, which is also exactly what the cache holds.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{ContractId, OwnerId, Timestamp};

/// Highest allowed `overallScore`.
pub const MAX_OVERALL_SCORE: u8 = 100;

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_AI_MODEL: &str = "gemini-pro";
pub const DEFAULT_CATEGORY: &str = "general";

/// Three-step rating used for severity, impact and priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    #[default]
    Medium,
    High,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_ai_model() -> String {
    DEFAULT_AI_MODEL.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Risk {
    pub description: String,
    #[serde(default)]
    pub severity: Level,
    #[serde(default = "default_category")]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Opportunity {
    pub description: String,
    #[serde(default)]
    pub impact: Level,
    #[serde(default = "default_category")]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NegotiationPoint {
    pub description: String,
    #[serde(default)]
    pub priority: Level,
    #[serde(default = "default_category")]
    pub category: String,
}

/// Structured analysis produced by the AI completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ContractAnalysis {
    pub summary: String,
    #[serde(default)]
    pub risks: Vec<Risk>,
    #[serde(default)]
    pub opportunities: Vec<Opportunity>,
    #[serde(default)]
    pub negotiation_points: Vec<NegotiationPoint>,
    pub overall_score: u8,
}

impl ContractAnalysis {
    /// Check required fields and ranges.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("summary", &self.summary)?;

        if self.overall_score > MAX_OVERALL_SCORE {
            return Err(ValidationError::InvalidValue {
                field: "overallScore".to_string(),
                reason: format!(
                    "must be between 0 and {}, got {}",
                    MAX_OVERALL_SCORE, self.overall_score
                ),
            });
        }

        for (i, risk) in self.risks.iter().enumerate() {
            require_text(&format!("risks[{i}].description"), &risk.description)?;
        }
        for (i, item) in self.opportunities.iter().enumerate() {
            require_text(&format!("opportunities[{i}].description"), &item.description)?;
        }
        for (i, item) in self.negotiation_points.iter().enumerate() {
            require_text(
                &format!("negotiationPoints[{i}].description"),
                &item.description,
            )?;
        }

        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// An analysis submitted for storage, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct NewContract {
    pub contract_text: String,
    pub contract_type: String,
    #[serde(flatten)]
    pub analysis: ContractAnalysis,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub ai_model: Option<String>,
}

impl NewContract {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("contractText", &self.contract_text)?;
        require_text("contractType", &self.contract_type)?;
        self.analysis.validate()
    }
}

/// A stored contract analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ContractRecord {
    pub id: ContractId,
    pub owner: OwnerId,
    pub contract_text: String,
    pub contract_type: String,
    #[serde(flatten)]
    pub analysis: ContractAnalysis,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_ai_model")]
    pub ai_model: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl ContractRecord {
    /// Build a record for `owner` from a validated submission.
    ///
    /// Assigns a fresh id and sets both timestamps to now.
    pub fn create(owner: OwnerId, new: NewContract) -> Result<Self, ValidationError> {
        new.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: ContractId::generate(),
            owner,
            contract_text: new.contract_text,
            contract_type: new.contract_type,
            analysis: new.analysis,
            language: new.language.unwrap_or_else(default_language),
            ai_model: new.ai_model.unwrap_or_else(default_ai_model),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        &self.owner == owner
    }
}
