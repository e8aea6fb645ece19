use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValidationError;

/// Declarative policy binding a group to a set of sessions.
///
/// Every member of `group_id` is subject to the rule. When several rules reach
/// the same person and session, exclusion wins over inclusion, and the highest
/// include priority decides the processing order of mandatory sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: Uuid,
    pub group_id: Uuid,
    #[serde(rename = "type")]
    pub kind: RuleType,
    /// Referenced sessions. Never empty. References to sessions outside the
    /// event are tolerated and ignored at recompute time.
    pub session_ids: Vec<Uuid>,
    /// 0–100, higher is more important.
    pub priority: i32,
    /// Reserved for group-level quotas. Stored, never enforced.
    pub quota: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// How a rule affects the sessions it references.
///
/// - `Include`: mandatory, assigned or waitlisted
/// - `Exclude`: never enrolled by the engine, overrides the other two
/// - `Optional`: offered on a best-effort basis, never waitlisted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Include,
    Exclude,
    Optional,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::Exclude => "exclude",
            Self::Optional => "optional",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "include" => Some(Self::Include),
            "exclude" => Some(Self::Exclude),
            "optional" => Some(Self::Optional),
            _ => None,
        }
    }
}

/// Input for attaching a rule to a group. The group comes from the request path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRuleInput {
    #[serde(rename = "type")]
    pub kind: RuleType,
    pub session_ids: Vec<Uuid>,
    pub priority: i32,
    #[serde(default)]
    pub quota: Option<u32>,
}

impl CreateRuleInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.session_ids.is_empty() {
            return Err(ValidationError::Empty("session_ids"));
        }
        if !(0..=100).contains(&self.priority) {
            return Err(ValidationError::PriorityOutOfRange(self.priority));
        }
        if self.quota == Some(0) {
            return Err(ValidationError::NotPositive("quota"));
        }
        Ok(())
    }
}
