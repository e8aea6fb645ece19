use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{require_non_empty, ValidationError};

/// A named set of participants within an event.
///
/// Groups carry no behavior of their own. They are the key that [`super::Rule`]s
/// attach to and that people join through a [`Membership`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub event_id: Uuid,
    pub code: String,
    pub name: String,
    /// Display color (e.g. `#FFD700`).
    pub color: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a group within an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupInput {
    pub code: String,
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
}

impl CreateGroupInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.code, "code")?;
        require_non_empty(&self.name, "name")
    }
}

/// A (person, group) pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Membership {
    pub person_id: Uuid,
    pub group_id: Uuid,
}

/// Input replacing the full set of groups a person belongs to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetMembershipsInput {
    #[serde(default)]
    pub group_ids: Vec<Uuid>,
}
