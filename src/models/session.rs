use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{require_non_empty, ValidationError};

/// A scheduled slot of an event.
///
/// Sessions are **given**, never computed: the assignment engine reads their
/// day, time range and capacity but does not move them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub event_id: Uuid,
    /// Short human-facing code (e.g. `WS-A`). Secondary ordering key for
    /// equal-priority sessions during assignment.
    pub code: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: SessionKind,
    pub description: Option<String>,
    /// Calendar day as authored (e.g. `2025-09-17`). Compared verbatim.
    pub day: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
    /// Maximum number of `assigned` enrollments. `None` means unlimited.
    pub capacity: Option<u32>,
}

/// What kind of slot a session is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Plenary,
    Workshop,
    TeamBuilding,
    Transport,
    Logistics,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plenary => "plenary",
            Self::Workshop => "workshop",
            Self::TeamBuilding => "team_building",
            Self::Transport => "transport",
            Self::Logistics => "logistics",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "plenary" => Some(Self::Plenary),
            "workshop" => Some(Self::Workshop),
            "team_building" => Some(Self::TeamBuilding),
            "transport" => Some(Self::Transport),
            "logistics" => Some(Self::Logistics),
            _ => None,
        }
    }
}

/// Input for creating a session within an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionInput {
    pub code: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: SessionKind,
    pub description: Option<String>,
    pub day: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
}

impl CreateSessionInput {
    pub fn into_session(self, event_id: Uuid) -> Result<Session, ValidationError> {
        let session = Session {
            id: Uuid::new_v4(),
            event_id,
            code: self.code,
            title: self.title,
            kind: self.kind,
            description: self.description,
            day: self.day,
            start: self.start,
            end: self.end,
            location: self.location,
            capacity: self.capacity,
        };
        validate_session(&session)?;
        Ok(session)
    }
}

/// Input for updating a session. All fields are optional for partial updates;
/// `description`, `location` and `capacity` are cleared by an explicit `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSessionInput {
    pub code: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<SessionKind>,
    #[serde(
        default,
        deserialize_with = "super::nullable::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    pub day: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "super::nullable::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<Option<String>>,
    /// `null` makes the session unlimited.
    #[serde(
        default,
        deserialize_with = "super::nullable::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub capacity: Option<Option<u32>>,
}

impl UpdateSessionInput {
    /// Merge the update over `existing`, validating the merged session as a whole.
    pub fn apply(self, existing: Session) -> Result<Session, ValidationError> {
        let session = Session {
            id: existing.id,
            event_id: existing.event_id,
            code: self.code.unwrap_or(existing.code),
            title: self.title.unwrap_or(existing.title),
            kind: self.kind.unwrap_or(existing.kind),
            description: self.description.unwrap_or(existing.description),
            day: self.day.unwrap_or(existing.day),
            start: self.start.unwrap_or(existing.start),
            end: self.end.unwrap_or(existing.end),
            location: self.location.unwrap_or(existing.location),
            capacity: self.capacity.unwrap_or(existing.capacity),
        };
        validate_session(&session)?;
        Ok(session)
    }
}

fn validate_session(session: &Session) -> Result<(), ValidationError> {
    require_non_empty(&session.code, "code")?;
    require_non_empty(&session.title, "title")?;
    require_non_empty(&session.day, "day")?;
    if session.end <= session.start {
        return Err(ValidationError::EndBeforeStart);
    }
    if session.capacity == Some(0) {
        return Err(ValidationError::NotPositive("capacity"));
    }
    Ok(())
}
