use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{require_non_empty, ValidationError};

/// An event (conference, kickoff, seminar).
///
/// Sessions, groups and people all belong to exactly one event, and an
/// assignment recompute always runs over a single event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    /// IANA timezone name, informational only (e.g. `Europe/Paris`).
    pub timezone: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// URL of branding assets.
    pub branding: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventInput {
    pub name: String,
    pub timezone: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub branding: Option<String>,
}

impl CreateEventInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.name, "name")?;
        require_non_empty(&self.timezone, "timezone")?;
        if self.end_date < self.start_date {
            return Err(ValidationError::EventEndsBeforeStart);
        }
        Ok(())
    }
}

/// Entity counts included in an event summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventCounts {
    pub sessions: usize,
    pub groups: usize,
    pub participants: usize,
}

/// An event with its entity counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummary {
    pub event: Event,
    pub counts: EventCounts,
}
