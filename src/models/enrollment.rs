use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValidationError;

/// Priority written on enrollments the engine assigns.
pub const ASSIGNED_PRIORITY: i32 = 80;
/// Priority written on enrollments the engine waitlists.
pub const WAITLIST_PRIORITY: i32 = 50;
/// Priority written on optional enrollments.
pub const OPTIONAL_PRIORITY: i32 = 40;

/// The association of a person with a session.
///
/// At most one enrollment exists per `(person_id, session_id)` pair: storage
/// keys on the pair and every write is an upsert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Enrollment {
    pub person_id: Uuid,
    pub session_id: Uuid,
    pub status: EnrollmentStatus,
    pub priority: i32,
    pub source: EnrollmentSource,
}

impl Enrollment {
    /// An enrollment created by the assignment engine.
    pub fn from_rule(
        person_id: Uuid,
        session_id: Uuid,
        status: EnrollmentStatus,
        priority: i32,
    ) -> Self {
        Self {
            person_id,
            session_id,
            status,
            priority,
            source: EnrollmentSource::Rule,
        }
    }
}

/// Enrollment status.
///
/// The engine only ever moves a pair from absent to `Assigned`, `Optional` or
/// `Waitlist`. `Declined` is reachable through manual or import edits only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Assigned,
    Optional,
    Waitlist,
    Declined,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Optional => "optional",
            Self::Waitlist => "waitlist",
            Self::Declined => "declined",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "assigned" => Some(Self::Assigned),
            "optional" => Some(Self::Optional),
            "waitlist" => Some(Self::Waitlist),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }
}

/// Who produced an enrollment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentSource {
    Rule,
    Manual,
    Import,
}

impl EnrollmentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rule => "rule",
            Self::Manual => "manual",
            Self::Import => "import",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "rule" => Some(Self::Rule),
            "manual" => Some(Self::Manual),
            "import" => Some(Self::Import),
            _ => None,
        }
    }
}

/// Input for a manual or imported enrollment of a person in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetEnrollmentInput {
    pub status: EnrollmentStatus,
    /// Defaults to 100: operator decisions outrank rule output.
    pub priority: Option<i32>,
    /// Defaults to `Manual`. `Rule` is rejected.
    pub source: Option<EnrollmentSource>,
}

impl SetEnrollmentInput {
    pub fn into_enrollment(
        self,
        person_id: Uuid,
        session_id: Uuid,
    ) -> Result<Enrollment, ValidationError> {
        let source = self.source.unwrap_or(EnrollmentSource::Manual);
        if source == EnrollmentSource::Rule {
            return Err(ValidationError::ReservedSource);
        }
        let priority = self.priority.unwrap_or(100);
        if !(0..=100).contains(&priority) {
            return Err(ValidationError::PriorityOutOfRange(priority));
        }
        Ok(Enrollment {
            person_id,
            session_id,
            status: self.status,
            priority,
            source,
        })
    }
}
