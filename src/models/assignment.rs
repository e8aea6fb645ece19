use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What one recompute did for one person.
///
/// Returned to the caller and discarded; the enrollments themselves are the
/// durable outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentDiagnostics {
    pub person_id: Uuid,
    /// Sessions newly enrolled as `assigned` or `optional`.
    pub added_sessions: Vec<Uuid>,
    /// Mandatory sessions that were full and got a `waitlist` enrollment.
    pub waitlisted_sessions: Vec<Uuid>,
    /// Mandatory sessions skipped because they overlap an existing enrollment.
    pub conflicts: Vec<Uuid>,
}

/// Response of a recompute: one diagnostics entry per person, in person order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecomputeResult {
    pub event_id: Uuid,
    pub diagnostics: Vec<AssignmentDiagnostics>,
}
