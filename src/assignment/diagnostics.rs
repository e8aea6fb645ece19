//! Per-person outcome reporting.

use serde::Serialize;
use uuid::Uuid;

use crate::models::AssignmentDiagnostics;

/// Accumulates what happened to one person during a recompute.
#[derive(Debug)]
pub struct PersonReport {
    diagnostics: AssignmentDiagnostics,
}

impl PersonReport {
    pub fn new(person_id: Uuid) -> Self {
        Self {
            diagnostics: AssignmentDiagnostics {
                person_id,
                ..Default::default()
            },
        }
    }

    pub fn added(&mut self, session_id: Uuid) {
        self.diagnostics.added_sessions.push(session_id);
    }

    pub fn waitlisted(&mut self, session_id: Uuid) {
        self.diagnostics.waitlisted_sessions.push(session_id);
    }

    pub fn conflict(&mut self, session_id: Uuid) {
        self.diagnostics.conflicts.push(session_id);
    }

    pub fn finish(self) -> AssignmentDiagnostics {
        self.diagnostics
    }
}

/// Event-wide totals of a recompute, for logs and the audit trail.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RecomputeTotals {
    pub people: usize,
    pub added: usize,
    pub waitlisted: usize,
    pub conflicts: usize,
}

impl RecomputeTotals {
    pub fn from_diagnostics(diagnostics: &[AssignmentDiagnostics]) -> Self {
        diagnostics.iter().fold(
            Self {
                people: diagnostics.len(),
                ..Default::default()
            },
            |mut totals, entry| {
                totals.added += entry.added_sessions.len();
                totals.waitlisted += entry.waitlisted_sessions.len();
                totals.conflicts += entry.conflicts.len();
                totals
            },
        )
    }
}
