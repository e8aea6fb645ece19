//! The assignment engine.
//!
//! Given one event's people, memberships, rules, sessions and current
//! enrollments, derives the sessions each person is committed to and records
//! them as rule-sourced enrollments.
//!
//! For each person, in input order:
//!
//! 1. [`RuleResolver`] collapses the rules of the person's groups into
//!    mandatory, optional and excluded sessions.
//! 2. Sessions the person is already enrolled in (any status, any source) are
//!    captured once and never touched again during the pass.
//! 3. Mandatory sessions are visited by descending priority. Excluded ones are
//!    skipped, overlapping ones are reported as conflicts, and the rest are
//!    assigned or, when the [`CapacityLedger`] says the session is full,
//!    waitlisted.
//! 4. Optional sessions are enrolled as `optional` unless excluded or already
//!    enrolled. They are never waitlisted.
//!
//! The engine is synchronous and works on an owned [`Snapshot`]; callers are
//! responsible for ensuring nothing else writes the same event's enrollments
//! while it runs.

mod book;
mod conflict;
mod diagnostics;
mod ledger;
mod resolver;

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::models::*;

pub use book::EnrollmentBook;
pub use conflict::{find_conflicts, overlaps};
pub use diagnostics::{PersonReport, RecomputeTotals};
pub use ledger::CapacityLedger;
pub use resolver::{Resolution, RuleResolver};

/// Sessions of the event being recomputed, by id.
pub type SessionIndex<'a> = HashMap<Uuid, &'a Session>;

/// Everything the engine reads for one event.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// People of the event, in the order diagnostics are reported.
    pub people: Vec<Uuid>,
    pub sessions: Vec<Session>,
    pub rules: Vec<Rule>,
    pub memberships: Vec<Membership>,
    pub enrollments: Vec<Enrollment>,
}

/// Outcome of a recompute.
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    /// One entry per person, in snapshot order.
    pub diagnostics: Vec<AssignmentDiagnostics>,
    /// Enrollments created by this run, in creation order.
    pub created: Vec<Enrollment>,
}

/// Run the assignment engine over a snapshot.
pub fn recompute(snapshot: &Snapshot) -> Assignment {
    let mut engine = AssignmentEngine::new(snapshot);
    let diagnostics = snapshot
        .people
        .iter()
        .map(|person_id| engine.assign_person(*person_id))
        .collect();

    Assignment {
        diagnostics,
        created: engine.created,
    }
}

struct AssignmentEngine<'a> {
    sessions: SessionIndex<'a>,
    resolver: RuleResolver<'a>,
    book: EnrollmentBook,
    ledger: CapacityLedger,
    created: Vec<Enrollment>,
}

impl<'a> AssignmentEngine<'a> {
    fn new(snapshot: &'a Snapshot) -> Self {
        let sessions = snapshot
            .sessions
            .iter()
            .map(|session| (session.id, session))
            .collect();
        let book = EnrollmentBook::from_enrollments(snapshot.enrollments.iter().cloned());
        let ledger = CapacityLedger::from_enrollments(book.iter());

        Self {
            sessions,
            resolver: RuleResolver::new(&snapshot.memberships, &snapshot.rules),
            book,
            ledger,
            created: Vec::new(),
        }
    }

    fn assign_person(&mut self, person_id: Uuid) -> AssignmentDiagnostics {
        let resolution = self.resolver.resolve(person_id, &self.sessions);
        let existing: HashSet<Uuid> = self
            .book
            .of_person(&person_id)
            .map(|enrollment| enrollment.session_id)
            .collect();
        let mut report = PersonReport::new(person_id);

        for session_id in resolution.mandatory_in_order(&self.sessions) {
            if resolution.is_excluded(&session_id) || existing.contains(&session_id) {
                continue;
            }
            let Some(session) = self.sessions.get(&session_id).copied() else {
                continue;
            };

            let overlapping =
                find_conflicts(session, self.book.of_person(&person_id), &self.sessions);
            if !overlapping.is_empty() {
                tracing::debug!(
                    %person_id,
                    session = %session.code,
                    overlapping = overlapping.len(),
                    "mandatory session conflicts with an existing enrollment"
                );
                report.conflict(session_id);
                continue;
            }

            if self.ledger.has_room(session) {
                self.commit(Enrollment::from_rule(
                    person_id,
                    session_id,
                    EnrollmentStatus::Assigned,
                    ASSIGNED_PRIORITY,
                ));
                report.added(session_id);
            } else {
                tracing::debug!(%person_id, session = %session.code, "session full, waitlisting");
                self.commit(Enrollment::from_rule(
                    person_id,
                    session_id,
                    EnrollmentStatus::Waitlist,
                    WAITLIST_PRIORITY,
                ));
                report.waitlisted(session_id);
            }
        }

        for session_id in resolution.optional_in_order(&self.sessions) {
            if resolution.is_excluded(&session_id)
                || existing.contains(&session_id)
                || self.book.contains(&person_id, &session_id)
            {
                continue;
            }
            self.commit(Enrollment::from_rule(
                person_id,
                session_id,
                EnrollmentStatus::Optional,
                OPTIONAL_PRIORITY,
            ));
            report.added(session_id);
        }

        report.finish()
    }

    fn commit(&mut self, enrollment: Enrollment) {
        self.ledger.record(&enrollment);
        self.book.upsert(enrollment.clone());
        self.created.push(enrollment);
    }
}
