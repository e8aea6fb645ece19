//! Time-interval conflict detection.

use uuid::Uuid;

use super::SessionIndex;
use crate::models::{Enrollment, EnrollmentStatus, Session};

/// Whether two sessions would double-book the same person.
///
/// Sessions collide only when they share the exact same `day` string and their
/// half-open `[start, end)` ranges overlap. Touching ranges do not collide.
pub fn overlaps(a: &Session, b: &Session) -> bool {
    a.day == b.day && !(a.end <= b.start || a.start >= b.end)
}

/// Sessions among `enrollments` that collide with `candidate`.
///
/// Declined enrollments and enrollments pointing at sessions outside `sessions`
/// are ignored.
pub fn find_conflicts<'e>(
    candidate: &Session,
    enrollments: impl IntoIterator<Item = &'e Enrollment>,
    sessions: &SessionIndex<'_>,
) -> Vec<Uuid> {
    enrollments
        .into_iter()
        .filter(|enrollment| enrollment.status != EnrollmentStatus::Declined)
        .filter_map(|enrollment| sessions.get(&enrollment.session_id))
        .filter(|session| overlaps(session, candidate))
        .map(|session| session.id)
        .collect()
}
