//! Enrollments keyed by (person, session).

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::Enrollment;

/// In-memory enrollment set with at most one record per (person, session).
#[derive(Debug, Default, Clone)]
pub struct EnrollmentBook {
    by_person: HashMap<Uuid, HashMap<Uuid, Enrollment>>,
}

impl EnrollmentBook {
    pub fn from_enrollments(enrollments: impl IntoIterator<Item = Enrollment>) -> Self {
        let mut book = Self::default();
        for enrollment in enrollments {
            book.upsert(enrollment);
        }
        book
    }

    /// Insert or replace the record for the enrollment's pair, returning the
    /// record it replaced.
    pub fn upsert(&mut self, enrollment: Enrollment) -> Option<Enrollment> {
        self.by_person
            .entry(enrollment.person_id)
            .or_default()
            .insert(enrollment.session_id, enrollment)
    }

    pub fn get(&self, person_id: &Uuid, session_id: &Uuid) -> Option<&Enrollment> {
        self.by_person.get(person_id)?.get(session_id)
    }

    pub fn contains(&self, person_id: &Uuid, session_id: &Uuid) -> bool {
        self.get(person_id, session_id).is_some()
    }

    /// Every enrollment of one person, any status.
    pub fn of_person(&self, person_id: &Uuid) -> impl Iterator<Item = &Enrollment> + '_ {
        self.by_person
            .get(person_id)
            .into_iter()
            .flat_map(|sessions| sessions.values())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Enrollment> + '_ {
        self.by_person.values().flat_map(|sessions| sessions.values())
    }

    pub fn len(&self) -> usize {
        self.by_person.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
