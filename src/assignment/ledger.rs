//! Per-session capacity accounting.

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{Enrollment, EnrollmentStatus, Session};

/// Counts `assigned` enrollments per session, across every person of the event.
///
/// Only `assigned` counts against capacity. Waitlisted, optional and declined
/// enrollments take no seat.
#[derive(Debug, Default, Clone)]
pub struct CapacityLedger {
    assigned: HashMap<Uuid, u32>,
}

impl CapacityLedger {
    pub fn from_enrollments<'e>(enrollments: impl IntoIterator<Item = &'e Enrollment>) -> Self {
        let mut ledger = Self::default();
        for enrollment in enrollments {
            ledger.record(enrollment);
        }
        ledger
    }

    /// Account for a newly committed enrollment.
    pub fn record(&mut self, enrollment: &Enrollment) {
        if enrollment.status == EnrollmentStatus::Assigned {
            *self.assigned.entry(enrollment.session_id).or_default() += 1;
        }
    }

    pub fn assigned_count(&self, session_id: &Uuid) -> u32 {
        self.assigned.get(session_id).copied().unwrap_or(0)
    }

    /// Whether one more person can be assigned. Sessions without a capacity
    /// always have room.
    pub fn has_room(&self, session: &Session) -> bool {
        match session.capacity {
            None => true,
            Some(capacity) => self.assigned_count(&session.id) < capacity,
        }
    }
}
