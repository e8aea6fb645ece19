use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enrollment::Enrollment;
use super::error::{require_non_empty, ValidationError};
use super::profile::{merge_section, Accommodation, Diet, MissingInfo, Preferences, Transport};

/// A participant of an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Person {
    pub id: Uuid,
    pub event_id: Uuid,
    /// Identifier in the customer's own system (CRM id, badge number...).
    pub external_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub role: Option<String>,
    pub notes: Option<String>,
    pub diet: Option<Diet>,
    pub accessibility: Option<String>,
    pub transport: Option<Transport>,
    pub accommodation: Option<Accommodation>,
    pub preferences: Option<Preferences>,
}

impl Person {
    pub fn is_missing(&self, info: MissingInfo) -> bool {
        match info {
            MissingInfo::Allergens => !self.diet.as_ref().is_some_and(Diet::has_allergens),
            MissingInfo::Transport => self
                .transport
                .as_ref()
                .and_then(|transport| transport.arrival.as_ref())
                .is_none(),
        }
    }
}

/// One row of a people import.
///
/// Rows are matched against existing participants of the event by email,
/// then phone, then external id. A matched participant is updated with the
/// fields present in the row; otherwise a new participant is created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportPersonInput {
    pub external_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub role: Option<String>,
    pub notes: Option<String>,
    pub diet: Option<Diet>,
    pub accessibility: Option<String>,
    pub transport: Option<Transport>,
    pub accommodation: Option<Accommodation>,
    pub preferences: Option<Preferences>,
    /// When present and non-empty, replaces the person's group memberships.
    #[serde(default)]
    pub memberships: Option<Vec<Uuid>>,
}

impl ImportPersonInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.first_name, "first_name")?;
        require_non_empty(&self.last_name, "last_name")
    }

    /// Whether this row identifies `person`.
    pub fn matches(&self, person: &Person) -> bool {
        fn same(incoming: &Option<String>, existing: &Option<String>) -> bool {
            matches!((incoming, existing), (Some(a), Some(b)) if a == b)
        }
        same(&self.email, &person.email)
            || same(&self.phone, &person.phone)
            || same(&self.external_id, &person.external_id)
    }

    /// Overlay the row onto an existing participant. Absent fields keep their
    /// value; profile sections merge one level deep.
    pub fn merge_into(&self, existing: &Person) -> Person {
        let row = self.clone();
        let existing = existing.clone();
        Person {
            id: existing.id,
            event_id: existing.event_id,
            external_id: row.external_id.or(existing.external_id),
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email.or(existing.email),
            phone: row.phone.or(existing.phone),
            company: row.company.or(existing.company),
            role: row.role.or(existing.role),
            notes: row.notes.or(existing.notes),
            diet: merge_section(existing.diet, row.diet),
            accessibility: row.accessibility.or(existing.accessibility),
            transport: merge_section(existing.transport, row.transport),
            accommodation: merge_section(existing.accommodation, row.accommodation),
            preferences: merge_section(existing.preferences, row.preferences),
        }
    }

    /// A new participant of `event_id` built from this row.
    pub fn into_person(self, event_id: Uuid) -> Person {
        Person {
            id: Uuid::new_v4(),
            event_id,
            external_id: self.external_id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            role: self.role,
            notes: self.notes,
            diet: self.diet,
            accessibility: self.accessibility,
            transport: self.transport,
            accommodation: self.accommodation,
            preferences: self.preferences,
        }
    }
}

/// Batch import payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportPeopleInput {
    pub people: Vec<ImportPersonInput>,
}

/// Outcome counts of a people import.
///
/// `skipped` counts rows that matched a participant without changing any of
/// their fields.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Input for updating a person. All fields are optional for partial updates.
///
/// Optional scalar fields can be cleared with an explicit `null`. Profile
/// sections merge one level deep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePersonInput {
    #[serde(
        default,
        deserialize_with = "super::nullable::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub external_id: Option<Option<String>>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "super::nullable::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "super::nullable::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "super::nullable::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub company: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "super::nullable::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub role: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "super::nullable::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<Option<String>>,
    pub diet: Option<Diet>,
    #[serde(
        default,
        deserialize_with = "super::nullable::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub accessibility: Option<Option<String>>,
    pub transport: Option<Transport>,
    pub accommodation: Option<Accommodation>,
    pub preferences: Option<Preferences>,
}

impl UpdatePersonInput {
    pub fn apply(self, existing: Person) -> Result<Person, ValidationError> {
        let person = Person {
            id: existing.id,
            event_id: existing.event_id,
            external_id: self.external_id.unwrap_or(existing.external_id),
            first_name: self.first_name.unwrap_or(existing.first_name),
            last_name: self.last_name.unwrap_or(existing.last_name),
            email: self.email.unwrap_or(existing.email),
            phone: self.phone.unwrap_or(existing.phone),
            company: self.company.unwrap_or(existing.company),
            role: self.role.unwrap_or(existing.role),
            notes: self.notes.unwrap_or(existing.notes),
            diet: merge_section(existing.diet, self.diet),
            accessibility: self.accessibility.unwrap_or(existing.accessibility),
            transport: merge_section(existing.transport, self.transport),
            accommodation: merge_section(existing.accommodation, self.accommodation),
            preferences: merge_section(existing.preferences, self.preferences),
        };
        require_non_empty(&person.first_name, "first_name")?;
        require_non_empty(&person.last_name, "last_name")?;
        Ok(person)
    }
}

/// A person with their group memberships and enrollments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonDetails {
    #[serde(flatten)]
    pub person: Person,
    pub memberships: Vec<Uuid>,
    pub enrollments: Vec<Enrollment>,
}
