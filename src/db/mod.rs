mod schema;

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::assignment::{self, RecomputeTotals, Snapshot};
use crate::models::*;

/// Store-level failures that callers are expected to handle.
///
/// Anything else surfacing from the store (SQLite errors, poisoned lock) is an
/// internal error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Query filters for listing an event's sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub day: Option<String>,
    pub kind: Option<SessionKind>,
}

/// Query filters for listing an event's people.
#[derive(Debug, Clone, Default)]
pub struct PeopleFilter {
    /// Only members of this group.
    pub group: Option<Uuid>,
    /// Only people who have not provided this information.
    pub missing: Option<MissingInfo>,
}

/// The back-office store.
///
/// A single SQLite connection behind a mutex. Every public operation holds the
/// lock for its whole duration, which makes the store single-writer: an
/// assignment recompute runs its read, compute and write phases without any
/// other edit interleaving.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

const EVENT_COLUMNS: &str = "id, name, timezone, start_date, end_date, branding, created_at";
const SESSION_COLUMNS: &str =
    "id, event_id, code, title, kind, description, day, start_at, end_at, location, capacity";
const GROUP_COLUMNS: &str = "id, event_id, code, name, color, description, created_at";
const RULE_COLUMNS: &str = "id, group_id, kind, session_ids, priority, quota, created_at";
const PERSON_COLUMNS: &str = "id, event_id, external_id, first_name, last_name, email, phone, \
     company, role, notes, diet, accessibility, transport, accommodation, preferences";
const ENROLLMENT_COLUMNS: &str = "person_id, session_id, status, priority, source";

impl Database {
    /// Open a fresh in-memory store. Data does not survive the process.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;
        schema::run_migrations(&conn)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))
    }

    // ============================================================
    // Event operations
    // ============================================================

    pub fn create_event(&self, input: CreateEventInput) -> Result<Event> {
        input.validate().map_err(StoreError::from)?;

        let conn = self.conn()?;
        let event = Event {
            id: Uuid::new_v4(),
            name: input.name,
            timezone: input.timezone,
            start_date: input.start_date,
            end_date: input.end_date,
            branding: input.branding,
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO events (id, name, timezone, start_date, end_date, branding, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                event.id.to_string(),
                &event.name,
                &event.timezone,
                event.start_date.to_string(),
                event.end_date.to_string(),
                &event.branding,
                event.created_at.to_rfc3339(),
            ),
        )?;

        tracing::info!(event_id = %event.id, name = %event.name, "Created event");
        Ok(event)
    }

    pub fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
        let conn = self.conn()?;
        fetch_event(&conn, id)
    }

    pub fn get_event_summary(&self, id: Uuid) -> Result<Option<EventSummary>> {
        let conn = self.conn()?;
        let Some(event) = fetch_event(&conn, id)? else {
            return Ok(None);
        };

        let count = |table: &str| -> Result<usize> {
            let n: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE event_id = ?"),
                [id.to_string()],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        };

        let counts = EventCounts {
            sessions: count("sessions")?,
            groups: count("participant_groups")?,
            participants: count("people")?,
        };

        Ok(Some(EventSummary { event, counts }))
    }

    // ============================================================
    // Session operations
    // ============================================================

    pub fn create_session(&self, event_id: Uuid, input: CreateSessionInput) -> Result<Session> {
        let conn = self.conn()?;
        fetch_event(&conn, event_id)?.ok_or(StoreError::NotFound("Event"))?;

        let session = input.into_session(event_id).map_err(StoreError::from)?;
        conn.execute(
            &format!("INSERT INTO sessions ({SESSION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"),
            (
                session.id.to_string(),
                session.event_id.to_string(),
                &session.code,
                &session.title,
                session.kind.as_str(),
                &session.description,
                &session.day,
                session.start.to_rfc3339(),
                session.end.to_rfc3339(),
                &session.location,
                session.capacity,
            ),
        )?;

        Ok(session)
    }

    pub fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        let conn = self.conn()?;
        fetch_session(&conn, id)
    }

    pub fn update_session(&self, id: Uuid, input: UpdateSessionInput) -> Result<Option<Session>> {
        let conn = self.conn()?;
        let Some(existing) = fetch_session(&conn, id)? else {
            return Ok(None);
        };

        let session = input.apply(existing).map_err(StoreError::from)?;
        conn.execute(
            "UPDATE sessions SET code = ?, title = ?, kind = ?, description = ?, day = ?,
                 start_at = ?, end_at = ?, location = ?, capacity = ?
             WHERE id = ?",
            (
                &session.code,
                &session.title,
                session.kind.as_str(),
                &session.description,
                &session.day,
                session.start.to_rfc3339(),
                session.end.to_rfc3339(),
                &session.location,
                session.capacity,
                id.to_string(),
            ),
        )?;

        Ok(Some(session))
    }

    pub fn get_event_sessions(
        &self,
        event_id: Uuid,
        filter: &SessionFilter,
    ) -> Result<Vec<Session>> {
        let conn = self.conn()?;
        let sessions = fetch_event_sessions(&conn, event_id)?
            .into_iter()
            .filter(|session| filter.day.as_deref().map_or(true, |day| session.day == day))
            .filter(|session| filter.kind.map_or(true, |kind| session.kind == kind))
            .collect();
        Ok(sessions)
    }

    // ============================================================
    // Group and rule operations
    // ============================================================

    pub fn create_group(&self, event_id: Uuid, input: CreateGroupInput) -> Result<Group> {
        input.validate().map_err(StoreError::from)?;

        let conn = self.conn()?;
        fetch_event(&conn, event_id)?.ok_or(StoreError::NotFound("Event"))?;

        let group = Group {
            id: Uuid::new_v4(),
            event_id,
            code: input.code,
            name: input.name,
            color: input.color,
            description: input.description,
            created_at: Utc::now(),
        };

        conn.execute(
            &format!("INSERT INTO participant_groups ({GROUP_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"),
            (
                group.id.to_string(),
                event_id.to_string(),
                &group.code,
                &group.name,
                &group.color,
                &group.description,
                group.created_at.to_rfc3339(),
            ),
        )?;

        Ok(group)
    }

    pub fn get_group(&self, id: Uuid) -> Result<Option<Group>> {
        let conn = self.conn()?;
        fetch_group(&conn, id)
    }

    pub fn get_event_groups(&self, event_id: Uuid) -> Result<Vec<Group>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {GROUP_COLUMNS} FROM participant_groups WHERE event_id = ? ORDER BY code"
        ))?;
        let groups = stmt
            .query_map([event_id.to_string()], group_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    /// Attach a rule to a group.
    ///
    /// Rules are validated here so that a recompute never meets an empty or
    /// out-of-range rule.
    pub fn create_rule(&self, group_id: Uuid, input: CreateRuleInput) -> Result<Rule> {
        input.validate().map_err(StoreError::from)?;

        let conn = self.conn()?;
        fetch_group(&conn, group_id)?.ok_or(StoreError::NotFound("Group"))?;

        let rule = Rule {
            id: Uuid::new_v4(),
            group_id,
            kind: input.kind,
            session_ids: input.session_ids,
            priority: input.priority,
            quota: input.quota,
            created_at: Utc::now(),
        };

        conn.execute(
            &format!("INSERT INTO rules ({RULE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"),
            (
                rule.id.to_string(),
                group_id.to_string(),
                rule.kind.as_str(),
                serde_json::to_string(&rule.session_ids)?,
                rule.priority,
                rule.quota,
                rule.created_at.to_rfc3339(),
            ),
        )?;

        Ok(rule)
    }

    pub fn get_group_rules(&self, group_id: Uuid) -> Result<Vec<Rule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM rules WHERE group_id = ? ORDER BY priority DESC, created_at"
        ))?;
        let rules = stmt
            .query_map([group_id.to_string()], rule_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    // ============================================================
    // People operations
    // ============================================================

    /// Create or update participants of an event in one batch.
    ///
    /// Each row is matched against the event's participants by email, phone or
    /// external id. The whole batch is applied in one transaction.
    pub fn import_people(
        &self,
        event_id: Uuid,
        input: ImportPeopleInput,
        actor: &str,
    ) -> Result<ImportSummary> {
        for row in &input.people {
            row.validate().map_err(StoreError::from)?;
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        fetch_event(&tx, event_id)?.ok_or(StoreError::NotFound("Event"))?;

        let mut people = fetch_event_people(&tx, event_id)?;
        let mut summary = ImportSummary::default();

        for row in input.people {
            let person = match people.iter().position(|person| row.matches(person)) {
                Some(index) => {
                    let existing = &mut people[index];
                    let merged = row.merge_into(existing);
                    if merged == *existing {
                        summary.skipped += 1;
                    } else {
                        write_person(&tx, &merged)?;
                        insert_audit_log(
                            &tx,
                            CreateAuditLogInput {
                                actor: actor.to_string(),
                                action: "people.update".to_string(),
                                entity: "person".to_string(),
                                entity_id: merged.id,
                                before: serde_json::to_value(&*existing).ok(),
                                after: serde_json::to_value(&merged).ok(),
                            },
                        )?;
                        *existing = merged;
                        summary.updated += 1;
                    }
                    existing.clone()
                }
                None => {
                    let created = row.clone().into_person(event_id);
                    insert_person(&tx, &created)?;
                    insert_audit_log(
                        &tx,
                        CreateAuditLogInput {
                            actor: actor.to_string(),
                            action: "people.create".to_string(),
                            entity: "person".to_string(),
                            entity_id: created.id,
                            before: None,
                            after: serde_json::to_value(&created).ok(),
                        },
                    )?;
                    people.push(created.clone());
                    summary.created += 1;
                    created
                }
            };

            if let Some(group_ids) = row.memberships.filter(|ids| !ids.is_empty()) {
                replace_memberships(&tx, &person, &group_ids, actor)?;
            }
        }

        tx.commit()?;
        tracing::info!(
            %event_id,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            "Imported people"
        );
        Ok(summary)
    }

    pub fn get_person(&self, id: Uuid) -> Result<Option<Person>> {
        let conn = self.conn()?;
        fetch_person(&conn, id)
    }

    pub fn get_person_details(&self, id: Uuid) -> Result<Option<PersonDetails>> {
        let conn = self.conn()?;
        let Some(person) = fetch_person(&conn, id)? else {
            return Ok(None);
        };

        let memberships = fetch_person_groups(&conn, id)?;
        let enrollments = fetch_person_enrollments(&conn, id)?;

        Ok(Some(PersonDetails {
            person,
            memberships,
            enrollments,
        }))
    }

    pub fn update_person(
        &self,
        id: Uuid,
        input: UpdatePersonInput,
        actor: &str,
    ) -> Result<Option<Person>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let Some(existing) = fetch_person(&tx, id)? else {
            return Ok(None);
        };

        let before = serde_json::to_value(&existing).ok();
        let person = input.apply(existing).map_err(StoreError::from)?;
        write_person(&tx, &person)?;
        insert_audit_log(
            &tx,
            CreateAuditLogInput {
                actor: actor.to_string(),
                action: "people.update".to_string(),
                entity: "person".to_string(),
                entity_id: id,
                before,
                after: serde_json::to_value(&person).ok(),
            },
        )?;
        tx.commit()?;

        Ok(Some(person))
    }

    /// People of an event in creation order, narrowed by `filter`.
    pub fn get_event_people(&self, event_id: Uuid, filter: &PeopleFilter) -> Result<Vec<Person>> {
        let conn = self.conn()?;
        let mut people = fetch_event_people(&conn, event_id)?;

        if let Some(group_id) = filter.group {
            let mut stmt = conn.prepare("SELECT person_id FROM memberships WHERE group_id = ?")?;
            let members = stmt
                .query_map([group_id.to_string()], |row| {
                    Ok(parse_uuid(row.get::<_, String>(0)?))
                })?
                .collect::<Result<HashSet<_>, _>>()?;
            people.retain(|person| members.contains(&person.id));
        }
        if let Some(missing) = filter.missing {
            people.retain(|person| person.is_missing(missing));
        }

        Ok(people)
    }

    // ============================================================
    // Membership operations
    // ============================================================

    /// Replace the groups a person belongs to. Returns `false` when the person
    /// does not exist.
    pub fn set_person_memberships(
        &self,
        person_id: Uuid,
        input: SetMembershipsInput,
        actor: &str,
    ) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let Some(person) = fetch_person(&tx, person_id)? else {
            return Ok(false);
        };

        replace_memberships(&tx, &person, &input.group_ids, actor)?;
        tx.commit()?;
        Ok(true)
    }

    pub fn get_person_memberships(&self, person_id: Uuid) -> Result<Vec<Uuid>> {
        let conn = self.conn()?;
        fetch_person_groups(&conn, person_id)
    }

    // ============================================================
    // Enrollment operations
    // ============================================================

    /// Record an operator or import decision for a (person, session) pair.
    ///
    /// Overwrites whatever enrollment the pair had, including a rule-sourced one.
    pub fn set_enrollment(
        &self,
        person_id: Uuid,
        session_id: Uuid,
        input: SetEnrollmentInput,
        actor: &str,
    ) -> Result<Enrollment> {
        let enrollment = input
            .into_enrollment(person_id, session_id)
            .map_err(StoreError::from)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let person = fetch_person(&tx, person_id)?.ok_or(StoreError::NotFound("Person"))?;
        let session = fetch_session(&tx, session_id)?.ok_or(StoreError::NotFound("Session"))?;
        if person.event_id != session.event_id {
            return Err(StoreError::from(ValidationError::ForeignEntity("session")).into());
        }

        let before = fetch_enrollment(&tx, person_id, session_id)?;
        upsert_enrollment(&tx, &enrollment)?;
        insert_audit_log(
            &tx,
            CreateAuditLogInput {
                actor: actor.to_string(),
                action: "enrollments.set".to_string(),
                entity: "person".to_string(),
                entity_id: person_id,
                before: before.and_then(|e| serde_json::to_value(e).ok()),
                after: serde_json::to_value(&enrollment).ok(),
            },
        )?;
        tx.commit()?;

        Ok(enrollment)
    }

    pub fn get_person_enrollments(&self, person_id: Uuid) -> Result<Vec<Enrollment>> {
        let conn = self.conn()?;
        fetch_person_enrollments(&conn, person_id)
    }

    // ============================================================
    // Assignment operations
    // ============================================================

    /// Everything the assignment engine reads for one event. `None` when the
    /// event does not exist.
    pub fn load_snapshot(&self, event_id: Uuid) -> Result<Option<Snapshot>> {
        let conn = self.conn()?;
        if fetch_event(&conn, event_id)?.is_none() {
            return Ok(None);
        }
        load_snapshot(&conn, event_id).map(Some)
    }

    /// Run the assignment engine over an event and persist its enrollments.
    ///
    /// The snapshot load, the engine run and the write-back happen under the
    /// store lock and inside one transaction: either every new enrollment is
    /// stored or none is. Returns `None` when the event does not exist.
    pub fn recompute_assignments(
        &self,
        event_id: Uuid,
        actor: &str,
    ) -> Result<Option<RecomputeResult>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if fetch_event(&tx, event_id)?.is_none() {
            return Ok(None);
        }

        let snapshot = load_snapshot(&tx, event_id)?;
        tracing::info!(
            %event_id,
            people = snapshot.people.len(),
            sessions = snapshot.sessions.len(),
            rules = snapshot.rules.len(),
            enrollments = snapshot.enrollments.len(),
            "Recomputing assignments"
        );

        let outcome = assignment::recompute(&snapshot);
        for enrollment in &outcome.created {
            upsert_enrollment(&tx, enrollment)?;
        }

        let totals = RecomputeTotals::from_diagnostics(&outcome.diagnostics);
        insert_audit_log(
            &tx,
            CreateAuditLogInput {
                actor: actor.to_string(),
                action: "assignments.recompute".to_string(),
                entity: "event".to_string(),
                entity_id: event_id,
                before: None,
                after: serde_json::to_value(totals).ok(),
            },
        )?;
        tx.commit()?;

        tracing::info!(
            %event_id,
            added = totals.added,
            waitlisted = totals.waitlisted,
            conflicts = totals.conflicts,
            "Assignments recomputed"
        );

        Ok(Some(RecomputeResult {
            event_id,
            diagnostics: outcome.diagnostics,
        }))
    }

    // ============================================================
    // Audit log operations
    // ============================================================

    /// Audit entries, newest first, optionally for one entity.
    pub fn get_audit_logs(&self, entity_id: Option<Uuid>) -> Result<Vec<AuditLog>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, actor, action, entity, entity_id, before_json, after_json, created_at
             FROM audit_logs
             WHERE ?1 IS NULL OR entity_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let logs = stmt
            .query_map([entity_id.map(|id| id.to_string())], |row| {
                Ok(AuditLog {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    actor: row.get(1)?,
                    action: row.get(2)?,
                    entity: row.get(3)?,
                    entity_id: parse_uuid(row.get::<_, String>(4)?),
                    before: row.get::<_, Option<String>>(5)?.and_then(parse_json),
                    after: row.get::<_, Option<String>>(6)?.and_then(parse_json),
                    timestamp: parse_datetime(row.get::<_, String>(7)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(logs)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

// ============================================================
// Connection-level helpers
// ============================================================
//
// These take a borrowed connection (or transaction) so public operations can
// compose them under a single lock.

fn fetch_event(conn: &Connection, id: Uuid) -> Result<Option<Event>> {
    let event = conn
        .query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?"),
            [id.to_string()],
            |row| {
                Ok(Event {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    name: row.get(1)?,
                    timezone: row.get(2)?,
                    start_date: parse_date(row.get::<_, String>(3)?),
                    end_date: parse_date(row.get::<_, String>(4)?),
                    branding: row.get(5)?,
                    created_at: parse_datetime(row.get::<_, String>(6)?),
                })
            },
        )
        .optional()?;
    Ok(event)
}

fn fetch_session(conn: &Connection, id: Uuid) -> Result<Option<Session>> {
    let session = conn
        .query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?"),
            [id.to_string()],
            session_from_row,
        )
        .optional()?;
    Ok(session)
}

fn fetch_event_sessions(conn: &Connection, event_id: Uuid) -> Result<Vec<Session>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE event_id = ? ORDER BY start_at, code"
    ))?;
    let sessions = stmt
        .query_map([event_id.to_string()], session_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(sessions)
}

fn fetch_group(conn: &Connection, id: Uuid) -> Result<Option<Group>> {
    let group = conn
        .query_row(
            &format!("SELECT {GROUP_COLUMNS} FROM participant_groups WHERE id = ?"),
            [id.to_string()],
            group_from_row,
        )
        .optional()?;
    Ok(group)
}

fn fetch_person(conn: &Connection, id: Uuid) -> Result<Option<Person>> {
    let person = conn
        .query_row(
            &format!("SELECT {PERSON_COLUMNS} FROM people WHERE id = ?"),
            [id.to_string()],
            person_from_row,
        )
        .optional()?;
    Ok(person)
}

/// People of an event in creation order.
fn fetch_event_people(conn: &Connection, event_id: Uuid) -> Result<Vec<Person>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PERSON_COLUMNS} FROM people WHERE event_id = ? ORDER BY rowid"
    ))?;
    let people = stmt
        .query_map([event_id.to_string()], person_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(people)
}

fn insert_person(conn: &Connection, person: &Person) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO people ({PERSON_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ),
        rusqlite::params![
            person.id.to_string(),
            person.event_id.to_string(),
            &person.external_id,
            &person.first_name,
            &person.last_name,
            &person.email,
            &person.phone,
            &person.company,
            &person.role,
            &person.notes,
            to_json_column(&person.diet)?,
            &person.accessibility,
            to_json_column(&person.transport)?,
            to_json_column(&person.accommodation)?,
            to_json_column(&person.preferences)?,
        ],
    )?;
    Ok(())
}

fn write_person(conn: &Connection, person: &Person) -> Result<()> {
    conn.execute(
        "UPDATE people SET external_id = ?, first_name = ?, last_name = ?, email = ?, phone = ?,
             company = ?, role = ?, notes = ?, diet = ?, accessibility = ?, transport = ?,
             accommodation = ?, preferences = ?
         WHERE id = ?",
        rusqlite::params![
            &person.external_id,
            &person.first_name,
            &person.last_name,
            &person.email,
            &person.phone,
            &person.company,
            &person.role,
            &person.notes,
            to_json_column(&person.diet)?,
            &person.accessibility,
            to_json_column(&person.transport)?,
            to_json_column(&person.accommodation)?,
            to_json_column(&person.preferences)?,
            person.id.to_string(),
        ],
    )?;
    Ok(())
}

fn fetch_person_groups(conn: &Connection, person_id: Uuid) -> Result<Vec<Uuid>> {
    let mut stmt =
        conn.prepare("SELECT group_id FROM memberships WHERE person_id = ? ORDER BY rowid")?;
    let groups = stmt
        .query_map([person_id.to_string()], |row| {
            Ok(parse_uuid(row.get::<_, String>(0)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(groups)
}

/// Replace a person's memberships. Every group must belong to the person's event.
fn replace_memberships(
    conn: &Connection,
    person: &Person,
    group_ids: &[Uuid],
    actor: &str,
) -> Result<()> {
    for group_id in group_ids {
        let group = fetch_group(conn, *group_id)?.ok_or(StoreError::NotFound("Group"))?;
        if group.event_id != person.event_id {
            return Err(StoreError::from(ValidationError::ForeignEntity("group")).into());
        }
    }

    let before = fetch_person_groups(conn, person.id)?;
    conn.execute(
        "DELETE FROM memberships WHERE person_id = ?",
        [person.id.to_string()],
    )?;
    for group_id in group_ids {
        conn.execute(
            "INSERT OR IGNORE INTO memberships (person_id, group_id) VALUES (?, ?)",
            (person.id.to_string(), group_id.to_string()),
        )?;
    }

    insert_audit_log(
        conn,
        CreateAuditLogInput {
            actor: actor.to_string(),
            action: "memberships.sync".to_string(),
            entity: "person".to_string(),
            entity_id: person.id,
            before: serde_json::to_value(before).ok(),
            after: serde_json::to_value(group_ids).ok(),
        },
    )?;
    Ok(())
}

fn fetch_enrollment(
    conn: &Connection,
    person_id: Uuid,
    session_id: Uuid,
) -> Result<Option<Enrollment>> {
    let enrollment = conn
        .query_row(
            &format!(
                "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE person_id = ? AND session_id = ?"
            ),
            (person_id.to_string(), session_id.to_string()),
            enrollment_from_row,
        )
        .optional()?;
    Ok(enrollment)
}

fn fetch_person_enrollments(conn: &Connection, person_id: Uuid) -> Result<Vec<Enrollment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE person_id = ? ORDER BY rowid"
    ))?;
    let enrollments = stmt
        .query_map([person_id.to_string()], enrollment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(enrollments)
}

/// Insert or replace the enrollment of a (person, session) pair.
fn upsert_enrollment(conn: &Connection, enrollment: &Enrollment) -> Result<()> {
    conn.execute(
        "INSERT INTO enrollments (person_id, session_id, status, priority, source, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (person_id, session_id) DO UPDATE SET
             status = excluded.status,
             priority = excluded.priority,
             source = excluded.source,
             updated_at = excluded.updated_at",
        (
            enrollment.person_id.to_string(),
            enrollment.session_id.to_string(),
            enrollment.status.as_str(),
            enrollment.priority,
            enrollment.source.as_str(),
            Utc::now().to_rfc3339(),
        ),
    )?;
    Ok(())
}

fn load_snapshot(conn: &Connection, event_id: Uuid) -> Result<Snapshot> {
    let event = [event_id.to_string()];

    let people = fetch_event_people(conn, event_id)?
        .into_iter()
        .map(|person| person.id)
        .collect();

    let sessions = fetch_event_sessions(conn, event_id)?;

    let mut stmt = conn.prepare(
        "SELECT r.id, r.group_id, r.kind, r.session_ids, r.priority, r.quota, r.created_at
         FROM rules r JOIN participant_groups g ON g.id = r.group_id
         WHERE g.event_id = ?
         ORDER BY r.rowid",
    )?;
    let rules = stmt
        .query_map(event.clone(), rule_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT m.person_id, m.group_id
         FROM memberships m JOIN people p ON p.id = m.person_id
         WHERE p.event_id = ?",
    )?;
    let memberships = stmt
        .query_map(event.clone(), |row| {
            Ok(Membership {
                person_id: parse_uuid(row.get::<_, String>(0)?),
                group_id: parse_uuid(row.get::<_, String>(1)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments
         WHERE session_id IN (SELECT id FROM sessions WHERE event_id = ?1)
            OR person_id IN (SELECT id FROM people WHERE event_id = ?1)
         ORDER BY rowid"
    ))?;
    let enrollments = stmt
        .query_map(event, enrollment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Snapshot {
        people,
        sessions,
        rules,
        memberships,
        enrollments,
    })
}

fn insert_audit_log(conn: &Connection, input: CreateAuditLogInput) -> Result<()> {
    conn.execute(
        "INSERT INTO audit_logs (id, actor, action, entity, entity_id, before_json, after_json, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        (
            Uuid::new_v4().to_string(),
            &input.actor,
            &input.action,
            &input.entity,
            input.entity_id.to_string(),
            input.before.map(|value| value.to_string()),
            input.after.map(|value| value.to_string()),
            Utc::now().to_rfc3339(),
        ),
    )?;
    Ok(())
}

// ============================================================
// Row mapping
// ============================================================

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: parse_uuid(row.get::<_, String>(0)?),
        event_id: parse_uuid(row.get::<_, String>(1)?),
        code: row.get(2)?,
        title: row.get(3)?,
        kind: SessionKind::from_str(&row.get::<_, String>(4)?).unwrap_or(SessionKind::Plenary),
        description: row.get(5)?,
        day: row.get(6)?,
        start: parse_datetime(row.get::<_, String>(7)?),
        end: parse_datetime(row.get::<_, String>(8)?),
        location: row.get(9)?,
        capacity: row.get(10)?,
    })
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: parse_uuid(row.get::<_, String>(0)?),
        event_id: parse_uuid(row.get::<_, String>(1)?),
        code: row.get(2)?,
        name: row.get(3)?,
        color: row.get(4)?,
        description: row.get(5)?,
        created_at: parse_datetime(row.get::<_, String>(6)?),
    })
}

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<Rule> {
    let session_ids_json: String = row.get(3)?;
    Ok(Rule {
        id: parse_uuid(row.get::<_, String>(0)?),
        group_id: parse_uuid(row.get::<_, String>(1)?),
        kind: RuleType::from_str(&row.get::<_, String>(2)?).unwrap_or(RuleType::Optional),
        session_ids: serde_json::from_str(&session_ids_json).unwrap_or_default(),
        priority: row.get(4)?,
        quota: row.get(5)?,
        created_at: parse_datetime(row.get::<_, String>(6)?),
    })
}

fn person_from_row(row: &Row<'_>) -> rusqlite::Result<Person> {
    Ok(Person {
        id: parse_uuid(row.get::<_, String>(0)?),
        event_id: parse_uuid(row.get::<_, String>(1)?),
        external_id: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        email: row.get(5)?,
        phone: row.get(6)?,
        company: row.get(7)?,
        role: row.get(8)?,
        notes: row.get(9)?,
        diet: row.get::<_, Option<String>>(10)?.and_then(parse_json_column),
        accessibility: row.get(11)?,
        transport: row.get::<_, Option<String>>(12)?.and_then(parse_json_column),
        accommodation: row.get::<_, Option<String>>(13)?.and_then(parse_json_column),
        preferences: row.get::<_, Option<String>>(14)?.and_then(parse_json_column),
    })
}

fn enrollment_from_row(row: &Row<'_>) -> rusqlite::Result<Enrollment> {
    Ok(Enrollment {
        person_id: parse_uuid(row.get::<_, String>(0)?),
        session_id: parse_uuid(row.get::<_, String>(1)?),
        status: EnrollmentStatus::from_str(&row.get::<_, String>(2)?)
            .unwrap_or(EnrollmentStatus::Declined),
        priority: row.get(3)?,
        source: EnrollmentSource::from_str(&row.get::<_, String>(4)?)
            .unwrap_or(EnrollmentSource::Manual),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_date(s: String) -> NaiveDate {
    NaiveDate::from_str(&s).unwrap_or_default()
}

fn parse_json(s: String) -> Option<serde_json::Value> {
    serde_json::from_str(&s).ok()
}

fn parse_json_column<T: DeserializeOwned>(s: String) -> Option<T> {
    serde_json::from_str(&s).ok()
}

fn to_json_column<T: Serialize>(value: &Option<T>) -> Result<Option<String>> {
    Ok(value.as_ref().map(serde_json::to_string).transpose()?)
}
