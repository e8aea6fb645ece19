use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::middleware::Actor;
use crate::db::{Database, PeopleFilter, SessionFilter, StoreError};
use crate::models::*;

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Map a store error to a response.
///
/// Not-found and validation failures are the caller's fault and are returned
/// as-is. Anything else is logged in full server-side and reported to the
/// client as a generic 500 so internal details do not leak.
fn internal_error(e: anyhow::Error) -> (StatusCode, String) {
    match e.downcast_ref::<StoreError>() {
        Some(StoreError::NotFound(what)) => {
            (StatusCode::NOT_FOUND, format!("{what} not found"))
        }
        Some(StoreError::Validation(reason)) => {
            tracing::warn!("Validation error: {}", reason);
            (StatusCode::BAD_REQUEST, reason.to_string())
        }
        None => {
            tracing::error!("Internal error: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

fn not_found(what: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{what} not found"))
}

/// Fail with 404 unless the event exists.
fn require_event(db: &Database, event_id: Uuid) -> ApiResult<Event> {
    db.get_event(event_id)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Event"))
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "time": chrono::Utc::now().to_rfc3339(),
    }))
}

// ============================================================
// Events
// ============================================================

pub async fn create_event(
    State(db): State<Database>,
    Json(input): Json<CreateEventInput>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    db.create_event(input)
        .map(|e| (StatusCode::CREATED, Json(e)))
        .map_err(internal_error)
}

pub async fn get_event(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Event>> {
    require_event(&db, id).map(Json)
}

pub async fn get_event_summary(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EventSummary>> {
    db.get_event_summary(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Event"))
}

// ============================================================
// Sessions
// ============================================================

/// Query parameters for listing sessions.
#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    /// Only sessions on this day (exact match).
    pub day: Option<String>,
    /// Only sessions of this type.
    #[serde(rename = "type")]
    pub kind: Option<SessionKind>,
}

pub async fn list_event_sessions(
    State(db): State<Database>,
    Path(event_id): Path<Uuid>,
    Query(query): Query<ListSessionsQuery>,
) -> ApiResult<Json<Vec<Session>>> {
    require_event(&db, event_id)?;
    let filter = SessionFilter {
        day: query.day,
        kind: query.kind,
    };
    db.get_event_sessions(event_id, &filter)
        .map(Json)
        .map_err(internal_error)
}

pub async fn create_session(
    State(db): State<Database>,
    Path(event_id): Path<Uuid>,
    Json(input): Json<CreateSessionInput>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    db.create_session(event_id, input)
        .map(|s| (StatusCode::CREATED, Json(s)))
        .map_err(internal_error)
}

pub async fn get_session(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Session>> {
    db.get_session(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Session"))
}

pub async fn update_session(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateSessionInput>,
) -> ApiResult<Json<Session>> {
    db.update_session(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Session"))
}

// ============================================================
// Groups & Rules
// ============================================================

pub async fn list_event_groups(
    State(db): State<Database>,
    Path(event_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Group>>> {
    require_event(&db, event_id)?;
    db.get_event_groups(event_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn create_group(
    State(db): State<Database>,
    Path(event_id): Path<Uuid>,
    Json(input): Json<CreateGroupInput>,
) -> ApiResult<(StatusCode, Json<Group>)> {
    db.create_group(event_id, input)
        .map(|g| (StatusCode::CREATED, Json(g)))
        .map_err(internal_error)
}

pub async fn list_group_rules(
    State(db): State<Database>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Rule>>> {
    db.get_group(group_id)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Group"))?;

    db.get_group_rules(group_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn create_rule(
    State(db): State<Database>,
    Path(group_id): Path<Uuid>,
    Json(input): Json<CreateRuleInput>,
) -> ApiResult<(StatusCode, Json<Rule>)> {
    db.create_rule(group_id, input)
        .map(|r| (StatusCode::CREATED, Json(r)))
        .map_err(internal_error)
}

// ============================================================
// People
// ============================================================

/// Query parameters for listing people.
#[derive(Debug, Deserialize)]
pub struct ListPeopleQuery {
    /// Only members of this group.
    pub group: Option<Uuid>,
    /// Only people who have not provided this information yet.
    pub missing: Option<MissingInfo>,
}

pub async fn list_event_people(
    State(db): State<Database>,
    Path(event_id): Path<Uuid>,
    Query(query): Query<ListPeopleQuery>,
) -> ApiResult<Json<Vec<Person>>> {
    require_event(&db, event_id)?;
    let filter = PeopleFilter {
        group: query.group,
        missing: query.missing,
    };
    db.get_event_people(event_id, &filter)
        .map(Json)
        .map_err(internal_error)
}

/// Bulk import always records the `import` actor, whoever sent it.
pub async fn import_people(
    State(db): State<Database>,
    Path(event_id): Path<Uuid>,
    Json(input): Json<ImportPeopleInput>,
) -> ApiResult<(StatusCode, Json<ImportSummary>)> {
    db.import_people(event_id, input, "import")
        .map(|summary| (StatusCode::ACCEPTED, Json(summary)))
        .map_err(internal_error)
}

pub async fn get_person(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PersonDetails>> {
    db.get_person_details(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Person"))
}

pub async fn update_person(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(input): Json<UpdatePersonInput>,
) -> ApiResult<Json<Person>> {
    db.update_person(id, input, actor.as_str())
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Person"))
}

pub async fn set_person_memberships(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(input): Json<SetMembershipsInput>,
) -> ApiResult<StatusCode> {
    if db
        .set_person_memberships(id, input, actor.as_str())
        .map_err(internal_error)?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Person"))
    }
}

// ============================================================
// Enrollments & Assignments
// ============================================================

pub async fn set_enrollment(
    State(db): State<Database>,
    Path((person_id, session_id)): Path<(Uuid, Uuid)>,
    actor: Actor,
    Json(input): Json<SetEnrollmentInput>,
) -> ApiResult<Json<Enrollment>> {
    db.set_enrollment(person_id, session_id, input, actor.as_str())
        .map(Json)
        .map_err(internal_error)
}

/// Query parameters for a recompute.
#[derive(Debug, Deserialize)]
pub struct RecomputeQuery {
    pub event_id: Option<Uuid>,
}

/// Recompute rule-driven enrollments for one event.
///
/// The engine is synchronous and may take a while on large events, so it runs
/// on the blocking pool.
pub async fn recompute_assignments(
    State(db): State<Database>,
    Query(query): Query<RecomputeQuery>,
    actor: Actor,
) -> ApiResult<Json<RecomputeResult>> {
    let event_id = query.event_id.ok_or((
        StatusCode::BAD_REQUEST,
        "event_id query parameter is required".to_string(),
    ))?;

    tokio::task::spawn_blocking(move || db.recompute_assignments(event_id, actor.as_str()))
        .await
        .map_err(|e| internal_error(e.into()))?
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Event"))
}

// ============================================================
// Audit
// ============================================================

/// Query parameters for listing audit entries.
#[derive(Debug, Deserialize)]
pub struct AuditLogQuery {
    pub entity_id: Option<Uuid>,
}

pub async fn list_audit_logs(
    State(db): State<Database>,
    Query(query): Query<AuditLogQuery>,
) -> ApiResult<Json<Vec<AuditLog>>> {
    db.get_audit_logs(query.entity_id)
        .map(Json)
        .map_err(internal_error)
}
