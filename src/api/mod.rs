mod handlers;
pub mod middleware;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::db::Database;
pub use middleware::SecurityConfig;

/// Router with authentication disabled and permissive CORS.
pub fn create_router(db: Database) -> Router {
    create_router_with_config(db, SecurityConfig::disabled())
}

pub fn create_router_with_config(db: Database, security: SecurityConfig) -> Router {
    let api = Router::new()
        // Events
        .route("/events", post(handlers::create_event))
        .route("/events/{id}", get(handlers::get_event))
        .route("/events/{id}/summary", get(handlers::get_event_summary))
        .route(
            "/events/{id}/sessions",
            get(handlers::list_event_sessions).post(handlers::create_session),
        )
        .route(
            "/events/{id}/groups",
            get(handlers::list_event_groups).post(handlers::create_group),
        )
        .route("/events/{id}/people", get(handlers::list_event_people))
        .route("/events/{id}/people/import", post(handlers::import_people))
        // Sessions
        .route(
            "/sessions/{id}",
            get(handlers::get_session).patch(handlers::update_session),
        )
        // Rules
        .route(
            "/groups/{id}/rules",
            get(handlers::list_group_rules).post(handlers::create_rule),
        )
        // People
        .route(
            "/people/{id}",
            get(handlers::get_person).patch(handlers::update_person),
        )
        .route(
            "/people/{id}/memberships",
            post(handlers::set_person_memberships),
        )
        .route(
            "/people/{id}/enrollments/{session_id}",
            put(handlers::set_enrollment),
        )
        // Assignments
        .route("/assignments/recompute", post(handlers::recompute_assignments))
        // Audit
        .route("/audit-logs", get(handlers::list_audit_logs))
        .route_layer(from_fn_with_state(
            security.clone(),
            middleware::auth_middleware,
        ))
        // Health stays reachable without credentials
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(security.cors_layer()),
        )
        .with_state(db)
}
