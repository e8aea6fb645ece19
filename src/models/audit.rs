use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An append-only record of a change made through the back-office.
///
/// `before` and `after` hold JSON snapshots of the entity (or of the relevant
/// part of it) so an operator can see exactly what a change did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    /// Who made the change (`X-Actor-Id` header, `import`, `api`...).
    pub actor: String,
    /// Dotted action name, e.g. `people.update` or `assignments.recompute`.
    pub action: String,
    pub entity: String,
    pub entity_id: Uuid,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Input for recording an audit entry.
#[derive(Debug, Clone)]
pub struct CreateAuditLogInput {
    pub actor: String,
    pub action: String,
    pub entity: String,
    pub entity_id: Uuid,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
}
