use thiserror::Error;

/// Rejection of authored input (rules, sessions, events, enrollments).
///
/// Invalid configuration is caught when it is written, so the assignment
/// engine never has to deal with it at recompute time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("priority must be between 0 and 100, got {0}")]
    PriorityOutOfRange(i32),
    #[error("{0} must be a positive integer")]
    NotPositive(&'static str),
    #[error("session must end after it starts")]
    EndBeforeStart,
    #[error("event must end on or after its start date")]
    EventEndsBeforeStart,
    #[error("{0} belongs to a different event")]
    ForeignEntity(&'static str),
    #[error("enrollment source 'rule' is reserved for the assignment engine")]
    ReservedSource,
}

pub(crate) fn require_non_empty(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(())
}
