//! Domain models for the event logistics back-office.
//!
//! # Core Concepts
//!
//! ## Authored Entities
//!
//! - [`Event`]: Top-level container. Everything else is scoped to one event.
//! - [`Session`]: A scheduled slot (plenary, workshop, dinner...) with a fixed
//!   day, time range and optional capacity.
//! - [`Group`]: A named set of people (e.g. "VIP", "French speakers").
//! - [`Rule`]: Declarative policy binding a group to sessions (include, exclude
//!   or optional). Rules never reference people directly.
//! - [`Person`]: A participant, linked to groups through [`Membership`]s, with
//!   an optional logistics profile ([`Diet`], [`Transport`], [`Accommodation`],
//!   [`Preferences`]).
//!
//! ## Derived Entities
//!
//! - [`Enrollment`]: The (person, session) association. Rule-sourced enrollments
//!   are produced by the assignment engine; manual and import enrollments are
//!   committed facts the engine never overwrites.
//! - [`AssignmentDiagnostics`]: Per-person outcome of one recompute. Not persisted.
//! - [`AuditLog`]: Append-only record of who changed what.

mod assignment;
mod audit;
mod enrollment;
mod error;
mod event;
mod group;
mod nullable;
mod person;
mod profile;
mod rule;
mod session;

pub use assignment::*;
pub use audit::*;
pub use enrollment::*;
pub use error::*;
pub use event::*;
pub use group::*;
pub use person::*;
pub use profile::*;
pub use rule::*;
pub use session::*;
