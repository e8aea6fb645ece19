//! Event logistics back-office.
//!
//! People join groups, groups carry rules, rules point at sessions. The
//! [`assignment`] engine turns that policy into per-person enrollments,
//! respecting exclusions, time conflicts and session capacity. [`db`] holds the
//! data and runs recomputes atomically; [`api`] exposes both over HTTP.

pub mod api;
pub mod assignment;
pub mod db;
pub mod models;
