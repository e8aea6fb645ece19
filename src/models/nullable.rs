//! Clearable fields in partial updates.
//!
//! With `#[serde(default, deserialize_with = "...")]` on an
//! `Option<Option<T>>` field, a missing key reads as `None` (keep), `null` as
//! `Some(None)` (clear) and a value as `Some(Some(v))` (set).

use serde::{Deserialize, Deserializer};

pub(crate) fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
