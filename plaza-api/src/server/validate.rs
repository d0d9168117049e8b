//! Field-keyed request validation.
//!
//! Handlers deserialize loose payloads (every field optional), then run the
//! domain newtype constructors and collect failures per field, so a response
//! can report all invalid fields at once instead of failing on the first.

use crate::server::ServerError;
use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::BTreeMap, fmt::Display};

pub const REQUIRED: &str = "This field is required.";

#[derive(Clone, Eq, PartialEq, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, Vec<String>>);

impl ValidationErrors {
    pub fn push(&mut self, field: &'static str, message: String) {
        self.0.entry(field).or_default().push(message);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the collector; an error if anything was recorded.
    pub fn finish(self) -> Result<(), ServerError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServerError::Validation(self))
        }
    }
}

/// A field that must be present and valid. `value` is the raw field mapped
/// through its newtype constructor; `None` means the field was absent.
pub fn require<T, E: Display>(
    errors: &mut ValidationErrors,
    field: &'static str,
    required_message: &str,
    value: Option<Result<T, E>>,
) -> Option<T> {
    match value {
        None => {
            errors.push(field, required_message.to_owned());
            None
        }
        Some(result) => accept(errors, field, result),
    }
}

/// A field that may be absent but must be valid when present.
pub fn optional<T, E: Display>(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<Result<T, E>>,
) -> Option<T> {
    value.and_then(|result| accept(errors, field, result))
}

/// A field that must be present; any string content is acceptable.
pub fn require_present<T>(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<T>,
) -> Option<T> {
    if value.is_none() {
        errors.push(field, REQUIRED.to_owned());
    }
    value
}

/// For `Option<Option<T>>` fields: an absent field deserializes to `None`
/// (via `#[serde(default)]`), while an explicit `null` becomes `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

fn accept<T, E: Display>(
    errors: &mut ValidationErrors,
    field: &'static str,
    result: Result<T, E>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            errors.push(field, err.to_string());
            None
        }
    }
}
