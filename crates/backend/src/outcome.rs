//! Uniform `{data, error}` result of every public operation.
//!
//! Operations never return `Err` to the caller. Internally they run as
//! `Result<Option<T>, BackendError>`; [`Outcome::capture`] logs the failure
//! and folds it into the record.

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::error::BackendError;

/// Two-field result record.
///
/// `data` and `error` are never both set. Both are empty only for a success
/// that found nothing (no page with that name, no session, no user).
#[derive(Debug)]
#[must_use]
pub struct Outcome<T> {
    data: Option<T>,
    error: Option<BackendError>,
}

impl<T> Outcome<T> {
    /// Successful outcome carrying a value.
    pub const fn data(value: T) -> Self {
        Self {
            data: Some(value),
            error: None,
        }
    }

    /// Successful outcome with nothing found.
    pub const fn empty() -> Self {
        Self {
            data: None,
            error: None,
        }
    }

    /// Failed outcome. Not logged; use [`Outcome::capture`] for that.
    pub const fn error(error: BackendError) -> Self {
        Self {
            data: None,
            error: Some(error),
        }
    }

    /// Fold an internal result into an outcome, logging the failure.
    pub fn capture(operation: &'static str, result: Result<Option<T>, BackendError>) -> Self {
        match result {
            Ok(Some(value)) => Self::data(value),
            Ok(None) => Self::empty(),
            Err(error) => {
                tracing::error!(operation, error = %error, "backend operation failed");
                Self::error(error)
            }
        }
    }

    /// Whether no error was recorded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Borrow the data, if any.
    #[must_use]
    pub const fn data_ref(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Borrow the error, if any.
    #[must_use]
    pub const fn error_ref(&self) -> Option<&BackendError> {
        self.error.as_ref()
    }

    /// Take the data, dropping any error.
    #[must_use]
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Convert back into a `Result` for callers that prefer `?`.
    ///
    /// # Errors
    ///
    /// Returns the recorded error, if any.
    pub fn into_result(self) -> Result<Option<T>, BackendError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }

    /// Map the data, keeping the error untouched.
    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        Outcome {
            data: self.data.map(f),
            error: self.error,
        }
    }
}

impl<T> From<Outcome<T>> for Result<Option<T>, BackendError> {
    fn from(outcome: Outcome<T>) -> Self {
        outcome.into_result()
    }
}

/// Serializes as `{"data": <T or null>, "error": <message or null>}`.
impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Outcome", 2)?;
        state.serialize_field("data", &self.data)?;
        state.serialize_field("error", &self.error.as_ref().map(ToString::to_string))?;
        state.end()
    }
}
