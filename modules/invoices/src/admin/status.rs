//! Outcome of an admin operation.
//!
//! Admin operations never return `Err`: validation problems, hook failures and
//! database errors all end up as messages in a [`Status`], which the caller
//! shows to the operator.

use serde::Serialize;

const SUCCESS: &str = "Success";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status<T = ()> {
    errors: Vec<String>,
    message: String,
    result: Option<T>,
}

impl<T> Default for Status<T> {
    fn default() -> Self {
        Self {
            errors: Vec::new(),
            message: SUCCESS.to_owned(),
            result: None,
        }
    }
}

impl<T> Status<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A failed status carrying one error.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        let mut status = Self::new();
        status.add_error(message);
        status
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Every error joined by `separator`.
    #[must_use]
    pub fn get_all_errors(&self, separator: &str) -> String {
        self.errors.join(separator)
    }

    pub fn add_error(&mut self, error: impl Into<String>) -> &mut Self {
        self.errors.push(error.into());
        self
    }

    /// Success message; a failed status reports its error count instead.
    #[must_use]
    pub fn message(&self) -> String {
        match self.errors.len() {
            0 => self.message.clone(),
            1 => "Failed with 1 error".to_owned(),
            n => format!("Failed with {n} errors"),
        }
    }

    pub fn set_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.message = message.into();
        self
    }

    pub fn set_result(&mut self, result: T) -> &mut Self {
        self.result = Some(result);
        self
    }

    /// The result, present only when the operation succeeded.
    #[must_use]
    pub fn result(&self) -> Option<&T> {
        if self.has_errors() {
            None
        } else {
            self.result.as_ref()
        }
    }

    #[must_use]
    pub fn into_result(self) -> Option<T> {
        if self.has_errors() { None } else { self.result }
    }

    /// Copy the errors of another status into this one.
    pub fn combine_errors<U>(&mut self, other: &Status<U>) -> &mut Self {
        self.errors.extend(other.errors.iter().cloned());
        self
    }
}
