//! Error handling module
//!
//! This module provides the error taxonomy for environment validation:
//! `missing`, `invalid` and `client_access`, plus the aggregated report
//! raised by strict-mode validation.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Environment validation error types
#[derive(Error, Debug, Clone)]
pub enum EnvError {
    #[error("missing environment variable `{0}`")]
    Missing(String),

    #[error("invalid environment variable `{name}`: {reason}")]
    Invalid { name: String, reason: String },

    #[error("server-only variable `{0}` accessed from a client context")]
    ClientAccess(String),

    #[error("environment validation failed: {0}")]
    Aggregate(ValidationReport),
}

impl EnvError {
    /// Construct an `Invalid` error for a named variable.
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        EnvError::Invalid {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Classification of this error, if it is a single occurrence.
    ///
    /// `Aggregate` wraps multiple occurrences and has no kind of its own.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            EnvError::Missing(_) => Some(ErrorKind::Missing),
            EnvError::Invalid { .. } => Some(ErrorKind::Invalid),
            EnvError::ClientAccess(_) => Some(ErrorKind::ClientAccess),
            EnvError::Aggregate(_) => None,
        }
    }

    /// Name of the variable this error refers to, if any.
    pub fn variable(&self) -> Option<&str> {
        match self {
            EnvError::Missing(name) => Some(name),
            EnvError::Invalid { name, .. } => Some(name),
            EnvError::ClientAccess(name) => Some(name),
            EnvError::Aggregate(_) => None,
        }
    }
}

/// Error classification (mutually exclusive per occurrence)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Missing,
    Invalid,
    ClientAccess,
}

/// An invalid field together with the reason its value was rejected
#[derive(Debug, Clone, Serialize)]
pub struct InvalidField {
    pub name: String,
    pub reason: String,
}

/// Aggregated validation failures, grouped by classification
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub missing: Vec<String>,
    pub invalid: Vec<InvalidField>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty()
    }

    pub fn push_missing(&mut self, name: impl Into<String>) {
        self.missing.push(name.into());
    }

    pub fn push_invalid(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.invalid.push(InvalidField {
            name: name.into(),
            reason: reason.into(),
        });
    }

    /// Flatten the report into individual error occurrences, in the order
    /// missing first, then invalid.
    pub fn into_errors(self) -> Vec<EnvError> {
        let mut errors: Vec<EnvError> = self
            .missing
            .into_iter()
            .map(EnvError::Missing)
            .collect();
        errors.extend(self.invalid.into_iter().map(|f| EnvError::Invalid {
            name: f.name,
            reason: f.reason,
        }));
        errors
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote = false;
        if !self.missing.is_empty() {
            write!(f, "missing: [{}]", self.missing.join(", "))?;
            wrote = true;
        }
        if !self.invalid.is_empty() {
            if wrote {
                write!(f, "; ")?;
            }
            let rendered: Vec<String> = self
                .invalid
                .iter()
                .map(|field| format!("{} ({})", field.name, field.reason))
                .collect();
            write!(f, "invalid: [{}]", rendered.join(", "))?;
        }
        if !wrote && self.invalid.is_empty() {
            write!(f, "no errors")?;
        }
        Ok(())
    }
}
