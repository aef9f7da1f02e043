//! envguard - Typed environment variable validation with context guarding
//!
//! This library validates the process environment against two declared
//! schema groups (server-only and client-safe fields) and returns a
//! validated result whose server fields are access-guarded when the code
//! runs in a client execution context.

pub mod context;
pub mod env;
pub mod error;
pub mod schema;
pub mod source;
pub mod validation;

pub use context::RuntimeContext;
pub use env::{ClientView, ServerBindings, ServerView, ValidatedEnv};
pub use error::{EnvError, ErrorKind, InvalidField, ValidationReport};
pub use schema::{FieldRule, Schema};
pub use validation::{validate, ErrorHandler, ValidateOptions, CLIENT_PREFIX};

/// Library result type
pub type Result<T> = std::result::Result<T, error::EnvError>;
