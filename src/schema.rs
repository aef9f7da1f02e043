//! Field schema module
//!
//! This module provides the field-rule vocabulary the validator delegates
//! to: a typed parser per named variable, plus optionality, default value
//! and transform. Parsed values are `serde_json::Value`.

use crate::error::EnvError;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use validator::{ValidateEmail, ValidateUrl};

/// A named group of field rules
pub type Schema = BTreeMap<String, FieldRule>;

type Parser = Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync>;
type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Validation rule for one named environment variable
#[derive(Clone)]
pub struct FieldRule {
    parser: Parser,
    required: bool,
    default: Option<Value>,
    transform: Option<Transform>,
}

impl FieldRule {
    fn with_parser<F>(parser: F) -> Self
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            parser: Arc::new(parser),
            required: true,
            default: None,
            transform: None,
        }
    }

    /// Any non-empty string.
    pub fn string() -> Self {
        Self::with_parser(|raw| Ok(Value::String(raw.to_string())))
    }

    /// A string that parses as a URL.
    pub fn url() -> Self {
        Self::with_parser(|raw| {
            if raw.validate_url() {
                Ok(Value::String(raw.to_string()))
            } else {
                Err("not a valid url".to_string())
            }
        })
    }

    /// A string that parses as an email address.
    pub fn email() -> Self {
        Self::with_parser(|raw| {
            if raw.validate_email() {
                Ok(Value::String(raw.to_string()))
            } else {
                Err("not a valid email address".to_string())
            }
        })
    }

    /// A signed 64-bit integer.
    pub fn integer() -> Self {
        Self::with_parser(|raw| {
            raw.trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| "not a valid integer".to_string())
        })
    }

    /// A boolean: `true`/`false` or `1`/`0`.
    pub fn boolean() -> Self {
        Self::with_parser(|raw| match raw.trim() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err("not a valid boolean".to_string()),
        })
    }

    /// A string matching the given pattern.
    pub fn pattern(pattern: Regex) -> Self {
        Self::with_parser(move |raw| {
            if pattern.is_match(raw) {
                Ok(Value::String(raw.to_string()))
            } else {
                Err(format!("does not match pattern `{}`", pattern.as_str()))
            }
        })
    }

    /// Mark the field optional: absence is not a failure in strict mode.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Value used when the variable is absent or present-but-empty.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Transform applied to the parsed value.
    pub fn map<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Parse a raw value against this rule.
    ///
    /// A present-but-empty value falls back to the declared default when
    /// one exists, exercising the same path as an absent variable.
    pub fn parse(&self, name: &str, raw: &str) -> crate::Result<Value> {
        if raw.is_empty() {
            if let Some(default) = &self.default {
                return Ok(default.clone());
            }
        }
        let parsed = (self.parser)(raw)
            .map_err(|reason| EnvError::invalid(name, reason))?;
        match &self.transform {
            Some(transform) => Ok(transform(parsed)),
            None => Ok(parsed),
        }
    }
}

impl fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRule")
            .field("required", &self.required)
            .field("default", &self.default)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}
