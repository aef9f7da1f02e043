//! Environment validation module
//!
//! This module provides the validation routine: client-key prefix checks,
//! raw-value resolution, typed parsing against the combined schema, and
//! construction of the access-guarded result.

use crate::context::RuntimeContext;
use crate::env::ValidatedEnv;
use crate::error::{EnvError, ValidationReport};
use crate::schema::Schema;
use crate::source;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::warn;

/// Reserved prefix required on every client-group variable name
pub const CLIENT_PREFIX: &str = "PUBLIC_";

/// Callback invoked once per error occurrence
pub type ErrorHandler = Arc<dyn Fn(&EnvError) + Send + Sync>;

/// Behavior flags for one validation pass
#[derive(Clone)]
pub struct ValidateOptions {
    /// Execution context, decided at the application entry point.
    pub context: RuntimeContext,
    /// Bundler-style static mapping backing client-context reads.
    pub client_source: Option<BTreeMap<String, String>>,
    /// Per-key overrides applied over the default source wherever the key
    /// is declared and relevant to the active context.
    pub runtime_values: Option<BTreeMap<String, String>>,
    /// Abort on failure (collecting everything into one aggregate) rather
    /// than validating field-by-field.
    pub strict: bool,
    /// Error callback; without one, strict failures raise and non-strict
    /// reports are logged as warnings.
    pub on_error: Option<ErrorHandler>,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            context: RuntimeContext::default(),
            client_source: None,
            runtime_values: None,
            strict: true,
            on_error: None,
        }
    }
}

impl ValidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn non_strict(mut self) -> Self {
        self.strict = false;
        self
    }

    pub fn with_context(mut self, context: RuntimeContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_client_source(mut self, source: BTreeMap<String, String>) -> Self {
        self.client_source = Some(source);
        self
    }

    pub fn with_runtime_values(mut self, values: BTreeMap<String, String>) -> Self {
        self.runtime_values = Some(values);
        self
    }

    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&EnvError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(handler));
        self
    }
}

/// Route one error occurrence through the configured policy.
fn dispatch(error: EnvError, handler: &Option<ErrorHandler>) {
    match handler {
        Some(handler) => handler(&error),
        None => warn!(error = %error, "Environment validation issue"),
    }
}

/// Validate the runtime environment against the two schema groups.
///
/// Strict mode treats validation as one atomic operation: every failure is
/// collected into an aggregated report, which is raised unless an error
/// handler is configured, in which case each detected error is routed
/// through the handler and an empty validated mapping is returned.
/// Non-strict mode validates field-by-field, reporting each failure
/// through the handler (or a warning log) and producing a partial result.
pub fn validate(
    server_schema: Schema,
    client_schema: Schema,
    options: ValidateOptions,
) -> crate::Result<ValidatedEnv> {
    let server_keys: BTreeSet<String> = server_schema.keys().cloned().collect();
    let client_keys: BTreeSet<String> = client_schema.keys().cloned().collect();

    // Name checks run before any value validation; offending keys are
    // excluded from parsing entirely.
    let mut name_violations: Vec<(String, String)> = Vec::new();
    let mut rejected: BTreeSet<String> = BTreeSet::new();
    for key in client_schema.keys() {
        if !key.starts_with(CLIENT_PREFIX) {
            name_violations.push((
                key.clone(),
                format!("client variable name must start with `{CLIENT_PREFIX}`"),
            ));
            rejected.insert(key.clone());
        }
    }
    for key in server_schema.keys() {
        if client_schema.contains_key(key) {
            name_violations.push((
                key.clone(),
                "declared in both server and client groups".to_string(),
            ));
            rejected.insert(key.clone());
        }
    }

    let raw = source::resolve(
        options.context,
        options.client_source.as_ref(),
        options.runtime_values.as_ref(),
        &server_keys,
        &client_keys,
    );

    // Server values are unavailable in a client context; their keys are
    // guarded at read time instead of being validated here.
    let active = client_schema.iter().chain(
        server_schema
            .iter()
            .filter(|_| options.context.is_server()),
    );

    let mut values: BTreeMap<String, Value> = BTreeMap::new();

    if options.strict {
        let mut report = ValidationReport::new();
        for (name, reason) in name_violations {
            report.push_invalid(name, reason);
        }
        for (name, rule) in active {
            if rejected.contains(name) {
                continue;
            }
            match raw.get(name) {
                Some(value) => match rule.parse(name, value) {
                    Ok(parsed) => {
                        values.insert(name.clone(), parsed);
                    }
                    Err(EnvError::Invalid { name, reason }) => {
                        report.push_invalid(name, reason);
                    }
                    Err(other) => return Err(other),
                },
                None => {
                    if let Some(default) = rule.default() {
                        values.insert(name.clone(), default.clone());
                    } else if rule.is_required() {
                        report.push_missing(name.clone());
                    }
                }
            }
        }
        if !report.is_empty() {
            match &options.on_error {
                Some(handler) => {
                    for error in report.into_errors() {
                        handler(&error);
                    }
                    // Best-effort result: the declared shape survives with
                    // an empty validated mapping.
                    return Ok(ValidatedEnv::new(
                        BTreeMap::new(),
                        server_keys,
                        client_keys,
                        options.context,
                        options.on_error.clone(),
                    ));
                }
                None => return Err(EnvError::Aggregate(report)),
            }
        }
    } else {
        for (name, reason) in name_violations {
            dispatch(EnvError::invalid(name, reason), &options.on_error);
        }
        for (name, rule) in active {
            if rejected.contains(name) {
                continue;
            }
            match raw.get(name) {
                Some(value) => match rule.parse(name, value) {
                    Ok(parsed) => {
                        values.insert(name.clone(), parsed);
                    }
                    Err(error) => dispatch(error, &options.on_error),
                },
                None => {
                    if let Some(default) = rule.default() {
                        values.insert(name.clone(), default.clone());
                    } else {
                        dispatch(EnvError::Missing(name.clone()), &options.on_error);
                    }
                }
            }
        }
    }

    Ok(ValidatedEnv::new(
        values,
        server_keys,
        client_keys,
        options.context,
        options.on_error.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::FieldRule;
    use std::sync::Mutex;

    fn schema(fields: &[(&str, FieldRule)]) -> Schema {
        fields
            .iter()
            .map(|(name, rule)| (name.to_string(), rule.clone()))
            .collect()
    }

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn collecting_handler() -> (ErrorHandler, Arc<Mutex<Vec<EnvError>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: ErrorHandler = Arc::new(move |error: &EnvError| {
            sink.lock().unwrap().push(error.clone());
        });
        (handler, seen)
    }

    #[test]
    fn test_unprefixed_client_key_is_invalid_before_parsing() {
        let (handler, seen) = collecting_handler();
        let mut options = ValidateOptions::new();
        options.on_error = Some(handler);
        options.runtime_values = Some(values(&[("APP_NAME", "demo")]));

        let env = validate(
            Schema::new(),
            schema(&[("APP_NAME", FieldRule::string())]),
            options,
        )
        .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind(), Some(ErrorKind::Invalid));
        assert_eq!(seen[0].variable(), Some("APP_NAME"));
        // The offending key never reaches parsing or the result.
        assert_eq!(env.client().get("APP_NAME"), None);
    }

    #[test]
    fn test_key_declared_in_both_groups_is_invalid() {
        let mut options = ValidateOptions::new();
        options.runtime_values = Some(values(&[("PUBLIC_X", "1")]));

        let err = validate(
            schema(&[("PUBLIC_X", FieldRule::integer())]),
            schema(&[("PUBLIC_X", FieldRule::integer())]),
            options,
        )
        .unwrap_err();

        match err {
            EnvError::Aggregate(report) => {
                assert_eq!(report.invalid.len(), 1);
                assert_eq!(report.invalid[0].name, "PUBLIC_X");
            }
            other => panic!("expected aggregate error, got {other}"),
        }
    }

    #[test]
    fn test_strict_aggregate_groups_missing_and_invalid() {
        let options = ValidateOptions {
            strict: true,
            runtime_values: Some(values(&[("ACME_PORT", "eighty")])),
            ..ValidateOptions::default()
        };

        let err = validate(
            schema(&[
                ("ACME_DATABASE_URL", FieldRule::url()),
                ("ACME_PORT", FieldRule::integer()),
            ]),
            Schema::new(),
            options,
        )
        .unwrap_err();

        match err {
            EnvError::Aggregate(report) => {
                assert_eq!(report.missing, vec!["ACME_DATABASE_URL".to_string()]);
                assert_eq!(report.invalid.len(), 1);
                assert_eq!(report.invalid[0].name, "ACME_PORT");
            }
            other => panic!("expected aggregate error, got {other}"),
        }
    }

    #[test]
    fn test_strict_optional_field_may_be_absent() {
        let env = validate(
            schema(&[("ACME_FEATURE_FLAG", FieldRule::boolean().optional())]),
            Schema::new(),
            ValidateOptions::new(),
        )
        .unwrap();
        assert_eq!(env.server().get("ACME_FEATURE_FLAG").unwrap(), None);
    }

    #[test]
    fn test_default_applies_in_both_modes() {
        for strict in [true, false] {
            let options = ValidateOptions {
                strict,
                ..ValidateOptions::default()
            };
            let env = validate(
                schema(&[("ACME_TIMEOUT", FieldRule::integer().default_value(30))]),
                Schema::new(),
                options,
            )
            .unwrap();
            assert_eq!(
                env.server().get("ACME_TIMEOUT").unwrap(),
                Some(&Value::from(30))
            );
        }
    }
}
