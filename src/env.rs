//! Validated environment module
//!
//! The result of a validation pass: parsed values for every declared key,
//! exposed through a merged accessor plus `client` and `server` views. In
//! a client context every server-key read goes through a guard evaluated
//! at read time.

use crate::context::RuntimeContext;
use crate::error::EnvError;
use crate::validation::ErrorHandler;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Access-guarded result of one validation pass
#[derive(Clone)]
pub struct ValidatedEnv {
    values: BTreeMap<String, Value>,
    server_keys: BTreeSet<String>,
    client_keys: BTreeSet<String>,
    context: RuntimeContext,
    on_error: Option<ErrorHandler>,
}

impl ValidatedEnv {
    pub(crate) fn new(
        values: BTreeMap<String, Value>,
        server_keys: BTreeSet<String>,
        client_keys: BTreeSet<String>,
        context: RuntimeContext,
        on_error: Option<ErrorHandler>,
    ) -> Self {
        Self {
            values,
            server_keys,
            client_keys,
            context,
            on_error,
        }
    }

    pub fn context(&self) -> RuntimeContext {
        self.context
    }

    /// Read a declared key from the merged top-level mapping.
    ///
    /// Server keys go through the same per-read guard as the server view;
    /// undeclared or absent keys resolve to `None`.
    pub fn get(&self, key: &str) -> crate::Result<Option<&Value>> {
        if self.server_keys.contains(key) && !self.guard(key)? {
            return Ok(None);
        }
        Ok(self.values.get(key))
    }

    /// Client-group view, readable in every context.
    pub fn client(&self) -> ClientView<'_> {
        ClientView { env: self }
    }

    /// Server-group view; reads are guarded in a client context.
    pub fn server(&self) -> ServerView<'_> {
        ServerView { env: self }
    }

    /// Per-read access check for a server key. Returns whether the value
    /// is accessible; evaluated on every call, never cached.
    fn guard(&self, key: &str) -> crate::Result<bool> {
        if self.context.is_server() {
            return Ok(true);
        }
        debug!(variable = %key, "Guarded server variable read in client context");
        let error = EnvError::ClientAccess(key.to_string());
        match &self.on_error {
            Some(handler) => {
                handler(&error);
                Ok(false)
            }
            None => Err(error),
        }
    }
}

impl fmt::Debug for ValidatedEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedEnv")
            .field("context", &self.context)
            .field("server_keys", &self.server_keys)
            .field("client_keys", &self.client_keys)
            .finish()
    }
}

/// Read view over the client-group subset
#[derive(Debug, Clone, Copy)]
pub struct ClientView<'a> {
    env: &'a ValidatedEnv,
}

impl<'a> ClientView<'a> {
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        if !self.env.client_keys.contains(key) {
            return None;
        }
        self.env.values.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a str> {
        self.env.client_keys.iter().map(String::as_str)
    }
}

/// Read view over the server-group subset
///
/// In a client context each `get` triggers the access guard: it raises
/// `client_access` without an error handler, or invokes the handler and
/// resolves to absent with one.
#[derive(Debug, Clone, Copy)]
pub struct ServerView<'a> {
    env: &'a ValidatedEnv,
}

impl<'a> ServerView<'a> {
    pub fn get(&self, key: &str) -> crate::Result<Option<&'a Value>> {
        if !self.env.server_keys.contains(key) {
            return Ok(None);
        }
        if !self.env.guard(key)? {
            return Ok(None);
        }
        Ok(self.env.values.get(key))
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a str> {
        self.env.server_keys.iter().map(String::as_str)
    }
}

/// Binds validated server fields as a framework's per-request environment
/// type. Purely a type-level convenience for routing integrations.
pub trait ServerBindings: Sized {
    fn from_validated(env: &ValidatedEnv) -> crate::Result<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sample_env(context: RuntimeContext, on_error: Option<ErrorHandler>) -> ValidatedEnv {
        let mut values = BTreeMap::new();
        values.insert("DATABASE_URL".to_string(), Value::from("postgres://db"));
        values.insert("PUBLIC_APP".to_string(), Value::from("demo"));
        ValidatedEnv::new(
            values,
            ["DATABASE_URL".to_string()].into_iter().collect(),
            ["PUBLIC_APP".to_string()].into_iter().collect(),
            context,
            on_error,
        )
    }

    #[test]
    fn test_server_context_reads_both_views() {
        let env = sample_env(RuntimeContext::Server, None);
        assert_eq!(
            env.server().get("DATABASE_URL").unwrap(),
            Some(&Value::from("postgres://db"))
        );
        assert_eq!(env.client().get("PUBLIC_APP"), Some(&Value::from("demo")));
        assert_eq!(
            env.get("DATABASE_URL").unwrap(),
            Some(&Value::from("postgres://db"))
        );
    }

    #[test]
    fn test_client_context_guards_server_reads() {
        let env = sample_env(RuntimeContext::Client, None);
        let err = env.server().get("DATABASE_URL").unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ClientAccess));
        assert_eq!(err.variable(), Some("DATABASE_URL"));
        // Client view stays readable.
        assert_eq!(env.client().get("PUBLIC_APP"), Some(&Value::from("demo")));
    }

    #[test]
    fn test_guard_invokes_handler_once_per_read() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler: ErrorHandler = Arc::new(move |error| {
            assert_eq!(error.kind(), Some(ErrorKind::ClientAccess));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let env = sample_env(RuntimeContext::Client, Some(handler));
        assert_eq!(env.server().get("DATABASE_URL").unwrap(), None);
        assert_eq!(env.server().get("DATABASE_URL").unwrap(), None);
        assert_eq!(env.get("DATABASE_URL").unwrap(), None);
        // Three reads, three independent guard evaluations.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_undeclared_key_resolves_to_none_without_guard() {
        let env = sample_env(RuntimeContext::Client, None);
        assert_eq!(env.server().get("OTHER").unwrap(), None);
        assert_eq!(env.get("OTHER").unwrap(), None);
        assert_eq!(env.client().get("DATABASE_URL"), None);
    }

    #[test]
    fn test_server_bindings_projection() {
        struct Bindings {
            database_url: String,
        }

        impl ServerBindings for Bindings {
            fn from_validated(env: &ValidatedEnv) -> crate::Result<Self> {
                let database_url = env
                    .server()
                    .get("DATABASE_URL")?
                    .and_then(Value::as_str)
                    .ok_or_else(|| EnvError::Missing("DATABASE_URL".to_string()))?
                    .to_string();
                Ok(Bindings { database_url })
            }
        }

        let env = sample_env(RuntimeContext::Server, None);
        let bindings = Bindings::from_validated(&env).unwrap();
        assert_eq!(bindings.database_url, "postgres://db");
    }
}
