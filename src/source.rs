//! Raw environment resolution module
//!
//! This module resolves the untyped key/value mapping the validator runs
//! against: process environment variables in a server context, a
//! bundler-style static mapping in a client context, with caller-supplied
//! runtime values overlaid per key for declared keys only.

use crate::context::RuntimeContext;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Resolve the raw input mapping for one validation pass.
///
/// Only declared keys are read from the default source, and the overlay is
/// restricted to the key set relevant to the active context (client keys
/// in a client context; client and server keys in a server context).
pub fn resolve(
    context: RuntimeContext,
    client_source: Option<&BTreeMap<String, String>>,
    runtime_values: Option<&BTreeMap<String, String>>,
    server_keys: &BTreeSet<String>,
    client_keys: &BTreeSet<String>,
) -> BTreeMap<String, String> {
    let mut raw = BTreeMap::new();

    match context {
        RuntimeContext::Server => {
            for key in server_keys.iter().chain(client_keys.iter()) {
                if let Ok(value) = std::env::var(key) {
                    raw.insert(key.clone(), value);
                }
            }
        }
        RuntimeContext::Client => {
            if let Some(source) = client_source {
                for key in client_keys {
                    if let Some(value) = source.get(key) {
                        raw.insert(key.clone(), value.clone());
                    }
                }
            }
        }
    }

    if let Some(overrides) = runtime_values {
        for (key, value) in overrides {
            let relevant = match context {
                RuntimeContext::Server => {
                    server_keys.contains(key) || client_keys.contains(key)
                }
                RuntimeContext::Client => client_keys.contains(key),
            };
            if relevant {
                raw.insert(key.clone(), value.clone());
            }
        }
    }

    debug!(
        context = ?context,
        resolved_keys = raw.len(),
        "Resolved raw environment mapping"
    );

    raw
}
