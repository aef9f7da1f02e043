//! Execution context module
//!
//! The context is an explicit parameter decided once at the application's
//! entry point, rather than inferred from ambient globals.

/// Execution context the validator runs in.
///
/// A server context has access to all declared fields; a client context is
/// restricted to client-group fields, with server-group reads guarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RuntimeContext {
    #[default]
    Server,
    Client,
}

impl RuntimeContext {
    pub fn is_server(&self) -> bool {
        matches!(self, RuntimeContext::Server)
    }

    pub fn is_client(&self) -> bool {
        matches!(self, RuntimeContext::Client)
    }
}
