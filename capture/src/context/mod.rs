//! Where the signed-in user and bearer token come from.

pub mod file_store;

use crate::error::ContextError;
use crate::traits::context::SessionContextProvider;
use crate::types::SessionContext;

pub use file_store::FileSessionStore;

/// A context handed in directly, e.g. by an embedding app that already holds it.
#[derive(Debug, Clone)]
pub struct StaticContext(Option<SessionContext>);

impl StaticContext {
    pub fn new(context: SessionContext) -> Self {
        Self(Some(context))
    }

    pub fn signed_out() -> Self {
        Self(None)
    }
}

impl SessionContextProvider for StaticContext {
    fn current(&self) -> Result<SessionContext, ContextError> {
        self.0.clone().ok_or(ContextError::NotSignedIn)
    }
}
