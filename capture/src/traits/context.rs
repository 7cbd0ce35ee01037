use crate::error::ContextError;
use crate::types::SessionContext;

/// Read access to the app session the user signed in with.
///
/// Called fresh for every attempt, so a re-login between retries is picked up.
pub trait SessionContextProvider: Send + Sync {
    fn current(&self) -> Result<SessionContext, ContextError>;
}
