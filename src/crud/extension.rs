use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::observable::ObservableError;
use crate::storage::{OrmSession, PersistenceError, TupleRow};

/// Errors raised by post-commit extensions.
///
/// By the time an extension runs the mutation is durable, so none of these
/// ever roll anything back; they only change what the mutator is told.
#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error(transparent)]
    Observable(#[from] ObservableError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("{0}")]
    Failed(String),
}

/// What a post-commit extension gets to see: the mutated tuples as
/// committed, a fresh session for any follow-up reads, and the filter
/// context the mutation arrived with.
pub struct ExtensionContext<'a> {
    pub tuples: &'a [TupleRow],
    pub session: &'a mut dyn OrmSession,
    pub payload_filt: &'a Map<String, Value>,
}

/// A post-commit hook on a CRUD handler.
///
/// Hooks run in registration order after the mutation's commit succeeds.
/// Returning `Ok(false)` stops the chain; an error is surfaced to the
/// mutator but the commit stands.
#[async_trait]
pub trait CrudHandlerExtension: Send + Sync {
    fn name(&self) -> &'static str;

    async fn after_update_commit(
        &self,
        _ctx: &mut ExtensionContext<'_>,
    ) -> Result<bool, ExtensionError> {
        Ok(true)
    }

    async fn after_delete_commit(
        &self,
        _ctx: &mut ExtensionContext<'_>,
    ) -> Result<bool, ExtensionError> {
        Ok(true)
    }
}
