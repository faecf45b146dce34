use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Map;

use crate::observable::registry::ObservableError;
use crate::storage::{SessionFactory, TupleRow};
use crate::tuple::{TupleSelector, TupleType};

/// Produces the current tuples matching a selector, on demand.
///
/// The registry re-invokes the provider on every notification so subscribers
/// always see committed state, never the mutation payload.
#[async_trait]
pub trait TuplesProvider: Send + Sync {
    async fn make_tuples(&self, selector: &TupleSelector)
        -> Result<Vec<TupleRow>, ObservableError>;
}

/// Provider that reads a tuple type straight out of storage, applying the
/// selector's properties as column equality filters.
pub struct OrmTuplesProvider<T: TupleType> {
    session_factory: Arc<dyn SessionFactory>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: TupleType> OrmTuplesProvider<T> {
    pub fn new(session_factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            session_factory,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: TupleType> TuplesProvider for OrmTuplesProvider<T> {
    async fn make_tuples(
        &self,
        selector: &TupleSelector,
    ) -> Result<Vec<TupleRow>, ObservableError> {
        let provider_failed = |message: String| ObservableError::ProviderFailed {
            name: selector.name.clone(),
            message,
        };

        let mut session = self
            .session_factory
            .begin()
            .await
            .map_err(|e| provider_failed(e.to_string()))?;

        let filter: TupleRow = selector
            .props
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<Map<_, _>>();

        let rows = session
            .select_where(T::TABLE_NAME, &filter)
            .await
            .map_err(|e| provider_failed(e.to_string()))?;

        // Read-only session, nothing to keep.
        let _ = session.rollback().await;

        Ok(rows)
    }
}
