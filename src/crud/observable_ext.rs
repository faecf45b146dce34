use std::sync::Arc;

use async_trait::async_trait;

use crate::crud::extension::{CrudHandlerExtension, ExtensionContext, ExtensionError};
use crate::observable::TupleObservable;
use crate::tuple::TupleSelector;

/// Bridges CRUD mutations to the tuple observable.
///
/// Called after events that alter data; it then notifies the observer so
/// every live subscription on the mutated data set is refreshed. Create is
/// deliberately not bridged.
pub struct UpdateObservableExtension {
    observable: Arc<TupleObservable>,
    data_set: String,
}

impl UpdateObservableExtension {
    pub fn new(observable: Arc<TupleObservable>, data_set: impl Into<String>) -> Self {
        Self {
            observable,
            data_set: data_set.into(),
        }
    }

    async fn tell_observer(&self) -> Result<bool, ExtensionError> {
        // No filter properties copied across: the notification is
        // data-set-wide. Scoped invalidation would add the mutated record's
        // keys to this selector.
        let selector = TupleSelector::new(self.data_set.clone());
        self.observable.notify_of_update(&selector).await?;
        Ok(true)
    }
}

#[async_trait]
impl CrudHandlerExtension for UpdateObservableExtension {
    fn name(&self) -> &'static str {
        "update-observable"
    }

    async fn after_update_commit(
        &self,
        _ctx: &mut ExtensionContext<'_>,
    ) -> Result<bool, ExtensionError> {
        self.tell_observer().await
    }

    async fn after_delete_commit(
        &self,
        _ctx: &mut ExtensionContext<'_>,
    ) -> Result<bool, ExtensionError> {
        self.tell_observer().await
    }
}
