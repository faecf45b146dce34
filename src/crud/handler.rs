use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::crud::extension::{CrudHandlerExtension, ExtensionContext, ExtensionError};
use crate::storage::{PersistenceError, SessionFactory, TupleRow};
use crate::tuple::TupleType;

#[derive(Debug, Error)]
pub enum CrudError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Payload is not a valid {tuple}: {message}")]
    InvalidPayload {
        tuple: &'static str,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    /// The mutation committed, then a hook failed. The record IS durable;
    /// callers must not retry the mutation on this error.
    #[error("Post-commit hook '{hook}' failed: {source}")]
    PostCommitHook {
        hook: &'static str,
        #[source]
        source: ExtensionError,
    },
}

enum HookPoint {
    AfterUpdate,
    AfterDelete,
}

/// Generic CRUD handler for one tuple type.
///
/// Every mutation runs in its own transaction. Update and delete invoke the
/// registered extensions once, strictly after their commit succeeds; create
/// and the read operations never do.
pub struct OrmCrudHandler<T: TupleType> {
    session_factory: Arc<dyn SessionFactory>,
    payload_filt: Map<String, Value>,
    extensions: Vec<Arc<dyn CrudHandlerExtension>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: TupleType> OrmCrudHandler<T> {
    pub fn new(session_factory: Arc<dyn SessionFactory>, payload_filt: Map<String, Value>) -> Self {
        Self {
            session_factory,
            payload_filt,
            extensions: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Register a post-commit extension. Extensions run in registration
    /// order.
    pub fn add_extension(&mut self, extension: Arc<dyn CrudHandlerExtension>) -> &mut Self {
        tracing::debug!(
            tuple = T::TUPLE_NAME,
            extension = extension.name(),
            "extension registered"
        );
        self.extensions.push(extension);
        self
    }

    pub async fn create(&self, payload: TupleRow) -> Result<T, CrudError> {
        let tuple = parse::<T>(&payload)?;
        let row = to_row(&tuple)?;

        let mut session = self.session_factory.begin().await?;
        let stored = session.insert(T::TABLE_NAME, row).await?;
        session.commit().await?;

        // No notification on create: only update and delete invalidate
        // subscribers.
        tracing::debug!(tuple = T::TUPLE_NAME, "created");
        parse::<T>(&stored)
    }

    pub async fn retrieve_all(&self) -> Result<Vec<T>, CrudError> {
        self.retrieve(TupleRow::new()).await
    }

    pub async fn retrieve(&self, filter: TupleRow) -> Result<Vec<T>, CrudError> {
        let mut session = self.session_factory.begin().await?;
        let rows = session.select_where(T::TABLE_NAME, &filter).await?;
        let _ = session.rollback().await;

        rows.iter().map(parse::<T>).collect()
    }

    pub async fn retrieve_by_id(&self, id: i64) -> Result<Option<T>, CrudError> {
        let mut session = self.session_factory.begin().await?;
        let row = session.select_by_id(T::TABLE_NAME, id).await?;
        let _ = session.rollback().await;

        row.as_ref().map(parse::<T>).transpose()
    }

    /// Apply changes and commit, then notify the extensions. A failed
    /// commit returns the persistence error and no extension runs.
    pub async fn update(&self, payload: TupleRow) -> Result<T, CrudError> {
        let tuple = parse::<T>(&payload)?;
        let id = tuple.id().ok_or_else(|| CrudError::InvalidPayload {
            tuple: T::TUPLE_NAME,
            message: "update payload is missing its key".to_string(),
        })?;
        let row = to_row(&tuple)?;

        let mut session = self.session_factory.begin().await?;
        let updated = session.update(T::TABLE_NAME, id, row).await?;
        session.commit().await?;

        tracing::debug!(tuple = T::TUPLE_NAME, id, "updated");
        self.run_extensions(HookPoint::AfterUpdate, &[updated.clone()])
            .await?;
        parse::<T>(&updated)
    }

    /// Remove the record and commit, then notify the extensions, mirroring
    /// `update`.
    pub async fn delete(&self, id: i64) -> Result<(), CrudError> {
        let mut session = self.session_factory.begin().await?;

        let existing = session.select_by_id(T::TABLE_NAME, id).await?;
        let Some(existing) = existing else {
            let _ = session.rollback().await;
            return Err(CrudError::NotFound(format!("{}#{}", T::TUPLE_NAME, id)));
        };

        session.delete(T::TABLE_NAME, id).await?;
        session.commit().await?;

        tracing::debug!(tuple = T::TUPLE_NAME, id, "deleted");
        self.run_extensions(HookPoint::AfterDelete, &[existing]).await
    }

    /// Run the extension chain against an already-durable mutation.
    ///
    /// The mutation's own transaction is consumed by its commit, so hooks
    /// get a fresh read session, rolled back once the chain finishes.
    async fn run_extensions(
        &self,
        point: HookPoint,
        tuples: &[TupleRow],
    ) -> Result<(), CrudError> {
        if self.extensions.is_empty() {
            return Ok(());
        }

        let mut session =
            self.session_factory
                .begin()
                .await
                .map_err(|e| CrudError::PostCommitHook {
                    hook: "post-commit-session",
                    source: ExtensionError::Persistence(e),
                })?;

        let mut outcome = Ok(());
        for extension in &self.extensions {
            let mut ctx = ExtensionContext {
                tuples,
                session: session.as_mut(),
                payload_filt: &self.payload_filt,
            };
            let result = match point {
                HookPoint::AfterUpdate => extension.after_update_commit(&mut ctx).await,
                HookPoint::AfterDelete => extension.after_delete_commit(&mut ctx).await,
            };
            match result {
                Ok(true) => continue,
                Ok(false) => break,
                Err(source) => {
                    tracing::warn!(
                        tuple = T::TUPLE_NAME,
                        extension = extension.name(),
                        error = %source,
                        "post-commit extension failed, mutation stands"
                    );
                    outcome = Err(CrudError::PostCommitHook {
                        hook: extension.name(),
                        source,
                    });
                    break;
                }
            }
        }

        let _ = session.rollback().await;
        outcome
    }
}

fn parse<T: TupleType>(row: &TupleRow) -> Result<T, CrudError> {
    T::from_row(row).map_err(|e| CrudError::InvalidPayload {
        tuple: T::TUPLE_NAME,
        message: e.to_string(),
    })
}

fn to_row<T: TupleType>(tuple: &T) -> Result<TupleRow, CrudError> {
    tuple.to_row().map_err(|e| CrudError::InvalidPayload {
        tuple: T::TUPLE_NAME,
        message: e.to_string(),
    })
}
