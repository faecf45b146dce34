//! Plugin entry wiring.
//!
//! Builds the tuple observable, registers the providers for both data sets,
//! and attaches the observable extension to each admin CRUD handler. The
//! observable is created once here and passed by `Arc` to everything that
//! needs it.

use std::sync::Arc;

use axum::Router;
use serde_json::Value;

use crate::crud::{OrmCrudHandler, UpdateObservableExtension};
use crate::names;
use crate::observable::{ObservableError, OrmTuplesProvider, TupleObservable};
use crate::storage::SessionFactory;
use crate::tuple::{DiagramTraceTuple, SettingPropertyTuple, TupleType};

pub struct DiagramTracePlugin {
    observable: Arc<TupleObservable>,
    trace_handler: Arc<OrmCrudHandler<DiagramTraceTuple>>,
    settings_handler: Arc<OrmCrudHandler<SettingPropertyTuple>>,
}

impl DiagramTracePlugin {
    /// Entry hook. Everything the plugin serves hangs off the returned
    /// value; dropping it without `stop` leaves subscribers attached to a
    /// dead observable.
    pub async fn start(
        session_factory: Arc<dyn SessionFactory>,
    ) -> Result<Self, ObservableError> {
        let observable = make_tuple_observable(Arc::clone(&session_factory)).await?;

        let trace_handler =
            make_diagram_trace_handler(Arc::clone(&observable), Arc::clone(&session_factory));
        let settings_handler =
            make_setting_property_handler(Arc::clone(&observable), session_factory);

        tracing::info!(plugin = names::PLUGIN_NAME, "plugin started");
        Ok(Self {
            observable,
            trace_handler,
            settings_handler,
        })
    }

    pub fn observable(&self) -> Arc<TupleObservable> {
        Arc::clone(&self.observable)
    }

    pub fn trace_handler(&self) -> Arc<OrmCrudHandler<DiagramTraceTuple>> {
        Arc::clone(&self.trace_handler)
    }

    pub fn settings_handler(&self) -> Arc<OrmCrudHandler<SettingPropertyTuple>> {
        Arc::clone(&self.settings_handler)
    }

    /// Close every live subscription channel.
    pub async fn stop(&self) {
        self.observable.shutdown().await;
        tracing::info!(plugin = names::PLUGIN_NAME, "plugin stopped");
    }

    pub fn admin_router(self: Arc<Self>) -> Router {
        crate::handlers::admin::router(self)
    }
}

/// Create the observable object and register the tuple providers.
async fn make_tuple_observable(
    session_factory: Arc<dyn SessionFactory>,
) -> Result<Arc<TupleObservable>, ObservableError> {
    let observable = Arc::new(TupleObservable::new(names::OBSERVABLE_NAME));

    observable
        .register_provider(
            DiagramTraceTuple::TUPLE_NAME,
            Arc::new(OrmTuplesProvider::<DiagramTraceTuple>::new(Arc::clone(
                &session_factory,
            ))),
        )
        .await?;
    observable
        .register_provider(
            SettingPropertyTuple::TUPLE_NAME,
            Arc::new(OrmTuplesProvider::<SettingPropertyTuple>::new(
                session_factory,
            )),
        )
        .await?;

    Ok(observable)
}

fn make_diagram_trace_handler(
    observable: Arc<TupleObservable>,
    session_factory: Arc<dyn SessionFactory>,
) -> Arc<OrmCrudHandler<DiagramTraceTuple>> {
    let mut filt = names::plugin_filt();
    filt.insert(
        "key".to_string(),
        Value::String(names::ADMIN_EDIT_FILT_KEY.to_string()),
    );

    let mut handler = OrmCrudHandler::<DiagramTraceTuple>::new(session_factory, filt);
    handler.add_extension(Arc::new(UpdateObservableExtension::new(
        observable,
        DiagramTraceTuple::TUPLE_NAME,
    )));
    Arc::new(handler)
}

fn make_setting_property_handler(
    observable: Arc<TupleObservable>,
    session_factory: Arc<dyn SessionFactory>,
) -> Arc<OrmCrudHandler<SettingPropertyTuple>> {
    let mut filt = names::plugin_filt();
    filt.insert(
        "key".to_string(),
        Value::String(names::ADMIN_SETTINGS_FILT_KEY.to_string()),
    );

    let mut handler = OrmCrudHandler::<SettingPropertyTuple>::new(session_factory, filt);
    handler.add_extension(Arc::new(UpdateObservableExtension::new(
        observable,
        SettingPropertyTuple::TUPLE_NAME,
    )));
    Arc::new(handler)
}
