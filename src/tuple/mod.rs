// Tuple types: the records this plugin persists and publishes.
//
// Every record type declares a logical tuple name (the platform-wide
// subscription key) and the table it is stored in. Rows travel as JSON
// object maps; the typed structs exist to validate payloads at the API
// boundary and to keep the column set in one place.

pub mod diagram_trace;
pub mod selector;
pub mod setting_property;

pub use diagram_trace::DiagramTraceTuple;
pub use selector::TupleSelector;
pub use setting_property::{
    SettingPropertyTuple, MAX_TRACE_VERTEXES_PROPERTY_NAME, TRACE_COLORS_PROPERTY_NAME,
};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::storage::TupleRow;

/// Contract every persisted tuple type fulfils.
///
/// `TUPLE_NAME` is globally unique across the platform and never changes for
/// the lifetime of the schema; it is the join key between CRUD notifications
/// and observable subscriptions.
pub trait TupleType: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TUPLE_NAME: &'static str;
    const TABLE_NAME: &'static str;

    fn id(&self) -> Option<i64>;

    fn from_row(row: &TupleRow) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(row.clone()))
    }

    fn to_row(&self) -> Result<TupleRow, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(serde::de::Error::custom("tuple did not serialize to an object")),
        }
    }
}
