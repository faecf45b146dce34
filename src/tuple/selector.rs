use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Subscription interest descriptor: a data-set name plus optional filter
/// properties.
///
/// The minimal selectors this plugin emits carry no properties, which makes
/// a notification data-set-wide. Subscribers may still scope their interest
/// with properties; the equivalence rule below keeps both forms compatible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleSelector {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub props: BTreeMap<String, Value>,
}

impl TupleSelector {
    /// Selector over a whole data set, no filter properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: BTreeMap::new(),
        }
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Equivalence for notification purposes.
    ///
    /// Names must match; a property present on both sides must match
    /// exactly; a property absent on either side matches anything.
    pub fn matches(&self, other: &TupleSelector) -> bool {
        if self.name != other.name {
            return false;
        }
        self.props
            .iter()
            .all(|(key, value)| other.props.get(key).map_or(true, |v| v == value))
    }
}

impl fmt::Display for TupleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.props.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} {:?}", self.name, self.props)
        }
    }
}
