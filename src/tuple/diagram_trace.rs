use serde::{Deserialize, Serialize};

use crate::tuple::TupleType;

/// A configured diagram trace: a titled link the diagram UI offers when the
/// operator starts a trace from a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramTraceTuple {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    #[serde(default)]
    pub model_set_key: Option<String>,
    #[serde(default)]
    pub coord_set_key: Option<String>,
    #[serde(default)]
    pub fa_icon: Option<String>,

    pub title: String,
    pub url: String,
}

impl TupleType for DiagramTraceTuple {
    const TUPLE_NAME: &'static str = "diagram_trace.DiagramTraceTuple";
    const TABLE_NAME: &'static str = "DiagramTrace";

    fn id(&self) -> Option<i64> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::TUPLE_PREFIX;
    use serde_json::json;

    #[test]
    fn tuple_name_is_plugin_scoped() {
        assert!(DiagramTraceTuple::TUPLE_NAME.starts_with(TUPLE_PREFIX));
    }

    #[test]
    fn row_round_trip_uses_wire_names() {
        let tuple = DiagramTraceTuple {
            id: Some(3),
            model_set_key: Some("ms1".to_string()),
            coord_set_key: None,
            fa_icon: Some("bolt".to_string()),
            title: "Upstream feed".to_string(),
            url: "/trace/upstream".to_string(),
        };

        let row = tuple.to_row().unwrap();
        assert_eq!(row.get("modelSetKey"), Some(&json!("ms1")));
        assert_eq!(row.get("faIcon"), Some(&json!("bolt")));

        let back = DiagramTraceTuple::from_row(&row).unwrap();
        assert_eq!(back, tuple);
    }

    #[test]
    fn payload_without_key_deserializes() {
        let row = match json!({ "title": "t", "url": "/u" }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        let tuple = DiagramTraceTuple::from_row(&row).unwrap();
        assert_eq!(tuple.id, None);
        assert_eq!(tuple.model_set_key, None);
    }
}
