use serde::{Deserialize, Serialize};

use crate::tuple::TupleType;

pub const TRACE_COLORS_PROPERTY_NAME: &str = "Trace Colors";
pub const MAX_TRACE_VERTEXES_PROPERTY_NAME: &str = "Max Trace Vertexes";

/// One typed setting row from this plugin's settings table.
///
/// The logical name deliberately does not end in "Tuple"; it mirrors the
/// table name the admin frontend binds to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingPropertyTuple {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    #[serde(rename = "settingId", default)]
    pub setting_id: Option<i64>,

    pub key: String,

    #[serde(rename = "type")]
    pub property_type: String,

    #[serde(default)]
    pub int_value: Option<i64>,
    #[serde(default)]
    pub char_value: Option<String>,
    #[serde(default)]
    pub boolean_value: Option<bool>,
}

impl TupleType for SettingPropertyTuple {
    const TUPLE_NAME: &'static str = "diagram_trace.SettingProperty";
    const TABLE_NAME: &'static str = "SettingProperty";

    fn id(&self) -> Option<i64> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_names_match_the_admin_frontend() {
        let prop = SettingPropertyTuple {
            id: Some(1),
            setting_id: Some(1),
            key: TRACE_COLORS_PROPERTY_NAME.to_string(),
            property_type: "char".to_string(),
            int_value: None,
            char_value: Some("red, green".to_string()),
            boolean_value: None,
        };

        let row = prop.to_row().unwrap();
        assert_eq!(row.get("settingId"), Some(&json!(1)));
        assert_eq!(row.get("type"), Some(&json!("char")));
        assert_eq!(row.get("char_value"), Some(&json!("red, green")));
    }
}
