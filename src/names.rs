//! Plugin-wide logical names.
//!
//! The tuple prefix namespaces this plugin's data-set names across the whole
//! platform, so two plugins can both ship a `SettingProperty` table without
//! their subscriptions colliding.

use serde_json::{Map, Value};

/// Short name of this plugin, used as the observable name and filter value.
pub const PLUGIN_NAME: &str = "diagram_trace";

/// Prefix for every logical tuple type name this plugin registers.
pub const TUPLE_PREFIX: &str = "diagram_trace.";

/// Name of the tuple observable this plugin exposes.
pub const OBSERVABLE_NAME: &str = PLUGIN_NAME;

/// Filter key the admin edit screens send with their CRUD payloads.
pub const ADMIN_EDIT_FILT_KEY: &str = "admin.Edit.DiagramTraceTuple";

/// Filter key the admin settings screen sends with its CRUD payloads.
pub const ADMIN_SETTINGS_FILT_KEY: &str = "admin.Edit.SettingProperty";

/// The payload filter all of this plugin's handlers answer to.
///
/// Matches the definition in the admin frontend.
pub fn plugin_filt() -> Map<String, Value> {
    let mut filt = Map::new();
    filt.insert("plugin".to_string(), Value::String(PLUGIN_NAME.to_string()));
    filt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_prefix_is_plugin_scoped() {
        assert!(TUPLE_PREFIX.starts_with(PLUGIN_NAME));
        assert!(TUPLE_PREFIX.ends_with('.'));
    }
}
