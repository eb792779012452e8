use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One plugin description read from a fragment file.
///
/// A fragment is either a plugin itself or a container whose `plugin_list`
/// holds the plugins; containers are only ever one level deep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginItem {
    pub code: String,
    pub desc: String,
    pub class: String,
    pub ui_type: String,
    pub input_vars: Option<Map<String, Value>>,
    pub output_vars: Value,
    pub service_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub plugin_list: Vec<PluginItem>,
}

impl PluginItem {
    /// Both the unique key and the classification key are present.
    pub fn is_classified(&self) -> bool {
        !self.code.is_empty() && !self.class.is_empty()
    }
}
