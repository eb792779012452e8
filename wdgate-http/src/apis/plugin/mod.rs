pub mod types;
pub mod loader;
pub mod handler;

pub use types::PluginItem;
pub use loader::{load_plugin_dir, PluginError, PluginGroups};
pub use handler::{handle_load_plugins, PluginQuery};
