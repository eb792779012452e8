use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::types::PluginItem;

/// Plugins keyed by their classification, in fragment order within a class.
pub type PluginGroups = BTreeMap<String, Vec<PluginItem>>;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("failed to read plugin directory {}: {source}", .path.display())]
    ReadDir { path: PathBuf, source: io::Error },

    #[error("failed to read {file}: {source}")]
    ReadFile { file: String, source: io::Error },

    #[error("config error:{file} {source}")]
    Parse {
        file: String,
        source: serde_json::Error,
    },
}

/// Read every fragment of `dir` in file name order and group the plugins.
/// A `null` fragment contributes nothing. The first unreadable or malformed
/// fragment aborts the whole load.
pub async fn load_plugin_dir(dir: &Path) -> Result<PluginGroups, PluginError> {
    let read_dir_error = |source| PluginError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_dir_error)?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_dir_error)? {
        names.push(entry.file_name());
    }
    names.sort();

    let mut groups = PluginGroups::new();
    for name in names {
        let file = name.to_string_lossy().into_owned();
        let data = tokio::fs::read(dir.join(&name))
            .await
            .map_err(|source| PluginError::ReadFile {
                file: file.clone(),
                source,
            })?;
        let fragment: Option<PluginItem> = serde_json::from_slice(&data)
            .map_err(|source| PluginError::Parse { file: file.clone(), source })?;

        match fragment {
            Some(fragment) => {
                debug!("Loaded plugin fragment {}", file);
                group_fragment(&mut groups, fragment);
            }
            None => debug!("Skipping empty plugin fragment {}", file),
        }
    }

    Ok(groups)
}

/// Add one fragment: its children first, then the fragment itself without
/// children. Items lacking `code` or `class` are skipped.
pub fn group_fragment(groups: &mut PluginGroups, mut fragment: PluginItem) {
    for child in std::mem::take(&mut fragment.plugin_list) {
        if child.is_classified() {
            groups.entry(child.class.clone()).or_default().push(child);
        }
    }
    if fragment.is_classified() {
        groups.entry(fragment.class.clone()).or_default().push(fragment);
    }
}
