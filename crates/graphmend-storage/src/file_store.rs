//! Directory-of-JSON-files graph store.

use crate::{GraphStore, StoreError};
use graphmend_model::Graph;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One pretty-printed JSON file per named graph under a root directory.
///
/// Graph ids are restricted to a safe filename charset; anything else is
/// rejected before touching the filesystem.
pub struct FileGraphStore {
    root: PathBuf,
}

impl FileGraphStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        if id.is_empty()
            || !id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            || id.starts_with('.')
        {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(format!("{id}.json")))
    }
}

impl GraphStore for FileGraphStore {
    fn load_graph(&self, id: &str) -> Result<Graph, StoreError> {
        let path = self.path_for(id)?;
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
            id: id.to_string(),
            reason: e.to_string(),
        })
    }

    fn save_graph(&self, id: &str, graph: &Graph) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        let contents = serde_json::to_string_pretty(graph).map_err(|e| StoreError::Corrupt {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        // Write through a temp file so a crash mid-write never leaves a
        // truncated graph behind.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &path)?;
        debug!(graph_id = %id, nodes = graph.nodes.len(), edges = graph.edges.len(), "saved graph");
        Ok(())
    }

    fn delete_graph(&self, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn list_graphs(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(id) = name.strip_suffix(".json") {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
