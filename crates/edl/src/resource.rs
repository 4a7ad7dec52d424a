//! Source media resources and the resource table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// An immutable reference to a source media file.
///
/// Resources are owned by the [`ResourceTable`] and never mutated after
/// the EDL is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource identifier referenced by clips.
    pub id: String,

    /// Filesystem path to the source media file.
    pub path: PathBuf,

    /// Nominal total duration of the source in seconds.
    pub duration_secs: f64,
}

/// Lookup table of resources keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    by_id: HashMap<String, Resource>,
}

impl ResourceTable {
    pub fn new(resources: impl IntoIterator<Item = Resource>) -> Self {
        Self {
            by_id: resources
                .into_iter()
                .map(|r| (r.id.clone(), r))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.by_id.get(id)
    }

    /// Resolve a resource's path relative to the EDL file's directory
    /// when the stored path is not absolute.
    pub fn resolve_path(&self, id: &str, base_dir: &Path) -> Option<PathBuf> {
        let resource = self.get(id)?;
        if resource.path.is_absolute() {
            Some(resource.path.clone())
        } else {
            Some(base_dir.join(&resource.path))
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
