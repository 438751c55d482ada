use crate::model::{Person, PersonId};
use crate::snapshot::Snapshot;
use crate::tree::FamilyTree;
use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};

pub const DEFAULT_FILE: &str = "familytree.json";

/// JSON file persistence for a [`FamilyTree`] snapshot.
#[derive(Debug, Clone)]
pub struct TreeStore {
    path: PathBuf,
}

impl TreeStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<FamilyTree> {
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let snapshot = Snapshot::from_json(&contents)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        let tree = FamilyTree::from_snapshot(snapshot)
            .with_context(|| format!("invalid family tree in {}", self.path.display()))?;
        tracing::info!(path = %self.path.display(), people = tree.len(), "loaded family tree");
        Ok(tree)
    }

    /// Loads the stored tree, or starts a new one holding a single root
    /// person when no file exists yet.
    pub fn load_or_create_root(&self) -> Result<FamilyTree> {
        if self.exists() {
            return self.load();
        }
        let mut tree = FamilyTree::new();
        tree.add_person(default_root());
        tracing::info!(path = %self.path.display(), "created new family tree");
        Ok(tree)
    }

    /// Writes the snapshot next to the target and renames it into place.
    pub fn save(&self, tree: &FamilyTree) -> Result<()> {
        let json = tree.export_snapshot().to_json_pretty()?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        tracing::info!(path = %self.path.display(), people = tree.len(), "saved family tree");
        Ok(())
    }
}

fn default_root() -> Person {
    Person::new(PersonId::generate(), "Root", "", Local::now().date_naive())
}
