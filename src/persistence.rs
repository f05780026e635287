//! Annotation persistence collaborators
//!
//! Saves always transmit the complete annotation set for a document, never
//! a delta: re-sending after a failed save is always safe, which is what
//! lets the session stay optimistic about local state.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::annotations::Annotation;

/// External store for a document's annotation set
pub trait AnnotationBackend {
    /// Persist the full annotation set for a document
    fn save(&mut self, document_id: &str, user_id: &str, annotations: &[Annotation])
    -> Result<()>;

    /// Load the persisted set; an absent document yields an empty set
    fn load(&mut self, document_id: &str) -> Result<Vec<Annotation>>;
}

/// Snapshot shape written to disk, one per document
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    document_id: String,
    user_id: String,
    annotations: Vec<Annotation>,
}

/// File-backed store: one pretty-printed JSON snapshot per document
pub struct JsonFileBackend {
    root: PathBuf,
}

impl JsonFileBackend {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn snapshot_path(&self, document_id: &str) -> PathBuf {
        // Document ids are opaque; keep only filename-safe characters.
        let safe: String = document_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{safe}.json"))
    }
}

impl AnnotationBackend for JsonFileBackend {
    fn save(
        &mut self,
        document_id: &str,
        user_id: &str,
        annotations: &[Annotation],
    ) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("creating annotation dir {}", self.root.display()))?;

        let snapshot = Snapshot {
            document_id: document_id.to_string(),
            user_id: user_id.to_string(),
            annotations: annotations.to_vec(),
        };
        let content = serde_json::to_string_pretty(&snapshot)?;
        let path = self.snapshot_path(document_id);
        fs::write(&path, content)
            .with_context(|| format!("writing annotations to {}", path.display()))?;
        Ok(())
    }

    fn load(&mut self, document_id: &str) -> Result<Vec<Annotation>> {
        let path = self.snapshot_path(document_id);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading annotations from {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&content)
            .with_context(|| format!("parsing annotations in {}", path.display()))?;
        Ok(snapshot.annotations)
    }
}

/// In-memory backend, used by tests and as a null collaborator.
///
/// `fail_next_save` scripts a single save failure to exercise the
/// optimistic-local-state policy.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    documents: HashMap<String, Vec<Annotation>>,
    pub fail_next_save: bool,
    pub save_count: usize,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last saved set for a document
    #[must_use]
    pub fn saved(&self, document_id: &str) -> Option<&[Annotation]> {
        self.documents.get(document_id).map(Vec::as_slice)
    }
}

impl AnnotationBackend for MemoryBackend {
    fn save(
        &mut self,
        document_id: &str,
        user_id: &str,
        annotations: &[Annotation],
    ) -> Result<()> {
        let _ = user_id;
        self.save_count += 1;
        if self.fail_next_save {
            self.fail_next_save = false;
            anyhow::bail!("simulated network error");
        }
        self.documents
            .insert(document_id.to_string(), annotations.to_vec());
        Ok(())
    }

    fn load(&mut self, document_id: &str) -> Result<Vec<Annotation>> {
        Ok(self.documents.get(document_id).cloned().unwrap_or_default())
    }
}
