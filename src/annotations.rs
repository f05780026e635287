//! Annotation data model and in-memory store
//!
//! Annotation geometry is always stored in document space (scale 1). That
//! single contract is what keeps marks stable across zoom changes: the view
//! layer projects into viewport space at display time and never writes
//! scaled coordinates back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::str::FromStr;

use crate::viewer::coords::DocRect;

/// An RGB color, serialized as `#RRGGBB`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Default highlighter yellow
    #[must_use]
    pub const fn yellow() -> Self {
        Self::new(0xFF, 0xEB, 0x3B)
    }

    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::yellow()
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 {
            return Err(format!("invalid color {s:?}: expected #RRGGBB"));
        }
        let parse = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|e| format!("invalid color {s:?}: {e}"))
        };
        Ok(Self {
            r: parse(0..2)?,
            g: parse(2..4)?,
            b: parse(4..6)?,
        })
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Kind of user mark, polymorphic over a shared spatial contract
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationKind {
    #[serde(rename = "region")]
    Region,
    #[serde(rename = "highlight")]
    Highlight,
    #[serde(rename = "note")]
    Note,
    #[serde(rename = "clip")]
    Clip,
    #[serde(rename = "text-highlight")]
    TextHighlight,
}

/// A persisted user mark
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Unique opaque id
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    /// Page number (1-based)
    pub page_number: u32,
    /// Rectangle in document-space coordinates, at scale 1
    pub position: DocRect,
    pub color: Rgb,
    /// Captured text, present for text highlights
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A mark the selection controller produced but the store has not yet
/// assigned an id and timestamp to
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationDraft {
    pub kind: AnnotationKind,
    pub page_number: u32,
    pub position: DocRect,
    pub color: Rgb,
    pub text_content: Option<String>,
}

/// Fields an explicit edit operation may change
#[derive(Clone, Debug, Default)]
pub struct AnnotationPatch {
    pub position: Option<DocRect>,
    pub color: Option<Rgb>,
    pub text_content: Option<String>,
}

/// In-memory collection of committed annotations for the open document.
///
/// Insertion order is preserved; page-scoped queries return it unchanged.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    items: Vec<Annotation>,
    next_seq: u64,
}

impl AnnotationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a draft, assigning it an id and creation timestamp
    pub fn add(&mut self, draft: AnnotationDraft) -> &Annotation {
        let annotation = Annotation {
            id: self.next_id(),
            kind: draft.kind,
            page_number: draft.page_number,
            position: draft.position,
            color: draft.color,
            text_content: draft.text_content,
            created_at: Utc::now(),
        };
        self.items.push(annotation);
        self.items.last().expect("just pushed")
    }

    /// Remove an annotation by id
    pub fn remove(&mut self, id: &str) -> Option<Annotation> {
        let idx = self.items.iter().position(|a| a.id == id)?;
        Some(self.items.remove(idx))
    }

    /// Apply an explicit edit; returns false for an unknown id
    pub fn update(&mut self, id: &str, patch: &AnnotationPatch) -> bool {
        let Some(annotation) = self.items.iter_mut().find(|a| a.id == id) else {
            return false;
        };

        if let Some(position) = patch.position {
            annotation.position = position;
        }
        if let Some(color) = patch.color {
            annotation.color = color;
        }
        if let Some(text) = &patch.text_content {
            annotation.text_content = Some(text.clone());
        }
        true
    }

    /// Annotations on the given page, in insertion order
    pub fn by_page(&self, page: u32) -> impl Iterator<Item = &Annotation> {
        self.items.iter().filter(move |a| a.page_number == page)
    }

    /// Replace the whole set from a persisted snapshot.
    ///
    /// De-duplicates by id (first occurrence wins) and synthesizes ids for
    /// entries the external source delivered without one.
    pub fn replace_all(&mut self, annotations: Vec<Annotation>) {
        let mut seen = HashSet::new();
        self.items.clear();

        for mut annotation in annotations {
            if annotation.id.is_empty() {
                annotation.id = self.next_id();
            }
            if seen.insert(annotation.id.clone()) {
                self.items.push(annotation);
            }
        }
    }

    /// Remove every annotation
    pub fn clear_all(&mut self) {
        self.items.clear();
    }

    /// The full set, in insertion order
    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn next_id(&mut self) -> String {
        self.next_seq += 1;
        format!("{}-{}", Utc::now().timestamp_millis(), self.next_seq)
    }
}
