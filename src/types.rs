//! Identifier types shared across all pipeline stages.
//!
//! Source records reference each other by opaque string ids. Folders and
//! documents share one namespace in the export, but they play different roles
//! in the output tree, so each gets its own newtype. Pages never have a
//! standalone identity: a page is always addressed through the document that
//! owns it, which is what [`EntryId::Page`] models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator Foundry uses between a document id and a page id inside a UUID
/// (`JournalEntry.<doc>.JournalEntryPage.<page>`).
pub const PAGE_SEPARATOR: &str = ".JournalEntryPage.";

/// Id of a folder record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(String);

impl FolderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Id of a document (journal entry) record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of one output entry.
///
/// Kept as a pair internally; it only becomes a string when written to
/// frontmatter (see [`EntryId::import_id`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryId {
    /// A whole document: single-file documents and the TOC of multi-page ones.
    Document(DocumentId),
    /// One page of a document.
    Page { document: DocumentId, page: String },
}

impl EntryId {
    pub fn document(id: impl Into<String>) -> Self {
        Self::Document(DocumentId::new(id))
    }

    pub fn page(document: impl Into<String>, page: impl Into<String>) -> Self {
        Self::Page {
            document: DocumentId::new(document),
            page: page.into(),
        }
    }

    /// Parse the id part of a reference (`<doc>` or `<doc>.JournalEntryPage.<page>`).
    ///
    /// A trailing `#fragment` is stripped first. Returns `None` for an empty id.
    pub fn parse_reference(raw: &str) -> Option<Self> {
        let base = raw.split('#').next().unwrap_or_default().trim();
        if base.is_empty() {
            return None;
        }
        match base.split_once(PAGE_SEPARATOR) {
            Some((doc, page)) if !doc.is_empty() && !page.is_empty() => {
                Some(Self::page(doc, page))
            }
            _ => Some(Self::document(base)),
        }
    }

    /// The document this entry belongs to.
    pub fn document_id(&self) -> &DocumentId {
        match self {
            Self::Document(id) => id,
            Self::Page { document, .. } => document,
        }
    }

    /// Stable id written to frontmatter, in Foundry's UUID form.
    pub fn import_id(&self) -> String {
        match self {
            Self::Document(id) => format!("JournalEntry.{id}"),
            Self::Page { document, page } => {
                format!("JournalEntry.{document}{PAGE_SEPARATOR}{page}")
            }
        }
    }
}

/// Where an entry or a folder lives in the output tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParentRef {
    /// Directly under the import destination.
    Root,
    /// Inside a folder from the folder export.
    Folder(FolderId),
    /// Inside the virtual folder of a multi-page document.
    Document(DocumentId),
}

impl ParentRef {
    /// Parent for an optional folder id; empty ids count as missing.
    pub fn from_folder(folder: Option<&str>) -> Self {
        match folder {
            Some(id) if !id.is_empty() => Self::Folder(FolderId::new(id)),
            _ => Self::Root,
        }
    }
}
