//! Reading the NDJSON export.
//!
//! Stage 1 of the import pipeline. A Foundry world export is two line-delimited
//! JSON files: one for folders, one for journal entries. Each non-empty line is
//! one record.
//!
//! ## Tombstones
//!
//! Deleted records stay in the export with a `$$deleted` flag. Any truthy
//! value drops the line before it is decoded into a typed record.
//!
//! ## Failure policy
//!
//! Reading is all-or-nothing. An unreadable file, an empty file, or a single
//! line that is not valid JSON fails the whole read: a corrupt line could shift
//! every id after it, and every later stage depends on id integrity.
//!
//! ## Record shapes
//!
//! ```text
//! folder:   {"_id": "f1", "name": "Lore", "parent": null, "type": "JournalEntry"}
//! document: {"_id": "d1", "name": "Intro", "folder": "f1", "content": "<p>Hi</p>"}
//! document: {"_id": "d2", "name": "Atlas", "pages": [
//!             {"_id": "p1", "name": "North", "type": "text",
//!              "text": {"format": 1, "content": "<p>Cold</p>"}},
//!             {"_id": "p2", "name": "Map", "type": "image", "src": "worlds/w/map.webp"}]}
//! ```
//!
//! Both `_id` and `id` are accepted; folder parents may be given as `parent`
//! or `folder`. Page text format accepts Foundry's numeric codes (`1` = HTML,
//! `2` = Markdown) as well as the names `"html"` and `"markdown"`.

use crate::types::{DocumentId, FolderId};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Key carrying the deletion marker.
const TOMBSTONE_KEY: &str = "$$deleted";

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("source file is empty: {0}")]
    Empty(PathBuf),
    #[error("malformed record on line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },
}

/// One decoded, non-deleted line of an export.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    /// 1-based line number in the source file.
    pub line: usize,
    pub value: Value,
}

/// A folder from the folder export.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "FolderFields")]
pub struct FolderRecord {
    pub id: FolderId,
    pub name: Option<String>,
    pub parent: Option<String>,
    /// Document category this folder holds (`JournalEntry`, `Actor`, ...).
    pub category: Option<String>,
}

/// Wire shape of a folder. Older exports name the parent `folder`, some carry
/// both keys; `parent` wins unless it is null.
#[derive(Deserialize)]
struct FolderFields {
    #[serde(rename = "_id", alias = "id")]
    id: FolderId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    folder: Option<String>,
    #[serde(default, rename = "type")]
    category: Option<String>,
}

impl From<FolderFields> for FolderRecord {
    fn from(fields: FolderFields) -> Self {
        Self {
            id: fields.id,
            name: fields.name,
            parent: fields.parent.or(fields.folder),
            category: fields.category,
        }
    }
}

/// A journal entry from the document export.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: DocumentId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
    /// Single-body content of documents without pages.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub format: Option<TextFormat>,
    #[serde(default)]
    pub pages: Vec<PageRecord>,
}

/// Markup of a text body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    #[default]
    Html,
    Markdown,
}

impl<'de> Deserialize<'de> for TextFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u64),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Code(1) => Ok(Self::Html),
            Raw::Code(2) => Ok(Self::Markdown),
            Raw::Name(name) if name.eq_ignore_ascii_case("html") => Ok(Self::Html),
            Raw::Name(name)
                if name.eq_ignore_ascii_case("markdown") || name.eq_ignore_ascii_case("md") =>
            {
                Ok(Self::Markdown)
            }
            Raw::Code(code) => Err(D::Error::custom(format!("unknown text format code {code}"))),
            Raw::Name(name) => Err(D::Error::custom(format!("unknown text format {name:?}"))),
        }
    }
}

/// One page of a multi-page journal entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawPage")]
pub struct PageRecord {
    pub id: String,
    pub name: Option<String>,
    /// Foundry's manual ordering key; pages without one keep export order.
    pub sort: i64,
    pub content: PageContent,
}

/// Payload of a page, by page type.
#[derive(Debug, Clone, PartialEq)]
pub enum PageContent {
    Text { format: TextFormat, body: String },
    Image { src: Option<String> },
    Pdf { src: Option<String> },
    Video { src: Option<String> },
    /// A page type this importer does not know how to convert.
    Unsupported(String),
}

#[derive(Deserialize)]
struct RawPage {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    sort: Option<i64>,
    #[serde(default)]
    text: Option<RawText>,
    #[serde(default)]
    src: Option<String>,
}

#[derive(Deserialize, Default)]
struct RawText {
    #[serde(default)]
    format: Option<TextFormat>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    markdown: Option<String>,
}

impl From<RawPage> for PageRecord {
    fn from(raw: RawPage) -> Self {
        let content = match raw.kind.as_deref().unwrap_or("text") {
            "text" => {
                let text = raw.text.unwrap_or_default();
                let format = text.format.unwrap_or_default();
                let body = match format {
                    TextFormat::Markdown => text.markdown.or(text.content),
                    TextFormat::Html => text.content,
                };
                PageContent::Text {
                    format,
                    body: body.unwrap_or_default(),
                }
            }
            "image" => PageContent::Image { src: raw.src },
            "pdf" => PageContent::Pdf { src: raw.src },
            "video" => PageContent::Video { src: raw.src },
            other => PageContent::Unsupported(other.to_string()),
        };
        Self {
            id: raw.id,
            name: raw.name,
            sort: raw.sort.unwrap_or(0),
            content,
        }
    }
}

/// JavaScript truthiness, which is what the exporter's tombstone check uses.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn is_tombstone(value: &Value) -> bool {
    value.get(TOMBSTONE_KEY).is_some_and(is_truthy)
}

/// Decode NDJSON text into records, in input order, dropping tombstones.
pub fn read_records(text: &str) -> Result<Vec<SourceRecord>, ReadError> {
    let mut records = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|source| ReadError::Json {
            line: idx + 1,
            source,
        })?;
        // Only lines mentioning the key can be tombstones.
        if line.contains(TOMBSTONE_KEY) && is_tombstone(&value) {
            tracing::debug!(line = idx + 1, "skipping deleted record");
            continue;
        }
        records.push(SourceRecord {
            line: idx + 1,
            value,
        });
    }
    Ok(records)
}

/// Convert generic records into a typed record set.
pub fn decode<T: DeserializeOwned>(records: Vec<SourceRecord>) -> Result<Vec<T>, ReadError> {
    records
        .into_iter()
        .map(|r| {
            serde_json::from_value(r.value).map_err(|source| ReadError::Json {
                line: r.line,
                source,
            })
        })
        .collect()
}

/// Read a whole source file. Empty (or whitespace-only) files are an error.
pub fn read_source(path: &Path) -> Result<String, ReadError> {
    let text = fs::read_to_string(path).map_err(|source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if text.trim().is_empty() {
        return Err(ReadError::Empty(path.to_path_buf()));
    }
    Ok(text)
}

/// Read and decode the folder export.
pub fn load_folders(path: &Path) -> Result<Vec<FolderRecord>, ReadError> {
    decode(read_records(&read_source(path)?)?)
}

/// Read and decode the journal entry export.
pub fn load_documents(path: &Path) -> Result<Vec<DocumentRecord>, ReadError> {
    decode(read_records(&read_source(path)?)?)
}
