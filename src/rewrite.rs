//! Reference rewriting.
//!
//! Stage 4 of the import pipeline. Two independent passes run over every
//! rendered entry.
//!
//! ## Cross-document links
//!
//! ```text
//! @JournalEntry[abc]{Intro}                 →  [[Intro]]
//! @JournalEntry\[abc\]{the intro}           →  [[Intro|the intro]]
//! @UUID[JournalEntry.abc]{Intro}            →  [[Intro]]
//! @UUID[JournalEntry.abc.JournalEntryPage.p1#hd]{North}  →  [[North]]
//! @JournalEntry[missing]{Gone}              →  unchanged
//! ```
//!
//! The escaped-bracket forms come from HTML conversion, which escapes literal
//! brackets; markdown pages keep the plain form. A `#fragment` on the id is
//! dropped before lookup. Ids that resolve to nothing stay as literal text and
//! are reported.
//!
//! ## Assets
//!
//! ```text
//! ![](worlds/w/assets/map%20v2.png)  →  ![[map v2.png]]   + copy to <destination>/<asset folder>/map v2.png
//! ![](<worlds/w/a \(1\).png> "Map")  →  ![[a (1).png]]
//! ![](https://example.com/a.png)     →  unchanged
//! ![](data:image/png;base64,...)     →  unchanged
//! ![](../../etc/passwd)              →  unchanged, logged
//! ```
//!
//! The link destination may be wrapped in `<...>`, carry a `"title"` and use
//! backslash escapes; all three are undone before percent-decoding. A path that
//! climbs out of the data root with `..` is never copied.
//!
//! Only the base filename survives. Assets with the same base name from
//! different directories land on the same destination; the last copy wins.

use crate::model::{Entry, IdentifierMap};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::{Component, Path, PathBuf};

static JOURNAL_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@JournalEntry\\?\[([^\]\\]*)\\?\]\{([^}]*)\}").expect("valid regex")
});
static UUID_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@UUID\\?\[JournalEntry\.([^\]\\]*)\\?\](?:\{([^}]*)\})?")
        .expect("valid regex")
});
static ASSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[\]\(((?:\\.|[^)\\\n])+)\)").expect("valid regex"));

/// A binary asset to copy into the asset folder.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRelocation {
    /// Absolute (or data-root relative) path of the source file.
    pub source: PathBuf,
    /// Vault-relative destination.
    pub destination: PathBuf,
    /// Title of the entry that referenced the asset.
    pub owner: String,
}

/// A reference whose target id is not in the export.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedReference {
    pub owner: String,
    /// The full original markup.
    pub reference: String,
}

/// Where assets come from and go to.
#[derive(Debug, Clone)]
pub struct AssetPaths {
    /// Directory asset paths in the export are relative to.
    pub data_root: PathBuf,
    /// Vault-relative asset folder.
    pub asset_dir: PathBuf,
}

/// Everything the rewrite pass discovered across all entries.
#[derive(Debug, Default)]
pub struct RewriteReport {
    pub relocations: Vec<AssetRelocation>,
    pub unresolved: Vec<UnresolvedReference>,
}

/// Wiki link to `filename`, labelled only when the label differs.
pub fn wiki_link(filename: &str, label: &str) -> String {
    if label.is_empty() || label == filename {
        format!("[[{filename}]]")
    } else {
        format!("[[{filename}|{label}]]")
    }
}

/// Drop markdown escapes (`\_`, `\*`, ...) the HTML converter put in a label.
fn unescape(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut chars = label.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(&next) = chars.peek()
            && next.is_ascii_punctuation()
        {
            continue;
        }
        out.push(c);
    }
    out
}

/// Rewrite `@JournalEntry` and `@UUID` references in one entry's markdown.
pub fn rewrite_links(
    markdown: &str,
    owner: &str,
    ids: &IdentifierMap,
    unresolved: &mut Vec<UnresolvedReference>,
) -> String {
    let mut replace = |caps: &Captures| -> String {
        let original = &caps[0];
        match ids.resolve(&caps[1]) {
            Some(filename) => {
                let label = caps.get(2).map(|m| unescape(m.as_str())).unwrap_or_default();
                wiki_link(filename, &label)
            }
            None => {
                tracing::warn!(entry = %owner, reference = %original, "unresolved reference");
                unresolved.push(UnresolvedReference {
                    owner: owner.to_string(),
                    reference: original.to_string(),
                });
                original.to_string()
            }
        }
    };
    let pass = JOURNAL_LINK_RE.replace_all(markdown, &mut replace).into_owned();
    UUID_LINK_RE.replace_all(&pass, &mut replace).into_owned()
}

/// Whether an asset path should stay as it is: inline data or an external URL.
fn is_external(path: &str) -> bool {
    path.starts_with("data:") || path.contains(':')
}

/// The destination of a markdown link, without `<...>`, title or escapes.
///
/// ```text
/// worlds/w/a%20b.png "Title"   →  worlds/w/a%20b.png
/// <worlds/w/a b.png>           →  worlds/w/a b.png
/// <worlds/w/a \(1\).png "T">   →  worlds/w/a (1).png
/// ```
fn link_destination(raw: &str) -> String {
    let raw = raw.trim();
    let dest = match raw.strip_prefix('<') {
        Some(inner) => {
            let inner = match inner.rfind('>') {
                Some(end) => &inner[..end],
                None => inner,
            };
            strip_title(inner)
        }
        None => raw.split_whitespace().next().unwrap_or_default(),
    };
    unescape(dest.trim())
}

/// Drop a trailing ` "title"` from a destination.
fn strip_title(dest: &str) -> &str {
    if dest.ends_with('"')
        && let Some(start) = dest.rfind(" \"")
        && start + 2 < dest.len()
    {
        return &dest[..start];
    }
    dest
}

/// Whether `path` would leave the directory it is joined to.
fn escapes_root(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
}

/// Rewrite `![](path)` embeds in one entry's markdown, queueing relocations.
pub fn rewrite_assets(
    markdown: &str,
    owner: &str,
    paths: &AssetPaths,
    relocations: &mut Vec<AssetRelocation>,
) -> String {
    ASSET_RE
        .replace_all(markdown, |caps: &Captures| {
            let original = &caps[0];
            let dest = link_destination(&caps[1]);
            if dest.is_empty() || is_external(&dest) {
                return original.to_string();
            }
            let decoded = match urlencoding::decode(&dest) {
                Ok(d) => d.into_owned(),
                Err(_) => dest.clone(),
            };
            let relative = Path::new(decoded.trim_start_matches('/'));
            if escapes_root(relative) {
                tracing::warn!(entry = %owner, asset = %decoded, "asset outside data root");
                return original.to_string();
            }
            let base = decoded
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or_default()
                .to_string();
            if base.is_empty() {
                return original.to_string();
            }
            relocations.push(AssetRelocation {
                source: paths.data_root.join(relative),
                destination: paths.asset_dir.join(&base),
                owner: owner.to_string(),
            });
            format!("![[{base}]]")
        })
        .into_owned()
}

/// Run both passes over every entry.
///
/// Only the rendered bodies are rewritten; frontmatter is added at write time.
pub fn rewrite_entries(
    entries: &mut [Entry],
    ids: &IdentifierMap,
    paths: &AssetPaths,
) -> RewriteReport {
    let mut report = RewriteReport::default();
    for entry in entries.iter_mut() {
        let linked = rewrite_links(&entry.markdown, &entry.title, ids, &mut report.unresolved);
        entry.markdown = rewrite_assets(&linked, &entry.title, paths, &mut report.relocations);
    }
    report
}

/// Asset folder for an import destination.
pub fn asset_dir(destination: &Path, asset_folder: &str) -> PathBuf {
    destination.join(asset_folder)
}
