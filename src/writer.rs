//! Writing entries into the vault.
//!
//! Stage 6 of the import pipeline. Each entry becomes
//! `<folder path>/<filename>.md`, where the folder path comes from the
//! resolved [`FolderTree`]. Whatever is at that path is deleted first, so
//! re-running an import replaces files instead of merging into them.
//!
//! Entries are written in build order, one at a time. A failed write is
//! reported against that entry and the next one proceeds; files already
//! written stay in place.

use crate::hierarchy::FolderTree;
use crate::model::{Entry, note_text};
use crate::vault::{Vault, VaultError, replace_file};
use std::path::PathBuf;

/// Result of writing one entry.
#[derive(Debug)]
pub struct WriteOutcome<'a> {
    pub entry: &'a Entry,
    pub path: PathBuf,
    pub result: Result<(), VaultError>,
}

/// Vault-relative output path of an entry.
pub fn entry_path(tree: &FolderTree, entry: &Entry) -> PathBuf {
    tree.path_of(&entry.parent).join(format!("{}.md", entry.filename))
}

/// Write one entry, replacing any existing file.
pub fn write_entry<'a>(
    vault: &impl Vault,
    tree: &FolderTree,
    entry: &'a Entry,
) -> WriteOutcome<'a> {
    let path = entry_path(tree, entry);
    let result = replace_file(vault, &path, &note_text(entry));
    match &result {
        Ok(()) => {
            tracing::debug!(entry = %entry.title, path = %path.display(), "note written")
        }
        Err(e) => tracing::warn!(entry = %entry.title, error = %e, "failed to write note"),
    }
    WriteOutcome { entry, path, result }
}
