//! Folder hierarchy resolution.
//!
//! Stage 2 of the import pipeline. Folder records only point at their parent,
//! and documents only point at a folder id, so every folder's full output path
//! is computed up front by walking parent links toward the root:
//!
//! ```text
//! f1 "Lore"    parent: null   →  FoundryImport/Lore
//! f2 "Places"  parent: f1     →  FoundryImport/Lore/Places
//! f3 "Towns"   parent: f2     →  FoundryImport/Lore/Places/Towns
//! f4 "Lost"    parent: gone   →  FoundryImport/Lost
//! ```
//!
//! A parent id that matches no folder ends the walk there. A parent chain that
//! loops back on itself places the folder at the root and logs a warning, so a
//! damaged export can never hang the import.
//!
//! Multi-page documents become virtual folders: their pages live in a
//! directory named after the document, inside the document's own folder.

use crate::naming::{display_name, sanitize_filename};
use crate::records::FolderRecord;
use crate::types::{DocumentId, FolderId, ParentRef};
use crate::vault::{Vault, VaultError, ensure_folder, replace_file};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// A resolved folder.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderNode {
    pub id: FolderId,
    pub display_name: String,
    pub sanitized_name: String,
    pub parent: Option<FolderId>,
    /// Path relative to the vault root, including the import destination.
    pub full_path: PathBuf,
}

/// All folder paths of one import: real folders and virtual ones.
#[derive(Debug, Clone)]
pub struct FolderTree {
    root: PathBuf,
    /// Folders in export order.
    folders: Vec<FolderNode>,
    index: HashMap<FolderId, usize>,
    virtual_folders: Vec<(DocumentId, PathBuf)>,
}

impl FolderTree {
    /// Import destination every path starts from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, id: &FolderId) -> Option<&FolderNode> {
        self.index.get(id).map(|&i| &self.folders[i])
    }

    pub fn folders(&self) -> &[FolderNode] {
        &self.folders
    }

    pub fn virtual_folders(&self) -> &[(DocumentId, PathBuf)] {
        &self.virtual_folders
    }

    /// Directory for an entry or folder with the given parent.
    ///
    /// Unknown folder ids fall back to the import root.
    pub fn path_of(&self, parent: &ParentRef) -> PathBuf {
        match parent {
            ParentRef::Root => self.root.clone(),
            ParentRef::Folder(id) => self
                .get(id)
                .map(|f| f.full_path.clone())
                .unwrap_or_else(|| self.root.clone()),
            ParentRef::Document(id) => self
                .virtual_folders
                .iter()
                .find(|(doc, _)| doc == id)
                .map(|(_, path)| path.clone())
                .unwrap_or_else(|| self.root.clone()),
        }
    }

    /// Register the virtual folder of a multi-page document and return its path.
    pub fn add_virtual_folder(
        &mut self,
        document: DocumentId,
        parent: &ParentRef,
        sanitized_name: &str,
    ) -> PathBuf {
        let path = self.path_of(parent).join(sanitized_name);
        self.virtual_folders.push((document, path.clone()));
        path
    }
}

/// Keep folders of the given category. Records without a category are kept.
pub fn filter_category(folders: Vec<FolderRecord>, category: &str) -> Vec<FolderRecord> {
    folders
        .into_iter()
        .filter(|f| f.category.as_deref().is_none_or(|c| c == category))
        .collect()
}

/// Compute the full path of every folder under `root`.
pub fn resolve_folders(records: &[FolderRecord], root: &Path) -> FolderTree {
    let by_id: HashMap<&FolderId, &FolderRecord> = records.iter().map(|r| (&r.id, r)).collect();

    let folders: Vec<FolderNode> = records
        .iter()
        .map(|record| {
            let display = display_name(record.name.as_deref(), record.id.as_str());
            let sanitized = sanitize_filename(&display);
            let full_path = match ancestor_names(record, &by_id) {
                Some(names) => names.iter().rev().fold(root.to_path_buf(), |p, n| p.join(n)),
                None => {
                    tracing::warn!(
                        folder = %record.id,
                        "folder parent chain loops; placing at root"
                    );
                    root.join(&sanitized)
                }
            };
            FolderNode {
                id: record.id.clone(),
                display_name: display,
                sanitized_name: sanitized,
                parent: record
                    .parent
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .map(FolderId::new),
                full_path,
            }
        })
        .collect();

    let index = folders
        .iter()
        .enumerate()
        .map(|(i, f)| (f.id.clone(), i))
        .collect();

    FolderTree {
        root: root.to_path_buf(),
        folders,
        index,
        virtual_folders: Vec::new(),
    }
}

/// Sanitized names from `record` up to its top-most resolvable ancestor.
///
/// Returns `None` if the chain revisits a folder.
fn ancestor_names(
    record: &FolderRecord,
    by_id: &HashMap<&FolderId, &FolderRecord>,
) -> Option<Vec<String>> {
    let mut names = Vec::new();
    let mut visited: HashSet<&FolderId> = HashSet::new();
    let mut current = record;
    loop {
        if !visited.insert(&current.id) {
            return None;
        }
        names.push(sanitize_filename(&display_name(
            current.name.as_deref(),
            current.id.as_str(),
        )));
        let parent = match current.parent.as_deref() {
            Some(p) if !p.is_empty() => FolderId::new(p),
            _ => break,
        };
        match by_id.get(&parent) {
            Some(next) => current = next,
            None => {
                tracing::debug!(
                    folder = %current.id,
                    parent = %parent,
                    "parent folder not in export"
                );
                break;
            }
        }
    }
    Some(names)
}

/// Markdown of a folder note: frontmatter plus a heading with the folder name.
pub fn folder_note(folder: &FolderNode) -> String {
    let title = crate::model::quote(&folder.display_name);
    format!(
        "---\ntitle: {title}\naliases:\n  - {title}\nimport-id: {}\n---\n\n# {}\n",
        crate::model::quote(&format!("Folder.{}", folder.id)),
        folder.display_name
    )
}

/// Path of a folder's note: inside the folder, named after it.
pub fn folder_note_path(folder: &FolderNode) -> PathBuf {
    folder
        .full_path
        .join(format!("{}.md", folder.sanitized_name))
}

/// Outcome of creating one folder or folder note.
#[derive(Debug)]
pub struct FolderOutcome {
    pub path: PathBuf,
    /// Whether `path` is a folder note rather than a folder.
    pub note: bool,
    pub result: Result<(), VaultError>,
}

/// Create every folder path in the tree, then the folder notes if requested.
///
/// Folders are created shallowest first so each parent exists before its
/// children. A note is only written for a folder whose creation succeeded.
pub fn create_folders(
    vault: &impl Vault,
    tree: &FolderTree,
    folder_notes: bool,
) -> Vec<FolderOutcome> {
    let mut paths: Vec<&Path> = tree
        .folders
        .iter()
        .map(|f| f.full_path.as_path())
        .chain(tree.virtual_folders.iter().map(|(_, p)| p.as_path()))
        .collect();
    paths.sort_by_key(|p| p.components().count());
    let mut seen = HashSet::new();
    paths.retain(|p| seen.insert(*p));

    let mut outcomes = Vec::with_capacity(paths.len());
    let mut created: HashSet<&Path> = HashSet::new();
    for path in paths {
        let result = ensure_folder(vault, path);
        match &result {
            Ok(()) => {
                created.insert(path);
                tracing::debug!(path = %path.display(), "folder ready");
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to create folder"),
        }
        outcomes.push(FolderOutcome {
            path: path.to_path_buf(),
            note: false,
            result,
        });
    }

    if folder_notes {
        for folder in &tree.folders {
            if !created.contains(folder.full_path.as_path()) {
                continue;
            }
            let note_path = folder_note_path(folder);
            let result = replace_file(vault, &note_path, &folder_note(folder));
            if let Err(e) = &result {
                tracing::warn!(
                    folder = %folder.display_name,
                    error = %e,
                    "failed to write folder note"
                );
            }
            outcomes.push(FolderOutcome {
                path: note_path,
                note: true,
                result,
            });
        }
    }

    outcomes
}
