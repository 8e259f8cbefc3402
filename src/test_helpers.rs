//! Shared test utilities for the foundry-import test suite.
//!
//! Provides fixture setup, lookup helpers and bulk extractors that work with
//! the planning data structures (`DocumentModel`, `Entry`, `FolderTree`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let sources = write_sources(tmp.path(), FOLDERS, JOURNAL);
//! let plan = plan(&config, &sources, &StubRenderer).unwrap();
//!
//! let intro = find_entry(&plan.model, "Intro");
//! assert_eq!(intro.title, "Intro");
//! assert_eq!(entry_filenames(&plan.model), vec!["Intro", "Atlas"]);
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::hierarchy::{FolderNode, FolderTree};
use crate::import::ImportSources;
use crate::model::{DocumentModel, Entry};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/world/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/world");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Write both NDJSON exports into `dir` and return their paths.
pub fn write_sources(dir: &Path, folders: &str, journal: &str) -> ImportSources {
    let sources = ImportSources {
        folders: dir.join("folders.db"),
        journal: dir.join("journal.db"),
    };
    fs::write(&sources.folders, folders).unwrap();
    fs::write(&sources.journal, journal).unwrap();
    sources
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// Find an entry by output filename. Panics if not found.
pub fn find_entry<'a>(model: &'a DocumentModel, filename: &str) -> &'a Entry {
    model
        .entries
        .iter()
        .find(|e| e.filename == filename)
        .unwrap_or_else(|| {
            panic!(
                "entry '{filename}' not found. Available: {:?}",
                entry_filenames(model)
            )
        })
}

/// Find a folder by display name. Panics if not found.
pub fn find_folder<'a>(tree: &'a FolderTree, name: &str) -> &'a FolderNode {
    tree.folders()
        .iter()
        .find(|f| f.display_name == name)
        .unwrap_or_else(|| {
            let names: Vec<&str> = tree
                .folders()
                .iter()
                .map(|f| f.display_name.as_str())
                .collect();
            panic!("folder '{name}' not found. Available: {names:?}")
        })
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// All entry filenames in build order.
pub fn entry_filenames(model: &DocumentModel) -> Vec<&str> {
    model.entries.iter().map(|e| e.filename.as_str()).collect()
}

/// All entry titles in build order.
pub fn entry_titles(model: &DocumentModel) -> Vec<&str> {
    model.entries.iter().map(|e| e.title.as_str()).collect()
}

/// Every folder's full path, `/`-separated, in tree order.
pub fn folder_paths(tree: &FolderTree) -> Vec<String> {
    tree.folders()
        .iter()
        .map(|f| f.full_path.to_string_lossy().replace('\\', "/"))
        .collect()
}
