//! Asset relocation.
//!
//! Stage 5 of the import pipeline. Copies every binary file referenced by an
//! entry into the asset folder. Each relocation is independent: a source that
//! cannot be read is reported with the entry that referenced it and skipped.
//!
//! The asset folder is created once, and only if there is something to copy.
//! Destinations are replaced by delete-then-create since the vault never
//! overwrites in place. A source copied earlier in the same run to the same
//! destination is not copied again.

use crate::rewrite::AssetRelocation;
use crate::vault::{Vault, VaultError, ensure_folder, replace_binary_file};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Vault(#[from] VaultError),
}

/// Result of one relocation.
#[derive(Debug)]
pub enum AssetOutcome<'a> {
    Copied(&'a AssetRelocation),
    /// Same source and destination as an earlier relocation in this run.
    Duplicate(&'a AssetRelocation),
    Failed(&'a AssetRelocation, AssetError),
}

/// Copy all queued assets into `asset_dir`, one at a time.
pub fn relocate_assets<'a>(
    vault: &impl Vault,
    asset_dir: &Path,
    relocations: &'a [AssetRelocation],
) -> Vec<AssetOutcome<'a>> {
    if relocations.is_empty() {
        return Vec::new();
    }
    if let Err(e) = ensure_folder(vault, asset_dir) {
        tracing::warn!(path = %asset_dir.display(), error = %e, "failed to create asset folder");
    }

    let mut done: HashSet<(&Path, &Path)> = HashSet::new();
    relocations
        .iter()
        .map(|relocation| {
            let key = (relocation.source.as_path(), relocation.destination.as_path());
            if done.contains(&key) {
                return AssetOutcome::Duplicate(relocation);
            }
            match copy_asset(vault, relocation) {
                Ok(()) => {
                    done.insert(key);
                    tracing::debug!(
                        entry = %relocation.owner,
                        destination = %relocation.destination.display(),
                        "asset copied"
                    );
                    AssetOutcome::Copied(relocation)
                }
                Err(e) => {
                    tracing::warn!(
                        entry = %relocation.owner,
                        source = %relocation.source.display(),
                        error = %e,
                        "asset not copied"
                    );
                    AssetOutcome::Failed(relocation, e)
                }
            }
        })
        .collect()
}

fn copy_asset(vault: &impl Vault, relocation: &AssetRelocation) -> Result<(), AssetError> {
    let bytes = fs::read(&relocation.source).map_err(|source| AssetError::Read {
        path: relocation.source.clone(),
        source,
    })?;
    replace_binary_file(vault, &relocation.destination, &bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::tests::{MemoryVault, RecordedOp};
    use tempfile::TempDir;

    fn relocation(source: &Path, dest: &str, owner: &str) -> AssetRelocation {
        AssetRelocation {
            source: source.to_path_buf(),
            destination: PathBuf::from(dest),
            owner: owner.to_string(),
        }
    }

    #[test]
    fn nothing_queued_touches_nothing() {
        let vault = MemoryVault::new();
        let outcomes = relocate_assets(&vault, Path::new("Import/assets"), &[]);
        assert!(outcomes.is_empty());
        assert!(vault.get_operations().is_empty());
    }

    #[test]
    fn copies_source_bytes() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("img.png");
        fs::write(&src, [1u8, 2, 3]).unwrap();

        let vault = MemoryVault::new();
        let queued = vec![relocation(&src, "Import/assets/img.png", "Intro")];
        let outcomes = relocate_assets(&vault, Path::new("Import/assets"), &queued);

        assert!(matches!(outcomes[0], AssetOutcome::Copied(_)));
        assert_eq!(
            vault.files.lock().unwrap()[Path::new("Import/assets/img.png")],
            vec![1, 2, 3]
        );
        assert_eq!(
            vault.get_operations()[0],
            RecordedOp::CreateFolder("Import/assets".into())
        );
    }

    #[test]
    fn missing_source_is_skipped_with_owner() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("good.png");
        fs::write(&good, b"ok").unwrap();

        let vault = MemoryVault::new();
        let queued = vec![
            relocation(&tmp.path().join("missing.png"), "Import/assets/missing.png", "Broken Page"),
            relocation(&good, "Import/assets/good.png", "Fine Page"),
        ];
        let outcomes = relocate_assets(&vault, Path::new("Import/assets"), &queued);

        match &outcomes[0] {
            AssetOutcome::Failed(r, AssetError::Read { .. }) => assert_eq!(r.owner, "Broken Page"),
            other => panic!("expected read failure, got {other:?}"),
        }
        assert!(matches!(outcomes[1], AssetOutcome::Copied(_)));
        assert_eq!(vault.file_paths(), vec!["Import/assets/good.png"]);
    }

    #[test]
    fn existing_destination_is_replaced() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("img.png");
        fs::write(&src, b"new").unwrap();

        let vault = MemoryVault::new();
        replace_binary_file(&vault, Path::new("Import/assets/img.png"), b"old").unwrap();
        relocate_assets(
            &vault,
            Path::new("Import/assets"),
            &[relocation(&src, "Import/assets/img.png", "Intro")],
        );
        assert_eq!(vault.text("Import/assets/img.png"), "new");
    }

    #[test]
    fn same_base_name_last_wins() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("a/img.png");
        let second = tmp.path().join("b/img.png");
        fs::create_dir_all(first.parent().unwrap()).unwrap();
        fs::create_dir_all(second.parent().unwrap()).unwrap();
        fs::write(&first, b"first").unwrap();
        fs::write(&second, b"second").unwrap();

        let vault = MemoryVault::new();
        let queued = vec![
            relocation(&first, "Import/assets/img.png", "One"),
            relocation(&second, "Import/assets/img.png", "Two"),
        ];
        relocate_assets(&vault, Path::new("Import/assets"), &queued);
        assert_eq!(vault.text("Import/assets/img.png"), "second");
    }

    #[test]
    fn repeated_reference_copies_once() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("img.png");
        fs::write(&src, b"x").unwrap();

        let vault = MemoryVault::new();
        let queued = vec![
            relocation(&src, "Import/assets/img.png", "One"),
            relocation(&src, "Import/assets/img.png", "Two"),
        ];
        let outcomes = relocate_assets(&vault, Path::new("Import/assets"), &queued);
        assert!(matches!(outcomes[1], AssetOutcome::Duplicate(_)));
        let creates = vault
            .get_operations()
            .iter()
            .filter(|op| matches!(op, RecordedOp::CreateBinary(_)))
            .count();
        assert_eq!(creates, 1);
    }

    #[test]
    fn write_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("img.png");
        fs::write(&src, b"x").unwrap();

        let vault = MemoryVault::new();
        vault.fail_on("Import/assets/img.png");
        let queued = vec![relocation(&src, "Import/assets/img.png", "Intro")];
        let outcomes = relocate_assets(&vault, Path::new("Import/assets"), &queued);
        assert!(matches!(outcomes[0], AssetOutcome::Failed(_, AssetError::Vault(_))));
    }
}
