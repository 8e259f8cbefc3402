//! Import orchestration.
//!
//! Runs the stages in order against one vault:
//!
//! ```text
//! folders.db ─┐
//!             ├─ read ─→ resolve folders ─→ build entries ─→ render ─→ rewrite   (plan)
//! journal.db ─┘
//!
//!   ─→ create folders ─→ relocate assets ─→ write entries                        (apply)
//! ```
//!
//! Planning is pure apart from reading the two exports. Both are read and
//! decoded before anything touches the vault, so a [`ImportError`] means
//! nothing was written. Every later problem is confined to the folder, entry
//! or asset it concerns: it is logged, reported as an [`ImportEvent`], counted
//! in the [`ImportSummary`], and the import moves on.
//!
//! Vault operations run on the calling thread, one at a time. Progress events
//! go to an optional channel so a caller can print them from another thread.

use crate::assets::{AssetOutcome, relocate_assets};
use crate::config::ImportConfig;
use crate::hierarchy::{FolderTree, create_folders, filter_category, resolve_folders};
use crate::model::{ConversionFailure, DocumentModel, build_entries, render_entries};
use crate::records::{DocumentRecord, FolderRecord, ReadError, load_documents, load_folders};
use crate::render::HtmlRenderer;
use crate::rewrite::{AssetPaths, RewriteReport, rewrite_entries};
use crate::vault::{Vault, ensure_folder};
use crate::writer::write_entry;
use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("cannot read export: {0}")]
    Read(#[from] ReadError),
}

/// The two export files of a world.
#[derive(Debug, Clone)]
pub struct ImportSources {
    pub folders: PathBuf,
    pub journal: PathBuf,
}

/// Progress report sent while an import runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportEvent {
    Started {
        folders: usize,
        entries: usize,
    },
    /// A folder or folder note is in place.
    FolderCreated {
        path: PathBuf,
    },
    FolderFailed {
        path: PathBuf,
        message: String,
    },
    EntryWritten {
        /// 1-based position in write order.
        index: usize,
        total: usize,
        title: String,
        path: PathBuf,
    },
    EntryFailed {
        title: String,
        path: PathBuf,
        message: String,
    },
    ConversionFailed {
        title: String,
        message: String,
    },
    UnresolvedReference {
        owner: String,
        reference: String,
    },
    AssetCopied {
        owner: String,
        destination: PathBuf,
    },
    AssetFailed {
        owner: String,
        source: PathBuf,
        message: String,
    },
}

/// Counts for one import run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportSummary {
    pub folders: u32,
    pub folders_failed: u32,
    pub entries_written: u32,
    pub entries_failed: u32,
    pub assets_copied: u32,
    pub assets_failed: u32,
    pub conversion_warnings: u32,
    pub unresolved_references: u32,
}

impl ImportSummary {
    /// Whether anything needed attention.
    pub fn has_problems(&self) -> bool {
        self.folders_failed > 0
            || self.entries_failed > 0
            || self.assets_failed > 0
            || self.conversion_warnings > 0
            || self.unresolved_references > 0
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} notes written, {} folders, {} assets copied",
            self.entries_written, self.folders, self.assets_copied
        )?;
        let problems = [
            (self.entries_failed, "notes failed"),
            (self.folders_failed, "folders failed"),
            (self.assets_failed, "assets failed"),
            (self.conversion_warnings, "conversion warnings"),
            (self.unresolved_references, "unresolved references"),
        ];
        for (count, label) in problems {
            if count > 0 {
                write!(f, ", {count} {label}")?;
            }
        }
        Ok(())
    }
}

/// Everything the import will write, computed without touching the vault.
#[derive(Debug)]
pub struct ImportPlan {
    pub tree: FolderTree,
    pub model: DocumentModel,
    pub conversion_failures: Vec<ConversionFailure>,
    pub report: RewriteReport,
}

/// Read both exports and plan the import.
pub fn plan(
    config: &ImportConfig,
    sources: &ImportSources,
    renderer: &impl HtmlRenderer,
) -> Result<ImportPlan, ImportError> {
    let folders = load_folders(&sources.folders)?;
    let documents = load_documents(&sources.journal)?;
    tracing::debug!(
        folders = folders.len(),
        documents = documents.len(),
        "exports read"
    );
    Ok(plan_records(config, folders, &documents, renderer))
}

/// Plan an import from already decoded records.
pub fn plan_records(
    config: &ImportConfig,
    folders: Vec<FolderRecord>,
    documents: &[DocumentRecord],
    renderer: &impl HtmlRenderer,
) -> ImportPlan {
    let folders = filter_category(folders, &config.folder_type);
    let mut tree = resolve_folders(&folders, &config.destination);
    let mut model = build_entries(documents, &mut tree);
    let conversion_failures = render_entries(&mut model.entries, renderer);
    let paths = AssetPaths {
        data_root: config.data_root.clone(),
        asset_dir: config.asset_dir(),
    };
    let report = rewrite_entries(&mut model.entries, &model.ids, &paths);
    ImportPlan {
        tree,
        model,
        conversion_failures,
        report,
    }
}

/// Read, plan and write a complete import.
pub fn run_import(
    config: &ImportConfig,
    sources: &ImportSources,
    vault: &impl Vault,
    renderer: &impl HtmlRenderer,
    events: Option<Sender<ImportEvent>>,
) -> Result<ImportSummary, ImportError> {
    let plan = plan(config, sources, renderer)?;
    Ok(apply_plan(config, &plan, vault, events.as_ref()))
}

/// Write a planned import into the vault.
pub fn apply_plan(
    config: &ImportConfig,
    plan: &ImportPlan,
    vault: &impl Vault,
    events: Option<&Sender<ImportEvent>>,
) -> ImportSummary {
    let emit = |event: ImportEvent| {
        if let Some(tx) = events {
            // A closed receiver only means nobody is watching.
            let _ = tx.send(event);
        }
    };
    let mut summary = ImportSummary::default();
    let entries = &plan.model.entries;

    emit(ImportEvent::Started {
        folders: plan.tree.folders().len(),
        entries: entries.len(),
    });

    // Root entries live directly in the destination, so it must exist even
    // when the export has no folders.
    match ensure_folder(vault, &config.destination) {
        Ok(()) => emit(ImportEvent::FolderCreated {
            path: config.destination.clone(),
        }),
        Err(e) => {
            tracing::warn!(
                path = %config.destination.display(),
                error = %e,
                "failed to create destination"
            );
            summary.folders_failed += 1;
            emit(ImportEvent::FolderFailed {
                path: config.destination.clone(),
                message: e.to_string(),
            });
        }
    }

    for outcome in create_folders(vault, &plan.tree, config.folder_notes) {
        match outcome.result {
            Ok(()) => {
                if !outcome.note {
                    summary.folders += 1;
                }
                emit(ImportEvent::FolderCreated { path: outcome.path });
            }
            Err(e) => {
                summary.folders_failed += 1;
                emit(ImportEvent::FolderFailed {
                    path: outcome.path,
                    message: e.to_string(),
                });
            }
        }
    }

    for failure in &plan.conversion_failures {
        summary.conversion_warnings += 1;
        emit(ImportEvent::ConversionFailed {
            title: failure.title.clone(),
            message: failure.message.clone(),
        });
    }
    for unresolved in &plan.report.unresolved {
        summary.unresolved_references += 1;
        emit(ImportEvent::UnresolvedReference {
            owner: unresolved.owner.clone(),
            reference: unresolved.reference.clone(),
        });
    }

    for outcome in relocate_assets(vault, &config.asset_dir(), &plan.report.relocations) {
        match outcome {
            AssetOutcome::Copied(r) => {
                summary.assets_copied += 1;
                emit(ImportEvent::AssetCopied {
                    owner: r.owner.clone(),
                    destination: r.destination.clone(),
                });
            }
            AssetOutcome::Duplicate(_) => {}
            AssetOutcome::Failed(r, e) => {
                summary.assets_failed += 1;
                emit(ImportEvent::AssetFailed {
                    owner: r.owner.clone(),
                    source: r.source.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    let total = entries.len();
    for (pos, entry) in entries.iter().enumerate() {
        let outcome = write_entry(vault, &plan.tree, entry);
        match outcome.result {
            Ok(()) => {
                summary.entries_written += 1;
                emit(ImportEvent::EntryWritten {
                    index: pos + 1,
                    total,
                    title: entry.title.clone(),
                    path: outcome.path,
                });
            }
            Err(e) => {
                summary.entries_failed += 1;
                emit(ImportEvent::EntryFailed {
                    title: entry.title.clone(),
                    path: outcome.path,
                    message: e.to_string(),
                });
            }
        }
    }

    tracing::info!(%summary, "import finished");
    summary
}
