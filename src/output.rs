//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every entity (folder, note, asset) is shown by its semantic identity first,
//! title and positional index, with vault paths as secondary context after
//! `→` or on indented lines. The output reads as an inventory of the import
//! while still letting users find every file it produced.
//!
//! # Output Format
//!
//! ## Import progress
//!
//! ```text
//! Importing 8 notes from 3 folders
//!     + Import/Lore
//!     + Import/Lore/Places
//!     ? Unresolved in Gazetteer: @JournalEntry[zzz]{Nowhere}
//!     Asset: Import/assets/portrait.png (from Mayor: Bob)
//! 001/008 Intro → Import/Lore/Intro.md
//! 002/008 Atlas → Import/Atlas/Atlas.md
//!
//! Imported 8 notes written, 4 folders, 2 assets copied, 1 unresolved references
//! ```
//!
//! ## Check
//!
//! ```text
//! Folders
//! 001 Lore
//!     002 Places
//!
//! Notes
//! 001 Intro → Import/Lore/Intro.md
//! 002 Atlas → Import/Atlas/Atlas.md
//!
//! Assets
//! 001 portrait.png → Import/assets/portrait.png
//!     Source: data/worlds/demo/assets/portrait.png
//!
//! Warnings
//!     Gazetteer: unresolved @JournalEntry[zzz]{Nowhere}
//!
//! Planned 8 notes, 3 folders, 2 assets
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::hierarchy::FolderTree;
use crate::import::{ImportEvent, ImportPlan, ImportSummary};
use crate::writer::entry_path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Nesting depth of a folder below the import root (0 for top level).
fn folder_depth(tree: &FolderTree, path: &std::path::Path) -> usize {
    let root = tree.root().components().count();
    path.components().count().saturating_sub(root + 1)
}

// ============================================================================
// Import progress
// ============================================================================

/// Format a single import progress event as display lines.
pub fn format_import_event(event: &ImportEvent) -> Vec<String> {
    match event {
        ImportEvent::Started { folders, entries } => {
            vec![format!("Importing {} notes from {} folders", entries, folders)]
        }
        ImportEvent::FolderCreated { path } => {
            vec![format!("{}+ {}", indent(1), path.display())]
        }
        ImportEvent::FolderFailed { path, message } => {
            vec![format!("{}! {}: {}", indent(1), path.display(), message)]
        }
        ImportEvent::EntryWritten {
            index,
            total,
            title,
            path,
        } => vec![format!(
            "{}/{} {} \u{2192} {}",
            format_index(*index),
            format_index(*total),
            title,
            path.display()
        )],
        ImportEvent::EntryFailed {
            title,
            path,
            message,
        } => vec![
            format!("{}! Failed to write {}", indent(1), title),
            format!("{}{}: {}", indent(2), path.display(), message),
        ],
        ImportEvent::ConversionFailed { title, message } => {
            vec![format!("{}? {}: {}", indent(1), title, message)]
        }
        ImportEvent::UnresolvedReference { owner, reference } => {
            vec![format!("{}? Unresolved in {}: {}", indent(1), owner, reference)]
        }
        ImportEvent::AssetCopied { owner, destination } => vec![format!(
            "{}Asset: {} (from {})",
            indent(1),
            destination.display(),
            owner
        )],
        ImportEvent::AssetFailed {
            owner,
            source,
            message,
        } => vec![
            format!("{}! Asset not copied for {}", indent(1), owner),
            format!("{}{}: {}", indent(2), source.display(), message),
        ],
    }
}

/// Format the closing summary line.
pub fn format_summary(summary: &ImportSummary) -> Vec<String> {
    vec![String::new(), format!("Imported {}", summary)]
}

/// Print import summary to stdout.
pub fn print_summary(summary: &ImportSummary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Check (dry run)
// ============================================================================

/// Format the planned import: folders, notes, assets and warnings.
pub fn format_plan(plan: &ImportPlan) -> Vec<String> {
    let mut lines = Vec::new();
    let tree = &plan.tree;

    if !tree.folders().is_empty() {
        lines.push("Folders".to_string());
        for (i, folder) in tree.folders().iter().enumerate() {
            lines.push(format!(
                "{}{} {}",
                indent(folder_depth(tree, &folder.full_path)),
                format_index(i + 1),
                folder.display_name
            ));
        }
        lines.push(String::new());
    }

    lines.push("Notes".to_string());
    for (i, entry) in plan.model.entries.iter().enumerate() {
        lines.push(format!(
            "{} {} \u{2192} {}",
            format_index(i + 1),
            entry.title,
            entry_path(tree, entry).display()
        ));
    }

    if !plan.report.relocations.is_empty() {
        lines.push(String::new());
        lines.push("Assets".to_string());
        for (i, relocation) in plan.report.relocations.iter().enumerate() {
            let name = relocation
                .destination
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            lines.push(format!(
                "{} {} \u{2192} {}",
                format_index(i + 1),
                name,
                relocation.destination.display()
            ));
            lines.push(format!(
                "{}Source: {}",
                indent(1),
                relocation.source.display()
            ));
        }
    }

    let warnings: Vec<String> = plan
        .conversion_failures
        .iter()
        .map(|f| format!("{}{}: {}", indent(1), f.title, f.message))
        .chain(
            plan.report
                .unresolved
                .iter()
                .map(|u| format!("{}{}: unresolved {}", indent(1), u.owner, u.reference)),
        )
        .collect();
    if !warnings.is_empty() {
        lines.push(String::new());
        lines.push("Warnings".to_string());
        lines.extend(warnings);
    }

    lines.push(String::new());
    lines.push(format!(
        "Planned {} notes, {} folders, {} assets",
        plan.model.entries.len(),
        tree.folders().len() + tree.virtual_folders().len(),
        plan.report.relocations.len()
    ));
    lines
}

/// Print the planned import to stdout.
pub fn print_plan(plan: &ImportPlan) {
    for line in format_plan(plan) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportConfig;
    use crate::import::plan;
    use crate::render::tests::StubRenderer;
    use crate::test_helpers::write_sources;
    use std::path::PathBuf;
    use tempfile::TempDir;

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads_to_three_digits() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn indent_is_four_spaces_per_level() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    // =========================================================================
    // Import events
    // =========================================================================

    #[test]
    fn format_started() {
        let lines = format_import_event(&ImportEvent::Started {
            folders: 3,
            entries: 7,
        });
        assert_eq!(lines, vec!["Importing 7 notes from 3 folders"]);
    }

    #[test]
    fn format_entry_written() {
        let lines = format_import_event(&ImportEvent::EntryWritten {
            index: 2,
            total: 7,
            title: "Atlas".to_string(),
            path: PathBuf::from("Import/Atlas/Atlas.md"),
        });
        assert_eq!(lines, vec!["002/007 Atlas \u{2192} Import/Atlas/Atlas.md"]);
    }

    #[test]
    fn format_entry_failed_names_entry_and_path() {
        let lines = format_import_event(&ImportEvent::EntryFailed {
            title: "Intro".to_string(),
            path: PathBuf::from("Import/Lore/Intro.md"),
            message: "permission denied".to_string(),
        });
        assert_eq!(lines[0], "    ! Failed to write Intro");
        assert_eq!(lines[1], "        Import/Lore/Intro.md: permission denied");
    }

    #[test]
    fn format_unresolved_reference() {
        let lines = format_import_event(&ImportEvent::UnresolvedReference {
            owner: "Gazetteer".to_string(),
            reference: "@JournalEntry[zzz]{Nowhere}".to_string(),
        });
        assert_eq!(
            lines,
            vec!["    ? Unresolved in Gazetteer: @JournalEntry[zzz]{Nowhere}"]
        );
    }

    #[test]
    fn format_asset_events() {
        let copied = format_import_event(&ImportEvent::AssetCopied {
            owner: "Map".to_string(),
            destination: PathBuf::from("Import/assets/map.png"),
        });
        assert_eq!(copied, vec!["    Asset: Import/assets/map.png (from Map)"]);

        let failed = format_import_event(&ImportEvent::AssetFailed {
            owner: "Map".to_string(),
            source: PathBuf::from("data/map.png"),
            message: "not found".to_string(),
        });
        assert_eq!(failed[0], "    ! Asset not copied for Map");
        assert_eq!(failed[1], "        data/map.png: not found");
    }

    #[test]
    fn format_summary_line() {
        let summary = ImportSummary {
            folders: 1,
            entries_written: 2,
            ..Default::default()
        };
        assert_eq!(
            format_summary(&summary),
            vec!["", "Imported 2 notes written, 1 folders, 0 assets copied"]
        );
    }

    // =========================================================================
    // Check output
    // =========================================================================

    fn sample_plan() -> ImportPlan {
        let tmp = TempDir::new().unwrap();
        let sources = write_sources(
            tmp.path(),
            concat!(
                r#"{"_id":"f1","name":"Lore","type":"JournalEntry"}"#,
                "\n",
                r#"{"_id":"f2","name":"Places","parent":"f1","type":"JournalEntry"}"#,
                "\n",
            ),
            concat!(
                r#"{"_id":"d1","name":"Intro","folder":"f1","content":"<p>See @JournalEntry[zzz]{Nowhere}</p>"}"#,
                "\n",
                r#"{"_id":"d2","name":"Map","folder":"f2","format":2,"content":"![](worlds/w/map.png)"}"#,
                "\n",
            ),
        );
        let config = ImportConfig {
            destination: PathBuf::from("Import"),
            data_root: PathBuf::from("data"),
            ..Default::default()
        };
        plan(&config, &sources, &StubRenderer).unwrap()
    }

    #[test]
    fn plan_lists_folders_with_nesting() {
        let lines = format_plan(&sample_plan());
        assert_eq!(lines[0], "Folders");
        assert_eq!(lines[1], "001 Lore");
        assert_eq!(lines[2], "    002 Places");
    }

    #[test]
    fn plan_lists_notes_with_paths() {
        let lines = format_plan(&sample_plan());
        assert!(lines.contains(&"001 Intro \u{2192} Import/Lore/Intro.md".to_string()));
        assert!(lines.contains(&"002 Map \u{2192} Import/Lore/Places/Map.md".to_string()));
    }

    #[test]
    fn plan_lists_assets_and_warnings() {
        let lines = format_plan(&sample_plan());
        assert!(lines.contains(&"001 map.png \u{2192} Import/assets/map.png".to_string()));
        assert!(lines.contains(&"    Source: data/worlds/w/map.png".to_string()));
        assert!(lines.contains(&"    Intro: unresolved @JournalEntry[zzz]{Nowhere}".to_string()));
        assert_eq!(
            lines.last().unwrap(),
            "Planned 2 notes, 2 folders, 1 assets"
        );
    }
}
