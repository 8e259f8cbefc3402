//! # Foundry Import
//!
//! Converts the journal of a Foundry VTT world into a folder of markdown notes.
//! The world's folder and journal entry exports (one JSON record per line) are
//! the data source: journal folders become vault folders, entries become notes
//! with frontmatter, references between entries become wiki links, and embedded
//! images are copied next to the notes.
//!
//! # Architecture: Plan, Then Apply
//!
//! An import runs as a linear pipeline. Everything up to the rewrite is a pure
//! transform over the previous stage's output; only the last stages touch the
//! vault:
//!
//! ```text
//! 1. Read       folders.db, journal.db  →  typed records        (tombstones dropped)
//! 2. Resolve    folder records          →  folder tree          (full paths, cycle-safe)
//! 3. Build      document records        →  entries + id map     (pages, contents, frontmatter)
//! 4. Rewrite    @JournalEntry / @UUID   →  [[links]], ![[assets]]
//! ─────────────────────────────────────────────── plan ▲ / apply ▼
//!    Folders    folder tree             →  vault folders (+ folder notes)
//! 5. Assets     relocation list         →  <destination>/assets/
//! 6. Write      entries                 →  <folder>/<name>.md
//! ```
//!
//! The split exists for two reasons:
//!
//! - **Nothing half-read is ever written**: both exports are decoded in full
//!   before the first vault operation, so a malformed line aborts cleanly.
//! - **Testability**: planning needs no vault at all, and `check` shows the
//!   plan without writing anything.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`records`] | Stage 1: NDJSON decoding, tombstone filter, typed folder/entry/page records |
//! | [`hierarchy`] | Stage 2: folder paths, virtual folders, folder creation and notes |
//! | [`model`] | Stage 3: entries, tables of contents, rendering with frontmatter, identifier map |
//! | [`rewrite`] | Stage 4: reference and asset rewriting |
//! | [`assets`] | Stage 5: copies referenced files into the asset folder |
//! | [`writer`] | Stage 6: one note per entry, replacing what was there |
//! | [`import`] | Runs the stages, streams progress events, counts the outcome |
//! | [`render`] | HTML to markdown conversion behind the [`render::HtmlRenderer`] trait |
//! | [`vault`] | The [`vault::Vault`] file-system capability and its on-disk implementation |
//! | [`config`] | `import.toml` loading, merging over stock defaults, validation |
//! | [`types`] | Source ids and the composite entry key |
//! | [`naming`] | Filename sanitization and name fallbacks |
//! | [`output`] | CLI output formatting for progress and the dry-run plan |
//!
//! # Design Decisions
//!
//! ## Delete-Then-Create Writes
//!
//! The [`vault::Vault`] never overwrites a file in place. Every note and asset
//! is written by deleting whatever is at its path and creating it again, so a
//! second import of the same world produces byte-identical files instead of
//! appending or merging. The pair is not atomic, so an import runs one vault
//! operation at a time and assumes it is the only import into its destination.
//!
//! ## Composite Entry Keys
//!
//! A page is identified by its entry id and its own id together
//! ([`types::EntryId`]). The `JournalEntry.<id>.JournalEntryPage.<id>` string
//! form only appears where Foundry uses it: in `@UUID` references and in the
//! `import-id` frontmatter field.
//!
//! ## Failures Stay Local
//!
//! Only an unreadable or malformed export stops an import. A folder that cannot
//! be created, a body that cannot be converted, an asset that cannot be read or
//! a note that cannot be written is logged, reported as an
//! [`import::ImportEvent`], and the rest of the import proceeds. References to
//! entries missing from the export are left as they were.

pub mod assets;
pub mod config;
pub mod hierarchy;
pub mod import;
pub mod model;
pub mod naming;
pub mod output;
pub mod records;
pub mod render;
pub mod rewrite;
pub mod types;
pub mod vault;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_helpers;
