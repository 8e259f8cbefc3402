//! Document model: from journal records to output entries.
//!
//! Stage 3 of the import pipeline. Every journal entry becomes one or more
//! [`Entry`] values, each of which is written as one markdown file:
//!
//! | Pages | Output |
//! |-------|--------|
//! | none  | one file from the document's own `content` |
//! | one   | one file from that page (no extra nesting level) |
//! | many  | a folder named after the document holding a table of contents file plus one file per page |
//!
//! ```text
//! Atlas (pages North, Map)      →  Atlas/Atlas.md   - [[North]]
//!                                                   - [[Map]]
//!                                  Atlas/North.md
//!                                  Atlas/Map.md
//! ```
//!
//! A page whose name matches the document, or an earlier page of it, gets its
//! page id appended (`Atlas (p1).md`) so the contents note is never replaced.
//!
//! Building also fills the [`IdentifierMap`] that the reference rewriter
//! resolves `@JournalEntry[...]` and `@UUID[...]` links against. It is
//! complete before any rewriting starts, since references point both forward
//! and backward in the export.
//!
//! Rendering turns each entry's raw HTML or markdown into its markdown body.
//! A conversion failure empties that one body and is reported; it never stops
//! the import. The frontmatter block is only joined to the body by
//! [`note_text`], after references have been rewritten.

use crate::hierarchy::FolderTree;
use crate::naming::{display_name, sanitize_filename};
use crate::records::{DocumentRecord, PageContent, PageRecord, TextFormat};
use crate::render::HtmlRenderer;
use crate::rewrite::wiki_link;
use crate::types::{EntryId, ParentRef};
use std::collections::{HashMap, HashSet};

/// Raw body of an entry, tagged with its markup.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Html(String),
    Markdown(String),
    /// A page type with no conversion; rendered empty with a warning.
    Unsupported(String),
}

/// One output file.
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: EntryId,
    /// Display title, used in frontmatter and diagnostics.
    pub title: String,
    /// Sanitized file stem, without `.md`.
    pub filename: String,
    pub parent: ParentRef,
    pub body: Body,
    /// Rendered markdown body, without frontmatter. Empty until rendered.
    pub markdown: String,
}

/// Source id → output filename, for resolving cross-references.
#[derive(Debug, Clone, Default)]
pub struct IdentifierMap {
    names: HashMap<EntryId, String>,
}

impl IdentifierMap {
    pub fn insert(&mut self, id: EntryId, filename: impl Into<String>) {
        self.names.insert(id, filename.into());
    }

    pub fn get(&self, id: &EntryId) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Resolve the id part of a reference, ignoring any `#fragment`.
    ///
    /// A page id that is not registered falls back to its document.
    pub fn resolve(&self, raw: &str) -> Option<&str> {
        let id = EntryId::parse_reference(raw)?;
        self.get(&id).or_else(|| match &id {
            EntryId::Page { .. } => self.get(&EntryId::Document(id.document_id().clone())),
            EntryId::Document(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Entries in build order plus the id map covering all of them.
#[derive(Debug, Clone, Default)]
pub struct DocumentModel {
    pub entries: Vec<Entry>,
    pub ids: IdentifierMap,
}

/// A body that could not be converted.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionFailure {
    pub title: String,
    pub message: String,
}

/// Build the entries of every document, registering virtual folders in `tree`.
pub fn build_entries(documents: &[DocumentRecord], tree: &mut FolderTree) -> DocumentModel {
    let mut model = DocumentModel::default();

    for doc in documents {
        let title = display_name(doc.name.as_deref(), doc.id.as_str());
        let filename = sanitize_filename(&title);
        let parent = ParentRef::from_folder(doc.folder.as_deref());
        let doc_entry_id = EntryId::Document(doc.id.clone());

        let mut pages: Vec<&PageRecord> = doc.pages.iter().collect();
        pages.sort_by_key(|p| p.sort);

        match pages.as_slice() {
            [] => {
                model.ids.insert(doc_entry_id.clone(), &filename);
                model.entries.push(Entry {
                    id: doc_entry_id,
                    title,
                    filename,
                    parent,
                    body: document_body(doc),
                    markdown: String::new(),
                });
            }
            [page] => {
                model.ids.insert(doc_entry_id.clone(), &filename);
                model
                    .ids
                    .insert(EntryId::page(doc.id.as_str(), page.id.as_str()), &filename);
                model.entries.push(Entry {
                    id: doc_entry_id,
                    title,
                    filename,
                    parent,
                    body: page_body(&page.content),
                    markdown: String::new(),
                });
            }
            pages => {
                tree.add_virtual_folder(doc.id.clone(), &parent, &filename);
                let inner = ParentRef::Document(doc.id.clone());

                // Every file in the virtual folder needs its own name; the
                // contents note claims the document's name first.
                let mut taken = HashSet::from([filename.to_lowercase()]);
                let page_entries: Vec<Entry> = pages
                    .iter()
                    .map(|page| {
                        let page_title = display_name(page.name.as_deref(), &page.id);
                        let mut page_filename = sanitize_filename(&page_title);
                        if !taken.insert(page_filename.to_lowercase()) {
                            page_filename =
                                format!("{page_filename} ({})", sanitize_filename(&page.id));
                            taken.insert(page_filename.to_lowercase());
                        }
                        Entry {
                            id: EntryId::page(doc.id.as_str(), page.id.as_str()),
                            filename: page_filename,
                            title: page_title,
                            parent: inner.clone(),
                            body: page_body(&page.content),
                            markdown: String::new(),
                        }
                    })
                    .collect();

                model.ids.insert(doc_entry_id.clone(), &filename);
                model.entries.push(Entry {
                    id: doc_entry_id,
                    title,
                    filename,
                    parent: inner,
                    body: Body::Markdown(table_of_contents(&page_entries)),
                    markdown: String::new(),
                });
                for entry in page_entries {
                    model.ids.insert(entry.id.clone(), &entry.filename);
                    model.entries.push(entry);
                }
            }
        }
    }

    model
}

fn document_body(doc: &DocumentRecord) -> Body {
    let content = doc.content.clone().unwrap_or_default();
    match doc.format.unwrap_or_default() {
        TextFormat::Html => Body::Html(content),
        TextFormat::Markdown => Body::Markdown(content),
    }
}

fn page_body(content: &PageContent) -> Body {
    match content {
        PageContent::Text {
            format: TextFormat::Html,
            body,
        } => Body::Html(body.clone()),
        PageContent::Text {
            format: TextFormat::Markdown,
            body,
        } => Body::Markdown(body.clone()),
        PageContent::Image { src } | PageContent::Pdf { src } | PageContent::Video { src } => {
            Body::Markdown(src.as_deref().map(embed).unwrap_or_default())
        }
        PageContent::Unsupported(kind) => Body::Unsupported(kind.clone()),
    }
}

/// Markdown embed of a media path, bracketed when it contains spaces.
fn embed(src: &str) -> String {
    let src = src.replace('(', "\\(").replace(')', "\\)");
    if src.contains(char::is_whitespace) {
        format!("![](<{src}>)")
    } else {
        format!("![]({src})")
    }
}

/// Bullet list linking every page, in page order.
fn table_of_contents(pages: &[Entry]) -> String {
    pages
        .iter()
        .map(|p| format!("- {}", wiki_link(&p.filename, &p.title)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Quote a string as a YAML double-quoted scalar.
///
/// JSON string syntax is a subset of YAML's double-quoted style.
pub fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Frontmatter block of an entry, including the closing `---` line.
pub fn frontmatter(entry: &Entry) -> String {
    let title = quote(&entry.title);
    format!(
        "---\ntitle: {title}\naliases:\n  - {title}\nimport-id: {}\n---\n",
        quote(&entry.id.import_id())
    )
}

/// Full file contents of an entry: frontmatter, then the body if any.
pub fn note_text(entry: &Entry) -> String {
    let mut text = frontmatter(entry);
    if !entry.markdown.is_empty() {
        text.push('\n');
        text.push_str(&entry.markdown);
        text.push('\n');
    }
    text
}

/// Render each entry's body to markdown.
pub fn render_entries(
    entries: &mut [Entry],
    renderer: &impl HtmlRenderer,
) -> Vec<ConversionFailure> {
    let mut failures = Vec::new();
    for entry in entries.iter_mut() {
        let body = match &entry.body {
            Body::Markdown(md) => md.trim().to_string(),
            Body::Html(html) => match renderer.render(html) {
                Ok(md) => md,
                Err(e) => {
                    tracing::warn!(entry = %entry.title, error = %e, "content conversion failed");
                    failures.push(ConversionFailure {
                        title: entry.title.clone(),
                        message: e.to_string(),
                    });
                    String::new()
                }
            },
            Body::Unsupported(kind) => {
                tracing::warn!(entry = %entry.title, kind = %kind, "unsupported page type");
                failures.push(ConversionFailure {
                    title: entry.title.clone(),
                    message: format!("unsupported page type '{kind}'"),
                });
                String::new()
            }
        };
        entry.markdown = body;
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::resolve_folders;
    use crate::records::{FolderRecord, decode, read_records};
    use crate::render::tests::StubRenderer;
    use crate::test_helpers::{entry_filenames, find_entry};
    use crate::types::{DocumentId, FolderId};
    use std::path::Path;

    fn documents(ndjson: &str) -> Vec<DocumentRecord> {
        decode(read_records(ndjson).unwrap()).unwrap()
    }

    fn build(ndjson: &str) -> (DocumentModel, FolderTree) {
        let folders = vec![FolderRecord {
            id: FolderId::new("f1"),
            name: Some("Lore".into()),
            parent: None,
            category: None,
        }];
        let mut tree = resolve_folders(&folders, Path::new("Import"));
        let model = build_entries(&documents(ndjson), &mut tree);
        (model, tree)
    }

    #[test]
    fn document_without_pages_is_one_entry() {
        let (model, _) =
            build(r#"{"_id":"d1","name":"Intro","folder":"f1","content":"<p>Hi</p>"}"#);
        assert_eq!(model.entries.len(), 1);
        let entry = &model.entries[0];
        assert_eq!(entry.id, EntryId::document("d1"));
        assert_eq!(entry.parent, ParentRef::Folder(FolderId::new("f1")));
        assert_eq!(entry.body, Body::Html("<p>Hi</p>".into()));
        assert_eq!(model.ids.resolve("d1"), Some("Intro"));
    }

    #[test]
    fn markdown_format_document() {
        let (model, _) = build(r#"{"_id":"d1","name":"Notes","format":2,"content":"*hi*"}"#);
        assert_eq!(model.entries[0].body, Body::Markdown("*hi*".into()));
        assert_eq!(model.entries[0].parent, ParentRef::Root);
    }

    #[test]
    fn single_page_uses_page_content() {
        let (model, tree) = build(
            r#"{"_id":"d1","name":"Solo","content":"ignored","pages":[{"_id":"p1","name":"Only","type":"text","text":{"format":1,"content":"<p>page</p>"}}]}"#,
        );
        assert_eq!(model.entries.len(), 1);
        assert_eq!(model.entries[0].filename, "Solo");
        assert_eq!(model.entries[0].body, Body::Html("<p>page</p>".into()));
        assert!(tree.virtual_folders().is_empty());
        assert_eq!(model.ids.resolve("d1.JournalEntryPage.p1"), Some("Solo"));
    }

    #[test]
    fn multiple_pages_make_toc_and_pages() {
        let (model, tree) = build(
            r#"{"_id":"d2","folder":"f1","pages":[{"_id":"p1","name":"A","type":"text","text":{"format":1,"content":"<p>a</p>"}},{"_id":"p2","name":"B","type":"text","text":{"format":2,"markdown":"b"}}]}"#,
        );
        assert_eq!(entry_filenames(&model), vec!["d2", "A", "B"]);

        let toc = find_entry(&model, "d2");
        assert_eq!(toc.parent, ParentRef::Document(DocumentId::new("d2")));
        assert_eq!(toc.body, Body::Markdown("- [[A]]\n- [[B]]".into()));

        let page = find_entry(&model, "B");
        assert_eq!(page.id, EntryId::page("d2", "p2"));
        assert_eq!(page.parent, ParentRef::Document(DocumentId::new("d2")));

        assert_eq!(
            tree.path_of(&ParentRef::Document(DocumentId::new("d2"))),
            Path::new("Import/Lore/d2")
        );
        assert_eq!(model.ids.resolve("d2"), Some("d2"));
        assert_eq!(model.ids.resolve("d2.JournalEntryPage.p1"), Some("A"));
        assert_eq!(model.ids.len(), 3);
    }

    #[test]
    fn pages_follow_sort_key() {
        let (model, _) = build(
            r#"{"_id":"d","name":"Doc","pages":[{"_id":"p1","name":"Second","sort":200},{"_id":"p2","name":"First","sort":100}]}"#,
        );
        assert_eq!(entry_filenames(&model), vec!["Doc", "First", "Second"]);
    }

    #[test]
    fn toc_labels_unsanitized_titles() {
        let (model, _) = build(
            r#"{"_id":"d","name":"Doc","pages":[{"_id":"p1","name":"Why?"},{"_id":"p2","name":"Plain"}]}"#,
        );
        assert_eq!(
            find_entry(&model, "Doc").body,
            Body::Markdown("- [[Why_|Why?]]\n- [[Plain]]".into())
        );
    }

    #[test]
    fn media_pages_become_embeds() {
        let (model, _) = build(
            r#"{"_id":"d","name":"Doc","pages":[{"_id":"p1","name":"Map","type":"image","src":"worlds/w/map.webp"},{"_id":"p2","name":"Clip","type":"video"}]}"#,
        );
        assert_eq!(
            find_entry(&model, "Map").body,
            Body::Markdown("![](worlds/w/map.webp)".into())
        );
        assert_eq!(find_entry(&model, "Clip").body, Body::Markdown(String::new()));
    }

    #[test]
    fn media_paths_with_spaces_are_bracketed() {
        let (model, _) = build(
            r#"{"_id":"d","name":"Doc","pages":[{"_id":"p1","name":"Map","type":"image","src":"worlds/w/old map (2).webp"}]}"#,
        );
        assert_eq!(
            model.entries[0].body,
            Body::Markdown(r"![](<worlds/w/old map \(2\).webp>)".into())
        );
    }

    #[test]
    fn unknown_page_reference_falls_back_to_document() {
        let (model, _) = build(r#"{"_id":"d1","name":"Intro"}"#);
        assert_eq!(model.ids.resolve("d1.JournalEntryPage.zzz"), Some("Intro"));
        assert_eq!(model.ids.resolve("nope"), None);
    }

    #[test]
    fn note_text_prefixes_frontmatter() {
        let (mut model, _) = build(r#"{"_id":"d1","name":"Intro","content":"<p>Hi</p>"}"#);
        let failures = render_entries(&mut model.entries, &StubRenderer);
        assert!(failures.is_empty());
        assert_eq!(model.entries[0].markdown, "Hi");
        assert_eq!(
            note_text(&model.entries[0]),
            "---\ntitle: \"Intro\"\naliases:\n  - \"Intro\"\nimport-id: \"JournalEntry.d1\"\n---\n\nHi\n"
        );
    }

    #[test]
    fn frontmatter_escapes_quotes() {
        let (model, _) = build(r#"{"_id":"d1","name":"The \"Red\" Inn"}"#);
        assert!(frontmatter(&model.entries[0]).contains(r#"title: "The \"Red\" Inn""#));
        assert_eq!(model.entries[0].filename, "The _Red_ Inn");
    }

    #[test]
    fn page_frontmatter_has_composite_id() {
        let (model, _) = build(
            r#"{"_id":"d","name":"Doc","pages":[{"_id":"p1","name":"A"},{"_id":"p2","name":"B"}]}"#,
        );
        assert!(
            frontmatter(find_entry(&model, "B"))
                .contains("import-id: \"JournalEntry.d.JournalEntryPage.p2\"")
        );
    }

    #[test]
    fn page_named_like_its_document_gets_a_distinct_file() {
        let (model, _) = build(
            r#"{"_id":"d","name":"Atlas","pages":[{"_id":"p1","name":"Atlas","sort":1},{"_id":"p2","name":"North","sort":2}]}"#,
        );
        assert_eq!(entry_filenames(&model), vec!["Atlas", "Atlas (p1)", "North"]);
        assert_eq!(
            find_entry(&model, "Atlas").body,
            Body::Markdown("- [[Atlas (p1)|Atlas]]\n- [[North]]".into())
        );
        assert_eq!(model.ids.resolve("d"), Some("Atlas"));
        assert_eq!(model.ids.resolve("d.JournalEntryPage.p1"), Some("Atlas (p1)"));
    }

    #[test]
    fn pages_with_the_same_name_get_distinct_files() {
        let (model, _) = build(
            r#"{"_id":"d","name":"Doc","pages":[{"_id":"p1","name":"Notes","sort":1},{"_id":"p2","name":"notes","sort":2}]}"#,
        );
        assert_eq!(entry_filenames(&model), vec!["Doc", "Notes", "notes (p2)"]);
        assert_eq!(model.ids.resolve("d.JournalEntryPage.p2"), Some("notes (p2)"));
    }

    #[test]
    fn conversion_failure_empties_body_and_continues() {
        let (mut model, _) = build(
            r#"{"_id":"d1","name":"Bad","content":"<p>FAIL</p>"}
{"_id":"d2","name":"Good","content":"<p>fine</p>"}"#,
        );
        let failures = render_entries(&mut model.entries, &StubRenderer);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].title, "Bad");
        assert_eq!(find_entry(&model, "Bad").markdown, "");
        assert!(note_text(find_entry(&model, "Bad")).ends_with("---\n"));
        assert!(note_text(find_entry(&model, "Good")).ends_with("\nfine\n"));
    }

    #[test]
    fn unsupported_page_is_reported() {
        let (mut model, _) = build(
            r#"{"_id":"d","name":"Doc","pages":[{"_id":"p1","name":"A","type":"map"},{"_id":"p2","name":"B"}]}"#,
        );
        let failures = render_entries(&mut model.entries, &StubRenderer);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].message.contains("'map'"));
    }
}
