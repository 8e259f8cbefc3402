//! Filename rules for everything the import writes.
//!
//! Record names come straight from the export and may contain anything the
//! source application allowed. Output names must be valid path segments on
//! every platform the vault may sync to, so the characters Windows rejects
//! are replaced:
//!
//! - `Maps: "Old" World` → `Maps_ _Old_ World`
//! - `Who/What?` → `Who_What_`
//! - `Tavern` → `Tavern`
//! - `..` → `_`

/// Characters that are never allowed in an output path segment.
const ILLEGAL: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace every illegal path character in `name` with `_`.
///
/// A name made only of dots would address the current or parent directory,
/// so it becomes a single `_`.
pub fn sanitize_filename(name: &str) -> String {
    if !name.is_empty() && name.chars().all(|c| c == '.') {
        return "_".to_string();
    }
    name.chars()
        .map(|c| if ILLEGAL.contains(&c) { '_' } else { c })
        .collect()
}

/// Display name for a record: its trimmed name, or its id when the name is blank.
pub fn display_name(name: Option<&str>, id: &str) -> String {
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => id.to_string(),
    }
}
