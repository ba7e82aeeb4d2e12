//! Drive query-language filters.
//!
//! Every value placed inside a `'...'` literal goes through [`escape_literal`],
//! so user input can never close the literal and append clauses of its own.

/// Escape a value for use inside a single-quoted Drive query literal.
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `'<folder>' in parents and trashed = false`, plus a name-contains clause
/// when `search` has non-blank content.
pub fn children_filter(folder_id: &str, search: Option<&str>) -> String {
    let mut filter = format!(
        "'{}' in parents and trashed = false",
        escape_literal(folder_id)
    );

    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        filter.push_str(" and name contains '");
        filter.push_str(&escape_literal(term));
        filter.push('\'');
    }

    filter
}
