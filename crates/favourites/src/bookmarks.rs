//! GTK bookmark file parsing.
//!
//! One bookmark per line: a URI, optionally followed by a space and a label
//! (`file:///home/alice/src Projects`). Lines are trimmed and blank lines ignored.
//! Whether a URI actually resolves is the registry's business, not the parser's.
//!
//! Labels are an extension over the plain one-URI-per-line format, following later GTK
//! bookmark files. A reader of the plain format takes the whole line as the URI, so it
//! skips labelled lines as unresolvable. URIs don't contain raw whitespace, so files
//! without labels parse the same either way.

use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub uri: String,
    /// User-chosen label shown instead of the file name.
    pub label: Option<String>,
}

pub fn parse_bookmarks(contents: &str) -> Vec<Bookmark> {
    contents.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<Bookmark> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (uri, label) = match line.split_once(char::is_whitespace) {
        Some((uri, label)) => {
            let label = label.trim();
            (uri, (!label.is_empty()).then(|| label.to_string()))
        }
        None => (line, None),
    };
    Some(Bookmark {
        uri: uri.to_string(),
        label,
    })
}

/// Reads and parses the bookmark file. A missing or unreadable file means no bookmarks.
pub fn read_bookmarks(path: &Path) -> Vec<Bookmark> {
    match fs::read_to_string(path) {
        Ok(contents) => parse_bookmarks(&contents),
        Err(e) => {
            log::debug!("Bookmarks: can't read {}: {}", path.display(), e);
            Vec::new()
        }
    }
}
