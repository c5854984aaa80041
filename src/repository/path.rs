//! Repository path handling.
//!
//! Paths are `/`-separated; a segment may carry a same-name-sibling index
//! (`b[2]`). Index 1 is implicit and never rendered.

use crate::core::{DerivedDataError, Result};

/// One parsed path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// `.`
    Current,
    /// `..`
    Parent,
    /// A child name with its 1-based same-name-sibling index
    Child {
        /// Node name without index
        name: &'a str,
        /// Same-name-sibling index, 1 when absent
        index: usize,
    },
}

/// Parse a single segment such as `b`, `b[2]`, `.` or `..`.
pub fn parse_segment(segment: &str) -> Result<Segment<'_>> {
    match segment {
        "." => return Ok(Segment::Current),
        ".." => return Ok(Segment::Parent),
        "" => {
            return Err(DerivedDataError::InvalidPath {
                path: segment.to_string(),
                reason: "empty path segment".to_string(),
            });
        }
        _ => {}
    }

    let Some(open) = segment.find('[') else {
        return Ok(Segment::Child {
            name: segment,
            index: 1,
        });
    };

    let invalid = || DerivedDataError::InvalidPath {
        path: segment.to_string(),
        reason: "malformed same-name-sibling index".to_string(),
    };

    let index_part = segment[open + 1..].strip_suffix(']').ok_or_else(invalid)?;
    let index: usize = index_part.parse().map_err(|_| invalid())?;
    if index == 0 || open == 0 {
        return Err(invalid());
    }

    Ok(Segment::Child {
        name: &segment[..open],
        index,
    })
}

/// Split a relative path into its segments, ignoring a trailing slash.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Split `a/b/prop` into (`["a", "b"]`, `"prop"`).
pub fn split_property_path(rel_path: &str) -> Result<(Vec<&str>, &str)> {
    let mut parts = segments(rel_path);
    let property = parts.pop().ok_or_else(|| DerivedDataError::InvalidPath {
        path: rel_path.to_string(),
        reason: "no property name".to_string(),
    })?;
    Ok((parts, property))
}

/// Render a node name with its index the way paths show it.
pub fn render_segment(name: &str, index: usize) -> String {
    if index > 1 {
        format!("{name}[{index}]")
    } else {
        name.to_string()
    }
}

/// Append a child segment or property name to an absolute path.
pub fn join(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Whether `path` equals `ancestor` or lies below it.
pub fn is_at_or_below(path: &str, ancestor: &str) -> bool {
    if ancestor == "/" {
        return path.starts_with('/');
    }
    path == ancestor
        || (path.starts_with(ancestor) && path.as_bytes().get(ancestor.len()) == Some(&b'/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_segment() {
        assert_eq!(
            parse_segment("content").unwrap(),
            Segment::Child {
                name: "content",
                index: 1
            }
        );
    }

    #[test]
    fn test_parse_indexed_segment() {
        assert_eq!(
            parse_segment("b[2]").unwrap(),
            Segment::Child {
                name: "b",
                index: 2
            }
        );
        assert_eq!(parse_segment("..").unwrap(), Segment::Parent);
        assert_eq!(parse_segment(".").unwrap(), Segment::Current);
    }

    #[test]
    fn test_parse_rejects_malformed_index() {
        assert!(parse_segment("b[").is_err());
        assert!(parse_segment("b[0]").is_err());
        assert!(parse_segment("b[x]").is_err());
        assert!(parse_segment("[2]").is_err());
    }

    #[test]
    fn test_split_property_path() {
        let (nodes, property) = split_property_path("a/b/title").unwrap();
        assert_eq!(nodes, vec!["a", "b"]);
        assert_eq!(property, "title");
        assert!(split_property_path("").is_err());
    }

    #[test]
    fn test_is_at_or_below() {
        assert!(is_at_or_below("/a/b", "/a"));
        assert!(is_at_or_below("/a", "/a"));
        assert!(!is_at_or_below("/ab", "/a"));
        assert!(is_at_or_below("/x", "/"));
    }

    #[test]
    fn test_join_and_render() {
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a", "b[2]"), "/a/b[2]");
        assert_eq!(render_segment("b", 1), "b");
        assert_eq!(render_segment("b", 3), "b[3]");
    }
}
