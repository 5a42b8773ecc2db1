//! Field paths
//!
//! Every value-bearing node in a document is tagged with a field path such as
//! `address.street`, `tags[]` or `items[].name`. Repeated positions are left
//! implicit (`[]`) at render time and resolved to concrete indices
//! (`items[1].name`) from document order when the form is read back.

use std::fmt;

/// Segment of a field path
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object key: `.name`
    Key(String),
    /// Implicit repeated position: `[]`
    Each,
    /// Concrete array position: `[2]`
    Index(usize),
}

/// Dot-and-bracket path identifying a field's position in the output value
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Create a root path (empty)
    pub fn root() -> Self {
        Self { segments: vec![] }
    }

    /// Push a key segment
    pub fn push_key(&self, name: &str) -> Self {
        let mut new = self.clone();
        new.segments.push(PathSegment::Key(name.to_string()));
        new
    }

    /// Push an implicit repeated segment (`[]`)
    pub fn push_each(&self) -> Self {
        let mut new = self.clone();
        new.segments.push(PathSegment::Each);
        new
    }

    /// Get the parent path (without the last segment)
    pub fn parent(&self) -> Self {
        let mut new = self.clone();
        new.segments.pop();
        new
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Replace the leading `[]` segments with concrete positions.
    ///
    /// Extra positions are ignored; `[]` segments without a matching position
    /// stay implicit.
    pub fn resolve(&self, positions: &[usize]) -> Self {
        let mut positions = positions.iter();
        let segments = self
            .segments
            .iter()
            .map(|seg| match seg {
                PathSegment::Each => match positions.next() {
                    Some(idx) => PathSegment::Index(*idx),
                    None => PathSegment::Each,
                },
                other => other.clone(),
            })
            .collect();
        Self { segments }
    }

    /// Parse a path string: `user.address[0].city`, `tags[]`, `items[*].name`
    pub fn parse(s: &str) -> Self {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = s.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '.' => {
                    if !current.is_empty() {
                        segments.push(PathSegment::Key(std::mem::take(&mut current)));
                    }
                }
                '[' => {
                    if !current.is_empty() {
                        segments.push(PathSegment::Key(std::mem::take(&mut current)));
                    }
                    let mut index_str = String::new();
                    for c in chars.by_ref() {
                        if c == ']' {
                            break;
                        }
                        index_str.push(c);
                    }
                    let index_str = index_str.trim();
                    if index_str.is_empty() || index_str == "*" {
                        segments.push(PathSegment::Each);
                    } else if let Ok(idx) = index_str.parse::<usize>() {
                        segments.push(PathSegment::Index(idx));
                    }
                }
                _ => current.push(ch),
            }
        }

        if !current.is_empty() {
            segments.push(PathSegment::Key(current));
        }

        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            match seg {
                PathSegment::Key(name) if i == 0 => write!(f, "{}", name)?,
                PathSegment::Key(name) => write!(f, ".{}", name)?,
                PathSegment::Each => write!(f, "[]")?,
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_path_building() {
        let path = FieldPath::root()
            .push_key("user")
            .push_key("address")
            .push_key("city");

        assert_eq!(path.to_string(), "user.address.city");
        assert_eq!(path.segments().len(), 3);
    }

    #[test]
    fn test_field_path_with_repeat() {
        let path = FieldPath::root()
            .push_key("items")
            .push_each()
            .push_key("name");

        assert_eq!(path.to_string(), "items[].name");
        assert_eq!(path.segments()[1], PathSegment::Each);
    }

    #[test]
    fn test_field_path_parse() {
        let path = FieldPath::parse("user.address[0].city");
        assert_eq!(path.segments()[2], PathSegment::Index(0));
        assert_eq!(path.to_string(), "user.address[0].city");

        let path = FieldPath::parse("tags[*]");
        assert_eq!(path.to_string(), "tags[]");
    }

    #[test]
    fn test_resolve_replaces_leading_repeats() {
        let path = FieldPath::parse("items[].tags[].value");
        assert_eq!(path.resolve(&[2, 0]).to_string(), "items[2].tags[0].value");
        assert_eq!(path.resolve(&[1]).to_string(), "items[1].tags[].value");
        assert_eq!(path.resolve(&[]), path);
    }

    #[test]
    fn test_parent() {
        let path = FieldPath::parse("a.b[]");
        assert_eq!(path.parent().to_string(), "a.b");
        assert_eq!(FieldPath::root().parent(), FieldPath::root());
    }
}
