//! Rebuilding nested values from path-tagged entries
//!
//! Reading a form produces an ordered list of `(path, value)` entries. The
//! entries are folded left to right into one nested value. Concrete indices
//! address array positions directly; implicit `[]` segments fall back to row
//! striping: a value goes into the array's last element unless that element
//! already holds the next key, in which case a new element is started.

use serde_json::{Map, Value};

use crate::path::{FieldPath, PathSegment};

/// How an entry is written into the output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// Assign the value, replacing whatever is there
    Leaf,
    /// Make sure a container exists without touching existing content
    Container,
}

/// One path-tagged value read from a document
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub path: FieldPath,
    pub value: Value,
    pub kind: EntryKind,
}

impl Entry {
    pub fn leaf(path: FieldPath, value: Value) -> Self {
        Self {
            path,
            value,
            kind: EntryKind::Leaf,
        }
    }

    pub fn container(path: FieldPath, value: Value) -> Self {
        Self {
            path,
            value,
            kind: EntryKind::Container,
        }
    }
}

/// Fold entries into a nested value. The result is an object unless an entry
/// targets the root path directly.
pub fn assemble<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Value {
    let mut root = Value::Object(Map::new());
    for entry in entries {
        insert(&mut root, entry.path.segments(), entry.value.clone(), entry.kind);
    }
    root
}

/// Convenience for callers holding plain `(path, value)` pairs
pub fn assemble_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> Value {
    let entries: Vec<Entry> = pairs
        .into_iter()
        .map(|(path, value)| Entry::leaf(FieldPath::parse(path), value))
        .collect();
    assemble(&entries)
}

fn insert(target: &mut Value, segments: &[PathSegment], value: Value, kind: EntryKind) {
    let Some((first, rest)) = segments.split_first() else {
        match kind {
            EntryKind::Leaf => *target = value,
            EntryKind::Container => {
                if target.is_null() {
                    *target = value;
                }
            }
        }
        return;
    };

    match first {
        PathSegment::Key(key) => {
            let obj = ensure_object(target);
            let child = obj.entry(key.clone()).or_insert(Value::Null);
            insert(child, rest, value, kind);
        }
        PathSegment::Index(idx) => {
            let arr = ensure_array(target);
            if arr.len() <= *idx {
                arr.resize(*idx + 1, Value::Null);
            }
            insert(&mut arr[*idx], rest, value, kind);
        }
        PathSegment::Each => {
            let arr = ensure_array(target);
            if rest.is_empty() {
                if kind == EntryKind::Leaf {
                    arr.push(value);
                }
                return;
            }
            let reuse = arr.last().map(|last| !holds(last, rest)).unwrap_or(false);
            if !reuse {
                arr.push(Value::Null);
            }
            if let Some(last) = arr.last_mut() {
                insert(last, rest, value, kind);
            }
        }
    }
}

/// Whether `row` already holds the value `rest` would write. A nested array
/// under the next key is never "held": further entries continue it.
fn holds(row: &Value, rest: &[PathSegment]) -> bool {
    match rest.first() {
        Some(PathSegment::Key(key)) => match row.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::Array(_)) => !matches!(rest.get(1), Some(PathSegment::Each)),
            Some(_) => true,
        },
        Some(PathSegment::Index(idx)) => row.get(*idx).map(|v| !v.is_null()).unwrap_or(false),
        Some(PathSegment::Each) => !row.is_array(),
        None => true,
    }
}

fn ensure_object(target: &mut Value) -> &mut Map<String, Value> {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    match target {
        Value::Object(map) => map,
        _ => unreachable!("target was just replaced with an object"),
    }
}

fn ensure_array(target: &mut Value) -> &mut Vec<Value> {
    if !target.is_array() {
        *target = Value::Array(Vec::new());
    }
    match target {
        Value::Array(arr) => arr,
        _ => unreachable!("target was just replaced with an array"),
    }
}

/// Look up a dotted/bracketed path in a value.
///
/// `tags[]` yields the array itself, `tags[].name` collects `name` from every
/// element and `tags[1]` addresses one element. Any traversal failure yields
/// `None`.
pub fn read_json_with_key(value: &Value, path: &str) -> Option<Value> {
    lookup(value, FieldPath::parse(path).segments())
}

pub fn lookup(value: &Value, segments: &[PathSegment]) -> Option<Value> {
    let Some((first, rest)) = segments.split_first() else {
        return Some(value.clone());
    };
    match first {
        PathSegment::Key(key) => lookup(value.as_object()?.get(key)?, rest),
        PathSegment::Index(idx) => lookup(value.as_array()?.get(*idx)?, rest),
        PathSegment::Each => {
            let arr = value.as_array()?;
            if rest.is_empty() {
                return Some(Value::Array(arr.clone()));
            }
            Some(Value::Array(
                arr.iter().filter_map(|item| lookup(item, rest)).collect(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_keys_created_left_to_right() {
        let value = assemble_pairs([
            ("name", json!("Al")),
            ("address.street", json!("Main")),
            ("address.city", json!("Oslo")),
        ]);
        assert_eq!(
            value,
            json!({"name": "Al", "address": {"street": "Main", "city": "Oslo"}})
        );
    }

    #[test]
    fn test_later_leaf_overwrites_conflicting_scalar() {
        let value = assemble_pairs([("a", json!(1)), ("a.b", json!(2))]);
        assert_eq!(value, json!({"a": {"b": 2}}));
    }

    #[test]
    fn test_row_striping() {
        let value = assemble_pairs([
            ("tags[].value", json!("a")),
            ("tags[].label", json!("A")),
            ("tags[].value", json!("b")),
            ("tags[].label", json!("B")),
        ]);
        assert_eq!(
            value,
            json!({"tags": [{"value": "a", "label": "A"}, {"value": "b", "label": "B"}]})
        );
    }

    #[test]
    fn test_striping_spills_into_new_row_only_when_key_taken() {
        let value = assemble_pairs([
            ("rows[].a", json!(1)),
            ("rows[].b", json!(2)),
            ("rows[].b", json!(3)),
        ]);
        assert_eq!(value, json!({"rows": [{"a": 1, "b": 2}, {"b": 3}]}));
    }

    #[test]
    fn test_primitive_array() {
        let value = assemble_pairs([("tags[]", json!("x")), ("tags[]", json!("y"))]);
        assert_eq!(value, json!({"tags": ["x", "y"]}));
    }

    #[test]
    fn test_indexed_paths() {
        let value = assemble_pairs([
            ("items[0].tags[1]", json!("b")),
            ("items[0].tags[0]", json!("a")),
            ("items[1].name", json!("second")),
        ]);
        assert_eq!(
            value,
            json!({"items": [{"tags": ["a", "b"]}, {"name": "second"}]})
        );
    }

    #[test]
    fn test_container_entries_do_not_overwrite() {
        let entries = vec![
            Entry::container(FieldPath::parse("tags"), json!([])),
            Entry::leaf(FieldPath::parse("tags[0]"), json!("a")),
            Entry::container(FieldPath::parse("tags"), json!([])),
            Entry::container(FieldPath::parse("empty"), json!([])),
        ];
        assert_eq!(assemble(&entries), json!({"tags": ["a"], "empty": []}));
    }

    #[test]
    fn test_root_entry_replaces_root() {
        let entries = vec![Entry::leaf(FieldPath::root(), json!("bare"))];
        assert_eq!(assemble(&entries), json!("bare"));
    }

    #[test]
    fn test_read_json_with_key() {
        let value = json!({
            "kind": "a",
            "address": {"city": "Oslo"},
            "tags": [{"v": 1}, {"v": 2}, {"w": 3}]
        });
        assert_eq!(read_json_with_key(&value, "address.city"), Some(json!("Oslo")));
        assert_eq!(read_json_with_key(&value, "tags[].v"), Some(json!([1, 2])));
        assert_eq!(read_json_with_key(&value, "tags[1].v"), Some(json!(2)));
        assert_eq!(read_json_with_key(&value, "tags[]").map(|v| v.as_array().unwrap().len()), Some(3));
        assert_eq!(read_json_with_key(&value, "address.zip"), None);
        assert_eq!(read_json_with_key(&value, "kind.inner"), None);
    }
}
