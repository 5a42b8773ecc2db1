//! The live document
//!
//! An arena of nodes in document order, standing in for the DOM subtree a
//! form renders into. Value-bearing nodes carry a field path tag; reading the
//! form walks the tree in order and hands the tagged values to
//! [`crate::assemble`]. Array item positions are never stored: they are the
//! order of the item nodes under their container.

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

use crate::assemble::{assemble, lookup, Entry};
use crate::component::FieldWidget;
use crate::input::{read_value, InputKind, InputState, SelectOption};
use crate::path::FieldPath;
use crate::template::{LayoutKind, Template};

/// Handle to a node of a [`Document`]. Slots are reused once a node is
/// dropped; the generation keeps old handles from resolving to the new node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// A leaf input
#[derive(Clone, Debug)]
pub struct InputNode {
    pub kind: InputKind,
    pub state: InputState,
    pub options: Vec<SelectOption>,
    pub format: Option<String>,
    pub trim: bool,
    pub disabled: bool,
    pub placeholder: Option<String>,
}

impl InputNode {
    pub fn read(&self) -> Value {
        read_value(
            self.kind,
            &self.state,
            &self.options,
            self.format.as_deref(),
            self.trim,
        )
    }
}

/// What a node is
#[derive(Debug)]
pub enum NodeKind {
    Root,
    /// Wrapper around one rendered field; target of hidden and redraw rules
    Field { template: Template, base: FieldPath },
    /// Object or unkeyed group of fields
    Group,
    /// Container of array items
    Array { children: Vec<Template>, sortable: bool },
    /// One array item; `keyed` items read back as objects
    Item { keyed: bool },
    Input(InputNode),
    Custom {
        type_name: String,
        widget: Box<dyn FieldWidget>,
    },
    Layout { kind: LayoutKind, text: Option<String> },
}

impl NodeKind {
    fn name(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Field { .. } => "field",
            NodeKind::Group => "group",
            NodeKind::Array { .. } => "array",
            NodeKind::Item { .. } => "item",
            NodeKind::Input(_) => "input",
            NodeKind::Custom { .. } => "custom",
            NodeKind::Layout { .. } => "layout",
        }
    }
}

#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    /// Field path tag
    pub path: Option<FieldPath>,
    pub hidden: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Detached subtree produced by rendering, attached in one step
#[derive(Debug)]
pub struct Fragment {
    pub kind: NodeKind,
    pub path: Option<FieldPath>,
    pub hidden: bool,
    pub children: Vec<Fragment>,
}

impl Fragment {
    pub fn new(kind: NodeKind, path: Option<FieldPath>) -> Self {
        Self {
            kind,
            path,
            hidden: false,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Fragment>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena of nodes rooted at [`Document::root`]
#[derive(Debug)]
pub struct Document {
    slots: Vec<Slot>,
    /// Indices of empty slots
    free: Vec<usize>,
    live: usize,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node {
                    kind: NodeKind::Root,
                    path: None,
                    hidden: false,
                    parent: None,
                    children: Vec::new(),
                }),
            }],
            free: Vec::new(),
            live: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId {
            index: 0,
            generation: 0,
        }
    }

    /// Drop all content. Handles from before the clear stay unknown.
    pub fn clear(&mut self) {
        let root = self.root();
        self.clear_children(root);
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.live
    }

    /// Number of allocated slots, live or free
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.get(self.root())
            .map(|root| root.children.is_empty())
            .unwrap_or(true)
    }

    /// Attach a fragment under `parent`, at `position` or at the end
    pub fn attach(&mut self, parent: NodeId, position: Option<usize>, fragment: Fragment) -> NodeId {
        let id = self.insert_detached(Some(parent), fragment);
        if let Some(parent_node) = self.get_mut(parent) {
            match position {
                Some(pos) if pos < parent_node.children.len() => parent_node.children.insert(pos, id),
                _ => parent_node.children.push(id),
            }
        }
        id
    }

    fn insert_detached(&mut self, parent: Option<NodeId>, fragment: Fragment) -> NodeId {
        let node = Node {
            kind: fragment.kind,
            path: fragment.path,
            hidden: fragment.hidden,
            parent,
            children: Vec::new(),
        };
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };
        self.live += 1;
        let children: Vec<NodeId> = fragment
            .children
            .into_iter()
            .map(|child| self.insert_detached(Some(id), child))
            .collect();
        if let Some(node) = self.get_mut(id) {
            node.children = children;
        }
        id
    }

    /// Remove a node and its subtree. Returns false for unknown nodes and the root.
    pub fn detach(&mut self, id: NodeId) -> bool {
        if id == self.root() || !self.contains(id) {
            return false;
        }
        if let Some(parent) = self.get(id).and_then(|n| n.parent) {
            if let Some(parent_node) = self.get_mut(parent) {
                parent_node.children.retain(|c| *c != id);
            }
        }
        self.drop_subtree(id);
        true
    }

    fn drop_subtree(&mut self, id: NodeId) {
        let Some(slot) = self
            .slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
        else {
            return;
        };
        let Some(node) = slot.node.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        for child in node.children {
            self.drop_subtree(child);
        }
    }

    /// Remove every child of `id`
    pub fn clear_children(&mut self, id: NodeId) {
        let children = self
            .get_mut(id)
            .map(|n| std::mem::take(&mut n.children))
            .unwrap_or_default();
        for child in children {
            self.drop_subtree(child);
        }
    }

    /// Move `id` to `position` among its siblings
    pub fn move_within_parent(&mut self, id: NodeId, position: usize) -> bool {
        let Some(parent) = self.get(id).and_then(|n| n.parent) else {
            return false;
        };
        let Some(parent_node) = self.get_mut(parent) else {
            return false;
        };
        let Some(current) = parent_node.children.iter().position(|c| *c == id) else {
            return false;
        };
        if position >= parent_node.children.len() {
            return false;
        }
        let moved = parent_node.children.remove(current);
        parent_node.children.insert(position, moved);
        true
    }

    /// Whether `id` or any ancestor is hidden
    pub fn is_hidden(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.get(node_id) {
                Some(node) if node.hidden => return true,
                Some(node) => current = node.parent,
                None => return false,
            }
        }
        false
    }

    /// Nodes of the subtree rooted at `id`, in document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if let Some(node) = self.get(id) {
            out.push(id);
            for child in &node.children {
                self.collect_descendants(*child, out);
            }
        }
    }

    /// Whether reading the subtree at `id` produces at least one entry.
    /// Array items that produce none take no position in their array.
    fn yields_entry(&self, id: NodeId, include_hidden: bool) -> bool {
        let Some(node) = self.get(id) else {
            return false;
        };
        if node.hidden && !include_hidden {
            return false;
        }
        match &node.kind {
            NodeKind::Input(_)
            | NodeKind::Custom { .. }
            | NodeKind::Array { .. }
            | NodeKind::Item { keyed: true }
                if node.path.is_some() =>
            {
                true
            }
            _ => node
                .children
                .iter()
                .any(|child| self.yields_entry(*child, include_hidden)),
        }
    }

    /// Position of an item among the items of its array that read back
    fn item_position(&self, item: NodeId, include_hidden: bool) -> Option<usize> {
        let parent = self.get(item)?.parent?;
        self.get(parent)?
            .children
            .iter()
            .filter(|c| self.yields_entry(**c, include_hidden))
            .position(|c| *c == item)
    }

    /// Positions of the array items enclosing `id`, outermost first
    fn item_positions(&self, id: NodeId, include_hidden: bool) -> Option<Vec<usize>> {
        let mut positions = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.get(node_id)?;
            if matches!(node.kind, NodeKind::Item { .. }) {
                positions.push(self.item_position(node_id, include_hidden)?);
            }
            current = node.parent;
        }
        positions.reverse();
        Some(positions)
    }

    /// The node's path tag with its implicit positions resolved from document order
    pub fn resolved_path(&self, id: NodeId, include_hidden: bool) -> Option<FieldPath> {
        let path = self.get(id)?.path.clone()?;
        let positions = self.item_positions(id, include_hidden)?;
        Some(path.resolve(&positions))
    }

    /// Current value of the field at `id`, hidden content included
    pub fn field_value(&self, id: NodeId) -> Option<Value> {
        let path = self.resolved_path(id, true)?;
        let mut positions = self.item_positions(id, true)?;
        let mut entries = Vec::new();
        self.collect_entries(id, true, &mut positions, &mut entries);
        lookup(&assemble(&entries), path.segments())
    }

    /// Path-tagged values in document order
    pub fn entries(&self, include_hidden: bool) -> Vec<Entry> {
        let mut entries = Vec::new();
        let mut positions = Vec::new();
        self.collect_entries(self.root(), include_hidden, &mut positions, &mut entries);
        entries
    }

    fn collect_entries(
        &self,
        id: NodeId,
        include_hidden: bool,
        positions: &mut Vec<usize>,
        entries: &mut Vec<Entry>,
    ) {
        let Some(node) = self.get(id) else {
            return;
        };
        if node.hidden && !include_hidden {
            return;
        }

        let resolved = node.path.as_ref().map(|p| p.resolve(positions));
        match &node.kind {
            NodeKind::Input(input) => {
                if let Some(path) = resolved {
                    entries.push(Entry::leaf(path, input.read()));
                }
                return;
            }
            NodeKind::Custom { widget, .. } => {
                if let Some(path) = resolved {
                    entries.push(Entry::leaf(path, widget.value()));
                }
                return;
            }
            NodeKind::Array { .. } => {
                if let Some(path) = resolved {
                    entries.push(Entry::container(path, json!([])));
                }
                let mut index = 0;
                for child in &node.children {
                    if !self.yields_entry(*child, include_hidden) {
                        continue;
                    }
                    positions.push(index);
                    self.collect_entries(*child, include_hidden, positions, entries);
                    positions.pop();
                    index += 1;
                }
                return;
            }
            NodeKind::Item { keyed: true } => {
                if let Some(path) = resolved {
                    entries.push(Entry::container(path, json!({})));
                }
            }
            _ => {}
        }

        for child in &node.children {
            self.collect_entries(*child, include_hidden, positions, entries);
        }
    }

    /// First node whose tag matches `path`, written either with implicit
    /// (`tags[].value`) or resolved (`tags[1].value`) positions
    pub fn find_where<F>(&self, path: &str, accept: F) -> Option<NodeId>
    where
        F: Fn(&NodeKind) -> bool,
    {
        let wanted = FieldPath::parse(path);
        self.descendants(self.root()).into_iter().find(|id| {
            let Some(node) = self.get(*id) else {
                return false;
            };
            if !accept(&node.kind) {
                return false;
            }
            match &node.path {
                Some(tag) if *tag == wanted => true,
                Some(_) => self.resolved_path(*id, true).as_ref() == Some(&wanted),
                None => false,
            }
        })
    }

    /// Serializable view of the whole document
    pub fn snapshot(&self) -> NodeView {
        self.view(self.root())
            .unwrap_or_else(|| NodeView::empty(self.root()))
    }

    fn view(&self, id: NodeId) -> Option<NodeView> {
        let node = self.get(id)?;
        let content = match &node.kind {
            NodeKind::Root | NodeKind::Group => ViewKind::Group,
            NodeKind::Field { template, .. } => ViewKind::Field {
                label: template.label().map(str::to_string),
                hint: template.meta.hint.clone(),
                type_name: template.type_name().to_string(),
            },
            NodeKind::Array { sortable, .. } => ViewKind::Array {
                sortable: *sortable,
            },
            NodeKind::Item { .. } => ViewKind::Item,
            NodeKind::Input(input) => ViewKind::Input {
                kind: input.kind,
                raw: input.state.raw.clone(),
                checked: input.state.checked,
                options: input.options.clone(),
                disabled: input.disabled,
                placeholder: input.placeholder.clone(),
            },
            NodeKind::Custom { type_name, widget } => ViewKind::Custom {
                type_name: type_name.clone(),
                value: widget.value(),
            },
            NodeKind::Layout { kind, text } => ViewKind::Layout {
                kind: match kind {
                    LayoutKind::Header => "header",
                    LayoutKind::Description => "description",
                    LayoutKind::Rule => "hr",
                },
                text: text.clone(),
            },
        };
        Some(NodeView {
            id,
            node: node.kind.name(),
            path: node.path.as_ref().map(ToString::to_string),
            resolved: self.resolved_path(id, true).map(|p| p.to_string()),
            hidden: node.hidden,
            content,
            children: node.children.iter().filter_map(|c| self.view(*c)).collect(),
        })
    }
}

/// Owned, serializable copy of a node and its subtree
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub node: &'static str,
    pub path: Option<String>,
    pub resolved: Option<String>,
    pub hidden: bool,
    pub content: ViewKind,
    pub children: Vec<NodeView>,
}

impl NodeView {
    fn empty(id: NodeId) -> Self {
        Self {
            id,
            node: "root",
            path: None,
            resolved: None,
            hidden: false,
            content: ViewKind::Group,
            children: Vec::new(),
        }
    }

    /// This view and all descendants, in document order
    pub fn flatten(&self) -> Vec<&NodeView> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.flatten());
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewKind {
    Group,
    Field {
        label: Option<String>,
        hint: Option<String>,
        type_name: String,
    },
    Array {
        sortable: bool,
    },
    Item,
    Input {
        kind: InputKind,
        raw: String,
        checked: bool,
        options: Vec<SelectOption>,
        disabled: bool,
        placeholder: Option<String>,
    },
    Custom {
        type_name: String,
        value: Value,
    },
    Layout {
        kind: &'static str,
        text: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;
    use crate::input::format_value;

    fn input(path: &str, raw: &str) -> Fragment {
        let state = format_value(InputKind::String, &Value::String(raw.to_string()));
        Fragment::new(
            NodeKind::Input(InputNode {
                kind: InputKind::String,
                state,
                options: Vec::new(),
                format: None,
                trim: false,
                disabled: false,
                placeholder: None,
            }),
            Some(FieldPath::parse(path)),
        )
    }

    fn item(children: Vec<Fragment>) -> Fragment {
        Fragment::new(NodeKind::Item { keyed: true }, Some(FieldPath::parse("tags[]")))
            .with_children(children)
    }

    fn tags_document() -> (Document, NodeId) {
        let mut doc = Document::new();
        let array = Fragment::new(
            NodeKind::Array {
                children: Vec::new(),
                sortable: true,
            },
            Some(FieldPath::parse("tags")),
        )
        .with_children(vec![
            item(vec![input("tags[].value", "a")]),
            item(vec![input("tags[].value", "b")]),
        ]);
        let root = doc.root();
        doc.attach(root, None, input("name", "Al"));
        let array_id = doc.attach(root, None, array);
        (doc, array_id)
    }

    #[test]
    fn test_entries_resolve_item_positions() {
        let (doc, _) = tags_document();
        let value = assemble(&doc.entries(false));
        assert_eq!(value, json!({"name": "Al", "tags": [{"value": "a"}, {"value": "b"}]}));
    }

    #[test]
    fn test_move_reorders_read_back() {
        let (mut doc, array) = tags_document();
        let second = doc.get(array).unwrap().children()[1];
        assert!(doc.move_within_parent(second, 0));
        let value = assemble(&doc.entries(false));
        assert_eq!(value["tags"], json!([{"value": "b"}, {"value": "a"}]));
    }

    #[test]
    fn test_detach_drops_subtree() {
        let (mut doc, array) = tags_document();
        let before = doc.len();
        let first = doc.get(array).unwrap().children()[0];
        let leaf = doc.get(first).unwrap().children()[0];
        assert!(doc.detach(first));
        assert!(!doc.contains(leaf));
        assert_eq!(doc.len(), before - 2);
        assert!(!doc.detach(doc.root()));
    }

    #[test]
    fn test_hidden_item_is_skipped_and_not_counted() {
        let (mut doc, array) = tags_document();
        let first = doc.get(array).unwrap().children()[0];
        doc.get_mut(first).unwrap().hidden = true;

        assert_eq!(assemble(&doc.entries(false))["tags"], json!([{"value": "b"}]));
        assert_eq!(assemble(&doc.entries(true))["tags"].as_array().unwrap().len(), 2);

        let second = doc.get(array).unwrap().children()[1];
        let leaf = doc.get(second).unwrap().children()[0];
        assert_eq!(doc.resolved_path(leaf, false).unwrap().to_string(), "tags[0].value");
        assert_eq!(doc.resolved_path(leaf, true).unwrap().to_string(), "tags[1].value");
        assert!(doc.is_hidden(doc.get(first).unwrap().children()[0]));
    }

    #[test]
    fn test_hidden_unkeyed_item_takes_no_position() {
        let mut doc = Document::new();
        let unkeyed = |raw: &str| {
            Fragment::new(NodeKind::Item { keyed: false }, Some(FieldPath::parse("tags[]")))
                .with_children(vec![input("tags[]", raw)])
        };
        let array = Fragment::new(
            NodeKind::Array {
                children: Vec::new(),
                sortable: false,
            },
            Some(FieldPath::parse("tags")),
        )
        .with_children(vec![unkeyed("a"), unkeyed("b"), unkeyed("c")]);
        let root = doc.root();
        let array = doc.attach(root, None, array);

        let items = doc.get(array).unwrap().children().to_vec();
        let hidden = doc.get(items[1]).unwrap().children()[0];
        doc.get_mut(hidden).unwrap().hidden = true;

        assert_eq!(assemble(&doc.entries(false)), json!({"tags": ["a", "c"]}));
        assert_eq!(assemble(&doc.entries(true)), json!({"tags": ["a", "b", "c"]}));

        let last = doc.get(items[2]).unwrap().children()[0];
        assert_eq!(doc.resolved_path(last, false).unwrap().to_string(), "tags[1]");
        assert_eq!(doc.resolved_path(last, true).unwrap().to_string(), "tags[2]");
        assert_eq!(doc.field_value(hidden), Some(json!("b")));
    }

    #[test]
    fn test_slots_are_reused_and_old_handles_stay_unknown() {
        let (mut doc, array) = tags_document();
        let slots = doc.capacity();
        for _ in 0..1000 {
            doc.clear();
            let root = doc.root();
            doc.attach(root, None, input("name", "Al"));
        }
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.capacity(), slots);
        assert!(!doc.contains(array));
        assert_eq!(assemble(&doc.entries(false)), json!({"name": "Al"}));
    }

    #[test]
    fn test_find_by_resolved_or_tagged_path() {
        let (doc, _) = tags_document();
        let any = |_: &NodeKind| true;
        let second = doc.find_where("tags[1].value", any).unwrap();
        assert_eq!(doc.resolved_path(second, true).unwrap().to_string(), "tags[1].value");
        assert!(doc.find_where("tags[].value", any).is_some());
        assert!(doc.find_where("tags[5].value", any).is_none());
    }

    #[test]
    fn test_snapshot_flatten() {
        let (doc, _) = tags_document();
        let snapshot = doc.snapshot();
        let inputs: Vec<_> = snapshot
            .flatten()
            .into_iter()
            .filter(|v| v.node == "input")
            .filter_map(|v| v.resolved.clone())
            .collect();
        assert_eq!(inputs, vec!["name", "tags[0].value", "tags[1].value"]);
    }
}
