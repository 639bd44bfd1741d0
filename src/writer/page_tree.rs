//! Arena page tree with attribute inheritance.
//!
//! Nodes live in a flat vector and refer to each other by [`NodeId`]. Each
//! node stores its parent's index and its kids in order, so sibling queries
//! go through the parent's kid list. Pages read from an existing document
//! resolve `Resources`, `MediaBox`, `CropBox` and `Rotate` by walking parent
//! links until a value or the root is found.

use super::filters;
use super::serialization::DocumentId;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use std::collections::{HashMap, HashSet};

/// Page attributes a page may inherit from its ancestors.
pub const INHERITABLE_KEYS: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// Index of a node in a [`PageTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Intermediate or leaf node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// `/Type /Pages`
    Pages,
    /// `/Type /Page`
    Page,
}

/// One node of the tree.
#[derive(Debug, Clone)]
pub struct PageTreeNode {
    /// Node kind
    pub kind: NodeKind,
    /// Parent node, `None` for the root
    pub parent: Option<NodeId>,
    /// Children in document order
    pub kids: Vec<NodeId>,
    /// Own attributes (inheritable ones resolved one level)
    pub attributes: Dictionary,
    /// Reference in the source document
    pub source_ref: Option<ObjectRef>,
    /// Decoded content of a page node
    pub contents: Vec<u8>,
}

/// Arena of page tree nodes.
#[derive(Debug, Clone)]
pub struct PageTree {
    nodes: Vec<PageTreeNode>,
    source: Option<DocumentId>,
}

impl Default for PageTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PageTree {
    /// Tree holding only an empty root.
    pub fn new() -> Self {
        Self {
            nodes: vec![PageTreeNode {
                kind: NodeKind::Pages,
                parent: None,
                kids: Vec::new(),
                attributes: Dictionary::new(),
                source_ref: None,
                contents: Vec::new(),
            }],
            source: None,
        }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Document the tree was read from, if any.
    pub fn source(&self) -> Option<DocumentId> {
        self.source
    }

    /// Append a node under `parent`.
    pub fn add_node(&mut self, parent: NodeId, kind: NodeKind, attributes: Dictionary) -> Result<NodeId> {
        match self.nodes.get(parent.0) {
            Some(node) if node.kind == NodeKind::Pages => {},
            Some(_) => return Err(Error::InvalidArgument("a page node cannot have kids".to_string())),
            None => return Err(Error::InvalidArgument(format!("no node {}", parent.0))),
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(PageTreeNode {
            kind,
            parent: Some(parent),
            kids: Vec::new(),
            attributes,
            source_ref: None,
            contents: Vec::new(),
        });
        self.nodes[parent.0].kids.push(id);
        Ok(id)
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> Option<&PageTreeNode> {
        self.nodes.get(id.0)
    }

    /// Mutable node by id.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut PageTreeNode> {
        self.nodes.get_mut(id.0)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; the root exists from construction.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parent of `id`.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Kids of `id`.
    pub fn kids(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.kids.as_slice()).unwrap_or(&[])
    }

    /// Position of `id` in its parent's kid list.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.kids(parent).iter().position(|&k| k == id)
    }

    /// Other kids of the same parent, in order.
    pub fn siblings(&self, id: NodeId) -> Vec<NodeId> {
        match self.parent(id) {
            Some(parent) => self.kids(parent).iter().copied().filter(|&k| k != id).collect(),
            None => Vec::new(),
        }
    }

    /// The kid after `id` in its parent.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        self.kids(parent).get(idx + 1).copied()
    }

    /// The kid before `id` in its parent.
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        idx.checked_sub(1).and_then(|i| self.kids(parent).get(i).copied())
    }

    /// Value of `key` on `id` or its nearest ancestor that has it.
    pub fn inherited(&self, id: NodeId, key: &str) -> Option<&Object> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id)?;
            if let Some(value) = node.attributes.get(key) {
                return Some(value);
            }
            current = node.parent;
        }
        None
    }

    /// Leaf pages in document order.
    pub fn pages(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            match node.kind {
                NodeKind::Page => out.push(id),
                NodeKind::Pages => stack.extend(node.kids.iter().rev()),
            }
        }
        out
    }

    /// Build the tree from parsed objects, starting at the `/Pages` root.
    ///
    /// `/Kids` references are followed depth-first; a node reached twice is
    /// a [`Error::CircularReference`]. Inheritable attributes and page
    /// contents given by reference are resolved so the tree stands alone.
    pub fn from_objects(
        objects: &HashMap<ObjectRef, Object>,
        root: ObjectRef,
        source: DocumentId,
    ) -> Result<Self> {
        let mut tree = Self {
            nodes: Vec::new(),
            source: Some(source),
        };
        let mut visited = HashSet::new();
        tree.load_node(objects, root, None, &mut visited)?;
        if tree.nodes.first().map(|n| n.kind) != Some(NodeKind::Pages) {
            return Err(Error::InvalidPdf(format!("{} is not a /Pages node", root)));
        }
        log::debug!("page tree from {}: {} nodes, {} pages", source, tree.nodes.len(), tree.pages().len());
        Ok(tree)
    }

    fn load_node(
        &mut self,
        objects: &HashMap<ObjectRef, Object>,
        reference: ObjectRef,
        parent: Option<NodeId>,
        visited: &mut HashSet<ObjectRef>,
    ) -> Result<NodeId> {
        if !visited.insert(reference) {
            return Err(Error::CircularReference(reference));
        }
        let dict = objects
            .get(&reference)
            .and_then(|o| o.as_dict())
            .ok_or_else(|| Error::InvalidPdf(format!("page tree node {} is missing", reference)))?;

        let kind = match dict.get("Type").and_then(|t| t.as_name()) {
            Some("Pages") => NodeKind::Pages,
            Some("Page") => NodeKind::Page,
            // Some writers omit /Type; /Kids tells the two apart
            _ if dict.contains_key("Kids") => NodeKind::Pages,
            _ => NodeKind::Page,
        };

        let mut attributes = Dictionary::new();
        for key in INHERITABLE_KEYS {
            if let Some(value) = dict.get(key) {
                attributes.insert(key.to_string(), resolve_attribute(objects, key, value));
            }
        }
        for key in ["Annots", "AA"] {
            if let Some(value) = dict.get(key) {
                attributes.insert(key.to_string(), resolve(objects, value).clone());
            }
        }

        let contents = match kind {
            NodeKind::Page => page_contents(objects, dict.get("Contents"))?,
            NodeKind::Pages => Vec::new(),
        };

        let id = NodeId(self.nodes.len());
        self.nodes.push(PageTreeNode {
            kind,
            parent,
            kids: Vec::new(),
            attributes,
            source_ref: Some(reference),
            contents,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].kids.push(id);
        }

        if kind == NodeKind::Pages {
            let kids = dict
                .get("Kids")
                .map(|k| resolve(objects, k))
                .and_then(|k| k.as_array())
                .cloned()
                .unwrap_or_default();
            for kid in kids {
                let kid_ref = kid
                    .as_reference()
                    .ok_or_else(|| Error::InvalidPdf(format!("/Kids of {} holds a direct object", reference)))?;
                self.load_node(objects, kid_ref, Some(id), visited)?;
            }
        }
        Ok(id)
    }
}

fn resolve<'a>(objects: &'a HashMap<ObjectRef, Object>, value: &'a Object) -> &'a Object {
    match value {
        Object::Reference(r) => objects.get(r).unwrap_or(value),
        other => other,
    }
}

/// Resolve an inheritable attribute; resource sub-dictionaries are resolved
/// one more level so their names can be read.
fn resolve_attribute(objects: &HashMap<ObjectRef, Object>, key: &str, value: &Object) -> Object {
    let resolved = resolve(objects, value);
    match (key, resolved) {
        ("Resources", Object::Dictionary(dict)) => Object::Dictionary(
            dict.iter()
                .map(|(k, v)| {
                    let v = match resolve(objects, v) {
                        sub @ Object::Dictionary(_) => sub.clone(),
                        _ => v.clone(),
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        _ => resolved.clone(),
    }
}

fn page_contents(objects: &HashMap<ObjectRef, Object>, contents: Option<&Object>) -> Result<Vec<u8>> {
    let streams: Vec<&Object> = match contents.map(|c| resolve(objects, c)) {
        None => return Ok(Vec::new()),
        Some(Object::Array(items)) => items.iter().map(|i| resolve(objects, i)).collect(),
        Some(single) => vec![single],
    };

    let mut out = Vec::new();
    for stream in streams {
        match stream {
            Object::Stream { dict, data } => {
                out.extend(filters::decode(data, dict.get("Filter"))?);
                out.push(b'\n');
            },
            other => {
                return Err(Error::InvalidPdf(format!("page contents is a {}", other.type_name())));
            },
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(id: u32) -> ObjectRef {
        ObjectRef::new(id, 0)
    }

    fn dict(entries: Vec<(&str, Object)>) -> Object {
        Object::Dictionary(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    fn media_box(w: i64, h: i64) -> Object {
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(w),
            Object::Integer(h),
        ])
    }

    fn sample_objects() -> HashMap<ObjectRef, Object> {
        let mut objects = HashMap::new();
        objects.insert(
            r(1),
            dict(vec![
                ("Type", Object::Name("Pages".to_string())),
                ("Kids", Object::Array(vec![Object::Reference(r(2)), Object::Reference(r(3))])),
                ("MediaBox", media_box(612, 792)),
                ("Rotate", Object::Integer(90)),
                ("Resources", Object::Reference(r(10))),
            ]),
        );
        objects.insert(
            r(2),
            dict(vec![
                ("Type", Object::Name("Page".to_string())),
                ("Parent", Object::Reference(r(1))),
                ("Contents", Object::Reference(r(4))),
            ]),
        );
        objects.insert(
            r(3),
            dict(vec![
                ("Type", Object::Name("Page".to_string())),
                ("Parent", Object::Reference(r(1))),
                ("MediaBox", media_box(595, 842)),
            ]),
        );
        objects.insert(
            r(4),
            Object::Stream {
                dict: Dictionary::new(),
                data: bytes::Bytes::from_static(b"0 0 m 10 10 l S"),
            },
        );
        objects.insert(
            r(10),
            dict(vec![("Font", dict(vec![("F1", Object::Reference(r(11)))]))]),
        );
        objects
    }

    #[test]
    fn test_inheritance_walks_to_root() {
        let tree = PageTree::from_objects(&sample_objects(), r(1), DocumentId(1)).unwrap();
        let pages = tree.pages();
        assert_eq!(pages.len(), 2);

        let first = pages[0];
        assert_eq!(tree.inherited(first, "MediaBox").and_then(|m| m.as_rect()), Some([0.0, 0.0, 612.0, 792.0]));
        assert_eq!(tree.inherited(first, "Rotate").and_then(|r| r.as_integer()), Some(90));
        assert!(tree.inherited(first, "Resources").and_then(|r| r.as_dict()).is_some());
        assert!(tree.inherited(first, "CropBox").is_none());

        // Own value wins over the ancestor's
        let second = pages[1];
        assert_eq!(tree.inherited(second, "MediaBox").and_then(|m| m.as_rect()), Some([0.0, 0.0, 595.0, 842.0]));
    }

    #[test]
    fn test_contents_are_loaded() {
        let tree = PageTree::from_objects(&sample_objects(), r(1), DocumentId(1)).unwrap();
        let first = tree.pages()[0];
        assert_eq!(tree.node(first).unwrap().contents, b"0 0 m 10 10 l S\n".to_vec());
    }

    #[test]
    fn test_sibling_queries() {
        let tree = PageTree::from_objects(&sample_objects(), r(1), DocumentId(1)).unwrap();
        let pages = tree.pages();
        assert_eq!(tree.index_in_parent(pages[1]), Some(1));
        assert_eq!(tree.siblings(pages[0]), vec![pages[1]]);
        assert_eq!(tree.next_sibling(pages[0]), Some(pages[1]));
        assert_eq!(tree.previous_sibling(pages[0]), None);
        assert_eq!(tree.parent(pages[0]), Some(tree.root()));
    }

    #[test]
    fn test_cycle_is_detected() {
        let mut objects = sample_objects();
        objects.insert(
            r(3),
            dict(vec![
                ("Type", Object::Name("Pages".to_string())),
                ("Kids", Object::Array(vec![Object::Reference(r(1))])),
            ]),
        );
        let err = PageTree::from_objects(&objects, r(1), DocumentId(1)).unwrap_err();
        assert!(matches!(err, Error::CircularReference(rf) if rf == r(1)));
    }

    #[test]
    fn test_missing_node_is_invalid() {
        let mut objects = sample_objects();
        objects.remove(&r(3));
        assert!(matches!(
            PageTree::from_objects(&objects, r(1), DocumentId(1)),
            Err(Error::InvalidPdf(_))
        ));
    }

    #[test]
    fn test_built_tree() {
        let mut tree = PageTree::new();
        let root = tree.root();
        let section = tree.add_node(root, NodeKind::Pages, Dictionary::new()).unwrap();
        let a = tree.add_node(section, NodeKind::Page, Dictionary::new()).unwrap();
        let b = tree.add_node(root, NodeKind::Page, Dictionary::new()).unwrap();
        assert_eq!(tree.pages(), vec![a, b]);
        assert!(tree.add_node(a, NodeKind::Page, Dictionary::new()).is_err());
    }
}
