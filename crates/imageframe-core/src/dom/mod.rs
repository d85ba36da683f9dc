//! Editable document tree.
//!
//! An arena of element and text nodes standing in for the editor's
//! content-editable region. Removed nodes stay in the arena, detached, so
//! they can be re-inserted the way DOM nodes can. Every structural change
//! clears the selection and is queued for interested mutation observers.

mod html;
mod mutation;
mod selection;
mod style;

pub use html::{decode_entities, escape_attribute, escape_text, is_void, parse_fragment};
pub use mutation::{MutationBatch, MutationRecord, ObserveOptions, ObserverId};
pub use selection::{Boundary, Range};
pub use style::{Style, format_px, parse_px};

use crate::error::{Error, Result};
use crate::geometry::BoxMetrics;
use kurbo::Point;
use mutation::ObserverRegistry;
use serde::{Deserialize, Serialize};

/// Identifier of a node inside one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Element payload.
#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) tag: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) classes: Vec<String>,
    pub(crate) style: Style,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            classes: Vec::new(),
            style: Style::default(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

/// What a node holds.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Page position assigned by the host's layout, if any.
    flow_position: Option<Point>,
}

/// The editable content tree.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    selection: Option<Range>,
    observers: ObserverRegistry,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document whose root is the editable region.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            selection: None,
            observers: ObserverRegistry::default(),
        };
        let root = doc.create_element("div");
        if let Some(NodeKind::Element(element)) = doc.nodes.get_mut(root.0).map(|n| &mut n.kind) {
            element
                .attributes
                .push(("contenteditable".to_string(), "true".to_string()));
        }
        doc.root = root;
        doc
    }

    /// Create a document holding `html` inside its root.
    pub fn from_html(html: &str) -> Result<Self> {
        let mut doc = Self::new();
        let root = doc.root;
        doc.set_inner_html(root, html)?;
        Ok(doc)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(Error::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.0).ok_or(Error::UnknownNode(id))
    }

    fn element(&self, id: NodeId) -> Result<&Element> {
        match &self.node(id)?.kind {
            NodeKind::Element(element) => Ok(element),
            NodeKind::Text(_) => Err(Error::NotAnElement(id)),
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element(element) => Ok(element),
            NodeKind::Text(_) => Err(Error::NotAnElement(id)),
        }
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
            flow_position: None,
        });
        id
    }

    // --- Node creation and inspection ---

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(Element::new(tag)))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    pub fn exists(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Element(_)))
    }

    /// Lowercase tag name of an element.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).ok().map(|e| e.tag.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element(_) => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Whether `node` is `ancestor` or lies somewhere below it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether the node is attached below the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    /// All nodes below `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Nearest inclusive ancestor carrying `class`.
    pub fn closest_with_class(&self, id: NodeId, class: &str) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.has_class(node, class) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Descendants of `scope` carrying `class`, in document order.
    pub fn find_by_class(&self, scope: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&n| self.has_class(n, class))
            .collect()
    }

    /// Descendants of `scope` with the given tag, in document order.
    pub fn find_by_tag(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&n| self.tag(n) == Some(tag))
            .collect()
    }

    /// First descendant of `scope` whose `id` attribute equals `value`.
    pub fn find_by_id(&self, scope: NodeId, value: &str) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|&n| self.attribute(n, "id") == Some(value))
    }

    // --- Tree mutation ---

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference`, or last when `None`.
    ///
    /// A child that already has a parent is moved, which records a removal
    /// from its old parent first.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        self.element(parent)?;
        self.node(child)?;
        if self.contains(child, parent) {
            return Err(Error::InvalidHierarchy(child));
        }
        if let Some(reference) = reference {
            if reference == child || self.parent(reference) != Some(parent) {
                return Err(Error::InvalidHierarchy(reference));
            }
        }

        self.detach(child)?;
        let index = match reference {
            Some(reference) => self
                .index_in_parent(reference)
                .ok_or(Error::InvalidHierarchy(reference))?,
            None => self.children(parent).len(),
        };
        self.node_mut(parent)?.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        self.record(parent, vec![child], Vec::new());
        Ok(())
    }

    /// Remove a node from its parent. The node and its subtree stay usable.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        if self.node(id)?.parent.is_none() {
            return Err(Error::DetachedNode(id));
        }
        self.detach(id)
    }

    fn detach(&mut self, id: NodeId) -> Result<()> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|&c| c != id);
        self.node_mut(id)?.parent = None;
        self.record(parent, Vec::new(), vec![id]);
        Ok(())
    }

    /// Put `replacement` where `old` is and detach `old`.
    pub fn replace_with(&mut self, old: NodeId, replacement: NodeId) -> Result<()> {
        if old == replacement {
            return Ok(());
        }
        let parent = self.parent(old).ok_or(Error::DetachedNode(old))?;
        self.insert_before(parent, replacement, Some(old))?;
        self.remove(old)
    }

    /// Replace the children of `id` with the parsed `html`.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> Result<Vec<NodeId>> {
        self.element(id)?;
        let nodes = parse_fragment(self, html)?;
        for child in self.children(id).to_vec() {
            self.detach(child)?;
        }
        for &node in &nodes {
            self.append_child(id, node)?;
        }
        Ok(nodes)
    }

    /// Insert the parsed `html` at the start of the selection, splitting a
    /// text node if the caret sits inside one. Without a selection the
    /// content goes at the end of the root.
    pub fn insert_html_at_selection(&mut self, html: &str) -> Result<Vec<NodeId>> {
        let nodes = parse_fragment(self, html)?;
        let (parent, reference) = match self.selection.map(|range| range.start) {
            None => (self.root, None),
            Some(boundary) => match self.text(boundary.node).map(str::to_string) {
                None => {
                    self.element(boundary.node)?;
                    (
                        boundary.node,
                        self.children(boundary.node).get(boundary.offset).copied(),
                    )
                }
                Some(text) => {
                    let parent = self
                        .parent(boundary.node)
                        .ok_or(Error::DetachedNode(boundary.node))?;
                    let split = text
                        .char_indices()
                        .nth(boundary.offset)
                        .map_or(text.len(), |(at, _)| at);
                    let tail = text[split..].to_string();
                    if let NodeKind::Text(text) = &mut self.node_mut(boundary.node)?.kind {
                        text.truncate(split);
                    }
                    let next = self.next_sibling(boundary.node);
                    if tail.is_empty() {
                        (parent, next)
                    } else {
                        let tail = self.create_text(&tail);
                        self.insert_before(parent, tail, next)?;
                        (parent, Some(tail))
                    }
                }
            },
        };
        for &node in &nodes {
            self.insert_before(parent, node, reference)?;
        }
        Ok(nodes)
    }

    fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    fn record(&mut self, target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) {
        // Structural edits invalidate the editor selection, as in a browser.
        self.selection = None;
        let interested = self
            .observers
            .interested(target, |ancestor, node| self.contains(ancestor, node));
        if interested.is_empty() {
            return;
        }
        let record = MutationRecord {
            target,
            added,
            removed,
        };
        self.observers.enqueue(&interested, &record);
    }

    // --- Attributes, classes and style ---

    /// Plain attribute value. `class` and `style` are structured separately.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)
            .ok()?
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        self.element(id)
            .map(|e| e.attributes.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        let name = name.to_ascii_lowercase();
        let element = self.element_mut(id)?;
        match name.as_str() {
            "class" => {
                element.classes = value.split_whitespace().map(str::to_string).collect();
            }
            "style" => element.style = Style::parse(value),
            _ => match element.attributes.iter_mut().find(|(k, _)| *k == name) {
                Some(entry) => entry.1 = value.to_string(),
                None => element.attributes.push((name, value.to_string())),
            },
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<()> {
        let element = self.element_mut(id)?;
        match name {
            "class" => element.classes.clear(),
            "style" => element.style = Style::default(),
            _ => element.attributes.retain(|(k, _)| k != name),
        }
        Ok(())
    }

    pub fn classes(&self, id: NodeId) -> &[String] {
        self.element(id)
            .map(|e| e.classes.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<()> {
        let element = self.element_mut(id)?;
        if !element.classes.iter().any(|c| c == class) {
            element.classes.push(class.to_string());
        }
        Ok(())
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<()> {
        self.element_mut(id)?.classes.retain(|c| c != class);
        Ok(())
    }

    /// Keep only the classes for which `keep` returns true.
    pub fn retain_classes(&mut self, id: NodeId, mut keep: impl FnMut(&str) -> bool) -> Result<()> {
        self.element_mut(id)?.classes.retain(|c| keep(c));
        Ok(())
    }

    pub fn style(&self, id: NodeId) -> Option<&Style> {
        self.element(id).ok().map(|e| &e.style)
    }

    pub fn style_mut(&mut self, id: NodeId) -> Result<&mut Style> {
        Ok(&mut self.element_mut(id)?.style)
    }

    // --- Layout ---

    /// Pin the page position of a node laid out by the host (inline flow).
    pub fn set_flow_position(&mut self, id: NodeId, position: Point) -> Result<()> {
        self.node_mut(id)?.flow_position = Some(position);
        Ok(())
    }

    pub fn flow_position(&self, id: NodeId) -> Option<Point> {
        self.nodes.get(id.0).and_then(|n| n.flow_position)
    }

    pub fn clear_flow_position(&mut self, id: NodeId) -> Result<()> {
        self.node_mut(id)?.flow_position = None;
        Ok(())
    }

    /// Unrotated page position of a node's top-left corner.
    ///
    /// Nodes without a host-assigned flow position sit at their parent's
    /// position plus their own `left`/`top` offsets.
    pub fn page_position(&self, id: NodeId) -> Point {
        let Some(node) = self.nodes.get(id.0) else {
            return Point::ZERO;
        };
        if let Some(position) = node.flow_position {
            return position;
        }
        let offset = self.style(id).map(Style::position).unwrap_or(Point::ZERO);
        match node.parent {
            Some(parent) => self.page_position(parent) + offset.to_vec2(),
            None => offset,
        }
    }

    /// Box-model values from the inline style; unset sizes read as zero.
    pub fn box_metrics(&self, id: NodeId) -> Option<BoxMetrics> {
        let style = self.style(id)?;
        Some(BoxMetrics {
            width: style.width.unwrap_or(0.0),
            height: style.height.unwrap_or(0.0),
            padding: style.padding,
            border: style.border,
        })
    }

    // --- Selection ---

    pub fn selection(&self) -> Option<&Range> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, range: Option<Range>) {
        self.selection = range;
    }

    /// Select exactly `id` within its parent.
    pub fn select_node(&mut self, id: NodeId) -> Result<()> {
        let parent = self.parent(id).ok_or(Error::DetachedNode(id))?;
        let index = self.index_in_parent(id).ok_or(Error::DetachedNode(id))?;
        self.selection = Some(Range::around(parent, index));
        Ok(())
    }

    /// Whether `range` touches `id`: a boundary inside it or the range spanning it.
    pub fn range_touches(&self, range: &Range, id: NodeId) -> bool {
        if self.contains(id, range.start.node) || self.contains(id, range.end.node) {
            return true;
        }
        match (self.parent(id), self.index_in_parent(id)) {
            (Some(parent), Some(index)) => {
                range.start.node == parent
                    && range.end.node == parent
                    && range.start.offset <= index
                    && index < range.end.offset
            }
            _ => false,
        }
    }

    // --- Observation ---

    pub fn observe(&mut self, target: NodeId, options: ObserveOptions) -> ObserverId {
        self.observers.register(target, options)
    }

    /// Stop an observer. Records not yet taken for it are discarded.
    pub fn disconnect(&mut self, observer: ObserverId) -> bool {
        self.observers.unregister(observer)
    }

    pub fn is_observing(&self, observer: ObserverId) -> bool {
        self.observers.is_registered(observer)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn has_pending_mutations(&self) -> bool {
        self.observers.has_pending()
    }

    /// Deliver queued records: one batch per observer with pending records.
    pub fn take_mutation_batches(&mut self) -> Vec<MutationBatch> {
        self.observers.take_batches()
    }

    // --- Serialization ---

    /// Outer HTML of a node.
    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        html::write_node(self, id, &mut out);
        out
    }

    /// HTML of a node's children.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            html::write_node(self, child, &mut out);
        }
        out
    }
}
