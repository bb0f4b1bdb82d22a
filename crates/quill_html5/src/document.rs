//! Arena based document tree
//!
//! The `Document` is the tree the parser builds by default. All nodes live in a single vector and
//! refer to each other through `NodeId`s. Nodes are never freed during parsing: nodes that are
//! removed from the tree (for instance by the adoption agency algorithm) simply end up detached.
use crate::errors::ParseError;
use crate::node::{Namespace, NodeId};
use crate::parser::quirks::QuirksMode;
use crate::parser::tree_builder::TreeSink;
use crate::tokenizer::token::Attribute;
use quill_shared::character_reader::Span;
use url::Url;

/// Element specific data
#[derive(Clone, Debug, PartialEq)]
pub struct ElementData {
    /// Tag name (lowercased for HTML, case adjusted for SVG)
    pub name: String,
    pub namespace: Namespace,
    /// Attributes in source order
    pub attributes: Vec<Attribute>,
    /// Fragment node that holds the contents of a template element
    pub template_contents: Option<NodeId>,
    /// Tag name as written in the source, when tag case is preserved
    pub source_name: Option<String>,
    /// Span of the start tag that created this element
    pub span: Span,
}

impl ElementData {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeData {
    Document,
    DocumentFragment,
    DocType {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element(ElementData),
    Text(String),
    Comment(String),
}

/// A single node in the document arena
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

impl Node {
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    pub fn element_data(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(data) => Some(data),
            _ => None,
        }
    }
}

/// The document tree as produced by the parser
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    quirks_mode: QuirksMode,
    base_url: Option<Url>,
    errors: Vec<ParseError>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document that only holds the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                id: NodeId::root(),
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
            quirks_mode: QuirksMode::NoQuirks,
            base_url: None,
            errors: Vec::new(),
        }
    }

    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(node_id.as_usize())
    }

    fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(node_id.as_usize())
    }

    /// Number of nodes in the arena, detached nodes included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn children(&self, node_id: NodeId) -> &[NodeId] {
        self.node(node_id).map_or(&[], |node| node.children.as_slice())
    }

    /// Returns the first child element of the document (the `html` element)
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(NodeId::root())
            .iter()
            .copied()
            .find(|&id| self.node(id).is_some_and(Node::is_element))
    }

    /// Concatenation of all text nodes below the given node, in tree order. Template contents are
    /// not part of the tree and are skipped.
    pub fn text_content(&self, node_id: NodeId) -> String {
        let mut result = String::new();
        self.collect_text(node_id, &mut result);
        result
    }

    fn collect_text(&self, node_id: NodeId, result: &mut String) {
        let Some(node) = self.node(node_id) else {
            return;
        };

        if let NodeData::Text(value) = &node.data {
            result.push_str(value);
        }
        for &child in &node.children {
            self.collect_text(child, result);
        }
    }

    /// All elements with the given tag name in tree order
    pub fn elements_by_tag_name(&self, name: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![NodeId::root()];

        while let Some(node_id) = stack.pop() {
            let Some(node) = self.node(node_id) else {
                continue;
            };
            if node.element_data().is_some_and(|data| data.name == name) {
                found.push(node_id);
            }
            stack.extend(node.children.iter().rev());
        }

        found
    }

    /// Tag name of an element as it should be presented: the source spelling when tag case was
    /// preserved, otherwise the normalized name.
    pub fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.node(node_id)
            .and_then(Node::element_data)
            .map(|data| data.source_name.as_deref().unwrap_or(&data.name))
    }

    pub fn attribute(&self, node_id: NodeId, name: &str) -> Option<&str> {
        self.node(node_id)
            .and_then(Node::element_data)
            .and_then(|data| data.attribute(name))
    }

    /// Span of the start tag of an element, when source positions were tracked
    pub fn source_span(&self, node_id: NodeId) -> Option<Span> {
        self.node(node_id)
            .and_then(Node::element_data)
            .map(|data| data.span)
            .filter(|span| !span.is_empty())
    }

    pub fn quirks_mode(&self) -> QuirksMode {
        self.quirks_mode
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Parse errors found while building this document
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub(crate) fn set_errors(&mut self, errors: Vec<ParseError>) {
        self.errors = errors;
    }

    fn register(&mut self, data: NodeData) -> NodeId {
        let id = NodeId::from(self.nodes.len());
        self.nodes.push(Node {
            id,
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    fn position_in_parent(&self, node_id: NodeId) -> Option<(NodeId, usize)> {
        let parent_id = self.node(node_id)?.parent?;
        let position = self.children(parent_id).iter().position(|&id| id == node_id)?;
        Some((parent_id, position))
    }

    fn insert_at(&mut self, parent_id: NodeId, position: usize, child: NodeId) {
        self.remove_from_parent(child);

        if let Some(parent) = self.node_mut(parent_id) {
            let position = position.min(parent.children.len());
            parent.children.insert(position, child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent_id);
        }
    }

    /// Returns the text of the given node if it is a text node
    fn text_mut(&mut self, node_id: NodeId) -> Option<&mut String> {
        match &mut self.node_mut(node_id)?.data {
            NodeData::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl TreeSink for Document {
    fn document(&self) -> NodeId {
        NodeId::root()
    }

    fn create_element(&mut self, name: &str, namespace: Namespace, attributes: &[Attribute], span: Span) -> NodeId {
        let template_contents = if name == "template" && namespace == Namespace::Html {
            Some(self.register(NodeData::DocumentFragment))
        } else {
            None
        };

        self.register(NodeData::Element(ElementData {
            name: name.to_string(),
            namespace,
            attributes: attributes.to_vec(),
            template_contents,
            source_name: None,
            span,
        }))
    }

    fn create_comment(&mut self, data: &str, _span: Span) -> NodeId {
        self.register(NodeData::Comment(data.to_string()))
    }

    fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> NodeId {
        self.register(NodeData::DocType {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        })
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let position = self.children(parent).len();
        self.insert_at(parent, position, child);
    }

    fn insert_before(&mut self, anchor: NodeId, child: NodeId) {
        if let Some((parent_id, position)) = self.position_in_parent(anchor) {
            self.insert_at(parent_id, position, child);
        }
    }

    fn append_text(&mut self, parent: NodeId, text: &str) {
        if let Some(&last_id) = self.children(parent).last() {
            if let Some(value) = self.text_mut(last_id) {
                value.push_str(text);
                return;
            }
        }

        let node_id = self.register(NodeData::Text(text.to_string()));
        self.append_child(parent, node_id);
    }

    fn insert_text_before(&mut self, anchor: NodeId, text: &str) {
        let Some((parent_id, position)) = self.position_in_parent(anchor) else {
            return;
        };

        if position > 0 {
            let previous = self.children(parent_id)[position - 1];
            if let Some(value) = self.text_mut(previous) {
                value.push_str(text);
                return;
            }
        }

        let node_id = self.register(NodeData::Text(text.to_string()));
        self.insert_at(parent_id, position, node_id);
    }

    fn remove_from_parent(&mut self, node_id: NodeId) {
        let Some(parent_id) = self.node(node_id).and_then(|node| node.parent) else {
            return;
        };

        if let Some(parent) = self.node_mut(parent_id) {
            parent.children.retain(|&id| id != node_id);
        }
        if let Some(node) = self.node_mut(node_id) {
            node.parent = None;
        }
    }

    fn reparent_children(&mut self, from: NodeId, to: NodeId) {
        let children = match self.node_mut(from) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };

        for &child in &children {
            if let Some(node) = self.node_mut(child) {
                node.parent = Some(to);
            }
        }
        if let Some(node) = self.node_mut(to) {
            node.children.extend(children);
        }
    }

    fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.node(node_id).and_then(|node| node.parent)
    }

    fn element_name(&self, node_id: NodeId) -> &str {
        self.node(node_id)
            .and_then(Node::element_data)
            .map_or("", |data| data.name.as_str())
    }

    fn namespace(&self, node_id: NodeId) -> Namespace {
        self.node(node_id)
            .and_then(Node::element_data)
            .map_or(Namespace::Html, |data| data.namespace)
    }

    fn attributes(&self, node_id: NodeId) -> &[Attribute] {
        self.node(node_id)
            .and_then(Node::element_data)
            .map_or(&[], |data| data.attributes.as_slice())
    }

    fn add_attributes_if_missing(&mut self, node_id: NodeId, attributes: &[Attribute]) {
        let Some(Node {
            data: NodeData::Element(data),
            ..
        }) = self.node_mut(node_id)
        else {
            return;
        };

        for attr in attributes {
            if !data.attributes.iter().any(|existing| existing.name == attr.name) {
                data.attributes.push(attr.clone());
            }
        }
    }

    fn template_contents(&self, node_id: NodeId) -> Option<NodeId> {
        self.node(node_id)
            .and_then(Node::element_data)
            .and_then(|data| data.template_contents)
    }

    fn set_quirks_mode(&mut self, mode: QuirksMode) {
        self.quirks_mode = mode;
    }

    fn set_base_url(&mut self, url: Url) {
        self.base_url = Some(url);
    }

    fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    fn set_source_name(&mut self, node_id: NodeId, name: &str) {
        if let Some(Node {
            data: NodeData::Element(data),
            ..
        }) = self.node_mut(node_id)
        {
            data.source_name = Some(name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(doc: &mut Document, name: &str) -> NodeId {
        doc.create_element(name, Namespace::Html, &[], Span::default())
    }

    #[test]
    fn append_and_query() {
        let mut doc = Document::new();
        let html = element(&mut doc, "html");
        let body = element(&mut doc, "body");
        let p = element(&mut doc, "p");
        doc.append_child(doc.document(), html);
        doc.append_child(html, body);
        doc.append_child(body, p);
        doc.append_text(p, "foo ");
        doc.append_text(p, "bar");

        assert_eq!(doc.children(p).len(), 1);
        assert_eq!(doc.text_content(html), "foo bar");
        assert_eq!(doc.document_element(), Some(html));
        assert_eq!(doc.parent(p), Some(body));
        assert_eq!(doc.elements_by_tag_name("p"), vec![p]);
        assert_eq!(doc.tag_name(p), Some("p"));
        assert_eq!(doc.element_name(doc.document()), "");
    }

    #[test]
    fn insert_before_merges_text() {
        let mut doc = Document::new();
        let div = element(&mut doc, "div");
        let table = element(&mut doc, "table");
        doc.append_child(doc.document(), div);
        doc.append_text(div, "a");
        doc.append_child(div, table);
        doc.insert_text_before(table, "b");

        assert_eq!(doc.children(div).len(), 2);
        assert_eq!(doc.text_content(div), "ab");

        let b = element(&mut doc, "b");
        doc.insert_before(table, b);
        doc.insert_text_before(table, "c");
        assert_eq!(doc.children(div).len(), 4);
        assert_eq!(doc.children(div)[1], b);
    }

    #[test]
    fn move_nodes() {
        let mut doc = Document::new();
        let a = element(&mut doc, "a");
        let b = element(&mut doc, "b");
        let i = element(&mut doc, "i");
        doc.append_child(a, i);
        doc.append_text(a, "x");

        doc.reparent_children(a, b);
        assert!(doc.children(a).is_empty());
        assert_eq!(doc.children(b).len(), 2);
        assert_eq!(doc.parent(i), Some(b));

        doc.remove_from_parent(i);
        assert_eq!(doc.parent(i), None);
        assert_eq!(doc.children(b).len(), 1);

        // appending an attached node moves it
        doc.append_child(a, i);
        doc.append_child(b, i);
        assert!(doc.children(a).is_empty());
        assert_eq!(doc.parent(i), Some(b));
    }

    #[test]
    fn attributes() {
        let mut doc = Document::new();
        let node = doc.create_element("html", Namespace::Html, &[Attribute::new("lang", "en")], Span::default());
        doc.add_attributes_if_missing(node, &[Attribute::new("lang", "nl"), Attribute::new("dir", "ltr")]);

        assert_eq!(doc.attribute(node, "lang"), Some("en"));
        assert_eq!(doc.attribute(node, "dir"), Some("ltr"));
        assert_eq!(doc.attributes(node).len(), 2);
        assert_eq!(doc.source_span(node), None);
    }

    #[test]
    fn template_contents() {
        let mut doc = Document::new();
        let template = element(&mut doc, "template");
        let svg_template = doc.create_element("template", Namespace::Svg, &[], Span::default());

        let contents = doc.template_contents(template);
        assert!(contents.is_some());
        assert!(matches!(
            contents.and_then(|id| doc.node(id)).map(|node| &node.data),
            Some(NodeData::DocumentFragment)
        ));
        assert_eq!(doc.template_contents(svg_template), None);
    }

    #[test]
    fn source_names() {
        let mut doc = Document::new();
        let node = element(&mut doc, "div");
        doc.set_source_name(node, "DiV");

        assert_eq!(doc.tag_name(node), Some("DiV"));
        assert_eq!(doc.element_name(node), "div");
    }
}
