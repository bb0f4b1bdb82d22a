use crate::node::{Namespace, NodeId};
use crate::parser::quirks::QuirksMode;
use crate::tokenizer::token::Attribute;
use quill_shared::character_reader::Span;
use url::Url;

/// TreeSink is the interface the tree builder uses to create and mutate the document tree.
///
/// Nodes are addressed by `NodeId`. The tree builder never holds on to node data itself: every
/// question it asks about a node (its name, namespace, parent) goes through this trait, so a
/// sink is free to store the tree in whatever shape it likes.
pub trait TreeSink {
    /// Returns the id of the document node. Doctypes and top level comments are appended to it.
    fn document(&self) -> NodeId;

    /// Create a new element node that is not attached to the tree yet. When an HTML `template`
    /// element is created, the sink must also create its template contents fragment.
    fn create_element(&mut self, name: &str, namespace: Namespace, attributes: &[Attribute], span: Span) -> NodeId;

    /// Create a new detached comment node
    fn create_comment(&mut self, data: &str, span: Span) -> NodeId;

    /// Create a new detached doctype node
    fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> NodeId;

    /// Append the (detached) child as the last child of parent
    fn append_child(&mut self, parent: NodeId, child: NodeId);

    /// Insert the (detached) child right before anchor, in anchor's parent
    fn insert_before(&mut self, anchor: NodeId, child: NodeId);

    /// Append text to parent. When the last child of parent is a text node, the text is merged into it.
    fn append_text(&mut self, parent: NodeId, text: &str);

    /// Insert text right before anchor. When the sibling before anchor is a text node, the text is
    /// merged into it.
    fn insert_text_before(&mut self, anchor: NodeId, text: &str);

    /// Detach the node from its parent. Does nothing for detached nodes.
    fn remove_from_parent(&mut self, node: NodeId);

    /// Move all children of `from` (in order) to the end of the children of `to`
    fn reparent_children(&mut self, from: NodeId, to: NodeId);

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Tag name of an element node, or an empty string for any other node
    fn element_name(&self, node: NodeId) -> &str;

    fn namespace(&self, node: NodeId) -> Namespace;

    fn attributes(&self, node: NodeId) -> &[Attribute];

    /// Add the given attributes to the element, skipping the ones it already has
    fn add_attributes_if_missing(&mut self, node: NodeId, attributes: &[Attribute]);

    /// The contents fragment of an HTML template element
    fn template_contents(&self, node: NodeId) -> Option<NodeId>;

    fn set_quirks_mode(&mut self, mode: QuirksMode);

    fn set_base_url(&mut self, url: Url);

    fn base_url(&self) -> Option<&Url>;

    /// Remembers the tag name as it was written in the source. Only called when tag case is
    /// preserved and the source spelling differs from the tag name.
    fn set_source_name(&mut self, _node: NodeId, _name: &str) {}
}
