use crate::node::{is_known_html, is_special, Namespace, NodeId};
use crate::parser::tree_builder::TreeSink;
use crate::parser::{ActiveElement, Html5Parser, Scope};
use crate::tokenizer::token::{Attribute, Token};
use log::warn;
use quill_shared::character_reader::Span;

/// Number of identical elements that may be present in the active formatting elements after the last marker
const NOAHS_ARK_CAPACITY: usize = 3;

const ADOPTION_AGENCY_OUTER_LOOP_DEPTH: usize = 8;
const ADOPTION_AGENCY_INNER_LOOP_DEPTH: usize = 3;

/// Where a new node should be inserted
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum InsertionPosition {
    /// Append as the last child of the given node
    LastChild(NodeId),
    /// Insert right before the given sibling
    Before(NodeId),
}

impl<S: TreeSink> Html5Parser<'_, S> {
    /// Returns the appropriate place for inserting a node, taking foster parenting and template
    /// contents into account.
    pub(crate) fn appropriate_place_insert(&self, override_node: Option<NodeId>) -> InsertionPosition {
        let target = override_node.unwrap_or_else(|| self.current_node());

        let adjusted = if self.foster_parenting
            && self.sink.namespace(target) == Namespace::Html
            && ["table", "tbody", "tfoot", "thead", "tr"].contains(&self.node_name(target))
        {
            let last_template = self
                .open_elements
                .iter()
                .rposition(|&node_id| self.is_html_node(node_id, "template"));
            let last_table = self
                .open_elements
                .iter()
                .rposition(|&node_id| self.is_html_node(node_id, "table"));

            match (last_template, last_table) {
                (Some(template_idx), table_idx) if table_idx.map_or(true, |table_idx| template_idx > table_idx) => {
                    InsertionPosition::LastChild(self.open_elements[template_idx])
                }
                // fragment case
                (_, None) => InsertionPosition::LastChild(self.open_elements[0]),
                (_, Some(table_idx)) => {
                    let table = self.open_elements[table_idx];
                    if self.sink.parent(table).is_some() {
                        InsertionPosition::Before(table)
                    } else if table_idx > 0 {
                        InsertionPosition::LastChild(self.open_elements[table_idx - 1])
                    } else {
                        InsertionPosition::LastChild(table)
                    }
                }
            }
        } else {
            InsertionPosition::LastChild(target)
        };

        match adjusted {
            InsertionPosition::LastChild(node_id) if self.is_html_node(node_id, "template") => {
                match self.sink.template_contents(node_id) {
                    Some(contents) => InsertionPosition::LastChild(contents),
                    None => adjusted,
                }
            }
            _ => adjusted,
        }
    }

    /// Inserts the (detached) node at the given position
    fn insert_at(&mut self, position: InsertionPosition, node_id: NodeId) {
        match position {
            InsertionPosition::LastChild(parent) => self.sink.append_child(parent, node_id),
            InsertionPosition::Before(anchor) => self.sink.insert_before(anchor, node_id),
        }
    }

    /// Inserts an HTML element for the given start tag token and pushes it onto the open elements
    pub(crate) fn insert_html_element(&mut self, token: &Token) -> NodeId {
        self.insert_foreign_element(token, Namespace::Html)
    }

    /// Inserts an element in the given namespace for the given start tag token and pushes it onto the open elements
    pub(crate) fn insert_foreign_element(&mut self, token: &Token, namespace: Namespace) -> NodeId {
        let Token::StartTag {
            name,
            raw_name,
            attributes,
            span,
            ..
        } = token
        else {
            // Only start tags create elements
            warn!("trying to insert an element for {}", token.kind());
            return self.current_node();
        };

        let span = if self.track_source_positions {
            *span
        } else {
            Span::default()
        };

        let node_id = self.insert_element(name, namespace, attributes, span);
        if self.preserve_tag_case && raw_name != name && !raw_name.is_empty() {
            self.sink.set_source_name(node_id, raw_name);
        }

        node_id
    }

    /// Creates an element, inserts it at the appropriate place and pushes it onto the open elements
    fn insert_element(&mut self, name: &str, namespace: Namespace, attributes: &[Attribute], span: Span) -> NodeId {
        let node_id = self.sink.create_element(name, namespace, attributes, span);

        self.make_room_for_element();
        let position = self.appropriate_place_insert(None);
        self.insert_at(position, node_id);

        self.open_elements.push(node_id);
        node_id
    }

    /// Closes the current node when the open elements reached the maximum depth, so the new element
    /// becomes its sibling instead of its child
    fn make_room_for_element(&mut self) {
        if self.open_elements.len() < self.max_depth {
            return;
        }

        if !self.depth_truncated {
            warn!("open element stack reached its maximum depth of {}", self.max_depth);
            self.depth_truncated = true;
        }
        if self.open_elements.len() > 1 {
            self.open_elements.pop();
        }
    }

    /// Creates a new detached element with the same name, namespace and attributes as the given element
    fn clone_element(&mut self, node_id: NodeId) -> NodeId {
        let name = self.node_name(node_id).to_string();
        let namespace = self.sink.namespace(node_id);
        let attributes = self.sink.attributes(node_id).to_vec();

        self.sink.create_element(&name, namespace, &attributes, Span::default())
    }

    /// Inserts the html (root) element and pushes it onto the open elements
    pub(crate) fn insert_document_element(&mut self, token: &Token) {
        let (attributes, span) = match token {
            Token::StartTag { attributes, span, .. } => (attributes.as_slice(), *span),
            _ => (&[][..], Span::default()),
        };
        let span = if self.track_source_positions {
            span
        } else {
            Span::default()
        };

        let node_id = self.sink.create_element("html", Namespace::Html, attributes, span);
        let document = self.sink.document();
        self.sink.append_child(document, node_id);

        self.open_elements.push(node_id);
    }

    /// Inserts a comment at the given parent, or at the appropriate place when no parent is given
    pub(crate) fn insert_comment_element(&mut self, token: &Token, parent: Option<NodeId>) {
        let Token::Comment { comment, span, .. } = token else {
            return;
        };

        let node_id = self.sink.create_comment(comment, *span);
        let position = match parent {
            Some(parent) => InsertionPosition::LastChild(parent),
            None => self.appropriate_place_insert(None),
        };
        self.insert_at(position, node_id);
    }

    /// Inserts the characters of the text token at the appropriate place
    pub(crate) fn insert_text_element(&mut self, token: &Token) {
        let Token::Text { text, .. } = token else {
            return;
        };

        if text.is_empty() {
            return;
        }

        self.insert_text(text);
    }

    pub(crate) fn insert_text(&mut self, text: &str) {
        match self.appropriate_place_insert(None) {
            // Text is never inserted directly into the document
            InsertionPosition::LastChild(parent) if parent == self.sink.document() => {}
            InsertionPosition::LastChild(parent) => self.sink.append_text(parent, text),
            InsertionPosition::Before(anchor) => self.sink.insert_text_before(anchor, text),
        }
    }

    /// Appends the doctype node to the document
    pub(crate) fn insert_doctype_element(&mut self, token: &Token) {
        let Token::DocType {
            name,
            pub_identifier,
            sys_identifier,
            ..
        } = token
        else {
            return;
        };

        let node_id = self.sink.create_doctype(
            name.as_deref().unwrap_or_default(),
            pub_identifier.as_deref().unwrap_or_default(),
            sys_identifier.as_deref().unwrap_or_default(),
        );
        let document = self.sink.document();
        self.sink.append_child(document, node_id);
    }

    /// Inserts an element for a start tag in the in-body "any other start tag" case
    pub(crate) fn insert_ordinary_element(&mut self) {
        self.reconstruct_formatting();

        let token = self.current_token.clone();
        self.insert_html_element(&token);

        if let Token::StartTag {
            name, is_self_closing, ..
        } = &token
        {
            // Unknown elements are allowed to close themselves
            if *is_self_closing && !is_known_html(name) {
                self.open_elements.pop();
                self.acknowledge_closing_tag(*is_self_closing);
            }
        }
    }

    /// Returns true when both elements have the same name, namespace and attributes
    fn same_element(&self, a: NodeId, b: NodeId) -> bool {
        if self.node_name(a) != self.node_name(b) || self.sink.namespace(a) != self.sink.namespace(b) {
            return false;
        }

        let attrs_a = self.sink.attributes(a);
        let attrs_b = self.sink.attributes(b);
        attrs_a.len() == attrs_b.len() && attrs_a.iter().all(|attr| attrs_b.contains(attr))
    }

    /// Pushes the element onto the active formatting elements. When there are already three
    /// identical elements after the last marker, the earliest of them is removed first.
    pub(crate) fn active_formatting_elements_push(&mut self, node_id: NodeId) {
        let mut matches = vec![];
        for (idx, elem) in self.active_formatting_elements.iter().enumerate().rev() {
            match elem {
                ActiveElement::Marker => break,
                ActiveElement::Node(other) if self.same_element(*other, node_id) => matches.push(idx),
                ActiveElement::Node(_) => {}
            }
        }

        if matches.len() >= NOAHS_ARK_CAPACITY {
            if let Some(&earliest) = matches.last() {
                self.active_formatting_elements.remove(earliest);
            }
        }

        self.active_formatting_elements.push(ActiveElement::Node(node_id));
    }

    pub(crate) fn active_formatting_elements_push_marker(&mut self) {
        self.active_formatting_elements.push(ActiveElement::Marker);
    }

    /// Removes entries up to and including the last marker
    pub(crate) fn active_formatting_elements_clear_until_marker(&mut self) {
        while let Some(active_elem) = self.active_formatting_elements.pop() {
            if active_elem == ActiveElement::Marker {
                break;
            }
        }
    }

    /// Returns the last element with the given name between the end of the list and the last marker
    pub(crate) fn active_formatting_elements_has_until_marker(&self, tag: &str) -> Option<NodeId> {
        for elem in self.active_formatting_elements.iter().rev() {
            match elem {
                ActiveElement::Marker => return None,
                ActiveElement::Node(node_id) if self.is_html_node(*node_id, tag) => return Some(*node_id),
                ActiveElement::Node(_) => {}
            }
        }

        None
    }

    pub(crate) fn active_formatting_elements_remove(&mut self, target_node_id: NodeId) {
        self.active_formatting_elements
            .retain(|elem| *elem != ActiveElement::Node(target_node_id));
    }

    fn active_formatting_elements_position(&self, target_node_id: NodeId) -> Option<usize> {
        self.active_formatting_elements
            .iter()
            .position(|elem| *elem == ActiveElement::Node(target_node_id))
    }

    /// Reconstruct the active formatting elements
    pub(crate) fn reconstruct_formatting(&mut self) {
        // 1.
        let Some(last) = self.active_formatting_elements.last().copied() else {
            return;
        };

        // 2.
        let is_marker_or_open = |parser: &Self, elem: ActiveElement| match elem {
            ActiveElement::Marker => true,
            ActiveElement::Node(node_id) => parser.open_elements.contains(&node_id),
        };
        if is_marker_or_open(self, last) {
            return;
        }

        // 3. - 6. Rewind
        let mut idx = self.active_formatting_elements.len() - 1;
        while idx > 0 && !is_marker_or_open(self, self.active_formatting_elements[idx - 1]) {
            idx -= 1;
        }

        // 7. - 10. Advance and create
        for entry_idx in idx..self.active_formatting_elements.len() {
            let Some(entry_node_id) = self.active_formatting_elements[entry_idx].node_id() else {
                continue;
            };

            let name = self.node_name(entry_node_id).to_string();
            let namespace = self.sink.namespace(entry_node_id);
            let attributes = self.sink.attributes(entry_node_id).to_vec();

            let new_node_id = self.insert_element(&name, namespace, &attributes, Span::default());
            self.active_formatting_elements[entry_idx] = ActiveElement::Node(new_node_id);
        }
    }

    /// Runs the adoption agency algorithm for the given (end tag) subject
    pub(crate) fn run_adoption_agency(&mut self, subject: &str) {
        // 2.
        let current_node_id = self.current_node();
        if self.is_html_node(current_node_id, subject)
            && self.active_formatting_elements_position(current_node_id).is_none()
        {
            self.open_elements.pop();
            return;
        }

        // 3. / 4.
        for _ in 0..ADOPTION_AGENCY_OUTER_LOOP_DEPTH {
            // 4.3
            let Some(formatting_element_id) = self.active_formatting_elements_has_until_marker(subject) else {
                self.handle_in_body_any_other_end_tag(subject);
                return;
            };

            // 4.4
            let Some(formatting_element_idx) = self
                .open_elements
                .iter()
                .position(|&node_id| node_id == formatting_element_id)
            else {
                self.parse_error("formatting element not in open elements");
                self.active_formatting_elements_remove(formatting_element_id);
                return;
            };

            // 4.5
            if !self.is_node_in_scope(formatting_element_id, Scope::Regular) {
                self.parse_error("formatting element not in scope");
                return;
            }

            // 4.6
            if formatting_element_id != self.current_node() {
                self.parse_error(&format!("end tag </{subject}> does not close the current node"));
            }

            // 4.7
            let furthest_block = self.open_elements[formatting_element_idx + 1..]
                .iter()
                .position(|&node_id| is_special(self.node_name(node_id), self.sink.namespace(node_id)))
                .map(|idx| idx + formatting_element_idx + 1);

            // 4.8
            let Some(furthest_block_idx) = furthest_block else {
                self.pop_until_node(formatting_element_id);
                self.active_formatting_elements_remove(formatting_element_id);
                return;
            };
            let furthest_block_id = self.open_elements[furthest_block_idx];

            // 4.9
            let Some(common_ancestor_id) = formatting_element_idx
                .checked_sub(1)
                .map(|idx| self.open_elements[idx])
            else {
                return;
            };

            // 4.10
            let Some(mut bookmark) = self.active_formatting_elements_position(formatting_element_id) else {
                return;
            };

            // 4.11
            let mut node_idx = furthest_block_idx;
            let mut last_node_id = furthest_block_id;

            // 4.12 / 4.13
            let mut inner_loop_counter = 0;
            loop {
                inner_loop_counter += 1;

                // 4.13.2 / 4.13.3
                node_idx -= 1;
                let node_id = self.open_elements[node_idx];

                // 4.13.4
                if node_id == formatting_element_id {
                    break;
                }

                // 4.13.5
                let mut node_active_idx = self.active_formatting_elements_position(node_id);
                if inner_loop_counter > ADOPTION_AGENCY_INNER_LOOP_DEPTH {
                    if let Some(idx) = node_active_idx {
                        self.active_formatting_elements.remove(idx);
                        if idx < bookmark {
                            bookmark -= 1;
                        }
                        node_active_idx = None;
                    }
                }

                // 4.13.6
                let Some(node_active_idx) = node_active_idx else {
                    self.open_elements.remove(node_idx);
                    continue;
                };

                // 4.13.7
                let new_node_id = self.clone_element(node_id);
                self.active_formatting_elements[node_active_idx] = ActiveElement::Node(new_node_id);
                self.open_elements[node_idx] = new_node_id;

                // 4.13.8
                if last_node_id == furthest_block_id {
                    bookmark = node_active_idx + 1;
                }

                // 4.13.9
                self.sink.remove_from_parent(last_node_id);
                self.sink.append_child(new_node_id, last_node_id);

                // 4.13.10
                last_node_id = new_node_id;
            }

            // 4.14
            self.sink.remove_from_parent(last_node_id);
            let position = self.appropriate_place_insert(Some(common_ancestor_id));
            self.insert_at(position, last_node_id);

            // 4.15
            let new_element_id = self.clone_element(formatting_element_id);

            // 4.16
            self.sink.reparent_children(furthest_block_id, new_element_id);

            // 4.17
            self.sink.append_child(furthest_block_id, new_element_id);

            // 4.18
            if let Some(idx) = self.active_formatting_elements_position(formatting_element_id) {
                self.active_formatting_elements.remove(idx);
                if idx < bookmark {
                    bookmark -= 1;
                }
            }
            let bookmark = bookmark.min(self.active_formatting_elements.len());
            self.active_formatting_elements
                .insert(bookmark, ActiveElement::Node(new_element_id));

            // 4.19
            self.open_elements_remove(formatting_element_id);
            let furthest_block_idx = self
                .open_elements
                .iter()
                .position(|&node_id| node_id == furthest_block_id)
                .unwrap_or(self.open_elements.len() - 1);
            self.open_elements.insert(furthest_block_idx + 1, new_element_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::errors::ParseErrorList;
    use crate::parser::Html5ParserOptions;
    use crate::tokenizer::Tokenizer;
    use core::cell::RefCell;
    use quill_shared::character_reader::CharacterReader;
    use std::rc::Rc;

    fn parser_with<'a>(stream: &'a mut CharacterReader, doc: &'a mut Document) -> Html5Parser<'a, Document> {
        let options = Html5ParserOptions::default();
        let error_logger = Rc::new(RefCell::new(ParseErrorList::new(10)));
        let tokenizer = Tokenizer::new(stream, None, error_logger.clone());
        Html5Parser::init(tokenizer, doc, error_logger, &options)
    }

    fn start_tag(name: &str, attributes: Vec<Attribute>) -> Token {
        Token::StartTag {
            name: name.to_string(),
            raw_name: name.to_string(),
            is_self_closing: false,
            attributes,
            span: Span::default(),
        }
    }

    #[test]
    fn noahs_ark() {
        let stream = &mut CharacterReader::new("");
        let doc = &mut Document::new();
        let mut parser = parser_with(stream, doc);

        parser.insert_document_element(&start_tag("html", vec![]));
        for _ in 0..5 {
            let node_id = parser.insert_html_element(&start_tag("b", vec![Attribute::new("class", "x")]));
            parser.active_formatting_elements_push(node_id);
        }
        assert_eq!(parser.active_formatting_elements.len(), 3);

        // Other attributes make it a different element
        let node_id = parser.insert_html_element(&start_tag("b", vec![Attribute::new("class", "y")]));
        parser.active_formatting_elements_push(node_id);
        assert_eq!(parser.active_formatting_elements.len(), 4);

        // A marker starts a new region
        parser.active_formatting_elements_push_marker();
        let node_id = parser.insert_html_element(&start_tag("b", vec![Attribute::new("class", "x")]));
        parser.active_formatting_elements_push(node_id);
        assert_eq!(parser.active_formatting_elements.len(), 6);

        parser.active_formatting_elements_clear_until_marker();
        assert_eq!(parser.active_formatting_elements.len(), 4);
        assert!(parser.active_formatting_elements_has_until_marker("b").is_some());
        assert!(parser.active_formatting_elements_has_until_marker("i").is_none());
    }

    #[test]
    fn reconstruct_formatting() {
        let stream = &mut CharacterReader::new("");
        let doc = &mut Document::new();
        let mut parser = parser_with(stream, doc);

        parser.insert_document_element(&start_tag("html", vec![]));
        let body = parser.insert_html_element(&start_tag("body", vec![]));
        let b = parser.insert_html_element(&start_tag("b", vec![]));
        parser.active_formatting_elements_push(b);
        let i = parser.insert_html_element(&start_tag("i", vec![]));
        parser.active_formatting_elements_push(i);

        parser.open_elements.truncate(2);
        parser.reconstruct_formatting();

        assert_eq!(parser.open_elements.len(), 4);
        let new_b = parser.open_elements[2];
        let new_i = parser.open_elements[3];
        assert_ne!(new_b, b);
        assert_eq!(parser.sink.element_name(new_b), "b");
        assert_eq!(parser.sink.element_name(new_i), "i");
        assert_eq!(parser.sink.parent(new_b), Some(body));
        assert_eq!(parser.sink.parent(new_i), Some(new_b));
        assert_eq!(
            parser.active_formatting_elements,
            vec![ActiveElement::Node(new_b), ActiveElement::Node(new_i)]
        );
    }

    #[test]
    fn foster_parenting_place() {
        let stream = &mut CharacterReader::new("");
        let doc = &mut Document::new();
        let mut parser = parser_with(stream, doc);

        parser.insert_document_element(&start_tag("html", vec![]));
        let body = parser.insert_html_element(&start_tag("body", vec![]));
        let table = parser.insert_html_element(&start_tag("table", vec![]));

        assert_eq!(parser.appropriate_place_insert(None), InsertionPosition::LastChild(table));

        parser.foster_parenting = true;
        assert_eq!(parser.appropriate_place_insert(None), InsertionPosition::Before(table));

        parser.sink.remove_from_parent(table);
        assert_eq!(parser.appropriate_place_insert(None), InsertionPosition::LastChild(body));
    }

    #[test]
    fn template_contents_place() {
        let stream = &mut CharacterReader::new("");
        let doc = &mut Document::new();
        let mut parser = parser_with(stream, doc);

        parser.insert_document_element(&start_tag("html", vec![]));
        let template = parser.insert_html_element(&start_tag("template", vec![]));
        let contents = parser.sink.template_contents(template);

        assert!(contents.is_some());
        assert_eq!(
            Some(parser.appropriate_place_insert(None)),
            contents.map(InsertionPosition::LastChild)
        );
    }

    #[test]
    fn max_depth() {
        let stream = &mut CharacterReader::new("");
        let doc = &mut Document::new();
        let mut parser = parser_with(stream, doc);
        parser.max_depth = 4;

        parser.insert_document_element(&start_tag("html", vec![]));
        for _ in 0..10 {
            parser.insert_html_element(&start_tag("div", vec![]));
        }

        assert_eq!(parser.open_elements.len(), 4);
        assert!(parser.depth_truncated);
    }
}
