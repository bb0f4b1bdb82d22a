use crate::node::{Namespace, NodeId};
use crate::parser::attr_replacements::{
    MATHML_ADJUSTMENTS, SVG_ADJUSTMENTS_ATTRIBUTES, SVG_ADJUSTMENTS_TAGS, XML_ADJUSTMENTS,
};
use crate::parser::tree_builder::TreeSink;
use crate::parser::{DispatcherMode, Html5Parser};
use crate::tokenizer::token::Token;
use crate::tokenizer::CHAR_REPLACEMENT;

/// HTML start tags that break out of foreign content
const BREAKOUT_TAGS: [&str; 44] = [
    "b",
    "big",
    "blockquote",
    "body",
    "br",
    "center",
    "code",
    "dd",
    "div",
    "dl",
    "dt",
    "em",
    "embed",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "head",
    "hr",
    "i",
    "img",
    "li",
    "listing",
    "menu",
    "meta",
    "nobr",
    "ol",
    "p",
    "pre",
    "ruby",
    "s",
    "small",
    "span",
    "strong",
    "strike",
    "sub",
    "sup",
    "table",
    "tt",
    "u",
    "ul",
    "var",
];

impl<S: TreeSink> Html5Parser<'_, S> {
    /// Process a token in foreign (SVG or MathML) content
    pub(crate) fn process_foreign_content(&mut self) {
        let token = self.current_token.clone();
        match &token {
            Token::Text { text: value, .. } if self.current_token.is_mixed() => {
                self.requeue_split_token(value);
            }
            Token::Text { text: value, .. } if self.current_token.is_null() => {
                self.parse_error("null character not allowed in foreign content");

                let replaced = value.replace('\0', &CHAR_REPLACEMENT.to_string());
                self.insert_text(&replaced);
            }
            Token::Text { .. } if self.current_token.is_empty_or_white() => {
                self.insert_text_element(&token);
            }
            Token::Text { .. } => {
                self.insert_text_element(&token);

                self.frameset_ok = false;
            }
            Token::Comment { .. } => {
                self.insert_comment_element(&token, None);
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in foreign content");
                // ignore token
            }
            Token::StartTag { name, .. } if BREAKOUT_TAGS.contains(&name.as_str()) => {
                self.process_unexpected_html_tag();
            }
            Token::StartTag { name, attributes, .. }
                if name == "font"
                    && attributes
                        .iter()
                        .any(|attr| ["color", "face", "size"].contains(&attr.name.as_str())) =>
            {
                self.process_unexpected_html_tag();
            }
            Token::EndTag { name, .. } if name == "br" || name == "p" => {
                self.process_unexpected_html_tag();
            }
            Token::StartTag { is_self_closing, .. } => {
                let mut current_token = token.clone();

                let adjusted_node_id = self.adjusted_current_node();
                let namespace = self.sink.namespace(adjusted_node_id);
                if namespace == Namespace::MathMl {
                    self.adjust_mathml_attributes(&mut current_token);
                }
                if namespace == Namespace::Svg {
                    self.adjust_svg_tag_names(&mut current_token);
                    self.adjust_svg_attributes(&mut current_token);
                }
                self.adjust_foreign_attributes(&mut current_token);

                self.insert_foreign_element(&current_token, namespace);

                // A self-closing svg script is handled as if its end tag was seen directly
                if *is_self_closing {
                    self.open_elements.pop();
                    self.acknowledge_closing_tag(*is_self_closing);
                }
            }
            Token::EndTag { name, .. }
                if name == "script" && self.current_node_is_foreign(Namespace::Svg, "script") =>
            {
                self.open_elements.pop();
            }
            Token::EndTag { name, .. } => {
                self.process_foreign_end_tag(name);
            }
            Token::Eof { .. } => {
                // The dispatcher always hands end of file to the HTML rules
                self.process_html_content();
            }
        }
    }

    /// Any other end tag in foreign content. Pops until an element with the same (lowercased)
    /// name, or hands the token to the HTML rules once an HTML element is reached.
    fn process_foreign_end_tag(&mut self, name: &str) {
        let Some(mut node_idx) = self.open_elements.len().checked_sub(1) else {
            return;
        };

        let mut node_id = self.open_elements[node_idx];
        if self.node_name(node_id).to_ascii_lowercase() != name {
            self.parse_error(&format!("end tag </{name}> does not match the current node"));
        }

        loop {
            // fragment case
            if node_idx == 0 {
                return;
            }

            if self.node_name(node_id).to_ascii_lowercase() == name {
                self.pop_until_node(node_id);
                return;
            }

            node_idx -= 1;
            node_id = self.open_elements[node_idx];

            if self.sink.namespace(node_id) != Namespace::Html {
                continue;
            }

            self.process_html_content();
            return;
        }
    }

    /// Pops foreign elements until an integration point or an HTML element is reached, and
    /// processes the token with the HTML rules.
    fn process_unexpected_html_tag(&mut self) {
        self.parse_error(&format!("{} not allowed in foreign content", self.current_token.kind()));

        while !self.open_elements.is_empty() {
            let node_id = self.current_node();
            if self.is_mathml_text_integration_point(node_id)
                || self.is_html_integration_point(node_id)
                || self.sink.namespace(node_id) == Namespace::Html
            {
                break;
            }

            self.open_elements.pop();
        }

        self.process_html_content();
    }

    fn current_node_is_foreign(&self, namespace: Namespace, name: &str) -> bool {
        let current = self.current_node();
        self.sink.namespace(current) == namespace && self.node_name(current) == name
    }

    /// Returns true when the node is a MathML text integration point
    pub(crate) fn is_mathml_text_integration_point(&self, node_id: NodeId) -> bool {
        self.sink.namespace(node_id) == Namespace::MathMl
            && ["mi", "mo", "mn", "ms", "mtext"].contains(&self.node_name(node_id))
    }

    /// Returns true when the node is an HTML integration point
    pub(crate) fn is_html_integration_point(&self, node_id: NodeId) -> bool {
        match self.sink.namespace(node_id) {
            Namespace::MathMl if self.node_name(node_id) == "annotation-xml" => self
                .sink
                .attributes(node_id)
                .iter()
                .find(|attr| attr.namespace.is_none() && attr.name.eq_ignore_ascii_case("encoding"))
                .is_some_and(|attr| {
                    attr.value.eq_ignore_ascii_case("text/html")
                        || attr.value.eq_ignore_ascii_case("application/xhtml+xml")
                }),
            Namespace::Svg => ["foreignObject", "desc", "title"].contains(&self.node_name(node_id)),
            _ => false,
        }
    }

    /// Decides whether the current token is handled by the HTML rules or the foreign content rules
    pub(crate) fn select_dispatch_mode(&self) -> DispatcherMode {
        if self.open_elements.is_empty() {
            return DispatcherMode::Html;
        }

        let acn = self.adjusted_current_node();
        if self.sink.namespace(acn) == Namespace::Html {
            return DispatcherMode::Html;
        }

        if self.is_mathml_text_integration_point(acn) {
            if self.current_token.is_any_start_tag()
                && !self.current_token.is_start_tag("mglyph")
                && !self.current_token.is_start_tag("malignmark")
            {
                return DispatcherMode::Html;
            }
            if self.current_token.is_text_token() {
                return DispatcherMode::Html;
            }
        }

        if self.sink.namespace(acn) == Namespace::MathMl
            && self.node_name(acn) == "annotation-xml"
            && self.current_token.is_start_tag("svg")
        {
            return DispatcherMode::Html;
        }

        if self.is_html_integration_point(acn)
            && (self.current_token.is_any_start_tag() || self.current_token.is_text_token())
        {
            return DispatcherMode::Html;
        }

        if self.current_token.is_eof() {
            return DispatcherMode::Html;
        }

        DispatcherMode::Foreign
    }

    /// Camel-cases SVG element names
    pub(crate) fn adjust_svg_tag_names(&self, token: &mut Token) {
        if let Token::StartTag { name, .. } = token {
            if let Some(adjusted) = SVG_ADJUSTMENTS_TAGS.get(name.as_str()) {
                *name = adjusted.to_string();
            }
        }
    }

    /// Camel-cases SVG attribute names
    pub(crate) fn adjust_svg_attributes(&self, token: &mut Token) {
        if let Token::StartTag { attributes, .. } = token {
            for attr in attributes.iter_mut() {
                if let Some(adjusted) = SVG_ADJUSTMENTS_ATTRIBUTES.get(attr.name.to_ascii_lowercase().as_str()) {
                    attr.name = adjusted.to_string();
                }
            }
        }
    }

    pub(crate) fn adjust_mathml_attributes(&self, token: &mut Token) {
        if let Token::StartTag { attributes, .. } = token {
            for attr in attributes.iter_mut() {
                if let Some(adjusted) = MATHML_ADJUSTMENTS.get(attr.name.to_ascii_lowercase().as_str()) {
                    attr.name = adjusted.to_string();
                }
            }
        }
    }

    /// Moves prefixed attributes (xlink:href, xml:lang, xmlns:xlink) into their namespace
    pub(crate) fn adjust_foreign_attributes(&self, token: &mut Token) {
        if let Token::StartTag { attributes, .. } = token {
            for attr in attributes.iter_mut() {
                if let Some((local_name, namespace)) = XML_ADJUSTMENTS.get(attr.name.to_ascii_lowercase().as_str()) {
                    attr.name = local_name.to_string();
                    attr.namespace = Some(*namespace);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::token::Attribute;
    use quill_shared::character_reader::Span;

    fn start_tag(name: &str, attributes: Vec<Attribute>) -> Token {
        Token::StartTag {
            name: name.to_string(),
            raw_name: name.to_string(),
            is_self_closing: false,
            attributes,
            span: Span::default(),
        }
    }

    fn attributes_of(token: &Token) -> Vec<Attribute> {
        match token {
            Token::StartTag { attributes, .. } => attributes.clone(),
            _ => vec![],
        }
    }

    #[test]
    fn adjust_attributes() {
        use crate::document::Document;
        use crate::errors::ParseErrorList;
        use crate::parser::Html5ParserOptions;
        use crate::tokenizer::Tokenizer;
        use core::cell::RefCell;
        use quill_shared::character_reader::CharacterReader;
        use std::rc::Rc;

        let stream = &mut CharacterReader::new("");
        let doc = &mut Document::new();
        let error_logger = Rc::new(RefCell::new(ParseErrorList::new(0)));
        let tokenizer = Tokenizer::new(stream, None, error_logger.clone());
        let parser = Html5Parser::init(tokenizer, doc, error_logger, &Html5ParserOptions::default());

        let mut token = start_tag(
            "foreignobject",
            vec![
                Attribute::new("viewbox", "0 0 10 10"),
                Attribute::new("xlink:href", "#a"),
                Attribute::new("definitionurl", "x"),
            ],
        );

        parser.adjust_svg_tag_names(&mut token);
        parser.adjust_svg_attributes(&mut token);
        parser.adjust_foreign_attributes(&mut token);

        assert!(matches!(&token, Token::StartTag { name, .. } if name == "foreignObject"));

        let attributes = attributes_of(&token);
        assert_eq!(attributes[0].name, "viewBox");
        assert_eq!(attributes[1].name, "href");
        assert_eq!(attributes[1].namespace, Some(Namespace::XLink));
        assert_eq!(attributes[2].name, "definitionurl");

        parser.adjust_mathml_attributes(&mut token);
        assert_eq!(attributes_of(&token)[2].name, "definitionURL");
    }
}
