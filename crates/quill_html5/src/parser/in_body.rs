use crate::node::{is_special, Namespace, NodeId};
use crate::parser::quirks::QuirksMode;
use crate::parser::tree_builder::TreeSink;
use crate::parser::{synthetic_start_tag, Html5Parser, InsertionMode, Scope};
use crate::tokenizer::state::State;
use crate::tokenizer::token::Token;

/// Elements that may still be open when the body is closed without a parse error
const BODY_END_ALLOWED_OPEN: [&str; 18] = [
    "dd", "dt", "li", "optgroup", "option", "p", "rb", "rp", "rt", "rtc", "tbody", "td", "tfoot", "th", "thead",
    "tr", "body", "html",
];

const HEADINGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

impl<S: TreeSink> Html5Parser<'_, S> {
    /// Handle insertion mode "in_body"
    pub(crate) fn handle_in_body(&mut self) {
        let token = self.current_token.clone();
        match &token {
            Token::Text { text: value, .. } if self.current_token.is_mixed_null() => {
                let tokens = self.split_mixed_token_null(value);
                for token in tokens.into_iter().rev() {
                    self.token_queue.push_front(token);
                }
            }
            Token::Text { text: value, .. } if value.chars().all(|ch| ch == '\0') => {
                self.parse_error("null character not allowed in in body insertion mode");
                // ignore token
            }
            Token::Text { .. } if self.current_token.is_empty_or_white() => {
                self.reconstruct_formatting();

                self.insert_text_element(&token);
            }
            Token::Text { .. } => {
                self.reconstruct_formatting();

                self.insert_text_element(&token);

                self.frameset_ok = false;
            }
            Token::Comment { .. } => {
                self.insert_comment_element(&token, None);
            }
            Token::DocType { .. } => {
                self.unexpected_token();
                // ignore token
            }
            Token::StartTag { name, attributes, .. } if name == "html" => {
                self.unexpected_token();

                if self.open_elements_has("template") {
                    // ignore token
                    return;
                }

                if let Some(&html_node_id) = self.open_elements.first() {
                    self.sink.add_attributes_if_missing(html_node_id, attributes);
                }
            }
            Token::StartTag { name, .. }
                if [
                    "base", "basefont", "bgsound", "link", "meta", "noframes", "script", "style", "template", "title",
                ]
                .contains(&name.as_str()) =>
            {
                self.handle_in_head();
            }
            Token::EndTag { name, .. } if name == "template" => {
                self.handle_in_head();
            }
            Token::StartTag { name, attributes, .. } if name == "body" => {
                self.unexpected_token();

                let body_node_id = self.open_elements.get(1).copied();
                match body_node_id {
                    Some(body_node_id)
                        if self.is_html_node(body_node_id, "body") && !self.open_elements_has("template") =>
                    {
                        self.frameset_ok = false;
                        self.sink.add_attributes_if_missing(body_node_id, attributes);
                    }
                    _ => {
                        // fragment case
                        // ignore token
                    }
                }
            }
            Token::StartTag { name, .. } if name == "frameset" => {
                self.unexpected_token();

                let Some(body_node_id) = self.open_elements.get(1).copied() else {
                    // fragment case
                    // ignore token
                    return;
                };

                if !self.is_html_node(body_node_id, "body") || !self.frameset_ok {
                    // ignore token
                    return;
                }

                self.sink.remove_from_parent(body_node_id);
                self.open_elements.truncate(1);

                self.insert_html_element(&token);
                self.insertion_mode = InsertionMode::InFrameset;
            }
            Token::Eof { .. } => {
                if !self.template_insertion_mode.is_empty() {
                    self.handle_in_template();
                    return;
                }

                self.check_body_end_open_elements();
                self.stop_parsing();
            }
            Token::EndTag { name, .. } if name == "body" => {
                if !self.is_in_scope("body", Scope::Regular) {
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                self.check_body_end_open_elements();
                self.insertion_mode = InsertionMode::AfterBody;
            }
            Token::EndTag { name, .. } if name == "html" => {
                if !self.is_in_scope("body", Scope::Regular) {
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                self.check_body_end_open_elements();
                self.insertion_mode = InsertionMode::AfterBody;
                self.reprocess_token = true;
            }
            Token::StartTag { name, .. }
                if [
                    "address",
                    "article",
                    "aside",
                    "blockquote",
                    "center",
                    "details",
                    "dialog",
                    "dir",
                    "div",
                    "dl",
                    "fieldset",
                    "figcaption",
                    "figure",
                    "footer",
                    "header",
                    "hgroup",
                    "main",
                    "menu",
                    "nav",
                    "ol",
                    "p",
                    "search",
                    "section",
                    "summary",
                    "ul",
                ]
                .contains(&name.as_str()) =>
            {
                if self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }

                self.insert_html_element(&token);
            }
            Token::StartTag { name, .. } if HEADINGS.contains(&name.as_str()) => {
                if self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }

                if self.current_node_is_any(&HEADINGS) {
                    self.parse_error("heading cannot be nested in another heading");
                    self.open_elements.pop();
                }

                self.insert_html_element(&token);
            }
            Token::StartTag { name, .. } if name == "pre" || name == "listing" => {
                if self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }

                self.insert_html_element(&token);

                self.ignore_lf = true;
                self.frameset_ok = false;
            }
            Token::StartTag { name, .. } if name == "form" => {
                let template_open = self.open_elements_has("template");
                if self.form_element.is_some() && !template_open {
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                if self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }

                let node_id = self.insert_html_element(&token);
                if !template_open {
                    self.form_element = Some(node_id);
                }
            }
            Token::StartTag { name, .. } if name == "li" => {
                self.frameset_ok = false;

                for idx in (0..self.open_elements.len()).rev() {
                    let node_id = self.open_elements[idx];

                    if self.is_html_node(node_id, "li") {
                        self.generate_implied_end_tags(Some("li"), false);
                        if !self.current_node_is("li") {
                            self.parse_error("current node is not a li element");
                        }
                        self.pop_until_named("li");
                        break;
                    }

                    if is_special(self.node_name(node_id), self.sink.namespace(node_id))
                        && !self.is_special_list_boundary_exception(node_id)
                    {
                        break;
                    }
                }

                if self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }

                self.insert_html_element(&token);
            }
            Token::StartTag { name, .. } if name == "dd" || name == "dt" => {
                self.frameset_ok = false;

                for idx in (0..self.open_elements.len()).rev() {
                    let node_id = self.open_elements[idx];

                    if self.is_html_node(node_id, "dd") || self.is_html_node(node_id, "dt") {
                        let node_name = self.node_name(node_id).to_string();
                        self.generate_implied_end_tags(Some(&node_name), false);
                        if !self.current_node_is(&node_name) {
                            self.parse_error(&format!("current node is not a {node_name} element"));
                        }
                        self.pop_until_named(&node_name);
                        break;
                    }

                    if is_special(self.node_name(node_id), self.sink.namespace(node_id))
                        && !self.is_special_list_boundary_exception(node_id)
                    {
                        break;
                    }
                }

                if self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }

                self.insert_html_element(&token);
            }
            Token::StartTag { name, .. } if name == "plaintext" => {
                if self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }

                self.insert_html_element(&token);

                self.tokenizer.set_state(State::PLAINTEXT);
            }
            Token::StartTag { name, .. } if name == "button" => {
                if self.is_in_scope("button", Scope::Regular) {
                    self.parse_error("button tag not allowed in in body insertion mode");
                    self.generate_implied_end_tags(None, false);
                    self.pop_until_named("button");
                }

                self.reconstruct_formatting();
                self.insert_html_element(&token);

                self.frameset_ok = false;
            }
            Token::EndTag { name, .. }
                if [
                    "address",
                    "article",
                    "aside",
                    "blockquote",
                    "button",
                    "center",
                    "details",
                    "dialog",
                    "dir",
                    "div",
                    "dl",
                    "fieldset",
                    "figcaption",
                    "figure",
                    "footer",
                    "header",
                    "hgroup",
                    "listing",
                    "main",
                    "menu",
                    "nav",
                    "ol",
                    "pre",
                    "search",
                    "section",
                    "summary",
                    "ul",
                ]
                .contains(&name.as_str()) =>
            {
                if !self.is_in_scope(name, Scope::Regular) {
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                self.generate_implied_end_tags(None, false);

                if !self.current_node_is(name) {
                    self.parse_error(&format!("end tag </{name}> does not close the current node"));
                }

                self.pop_until_named(name);
            }
            Token::EndTag { name, .. } if name == "form" => {
                if !self.open_elements_has("template") {
                    let node = self.form_element.take();

                    let Some(node_id) = node.filter(|&node_id| self.is_node_in_scope(node_id, Scope::Regular)) else {
                        self.unexpected_token();
                        // ignore token
                        return;
                    };

                    self.generate_implied_end_tags(None, false);

                    if self.current_node() != node_id {
                        self.parse_error("end tag </form> does not close the current node");
                    }

                    self.open_elements_remove(node_id);
                } else {
                    if !self.is_in_scope("form", Scope::Regular) {
                        self.unexpected_token();
                        // ignore token
                        return;
                    }

                    self.generate_implied_end_tags(None, false);

                    if !self.current_node_is("form") {
                        self.parse_error("end tag </form> does not close the current node");
                    }

                    self.pop_until_named("form");
                }
            }
            Token::EndTag { name, .. } if name == "p" => {
                if !self.is_in_scope("p", Scope::Button) {
                    self.unexpected_token();

                    self.insert_html_element(&synthetic_start_tag("p"));
                }

                self.close_p_element();
            }
            Token::EndTag { name, .. } if name == "li" => {
                if !self.is_in_scope("li", Scope::ListItem) {
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                self.generate_implied_end_tags(Some("li"), false);

                if !self.current_node_is("li") {
                    self.parse_error("end tag </li> does not close the current node");
                }

                self.pop_until_named("li");
            }
            Token::EndTag { name, .. } if name == "dd" || name == "dt" => {
                if !self.is_in_scope(name, Scope::Regular) {
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                self.generate_implied_end_tags(Some(name), false);

                if !self.current_node_is(name) {
                    self.parse_error(&format!("end tag </{name}> does not close the current node"));
                }

                self.pop_until_named(name);
            }
            Token::EndTag { name, .. } if HEADINGS.contains(&name.as_str()) => {
                if !self.is_any_in_scope(&HEADINGS, Scope::Regular) {
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                self.generate_implied_end_tags(None, false);

                if !self.current_node_is(name) {
                    self.parse_error(&format!("end tag </{name}> does not close the current node"));
                }

                self.pop_until_any(&HEADINGS);
            }
            Token::StartTag { name, .. } if name == "a" => {
                if let Some(node_id) = self.active_formatting_elements_has_until_marker("a") {
                    self.parse_error("a tag in active formatting elements");

                    self.run_adoption_agency("a");

                    // Remove from lists if not done already by the adoption agency
                    self.active_formatting_elements_remove(node_id);
                    self.open_elements_remove(node_id);
                }

                self.reconstruct_formatting();

                let node_id = self.insert_html_element(&token);
                self.active_formatting_elements_push(node_id);
            }
            Token::StartTag { name, .. }
                if [
                    "b", "big", "code", "em", "font", "i", "s", "small", "strike", "strong", "tt", "u",
                ]
                .contains(&name.as_str()) =>
            {
                self.reconstruct_formatting();

                let node_id = self.insert_html_element(&token);
                self.active_formatting_elements_push(node_id);
            }
            Token::StartTag { name, .. } if name == "nobr" => {
                self.reconstruct_formatting();

                if self.is_in_scope("nobr", Scope::Regular) {
                    self.parse_error("nobr tag in scope");

                    self.run_adoption_agency("nobr");
                    self.reconstruct_formatting();
                }

                let node_id = self.insert_html_element(&token);
                self.active_formatting_elements_push(node_id);
            }
            Token::EndTag { name, .. }
                if [
                    "a", "b", "big", "code", "em", "font", "i", "nobr", "s", "small", "strike", "strong", "tt", "u",
                ]
                .contains(&name.as_str()) =>
            {
                self.run_adoption_agency(name);
            }
            Token::StartTag { name, .. } if name == "applet" || name == "marquee" || name == "object" => {
                self.reconstruct_formatting();

                self.insert_html_element(&token);

                self.active_formatting_elements_push_marker();
                self.frameset_ok = false;
            }
            Token::EndTag { name, .. } if name == "applet" || name == "marquee" || name == "object" => {
                if !self.is_in_scope(name, Scope::Regular) {
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                self.generate_implied_end_tags(None, false);

                if !self.current_node_is(name) {
                    self.parse_error(&format!("end tag </{name}> does not close the current node"));
                }

                self.pop_until_named(name);
                self.active_formatting_elements_clear_until_marker();
            }
            Token::StartTag { name, .. } if name == "table" => {
                if self.quirks_mode != QuirksMode::Quirks && self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }

                self.insert_html_element(&token);

                self.frameset_ok = false;
                self.insertion_mode = InsertionMode::InTable;
            }
            Token::EndTag { name, .. } if name == "br" => {
                self.unexpected_token();

                self.reconstruct_formatting();

                let mut br_token = synthetic_start_tag("br");
                br_token.set_span(token.span());
                self.insert_html_element(&br_token);
                self.open_elements.pop();

                self.frameset_ok = false;
            }
            Token::StartTag {
                name, is_self_closing, ..
            } if ["area", "br", "embed", "img", "keygen", "wbr"].contains(&name.as_str()) => {
                self.reconstruct_formatting();

                self.insert_html_element(&token);
                self.open_elements.pop();

                self.acknowledge_closing_tag(*is_self_closing);

                self.frameset_ok = false;
            }
            Token::StartTag {
                name, is_self_closing, ..
            } if name == "input" => {
                self.reconstruct_formatting();

                self.insert_html_element(&token);
                self.open_elements.pop();

                self.acknowledge_closing_tag(*is_self_closing);

                if !token
                    .attribute("type")
                    .is_some_and(|value| value.eq_ignore_ascii_case("hidden"))
                {
                    self.frameset_ok = false;
                }
            }
            Token::StartTag {
                name, is_self_closing, ..
            } if name == "param" || name == "source" || name == "track" => {
                self.insert_html_element(&token);
                self.open_elements.pop();

                self.acknowledge_closing_tag(*is_self_closing);
            }
            Token::StartTag {
                name, is_self_closing, ..
            } if name == "hr" => {
                if self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }

                self.insert_html_element(&token);
                self.open_elements.pop();

                self.acknowledge_closing_tag(*is_self_closing);

                self.frameset_ok = false;
            }
            Token::StartTag { name, .. } if name == "image" => {
                self.parse_error("image tag not allowed, treated as img");

                if let Token::StartTag { name, raw_name, .. } = &mut self.current_token {
                    *name = "img".to_string();
                    *raw_name = "img".to_string();
                }
                self.reprocess_token = true;
            }
            Token::StartTag { name, .. } if name == "textarea" => {
                self.insert_html_element(&token);

                self.ignore_lf = true;

                self.tokenizer.set_state(State::RCDATA);
                self.original_insertion_mode = self.insertion_mode;
                self.frameset_ok = false;
                self.insertion_mode = InsertionMode::Text;
            }
            Token::StartTag { name, .. } if name == "xmp" => {
                if self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }

                self.reconstruct_formatting();

                self.frameset_ok = false;
                self.parse_raw_data();
            }
            Token::StartTag { name, .. } if name == "iframe" => {
                self.frameset_ok = false;
                self.parse_raw_data();
            }
            Token::StartTag { name, .. } if name == "noembed" => {
                self.parse_raw_data();
            }
            Token::StartTag { name, .. } if name == "noscript" && self.scripting_enabled => {
                self.parse_raw_data();
            }
            Token::StartTag { name, .. } if name == "select" => {
                self.reconstruct_formatting();

                self.insert_html_element(&token);

                self.frameset_ok = false;

                self.insertion_mode = match self.insertion_mode {
                    InsertionMode::InTable
                    | InsertionMode::InCaption
                    | InsertionMode::InTableBody
                    | InsertionMode::InRow
                    | InsertionMode::InCell => InsertionMode::InSelectInTable,
                    _ => InsertionMode::InSelect,
                };
            }
            Token::StartTag { name, .. } if name == "optgroup" || name == "option" => {
                if self.current_node_is("option") {
                    self.open_elements.pop();
                }

                self.reconstruct_formatting();

                self.insert_html_element(&token);
            }
            Token::StartTag { name, .. } if name == "rb" || name == "rtc" => {
                if self.is_in_scope("ruby", Scope::Regular) {
                    self.generate_implied_end_tags(None, false);

                    if !self.current_node_is("ruby") {
                        self.parse_error("rb or rtc not in ruby");
                    }
                }

                self.insert_html_element(&token);
            }
            Token::StartTag { name, .. } if name == "rp" || name == "rt" => {
                if self.is_in_scope("ruby", Scope::Regular) {
                    self.generate_implied_end_tags(Some("rtc"), false);

                    if !self.current_node_is_any(&["rtc", "ruby"]) {
                        self.parse_error("rp or rt not in ruby or rtc");
                    }
                }

                self.insert_html_element(&token);
            }
            Token::StartTag {
                name, is_self_closing, ..
            } if name == "math" => {
                self.reconstruct_formatting();

                let mut token = token.clone();
                self.adjust_mathml_attributes(&mut token);
                self.adjust_foreign_attributes(&mut token);

                self.insert_foreign_element(&token, Namespace::MathMl);

                if *is_self_closing {
                    self.open_elements.pop();
                    self.acknowledge_closing_tag(*is_self_closing);
                }
            }
            Token::StartTag {
                name, is_self_closing, ..
            } if name == "svg" => {
                self.reconstruct_formatting();

                let mut token = token.clone();
                self.adjust_svg_attributes(&mut token);
                self.adjust_foreign_attributes(&mut token);

                self.insert_foreign_element(&token, Namespace::Svg);

                if *is_self_closing {
                    self.open_elements.pop();
                    self.acknowledge_closing_tag(*is_self_closing);
                }
            }
            Token::StartTag { name, .. }
                if [
                    "caption", "col", "colgroup", "frame", "head", "tbody", "td", "tfoot", "th", "thead", "tr",
                ]
                .contains(&name.as_str()) =>
            {
                self.unexpected_token();
                // ignore token
            }
            Token::StartTag { .. } => {
                self.insert_ordinary_element();
            }
            Token::EndTag { name, .. } => {
                self.handle_in_body_any_other_end_tag(name);
            }
        }
    }

    /// address, div and p are special elements that do not stop the search for an open list item
    fn is_special_list_boundary_exception(&self, node_id: NodeId) -> bool {
        self.sink.namespace(node_id) == Namespace::Html && ["address", "div", "p"].contains(&self.node_name(node_id))
    }

    /// Reports a parse error when elements are still open that are not allowed to be open at the end of the body
    fn check_body_end_open_elements(&self) {
        let has_unexpected = self.open_elements.iter().any(|&node_id| {
            self.sink.namespace(node_id) != Namespace::Html || !BODY_END_ALLOWED_OPEN.contains(&self.node_name(node_id))
        });

        if has_unexpected {
            self.parse_error("unclosed elements at end of body");
        }
    }
}
