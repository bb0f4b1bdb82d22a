use crate::parser::tree_builder::TreeSink;
use crate::parser::{Html5Parser, Scope};
use crate::tokenizer::token::Token;

const TABLE_ELEMENTS: [&str; 8] = ["caption", "table", "tbody", "tfoot", "thead", "tr", "td", "th"];

impl<S: TreeSink> Html5Parser<'_, S> {
    /// Handle insertion mode "in_select"
    pub(crate) fn handle_in_select(&mut self) {
        let token = self.current_token.clone();
        match &token {
            Token::Text { text: value, .. } if self.current_token.is_mixed_null() => {
                let tokens = self.split_mixed_token_null(value);
                for token in tokens.into_iter().rev() {
                    self.token_queue.push_front(token);
                }
            }
            Token::Text { text: value, .. } if value.chars().all(|ch| ch == '\0') => {
                self.parse_error("null character not allowed in in select insertion mode");
                // ignore token
            }
            Token::Text { .. } => {
                self.insert_text_element(&token);
            }
            Token::Comment { .. } => {
                self.insert_comment_element(&token, None);
            }
            Token::DocType { .. } => {
                self.unexpected_token();
                // ignore token
            }
            Token::StartTag { name, .. } if name == "html" => {
                self.handle_in_body();
            }
            Token::StartTag { name, .. } if name == "option" => {
                if self.current_node_is("option") {
                    self.open_elements.pop();
                }

                self.insert_html_element(&token);
            }
            Token::StartTag { name, .. } if name == "optgroup" => {
                if self.current_node_is("option") {
                    self.open_elements.pop();
                }
                if self.current_node_is("optgroup") {
                    self.open_elements.pop();
                }

                self.insert_html_element(&token);
            }
            Token::StartTag {
                name, is_self_closing, ..
            } if name == "hr" => {
                if self.current_node_is("option") {
                    self.open_elements.pop();
                }
                if self.current_node_is("optgroup") {
                    self.open_elements.pop();
                }

                self.insert_html_element(&token);
                self.open_elements.pop();

                self.acknowledge_closing_tag(*is_self_closing);
            }
            Token::EndTag { name, .. } if name == "optgroup" => {
                let len = self.open_elements.len();
                if len > 1
                    && self.current_node_is("option")
                    && self.is_html_node(self.open_elements[len - 2], "optgroup")
                {
                    self.open_elements.pop();
                }

                if self.current_node_is("optgroup") {
                    self.open_elements.pop();
                } else {
                    self.unexpected_token();
                    // ignore token
                }
            }
            Token::EndTag { name, .. } if name == "option" => {
                if self.current_node_is("option") {
                    self.open_elements.pop();
                } else {
                    self.unexpected_token();
                    // ignore token
                }
            }
            Token::EndTag { name, .. } if name == "select" => {
                if !self.is_in_scope("select", Scope::Select) {
                    // fragment case
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                self.pop_until_named("select");
                self.reset_insertion_mode();
            }
            Token::StartTag { name, .. } if name == "select" => {
                self.unexpected_token();

                if !self.is_in_scope("select", Scope::Select) {
                    // ignore token
                    return;
                }

                self.pop_until_named("select");
                self.reset_insertion_mode();
            }
            Token::StartTag { name, .. } if name == "input" || name == "keygen" || name == "textarea" => {
                self.unexpected_token();

                if !self.is_in_scope("select", Scope::Select) {
                    // fragment case
                    // ignore token
                    return;
                }

                self.pop_until_named("select");
                self.reset_insertion_mode();
                self.reprocess_token = true;
            }
            Token::StartTag { name, .. } if name == "script" || name == "template" => {
                self.handle_in_head();
            }
            Token::EndTag { name, .. } if name == "template" => {
                self.handle_in_head();
            }
            Token::Eof { .. } => {
                self.handle_in_body();
            }
            _ => {
                self.unexpected_token();
                // ignore token
            }
        }
    }

    /// Handle insertion mode "in_select_in_table"
    pub(crate) fn handle_in_select_in_table(&mut self) {
        match &self.current_token.clone() {
            Token::StartTag { name, .. } if TABLE_ELEMENTS.contains(&name.as_str()) => {
                self.unexpected_token();

                self.pop_until_named("select");
                self.reset_insertion_mode();
                self.reprocess_token = true;
            }
            Token::EndTag { name, .. } if TABLE_ELEMENTS.contains(&name.as_str()) => {
                self.unexpected_token();

                if !self.is_in_scope(name, Scope::Table) {
                    // ignore token
                    return;
                }

                self.pop_until_named("select");
                self.reset_insertion_mode();
                self.reprocess_token = true;
            }
            _ => self.handle_in_select(),
        }
    }
}
