use crate::parser::tree_builder::TreeSink;
use crate::parser::{synthetic_start_tag, Html5Parser, InsertionMode, Scope};
use crate::tokenizer::token::Token;

const TABLE_SECTIONS: [&str; 3] = ["tbody", "tfoot", "thead"];

impl<S: TreeSink> Html5Parser<'_, S> {
    /// Handle insertion mode "in_table"
    pub(crate) fn handle_in_table(&mut self) {
        let mut anything_else = false;

        let token = self.current_token.clone();
        match &token {
            Token::Text { .. } if self.current_node_is_any(&["table", "tbody", "template", "tfoot", "thead", "tr"]) => {
                self.pending_table_character_tokens.clear();
                self.original_insertion_mode = self.insertion_mode;
                self.insertion_mode = InsertionMode::InTableText;
                self.reprocess_token = true;
            }
            Token::Comment { .. } => {
                self.insert_comment_element(&token, None);
            }
            Token::DocType { .. } => {
                self.unexpected_token();
                // ignore token
            }
            Token::StartTag { name, .. } if name == "caption" => {
                self.clear_stack_back_to_table_context();
                self.active_formatting_elements_push_marker();

                self.insert_html_element(&token);
                self.insertion_mode = InsertionMode::InCaption;
            }
            Token::StartTag { name, .. } if name == "colgroup" => {
                self.clear_stack_back_to_table_context();

                self.insert_html_element(&token);
                self.insertion_mode = InsertionMode::InColumnGroup;
            }
            Token::StartTag { name, .. } if name == "col" => {
                self.clear_stack_back_to_table_context();

                self.insert_html_element(&synthetic_start_tag("colgroup"));
                self.insertion_mode = InsertionMode::InColumnGroup;
                self.reprocess_token = true;
            }
            Token::StartTag { name, .. } if TABLE_SECTIONS.contains(&name.as_str()) => {
                self.clear_stack_back_to_table_context();

                self.insert_html_element(&token);
                self.insertion_mode = InsertionMode::InTableBody;
            }
            Token::StartTag { name, .. } if ["td", "th", "tr"].contains(&name.as_str()) => {
                self.clear_stack_back_to_table_context();

                self.insert_html_element(&synthetic_start_tag("tbody"));
                self.insertion_mode = InsertionMode::InTableBody;
                self.reprocess_token = true;
            }
            Token::StartTag { name, .. } if name == "table" => {
                self.unexpected_token();

                if !self.is_in_scope("table", Scope::Table) {
                    // ignore token
                    return;
                }

                self.pop_until_named("table");
                self.reset_insertion_mode();
                self.reprocess_token = true;
            }
            Token::EndTag { name, .. } if name == "table" => {
                if !self.is_in_scope("table", Scope::Table) {
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                self.pop_until_named("table");
                self.reset_insertion_mode();
            }
            Token::EndTag { name, .. }
                if [
                    "body", "caption", "col", "colgroup", "html", "tbody", "td", "tfoot", "th", "thead", "tr",
                ]
                .contains(&name.as_str()) =>
            {
                self.unexpected_token();
                // ignore token
            }
            Token::StartTag { name, .. } if name == "style" || name == "script" || name == "template" => {
                self.handle_in_head();
            }
            Token::EndTag { name, .. } if name == "template" => {
                self.handle_in_head();
            }
            Token::StartTag {
                name, is_self_closing, ..
            } if name == "input" => {
                let is_hidden = token
                    .attribute("type")
                    .is_some_and(|value| value.eq_ignore_ascii_case("hidden"));

                if !is_hidden {
                    anything_else = true;
                } else {
                    self.unexpected_token();

                    self.insert_html_element(&token);
                    self.open_elements.pop();

                    self.acknowledge_closing_tag(*is_self_closing);
                }
            }
            Token::StartTag { name, .. } if name == "form" => {
                self.unexpected_token();

                if self.open_elements_has("template") || self.form_element.is_some() {
                    // ignore token
                    return;
                }

                let node_id = self.insert_html_element(&token);
                self.form_element = Some(node_id);

                self.open_elements.pop();
            }
            Token::Eof { .. } => {
                self.handle_in_body();
            }
            _ => anything_else = true,
        }

        if anything_else {
            self.unexpected_token();

            self.foster_parenting = true;
            self.handle_in_body();
            self.foster_parenting = false;
        }
    }

    /// Handle insertion mode "in_table_text"
    pub(crate) fn handle_in_table_text(&mut self) {
        match &self.current_token {
            Token::Text { text: value, .. } => {
                if value.contains('\0') {
                    self.parse_error("null character not allowed in in table text insertion mode");
                }

                let value = value.replace('\0', "");
                self.pending_table_character_tokens.push_str(&value);
            }
            _ => {
                let pending_chars = std::mem::take(&mut self.pending_table_character_tokens);

                if pending_chars.chars().any(|ch| !ch.is_ascii_whitespace()) {
                    self.parse_error("non-whitespace characters in table text");

                    // Processed with the in body rules, with foster parenting enabled
                    self.foster_parenting = true;
                    self.reconstruct_formatting();
                    self.insert_text(&pending_chars);
                    self.frameset_ok = false;
                    self.foster_parenting = false;
                } else if !pending_chars.is_empty() {
                    self.insert_text(&pending_chars);
                }

                self.insertion_mode = self.original_insertion_mode;
                self.reprocess_token = true;
            }
        }
    }

    /// Closes the caption element. Returns false when there is no caption in table scope.
    fn close_caption(&mut self) -> bool {
        if !self.is_in_scope("caption", Scope::Table) {
            // fragment case
            self.unexpected_token();
            // ignore token
            return false;
        }

        self.generate_implied_end_tags(None, false);

        if !self.current_node_is("caption") {
            self.parse_error("caption end tag does not close the current node");
        }

        self.pop_until_named("caption");
        self.active_formatting_elements_clear_until_marker();

        self.insertion_mode = InsertionMode::InTable;
        true
    }

    /// Handle insertion mode "in_caption"
    pub(crate) fn handle_in_caption(&mut self) {
        match &self.current_token {
            Token::EndTag { name, .. } if name == "caption" => {
                self.close_caption();
            }
            Token::StartTag { name, .. }
                if [
                    "caption", "col", "colgroup", "tbody", "td", "tfoot", "th", "thead", "tr",
                ]
                .contains(&name.as_str()) =>
            {
                if self.close_caption() {
                    self.reprocess_token = true;
                }
            }
            Token::EndTag { name, .. } if name == "table" => {
                if self.close_caption() {
                    self.reprocess_token = true;
                }
            }
            Token::EndTag { name, .. }
                if [
                    "body", "col", "colgroup", "html", "tbody", "td", "tfoot", "th", "thead", "tr",
                ]
                .contains(&name.as_str()) =>
            {
                self.unexpected_token();
                // ignore token
            }
            _ => self.handle_in_body(),
        }
    }

    /// Handle insertion mode "in_column_group"
    pub(crate) fn handle_in_column_group(&mut self) {
        let mut anything_else = false;

        let token = self.current_token.clone();
        match &token {
            Token::Text { text: value, .. } if self.current_token.is_mixed() => {
                self.requeue_split_token(value);
            }
            Token::Text { .. } if self.current_token.is_empty_or_white() => {
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
            Token::StartTag {
                name, is_self_closing, ..
            } if name == "col" => {
                self.insert_html_element(&token);
                self.open_elements.pop();

                self.acknowledge_closing_tag(*is_self_closing);
            }
            Token::EndTag { name, .. } if name == "colgroup" => {
                if !self.current_node_is("colgroup") {
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                self.open_elements.pop();
                self.insertion_mode = InsertionMode::InTable;
            }
            Token::EndTag { name, .. } if name == "col" => {
                self.unexpected_token();
                // ignore token
            }
            Token::StartTag { name, .. } if name == "template" => {
                self.handle_in_head();
            }
            Token::EndTag { name, .. } if name == "template" => {
                self.handle_in_head();
            }
            Token::Eof { .. } => {
                self.handle_in_body();
            }
            _ => anything_else = true,
        }

        if anything_else {
            if !self.current_node_is("colgroup") {
                self.unexpected_token();
                // ignore token
                return;
            }

            self.open_elements.pop();
            self.insertion_mode = InsertionMode::InTable;
            self.reprocess_token = true;
        }
    }

    /// Handle insertion mode "in_table_body"
    pub(crate) fn handle_in_table_body(&mut self) {
        let token = self.current_token.clone();
        match &token {
            Token::StartTag { name, .. } if name == "tr" => {
                self.clear_stack_back_to_table_body_context();

                self.insert_html_element(&token);
                self.insertion_mode = InsertionMode::InRow;
            }
            Token::StartTag { name, .. } if name == "th" || name == "td" => {
                self.unexpected_token();

                self.clear_stack_back_to_table_body_context();

                self.insert_html_element(&synthetic_start_tag("tr"));
                self.insertion_mode = InsertionMode::InRow;
                self.reprocess_token = true;
            }
            Token::EndTag { name, .. } if TABLE_SECTIONS.contains(&name.as_str()) => {
                if !self.is_in_scope(name, Scope::Table) {
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                self.clear_stack_back_to_table_body_context();
                self.open_elements.pop();
                self.insertion_mode = InsertionMode::InTable;
            }
            Token::StartTag { name, .. }
                if ["caption", "col", "colgroup", "tbody", "tfoot", "thead"].contains(&name.as_str()) =>
            {
                self.close_table_body();
            }
            Token::EndTag { name, .. } if name == "table" => {
                self.close_table_body();
            }
            Token::EndTag { name, .. }
                if ["body", "caption", "col", "colgroup", "html", "td", "th", "tr"].contains(&name.as_str()) =>
            {
                self.unexpected_token();
                // ignore token
            }
            _ => self.handle_in_table(),
        }
    }

    /// Closes the open table section and reprocesses the token in the in table insertion mode
    fn close_table_body(&mut self) {
        if !self.is_any_in_scope(&TABLE_SECTIONS, Scope::Table) {
            self.unexpected_token();
            // ignore token
            return;
        }

        self.clear_stack_back_to_table_body_context();
        self.open_elements.pop();
        self.insertion_mode = InsertionMode::InTable;
        self.reprocess_token = true;
    }

    /// Handle insertion mode "in_row"
    pub(crate) fn handle_in_row(&mut self) {
        let token = self.current_token.clone();
        match &token {
            Token::StartTag { name, .. } if name == "th" || name == "td" => {
                self.clear_stack_back_to_table_row_context();

                self.insert_html_element(&token);
                self.insertion_mode = InsertionMode::InCell;
                self.active_formatting_elements_push_marker();
            }
            Token::EndTag { name, .. } if name == "tr" => {
                if !self.is_in_scope("tr", Scope::Table) {
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                self.close_row();
            }
            Token::StartTag { name, .. }
                if ["caption", "col", "colgroup", "tbody", "tfoot", "thead", "tr"].contains(&name.as_str()) =>
            {
                if !self.is_in_scope("tr", Scope::Table) {
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                self.close_row();
                self.reprocess_token = true;
            }
            Token::EndTag { name, .. } if name == "table" => {
                if !self.is_in_scope("tr", Scope::Table) {
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                self.close_row();
                self.reprocess_token = true;
            }
            Token::EndTag { name, .. } if TABLE_SECTIONS.contains(&name.as_str()) => {
                if !self.is_in_scope(name, Scope::Table) {
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                if !self.is_in_scope("tr", Scope::Table) {
                    // ignore token
                    return;
                }

                self.close_row();
                self.reprocess_token = true;
            }
            Token::EndTag { name, .. }
                if ["body", "caption", "col", "colgroup", "html", "td", "th"].contains(&name.as_str()) =>
            {
                self.unexpected_token();
                // ignore token
            }
            _ => self.handle_in_table(),
        }
    }

    /// Pops the current row and switches to the in table body insertion mode
    fn close_row(&mut self) {
        self.clear_stack_back_to_table_row_context();
        self.open_elements.pop();
        self.insertion_mode = InsertionMode::InTableBody;
    }

    /// Handle insertion mode "in_cell"
    pub(crate) fn handle_in_cell(&mut self) {
        match &self.current_token.clone() {
            Token::EndTag { name, .. } if name == "td" || name == "th" => {
                if !self.is_in_scope(name, Scope::Table) {
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

                self.insertion_mode = InsertionMode::InRow;
            }
            Token::StartTag { name, .. }
                if [
                    "caption", "col", "colgroup", "tbody", "td", "tfoot", "th", "thead", "tr",
                ]
                .contains(&name.as_str()) =>
            {
                if !self.is_any_in_scope(&["td", "th"], Scope::Table) {
                    // fragment case
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                self.close_cell();
                self.reprocess_token = true;
            }
            Token::EndTag { name, .. } if ["body", "caption", "col", "colgroup", "html"].contains(&name.as_str()) => {
                self.unexpected_token();
                // ignore token
            }
            Token::EndTag { name, .. } if ["table", "tbody", "tfoot", "thead", "tr"].contains(&name.as_str()) => {
                if !self.is_in_scope(name, Scope::Table) {
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                self.close_cell();
                self.reprocess_token = true;
            }
            _ => self.handle_in_body(),
        }
    }
}
