use crate::parser::tree_builder::TreeSink;
use crate::parser::{Html5Parser, InsertionMode};
use crate::tokenizer::state::State;
use crate::tokenizer::token::Token;
use log::{debug, warn};
use url::Url;

impl<S: TreeSink> Html5Parser<'_, S> {
    /// Handle insertion mode "in_head"
    pub(crate) fn handle_in_head(&mut self) {
        let mut anything_else = false;

        match &self.current_token.clone() {
            Token::Text { text: value, .. } if self.current_token.is_mixed() => {
                self.requeue_split_token(value);
            }
            Token::Text { .. } if self.current_token.is_empty_or_white() => {
                self.insert_text_element(&self.current_token.clone());
            }
            Token::Comment { .. } => {
                self.insert_comment_element(&self.current_token.clone(), None);
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
            } if name == "base" || name == "basefont" || name == "bgsound" || name == "link" => {
                self.insert_html_element(&self.current_token.clone());
                self.open_elements.pop();

                self.acknowledge_closing_tag(*is_self_closing);

                if name == "base" {
                    self.set_document_base_url();
                }
            }
            Token::StartTag {
                name, is_self_closing, ..
            } if name == "meta" => {
                self.insert_html_element(&self.current_token.clone());
                self.open_elements.pop();

                self.acknowledge_closing_tag(*is_self_closing);
            }
            Token::StartTag { name, .. } if name == "title" => {
                self.parse_rcdata();
            }
            Token::StartTag { name, .. } if name == "noscript" && self.scripting_enabled => {
                self.parse_raw_data();
            }
            Token::StartTag { name, .. } if name == "noframes" || name == "style" => {
                self.parse_raw_data();
            }
            Token::StartTag { name, .. } if name == "noscript" => {
                self.insert_html_element(&self.current_token.clone());
                self.insertion_mode = InsertionMode::InHeadNoscript;
            }
            Token::StartTag { name, .. } if name == "script" => {
                self.insert_html_element(&self.current_token.clone());

                self.tokenizer.set_state(State::ScriptData);

                self.original_insertion_mode = self.insertion_mode;
                self.insertion_mode = InsertionMode::Text;
            }
            Token::EndTag { name, .. } if name == "head" => {
                self.open_elements.pop();
                self.insertion_mode = InsertionMode::AfterHead;
            }
            Token::EndTag { name, .. } if name == "body" || name == "html" || name == "br" => {
                anything_else = true;
            }
            Token::StartTag { name, .. } if name == "template" => {
                self.insert_html_element(&self.current_token.clone());

                self.active_formatting_elements_push_marker();
                self.frameset_ok = false;

                self.insertion_mode = InsertionMode::InTemplate;
                self.template_insertion_mode.push(InsertionMode::InTemplate);
            }
            Token::EndTag { name, .. } if name == "template" => {
                if !self.open_elements_has("template") {
                    self.unexpected_token();
                    // ignore token
                    return;
                }

                self.generate_implied_end_tags(None, true);

                if !self.current_node_is("template") {
                    self.parse_error("current node is not a template");
                }

                self.pop_until_named("template");
                self.active_formatting_elements_clear_until_marker();
                self.template_insertion_mode.pop();

                self.reset_insertion_mode();
            }
            Token::StartTag { name, .. } if name == "head" => {
                self.unexpected_token();
                // ignore token
            }
            Token::EndTag { .. } => {
                self.unexpected_token();
                // ignore token
            }
            _ => {
                anything_else = true;
            }
        }

        if anything_else {
            self.open_elements.pop();

            self.insertion_mode = InsertionMode::AfterHead;
            self.reprocess_token = true;
        }
    }

    /// The first base element with a href attribute sets the base URL of the document
    fn set_document_base_url(&mut self) {
        if self.base_url_found {
            return;
        }

        let Some(href) = self.current_token.attribute("href") else {
            return;
        };
        self.base_url_found = true;

        let url = match self.sink.base_url() {
            Some(base_url) => base_url.join(href),
            None => Url::parse(href),
        };

        match url {
            Ok(url) => {
                debug!("document base url set to {url}");
                self.sink.set_base_url(url);
            }
            Err(err) => warn!("ignoring base href '{href}': {err}"),
        }
    }

    /// Handle insertion mode "in_template"
    pub(crate) fn handle_in_template(&mut self) {
        match &self.current_token {
            Token::Text { .. } | Token::Comment { .. } | Token::DocType { .. } => {
                self.handle_in_body();
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
            Token::StartTag { name, .. }
                if ["caption", "colgroup", "tbody", "tfoot", "thead"].contains(&name.as_str()) =>
            {
                self.switch_template_mode(InsertionMode::InTable);
            }
            Token::StartTag { name, .. } if name == "col" => {
                self.switch_template_mode(InsertionMode::InColumnGroup);
            }
            Token::StartTag { name, .. } if name == "tr" => {
                self.switch_template_mode(InsertionMode::InTableBody);
            }
            Token::StartTag { name, .. } if name == "td" || name == "th" => {
                self.switch_template_mode(InsertionMode::InRow);
            }
            Token::StartTag { .. } => {
                self.switch_template_mode(InsertionMode::InBody);
            }
            Token::EndTag { .. } => {
                self.unexpected_token();
                // ignore token
            }
            Token::Eof { .. } => {
                if !self.open_elements_has("template") {
                    // fragment case
                    self.stop_parsing();
                    return;
                }

                self.unexpected_token();

                self.pop_until_named("template");
                self.active_formatting_elements_clear_until_marker();
                self.template_insertion_mode.pop();
                self.reset_insertion_mode();

                self.reprocess_token = true;
            }
        }
    }

    /// Replaces the current template insertion mode and reprocesses the token in the new mode
    fn switch_template_mode(&mut self, mode: InsertionMode) {
        self.template_insertion_mode.pop();
        self.template_insertion_mode.push(mode);

        self.insertion_mode = mode;
        self.reprocess_token = true;
    }
}
