use core::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::errors::{ParseError, ParseErrorList, ParserError};
use crate::node::{is_special, Namespace, NodeId};
use crate::parser::quirks::{identify_quirks_mode, QuirksMode};
use crate::parser::tree_builder::TreeSink;
use crate::tokenizer::state::State;
use crate::tokenizer::token::{Attribute, Token};
use crate::tokenizer::{Options, ParserData, Tokenizer};
use log::{debug, trace, warn};
use quill_shared::character_reader::{CharacterReader, Span};

mod attr_replacements;
mod foreign;
mod helper;
mod in_body;
mod in_head;
mod in_select;
mod in_table;
pub mod quirks;
pub mod tree_builder;

/// Maximum number of entries of the open element stack that are looked at when checking whether
/// an element is in scope. Anything deeper is considered out of scope.
pub const MAX_SCOPE_SEARCH_DEPTH: usize = 256;

/// Default maximum depth of the open element stack
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Insertion modes as defined in 13.2.4.1
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InsertionMode {
    Initial,
    BeforeHtml,
    BeforeHead,
    InHead,
    InHeadNoscript,
    AfterHead,
    InBody,
    Text,
    InTable,
    InTableText,
    InCaption,
    InColumnGroup,
    InTableBody,
    InRow,
    InCell,
    InSelect,
    InSelectInTable,
    InTemplate,
    AfterBody,
    InFrameset,
    AfterFrameset,
    AfterAfterBody,
    AfterAfterFrameset,
}

impl fmt::Display for InsertionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InsertionMode::Initial => "initial",
            InsertionMode::BeforeHtml => "before html",
            InsertionMode::BeforeHead => "before head",
            InsertionMode::InHead => "in head",
            InsertionMode::InHeadNoscript => "in head noscript",
            InsertionMode::AfterHead => "after head",
            InsertionMode::InBody => "in body",
            InsertionMode::Text => "text",
            InsertionMode::InTable => "in table",
            InsertionMode::InTableText => "in table text",
            InsertionMode::InCaption => "in caption",
            InsertionMode::InColumnGroup => "in column group",
            InsertionMode::InTableBody => "in table body",
            InsertionMode::InRow => "in row",
            InsertionMode::InCell => "in cell",
            InsertionMode::InSelect => "in select",
            InsertionMode::InSelectInTable => "in select in table",
            InsertionMode::InTemplate => "in template",
            InsertionMode::AfterBody => "after body",
            InsertionMode::InFrameset => "in frameset",
            InsertionMode::AfterFrameset => "after frameset",
            InsertionMode::AfterAfterBody => "after after body",
            InsertionMode::AfterAfterFrameset => "after after frameset",
        };
        write!(f, "{name}")
    }
}

/// Active formatting elements, which could be a regular node(id), or a marker
#[derive(Debug, PartialEq, Clone, Copy)]
enum ActiveElement {
    Node(NodeId),
    Marker,
}

impl ActiveElement {
    fn node_id(&self) -> Option<NodeId> {
        match self {
            ActiveElement::Node(id) => Some(*id),
            ActiveElement::Marker => None,
        }
    }
}

/// Options that steer the parser
#[derive(Clone, Debug)]
pub struct Html5ParserOptions {
    /// Governs how `<noscript>` is parsed
    pub scripting_enabled: bool,
    /// Maximum number of parse errors that are collected. 0 disables error collection.
    pub track_errors: usize,
    /// Remember the source span of the start tag of each element
    pub track_source_positions: bool,
    /// Keep the source spelling of tag names in the tree
    pub preserve_tag_case: bool,
    /// Keep the source spelling of attribute names
    pub preserve_attribute_case: bool,
    /// Maximum depth of the open element stack
    pub max_depth: usize,
}

impl Default for Html5ParserOptions {
    fn default() -> Self {
        Self {
            scripting_enabled: true,
            track_errors: 0,
            track_source_positions: false,
            preserve_tag_case: false,
            preserve_attribute_case: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Html5ParserOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripting_enabled(mut self, enabled: bool) -> Self {
        self.scripting_enabled = enabled;
        self
    }

    pub fn track_errors(mut self, max_errors: usize) -> Self {
        self.track_errors = max_errors;
        self
    }

    pub fn track_source_positions(mut self, enabled: bool) -> Self {
        self.track_source_positions = enabled;
        self
    }

    pub fn preserve_tag_case(mut self, enabled: bool) -> Self {
        self.preserve_tag_case = enabled;
        self
    }

    pub fn preserve_attribute_case(mut self, enabled: bool) -> Self {
        self.preserve_attribute_case = enabled;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// The element in which context a fragment is parsed (the element whose innerHTML is set)
#[derive(Clone, Debug, PartialEq)]
pub struct FragmentContext {
    pub name: String,
    pub namespace: Namespace,
    pub attributes: Vec<Attribute>,
    /// Set when the context element is inside a `<form>` element
    pub form_ancestor: bool,
}

impl FragmentContext {
    /// Context element in the HTML namespace
    pub fn new(name: &str) -> Self {
        Self::with_namespace(name, Namespace::Html)
    }

    pub fn with_namespace(name: &str, namespace: Namespace) -> Self {
        Self {
            name: name.to_string(),
            namespace,
            attributes: Vec::new(),
            form_ancestor: false,
        }
    }

    /// Parses a context in the notation of the html5lib tests: `td`, `svg path` or `math mi`
    pub fn from_qualified_name(qualified: &str) -> Self {
        match qualified.trim().split_once(' ') {
            Some(("svg", name)) => Self::with_namespace(name, Namespace::Svg),
            Some(("math", name)) => Self::with_namespace(name, Namespace::MathMl),
            _ => Self::new(qualified.trim()),
        }
    }

    pub fn with_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_form_ancestor(mut self) -> Self {
        self.form_ancestor = true;
        self
    }
}

/// Defines the scopes for in_scope()
#[derive(Clone, Copy, Debug)]
enum Scope {
    Regular,
    ListItem,
    Button,
    Table,
    Select,
}

/// Defines the mode we should dispatch
#[derive(Clone, Copy, Debug)]
enum DispatcherMode {
    Foreign,
    Html,
}

/// The main parser object. It pulls tokens from the tokenizer and builds the tree in the given sink.
pub struct Html5Parser<'a, S: TreeSink> {
    /// tokenizer object
    tokenizer: Tokenizer<'a>,
    /// The tree that is being built
    sink: &'a mut S,
    /// current insertion mode
    insertion_mode: InsertionMode,
    /// original insertion mode (used for text mode)
    original_insertion_mode: InsertionMode,
    /// template insertion mode stack
    template_insertion_mode: Vec<InsertionMode>,
    /// Current token from the tokenizer
    current_token: Token,
    /// If true, the current token should be processed again
    reprocess_token: bool,
    /// Stack of open elements
    open_elements: Vec<NodeId>,
    /// Current head element
    head_element: Option<NodeId>,
    /// Current form element
    form_element: Option<NodeId>,
    /// If true, scripting is enabled
    scripting_enabled: bool,
    /// if true, we can insert a frameset
    frameset_ok: bool,
    /// Foster parenting flag
    foster_parenting: bool,
    /// Pending table character tokens
    pending_table_character_tokens: String,
    /// Acknowledge self-closing tags
    ack_self_closing: bool,
    /// List of active formatting elements or markers
    active_formatting_elements: Vec<ActiveElement>,
    /// Is the current parsing a fragment case. If so, the context_node should be set as well.
    is_fragment_case: bool,
    /// Context element for fragment parsing. Created in the sink, but never attached to the tree.
    context_node: Option<NodeId>,
    /// Quirks mode of the document as detected from the doctype
    quirks_mode: QuirksMode,
    /// Error logger, which is shared with the tokenizer
    error_logger: Rc<RefCell<ParseErrorList>>,
    /// Ignore when next token is LF
    ignore_lf: bool,
    /// Sometimes tokens needs to be split up. Those parts are queued here before the tokenizer is asked again.
    token_queue: VecDeque<Token>,
    /// When true, the parser is finished and should not consume more tokens (there aren't any)
    parser_finished: bool,
    /// Set when the first `<base href>` has been seen
    base_url_found: bool,
    /// Set when the open element stack hit the maximum depth
    depth_truncated: bool,
    track_source_positions: bool,
    preserve_tag_case: bool,
    max_depth: usize,
}

impl<'a, S: TreeSink> Html5Parser<'a, S> {
    // Initializes the parser for whole document parsing
    fn init(
        tokenizer: Tokenizer<'a>,
        sink: &'a mut S,
        error_logger: Rc<RefCell<ParseErrorList>>,
        options: &Html5ParserOptions,
    ) -> Self {
        Self {
            tokenizer,
            sink,
            insertion_mode: InsertionMode::Initial,
            original_insertion_mode: InsertionMode::Initial,
            template_insertion_mode: vec![],
            current_token: Token::Eof { span: Span::default() },
            reprocess_token: false,
            open_elements: Vec::new(),
            head_element: None,
            form_element: None,
            scripting_enabled: options.scripting_enabled,
            frameset_ok: true,
            foster_parenting: false,
            pending_table_character_tokens: String::new(),
            ack_self_closing: false,
            active_formatting_elements: vec![],
            is_fragment_case: false,
            context_node: None,
            quirks_mode: QuirksMode::NoQuirks,
            error_logger,
            ignore_lf: false,
            token_queue: VecDeque::new(),
            parser_finished: false,
            base_url_found: false,
            depth_truncated: false,
            track_source_positions: options.track_source_positions,
            preserve_tag_case: options.preserve_tag_case,
            max_depth: options.max_depth.max(2),
        }
    }

    fn tokenizer_options(options: &Html5ParserOptions) -> Options {
        Options {
            preserve_tag_case: options.preserve_tag_case,
            preserve_attribute_case: options.preserve_attribute_case,
            ..Options::default()
        }
    }

    /// Parses the input into a full document (including html, head and body elements, which are
    /// created when the input does not have them). Returns the parse errors found, capped at
    /// `track_errors`.
    pub fn parse_document(
        stream: &'a mut CharacterReader,
        sink: &'a mut S,
        options: Option<Html5ParserOptions>,
    ) -> Vec<ParseError> {
        let options = options.unwrap_or_default();

        // Create a new error logger that will be used in both the tokenizer and the parser
        let error_logger = Rc::new(RefCell::new(ParseErrorList::new(options.track_errors)));

        let tokenizer = Tokenizer::new(stream, Some(Self::tokenizer_options(&options)), error_logger.clone());
        let mut parser = Html5Parser::init(tokenizer, sink, error_logger, &options);

        debug!("parsing document");
        parser.do_parse()
    }

    /// Parses a fragment of HTML in the context of the given element, as is done for innerHTML.
    /// The parsed nodes end up as children of a synthetic `html` element, which is the only
    /// child of the sink's document node.
    pub fn parse_fragment(
        stream: &'a mut CharacterReader,
        sink: &'a mut S,
        context: &FragmentContext,
        options: Option<Html5ParserOptions>,
    ) -> Vec<ParseError> {
        // https://html.spec.whatwg.org/multipage/parsing.html#parsing-html-fragments
        let options = options.unwrap_or_default();

        // 1.
        let error_logger = Rc::new(RefCell::new(ParseErrorList::new(options.track_errors)));

        // 2. / 3.
        let mut tokenizer_options = Self::tokenizer_options(&options);
        tokenizer_options.initial_state =
            find_initial_state_for_context(&context.name, context.namespace, options.scripting_enabled);
        tokenizer_options.last_start_tag = context.name.to_ascii_lowercase();

        let tokenizer = Tokenizer::new(stream, Some(tokenizer_options), error_logger.clone());
        let mut parser = Html5Parser::init(tokenizer, sink, error_logger, &options);

        // 4.
        parser.initialize_fragment_case(context);

        // 5.
        let document = parser.sink.document();
        let root = parser
            .sink
            .create_element("html", Namespace::Html, &[], Span::default());
        parser.sink.append_child(document, root);
        parser.open_elements.push(root);

        // 6.
        if context.name == "template" && context.namespace == Namespace::Html {
            parser.template_insertion_mode.push(InsertionMode::InTemplate);
        }

        // 7.
        parser.reset_insertion_mode();

        // 8.
        if context.namespace == Namespace::Html && context.name == "form" {
            parser.form_element = parser.context_node;
        } else if context.form_ancestor {
            let form = parser
                .sink
                .create_element("form", Namespace::Html, &[], Span::default());
            parser.form_element = Some(form);
        }

        // 9. / 10.
        debug!("parsing fragment in context <{}>", context.name);
        parser.do_parse()
    }

    /// Internal parser function that does the actual parsing
    fn do_parse(&mut self) -> Vec<ParseError> {
        let mut dispatcher_mode = DispatcherMode::Html;

        loop {
            // When the parser is signalled to finish, we break our main parser loop
            if self.parser_finished {
                break;
            }

            // If reprocess_token is true, we should process the same token again
            if !self.reprocess_token {
                self.current_token = self.fetch_next_token();
                self.ack_self_closing = false;

                #[cfg(feature = "debug_parser_verbose")]
                println!("token: {}", self.current_token);

                dispatcher_mode = self.select_dispatch_mode();
            }

            self.reprocess_token = false;

            let mode_before = self.insertion_mode;

            // Check how we should dispatch the token, and dispatch to the correct function
            match dispatcher_mode {
                DispatcherMode::Foreign => {
                    self.process_foreign_content();
                }
                DispatcherMode::Html => {
                    self.process_html_content();
                }
            }

            if mode_before != self.insertion_mode {
                trace!("insertion mode: {} -> {}", mode_before, self.insertion_mode);
            }

            if self.reprocess_token {
                // Only the insertion modes ask for reprocessing, foreign content hands over to
                // them directly
                dispatcher_mode = DispatcherMode::Html;
            } else {
                self.check_self_closing_acknowledged();
            }

            #[cfg(all(feature = "debug_parser", test))]
            self.display_debug_info();
        }

        let errors = self.error_logger.borrow().errors().to_vec();
        debug!(
            "parsing finished: {} nodes open, {} parse errors",
            self.open_elements.len(),
            errors.len()
        );

        errors
    }

    /// Process a token in HTML content
    fn process_html_content(&mut self) {
        if self.ignore_lf {
            self.ignore_lf = false;

            if let Token::Text { text: value, cdata, span } = &self.current_token {
                if let Some(rest) = value.strip_prefix('\n') {
                    if rest.is_empty() {
                        return;
                    }

                    self.current_token = Token::Text {
                        text: rest.to_string(),
                        cdata: *cdata,
                        span: *span,
                    };
                }
            }
        }

        match self.insertion_mode {
            InsertionMode::Initial => {
                let mut anything_else = false;

                match &self.current_token.clone() {
                    Token::Text { text: value, .. } if self.current_token.is_mixed() => {
                        self.requeue_split_token(value);
                    }
                    Token::Text { .. } if self.current_token.is_empty_or_white() => {
                        // ignore token
                    }
                    Token::Comment { .. } => {
                        let document = self.sink.document();
                        self.insert_comment_element(&self.current_token.clone(), Some(document));
                    }
                    Token::DocType {
                        name,
                        pub_identifier,
                        sys_identifier,
                        force_quirks,
                        ..
                    } => {
                        if name.as_deref() != Some("html")
                            || pub_identifier.is_some()
                            || sys_identifier
                                .as_deref()
                                .is_some_and(|sys_id| sys_id != "about:legacy-compat")
                        {
                            self.parse_error("unexpected doctype in initial insertion mode");
                        }

                        self.insert_doctype_element(&self.current_token.clone());

                        if !self.is_fragment_case {
                            self.set_quirks_mode(identify_quirks_mode(
                                name.as_deref(),
                                pub_identifier.as_deref(),
                                sys_identifier.as_deref(),
                                *force_quirks,
                            ));
                        }

                        self.insertion_mode = InsertionMode::BeforeHtml;
                    }
                    _ => {
                        self.parse_error(&format!("expected doctype but got {}", self.current_token.kind()));
                        anything_else = true;
                    }
                }

                if anything_else {
                    if !self.is_fragment_case {
                        self.set_quirks_mode(QuirksMode::Quirks);
                    }

                    self.insertion_mode = InsertionMode::BeforeHtml;
                    self.reprocess_token = true;
                }
            }
            InsertionMode::BeforeHtml => {
                let mut anything_else = false;

                match &self.current_token.clone() {
                    Token::DocType { .. } => {
                        self.unexpected_token();
                        // ignore token
                    }
                    Token::Comment { .. } => {
                        let document = self.sink.document();
                        self.insert_comment_element(&self.current_token.clone(), Some(document));
                    }
                    Token::Text { text: value, .. } if self.current_token.is_mixed() => {
                        self.requeue_split_token(value);
                    }
                    Token::Text { .. } if self.current_token.is_empty_or_white() => {
                        // ignore token
                    }
                    Token::StartTag { name, .. } if name == "html" => {
                        self.insert_document_element(&self.current_token.clone());

                        self.insertion_mode = InsertionMode::BeforeHead;
                    }
                    Token::EndTag { name, .. } if ["head", "body", "html", "br"].contains(&name.as_str()) => {
                        anything_else = true;
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
                    self.insert_document_element(&synthetic_start_tag("html"));

                    self.insertion_mode = InsertionMode::BeforeHead;
                    self.reprocess_token = true;
                }
            }
            InsertionMode::BeforeHead => {
                let mut anything_else = false;

                match &self.current_token.clone() {
                    Token::Text { text: value, .. } if self.current_token.is_mixed() => {
                        self.requeue_split_token(value);
                    }
                    Token::Text { .. } if self.current_token.is_empty_or_white() => {
                        // ignore token
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
                    Token::StartTag { name, .. } if name == "head" => {
                        let node_id = self.insert_html_element(&self.current_token.clone());
                        self.head_element = Some(node_id);
                        self.insertion_mode = InsertionMode::InHead;
                    }
                    Token::EndTag { name, .. } if ["head", "body", "html", "br"].contains(&name.as_str()) => {
                        anything_else = true;
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
                    let node_id = self.insert_html_element(&synthetic_start_tag("head"));
                    self.head_element = Some(node_id);
                    self.insertion_mode = InsertionMode::InHead;
                    self.reprocess_token = true;
                }
            }
            InsertionMode::InHead => self.handle_in_head(),
            InsertionMode::InHeadNoscript => {
                let mut anything_else = false;

                match &self.current_token.clone() {
                    Token::DocType { .. } => {
                        self.unexpected_token();
                        // ignore token
                    }
                    Token::StartTag { name, .. } if name == "html" => {
                        self.handle_in_body();
                    }
                    Token::EndTag { name, .. } if name == "noscript" => {
                        self.open_elements.pop();
                        self.insertion_mode = InsertionMode::InHead;
                    }
                    Token::Text { text: value, .. } if self.current_token.is_mixed() => {
                        self.requeue_split_token(value);
                    }
                    Token::Text { .. } if self.current_token.is_empty_or_white() => {
                        self.handle_in_head();
                    }
                    Token::Comment { .. } => {
                        self.handle_in_head();
                    }
                    Token::StartTag { name, .. }
                        if ["basefont", "bgsound", "link", "meta", "noframes", "style"].contains(&name.as_str()) =>
                    {
                        self.handle_in_head();
                    }
                    Token::EndTag { name, .. } if name == "br" => {
                        anything_else = true;
                    }
                    Token::StartTag { name, .. } if name == "head" || name == "noscript" => {
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
                    self.unexpected_token();

                    self.open_elements.pop();
                    self.insertion_mode = InsertionMode::InHead;
                    self.reprocess_token = true;
                }
            }
            InsertionMode::AfterHead => {
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
                    Token::StartTag { name, .. } if name == "body" => {
                        self.insert_html_element(&self.current_token.clone());

                        self.frameset_ok = false;
                        self.insertion_mode = InsertionMode::InBody;
                    }
                    Token::StartTag { name, .. } if name == "frameset" => {
                        self.insert_html_element(&self.current_token.clone());

                        self.insertion_mode = InsertionMode::InFrameset;
                    }
                    Token::StartTag { name, .. }
                        if [
                            "base", "basefont", "bgsound", "link", "meta", "noframes", "script", "style", "template",
                            "title",
                        ]
                        .contains(&name.as_str()) =>
                    {
                        self.unexpected_token();

                        if let Some(node_id) = self.head_element {
                            self.open_elements.push(node_id);
                        }

                        self.handle_in_head();

                        // The head element might not be the current node at this point
                        if let Some(node_id) = self.head_element {
                            self.open_elements_remove(node_id);
                        }
                    }
                    Token::EndTag { name, .. } if name == "template" => {
                        self.handle_in_head();
                    }
                    Token::EndTag { name, .. } if name == "body" || name == "html" || name == "br" => {
                        anything_else = true;
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
                    self.insert_html_element(&synthetic_start_tag("body"));

                    self.insertion_mode = InsertionMode::InBody;
                    self.reprocess_token = true;
                }
            }
            InsertionMode::InBody => self.handle_in_body(),
            InsertionMode::Text => match &self.current_token {
                Token::Text { .. } => {
                    self.insert_text_element(&self.current_token.clone());
                }
                Token::Eof { .. } => {
                    self.unexpected_token();

                    self.open_elements.pop();
                    self.insertion_mode = self.original_insertion_mode;
                    self.reprocess_token = true;
                }
                _ => {
                    self.open_elements.pop();
                    self.insertion_mode = self.original_insertion_mode;
                }
            },
            InsertionMode::InTable => self.handle_in_table(),
            InsertionMode::InTableText => self.handle_in_table_text(),
            InsertionMode::InCaption => self.handle_in_caption(),
            InsertionMode::InColumnGroup => self.handle_in_column_group(),
            InsertionMode::InTableBody => self.handle_in_table_body(),
            InsertionMode::InRow => self.handle_in_row(),
            InsertionMode::InCell => self.handle_in_cell(),
            InsertionMode::InSelect => self.handle_in_select(),
            InsertionMode::InSelectInTable => self.handle_in_select_in_table(),
            InsertionMode::InTemplate => self.handle_in_template(),
            InsertionMode::AfterBody => {
                let mut anything_else = false;

                match &self.current_token.clone() {
                    Token::Text { text: value, .. } if self.current_token.is_mixed() => {
                        self.requeue_split_token(value);
                    }
                    Token::Text { .. } if self.current_token.is_empty_or_white() => {
                        self.handle_in_body();
                    }
                    Token::Comment { .. } => {
                        let html_node_id = self.open_elements.first().copied();
                        self.insert_comment_element(&self.current_token.clone(), html_node_id);
                    }
                    Token::DocType { .. } => {
                        self.unexpected_token();
                        // ignore token
                    }
                    Token::StartTag { name, .. } if name == "html" => {
                        self.handle_in_body();
                    }
                    Token::EndTag { name, .. } if name == "html" => {
                        if self.is_fragment_case {
                            self.unexpected_token();
                            // ignore token
                            return;
                        }

                        self.insertion_mode = InsertionMode::AfterAfterBody;
                    }
                    Token::Eof { .. } => {
                        self.stop_parsing();
                    }
                    _ => {
                        anything_else = true;
                    }
                }

                if anything_else {
                    self.unexpected_token();

                    self.insertion_mode = InsertionMode::InBody;
                    self.reprocess_token = true;
                }
            }
            InsertionMode::InFrameset => {
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
                    Token::StartTag { name, .. } if name == "frameset" => {
                        self.insert_html_element(&self.current_token.clone());
                    }
                    Token::EndTag { name, .. } if name == "frameset" => {
                        if self.current_node_is("html") {
                            // fragment case
                            self.unexpected_token();
                            // ignore token
                            return;
                        }

                        self.open_elements.pop();

                        if !self.is_fragment_case && !self.current_node_is("frameset") {
                            self.insertion_mode = InsertionMode::AfterFrameset;
                        }
                    }
                    Token::StartTag {
                        name, is_self_closing, ..
                    } if name == "frame" => {
                        self.insert_html_element(&self.current_token.clone());
                        self.open_elements.pop();

                        self.acknowledge_closing_tag(*is_self_closing);
                    }
                    Token::StartTag { name, .. } if name == "noframes" => {
                        self.handle_in_head();
                    }
                    Token::Eof { .. } => {
                        if !self.current_node_is("html") {
                            self.unexpected_token();
                        }
                        self.stop_parsing();
                    }
                    _ => {
                        self.unexpected_token();
                        // ignore token
                    }
                }
            }
            InsertionMode::AfterFrameset => {
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
                    Token::EndTag { name, .. } if name == "html" => {
                        self.insertion_mode = InsertionMode::AfterAfterFrameset;
                    }
                    Token::StartTag { name, .. } if name == "noframes" => {
                        self.handle_in_head();
                    }
                    Token::Eof { .. } => {
                        self.stop_parsing();
                    }
                    _ => {
                        self.unexpected_token();
                        // ignore token
                    }
                }
            }
            InsertionMode::AfterAfterBody => {
                let mut anything_else = false;

                match &self.current_token.clone() {
                    Token::Comment { .. } => {
                        let document = self.sink.document();
                        self.insert_comment_element(&self.current_token.clone(), Some(document));
                    }
                    Token::Text { text: value, .. } if self.current_token.is_mixed() => {
                        self.requeue_split_token(value);
                    }
                    Token::DocType { .. } => {
                        self.handle_in_body();
                    }
                    Token::Text { .. } if self.current_token.is_empty_or_white() => {
                        self.handle_in_body();
                    }
                    Token::StartTag { name, .. } if name == "html" => {
                        self.handle_in_body();
                    }
                    Token::Eof { .. } => {
                        self.stop_parsing();
                    }
                    _ => {
                        anything_else = true;
                    }
                }

                if anything_else {
                    self.unexpected_token();
                    self.insertion_mode = InsertionMode::InBody;
                    self.reprocess_token = true;
                }
            }
            InsertionMode::AfterAfterFrameset => {
                match &self.current_token.clone() {
                    Token::Comment { .. } => {
                        let document = self.sink.document();
                        self.insert_comment_element(&self.current_token.clone(), Some(document));
                    }
                    Token::Text { text: value, .. } if self.current_token.is_mixed() => {
                        self.requeue_split_token(value);
                    }
                    Token::DocType { .. } => {
                        self.handle_in_body();
                    }
                    Token::Text { .. } if self.current_token.is_empty_or_white() => {
                        self.handle_in_body();
                    }
                    Token::StartTag { name, .. } if name == "html" => {
                        self.handle_in_body();
                    }
                    Token::Eof { .. } => {
                        self.stop_parsing();
                    }
                    Token::StartTag { name, .. } if name == "noframes" => {
                        self.handle_in_head();
                    }
                    _ => {
                        self.unexpected_token();
                        // ignore token
                    }
                }
            }
        }
    }

    fn set_quirks_mode(&mut self, quirks_mode: QuirksMode) {
        self.quirks_mode = quirks_mode;
        self.sink.set_quirks_mode(quirks_mode);
    }

    fn acknowledge_closing_tag(&mut self, is_self_closing: bool) {
        if is_self_closing {
            self.ack_self_closing = true;
        }
    }

    /// Reports a parse error when the current token is a self-closing start tag that nobody acknowledged
    fn check_self_closing_acknowledged(&mut self) {
        if let Token::StartTag {
            is_self_closing: true, ..
        } = self.current_token
        {
            if !self.ack_self_closing {
                self.parse_error(ParserError::NonVoidHtmlElementStartTagWithTrailingSolidus.as_str());
            }
        }
    }

    /// Returns the id of the current node, or the document node when no element is open
    fn current_node(&self) -> NodeId {
        self.open_elements
            .last()
            .copied()
            .unwrap_or_else(|| self.sink.document())
    }

    /// Returns the name of the given node
    fn node_name(&self, node_id: NodeId) -> &str {
        self.sink.element_name(node_id)
    }

    /// Returns true when the node is an HTML element with the given name
    fn is_html_node(&self, node_id: NodeId, name: &str) -> bool {
        self.sink.namespace(node_id) == Namespace::Html && self.sink.element_name(node_id) == name
    }

    /// Returns true when the current node is an HTML element with the given name
    fn current_node_is(&self, name: &str) -> bool {
        self.is_html_node(self.current_node(), name)
    }

    /// Returns true when the current node is an HTML element with any of the given names
    fn current_node_is_any(&self, names: &[&str]) -> bool {
        let current = self.current_node();
        self.sink.namespace(current) == Namespace::Html && names.contains(&self.node_name(current))
    }

    /// Pops the last element from the open elements until we reach $name
    fn pop_until_named(&mut self, name: &str) {
        while let Some(node_id) = self.open_elements.pop() {
            if self.is_html_node(node_id, name) {
                break;
            }
        }
    }

    /// Pops the last element from the open elements until we reach any of the elements in $arr
    fn pop_until_any(&mut self, arr: &[&str]) {
        while let Some(node_id) = self.open_elements.pop() {
            if self.sink.namespace(node_id) == Namespace::Html && arr.contains(&self.node_name(node_id)) {
                break;
            }
        }
    }

    /// Pops the open elements until the given node has been popped
    fn pop_until_node(&mut self, target_node_id: NodeId) {
        while let Some(node_id) = self.open_elements.pop() {
            if node_id == target_node_id {
                break;
            }
        }
    }

    /// Remove the given node_id from the open elements stack. Will do nothing when the node_id is not found
    fn open_elements_remove(&mut self, target_node_id: NodeId) {
        self.open_elements.retain(|&node_id| node_id != target_node_id);
    }

    /// Returns true when the open elements have an HTML element named $name
    fn open_elements_has(&self, name: &str) -> bool {
        self.open_elements
            .iter()
            .rev()
            .any(|&node_id| self.is_html_node(node_id, name))
    }

    /// Retrieves a list of all errors generated by the parser/tokenizer
    pub fn get_parse_errors(&self) -> Vec<ParseError> {
        self.error_logger.borrow().errors().to_vec()
    }

    /// Send a parse error to the error logger
    fn parse_error(&self, message: &str) {
        self.error_logger
            .borrow_mut()
            .add(self.current_token.span().start, message);
    }

    /// Reports the current token as unexpected in the current insertion mode
    fn unexpected_token(&self) {
        {
            let logger = self.error_logger.borrow();
            if !logger.is_tracking() || logger.is_full() {
                return;
            }
        }

        self.parse_error(&format!(
            "unexpected {} in {} insertion mode",
            self.current_token.kind(),
            self.insertion_mode
        ));
    }

    /// This function will pop elements off the stack until it reaches the first element that matches
    /// our condition (which can be changed with the except and thoroughly parameters)
    fn generate_implied_end_tags(&mut self, except: Option<&str>, thoroughly: bool) {
        loop {
            if self.open_elements.is_empty() {
                return;
            }

            let node_id = self.current_node();
            if self.sink.namespace(node_id) != Namespace::Html {
                return;
            }

            let tag = self.node_name(node_id);
            if except == Some(tag) {
                return;
            }

            if thoroughly {
                if ![
                    "caption", "colgroup", "tbody", "td", "tfoot", "th", "thead", "tr", "dd", "dt", "li", "option",
                    "optgroup", "p", "rb", "rp", "rt", "rtc",
                ]
                .contains(&tag)
                {
                    return;
                }
            } else if !["dd", "dt", "li", "option", "optgroup", "p", "rb", "rp", "rt", "rtc"].contains(&tag) {
                return;
            }

            self.open_elements.pop();
        }
    }

    /// Reset insertion mode based on all kind of rules
    fn reset_insertion_mode(&mut self) {
        let mut last = false;
        let Some(mut idx) = self.open_elements.len().checked_sub(1) else {
            self.insertion_mode = InsertionMode::InBody;
            return;
        };

        loop {
            let mut node_id = self.open_elements[idx];
            if idx == 0 {
                last = true;

                // fragment case
                if let Some(context_node_id) = self.context_node {
                    node_id = context_node_id;
                }
            }

            let name = if self.sink.namespace(node_id) == Namespace::Html {
                self.node_name(node_id)
            } else {
                ""
            };

            let mode = match name {
                "select" => {
                    if !last {
                        for &ancestor in self.open_elements[..idx].iter().rev() {
                            if self.is_html_node(ancestor, "template") {
                                break;
                            }
                            if self.is_html_node(ancestor, "table") {
                                self.insertion_mode = InsertionMode::InSelectInTable;
                                return;
                            }
                        }
                    }
                    Some(InsertionMode::InSelect)
                }
                "td" | "th" if !last => Some(InsertionMode::InCell),
                "tr" => Some(InsertionMode::InRow),
                "tbody" | "thead" | "tfoot" => Some(InsertionMode::InTableBody),
                "caption" => Some(InsertionMode::InCaption),
                "colgroup" => Some(InsertionMode::InColumnGroup),
                "table" => Some(InsertionMode::InTable),
                "template" => Some(
                    self.template_insertion_mode
                        .last()
                        .copied()
                        .unwrap_or(InsertionMode::InTemplate),
                ),
                "head" if !last => Some(InsertionMode::InHead),
                "body" => Some(InsertionMode::InBody),
                // fragment case
                "frameset" => Some(InsertionMode::InFrameset),
                "html" => {
                    if self.head_element.is_none() {
                        // fragment case
                        Some(InsertionMode::BeforeHead)
                    } else {
                        Some(InsertionMode::AfterHead)
                    }
                }
                _ => None,
            };

            if let Some(mode) = mode {
                self.insertion_mode = mode;
                return;
            }

            if last {
                // fragment case
                self.insertion_mode = InsertionMode::InBody;
                return;
            }

            idx -= 1;
        }
    }

    /// Pop all elements back to a table context
    fn clear_stack_back_to_table_context(&mut self) {
        while !self.open_elements.is_empty() && !self.current_node_is_any(&["table", "template", "html"]) {
            self.open_elements.pop();
        }
    }

    /// Pop all elements back to a table body context
    fn clear_stack_back_to_table_body_context(&mut self) {
        while !self.open_elements.is_empty()
            && !self.current_node_is_any(&["tbody", "tfoot", "thead", "template", "html"])
        {
            self.open_elements.pop();
        }
    }

    /// Pop all elements back to a table row context
    fn clear_stack_back_to_table_row_context(&mut self) {
        while !self.open_elements.is_empty() && !self.current_node_is_any(&["tr", "template", "html"]) {
            self.open_elements.pop();
        }
    }

    /// Checks if the given HTML element is in given scope
    fn is_in_scope(&self, tag: &str, scope: Scope) -> bool {
        self.in_scope_by(|parser, node_id| parser.is_html_node(node_id, tag), scope)
    }

    /// Checks if any of the given HTML elements is in given scope
    fn is_any_in_scope(&self, tags: &[&str], scope: Scope) -> bool {
        self.in_scope_by(
            |parser, node_id| {
                parser.sink.namespace(node_id) == Namespace::Html && tags.contains(&parser.node_name(node_id))
            },
            scope,
        )
    }

    /// Checks if the given node is in given scope
    fn is_node_in_scope(&self, target_node_id: NodeId, scope: Scope) -> bool {
        self.in_scope_by(|_, node_id| node_id == target_node_id, scope)
    }

    fn in_scope_by(&self, matches: impl Fn(&Self, NodeId) -> bool, scope: Scope) -> bool {
        for &node_id in self.open_elements.iter().rev().take(MAX_SCOPE_SEARCH_DEPTH) {
            if matches(self, node_id) {
                return true;
            }

            let name = self.node_name(node_id);
            let namespace = self.sink.namespace(node_id);

            let default_html_scope = [
                "applet", "caption", "html", "table", "td", "th", "marquee", "object", "template",
            ];
            let default_mathml_scope = ["mo", "mi", "ms", "mn", "mtext", "annotation-xml"];
            let default_svg_scope = ["foreignObject", "desc", "title"];

            let in_default_scope = match namespace {
                Namespace::Html => default_html_scope.contains(&name),
                Namespace::MathMl => default_mathml_scope.contains(&name),
                Namespace::Svg => default_svg_scope.contains(&name),
                _ => false,
            };

            let boundary = match scope {
                Scope::Regular => in_default_scope,
                Scope::ListItem => in_default_scope || (namespace == Namespace::Html && ["ol", "ul"].contains(&name)),
                Scope::Button => in_default_scope || (namespace == Namespace::Html && name == "button"),
                Scope::Table => namespace == Namespace::Html && ["html", "template", "table"].contains(&name),
                Scope::Select => !(namespace == Namespace::Html && ["optgroup", "option"].contains(&name)),
            };

            if boundary {
                return false;
            }
        }

        false
    }

    /// Closes a table cell and switches the insertion mode to InRow
    fn close_cell(&mut self) {
        self.generate_implied_end_tags(None, false);

        if !self.current_node_is_any(&["td", "th"]) {
            self.parse_error("current node should be td or th");
        }

        self.pop_until_any(&["td", "th"]);

        self.active_formatting_elements_clear_until_marker();
        self.insertion_mode = InsertionMode::InRow;
    }

    fn stop_parsing(&mut self) {
        self.parser_finished = true;
    }

    /// Close the p element that may or may not be on the open elements stack
    fn close_p_element(&mut self) {
        self.generate_implied_end_tags(Some("p"), false);

        if !self.current_node_is("p") {
            self.parse_error("p element not at top of stack");
        }

        self.pop_until_named("p");
    }

    /// Switch the parser and tokenizer to the RAWTEXT state
    fn parse_raw_data(&mut self) {
        self.insert_html_element(&self.current_token.clone());

        self.tokenizer.set_state(State::RAWTEXT);

        self.original_insertion_mode = self.insertion_mode;
        self.insertion_mode = InsertionMode::Text;
    }

    /// Switch the parser and tokenizer to the RCDATA state
    fn parse_rcdata(&mut self) {
        self.insert_html_element(&self.current_token.clone());

        self.tokenizer.set_state(State::RCDATA);

        self.original_insertion_mode = self.insertion_mode;
        self.insertion_mode = InsertionMode::Text;
    }

    #[cfg(all(feature = "debug_parser", test))]
    fn display_debug_info(&self) {
        println!("-----------------------------------------\n");
        println!("current token   : '{}'", self.current_token);
        println!("insertion mode  : {}", self.insertion_mode);
        print!("Open elements   : [ ");
        for node_id in &self.open_elements {
            print!("({}) {}, ", node_id, self.node_name(*node_id));
        }
        println!("]");

        print!("Active elements : [");
        for elem in &self.active_formatting_elements {
            match elem {
                ActiveElement::Node(node_id) => print!("({}) {}, ", node_id, self.node_name(*node_id)),
                ActiveElement::Marker => print!("marker, "),
            }
        }
        println!("]");
    }

    /// Handles any other end tag as found during the in-body insertion mode. This needs to be a
    /// separate function as this is also called during the adoption agency algorithm
    fn handle_in_body_any_other_end_tag(&mut self, tag_name: &str) {
        for idx in (0..self.open_elements.len()).rev() {
            let node_id = self.open_elements[idx];

            if self.is_html_node(node_id, tag_name) {
                self.generate_implied_end_tags(Some(tag_name), false);

                // It might be possible that the last item is not our node_id. Emit parse error if so
                if self.current_node() != node_id {
                    self.parse_error(&format!("end tag </{tag_name}> does not close the current node"));
                }

                self.pop_until_node(node_id);
                return;
            }

            if is_special(self.node_name(node_id), self.sink.namespace(node_id)) {
                self.unexpected_token();
                // ignore token
                return;
            }
        }
    }

    fn parser_data(&self) -> ParserData {
        if self.open_elements.is_empty() {
            return ParserData::default();
        }

        ParserData {
            adjusted_node_namespace: self.sink.namespace(self.adjusted_current_node()),
        }
    }

    /// Fetches the next token. Split parts of earlier tokens are handed out before the tokenizer is asked again.
    fn fetch_next_token(&mut self) -> Token {
        if let Some(token) = self.token_queue.pop_front() {
            return token;
        }

        let token = self.tokenizer.next_token(self.parser_data());
        trace!("token: {}", token.kind());
        token
    }

    /// Returns the adjusted current node: the context element when parsing a fragment and only the
    /// root element is open, otherwise the current node.
    fn adjusted_current_node(&self) -> NodeId {
        match self.context_node {
            // fragment case
            Some(context_node_id) if self.open_elements.len() == 1 => context_node_id,
            _ => self.current_node(),
        }
    }

    // Initialize all parser settings for parsing a fragment case
    fn initialize_fragment_case(&mut self, context: &FragmentContext) {
        self.is_fragment_case = true;

        let context_node_id =
            self.sink
                .create_element(&context.name, context.namespace, &context.attributes, Span::default());
        self.context_node = Some(context_node_id);
    }

    /// Splits the given text in groups and puts them in front of the token queue, so they are
    /// processed one by one.
    fn requeue_split_token(&mut self, text: &str) {
        let tokens = self.split_mixed_token(text);
        for token in tokens.into_iter().rev() {
            self.token_queue.push_front(token);
        }
    }

    /// Splits a regular text token with mixed characters into tokens of 3 groups:
    /// null-characters, (ascii) whitespaces, and regular (rest) characters.
    ///
    /// example:
    ///
    ///   Token::Text("  foo bar\0  ")
    ///
    /// is split into 6 tokens:
    ///
    ///   Token::Text("  ")  // whitespace
    ///   Token::Text("foo") // regular
    ///   Token::Text(" ")   // whitespace
    ///   Token::Text("bar") // regular
    ///   Token::Text("\0")  // null
    ///   Token::Text("  ")  // whitespace
    ///
    /// The tokenizer does not know about the context of the text, so it emits text as greedy as
    /// possible. Large blobs of text that need no distinction (script contents for instance) are
    /// never split.
    fn split_mixed_token(&self, text: &str) -> Vec<Token> {
        self.split_text_by(text, |ch| {
            if ch == '\0' {
                '0'
            } else if ch.is_ascii_whitespace() {
                'w'
            } else {
                'r'
            }
        })
    }

    /// This will split tokens into \0 groups and non-\0 groups.
    fn split_mixed_token_null(&self, text: &str) -> Vec<Token> {
        self.split_text_by(text, |ch| if ch == '\0' { '0' } else { 'r' })
    }

    fn split_text_by(&self, text: &str, group_of: impl Fn(char) -> char) -> Vec<Token> {
        let (cdata, span) = match &self.current_token {
            Token::Text { cdata, span, .. } => (*cdata, *span),
            token => (false, token.span()),
        };

        let mut tokens = vec![];
        let mut last_group = 'x';
        let mut found = String::new();

        for ch in text.chars() {
            let group = group_of(ch);

            if last_group != group && !found.is_empty() {
                tokens.push(Token::Text {
                    text: std::mem::take(&mut found),
                    cdata,
                    span,
                });
            }

            found.push(ch);
            last_group = group;
        }

        if !found.is_empty() {
            tokens.push(Token::Text {
                text: found,
                cdata,
                span,
            });
        }

        tokens
    }
}

/// Creates a start tag token for an element that is implied by the parser
fn synthetic_start_tag(name: &str) -> Token {
    Token::StartTag {
        name: name.to_string(),
        raw_name: name.to_string(),
        is_self_closing: false,
        attributes: vec![],
        span: Span::default(),
    }
}

/// Find the correct tokenizer state when we are about to parse a fragment case
fn find_initial_state_for_context(name: &str, namespace: Namespace, scripting_enabled: bool) -> State {
    if namespace != Namespace::Html {
        return State::Data;
    }

    match name {
        "title" | "textarea" => State::RCDATA,
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => State::RAWTEXT,
        "script" => State::ScriptData,
        "noscript" => {
            if scripting_enabled {
                State::RAWTEXT
            } else {
                State::Data
            }
        }
        "plaintext" => State::PLAINTEXT,
        _ => State::Data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn parser_with<'a>(stream: &'a mut CharacterReader, doc: &'a mut Document) -> Html5Parser<'a, Document> {
        let options = Html5ParserOptions::default();
        let error_logger = Rc::new(RefCell::new(ParseErrorList::new(10)));
        let tokenizer = Tokenizer::new(stream, None, error_logger.clone());
        Html5Parser::init(tokenizer, doc, error_logger, &options)
    }

    macro_rules! node_create {
        ($parser:expr, $name:expr) => {{
            let node_id = $parser
                .sink
                .create_element($name, Namespace::Html, &[], Span::default());
            let parent = $parser.current_node();
            $parser.sink.append_child(parent, node_id);
            $parser.open_elements.push(node_id);
            node_id
        }};
    }

    #[test]
    fn is_in_scope() {
        let stream = &mut CharacterReader::new("");
        let doc = &mut Document::new();
        let mut parser = parser_with(stream, doc);

        node_create!(parser, "html");
        node_create!(parser, "div");
        node_create!(parser, "p");
        node_create!(parser, "button");
        assert!(parser.is_in_scope("p", Scope::Regular));
        assert!(!parser.is_in_scope("p", Scope::Button));
        assert!(parser.is_in_scope("p", Scope::ListItem));
        assert!(!parser.is_in_scope("p", Scope::Select));
    }

    #[test]
    fn is_in_scope_empty_stack() {
        let stream = &mut CharacterReader::new("");
        let doc = &mut Document::new();
        let parser = parser_with(stream, doc);

        assert!(!parser.is_in_scope("p", Scope::Regular));
        assert!(!parser.is_in_scope("p", Scope::Button));
        assert!(!parser.is_in_scope("p", Scope::ListItem));
        assert!(!parser.is_in_scope("p", Scope::Select));
    }

    #[test]
    fn is_in_scope_table_boundary() {
        let stream = &mut CharacterReader::new("");
        let doc = &mut Document::new();
        let mut parser = parser_with(stream, doc);

        node_create!(parser, "html");
        node_create!(parser, "div");
        node_create!(parser, "table");
        node_create!(parser, "tr");
        assert!(!parser.is_in_scope("div", Scope::Regular));
        assert!(!parser.is_in_scope("div", Scope::Table));
        assert!(parser.is_in_scope("tr", Scope::Table));
        assert!(parser.is_in_scope("table", Scope::Table));
        assert!(!parser.is_in_scope("foo", Scope::Regular));
    }

    #[test]
    fn is_in_scope_list_item() {
        let stream = &mut CharacterReader::new("");
        let doc = &mut Document::new();
        let mut parser = parser_with(stream, doc);

        node_create!(parser, "html");
        node_create!(parser, "li");
        node_create!(parser, "ul");
        node_create!(parser, "span");
        assert!(!parser.is_in_scope("li", Scope::ListItem));
        assert!(parser.is_in_scope("li", Scope::Regular));
    }

    #[test]
    fn is_in_scope_depth_limit() {
        let stream = &mut CharacterReader::new("");
        let doc = &mut Document::new();
        let mut parser = parser_with(stream, doc);

        node_create!(parser, "html");
        node_create!(parser, "p");
        for _ in 0..MAX_SCOPE_SEARCH_DEPTH {
            node_create!(parser, "span");
        }
        assert!(!parser.is_in_scope("p", Scope::Regular));

        parser.open_elements.pop();
        assert!(parser.is_in_scope("p", Scope::Regular));
    }

    #[test]
    fn reset_insertion_mode() {
        let stream = &mut CharacterReader::new("");
        let doc = &mut Document::new();
        let mut parser = parser_with(stream, doc);

        node_create!(parser, "html");
        node_create!(parser, "body");
        node_create!(parser, "table");
        node_create!(parser, "tbody");
        node_create!(parser, "tr");
        node_create!(parser, "td");
        node_create!(parser, "select");
        parser.reset_insertion_mode();
        assert_eq!(parser.insertion_mode, InsertionMode::InSelectInTable);

        parser.open_elements.pop();
        parser.reset_insertion_mode();
        assert_eq!(parser.insertion_mode, InsertionMode::InCell);

        parser.open_elements.pop();
        parser.reset_insertion_mode();
        assert_eq!(parser.insertion_mode, InsertionMode::InRow);

        parser.open_elements.truncate(2);
        parser.reset_insertion_mode();
        assert_eq!(parser.insertion_mode, InsertionMode::InBody);
    }

    #[test]
    fn generate_implied_end_tags() {
        let stream = &mut CharacterReader::new("");
        let doc = &mut Document::new();
        let mut parser = parser_with(stream, doc);

        node_create!(parser, "html");
        node_create!(parser, "body");
        node_create!(parser, "tr");
        node_create!(parser, "li");
        node_create!(parser, "p");

        parser.generate_implied_end_tags(Some("li"), false);
        assert_eq!(parser.open_elements.len(), 4);

        parser.generate_implied_end_tags(None, false);
        assert_eq!(parser.open_elements.len(), 3);

        parser.generate_implied_end_tags(None, true);
        assert_eq!(parser.open_elements.len(), 2);
        assert!(parser.current_node_is("body"));
    }

    #[test]
    fn split_mixed_token() {
        let stream = &mut CharacterReader::new("");
        let doc = &mut Document::new();
        let parser = parser_with(stream, doc);

        let tokens = parser.split_mixed_token("  foo bar\0  ");
        let parts = tokens
            .iter()
            .map(|token| token.to_string())
            .collect::<Vec<_>>();
        assert_eq!(parts, vec!["  ", "foo", " ", "bar", "\0", "  "]);

        let tokens = parser.split_mixed_token_null("a b\0\0c");
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn fragment_contexts() {
        assert_eq!(FragmentContext::from_qualified_name("td"), FragmentContext::new("td"));
        assert_eq!(
            FragmentContext::from_qualified_name("svg path"),
            FragmentContext::with_namespace("path", Namespace::Svg)
        );
        assert_eq!(
            FragmentContext::from_qualified_name("math mi").namespace,
            Namespace::MathMl
        );

        assert_eq!(find_initial_state_for_context("textarea", Namespace::Html, true), State::RCDATA);
        assert_eq!(find_initial_state_for_context("noscript", Namespace::Html, true), State::RAWTEXT);
        assert_eq!(find_initial_state_for_context("noscript", Namespace::Html, false), State::Data);
        assert_eq!(find_initial_state_for_context("title", Namespace::Svg, true), State::Data);
    }

    #[test]
    fn options_builder() {
        let options = Html5ParserOptions::new()
            .scripting_enabled(false)
            .track_errors(5)
            .track_source_positions(true)
            .preserve_tag_case(true)
            .preserve_attribute_case(true)
            .max_depth(10);

        assert!(!options.scripting_enabled);
        assert_eq!(options.track_errors, 5);
        assert!(options.track_source_positions);
        assert!(options.preserve_tag_case);
        assert!(options.preserve_attribute_case);
        assert_eq!(options.max_depth, 10);
        assert_eq!(Html5ParserOptions::default().max_depth, DEFAULT_MAX_DEPTH);
    }
}
