pub mod character_reference;
pub mod replacement_tables;
pub mod state;
pub mod token;

use crate::errors::{ParseErrorList, ParserError};
use crate::node::Namespace;
use crate::tokenizer::character_reference::{is_control_char, is_noncharacter};
use crate::tokenizer::state::State;
use crate::tokenizer::token::{Attribute, Token};
use log::warn;
use quill_shared::character_reader::Character::{Ch, StreamEnd};
use quill_shared::character_reader::{Character, CharacterReader, Span};
use std::cell::{Ref, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Constants that are not directly captured as visible chars
pub const CHAR_NUL: char = '\u{0000}';
pub const CHAR_TAB: char = '\u{0009}';
pub const CHAR_LF: char = '\u{000A}';
pub const CHAR_CR: char = '\u{000D}';
pub const CHAR_FF: char = '\u{000C}';
pub const CHAR_SPACE: char = '\u{0020}';
pub const CHAR_REPLACEMENT: char = '\u{FFFD}';

/// Maximum number of attributes kept on a single tag. Any attribute beyond this is dropped.
pub const MAX_ATTRIBUTES: usize = 512;

/// Characters that end an unquoted attribute value run
const UNQUOTED_VALUE_DELIMITERS: [char; 13] = [
    CHAR_TAB, CHAR_LF, CHAR_FF, CHAR_SPACE, '&', '>', CHAR_NUL, '"', '\'', '<', '=', '`', CHAR_CR,
];

/// Characters that end an attribute name run
const ATTRIBUTE_NAME_DELIMITERS: [char; 11] = [
    CHAR_TAB, CHAR_LF, CHAR_FF, CHAR_SPACE, '/', '>', '=', CHAR_NUL, '"', '\'', '<',
];

/// The tokenizer will read the input stream and emit tokens that can be used by the parser.
pub struct Tokenizer<'stream> {
    /// HTML character input stream
    pub stream: &'stream mut CharacterReader,
    /// Current state of the tokenizer
    pub state: State,
    /// Current consumed characters for the next text token
    consumed: String,
    /// True when the consumed characters come from a CDATA section
    consumed_is_cdata: bool,
    /// Current attribute name that we need to store temporary in case we are parsing attributes
    current_attr_name: String,
    /// Current attribute value that we need to store temporary in case we are parsing attributes
    current_attr_value: String,
    /// Attributes of the tag in the making, in source order
    current_attrs: Vec<Attribute>,
    /// Token that is currently in the making (if any)
    current_token: Option<Token>,
    /// Temporary buffer
    temporary_buffer: String,
    /// Queue of emitted tokens. Needed because we can generate multiple tokens during iteration
    token_queue: VecDeque<Token>,
    /// The last emitted start token (or empty if none)
    last_start_token: String,
    /// Offset where the token in the making started
    token_start: usize,
    /// Offset where the last emitted token ended
    last_token_end: usize,
    /// Input characters before this offset have been checked for control characters
    checked_up_to: usize,
    /// Set when attributes of the current tag were dropped
    attributes_truncated: bool,
    /// Keep the source spelling of tag names
    preserve_tag_case: bool,
    /// Keep the source spelling of attribute names
    preserve_attribute_case: bool,
    /// Error logger to log errors to
    error_logger: Rc<RefCell<ParseErrorList>>,
}

/// Options that can be passed to the tokenizer. Mostly needed when dealing with tests and fragments.
#[derive(Clone, Debug)]
pub struct Options {
    /// Sets the initial state of the tokenizer
    pub initial_state: State,
    /// Sets the last starting tag in the tokenizer, used to detect the appropriate end tag
    pub last_start_tag: String,
    /// Do not lowercase tag names in the name that is handed to the tree builder
    pub preserve_tag_case: bool,
    /// Do not lowercase attribute names
    pub preserve_attribute_case: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            initial_state: State::Data,
            last_start_tag: String::new(),
            preserve_tag_case: false,
            preserve_attribute_case: false,
        }
    }
}

/// Information the tree builder hands to the tokenizer for each token it requests
#[derive(Clone, Copy, Debug, Default)]
pub struct ParserData {
    /// Namespace of the adjusted current node. CDATA sections are only recognized in foreign content.
    pub adjusted_node_namespace: Namespace,
}

impl<'stream> Tokenizer<'stream> {
    /// Creates a new tokenizer with the given input stream and additional options if any
    pub fn new(
        stream: &'stream mut CharacterReader,
        opts: Option<Options>,
        error_logger: Rc<RefCell<ParseErrorList>>,
    ) -> Self {
        let opts = opts.unwrap_or_default();
        let start = stream.pos();

        Self {
            stream,
            state: opts.initial_state,
            consumed: String::new(),
            consumed_is_cdata: false,
            current_attr_name: String::new(),
            current_attr_value: String::new(),
            current_attrs: Vec::new(),
            current_token: None,
            temporary_buffer: String::new(),
            token_queue: VecDeque::new(),
            last_start_token: opts.last_start_tag,
            token_start: start,
            attributes_truncated: false,
            last_token_end: start,
            checked_up_to: start,
            preserve_tag_case: opts.preserve_tag_case,
            preserve_attribute_case: opts.preserve_attribute_case,
            error_logger,
        }
    }

    /// Retrieves the next token from the input stream or Token::Eof when the end is reached
    pub fn next_token(&mut self, parser_data: ParserData) -> Token {
        self.consume_stream(parser_data);

        match self.token_queue.pop_front() {
            Some(token) => token,
            None => Token::Eof {
                span: self.span(self.stream.pos(), self.stream.pos()),
            },
        }
    }

    /// Returns the error logger
    pub fn get_error_logger(&self) -> Ref<'_, ParseErrorList> {
        self.error_logger.borrow()
    }

    /// Sets the tokenizer state to a new state
    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    /// Sets the name of the last start tag, used for appropriate end tag detection
    pub fn set_last_start_tag(&mut self, name: &str) {
        self.last_start_token = name.to_string();
    }

    /// Consumes the input stream. Continues until the stream is completed or a token has been generated.
    fn consume_stream(&mut self, parser_data: ParserData) {
        loop {
            // Something is already in the token buffer, so we can return it.
            if !self.token_queue.is_empty() {
                return;
            }

            match self.state {
                State::Data => {
                    self.consume_run(|s| s.consume_data());

                    let c = self.read_char();
                    match c {
                        Ch('&') => self.state = State::CharacterReferenceInData,
                        Ch('<') => {
                            self.start_token();
                            self.state = State::TagOpen;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_NUL);
                        }
                        StreamEnd => self.emit_eof(),
                        _ => self.consume(c.into()),
                    }
                }
                State::CharacterReferenceInData => {
                    self.consume_character_reference(false);
                    self.state = State::Data;
                }
                State::RCDATA => {
                    self.consume_run(|s| s.consume_data());

                    let c = self.read_char();
                    match c {
                        Ch('&') => self.state = State::CharacterReferenceInRcData,
                        Ch('<') => {
                            self.start_token();
                            if self.end_tag_ahead() {
                                self.state = State::RCDATALessThanSign;
                            } else {
                                self.consume('<');
                            }
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        StreamEnd => self.emit_eof(),
                        _ => self.consume(c.into()),
                    }
                }
                State::CharacterReferenceInRcData => {
                    self.consume_character_reference(false);
                    self.state = State::RCDATA;
                }
                State::RAWTEXT => {
                    self.consume_run(|s| s.consume_raw_data());

                    let c = self.read_char();
                    match c {
                        Ch('<') => {
                            self.start_token();
                            if self.end_tag_ahead() {
                                self.state = State::RAWTEXTLessThanSign;
                            } else {
                                self.consume('<');
                            }
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        StreamEnd => self.emit_eof(),
                        _ => self.consume(c.into()),
                    }
                }
                State::ScriptData => {
                    self.consume_run(|s| s.consume_raw_data());

                    let c = self.read_char();
                    match c {
                        Ch('<') => {
                            self.start_token();
                            self.state = State::ScriptDataLessThenSign;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        StreamEnd => self.emit_eof(),
                        _ => self.consume(c.into()),
                    }
                }
                State::PLAINTEXT => {
                    self.consume_run(|s| s.consume_to(CHAR_NUL));

                    let c = self.read_char();
                    match c {
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        StreamEnd => self.emit_eof(),
                        _ => self.consume(c.into()),
                    }
                }
                State::TagOpen => {
                    let c = self.read_char();
                    match c {
                        Ch('!') => self.state = State::MarkupDeclarationOpen,
                        Ch('/') => self.state = State::EndTagOpen,
                        Ch(ch) if ch.is_ascii_alphabetic() => {
                            self.current_token = Some(Token::StartTag {
                                name: String::new(),
                                raw_name: String::new(),
                                is_self_closing: false,
                                attributes: Vec::new(),
                                span: Span::default(),
                            });
                            self.stream.unconsume();
                            self.state = State::TagName;
                        }
                        Ch('?') => {
                            self.parse_error(ParserError::UnexpectedQuestionMarkInsteadOfTagName);
                            self.current_token = Some(new_comment(true));
                            self.stream.unconsume();
                            self.state = State::BogusComment;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofBeforeTagName);
                            self.consume('<');
                            self.state = State::Data;
                        }
                        _ => {
                            self.parse_error(ParserError::InvalidFirstCharacterOfTagName);
                            self.consume('<');
                            self.stream.unconsume();
                            self.state = State::Data;
                        }
                    }
                }
                State::EndTagOpen => {
                    let c = self.read_char();
                    match c {
                        Ch(ch) if ch.is_ascii_alphabetic() => {
                            self.current_token = Some(new_end_tag());
                            self.stream.unconsume();
                            self.state = State::TagName;
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::MissingEndTagName);
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofBeforeTagName);
                            self.consume_str("</");
                            self.state = State::Data;
                        }
                        _ => {
                            self.parse_error(ParserError::InvalidFirstCharacterOfTagName);
                            self.current_token = Some(new_comment(true));
                            self.stream.unconsume();
                            self.state = State::BogusComment;
                        }
                    }
                }
                State::TagName => {
                    let name = self.scan(|s| s.consume_tag_name());
                    for ch in name.chars() {
                        self.add_to_token_name(ch);
                    }

                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => self.state = State::BeforeAttributeName,
                        Ch('/') => self.state = State::SelfClosingStart,
                        Ch('>') => {
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.add_to_token_name(CHAR_REPLACEMENT);
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInTag);
                            self.drop_current_tag();
                            self.state = State::Data;
                        }
                        _ => self.add_to_token_name(c.into()),
                    }
                }
                State::RCDATALessThanSign => {
                    let c = self.read_char();
                    match c {
                        Ch('/') => {
                            self.temporary_buffer.clear();
                            self.state = State::RCDATAEndTagOpen;
                        }
                        _ => {
                            self.consume('<');
                            self.stream.unconsume();
                            self.state = State::RCDATA;
                        }
                    }
                }
                State::RCDATAEndTagOpen => {
                    let c = self.read_char();
                    match c {
                        Ch(ch) if ch.is_ascii_alphabetic() => {
                            self.current_token = Some(new_end_tag());
                            self.stream.unconsume();
                            self.state = State::RCDATAEndTagName;
                        }
                        _ => {
                            self.consume_str("</");
                            self.stream.unconsume();
                            self.state = State::RCDATA;
                        }
                    }
                }
                State::RCDATAEndTagName => self.end_tag_name(State::RCDATA),
                State::RAWTEXTLessThanSign => {
                    let c = self.read_char();
                    match c {
                        Ch('/') => {
                            self.temporary_buffer.clear();
                            self.state = State::RAWTEXTEndTagOpen;
                        }
                        _ => {
                            self.consume('<');
                            self.stream.unconsume();
                            self.state = State::RAWTEXT;
                        }
                    }
                }
                State::RAWTEXTEndTagOpen => {
                    let c = self.read_char();
                    match c {
                        Ch(ch) if ch.is_ascii_alphabetic() => {
                            self.current_token = Some(new_end_tag());
                            self.stream.unconsume();
                            self.state = State::RAWTEXTEndTagName;
                        }
                        _ => {
                            self.consume_str("</");
                            self.stream.unconsume();
                            self.state = State::RAWTEXT;
                        }
                    }
                }
                State::RAWTEXTEndTagName => self.end_tag_name(State::RAWTEXT),
                State::ScriptDataLessThenSign => {
                    let c = self.read_char();
                    match c {
                        Ch('/') => {
                            self.temporary_buffer.clear();
                            self.state = State::ScriptDataEndTagOpen;
                        }
                        Ch('!') => {
                            self.consume_str("<!");
                            self.state = State::ScriptDataEscapeStart;
                        }
                        _ => {
                            self.consume('<');
                            self.stream.unconsume();
                            self.state = State::ScriptData;
                        }
                    }
                }
                State::ScriptDataEndTagOpen => {
                    let c = self.read_char();
                    match c {
                        Ch(ch) if ch.is_ascii_alphabetic() => {
                            self.current_token = Some(new_end_tag());
                            self.stream.unconsume();
                            self.state = State::ScriptDataEndTagName;
                        }
                        _ => {
                            self.consume_str("</");
                            self.stream.unconsume();
                            self.state = State::ScriptData;
                        }
                    }
                }
                State::ScriptDataEndTagName => self.end_tag_name(State::ScriptData),
                State::ScriptDataEscapeStart => {
                    let c = self.read_char();
                    match c {
                        Ch('-') => {
                            self.consume('-');
                            self.state = State::ScriptDataEscapeStartDash;
                        }
                        _ => {
                            self.stream.unconsume();
                            self.state = State::ScriptData;
                        }
                    }
                }
                State::ScriptDataEscapeStartDash => {
                    let c = self.read_char();
                    match c {
                        Ch('-') => {
                            self.consume('-');
                            self.state = State::ScriptDataEscapedDashDash;
                        }
                        _ => {
                            self.stream.unconsume();
                            self.state = State::ScriptData;
                        }
                    }
                }
                State::ScriptDataEscaped => {
                    self.consume_run(|s| s.consume_to_any(&['-', '<', CHAR_NUL]));

                    let c = self.read_char();
                    match c {
                        Ch('-') => {
                            self.consume('-');
                            self.state = State::ScriptDataEscapedDash;
                        }
                        Ch('<') => {
                            self.start_token();
                            self.state = State::ScriptDataEscapedLessThanSign;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInScriptHtmlCommentLikeText);
                            self.emit_eof();
                        }
                        _ => self.consume(c.into()),
                    }
                }
                State::ScriptDataEscapedDash => {
                    let c = self.read_char();
                    match c {
                        Ch('-') => {
                            self.consume('-');
                            self.state = State::ScriptDataEscapedDashDash;
                        }
                        Ch('<') => {
                            self.start_token();
                            self.state = State::ScriptDataEscapedLessThanSign;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                            self.state = State::ScriptDataEscaped;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInScriptHtmlCommentLikeText);
                            self.emit_eof();
                        }
                        _ => {
                            self.consume(c.into());
                            self.state = State::ScriptDataEscaped;
                        }
                    }
                }
                State::ScriptDataEscapedDashDash => {
                    let c = self.read_char();
                    match c {
                        Ch('-') => self.consume('-'),
                        Ch('<') => {
                            self.start_token();
                            self.state = State::ScriptDataEscapedLessThanSign;
                        }
                        Ch('>') => {
                            self.consume('>');
                            self.state = State::ScriptData;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                            self.state = State::ScriptDataEscaped;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInScriptHtmlCommentLikeText);
                            self.emit_eof();
                        }
                        _ => {
                            self.consume(c.into());
                            self.state = State::ScriptDataEscaped;
                        }
                    }
                }
                State::ScriptDataEscapedLessThanSign => {
                    let c = self.read_char();
                    match c {
                        Ch('/') => {
                            self.temporary_buffer.clear();
                            self.state = State::ScriptDataEscapedEndTagOpen;
                        }
                        Ch(ch) if ch.is_ascii_alphabetic() => {
                            self.temporary_buffer.clear();
                            self.consume('<');
                            self.stream.unconsume();
                            self.state = State::ScriptDataDoubleEscapeStart;
                        }
                        _ => {
                            self.consume('<');
                            self.stream.unconsume();
                            self.state = State::ScriptDataEscaped;
                        }
                    }
                }
                State::ScriptDataEscapedEndTagOpen => {
                    let c = self.read_char();
                    match c {
                        Ch(ch) if ch.is_ascii_alphabetic() => {
                            self.current_token = Some(new_end_tag());
                            self.stream.unconsume();
                            self.state = State::ScriptDataEscapedEndTagName;
                        }
                        _ => {
                            self.consume_str("</");
                            self.stream.unconsume();
                            self.state = State::ScriptDataEscaped;
                        }
                    }
                }
                State::ScriptDataEscapedEndTagName => self.end_tag_name(State::ScriptDataEscaped),
                State::ScriptDataDoubleEscapeStart => {
                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE | '/' | '>') => {
                            if self.temporary_buffer == "script" {
                                self.state = State::ScriptDataDoubleEscaped;
                            } else {
                                self.state = State::ScriptDataEscaped;
                            }
                            self.consume(c.into());
                        }
                        Ch(ch) if ch.is_ascii_alphabetic() => {
                            self.temporary_buffer.push(ch.to_ascii_lowercase());
                            self.consume(ch);
                        }
                        _ => {
                            self.stream.unconsume();
                            self.state = State::ScriptDataEscaped;
                        }
                    }
                }
                State::ScriptDataDoubleEscaped => {
                    self.consume_run(|s| s.consume_to_any(&['-', '<', CHAR_NUL]));

                    let c = self.read_char();
                    match c {
                        Ch('-') => {
                            self.consume('-');
                            self.state = State::ScriptDataDoubleEscapedDash;
                        }
                        Ch('<') => {
                            self.consume('<');
                            self.state = State::ScriptDataDoubleEscapedLessThanSign;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInScriptHtmlCommentLikeText);
                            self.emit_eof();
                        }
                        _ => self.consume(c.into()),
                    }
                }
                State::ScriptDataDoubleEscapedDash => {
                    let c = self.read_char();
                    match c {
                        Ch('-') => {
                            self.consume('-');
                            self.state = State::ScriptDataDoubleEscapedDashDash;
                        }
                        Ch('<') => {
                            self.consume('<');
                            self.state = State::ScriptDataDoubleEscapedLessThanSign;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                            self.state = State::ScriptDataDoubleEscaped;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInScriptHtmlCommentLikeText);
                            self.emit_eof();
                        }
                        _ => {
                            self.consume(c.into());
                            self.state = State::ScriptDataDoubleEscaped;
                        }
                    }
                }
                State::ScriptDataDoubleEscapedDashDash => {
                    let c = self.read_char();
                    match c {
                        Ch('-') => self.consume('-'),
                        Ch('<') => {
                            self.consume('<');
                            self.state = State::ScriptDataDoubleEscapedLessThanSign;
                        }
                        Ch('>') => {
                            self.consume('>');
                            self.state = State::ScriptData;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                            self.state = State::ScriptDataDoubleEscaped;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInScriptHtmlCommentLikeText);
                            self.emit_eof();
                        }
                        _ => {
                            self.consume(c.into());
                            self.state = State::ScriptDataDoubleEscaped;
                        }
                    }
                }
                State::ScriptDataDoubleEscapedLessThanSign => {
                    let c = self.read_char();
                    match c {
                        Ch('/') => {
                            self.temporary_buffer.clear();
                            self.consume('/');
                            self.state = State::ScriptDataDoubleEscapeEnd;
                        }
                        _ => {
                            self.stream.unconsume();
                            self.state = State::ScriptDataDoubleEscaped;
                        }
                    }
                }
                State::ScriptDataDoubleEscapeEnd => {
                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE | '/' | '>') => {
                            if self.temporary_buffer == "script" {
                                self.state = State::ScriptDataEscaped;
                            } else {
                                self.state = State::ScriptDataDoubleEscaped;
                            }
                            self.consume(c.into());
                        }
                        Ch(ch) if ch.is_ascii_alphabetic() => {
                            self.temporary_buffer.push(ch.to_ascii_lowercase());
                            self.consume(ch);
                        }
                        _ => {
                            self.stream.unconsume();
                            self.state = State::ScriptDataDoubleEscaped;
                        }
                    }
                }
                State::BeforeAttributeName => {
                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            // Ignore character
                        }
                        Ch('/' | '>') | StreamEnd => {
                            self.stream.unconsume();
                            self.state = State::AfterAttributeName;
                        }
                        Ch('=') => {
                            self.parse_error(ParserError::UnexpectedEqualsSignBeforeAttributeName);

                            self.store_and_clear_current_attribute();
                            self.current_attr_name.push('=');

                            self.state = State::AttributeName;
                        }
                        _ => {
                            // Store an existing attribute if any and clear
                            self.store_and_clear_current_attribute();

                            self.stream.unconsume();
                            self.state = State::AttributeName;
                        }
                    }
                }
                State::AttributeName => {
                    let name = self.scan(|s| s.consume_to_any(&ATTRIBUTE_NAME_DELIMITERS));
                    self.add_to_attr_name(&name);

                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE | '/' | '>') | StreamEnd => {
                            self.stream.unconsume();
                            self.state = State::AfterAttributeName;
                        }
                        Ch('=') => self.state = State::BeforeAttributeValue,
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.current_attr_name.push(CHAR_REPLACEMENT);
                        }
                        Ch('"' | '\'' | '<') => {
                            self.parse_error(ParserError::UnexpectedCharacterInAttributeName);
                            self.current_attr_name.push(c.into());
                        }
                        _ => self.add_to_attr_name(&c.to_string()),
                    }
                }
                State::AfterAttributeName => {
                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            // Ignore
                        }
                        Ch('/') => self.state = State::SelfClosingStart,
                        Ch('=') => self.state = State::BeforeAttributeValue,
                        Ch('>') => {
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInTag);
                            self.drop_current_tag();
                            self.state = State::Data;
                        }
                        _ => {
                            self.store_and_clear_current_attribute();
                            self.stream.unconsume();
                            self.state = State::AttributeName;
                        }
                    }
                }
                State::BeforeAttributeValue => {
                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            // Ignore
                        }
                        Ch('"') => self.state = State::AttributeValueDoubleQuoted,
                        Ch('\'') => self.state = State::AttributeValueSingleQuoted,
                        Ch('>') => {
                            self.parse_error(ParserError::MissingAttributeValue);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        _ => {
                            self.stream.unconsume();
                            self.state = State::AttributeValueUnquoted;
                        }
                    }
                }
                State::AttributeValueDoubleQuoted | State::AttributeValueSingleQuoted => {
                    let single = self.state == State::AttributeValueSingleQuoted;
                    let value = self.scan(|s| s.consume_attribute_quoted(single));
                    self.current_attr_value.push_str(&value);

                    let c = self.read_char();
                    match c {
                        Ch('"') if !single => self.state = State::AfterAttributeValueQuoted,
                        Ch('\'') if single => self.state = State::AfterAttributeValueQuoted,
                        Ch('&') => self.consume_character_reference(true),
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.current_attr_value.push(CHAR_REPLACEMENT);
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInTag);
                            self.drop_current_tag();
                            self.state = State::Data;
                        }
                        _ => self.current_attr_value.push(c.into()),
                    }
                }
                State::AttributeValueUnquoted => {
                    let value = self.scan(|s| s.consume_to_any(&UNQUOTED_VALUE_DELIMITERS));
                    self.current_attr_value.push_str(&value);

                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            self.state = State::BeforeAttributeName;
                        }
                        Ch('&') => self.consume_character_reference(true),
                        Ch('>') => {
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.current_attr_value.push(CHAR_REPLACEMENT);
                        }
                        Ch('"' | '\'' | '<' | '=' | '`') => {
                            self.parse_error(ParserError::UnexpectedCharacterInUnquotedAttributeValue);
                            self.current_attr_value.push(c.into());
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInTag);
                            self.drop_current_tag();
                            self.state = State::Data;
                        }
                        _ => self.current_attr_value.push(c.into()),
                    }
                }
                State::AfterAttributeValueQuoted => {
                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            self.state = State::BeforeAttributeName;
                        }
                        Ch('/') => self.state = State::SelfClosingStart,
                        Ch('>') => {
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInTag);
                            self.drop_current_tag();
                            self.state = State::Data;
                        }
                        _ => {
                            self.parse_error(ParserError::MissingWhitespaceBetweenAttributes);
                            self.stream.unconsume();
                            self.state = State::BeforeAttributeName;
                        }
                    }
                }
                State::SelfClosingStart => {
                    let c = self.read_char();
                    match c {
                        Ch('>') => {
                            self.set_is_closing_in_current_token(true);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInTag);
                            self.drop_current_tag();
                            self.state = State::Data;
                        }
                        _ => {
                            self.parse_error(ParserError::UnexpectedSolidusInTag);
                            self.stream.unconsume();
                            self.state = State::BeforeAttributeName;
                        }
                    }
                }
                State::BogusComment => {
                    let text = self.scan(|s| s.consume_to_any(&['>', CHAR_NUL]));
                    self.add_str_to_token_value(&text);

                    let c = self.read_char();
                    match c {
                        Ch('>') => {
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.add_to_token_value(CHAR_REPLACEMENT);
                        }
                        _ => self.add_to_token_value(c.into()),
                    }
                }
                State::MarkupDeclarationOpen => {
                    if self.stream.match_consume("--") {
                        self.current_token = Some(new_comment(false));
                        self.state = State::CommentStart;
                    } else if self.stream.match_consume_ignore_case("DOCTYPE") {
                        self.state = State::DOCTYPE;
                    } else if self.stream.match_consume("[CDATA[") {
                        if parser_data.adjusted_node_namespace != Namespace::Html {
                            // Text before the section is emitted on its own, so the CDATA run
                            // becomes a separate text token.
                            let start = self.token_start;
                            self.flush_consumed(start);
                            self.last_token_end = self.stream.pos();
                            self.consumed_is_cdata = true;
                            self.state = State::CDATASection;
                        } else {
                            self.parse_error(ParserError::CdataInHtmlContent);
                            self.current_token = Some(new_comment(true));
                            self.add_str_to_token_value("[CDATA[");
                            self.state = State::BogusComment;
                        }
                    } else {
                        self.parse_error(ParserError::IncorrectlyOpenedComment);
                        self.current_token = Some(new_comment(true));
                        self.state = State::BogusComment;
                    }
                }
                State::CommentStart => {
                    let c = self.read_char();
                    match c {
                        Ch('-') => self.state = State::CommentStartDash,
                        Ch('>') => {
                            self.parse_error(ParserError::AbruptClosingOfEmptyComment);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        _ => {
                            self.stream.unconsume();
                            self.state = State::Comment;
                        }
                    }
                }
                State::CommentStartDash => {
                    let c = self.read_char();
                    match c {
                        Ch('-') => self.state = State::CommentEnd,
                        Ch('>') => {
                            self.parse_error(ParserError::AbruptClosingOfEmptyComment);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInComment);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        _ => {
                            self.add_to_token_value('-');
                            self.stream.unconsume();
                            self.state = State::Comment;
                        }
                    }
                }
                State::Comment => {
                    let text = self.scan(|s| s.consume_to_any(&['<', '-', CHAR_NUL]));
                    self.add_str_to_token_value(&text);

                    let c = self.read_char();
                    match c {
                        Ch('<') => {
                            self.add_to_token_value('<');
                            self.state = State::CommentLessThanSign;
                        }
                        Ch('-') => self.state = State::CommentEndDash,
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.add_to_token_value(CHAR_REPLACEMENT);
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInComment);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        _ => self.add_to_token_value(c.into()),
                    }
                }
                State::CommentLessThanSign => {
                    let c = self.read_char();
                    match c {
                        Ch('!') => {
                            self.add_to_token_value('!');
                            self.state = State::CommentLessThanSignBang;
                        }
                        Ch('<') => self.add_to_token_value('<'),
                        _ => {
                            self.stream.unconsume();
                            self.state = State::Comment;
                        }
                    }
                }
                State::CommentLessThanSignBang => {
                    let c = self.read_char();
                    match c {
                        Ch('-') => self.state = State::CommentLessThanSignBangDash,
                        _ => {
                            self.stream.unconsume();
                            self.state = State::Comment;
                        }
                    }
                }
                State::CommentLessThanSignBangDash => {
                    let c = self.read_char();
                    match c {
                        Ch('-') => self.state = State::CommentLessThanSignBangDashDash,
                        _ => {
                            self.stream.unconsume();
                            self.state = State::CommentEndDash;
                        }
                    }
                }
                State::CommentLessThanSignBangDashDash => {
                    let c = self.read_char();
                    match c {
                        Ch('>') | StreamEnd => {
                            self.stream.unconsume();
                            self.state = State::CommentEnd;
                        }
                        _ => {
                            self.parse_error(ParserError::NestedComment);
                            self.stream.unconsume();
                            self.state = State::CommentEnd;
                        }
                    }
                }
                State::CommentEndDash => {
                    let c = self.read_char();
                    match c {
                        Ch('-') => self.state = State::CommentEnd,
                        StreamEnd => {
                            self.parse_error(ParserError::EofInComment);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        _ => {
                            self.add_to_token_value('-');
                            self.stream.unconsume();
                            self.state = State::Comment;
                        }
                    }
                }
                State::CommentEnd => {
                    let c = self.read_char();
                    match c {
                        Ch('>') => {
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        Ch('!') => self.state = State::CommentEndBang,
                        Ch('-') => self.add_to_token_value('-'),
                        StreamEnd => {
                            self.parse_error(ParserError::EofInComment);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        _ => {
                            self.add_str_to_token_value("--");
                            self.stream.unconsume();
                            self.state = State::Comment;
                        }
                    }
                }
                State::CommentEndBang => {
                    let c = self.read_char();
                    match c {
                        Ch('-') => {
                            self.add_str_to_token_value("--!");
                            self.state = State::CommentEndDash;
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::IncorrectlyClosedComment);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInComment);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        _ => {
                            self.add_str_to_token_value("--!");
                            self.stream.unconsume();
                            self.state = State::Comment;
                        }
                    }
                }
                State::DOCTYPE => {
                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => self.state = State::BeforeDOCTYPEName,
                        Ch('>') => {
                            self.stream.unconsume();
                            self.state = State::BeforeDOCTYPEName;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.current_token = Some(new_doctype(None, true));
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        _ => {
                            self.parse_error(ParserError::MissingWhitespaceBeforeDoctypeName);
                            self.stream.unconsume();
                            self.state = State::BeforeDOCTYPEName;
                        }
                    }
                }
                State::BeforeDOCTYPEName => {
                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            // ignore
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.current_token = Some(new_doctype(Some(CHAR_REPLACEMENT.to_string()), false));
                            self.state = State::DOCTYPEName;
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::MissingDoctypeName);
                            self.current_token = Some(new_doctype(None, true));
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.current_token = Some(new_doctype(None, true));
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        Ch(ch) => {
                            let name = ch.to_ascii_lowercase().to_string();
                            self.current_token = Some(new_doctype(Some(name), false));
                            self.state = State::DOCTYPEName;
                        }
                    }
                }
                State::DOCTYPEName => {
                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => self.state = State::AfterDOCTYPEName,
                        Ch('>') => {
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.add_to_token_name(CHAR_REPLACEMENT);
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.set_quirks_mode(true);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        _ => self.add_to_token_name(c.into()),
                    }
                }
                State::AfterDOCTYPEName => {
                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            // ignore
                        }
                        Ch('>') => {
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.set_quirks_mode(true);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        _ => {
                            self.stream.unconsume();
                            if self.stream.match_consume_ignore_case("PUBLIC") {
                                self.state = State::AfterDOCTYPEPublicKeyword;
                            } else if self.stream.match_consume_ignore_case("SYSTEM") {
                                self.state = State::AfterDOCTYPESystemKeyword;
                            } else {
                                self.parse_error(ParserError::InvalidCharacterSequenceAfterDoctypeName);
                                self.set_quirks_mode(true);
                                self.state = State::BogusDOCTYPE;
                            }
                        }
                    }
                }
                State::AfterDOCTYPEPublicKeyword => {
                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            self.state = State::BeforeDOCTYPEPublicIdentifier;
                        }
                        Ch('"') => {
                            self.parse_error(ParserError::MissingWhitespaceAfterDoctypePublicKeyword);
                            self.set_public_identifier(String::new());
                            self.state = State::DOCTYPEPublicIdentifierDoubleQuoted;
                        }
                        Ch('\'') => {
                            self.parse_error(ParserError::MissingWhitespaceAfterDoctypePublicKeyword);
                            self.set_public_identifier(String::new());
                            self.state = State::DOCTYPEPublicIdentifierSingleQuoted;
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::MissingDoctypePublicIdentifier);
                            self.set_quirks_mode(true);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.set_quirks_mode(true);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        _ => {
                            self.parse_error(ParserError::MissingQuoteBeforeDoctypePublicIdentifier);
                            self.set_quirks_mode(true);
                            self.stream.unconsume();
                            self.state = State::BogusDOCTYPE;
                        }
                    }
                }
                State::BeforeDOCTYPEPublicIdentifier => {
                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            // ignore
                        }
                        Ch('"') => {
                            self.set_public_identifier(String::new());
                            self.state = State::DOCTYPEPublicIdentifierDoubleQuoted;
                        }
                        Ch('\'') => {
                            self.set_public_identifier(String::new());
                            self.state = State::DOCTYPEPublicIdentifierSingleQuoted;
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::MissingDoctypePublicIdentifier);
                            self.set_quirks_mode(true);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.set_quirks_mode(true);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        _ => {
                            self.parse_error(ParserError::MissingQuoteBeforeDoctypePublicIdentifier);
                            self.set_quirks_mode(true);
                            self.stream.unconsume();
                            self.state = State::BogusDOCTYPE;
                        }
                    }
                }
                State::DOCTYPEPublicIdentifierDoubleQuoted | State::DOCTYPEPublicIdentifierSingleQuoted => {
                    let quote = if self.state == State::DOCTYPEPublicIdentifierDoubleQuoted {
                        '"'
                    } else {
                        '\''
                    };

                    let c = self.read_char();
                    match c {
                        Ch(ch) if ch == quote => self.state = State::AfterDOCTYPEPublicIdentifier,
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.add_public_identifier(CHAR_REPLACEMENT);
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::AbruptDoctypePublicIdentifier);
                            self.set_quirks_mode(true);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.set_quirks_mode(true);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        Ch(ch) => self.add_public_identifier(ch),
                    }
                }
                State::AfterDOCTYPEPublicIdentifier => {
                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            self.state = State::BetweenDOCTYPEPublicAndSystemIdentifiers;
                        }
                        Ch('>') => {
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        Ch('"') => {
                            self.parse_error(ParserError::MissingWhitespaceBetweenDoctypePublicAndSystemIdentifiers);
                            self.set_system_identifier(String::new());
                            self.state = State::DOCTYPESystemIdentifierDoubleQuoted;
                        }
                        Ch('\'') => {
                            self.parse_error(ParserError::MissingWhitespaceBetweenDoctypePublicAndSystemIdentifiers);
                            self.set_system_identifier(String::new());
                            self.state = State::DOCTYPESystemIdentifierSingleQuoted;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.set_quirks_mode(true);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        _ => {
                            self.parse_error(ParserError::MissingQuoteBeforeDoctypeSystemIdentifier);
                            self.set_quirks_mode(true);
                            self.stream.unconsume();
                            self.state = State::BogusDOCTYPE;
                        }
                    }
                }
                State::BetweenDOCTYPEPublicAndSystemIdentifiers => {
                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            // ignore
                        }
                        Ch('>') => {
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        Ch('"') => {
                            self.set_system_identifier(String::new());
                            self.state = State::DOCTYPESystemIdentifierDoubleQuoted;
                        }
                        Ch('\'') => {
                            self.set_system_identifier(String::new());
                            self.state = State::DOCTYPESystemIdentifierSingleQuoted;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.set_quirks_mode(true);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        _ => {
                            self.parse_error(ParserError::MissingQuoteBeforeDoctypeSystemIdentifier);
                            self.set_quirks_mode(true);
                            self.stream.unconsume();
                            self.state = State::BogusDOCTYPE;
                        }
                    }
                }
                State::AfterDOCTYPESystemKeyword => {
                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            self.state = State::BeforeDOCTYPESystemIdentifier;
                        }
                        Ch('"') => {
                            self.parse_error(ParserError::MissingWhitespaceAfterDoctypeSystemKeyword);
                            self.set_system_identifier(String::new());
                            self.state = State::DOCTYPESystemIdentifierDoubleQuoted;
                        }
                        Ch('\'') => {
                            self.parse_error(ParserError::MissingWhitespaceAfterDoctypeSystemKeyword);
                            self.set_system_identifier(String::new());
                            self.state = State::DOCTYPESystemIdentifierSingleQuoted;
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::MissingDoctypeSystemIdentifier);
                            self.set_quirks_mode(true);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.set_quirks_mode(true);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        _ => {
                            self.parse_error(ParserError::MissingQuoteBeforeDoctypeSystemIdentifier);
                            self.set_quirks_mode(true);
                            self.stream.unconsume();
                            self.state = State::BogusDOCTYPE;
                        }
                    }
                }
                State::BeforeDOCTYPESystemIdentifier => {
                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            // ignore
                        }
                        Ch('"') => {
                            self.set_system_identifier(String::new());
                            self.state = State::DOCTYPESystemIdentifierDoubleQuoted;
                        }
                        Ch('\'') => {
                            self.set_system_identifier(String::new());
                            self.state = State::DOCTYPESystemIdentifierSingleQuoted;
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::MissingDoctypeSystemIdentifier);
                            self.set_quirks_mode(true);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.set_quirks_mode(true);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        _ => {
                            self.parse_error(ParserError::MissingQuoteBeforeDoctypeSystemIdentifier);
                            self.set_quirks_mode(true);
                            self.stream.unconsume();
                            self.state = State::BogusDOCTYPE;
                        }
                    }
                }
                State::DOCTYPESystemIdentifierDoubleQuoted | State::DOCTYPESystemIdentifierSingleQuoted => {
                    let quote = if self.state == State::DOCTYPESystemIdentifierDoubleQuoted {
                        '"'
                    } else {
                        '\''
                    };

                    let c = self.read_char();
                    match c {
                        Ch(ch) if ch == quote => self.state = State::AfterDOCTYPESystemIdentifier,
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.add_system_identifier(CHAR_REPLACEMENT);
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::AbruptDoctypeSystemIdentifier);
                            self.set_quirks_mode(true);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.set_quirks_mode(true);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        Ch(ch) => self.add_system_identifier(ch),
                    }
                }
                State::AfterDOCTYPESystemIdentifier => {
                    let c = self.read_char();
                    match c {
                        Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            // ignore
                        }
                        Ch('>') => {
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.set_quirks_mode(true);
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        _ => {
                            self.parse_error(ParserError::UnexpectedCharacterAfterDoctypeSystemIdentifier);
                            self.stream.unconsume();
                            self.state = State::BogusDOCTYPE;
                        }
                    }
                }
                State::BogusDOCTYPE => {
                    let c = self.read_char();
                    match c {
                        Ch('>') | StreamEnd => {
                            self.emit_current_token();
                            self.state = State::Data;
                        }
                        Ch(CHAR_NUL) => self.parse_error(ParserError::UnexpectedNullCharacter),
                        _ => {
                            // ignore
                        }
                    }
                }
                State::CDATASection => {
                    self.consume_run(|s| s.consume_to(']'));

                    let c = self.read_char();
                    match c {
                        Ch(']') => self.state = State::CDATASectionBracket,
                        StreamEnd => {
                            self.parse_error(ParserError::EofInCdata);
                            self.emit_eof();
                        }
                        _ => self.consume(c.into()),
                    }
                }
                State::CDATASectionBracket => {
                    let c = self.read_char();
                    match c {
                        Ch(']') => self.state = State::CDATASectionEnd,
                        _ => {
                            self.consume(']');
                            self.stream.unconsume();
                            self.state = State::CDATASection;
                        }
                    }
                }
                State::CDATASectionEnd => {
                    let c = self.read_char();
                    match c {
                        Ch(']') => self.consume(']'),
                        Ch('>') => {
                            let end = self.stream.pos();
                            self.flush_consumed(end);
                            self.consumed_is_cdata = false;
                            self.state = State::Data;
                        }
                        _ => {
                            self.consume_str("]]");
                            self.stream.unconsume();
                            self.state = State::CDATASection;
                        }
                    }
                }
            }
        }
    }

    /// Shared end tag name handling of the RCDATA, RAWTEXT and script data states. When the end tag
    /// is not the appropriate one, everything read so far becomes text in `return_state`.
    fn end_tag_name(&mut self, return_state: State) {
        let c = self.read_char();

        // we use this flag because a lot of matches will actually do the same thing
        let mut consume_anything_else = false;

        match c {
            Ch(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                if self.is_appropriate_end_token() {
                    self.state = State::BeforeAttributeName;
                } else {
                    consume_anything_else = true;
                }
            }
            Ch('/') => {
                if self.is_appropriate_end_token() {
                    self.state = State::SelfClosingStart;
                } else {
                    consume_anything_else = true;
                }
            }
            Ch('>') => {
                if self.is_appropriate_end_token() {
                    self.emit_current_token();
                    self.state = State::Data;
                } else {
                    consume_anything_else = true;
                }
            }
            Ch(ch) if ch.is_ascii_alphabetic() => {
                self.add_to_token_name(ch);
                self.temporary_buffer.push(ch);
            }
            _ => {
                consume_anything_else = true;
            }
        }

        if consume_anything_else {
            self.transition_to(return_state);
        }
    }

    /// Reads a character from the input stream and reports control characters and
    /// noncharacters found in the input.
    fn read_char(&mut self) -> Character {
        let c = self.stream.consume();
        if let Ch(ch) = c {
            let offset = self.stream.pos().saturating_sub(1);
            self.check_input_char(ch, offset);
        }

        c
    }

    fn check_input_char(&mut self, ch: char, offset: usize) {
        if offset < self.checked_up_to {
            return;
        }
        self.checked_up_to = offset + 1;

        let num = ch as u32;
        if is_control_char(num) {
            self.parse_error_at(offset, ParserError::ControlCharacterInInputStream);
        } else if is_noncharacter(num) {
            self.parse_error_at(offset, ParserError::NoncharacterInInputStream);
        }
    }

    /// Runs a bulk scan on the stream and checks the scanned characters as read_char() does
    fn scan(&mut self, f: impl FnOnce(&mut CharacterReader) -> String) -> String {
        let start = self.stream.pos();
        let data = f(self.stream);
        for (idx, ch) in data.chars().enumerate() {
            self.check_input_char(ch, start + idx);
        }
        data
    }

    /// Runs a bulk scan and adds the result to the pending text
    fn consume_run(&mut self, f: impl FnOnce(&mut CharacterReader) -> String) {
        let data = self.scan(f);
        self.consumed.push_str(&data);
    }

    /// Checks (with the help of the reader's lookahead cache) whether an end tag for the last
    /// start tag appears anywhere ahead. The '<' that was just read is included in the search.
    fn end_tag_ahead(&mut self) -> bool {
        if self.last_start_token.is_empty() {
            return true;
        }

        let needle = format!("</{}", self.last_start_token);
        self.stream.unconsume();
        let found = self.stream.contains_ignore_case(&needle);
        self.stream.advance();

        found
    }

    /// Marks the '<' that was just read as the start of a new token
    fn start_token(&mut self) {
        self.token_start = self.stream.pos().saturating_sub(1);
    }

    fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.stream.location_at(start), self.stream.location_at(end))
    }

    /// Emits the consumed characters (if any) as a text token ending at `end`
    fn flush_consumed(&mut self, end: usize) {
        if self.consumed.is_empty() {
            return;
        }

        let end = end.max(self.last_token_end);
        let span = self.span(self.last_token_end, end);
        self.token_queue.push_back(Token::Text {
            text: std::mem::take(&mut self.consumed),
            cdata: self.consumed_is_cdata,
            span,
        });
        self.last_token_end = end;
    }

    fn emit_eof(&mut self) {
        self.token_start = self.stream.pos();
        self.emit_token(Token::Eof { span: Span::default() });
    }

    /// Adds the given character to the current token's value (if applicable)
    fn add_to_token_value(&mut self, c: char) {
        if let Some(Token::Comment { comment, .. }) = &mut self.current_token {
            comment.push(c);
        }
    }

    fn add_str_to_token_value(&mut self, s: &str) {
        if let Some(Token::Comment { comment, .. }) = &mut self.current_token {
            comment.push_str(s);
        }
    }

    /// Sets the public identifier of the current token (if applicable)
    fn set_public_identifier(&mut self, s: String) {
        if let Some(Token::DocType { pub_identifier, .. }) = &mut self.current_token {
            *pub_identifier = Some(s);
        }
    }

    /// Adds the given character to the current token's public identifier (if applicable)
    fn add_public_identifier(&mut self, c: char) {
        if let Some(Token::DocType {
            pub_identifier: Some(pid),
            ..
        }) = &mut self.current_token
        {
            pid.push(c);
        }
    }

    /// Sets the system identifier of the current token (if applicable)
    fn set_system_identifier(&mut self, s: String) {
        if let Some(Token::DocType { sys_identifier, .. }) = &mut self.current_token {
            *sys_identifier = Some(s);
        }
    }

    /// Adds the given character to the current token's system identifier (if applicable)
    fn add_system_identifier(&mut self, c: char) {
        if let Some(Token::DocType {
            sys_identifier: Some(sid),
            ..
        }) = &mut self.current_token
        {
            sid.push(c);
        }
    }

    /// Adds the given character to the current token's name (if applicable). Names are ASCII
    /// lowercased; start tags keep the source spelling as well.
    fn add_to_token_name(&mut self, c: char) {
        match &mut self.current_token {
            Some(Token::StartTag { name, raw_name, .. }) => {
                name.push(c.to_ascii_lowercase());
                raw_name.push(c);
            }
            Some(Token::EndTag { name, .. }) => {
                name.push(c.to_ascii_lowercase());
            }
            Some(Token::DocType { name, .. }) => {
                // DOCTYPE can have an optional name
                let c = c.to_ascii_lowercase();
                match name {
                    Some(ref mut string) => string.push(c),
                    None => *name = Some(c.to_string()),
                }
            }
            _ => {}
        }
    }

    fn add_to_attr_name(&mut self, s: &str) {
        if self.preserve_attribute_case {
            self.current_attr_name.push_str(s);
        } else {
            self.current_attr_name.extend(s.chars().map(|c| c.to_ascii_lowercase()));
        }
    }

    /// Emits the current stored token
    fn emit_current_token(&mut self) {
        self.store_and_clear_current_attribute();
        self.add_stored_attributes_to_current_token();

        if let Some(token) = self.current_token.take() {
            if let Token::EndTag {
                is_self_closing: true, ..
            } = token
            {
                self.parse_error(ParserError::EndTagWithTrailingSolidus);
            }
            self.emit_token(token);
        }
    }

    /// Emits the given token, preceded by any consumed text
    fn emit_token(&mut self, mut token: Token) {
        // Save the start token name if we are pushing it. This helps us in detecting matching tags.
        if let Token::StartTag { name, .. } = &token {
            self.last_start_token = String::from(name);
        }

        let end = self.stream.pos();
        let start = self.token_start.clamp(self.last_token_end.min(end), end);

        self.flush_consumed(start);

        token.set_span(self.span(start, end));
        self.token_queue.push_back(token);
        self.last_token_end = end;
    }

    /// Throws away the tag in the making, which happens when the input ends inside a tag
    fn drop_current_tag(&mut self) {
        self.current_token = None;
        self.current_attrs.clear();
        self.attributes_truncated = false;
        self.current_attr_name.clear();
        self.current_attr_value.clear();
    }

    // Consumes the given character
    pub(crate) fn consume(&mut self, c: char) {
        self.consumed.push(c)
    }

    /// Pushes an end-tag as text and changes to the given state
    fn transition_to(&mut self, state: State) {
        self.consumed.push_str("</");
        self.consumed.push_str(&self.temporary_buffer);
        self.temporary_buffer.clear();
        self.current_token = None;
        self.stream.unconsume();
        self.state = state;
    }

    /// Consumes the given string
    pub(crate) fn consume_str(&mut self, s: &str) {
        self.consumed.push_str(s);
    }

    /// Return true when the end tag in the making matches the last start tag (ie: 'table' matches
    /// when last_start_token = 'table')
    fn is_appropriate_end_token(&self) -> bool {
        match &self.current_token {
            Some(Token::EndTag { name, .. }) => !self.last_start_token.is_empty() && self.last_start_token == *name,
            _ => false,
        }
    }

    /// Creates a parse error at the last read character
    pub(crate) fn parse_error(&mut self, message: ParserError) {
        let offset = self.stream.pos().saturating_sub(1);
        self.parse_error_at(offset, message);
    }

    fn parse_error_at(&mut self, offset: usize, message: ParserError) {
        if self.error_logger.borrow().is_full() {
            return;
        }

        let location = self.stream.location_at(offset);
        self.error_logger.borrow_mut().add(location, message.as_str());
    }

    /// Set is_closing_tag in current token
    fn set_is_closing_in_current_token(&mut self, is_closing: bool) {
        match &mut self.current_token {
            Some(Token::StartTag { is_self_closing, .. }) | Some(Token::EndTag { is_self_closing, .. }) => {
                *is_self_closing = is_closing;
            }
            _ => {}
        }
    }

    /// Set force_quirk mode in current token
    fn set_quirks_mode(&mut self, quirky: bool) {
        if let Some(Token::DocType { force_quirks, .. }) = &mut self.current_token {
            *force_quirks = quirky;
        }
    }

    /// Saves the current attribute name and value onto the current_attrs list, if there is
    /// anything to store. The first occurrence of a name wins.
    fn store_and_clear_current_attribute(&mut self) {
        if self.current_attr_name.is_empty() {
            self.current_attr_value.clear();
            return;
        }

        let name = std::mem::take(&mut self.current_attr_name);
        let value = std::mem::take(&mut self.current_attr_value);

        if self.current_attrs.iter().any(|attr| attr.name == name) {
            self.parse_error(ParserError::DuplicateAttribute);
            return;
        }

        if self.current_attrs.len() >= MAX_ATTRIBUTES {
            if !self.attributes_truncated {
                warn!("more than {MAX_ATTRIBUTES} attributes on a single tag, dropping the rest");
                self.attributes_truncated = true;
            }
            return;
        }

        self.current_attrs.push(Attribute {
            name,
            value,
            namespace: None,
        });
    }

    /// This method will add current generated attributes to the current (start) token if needed.
    fn add_stored_attributes_to_current_token(&mut self) {
        if self.current_attrs.is_empty() {
            return;
        }

        self.attributes_truncated = false;
        let attrs = std::mem::take(&mut self.current_attrs);
        match &mut self.current_token {
            Some(Token::EndTag { .. }) => {
                self.parse_error(ParserError::EndTagWithAttributes);
            }
            Some(Token::StartTag { attributes, .. }) => {
                *attributes = attrs;
            }
            _ => {}
        }
    }

    /// Returns true when tag names should keep their source spelling
    pub fn preserves_tag_case(&self) -> bool {
        self.preserve_tag_case
    }
}

fn new_end_tag() -> Token {
    Token::EndTag {
        name: String::new(),
        is_self_closing: false,
        span: Span::default(),
    }
}

fn new_comment(bogus: bool) -> Token {
    Token::Comment {
        comment: String::new(),
        bogus,
        span: Span::default(),
    }
}

fn new_doctype(name: Option<String>, force_quirks: bool) -> Token {
    Token::DocType {
        name,
        force_quirks,
        pub_identifier: None,
        sys_identifier: None,
        span: Span::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_shared::character_reader::Config;

    fn tokenize_with(input: &str, opts: Option<Options>, namespace: Namespace) -> (Vec<Token>, Vec<String>) {
        let mut stream = CharacterReader::new(input);
        let error_logger = Rc::new(RefCell::new(ParseErrorList::new(100)));
        let mut tokenizer = Tokenizer::new(&mut stream, opts, error_logger.clone());

        let mut tokens = Vec::new();
        loop {
            let token = tokenizer.next_token(ParserData {
                adjusted_node_namespace: namespace,
            });
            if token.is_eof() {
                break;
            }
            tokens.push(token);
        }

        let errors = error_logger.borrow().errors().iter().map(|e| e.message.clone()).collect();
        (tokens, errors)
    }

    fn tokenize(input: &str) -> (Vec<Token>, Vec<String>) {
        tokenize_with(input, None, Namespace::Html)
    }

    fn as_strings(tokens: &[Token]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn simple_document() {
        let (tokens, errors) = tokenize("<!DOCTYPE html><p class=\"a\">Hello <b>world</b></p><!-- c -->");
        assert_eq!(
            as_strings(&tokens),
            vec![
                "<!DOCTYPE html />",
                r#"<p class="a">"#,
                "Hello ",
                "<b>",
                "world",
                "</b>",
                "</p>",
                "<!--  c  -->",
            ]
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn tag_names_are_lowercased() {
        let (tokens, _) = tokenize("<DiV ID=x></DIV>");
        match &tokens[0] {
            Token::StartTag {
                name,
                raw_name,
                attributes,
                ..
            } => {
                assert_eq!(name, "div");
                assert_eq!(raw_name, "DiV");
                assert_eq!(attributes[0].name, "id");
            }
            t => unreachable!("unexpected token {t:?}"),
        }
        assert!(tokens[1].is_end_tag("div"));
    }

    #[test]
    fn eof_in_tag_drops_the_tag() {
        let (tokens, errors) = tokenize("<p");
        assert!(tokens.is_empty());
        assert_eq!(errors, vec!["eof-in-tag"]);

        let (tokens, errors) = tokenize("foo<a href='x");
        assert_eq!(as_strings(&tokens), vec!["foo"]);
        assert_eq!(errors, vec!["eof-in-tag"]);
    }

    #[test]
    fn duplicate_attributes_first_wins() {
        let (tokens, errors) = tokenize("<a href=one HREF=two>");
        assert_eq!(as_strings(&tokens), vec![r#"<a href="one">"#]);
        assert_eq!(errors, vec!["duplicate-attribute"]);
    }

    #[test]
    fn duplicate_attributes_with_preserved_case() {
        let opts = Options {
            preserve_attribute_case: true,
            ..Options::default()
        };
        let (tokens, errors) = tokenize_with("<a ID=one id=two ID=three>", Some(opts), Namespace::Html);
        assert_eq!(as_strings(&tokens), vec![r#"<a ID="one" id="two">"#]);
        assert_eq!(errors, vec!["duplicate-attribute"]);
    }

    #[test]
    fn attribute_cap() {
        let mut input = String::from("<div");
        for i in 0..MAX_ATTRIBUTES + 10 {
            input.push_str(&format!(" a{i}=x"));
        }
        input.push('>');

        let (tokens, _) = tokenize(&input);
        match &tokens[0] {
            Token::StartTag { attributes, .. } => assert_eq!(attributes.len(), MAX_ATTRIBUTES),
            t => unreachable!("unexpected token {t:?}"),
        }
    }

    #[test]
    fn null_handling_depends_on_state() {
        let (tokens, errors) = tokenize("a\0b");
        assert_eq!(as_strings(&tokens), vec!["a\0b"]);
        assert_eq!(errors, vec!["unexpected-null-character"]);

        let opts = Options {
            initial_state: State::RCDATA,
            ..Options::default()
        };
        let (tokens, errors) = tokenize_with("a\0b", Some(opts), Namespace::Html);
        assert_eq!(as_strings(&tokens), vec!["a\u{FFFD}b"]);
        assert_eq!(errors, vec!["unexpected-null-character"]);

        let (tokens, _) = tokenize("<a\0b c\0='\0'>");
        assert_eq!(as_strings(&tokens), vec!["<a\u{FFFD}b c\u{FFFD}=\"\u{FFFD}\">"]);
    }

    #[test]
    fn rcdata_end_tag() {
        let opts = Options {
            initial_state: State::RCDATA,
            last_start_tag: "title".to_string(),
            ..Options::default()
        };
        let (tokens, _) = tokenize_with("a </b> &amp; </TITLE>", Some(opts), Namespace::Html);
        assert_eq!(as_strings(&tokens), vec!["a </b> & ", "</title>"]);
    }

    #[test]
    fn rawtext_without_closing_tag() {
        let opts = Options {
            initial_state: State::RAWTEXT,
            last_start_tag: "style".to_string(),
            ..Options::default()
        };
        let (tokens, _) = tokenize_with("a</b></styl", Some(opts), Namespace::Html);
        assert_eq!(as_strings(&tokens), vec!["a</b></styl"]);
    }

    #[test]
    fn script_data_escapes() {
        let opts = Options {
            initial_state: State::ScriptData,
            last_start_tag: "script".to_string(),
            ..Options::default()
        };
        let (tokens, _) = tokenize_with(
            "<!--<script></script>--></script>",
            Some(opts),
            Namespace::Html,
        );
        assert_eq!(as_strings(&tokens), vec!["<!--<script></script>-->", "</script>"]);
    }

    #[test]
    fn comments() {
        let (tokens, errors) = tokenize("<!---->< !--x--><!--a--!><?xml x?><!->");
        assert_eq!(
            as_strings(&tokens),
            vec!["<!--  -->", "< !--x-->", "<!-- a -->", "<!-- ?xml x? -->", "<!-- - -->"]
        );
        assert_eq!(
            errors,
            vec![
                "invalid-first-character-of-tag-name",
                "incorrectly-closed-comment",
                "unexpected-question-mark-instead-of-tag-name",
                "incorrectly-opened-comment",
            ]
        );
    }

    #[test]
    fn doctype() {
        let (tokens, _) = tokenize(r#"<!doctype HTML PUBLIC "-//W3C//DTD HTML 4.01//EN" 'http://x'>"#);
        match &tokens[0] {
            Token::DocType {
                name,
                pub_identifier,
                sys_identifier,
                force_quirks,
                ..
            } => {
                assert_eq!(name.as_deref(), Some("html"));
                assert_eq!(pub_identifier.as_deref(), Some("-//W3C//DTD HTML 4.01//EN"));
                assert_eq!(sys_identifier.as_deref(), Some("http://x"));
                assert!(!force_quirks);
            }
            t => unreachable!("unexpected token {t:?}"),
        }

        let (tokens, _) = tokenize("<!DOCTYPE>");
        assert!(matches!(tokens[0], Token::DocType { force_quirks: true, .. }));
    }

    #[test]
    fn cdata_only_in_foreign_content() {
        let (tokens, errors) = tokenize("<![CDATA[x]]>");
        assert_eq!(as_strings(&tokens), vec!["<!-- [CDATA[x]] -->"]);
        assert_eq!(errors, vec!["cdata-in-html-content"]);

        let (tokens, errors) = tokenize_with("a<![CDATA[<b>]]]>c", None, Namespace::Svg);
        assert_eq!(as_strings(&tokens), vec!["a", "<b>]", "c"]);
        assert!(matches!(tokens[1], Token::Text { cdata: true, .. }));
        assert!(errors.is_empty());
    }

    #[test]
    fn cdata_across_buffer_refills() {
        let content: String = (0..200).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let input = format!("<![CDATA[{content}]]>");

        let mut stream = CharacterReader::with_config(
            &input,
            Config {
                buffer_size: 16,
                track_lines: false,
            },
        );
        let error_logger = Rc::new(RefCell::new(ParseErrorList::new(10)));
        let mut tokenizer = Tokenizer::new(&mut stream, None, error_logger);
        let data = ParserData {
            adjusted_node_namespace: Namespace::MathMl,
        };

        match tokenizer.next_token(data) {
            Token::Text { text, cdata, .. } => {
                assert!(cdata);
                assert_eq!(text, content);
            }
            t => unreachable!("unexpected token {t:?}"),
        }
        assert!(tokenizer.next_token(data).is_eof());
    }

    #[test]
    fn control_characters_are_reported_once() {
        let (tokens, errors) = tokenize("a\u{1}b<p x=\u{FDD0}>");
        assert_eq!(tokens.len(), 2);
        assert_eq!(
            errors,
            vec!["control-character-in-input-stream", "noncharacter-in-input-stream"]
        );
    }

    #[test]
    fn spans() {
        let mut stream = CharacterReader::with_config(
            "ab\n<p>cd</p>",
            Config {
                track_lines: true,
                ..Config::default()
            },
        );
        let error_logger = Rc::new(RefCell::new(ParseErrorList::new(0)));
        let mut tokenizer = Tokenizer::new(&mut stream, None, error_logger);

        let text = tokenizer.next_token(ParserData::default());
        assert_eq!(text.span().start.offset, 0);
        assert_eq!(text.span().end.offset, 3);

        let p = tokenizer.next_token(ParserData::default());
        assert_eq!(p.span().start.offset, 3);
        assert_eq!(p.span().end.offset, 6);
        assert_eq!(p.span().start.line, 2);
        assert_eq!(p.span().start.column, 1);
    }
}
