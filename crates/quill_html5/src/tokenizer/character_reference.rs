use crate::errors::ParserError;
use crate::tokenizer::replacement_tables::{TOKEN_NAMED_CHARS, TOKEN_REPLACEMENTS};
use crate::tokenizer::{Tokenizer, CHAR_REPLACEMENT};
use lazy_static::lazy_static;
use quill_shared::character_reader::Character::{Ch, StreamEnd};

/// Different states for the character references
enum CcrState {
    CharacterReference,
    NamedCharacterReference,
    AmbiguousAmpersand,
    NumericCharacterReference,
    HexadecimalCharacterReferenceStart,
    DecimalCharacterReferenceStart,
    HexadecimalCharacterReference,
    DecimalCharacterReference,
    NumericalCharacterReferenceEnd,
}

impl Tokenizer<'_> {
    /// Consumes a character reference (the '&' has already been read) and places the result in
    /// the text buffer, or in the current attribute value when `as_attribute` is set.
    pub(crate) fn consume_character_reference(&mut self, as_attribute: bool) {
        let mut ccr_state = CcrState::CharacterReference;
        let mut char_ref_code: Option<u32> = Some(0);

        loop {
            match ccr_state {
                CcrState::CharacterReference => {
                    self.temporary_buffer.clear();
                    self.temporary_buffer.push('&');

                    let c = self.read_char();
                    match c {
                        Ch(ch) if ch.is_ascii_alphanumeric() => {
                            self.stream.unconsume();
                            ccr_state = CcrState::NamedCharacterReference;
                        }
                        Ch('#') => {
                            self.temporary_buffer.push('#');
                            ccr_state = CcrState::NumericCharacterReference;
                        }
                        _ => {
                            self.consume_temp_buffer(as_attribute);
                            self.stream.unconsume();
                            return;
                        }
                    }
                }
                CcrState::NamedCharacterReference => {
                    if let Some(entity) = self.find_entity() {
                        for _ in 0..entity.chars().count() {
                            self.read_char();
                        }
                        let next = self.stream.current();

                        if as_attribute
                            && !entity.ends_with(';')
                            && matches!(next, Ch(c) if c == '=' || c.is_ascii_alphanumeric())
                        {
                            // for historical reasons, the codepoints are flushed as is
                            self.temporary_buffer.push_str(&entity);
                            self.consume_temp_buffer(as_attribute);
                            return;
                        }

                        let entity_chars = TOKEN_NAMED_CHARS.get(entity.as_str()).copied().unwrap_or_default();

                        self.temporary_buffer.clear();
                        self.temporary_buffer.push_str(entity_chars);
                        self.consume_temp_buffer(as_attribute);

                        if !entity.ends_with(';') {
                            self.parse_error(ParserError::MissingSemicolonAfterCharacterReference);
                        }

                        return;
                    }

                    self.consume_temp_buffer(as_attribute);
                    ccr_state = CcrState::AmbiguousAmpersand;
                }
                CcrState::AmbiguousAmpersand => {
                    let c = self.read_char();
                    match c {
                        Ch(ch) if ch.is_ascii_alphanumeric() => {
                            if as_attribute {
                                self.current_attr_value.push(ch);
                            } else {
                                self.consume(ch);
                            }
                        }
                        Ch(';') => {
                            self.parse_error(ParserError::UnknownNamedCharacterReference);
                            self.stream.unconsume();
                            return;
                        }
                        _ => {
                            self.stream.unconsume();
                            return;
                        }
                    }
                }
                CcrState::NumericCharacterReference => {
                    char_ref_code = Some(0);

                    let c = self.read_char();
                    match c {
                        Ch('X' | 'x') => {
                            self.temporary_buffer.push(c.into());
                            ccr_state = CcrState::HexadecimalCharacterReferenceStart;
                        }
                        _ => {
                            self.stream.unconsume();
                            ccr_state = CcrState::DecimalCharacterReferenceStart;
                        }
                    }
                }
                CcrState::HexadecimalCharacterReferenceStart => {
                    let c = self.read_char();
                    self.stream.unconsume();
                    match c {
                        Ch(ch) if ch.is_ascii_hexdigit() => {
                            ccr_state = CcrState::HexadecimalCharacterReference;
                        }
                        _ => {
                            self.parse_error(ParserError::AbsenceOfDigitsInNumericCharacterReference);
                            self.consume_temp_buffer(as_attribute);
                            return;
                        }
                    }
                }
                CcrState::DecimalCharacterReferenceStart => {
                    let c = self.read_char();
                    self.stream.unconsume();
                    match c {
                        Ch(ch) if ch.is_ascii_digit() => {
                            ccr_state = CcrState::DecimalCharacterReference;
                        }
                        _ => {
                            self.parse_error(ParserError::AbsenceOfDigitsInNumericCharacterReference);
                            self.consume_temp_buffer(as_attribute);
                            return;
                        }
                    }
                }
                CcrState::HexadecimalCharacterReference => {
                    let c = self.read_char();
                    match c {
                        Ch(ch) if ch.is_ascii_hexdigit() => {
                            let i = ch.to_digit(16).unwrap_or_default();
                            char_ref_code = char_ref_code
                                .and_then(|value| value.checked_mul(16))
                                .and_then(|value| value.checked_add(i));
                        }
                        Ch(';') => ccr_state = CcrState::NumericalCharacterReferenceEnd,
                        _ => {
                            self.parse_error(ParserError::MissingSemicolonAfterCharacterReference);
                            self.stream.unconsume();
                            ccr_state = CcrState::NumericalCharacterReferenceEnd;
                        }
                    }
                }
                CcrState::DecimalCharacterReference => {
                    let c = self.read_char();
                    match c {
                        Ch(ch) if ch.is_ascii_digit() => {
                            let i = ch.to_digit(10).unwrap_or_default();
                            char_ref_code = char_ref_code
                                .and_then(|value| value.checked_mul(10))
                                .and_then(|value| value.checked_add(i));
                        }
                        Ch(';') => ccr_state = CcrState::NumericalCharacterReferenceEnd,
                        _ => {
                            self.parse_error(ParserError::MissingSemicolonAfterCharacterReference);
                            self.stream.unconsume();
                            ccr_state = CcrState::NumericalCharacterReferenceEnd;
                        }
                    }
                }
                CcrState::NumericalCharacterReferenceEnd => {
                    let overflow = char_ref_code.is_none();
                    let mut char_ref_code = char_ref_code.unwrap_or(0);

                    if char_ref_code == 0 && !overflow {
                        self.parse_error(ParserError::NullCharacterReference);
                        char_ref_code = CHAR_REPLACEMENT as u32;
                    }

                    if char_ref_code > 0x10FFFF || overflow {
                        self.parse_error(ParserError::CharacterReferenceOutsideUnicodeRange);
                        char_ref_code = CHAR_REPLACEMENT as u32;
                    }

                    if is_surrogate(char_ref_code) {
                        self.parse_error(ParserError::SurrogateCharacterReference);
                        char_ref_code = CHAR_REPLACEMENT as u32;
                    }
                    if is_noncharacter(char_ref_code) {
                        self.parse_error(ParserError::NoncharacterCharacterReference);
                    }
                    if is_control_char(char_ref_code) || char_ref_code == 0x0D {
                        self.parse_error(ParserError::ControlCharacterReference);

                        if let Some(replacement) = TOKEN_REPLACEMENTS.get(&char_ref_code) {
                            char_ref_code = *replacement as u32;
                        }
                    }

                    self.temporary_buffer.clear();
                    let c = char::from_u32(char_ref_code).unwrap_or(CHAR_REPLACEMENT);
                    self.temporary_buffer.push(c);
                    self.consume_temp_buffer(as_attribute);

                    return;
                }
            }
        }
    }

    fn consume_temp_buffer(&mut self, as_attribute: bool) {
        if as_attribute {
            self.current_attr_value.push_str(&self.temporary_buffer);
        } else {
            self.consumed.push_str(&self.temporary_buffer);
        }
        self.temporary_buffer.clear();
    }

    /// Finds the longest entity from the current position in the stream. Returns the entity
    /// name OR None when no entity has been found.
    fn find_entity(&mut self) -> Option<String> {
        let chars: Vec<char> = self.stream.peek_str(*LONGEST_ENTITY_LENGTH).chars().collect();

        (1..=chars.len())
            .rev()
            .map(|i| chars[..i].iter().collect::<String>())
            .find(|entity| TOKEN_NAMED_CHARS.contains_key(entity.as_str()))
    }
}

pub(crate) fn is_surrogate(num: u32) -> bool {
    (0xD800..=0xDFFF).contains(&num)
}

pub(crate) fn is_noncharacter(num: u32) -> bool {
    (0xFDD0..=0xFDEF).contains(&num) || (num <= 0x10FFFF && (num & 0xFFFE) == 0xFFFE)
}

/// Control characters other than ASCII whitespace and NUL
pub(crate) fn is_control_char(num: u32) -> bool {
    // White spaces are ok
    if [0x0009, 0x000A, 0x000C, 0x000D, 0x0020].contains(&num) {
        return false;
    }

    (0x0001..=0x001F).contains(&num) || (0x007F..=0x009F).contains(&num)
}

lazy_static! {
    // Length of the longest name in TOKEN_NAMED_CHARS
    static ref LONGEST_ENTITY_LENGTH: usize = {
        TOKEN_NAMED_CHARS.keys().map(|key| key.len()).max().unwrap_or(0)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ParseErrorList;
    use crate::tokenizer::{ParserData, Tokenizer};
    use quill_shared::character_reader::CharacterReader;
    use std::cell::RefCell;
    use std::rc::Rc;

    macro_rules! entity_tests {
        ($($name:ident : $value:expr)*) => {
            $(
                #[test]
                fn $name() {
                    let (input, expected) = $value;

                    let mut stream = CharacterReader::new(input);
                    let error_logger = Rc::new(RefCell::new(ParseErrorList::new(10)));
                    let mut tokenizer = Tokenizer::new(&mut stream, None, error_logger.clone());

                    let token = tokenizer.next_token(ParserData::default());
                    assert_eq!(expected, token.to_string());
                }
            )*
        }
    }

    entity_tests! {
        // Numbers
        entity_0: ("&#10;", "\n")
        entity_1: ("&#0;", "\u{FFFD}")
        entity_2: ("&#x0;", "\u{FFFD}")
        entity_3: ("&#xdeadbeef;", "\u{FFFD}")
        entity_4: ("&#xd888;", "\u{FFFD}")
        entity_5: ("&#xbeef;", "\u{BEEF}")
        entity_6: ("&#x10;", "\u{10}")
        entity_7: ("&#;", "&#;")
        entity_8: ("&;", "&;")
        entity_9: ("&", "&")
        entity_10: ("&#x1;", "\u{1}")
        entity_11: ("&#x0008;", "\u{8}")
        entity_12: ("&#0008;", "\u{8}")
        entity_13: ("&#x0009;", "\t")
        entity_14: ("&#x007F;", "\u{7f}")
        entity_15: ("&#x80;", "\u{20ac}")
        entity_16: ("&#x82;", "\u{201a}")
        entity_17: ("&#X8c;", "\u{0152}")
        entity_18: ("&#x8d;", "\u{8d}")
        entity_19: ("&#x;", "&#x;")
        entity_20: ("&#99999999999999999999;", "\u{FFFD}")

        // Entities
        entity_100: ("&copy;", "©")
        entity_101: ("&copyThing;", "©Thing;")
        entity_102: ("&raquo;", "»")
        entity_103: ("&not;", "¬")
        entity_104: ("&notit;", "¬it;")
        entity_105: ("&notin;", "∉")
        entity_106: ("&fo", "&fo")
        entity_107: ("&xxx", "&xxx")
        entity_108: ("&copy", "©")
        entity_109: ("&copy ", "© ")
        entity_110: ("&copya;", "©a;")
        entity_111: ("&#169;", "©")
        entity_112: ("&copy&", "©&")
        entity_113: ("&#169X ", "©X ")
        entity_114: ("&#xA9;", "©")
        entity_115: ("&unknown;", "&unknown;")
        entity_116: ("&COPY;", "©")
        entity_117: ("&AMP", "&")
        entity_118: ("&minus;", "\u{2212}")
        entity_119: ("&#128;", "€")
        entity_120: ("&#x9F;", "Ÿ")
        entity_121: ("&#13;", "\r")
        entity_122: ("&NotNestedGreaterGreater;", "\u{2AA2}\u{338}")
    }

    fn attribute_value(input: &str) -> (String, Vec<String>) {
        let mut stream = CharacterReader::new(input);
        let error_logger = Rc::new(RefCell::new(ParseErrorList::new(10)));
        let mut tokenizer = Tokenizer::new(&mut stream, None, error_logger.clone());

        let token = tokenizer.next_token(ParserData::default());
        let value = token.attribute("href").unwrap_or_default().to_string();
        let errors = error_logger.borrow().errors().iter().map(|e| e.message.clone()).collect();
        (value, errors)
    }

    #[test]
    fn legacy_reference_in_attribute() {
        let (value, errors) = attribute_value("<a href='?a=1&copy=2'>");
        assert_eq!(value, "?a=1&copy=2");
        assert!(errors.is_empty());

        let (value, _) = attribute_value("<a href='&notit'>");
        assert_eq!(value, "&notit");

        let (value, errors) = attribute_value("<a href='&copy;x'>");
        assert_eq!(value, "©x");
        assert!(errors.is_empty());

        let (value, errors) = attribute_value("<a href=&copy>");
        assert_eq!(value, "©");
        assert_eq!(errors, vec!["missing-semicolon-after-character-reference"]);
    }

    #[test]
    fn numeric_reference_errors() {
        let mut stream = CharacterReader::new("&#x80;&#0;&#xD800;&#xFFFF;&#1");
        let error_logger = Rc::new(RefCell::new(ParseErrorList::new(10)));
        let mut tokenizer = Tokenizer::new(&mut stream, None, error_logger.clone());

        let token = tokenizer.next_token(ParserData::default());
        assert_eq!(token.to_string(), "\u{20ac}\u{FFFD}\u{FFFD}\u{FFFF}\u{1}");

        let errors: Vec<String> = error_logger.borrow().errors().iter().map(|e| e.message.clone()).collect();
        assert_eq!(
            errors,
            vec![
                "control-character-reference",
                "null-character-reference",
                "surrogate-character-reference",
                "noncharacter-character-reference",
                "missing-semicolon-after-character-reference",
                "control-character-reference",
            ]
        );
    }

    #[test]
    fn character_classes() {
        assert!(is_surrogate(0xD800));
        assert!(!is_surrogate(0xE000));
        assert!(is_noncharacter(0xFDD0));
        assert!(is_noncharacter(0x10FFFF));
        assert!(is_noncharacter(0x2FFFE));
        assert!(!is_noncharacter(0xFFFD));
        assert!(is_control_char(0x01));
        assert!(is_control_char(0x9F));
        assert!(!is_control_char(0x0A));
        assert!(!is_control_char(0x00));
    }
}
