use crate::node::Namespace;
use crate::tokenizer::CHAR_NUL;
use quill_shared::character_reader::Span;

/// A single attribute of a start tag. Attributes keep their source order.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    /// Only set for adjusted foreign attributes (xlink:href, xml:lang, ...)
    pub namespace: Option<Namespace>,
}

impl Attribute {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            namespace: None,
        }
    }
}

/// The different token structures that can be emitted by the tokenizer
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    DocType {
        name: Option<String>,
        force_quirks: bool,
        pub_identifier: Option<String>,
        sys_identifier: Option<String>,
        span: Span,
    },
    StartTag {
        /// ASCII-lowercased tag name
        name: String,
        /// Tag name as written in the source
        raw_name: String,
        is_self_closing: bool,
        attributes: Vec<Attribute>,
        span: Span,
    },
    EndTag {
        name: String,
        is_self_closing: bool,
        span: Span,
    },
    Comment {
        comment: String,
        /// Set for comments that were recovered from malformed markup (`<!foo>`, `<?xml ..>`)
        bogus: bool,
        span: Span,
    },
    Text {
        text: String,
        /// Set when the characters come from a CDATA section
        cdata: bool,
        span: Span,
    },
    Eof {
        span: Span,
    },
}

impl Token {
    /// Returns true when there is a mixture of white and non-white and \0 characters in the token
    pub(crate) fn is_mixed(&self) -> bool {
        if let Token::Text { text: value, .. } = self {
            let mut found = 0;

            if value.chars().any(|ch| ch.is_ascii_whitespace()) {
                found += 1;
            }
            if value.chars().any(|ch| ch == CHAR_NUL) {
                found += 1;
            }
            if value.chars().any(|ch| !ch.is_ascii_whitespace() && ch != CHAR_NUL) {
                found += 1;
            }
            found > 1
        } else {
            false
        }
    }

    /// Returns true when there is a mixture of \0 and non-\0 characters in the token
    pub(crate) fn is_mixed_null(&self) -> bool {
        if let Token::Text { text: value, .. } = self {
            value.chars().any(|ch| ch == CHAR_NUL) && value.chars().any(|ch| ch != CHAR_NUL)
        } else {
            false
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Token::DocType { span, .. }
            | Token::StartTag { span, .. }
            | Token::EndTag { span, .. }
            | Token::Comment { span, .. }
            | Token::Text { span, .. }
            | Token::Eof { span } => *span,
        }
    }

    pub(crate) fn set_span(&mut self, new_span: Span) {
        match self {
            Token::DocType { span, .. }
            | Token::StartTag { span, .. }
            | Token::EndTag { span, .. }
            | Token::Comment { span, .. }
            | Token::Text { span, .. }
            | Token::Eof { span } => *span = new_span,
        }
    }

    /// Returns true when any of the characters in the token are null
    pub fn is_null(&self) -> bool {
        if let Token::Text { text: value, .. } = self {
            value.chars().any(|ch| ch == CHAR_NUL)
        } else {
            false
        }
    }

    /// Returns true when the token is an EOF token
    pub fn is_eof(&self) -> bool {
        matches!(self, Token::Eof { .. })
    }

    /// Returns true if the text token is empty or only contains whitespace
    pub fn is_empty_or_white(&self) -> bool {
        if let Token::Text { text: value, .. } = self {
            value.chars().all(|ch| ch.is_ascii_whitespace())
        } else {
            false
        }
    }

    pub fn is_start_tag(&self, wanted_name: &str) -> bool {
        matches!(self, Token::StartTag { name, .. } if name == wanted_name)
    }

    pub fn is_any_start_tag(&self) -> bool {
        matches!(self, Token::StartTag { .. })
    }

    pub fn is_end_tag(&self, wanted_name: &str) -> bool {
        matches!(self, Token::EndTag { name, .. } if name == wanted_name)
    }

    pub fn is_text_token(&self) -> bool {
        matches!(self, Token::Text { .. })
    }

    /// Returns the value of the given attribute of a start tag
    pub fn attribute(&self, wanted: &str) -> Option<&str> {
        match self {
            Token::StartTag { attributes, .. } => attributes
                .iter()
                .find(|attr| attr.name == wanted)
                .map(|attr| attr.value.as_str()),
            _ => None,
        }
    }

    /// Short description of the kind of token, used in parse error messages
    pub(crate) fn kind(&self) -> String {
        match self {
            Token::DocType { .. } => "doctype".to_string(),
            Token::StartTag { name, .. } => format!("start tag <{name}>"),
            Token::EndTag { name, .. } => format!("end tag </{name}>"),
            Token::Comment { .. } => "comment".to_string(),
            Token::Text { .. } => "character".to_string(),
            Token::Eof { .. } => "end of file".to_string(),
        }
    }
}

// Each token can be displayed as a string
impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Token::DocType {
                name,
                pub_identifier,
                sys_identifier,
                ..
            } => {
                let mut result = format!("<!DOCTYPE {}", name.clone().unwrap_or_default());
                if let Some(pub_id) = pub_identifier {
                    result.push_str(&format!(r#" PUBLIC "{pub_id}""#));
                }
                if let Some(sys_id) = sys_identifier {
                    result.push_str(&format!(r#" SYSTEM "{sys_id}""#));
                }
                result.push_str(" />");
                write!(f, "{result}")
            }
            Token::Comment { comment: value, .. } => write!(f, "<!-- {value} -->"),
            Token::Text { text: value, .. } => write!(f, "{value}"),
            Token::StartTag {
                name,
                is_self_closing,
                attributes,
                ..
            } => {
                let mut result = format!("<{name}");
                for attr in attributes {
                    result.push_str(&format!(r#" {}="{}""#, attr.name, attr.value));
                }
                if *is_self_closing {
                    result.push_str(" /");
                }
                result.push('>');
                write!(f, "{result}")
            }
            Token::EndTag {
                name, is_self_closing, ..
            } => write!(f, "</{}{}>", name, if *is_self_closing { "/" } else { "" }),
            Token::Eof { .. } => write!(f, "EOF"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Token {
        Token::Text {
            text: value.to_string(),
            cdata: false,
            span: Span::default(),
        }
    }

    fn start_tag(name: &str, attributes: Vec<Attribute>, is_self_closing: bool) -> Token {
        Token::StartTag {
            name: name.to_string(),
            raw_name: name.to_string(),
            is_self_closing,
            attributes,
            span: Span::default(),
        }
    }

    #[test]
    fn test_token_is_null() {
        assert!(text("Hello\0World").is_null());
        assert!(!text("Hello World").is_null());
    }

    #[test]
    fn test_token_is_mixed() {
        assert!(text("  foo").is_mixed());
        assert!(text("\0 ").is_mixed());
        assert!(!text("   ").is_mixed());
        assert!(!text("foo").is_mixed());

        assert!(text("a\0").is_mixed_null());
        assert!(!text("\0\0").is_mixed_null());
    }

    #[test]
    fn test_token_is_empty_or_white() {
        assert!(text(" \n\t").is_empty_or_white());
        assert!(text("").is_empty_or_white());
        assert!(!text(" a ").is_empty_or_white());
    }

    #[test]
    fn test_token_display() {
        let token = Token::DocType {
            name: Some("html".to_string()),
            force_quirks: false,
            pub_identifier: Some("foo".to_string()),
            sys_identifier: Some("bar".to_string()),
            span: Span::default(),
        };
        assert_eq!(format!("{token}"), r#"<!DOCTYPE html PUBLIC "foo" SYSTEM "bar" />"#);

        let token = Token::Comment {
            comment: "<p>Hello world</p>".to_string(),
            bogus: false,
            span: Span::default(),
        };
        assert_eq!(format!("{token}"), "<!-- <p>Hello world</p> -->");

        let token = start_tag("html", vec![Attribute::new("foo", "bar"), Attribute::new("a", "b")], false);
        assert_eq!(format!("{token}"), r#"<html foo="bar" a="b">"#);
        assert_eq!(format!("{}", start_tag("br", vec![], true)), "<br />");

        let token = Token::EndTag {
            name: "html".to_string(),
            is_self_closing: false,
            span: Span::default(),
        };
        assert_eq!(format!("{token}"), "</html>");
        assert_eq!(format!("{}", Token::Eof { span: Span::default() }), "EOF");
    }

    #[test]
    fn test_tag_queries() {
        let token = start_tag("div", vec![Attribute::new("id", "x")], false);
        assert!(token.is_start_tag("div"));
        assert!(!token.is_start_tag("span"));
        assert!(token.is_any_start_tag());
        assert!(!token.is_text_token());
        assert!(!token.is_end_tag("div"));
        assert_eq!(token.attribute("id"), Some("x"));
        assert_eq!(token.attribute("class"), None);
        assert!(text("x").is_text_token());
    }
}
