//! HTML5 tokenizer and parser
//!
//! The parser's job is to take a string (or a stream of bytes) and turn it into a document tree.
//! The tokenizer is a state machine that pulls characters from a [`CharacterReader`], the tree
//! builder is a second state machine (the insertion modes) that pulls tokens from the tokenizer
//! and builds the tree through the [`TreeSink`] trait. Both run in the current thread.
//!
//! Malformed HTML never fails: every problem is recovered locally and optionally recorded as a
//! [`ParseError`].
use crate::document::Document;
use crate::errors::Error;
use crate::node::NodeId;
use log::warn;
use quill_shared::character_reader::{CharacterReader, Config};
use std::io::Read;
use url::Url;

pub use crate::errors::ParseError;
pub use crate::parser::quirks::QuirksMode;
pub use crate::parser::tree_builder::TreeSink;
pub use crate::parser::{FragmentContext, Html5Parser, Html5ParserOptions};

pub mod document;
pub mod errors;
pub mod node;
pub mod parser;
pub mod tokenizer;

/// Result of parsing a fragment
pub struct Fragment {
    /// The document that holds the parsed nodes. Its only child is a synthetic `html` element.
    pub document: Document,
    /// The top level nodes of the fragment, in order
    pub nodes: Vec<NodeId>,
}

fn reader_config(options: &Html5ParserOptions) -> Config {
    Config {
        track_lines: options.track_source_positions || options.track_errors > 0,
        ..Config::default()
    }
}

/// Creates a new document with the given base uri. An invalid base uri is ignored.
fn new_document(base_uri: Option<&str>) -> Document {
    let mut document = Document::new();

    if let Some(base_uri) = base_uri {
        match Url::parse(base_uri) {
            Ok(url) => document.set_base_url(url),
            Err(err) => warn!("ignoring invalid base uri '{base_uri}': {err}"),
        }
    }

    document
}

/// Parses the given HTML string into a complete document. The `html`, `head` and `body` elements
/// are always present in the result.
pub fn parse_document(html: &str, base_uri: Option<&str>, options: Option<Html5ParserOptions>) -> Document {
    let options = options.unwrap_or_default();

    let mut stream = CharacterReader::with_config(html, reader_config(&options));
    let mut document = new_document(base_uri);

    let errors = Html5Parser::parse_document(&mut stream, &mut document, Some(options));
    document.set_errors(errors);

    document
}

/// Parses the given bytes into a complete document. The encoding is given as a label
/// ("utf-8", "windows-1252", ...); without a label the input is sniffed for a byte order mark
/// and decoded as UTF-8 otherwise.
pub fn parse_document_bytes(
    bytes: &[u8],
    encoding: Option<&str>,
    base_uri: Option<&str>,
    options: Option<Html5ParserOptions>,
) -> Result<Document, Error> {
    let options = options.unwrap_or_default();
    let encoding = encoding_for_label(encoding)?;

    let stream = CharacterReader::from_bytes(bytes, encoding, reader_config(&options));
    parse_document_stream(stream, base_uri, options)
}

/// Reads the reader to its end and parses the bytes as [`parse_document_bytes`] does
pub fn parse_document_reader(
    reader: impl Read,
    encoding: Option<&str>,
    base_uri: Option<&str>,
    options: Option<Html5ParserOptions>,
) -> Result<Document, Error> {
    let options = options.unwrap_or_default();
    let encoding = encoding_for_label(encoding)?;

    let stream = CharacterReader::from_reader(reader, encoding, reader_config(&options))?;
    parse_document_stream(stream, base_uri, options)
}

fn encoding_for_label(label: Option<&str>) -> Result<Option<&'static encoding_rs::Encoding>, Error> {
    let Some(label) = label else {
        return Ok(None);
    };

    encoding_rs::Encoding::for_label(label.trim().as_bytes())
        .map(Some)
        .ok_or_else(|| Error::UnknownEncoding(label.to_string()))
}

/// Unlike the string entry points, an invalid base uri is an error here
fn parse_document_stream(
    mut stream: CharacterReader,
    base_uri: Option<&str>,
    options: Html5ParserOptions,
) -> Result<Document, Error> {
    let base_url = base_uri.map(Url::parse).transpose()?;

    let mut document = Document::new();
    if let Some(base_url) = base_url {
        document.set_base_url(base_url);
    }

    let errors = Html5Parser::parse_document(&mut stream, &mut document, Some(options));
    document.set_errors(errors);

    Ok(document)
}

/// Parses the given HTML string as the contents of the context element (as is done when setting
/// `innerHTML`). Without a context, the fragment is parsed as the contents of a `body` element.
pub fn parse_fragment(
    html: &str,
    context: Option<&FragmentContext>,
    base_uri: Option<&str>,
    options: Option<Html5ParserOptions>,
) -> Fragment {
    let options = options.unwrap_or_default();
    let body_context = FragmentContext::new("body");
    let context = context.unwrap_or(&body_context);

    let mut stream = CharacterReader::with_config(html, reader_config(&options));
    let mut document = new_document(base_uri);

    let errors = Html5Parser::parse_fragment(&mut stream, &mut document, context, Some(options));
    document.set_errors(errors);

    let nodes = document
        .document_element()
        .map(|root| document.children(root).to_vec())
        .unwrap_or_default();

    Fragment { document, nodes }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_has_implied_elements() {
        let document = parse_document("hello", None, None);

        assert_eq!(document.elements_by_tag_name("html").len(), 1);
        assert_eq!(document.elements_by_tag_name("head").len(), 1);
        assert_eq!(document.elements_by_tag_name("body").len(), 1);
        assert_eq!(document.quirks_mode(), QuirksMode::Quirks);
    }

    #[test]
    fn base_uri() {
        let document = parse_document(
            r#"<!DOCTYPE html><base href="/docs/"><base href="/other/">"#,
            Some("https://example.com/index.html"),
            None,
        );

        assert_eq!(
            document.base_url().map(|url| url.as_str()),
            Some("https://example.com/docs/")
        );
        assert_eq!(document.quirks_mode(), QuirksMode::NoQuirks);

        let document = parse_document("<p>x</p>", Some("not a url"), None);
        assert!(document.base_url().is_none());
    }

    #[test]
    fn document_from_bytes() {
        let document = parse_document_bytes(b"<p>caf\xe9</p>", Some("windows-1252"), None, None);
        assert!(document.is_ok());

        let document = document.unwrap_or_default();
        let p = document.elements_by_tag_name("p")[0];
        assert_eq!(document.text_content(p), "café");

        assert!(matches!(
            parse_document_bytes(b"<p>", Some("no-such-encoding"), None, None),
            Err(Error::UnknownEncoding(_))
        ));
        assert!(matches!(
            parse_document_bytes(b"<p>", None, Some("::"), None),
            Err(Error::BaseUrl(_))
        ));
    }

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken"))
        }
    }

    #[test]
    fn document_from_reader() {
        let document = parse_document_reader(&b"\xef\xbb\xbf<title>t</title>x"[..], None, None, None);
        assert!(document.is_ok());

        let document = document.unwrap_or_default();
        assert_eq!(document.text_content(NodeId::root()), "tx");

        assert!(matches!(
            parse_document_reader(BrokenReader, None, None, None),
            Err(Error::Input(quill_shared::types::Error::IO(_)))
        ));
        assert!(matches!(
            parse_document_reader(&b"<p>"[..], Some("no-such-encoding"), None, None),
            Err(Error::UnknownEncoding(_))
        ));
    }

    #[test]
    fn fragment_default_context() {
        let fragment = parse_fragment("<b>bold</b> text", None, None, None);

        assert_eq!(fragment.nodes.len(), 2);
        assert_eq!(fragment.document.tag_name(fragment.nodes[0]), Some("b"));
        assert!(fragment.document.elements_by_tag_name("body").is_empty());
    }

    #[test]
    fn errors_are_collected() {
        let options = Html5ParserOptions::new().track_errors(100);
        let document = parse_document("<p>1</b>", None, Some(options));
        assert!(!document.errors().is_empty());

        let document = parse_document("<p>1</b>", None, None);
        assert!(document.errors().is_empty());
    }
}
