//! Namespaces and the element categories used by tree construction

use std::fmt;

pub use quill_shared::node::NodeId;

pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
pub const MATHML_NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Namespace of an element or of an adjusted foreign attribute
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Namespace {
    #[default]
    Html,
    MathMl,
    Svg,
    XLink,
    Xml,
    Xmlns,
}

impl Namespace {
    pub fn uri(&self) -> &'static str {
        match self {
            Namespace::Html => HTML_NAMESPACE,
            Namespace::MathMl => MATHML_NAMESPACE,
            Namespace::Svg => SVG_NAMESPACE,
            Namespace::XLink => XLINK_NAMESPACE,
            Namespace::Xml => XML_NAMESPACE,
            Namespace::Xmlns => XMLNS_NAMESPACE,
        }
    }

    /// Short prefix as used in tree dumps ("svg", "math", "xlink", ...)
    pub fn prefix(&self) -> &'static str {
        match self {
            Namespace::Html => "html",
            Namespace::MathMl => "math",
            Namespace::Svg => "svg",
            Namespace::XLink => "xlink",
            Namespace::Xml => "xml",
            Namespace::Xmlns => "xmlns",
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            HTML_NAMESPACE => Some(Namespace::Html),
            MATHML_NAMESPACE => Some(Namespace::MathMl),
            SVG_NAMESPACE => Some(Namespace::Svg),
            XLINK_NAMESPACE => Some(Namespace::XLink),
            XML_NAMESPACE => Some(Namespace::Xml),
            XMLNS_NAMESPACE => Some(Namespace::Xmlns),
            _ => None,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri())
    }
}

/// HTML elements in the "special" category
pub static SPECIAL_HTML_ELEMENTS: [&str; 83] = [
    "address",
    "applet",
    "area",
    "article",
    "aside",
    "base",
    "basefont",
    "bgsound",
    "blockquote",
    "body",
    "br",
    "button",
    "caption",
    "center",
    "col",
    "colgroup",
    "dd",
    "details",
    "dir",
    "div",
    "dl",
    "dt",
    "embed",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "frame",
    "frameset",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "head",
    "header",
    "hgroup",
    "hr",
    "html",
    "iframe",
    "img",
    "input",
    "keygen",
    "li",
    "link",
    "listing",
    "main",
    "marquee",
    "menu",
    "meta",
    "nav",
    "noembed",
    "noframes",
    "noscript",
    "object",
    "ol",
    "p",
    "param",
    "plaintext",
    "pre",
    "script",
    "search",
    "section",
    "select",
    "source",
    "style",
    "summary",
    "table",
    "tbody",
    "td",
    "template",
    "textarea",
    "tfoot",
    "th",
    "thead",
    "title",
    "tr",
    "track",
    "ul",
    "wbr",
    "xmp",
];

/// MathML elements in the "special" category
pub static SPECIAL_MATHML_ELEMENTS: [&str; 6] = ["mi", "mo", "mn", "ms", "mtext", "annotation-xml"];

/// SVG elements in the "special" category
pub static SPECIAL_SVG_ELEMENTS: [&str; 3] = ["foreignObject", "desc", "title"];

/// Elements in the "formatting" category
pub static FORMATTING_HTML_ELEMENTS: [&str; 14] = [
    "a", "b", "big", "code", "em", "font", "i", "nobr", "s", "small", "strike", "strong", "tt", "u",
];

/// Elements that never have content and therefore may carry a self-closing flag
pub static VOID_HTML_ELEMENTS: [&str; 18] = [
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input", "keygen", "link",
    "meta", "param", "source", "track", "wbr",
];

/// Every HTML element name the parser knows about. Start tags outside this list are custom
/// elements and may self-close.
pub static KNOWN_HTML_ELEMENTS: &[&str] = &[
    "a",
    "abbr",
    "acronym",
    "address",
    "applet",
    "area",
    "article",
    "aside",
    "audio",
    "b",
    "base",
    "basefont",
    "bdi",
    "bdo",
    "bgsound",
    "big",
    "blink",
    "blockquote",
    "body",
    "br",
    "button",
    "canvas",
    "caption",
    "center",
    "cite",
    "code",
    "col",
    "colgroup",
    "data",
    "datalist",
    "dd",
    "del",
    "details",
    "dfn",
    "dialog",
    "dir",
    "div",
    "dl",
    "dt",
    "em",
    "embed",
    "fieldset",
    "figcaption",
    "figure",
    "font",
    "footer",
    "form",
    "frame",
    "frameset",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "head",
    "header",
    "hgroup",
    "hr",
    "html",
    "i",
    "iframe",
    "image",
    "img",
    "input",
    "ins",
    "kbd",
    "keygen",
    "label",
    "legend",
    "li",
    "link",
    "listing",
    "main",
    "map",
    "mark",
    "marquee",
    "menu",
    "menuitem",
    "meta",
    "meter",
    "nav",
    "nobr",
    "noembed",
    "noframes",
    "noscript",
    "object",
    "ol",
    "optgroup",
    "option",
    "output",
    "p",
    "param",
    "picture",
    "plaintext",
    "pre",
    "progress",
    "q",
    "rb",
    "rp",
    "rt",
    "rtc",
    "ruby",
    "s",
    "samp",
    "script",
    "search",
    "section",
    "select",
    "slot",
    "small",
    "source",
    "span",
    "strike",
    "strong",
    "style",
    "sub",
    "summary",
    "sup",
    "table",
    "tbody",
    "td",
    "template",
    "textarea",
    "tfoot",
    "th",
    "thead",
    "time",
    "title",
    "tr",
    "track",
    "tt",
    "u",
    "ul",
    "var",
    "video",
    "wbr",
    "xmp",
];

/// Returns true when the element is in the "special" category
pub fn is_special(name: &str, namespace: Namespace) -> bool {
    match namespace {
        Namespace::Html => SPECIAL_HTML_ELEMENTS.contains(&name),
        Namespace::MathMl => SPECIAL_MATHML_ELEMENTS.contains(&name),
        Namespace::Svg => SPECIAL_SVG_ELEMENTS.contains(&name),
        _ => false,
    }
}

/// Returns true when the element is in the "formatting" category
pub fn is_formatting(name: &str, namespace: Namespace) -> bool {
    namespace == Namespace::Html && FORMATTING_HTML_ELEMENTS.contains(&name)
}

pub fn is_void(name: &str) -> bool {
    VOID_HTML_ELEMENTS.contains(&name)
}

pub fn is_known_html(name: &str) -> bool {
    KNOWN_HTML_ELEMENTS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("p", Namespace::Html, true)]
    #[test_case("span", Namespace::Html, false)]
    #[test_case("mi", Namespace::MathMl, true)]
    #[test_case("mi", Namespace::Html, false)]
    #[test_case("foreignObject", Namespace::Svg, true)]
    #[test_case("foreignobject", Namespace::Svg, false)]
    fn special_elements(name: &str, ns: Namespace, expected: bool) {
        assert_eq!(is_special(name, ns), expected);
    }

    #[test]
    fn categories() {
        assert!(is_formatting("nobr", Namespace::Html));
        assert!(!is_formatting("b", Namespace::Svg));
        assert!(is_void("br"));
        assert!(!is_void("p"));
        assert!(is_known_html("marquee"));
        assert!(!is_known_html("my-widget"));
        for name in VOID_HTML_ELEMENTS {
            assert!(is_known_html(name), "{name} should be known");
        }
    }

    #[test]
    fn namespace_uris() {
        for ns in [
            Namespace::Html,
            Namespace::MathMl,
            Namespace::Svg,
            Namespace::XLink,
            Namespace::Xml,
            Namespace::Xmlns,
        ] {
            assert_eq!(Namespace::from_uri(ns.uri()), Some(ns));
        }
        assert_eq!(Namespace::Svg.prefix(), "svg");
    }
}
