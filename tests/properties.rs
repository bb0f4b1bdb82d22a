use quill_html5::document::Document;
use quill_html5::node::NodeId;
use quill_html5::{parse_document, parse_fragment, FragmentContext, Html5Parser, Html5ParserOptions};
use quill_shared::character_reader::{CharacterReader, Config};
use quill_testing::tree_construction::generator::TreeOutputGenerator;

fn body(document: &Document) -> NodeId {
    document
        .elements_by_tag_name("body")
        .first()
        .copied()
        .unwrap_or_else(NodeId::root)
}

fn child_names(document: &Document, node_id: NodeId) -> Vec<String> {
    document
        .children(node_id)
        .iter()
        .map(|&child| match document.tag_name(child) {
            Some(name) => name.to_string(),
            None => format!("#{}", document.text_content(child)),
        })
        .collect()
}

const MIXED_DOCUMENT: &str = concat!(
    r#"<!DOCTYPE html PUBLIC "-//W3C//DTD HTML 4.01//EN" "http://www.w3.org/TR/html4/strict.dtd">"#,
    r#"<html lang=en><head><title>a &amp; b</title></head>"#,
    r#"<body class="main" id=top data-x='y'><!-- note -- here -->"#,
    r#"<p>caf&eacute; &#x263A; &copy <b><i>mis</b>nested</i>"#,
    r#"<svg><![CDATA[x<y]]><circle r=1 /></svg>"#,
    r#"<table><tr><td>cell<td>two</table>tail"#,
    r#"<script>if (a < b) { c = "</p>"; }</script></body></html>"#,
);

/// Every prefix of the input parses to a document with a body, in document and fragment mode
#[test]
fn parsing_is_total_on_truncated_input() {
    let contexts = [FragmentContext::new("body"), FragmentContext::new("table")];

    for (idx, _) in MIXED_DOCUMENT.char_indices() {
        let prefix = &MIXED_DOCUMENT[..idx];

        let document = parse_document(prefix, None, None);
        assert_eq!(document.elements_by_tag_name("body").len(), 1, "prefix {prefix:?}");

        for context in &contexts {
            let fragment = parse_fragment(prefix, Some(context), None, None);
            assert!(fragment.document.document_element().is_some(), "prefix {prefix:?}");
        }
    }
}

#[test]
fn parsing_is_deterministic() {
    let options = Html5ParserOptions::new().track_errors(100);

    let first = parse_document(MIXED_DOCUMENT, None, Some(options.clone()));
    let second = parse_document(MIXED_DOCUMENT, None, Some(options));

    assert_eq!(
        TreeOutputGenerator::new(&first).generate(),
        TreeOutputGenerator::new(&second).generate()
    );
    assert_eq!(first.errors(), second.errors());

    let context = FragmentContext::new("td");
    let first = parse_fragment(MIXED_DOCUMENT, Some(&context), None, None);
    let second = parse_fragment(MIXED_DOCUMENT, Some(&context), None, None);
    assert_eq!(first.nodes.len(), second.nodes.len());
    assert_eq!(
        TreeOutputGenerator::new(&first.document).generate(),
        TreeOutputGenerator::new(&second.document).generate()
    );
}

#[test]
fn unterminated_tag_is_dropped() {
    let document = parse_document("<p", None, None);

    assert!(document.elements_by_tag_name("p").is_empty());
    assert_eq!(document.elements_by_tag_name("body").len(), 1);
}

#[test]
fn text_content_of_body() {
    let document = parse_document("foo <b>bar</b> baz", None, None);

    assert_eq!(document.text_content(body(&document)), "foo bar baz");
}

#[test]
fn table_content_is_foster_parented() {
    let document = parse_document("<table><b><tr><td>aaa</td></tr>bbb</table>ccc", None, None);

    let body = body(&document);
    assert_eq!(child_names(&document, body), vec!["b", "b", "table", "b"]);

    let children = document.children(body);
    assert_eq!(document.text_content(children[0]), "");
    assert_eq!(document.text_content(children[1]), "bbb");
    assert_eq!(document.text_content(children[2]), "aaa");
    assert_eq!(document.text_content(children[3]), "ccc");
}

#[test]
fn misnested_formatting() {
    let document = parse_document("<!DOCTYPE html><p>1<b>2<i>3</b>4</i>5</p>", None, None);

    let p = document.elements_by_tag_name("p");
    assert_eq!(p.len(), 1);
    assert_eq!(child_names(&document, p[0]), vec!["#1", "b", "i", "#5"]);
    assert_eq!(document.elements_by_tag_name("i").len(), 2);
    assert_eq!(document.text_content(p[0]), "12345");
}

#[test]
fn at_most_three_identical_formatting_elements_are_reopened() {
    let html = format!("<!DOCTYPE html><p>{}<p>X", "<b class=x>".repeat(6));
    let document = parse_document(&html, None, None);

    let p = document.elements_by_tag_name("p");
    assert_eq!(p.len(), 2);
    assert_eq!(document.elements_by_tag_name("b").len(), 6 + 3);

    // Walk the reopened chain in the second paragraph
    let mut depth = 0;
    let mut node_id = p[1];
    while let Some(&child) = document.children(node_id).first() {
        if document.tag_name(child) != Some("b") {
            break;
        }
        assert_eq!(document.attribute(child, "class"), Some("x"));
        depth += 1;
        node_id = child;
    }
    assert_eq!(depth, 3);
    assert_eq!(document.text_content(p[1]), "X");
}

#[test]
fn fragment_context_decides_table_fixup() {
    let html = "<tr><td><img></td></tr>";

    let fragment = parse_fragment(html, Some(&FragmentContext::new("template")), None, None);
    let names = fragment
        .nodes
        .iter()
        .map(|&id| fragment.document.tag_name(id).unwrap_or_default().to_string())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["tr"]);

    let fragment = parse_fragment(html, Some(&FragmentContext::new("table")), None, None);
    let names = fragment
        .nodes
        .iter()
        .map(|&id| fragment.document.tag_name(id).unwrap_or_default().to_string())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["tbody"]);
    assert_eq!(fragment.document.elements_by_tag_name("img").len(), 1);
}

#[test]
fn error_list_is_capped() {
    let html = format!("<!DOCTYPE html><body>{}", "</x>".repeat(50));

    let all = parse_document(&html, None, Some(Html5ParserOptions::new().track_errors(1000)));
    assert!(all.errors().len() >= 50);

    let capped = parse_document(&html, None, Some(Html5ParserOptions::new().track_errors(5)));
    assert_eq!(capped.errors().len(), all.errors().len().min(5));
    assert_eq!(capped.errors(), &all.errors()[..5]);

    let none = parse_document(&html, None, None);
    assert!(none.errors().is_empty());
}

#[test]
fn cdata_across_buffer_refill() {
    let content = "0123456789abcdef".repeat(20);
    let html = format!("<!DOCTYPE html><svg><![CDATA[{content}]]></svg>");

    let mut stream = CharacterReader::with_config(
        &html,
        Config {
            buffer_size: 16,
            track_lines: false,
        },
    );
    let mut document = Document::new();
    let errors = Html5Parser::parse_document(&mut stream, &mut document, None);

    assert!(errors.is_empty());
    let svg = document.elements_by_tag_name("svg");
    assert_eq!(svg.len(), 1);
    assert_eq!(document.text_content(svg[0]), content);
}

#[test]
fn nesting_depth_is_bounded() {
    let html = "<div>".repeat(1000);
    let document = parse_document(&html, None, Some(Html5ParserOptions::new().max_depth(64)));

    let mut depth = 0;
    let mut node_id = NodeId::root();
    while let Some(&child) = document.children(node_id).last() {
        depth += 1;
        node_id = child;
    }
    assert!(depth <= 64);
    assert_eq!(document.elements_by_tag_name("div").len(), 1000);
}

#[test]
fn scripting_flag_changes_noscript() {
    let html = "<!DOCTYPE html><body><noscript><p>x</p></noscript>";

    let document = parse_document(html, None, Some(Html5ParserOptions::new().scripting_enabled(true)));
    assert!(document.elements_by_tag_name("p").is_empty());

    let document = parse_document(html, None, Some(Html5ParserOptions::new().scripting_enabled(false)));
    assert_eq!(document.elements_by_tag_name("p").len(), 1);
}

#[test]
fn source_positions() {
    let html = "<!DOCTYPE html><p>x</p>";

    let document = parse_document(html, None, Some(Html5ParserOptions::new().track_source_positions(true)));
    let p = document.elements_by_tag_name("p");
    assert_eq!(p.len(), 1);
    assert_eq!(document.source_span(p[0]).map(|span| span.start.offset), Some(15));

    let document = parse_document(html, None, None);
    let p = document.elements_by_tag_name("p");
    assert!(document.source_span(p[0]).is_none());
}
