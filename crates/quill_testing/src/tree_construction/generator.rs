use quill_html5::document::{Document, Node, NodeData};
use quill_html5::node::{Namespace, NodeId};

/// Generates a tree output that can be used for matching with the expected output
pub struct TreeOutputGenerator<'a> {
    document: &'a Document,
}

impl<'a> TreeOutputGenerator<'a> {
    /// Initializes a new tree output generator
    #[must_use]
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Generates the tree of the whole document
    pub fn generate(&self) -> Vec<String> {
        self.generate_from(NodeId::root())
    }

    /// Generates the tree below the given node. The node itself is not part of the output, which
    /// is used for fragments that live inside a synthetic root element.
    pub fn generate_from(&self, root: NodeId) -> Vec<String> {
        self.output_treeline(root, 0)
    }

    /// Generates an array of indented tree line and its children. Note that text lines can have newlines in them
    fn output_treeline(&self, node_id: NodeId, indent_level: usize) -> Vec<String> {
        let mut output = Vec::new();
        let Some(node) = self.document.node(node_id) else {
            return output;
        };

        let mut children_level = indent_level;

        // The root node is not printed, only its children
        if indent_level > 0 {
            output.push(format!("| {}{}", "  ".repeat(indent_level - 1), self.output_node(node)));

            if let NodeData::Element(element) = &node.data {
                let mut sorted_attrs = element
                    .attributes
                    .iter()
                    .map(|attr| {
                        let name = match attr.namespace {
                            Some(namespace) => format!("{} {}", namespace.prefix(), attr.name),
                            None => attr.name.clone(),
                        };
                        (name, attr.value.as_str())
                    })
                    .collect::<Vec<_>>();
                sorted_attrs.sort_by(|a, b| a.0.cmp(&b.0));

                for (name, value) in &sorted_attrs {
                    output.push(format!(r#"| {}{}="{}""#, "  ".repeat(indent_level), name, value));
                }

                // Template tags have an extra "content" node in the test tree output
                if let Some(contents) = element.template_contents {
                    output.push(format!("| {}content", "  ".repeat(indent_level)));
                    for &child_id in self.document.children(contents) {
                        output.append(&mut self.output_treeline(child_id, indent_level + 2));
                    }
                    children_level = indent_level + 1;
                }
            }
        }

        for &child_id in &node.children {
            output.append(&mut self.output_treeline(child_id, children_level + 1));
        }

        output
    }

    /// Generate the output for a single node
    fn output_node(&self, node: &Node) -> String {
        match &node.data {
            NodeData::Element(data) => {
                let ns_prefix = match data.namespace {
                    Namespace::MathMl => "math ",
                    Namespace::Svg => "svg ",
                    _ => "",
                };

                format!("<{}{}>", ns_prefix, data.name)
            }
            NodeData::Text(value) => format!(r#""{value}""#),
            NodeData::Comment(value) => format!("<!-- {value} -->"),
            NodeData::DocType {
                name,
                public_id,
                system_id,
            } => {
                if public_id.is_empty() && system_id.is_empty() {
                    // <!DOCTYPE html>
                    format!("<!DOCTYPE {}>", name.trim())
                } else {
                    // <!DOCTYPE html "pubid" "sysid">
                    format!(r#"<!DOCTYPE {name} "{public_id}" "{system_id}">"#)
                }
            }
            NodeData::Document | NodeData::DocumentFragment => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_html5::parse_document;

    #[test]
    fn generate_tree() {
        let document = parse_document(
            r##"<!DOCTYPE html><p class="a" id=b>x<!--c--></p><svg viewbox="0 0 1 1" xlink:href="#"></svg>"##,
            None,
            None,
        );

        let output = TreeOutputGenerator::new(&document).generate();
        assert_eq!(
            output,
            vec![
                "| <!DOCTYPE html>",
                "| <html>",
                "|   <head>",
                "|   <body>",
                "|     <p>",
                r#"|       class="a""#,
                r#"|       id="b""#,
                r#"|       "x""#,
                "|       <!-- c -->",
                "|     <svg svg>",
                r#"|       viewBox="0 0 1 1""#,
                r##"|       xlink href="#""##,
            ]
        );
    }

    #[test]
    fn generate_template() {
        let document = parse_document("<template><b>x</b></template>", None, None);

        let output = TreeOutputGenerator::new(&document).generate();
        assert_eq!(
            output,
            vec![
                "| <html>",
                "|   <head>",
                "|     <template>",
                "|       content",
                "|         <b>",
                r#"|           "x""#,
                "|   <body>",
            ]
        );
    }
}
