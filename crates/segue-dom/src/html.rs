//! HTML import and serialisation for [`ElementTree`].
//!
//! Import goes through `scraper`: the markup is parsed as a full document and
//! the children of `<body>` become children of the tree root. Whitespace-only
//! text runs, comments and doctypes are dropped.

use std::fmt::Write;

use ego_tree::NodeRef;
use scraper::{Html, Node as HtmlNode, Selector};
use tracing::debug;

use crate::error::Result;
use crate::tree::{Element, ElementTree, Node, NodeId};

impl ElementTree {
    /// Build a tree from HTML markup. The tree root is a `body` element
    /// carrying the attributes of the parsed `<body>`, if any.
    pub fn from_html(markup: &str) -> Result<Self> {
        let document = Html::parse_document(markup);
        let Some(body) = find_body(&document) else {
            return Ok(Self::new());
        };

        let root_element = match body.value() {
            HtmlNode::Element(el) => convert_element(el),
            _ => Element::new("body"),
        };
        let mut tree = Self::with_root(root_element)?;
        let root = tree.root();
        let mut imported = 0usize;
        for child in body.children() {
            imported += tree.import(root, child)?;
        }
        debug!(nodes = imported, "imported html into element tree");
        Ok(tree)
    }

    fn import(&mut self, parent: NodeId, node: NodeRef<'_, HtmlNode>) -> Result<usize> {
        match node.value() {
            HtmlNode::Element(el) => {
                let id = self.append_element(parent, convert_element(el))?;
                let mut count = 1;
                for child in node.children() {
                    count += self.import(id, child)?;
                }
                Ok(count)
            }
            HtmlNode::Text(text) => {
                let text: &str = text;
                if text.trim().is_empty() {
                    return Ok(0);
                }
                self.append_text(parent, text)?;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    /// Serialise `id` and its subtree. Unknown ids serialise to an empty string.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        write_node(self, &mut out, id);
        out
    }

    /// Serialise the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            write_node(self, &mut out, child);
        }
        out
    }
}

fn find_body(document: &Html) -> Option<NodeRef<'_, HtmlNode>> {
    let selector = Selector::parse("body").ok()?;
    document
        .select(&selector)
        .next()
        .map(|body| (*body).clone())
}

fn convert_element(el: &scraper::node::Element) -> Element {
    let mut element = Element::new(el.name().to_ascii_lowercase());
    for (name, value) in el.attrs() {
        element.set_attr(name, value);
    }
    element
}

fn write_node(tree: &ElementTree, out: &mut String, id: NodeId) {
    let Some(node) = tree.node(id) else {
        return;
    };
    match node {
        Node::Text(text) => out.push_str(&escape(text, false)),
        Node::Element(element) => {
            let _ = write!(out, "<{}", element.tag);
            if !element.classes.is_empty() {
                let _ = write!(out, " class=\"{}\"", escape(&element.classes.join(" "), true));
            }
            for (name, value) in &element.attributes {
                let _ = write!(out, " {}=\"{}\"", name, escape(value, true));
            }
            out.push('>');
            for child in tree.children(id) {
                write_node(tree, out, child);
            }
            let _ = write!(out, "</{}>", element.tag);
        }
    }
}

fn escape(raw: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_import_body_children() {
        let tree = ElementTree::from_html(
            r#"<html><body class="app">
                <main id="outlet">
                    <section data-key="home" class="page">Home</section>
                </main>
            </body></html>"#,
        )
        .unwrap();

        let root = tree.root();
        assert!(tree.element(root).unwrap().has_class("app"));
        let main = tree.find_by_tag("main").unwrap();
        assert_eq!(tree.parent(main), Some(root));
        assert_eq!(
            tree.outer_html(main),
            r#"<main id="outlet"><section class="page" data-key="home">Home</section></main>"#
        );
    }

    #[test]
    fn test_fragment_without_body_tag() {
        let tree = ElementTree::from_html(r#"<div id="a">x &amp; y</div>"#).unwrap();
        assert_eq!(tree.inner_html(tree.root()), r#"<div id="a">x &amp; y</div>"#);
    }

    #[test]
    fn test_attribute_escaping() {
        let mut tree = ElementTree::new();
        let root = tree.root();
        let id = tree
            .append_element(root, Element::new("p").with_attr("title", "\"quoted\" <b>"))
            .unwrap();
        assert_eq!(
            tree.outer_html(id),
            r#"<p title="&quot;quoted&quot; &lt;b&gt;"></p>"#
        );
    }
}
