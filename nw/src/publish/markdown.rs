//! Markdown to Telegraph content nodes
//!
//! Deliberately small and predictable: blank lines break paragraphs, `# ` and
//! `## ` become headings, everything else is paragraph text.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A Telegraph content node: plain text or an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Text(String),
    Element {
        tag: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        attrs: Option<Map<String, Value>>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<Node>,
    },
}

impl Node {
    pub fn element(tag: &str, children: Vec<Node>) -> Self {
        Node::Element {
            tag: tag.to_string(),
            attrs: None,
            children,
        }
    }

    pub fn text_element(tag: &str, text: impl Into<String>) -> Self {
        Self::element(tag, vec![Node::Text(text.into())])
    }

    pub fn link(href: &str, text: impl Into<String>) -> Self {
        let mut attrs = Map::new();
        attrs.insert("href".to_string(), Value::String(href.to_string()));
        Node::Element {
            tag: "a".to_string(),
            attrs: Some(attrs),
            children: vec![Node::Text(text.into())],
        }
    }
}

fn flush_paragraph(paragraph: &mut Vec<&str>, nodes: &mut Vec<Node>) {
    let text = paragraph
        .drain(..)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !text.is_empty() {
        nodes.push(Node::text_element("p", text));
    }
}

/// Convert chapter markdown into Telegraph nodes
pub fn md_to_nodes(md: &str) -> Vec<Node> {
    let normalized = md.replace("\r\n", "\n");
    let mut nodes = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    for line in normalized.split('\n').map(str::trim_end) {
        if line.trim().is_empty() {
            flush_paragraph(&mut paragraph, &mut nodes);
        } else if let Some(heading) = line.strip_prefix("# ") {
            flush_paragraph(&mut paragraph, &mut nodes);
            nodes.push(Node::text_element("h3", heading.trim()));
        } else if let Some(heading) = line.strip_prefix("## ") {
            flush_paragraph(&mut paragraph, &mut nodes);
            nodes.push(Node::text_element("h4", heading.trim()));
        } else {
            paragraph.push(line);
        }
    }
    flush_paragraph(&mut paragraph, &mut nodes);

    nodes
}

/// One entry of the book index: display title plus URL when published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterLink {
    pub title: String,
    pub url: Option<String>,
}

/// Index page: book title, intro paragraphs, then the chapter list
pub fn index_nodes(book_title: &str, intro: &str, links: &[ChapterLink]) -> Vec<Node> {
    let mut nodes = vec![Node::text_element("h3", book_title)];
    if !intro.trim().is_empty() {
        nodes.extend(md_to_nodes(intro.trim()));
    }

    let items = links
        .iter()
        .map(|link| match &link.url {
            Some(url) => Node::element("li", vec![Node::link(url, link.title.clone())]),
            None => Node::text_element("li", format!("{} (unpublished)", link.title)),
        })
        .collect();
    nodes.push(Node::element("ul", items));
    nodes
}
