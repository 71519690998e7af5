//! Rich-text trees produced by the CMS editor
//!
//! The editor stores content as a Lexical-style JSON tree. Only the node types
//! the blog actually uses get dedicated markup; anything else renders its
//! children so text is never silently lost.

use serde::{Deserialize, Serialize};

use crate::helpers::{encode_path_segment, html_escape};

const FORMAT_BOLD: u64 = 1;
const FORMAT_ITALIC: u64 = 1 << 1;
const FORMAT_STRIKETHROUGH: u64 = 1 << 2;
const FORMAT_UNDERLINE: u64 = 1 << 3;
const FORMAT_CODE: u64 = 1 << 4;
const FORMAT_SUBSCRIPT: u64 = 1 << 5;
const FORMAT_SUPERSCRIPT: u64 = 1 << 6;

/// A whole rich-text document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichText {
    pub root: Node,
}

/// One node of the tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: String,
    pub children: Vec<Node>,
    pub text: Option<String>,
    /// Bitmask on text nodes, alignment string on element nodes
    pub format: serde_json::Value,
    pub tag: Option<String>,
    pub list_type: Option<String>,
    pub checked: Option<bool>,
    pub url: Option<String>,
    pub fields: Option<serde_json::Value>,
    pub value: Option<serde_json::Value>,
}

impl Node {
    fn text_format(&self) -> u64 {
        self.format.as_u64().unwrap_or(0)
    }
}

impl RichText {
    /// Render the tree to HTML
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        render_node(&self.root, &mut out);
        out
    }
}

/// Render a rich-text document to HTML
pub fn render_html(doc: &RichText) -> String {
    doc.to_html()
}

fn render_children(node: &Node, out: &mut String) {
    for child in &node.children {
        render_node(child, out);
    }
}

fn wrap(tag: &str, node: &Node, out: &mut String) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    render_children(node, out);
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn render_node(node: &Node, out: &mut String) {
    match node.kind.as_str() {
        "text" => render_text(node, out),
        "paragraph" => wrap("p", node, out),
        "heading" => {
            let tag = match node.tag.as_deref() {
                Some(t @ ("h1" | "h2" | "h3" | "h4" | "h5" | "h6")) => t,
                _ => "h2",
            };
            wrap(tag, node, out);
        }
        "quote" => wrap("blockquote", node, out),
        "list" => match node.list_type.as_deref() {
            Some("number") => wrap("ol", node, out),
            Some("check") => {
                out.push_str(r#"<ul class="checklist">"#);
                render_children(node, out);
                out.push_str("</ul>");
            }
            _ => wrap("ul", node, out),
        },
        "listitem" => match node.checked {
            Some(checked) => {
                out.push_str(if checked {
                    r#"<li role="checkbox" aria-checked="true">"#
                } else {
                    r#"<li role="checkbox" aria-checked="false">"#
                });
                render_children(node, out);
                out.push_str("</li>");
            }
            None => wrap("li", node, out),
        },
        "link" | "autolink" => render_link(node, out),
        "linebreak" => out.push_str("<br>"),
        "tab" => out.push('\t'),
        "horizontalrule" => out.push_str("<hr>"),
        "code" => {
            out.push_str("<pre><code>");
            render_children(node, out);
            out.push_str("</code></pre>");
        }
        "upload" => render_upload(node, out),
        _ => render_children(node, out),
    }
}

fn render_text(node: &Node, out: &mut String) {
    let text = html_escape(node.text.as_deref().unwrap_or(""));
    let format = node.text_format();

    // Outermost first so the closing tags nest correctly
    let tags: Vec<&str> = [
        (FORMAT_BOLD, "strong"),
        (FORMAT_ITALIC, "em"),
        (FORMAT_STRIKETHROUGH, "s"),
        (FORMAT_UNDERLINE, "u"),
        (FORMAT_CODE, "code"),
        (FORMAT_SUBSCRIPT, "sub"),
        (FORMAT_SUPERSCRIPT, "sup"),
    ]
    .into_iter()
    .filter(|(bit, _)| format & bit != 0)
    .map(|(_, tag)| tag)
    .collect();

    for tag in &tags {
        out.push_str(&format!("<{}>", tag));
    }
    out.push_str(&text);
    for tag in tags.iter().rev() {
        out.push_str(&format!("</{}>", tag));
    }
}

fn render_link(node: &Node, out: &mut String) {
    let fields = node.fields.as_ref();
    let href = link_href(node).unwrap_or_else(|| "#".to_string());
    let new_tab = fields
        .and_then(|f| f.get("newTab"))
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    out.push_str(&format!(r#"<a href="{}""#, html_escape(&href)));
    if new_tab {
        out.push_str(r#" target="_blank" rel="noopener noreferrer""#);
    }
    out.push('>');
    render_children(node, out);
    out.push_str("</a>");
}

fn link_href(node: &Node) -> Option<String> {
    let fields = node.fields.as_ref();

    let internal = fields
        .and_then(|f| f.get("linkType"))
        .and_then(|v| v.as_str())
        == Some("internal");

    let href = if internal {
        fields
            .and_then(|f| f.pointer("/doc/value/slug"))
            .and_then(|v| v.as_str())
            .map(|slug| format!("/posts/{}", encode_path_segment(slug)))
    } else {
        fields
            .and_then(|f| f.get("url"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| node.url.clone())
    }?;

    if href.trim_start().to_ascii_lowercase().starts_with("javascript:") {
        None
    } else {
        Some(href)
    }
}

fn render_upload(node: &Node, out: &mut String) {
    let Some(value) = node.value.as_ref() else {
        return;
    };
    let Some(url) = value.get("url").and_then(|v| v.as_str()) else {
        return;
    };
    let alt = value.get("alt").and_then(|v| v.as_str()).unwrap_or("");
    out.push_str(&format!(
        r#"<figure><img src="{}" alt="{}" loading="lazy"></figure>"#,
        html_escape(url),
        html_escape(alt)
    ));
}
