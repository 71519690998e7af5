//! Markdown rendering with syntax highlighting

use anyhow::{anyhow, Result};
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::helpers::html_escape;

const DEFAULT_THEME: &str = "base16-ocean.dark";

/// Markdown renderer for post bodies.
///
/// Output is injected into pages as-is; the renderer is the trust boundary
/// for markdown content.
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme: Theme,
    line_numbers: bool,
}

/// Fenced or indented code collected between start and end events
struct CodeBlock {
    lang: Option<String>,
    source: String,
}

impl MarkdownRenderer {
    /// Create a renderer with the default highlight theme
    pub fn new() -> Result<Self> {
        Self::with_options(DEFAULT_THEME, false)
    }

    /// Create a renderer with a named syntect theme
    pub fn with_options(theme_name: &str, line_numbers: bool) -> Result<Self> {
        let mut themes = ThemeSet::load_defaults().themes;
        let theme = match themes.remove(theme_name) {
            Some(theme) => theme,
            None => {
                tracing::warn!(
                    "Unknown highlight theme {:?}, falling back to {}",
                    theme_name,
                    DEFAULT_THEME
                );
                themes
                    .remove(DEFAULT_THEME)
                    .ok_or_else(|| anyhow!("No highlight themes available"))?
            }
        };

        Ok(Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
            line_numbers,
        })
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> String {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_SMART_PUNCTUATION
            | Options::ENABLE_HEADING_ATTRIBUTES
            | Options::ENABLE_GFM;

        let mut events: Vec<Event> = Vec::new();
        let mut code: Option<CodeBlock> = None;

        for event in Parser::new_ext(markdown, options) {
            if let Some(block) = code.as_mut() {
                match event {
                    Event::Text(text) => block.source.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        let highlighted = self.highlight_code(&block.source, block.lang.as_deref());
                        events.push(Event::Html(CowStr::from(highlighted)));
                        code = None;
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(str::to_string),
                        CodeBlockKind::Indented => None,
                    };
                    code = Some(CodeBlock {
                        lang,
                        source: String::new(),
                    });
                }
                event => events.push(event),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");

        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        match highlighted_html_for_string(code, &self.syntax_set, syntax, &self.theme) {
            Ok(highlighted) if self.line_numbers => self.add_line_numbers(&highlighted, lang),
            Ok(highlighted) => format!(
                r#"<figure class="highlight {}">{}</figure>"#,
                html_escape(lang),
                highlighted
            ),
            Err(e) => {
                tracing::debug!("Highlighting failed for {}: {}", lang, e);
                format!(
                    r#"<pre><code class="language-{}">{}</code></pre>"#,
                    html_escape(lang),
                    html_escape(code)
                )
            }
        }
    }

    /// Add a line-number gutter to highlighted code
    fn add_line_numbers(&self, code: &str, lang: &str) -> String {
        let lines: Vec<&str> = code.lines().collect();

        let gutter = (1..=lines.len())
            .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"<figure class="highlight {}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code">{}</td></tr></table></figure>"#,
            html_escape(lang),
            gutter,
            lines.join("\n")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic_markdown() {
        let renderer = MarkdownRenderer::new().unwrap();
        let html = renderer.render("# Hello World\n\nThis is a test.");
        assert!(html.contains("<h1>Hello World</h1>"));
        assert!(html.contains("<p>This is a test.</p>"));
    }

    #[test]
    fn test_render_code_block() {
        let renderer = MarkdownRenderer::new().unwrap();
        let html = renderer.render("```rust\nfn main() {}\n```");
        assert!(html.contains("highlight rust"));
        assert!(!html.contains("```"));
    }

    #[test]
    fn test_line_numbers() {
        let renderer = MarkdownRenderer::with_options(DEFAULT_THEME, true).unwrap();
        let html = renderer.render("```rust\nlet a = 1;\nlet b = 2;\n```");
        assert!(html.contains(r#"<span class="line-number">1</span>"#));
        assert!(html.contains(r#"<span class="line-number">2</span>"#));
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        assert!(MarkdownRenderer::with_options("no-such-theme", false).is_ok());
    }

    #[test]
    fn test_text_after_code_block_is_kept() {
        let renderer = MarkdownRenderer::new().unwrap();
        let html = renderer.render("```\ncode\n```\n\nAfter the block.");
        assert!(html.contains("<p>After the block.</p>"));
    }
}
