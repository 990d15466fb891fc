use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

// Initialize syntax highlighting resources once
static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

pub const DEFAULT_SYNTAX_THEME: &str = "base16-ocean.dark";

/// Render markdown to HTML, highlighting fenced code blocks.
pub fn render_markdown(source: &str, syntax_theme: &str) -> String {
    let parser = Parser::new_ext(source, Options::all());
    let mut events = Vec::new();
    let mut code: Option<(String, String)> = None;

    for event in parser {
        // Collect a fenced block's text until it ends, then emit it highlighted
        if let Some((lang, buf)) = code.as_mut() {
            match event {
                Event::Text(text) => buf.push_str(&text),
                Event::End(TagEnd::CodeBlock) => {
                    let highlighted = highlight(lang, buf, syntax_theme);
                    events.push(Event::Html(highlighted.into()));
                    code = None;
                }
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => {
                code = Some((lang.to_string(), String::new()));
            }
            other => events.push(other),
        }
    }

    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    out
}

fn highlight(lang: &str, code: &str, theme: &str) -> String {
    let plain = || format!("<pre><code>{}</code></pre>", html_escape::encode_text(code));

    let syntax = SYNTAX_SET.find_syntax_by_token(lang).or_else(|| match lang {
        // TOML reads close enough to YAML for highlighting
        "toml" => SYNTAX_SET.find_syntax_by_name("YAML"),
        _ => None,
    });
    let theme = THEME_SET
        .themes
        .get(theme)
        .or_else(|| THEME_SET.themes.get(DEFAULT_SYNTAX_THEME));

    match (syntax, theme) {
        (Some(syntax), Some(theme)) => {
            highlighted_html_for_string(code, &SYNTAX_SET, syntax, theme).unwrap_or_else(|_| plain())
        }
        _ => plain(),
    }
}

/// Text of the first level-one heading, used when a page has no title.
pub fn first_heading(source: &str) -> Option<String> {
    let mut in_heading = false;
    let mut text = String::new();

    for event in Parser::new_ext(source, Options::all()) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => in_heading = true,
            Event::End(TagEnd::Heading(HeadingLevel::H1)) if in_heading => {
                return Some(text.trim().to_string());
            }
            Event::Text(t) | Event::Code(t) if in_heading => text.push_str(&t),
            _ => {}
        }
    }

    None
}
