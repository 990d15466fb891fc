//! Just enough HTML to load first-party fragments into a [`MemoryDom`].
//!
//! This is not a conforming HTML parser. It understands elements, quoted and
//! bare attributes, void elements, comments, doctypes and raw-text elements,
//! and it recovers from stray closing tags by ignoring them. Fragments are
//! trusted markup we ship ourselves.

use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_text};

use super::memory::NodeKind;
use super::{Dom, MemoryDom, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Parse `html` and append the result under `parent`.
pub fn parse_fragment(dom: &mut MemoryDom, parent: NodeId, html: &str) {
    let mut open: Vec<NodeId> = vec![parent];
    let mut rest = html;

    while !rest.is_empty() {
        let current = open.last().copied().unwrap_or(parent);

        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map_or("", |end| &after[end + 3..]);
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            rest = rest.find('>').map_or("", |end| &rest[end + 1..]);
        } else if let Some(after) = rest.strip_prefix("</") {
            let end = after.find('>').unwrap_or(after.len());
            let name = after[..end].trim().to_ascii_lowercase();
            // index 0 is the fragment parent, never closed by the fragment
            if let Some(pos) = open.iter().rposition(|n| dom.tag(*n) == name)
                && pos > 0
            {
                open.truncate(pos);
            }
            rest = after.get(end + 1..).unwrap_or("");
        } else if starts_element(rest) {
            let tag = parse_start_tag(&rest[1..]);
            let node = dom.push_element(current, &tag.name, tag.attributes);
            rest = tag.rest;

            if RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) && !tag.self_closing {
                let closing = format!("</{}", tag.name);
                let end = find_ascii_case_insensitive(rest, &closing).unwrap_or(rest.len());
                if end > 0 {
                    dom.push_text(node, &rest[..end]);
                }
                rest = &rest[end..];
            } else if !tag.self_closing && !VOID_ELEMENTS.contains(&tag.name.as_str()) {
                open.push(node);
            }
        } else {
            let end = rest
                .char_indices()
                .skip(1)
                .find(|(_, c)| *c == '<')
                .map_or(rest.len(), |(i, _)| i);
            dom.push_text(current, &decode_html_entities(&rest[..end]));
            rest = &rest[end..];
        }
    }
}

/// Serialize the children of `node` back to markup.
pub fn serialize_children(dom: &MemoryDom, node: NodeId) -> String {
    let mut out = String::new();
    let raw = RAW_TEXT_ELEMENTS.contains(&dom.tag(node).as_str());
    for child in dom.children(node) {
        write_node(dom, *child, raw, &mut out);
    }
    out
}

fn write_node(dom: &MemoryDom, node: NodeId, raw_text: bool, out: &mut String) {
    match dom.kind(node) {
        NodeKind::Text(text) if raw_text => out.push_str(text),
        NodeKind::Text(text) => out.push_str(&encode_text(text)),
        NodeKind::Document => out.push_str(&serialize_children(dom, node)),
        NodeKind::Element { tag, attributes } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attributes {
                out.push(' ');
                out.push_str(name);
                if !value.is_empty() {
                    out.push_str("=\"");
                    out.push_str(&encode_double_quoted_attribute(value));
                    out.push('"');
                }
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            out.push_str(&serialize_children(dom, node));
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

struct StartTag<'a> {
    name: String,
    attributes: Vec<(String, String)>,
    self_closing: bool,
    rest: &'a str,
}

fn starts_element(s: &str) -> bool {
    s.starts_with('<') && s[1..].starts_with(|c: char| c.is_ascii_alphabetic())
}

fn parse_start_tag(s: &str) -> StartTag<'_> {
    let name_end = s
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(s.len());
    let name = s[..name_end].to_ascii_lowercase();
    let mut rest = &s[name_end..];
    let mut attributes = Vec::new();
    let mut self_closing = false;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        if let Some(after) = rest.strip_prefix("/>") {
            self_closing = true;
            rest = after;
            break;
        }
        if let Some(after) = rest.strip_prefix('>') {
            rest = after;
            break;
        }
        if let Some(after) = rest.strip_prefix('/') {
            rest = after;
            continue;
        }

        let attr_end = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
            .unwrap_or(rest.len());
        let attr = rest[..attr_end].to_ascii_lowercase();
        rest = rest[attr_end..].trim_start();

        let mut value = String::new();
        if let Some(after) = rest.strip_prefix('=') {
            let after = after.trim_start();
            match after.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let body = &after[1..];
                    let end = body.find(quote).unwrap_or(body.len());
                    value = decode_html_entities(&body[..end]).into_owned();
                    rest = body.get(end + 1..).unwrap_or("");
                }
                _ => {
                    let end = after
                        .find(|c: char| c.is_whitespace() || c == '>')
                        .unwrap_or(after.len());
                    value = decode_html_entities(&after[..end]).into_owned();
                    rest = &after[end..];
                }
            }
        }

        if !attr.is_empty() && !attributes.iter().any(|(k, _)| *k == attr) {
            attributes.push((attr, value));
        }
    }

    StartTag {
        name,
        attributes,
        self_closing,
        rest,
    }
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fragment_shape() {
        let dom = MemoryDom::parse(
            r#"<!-- site header -->
<header class="header">
  <a href="/" class="logo">Golden Ticket</a>
  <button class="nav-toggle" aria-expanded="false" aria-label="Menu"></button>
  <ul class="nav-list"><li><a href="/about/">About</a></li></ul>
</header>"#,
        );
        let root = dom.root();
        let header = dom.first_with_class(root, "header").unwrap();
        let toggle = dom.first_with_class(root, "nav-toggle").unwrap();
        let list = dom.first_with_class(root, "nav-list").unwrap();

        assert!(dom.contains(header, toggle));
        assert!(dom.contains(header, list));
        assert_eq!(dom.attribute(toggle, "aria-expanded").as_deref(), Some("false"));
    }

    #[test]
    fn test_void_and_boolean_attributes() {
        let dom = MemoryDom::parse(
            r#"<div class="form-group"><input type="email" name="email" required><span class="form-error"></span></div>"#,
        );
        let root = dom.root();
        let input = dom.first_with_tag(root, "input").unwrap();
        let error = dom.first_with_class(root, "form-error").unwrap();

        assert!(dom.has_attribute(input, "required"));
        assert_eq!(dom.parent(error), dom.parent(input));
    }

    #[test]
    fn test_stray_closing_tag_is_ignored() {
        let dom = MemoryDom::parse("<p>one</span> two</p><p>three</p>");
        let paragraphs: Vec<_> = dom
            .descendants(dom.root())
            .into_iter()
            .filter(|n| dom.tag(*n) == "p")
            .collect();
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(dom.text(paragraphs[0]), "one two");
    }

    #[test]
    fn test_serialize_escapes_text_but_not_scripts() {
        let dom = MemoryDom::parse(r#"<p title="a &quot;b&quot;">1 &lt; 2</p><script>if (a < b) {}</script>"#);
        assert_eq!(
            dom.to_html(),
            r#"<p title="a &quot;b&quot;">1 &lt; 2</p><script>if (a < b) {}</script>"#
        );
    }

    #[test]
    fn test_named_and_numeric_entities_survive_a_round_trip() {
        let dom = MemoryDom::parse(
            r#"<footer id="f" title="Caf&eacute; &amp; Co">&copy; 2024 &#8212; Golden &#x2665; Ticket</footer>"#,
        );
        let footer = dom.by_id("f").unwrap();

        assert_eq!(dom.text(footer), "© 2024 — Golden ♥ Ticket");
        assert_eq!(dom.attribute(footer, "title").as_deref(), Some("Café & Co"));
        assert_eq!(
            dom.to_html(),
            r#"<footer id="f" title="Café &amp; Co">© 2024 — Golden ♥ Ticket</footer>"#
        );
    }
}
