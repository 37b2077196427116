//! Fragment markup reader and writer
//!
//! Server fragments are a forgiving HTML subset. The reader never fails:
//! unmatched close tags are dropped and unclosed elements are closed at end
//! of input. Whitespace-only text runs between tags are discarded.

use crate::node::{Element, Node};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Whether a tag never has children
#[inline]
#[must_use]
pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parse markup into top-level nodes
#[must_use]
pub fn parse(input: &str) -> Vec<Node> {
    Reader::new(input).run()
}

/// Render nodes back to markup
#[must_use]
pub fn render(nodes: &[Node]) -> String {
    let mut out = String::with_capacity(nodes.len() * 32);
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

/// Render a single element, including its own tag
#[must_use]
pub fn render_element(el: &Element) -> String {
    let mut out = String::new();
    write_element(el, &mut out);
    out
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
    // stack[0] is a synthetic container for top-level nodes
    stack: Vec<Element>,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            stack: vec![Element::new("#fragment")],
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn run(mut self) -> Vec<Node> {
        while self.pos < self.src.len() {
            let rest = self.rest();
            match rest.find('<') {
                Some(0) => self.markup(),
                Some(n) => {
                    self.push_text(&rest[..n]);
                    self.pos += n;
                }
                None => {
                    self.push_text(rest);
                    self.pos = self.src.len();
                }
            }
        }
        while self.stack.len() > 1 {
            self.close_top();
        }
        self.stack.pop().map(|root| root.children).unwrap_or_default()
    }

    fn push_text(&mut self, raw: &str) {
        if raw.trim().is_empty() {
            return;
        }
        let text = decode_entities(raw);
        if let Some(top) = self.stack.last_mut() {
            // merge with a preceding text run (e.g. after a stray '<')
            if let Some(Node::Text(prev)) = top.children.last_mut() {
                prev.push_str(&text);
            } else {
                top.children.push(Node::Text(text));
            }
        }
    }

    fn push_node(&mut self, node: Node) {
        if let Some(top) = self.stack.last_mut() {
            top.children.push(node);
        }
    }

    fn close_top(&mut self) {
        if let Some(done) = self.stack.pop() {
            self.push_node(Node::Element(done));
        }
    }

    fn skip_past(&mut self, terminator: &str) {
        match self.rest().find(terminator) {
            Some(n) => self.pos += n + terminator.len(),
            None => self.pos = self.src.len(),
        }
    }

    fn markup(&mut self) {
        let rest = self.rest();
        if rest.starts_with("<!--") {
            self.skip_past("-->");
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            self.skip_past(">");
        } else if let Some(after) = rest.strip_prefix("</") {
            let name_len = after
                .find(|c: char| c == '>' || c.is_whitespace())
                .unwrap_or(after.len());
            let name = after[..name_len].to_ascii_lowercase();
            self.skip_past(">");
            self.close_named(&name);
        } else if rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            self.open_tag();
        } else {
            // a lone '<' is literal text
            self.push_text("<");
            self.pos += 1;
        }
    }

    fn close_named(&mut self, name: &str) {
        let Some(depth) = self.stack.iter().rposition(|el| el.tag == name) else {
            return;
        };
        if depth == 0 {
            return;
        }
        while self.stack.len() > depth {
            self.close_top();
        }
    }

    fn open_tag(&mut self) {
        self.pos += 1;
        let name_len = self
            .rest()
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':'))
            .unwrap_or(self.rest().len());
        let mut el = Element::new(&self.rest()[..name_len]);
        self.pos += name_len;

        let self_closing = self.read_attrs(&mut el);

        if RAW_TEXT_ELEMENTS.contains(&el.tag.as_str()) && !self_closing {
            let close = format!("</{}", el.tag);
            let rest = self.rest();
            let end = find_ascii_case_insensitive(rest, &close).unwrap_or(rest.len());
            if !rest[..end].is_empty() {
                el.children.push(Node::Text(rest[..end].to_string()));
            }
            self.pos += end;
            self.skip_past(">");
            self.push_node(Node::Element(el));
        } else if self_closing || is_void(&el.tag) {
            self.push_node(Node::Element(el));
        } else {
            self.stack.push(el);
        }
    }

    /// Reads attributes up to and including the closing `>`.
    /// Returns true for `/>`.
    fn read_attrs(&mut self, el: &mut Element) -> bool {
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return false;
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                return true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return false;
            }
            let name_len = rest
                .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
                .unwrap_or(rest.len());
            if name_len == 0 {
                // stray '/' or '='
                self.pos += rest.chars().next().map_or(1, char::len_utf8);
                continue;
            }
            let name = rest[..name_len].to_ascii_lowercase();
            self.pos += name_len;
            self.skip_whitespace();
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.read_attr_value()
            } else {
                String::new()
            };
            el.attrs.entry(name).or_insert(value);
        }
    }

    fn read_attr_value(&mut self) -> String {
        let rest = self.rest();
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &rest[1..];
                let end = body.find(quote).unwrap_or(body.len());
                let value = decode_entities(&body[..end]);
                self.pos += 1 + end + usize::from(end < body.len());
                value
            }
            Some(_) => {
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                self.pos += end;
                decode_entities(&rest[..end])
            }
            None => String::new(),
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// Decode the entities the server emits
#[must_use]
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            ch.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn escape_into(value: &str, attr: bool, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(t) => escape_into(t, false, out),
        Node::Element(el) => write_element(el, out),
    }
}

fn write_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.tag);
    for (key, value) in &el.attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        escape_into(value, true, out);
        out.push('"');
    }
    out.push('>');
    if is_void(&el.tag) {
        return;
    }
    if RAW_TEXT_ELEMENTS.contains(&el.tag.as_str()) {
        for child in &el.children {
            if let Node::Text(t) = child {
                out.push_str(t);
            }
        }
    } else {
        for child in &el.children {
            write_node(child, out);
        }
    }
    out.push_str("</");
    out.push_str(&el.tag);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn text_node() -> impl Strategy<Value = Node> {
        "[a-zA-Z0-9&<>;#' ]{1,12}"
            .prop_filter("whitespace-only runs are dropped", |t| !t.trim().is_empty())
            .prop_map(Node::Text)
    }

    fn tree() -> impl Strategy<Value = Node> {
        text_node().prop_recursive(3, 24, 4, |inner| {
            (
                prop::sample::select(vec!["div", "span", "p", "b", "ul", "li", "textarea"]),
                prop::collection::vec(
                    (
                        prop::sample::select(vec!["id", "class", "data-val", "title"]),
                        "[a-zA-Z0-9 &<>\"'=/]{0,8}",
                    ),
                    0..3,
                ),
                prop::collection::vec(inner, 0..4),
            )
                .prop_map(|(tag, attrs, children)| {
                    let mut el = Element::new(tag);
                    for (key, value) in attrs {
                        el.set_attr(key, value);
                    }
                    el.children = children;
                    Node::Element(el)
                })
        })
    }

    proptest! {
        #[test]
        fn prop_rendered_markup_reads_back_unchanged(nodes in prop::collection::vec(tree(), 1..4)) {
            let html = render(&nodes);
            prop_assert_eq!(render(&parse(&html)), html);
        }
    }

    fn first_element(nodes: &[Node]) -> &Element {
        nodes.iter().find_map(Node::as_element).unwrap()
    }

    #[test]
    fn parses_nested_elements_and_attributes() {
        let nodes = parse(
            r#"<div id="x" class='a b' data-val=10 hidden><span>Name: <b>Acme</b></span></div>"#,
        );
        let div = first_element(&nodes);
        assert_eq!(div.id(), Some("x"));
        assert!(div.has_class("b"));
        assert_eq!(div.attr("data-val"), Some("10"));
        assert_eq!(div.attr("hidden"), Some(""));
        assert_eq!(div.text_content(), "Name: Acme");
    }

    #[test]
    fn void_and_self_closing_elements_have_no_children() {
        let nodes = parse(r#"<label>Name:<input type="text" name="name"><br/>after</label>"#);
        let label = first_element(&nodes);
        let tags: Vec<&str> = label.child_elements().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["input", "br"]);
        assert_eq!(label.text_content(), "Name:after");
    }

    #[test]
    fn tolerates_unmatched_and_unclosed_tags() {
        let nodes = parse("<div><p>one</span></div><ul><li>two");
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].text_content(), "one");
        assert_eq!(nodes[1].text_content(), "two");
    }

    #[test]
    fn skips_comments_and_doctype() {
        let nodes = parse("<!DOCTYPE html><!-- note --><p>x</p>");
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt; &#65;&#x42; &bogus;"), "a & b <c> AB &bogus;");
    }

    #[test]
    fn renders_escaped_markup() {
        let el = Element::new("p").with_attr("title", "say \"hi\"").with_text("1 < 2 & 3");
        assert_eq!(
            render_element(&el),
            r#"<p title="say &quot;hi&quot;">1 &lt; 2 &amp; 3</p>"#
        );
    }

    #[test]
    fn script_content_is_raw() {
        let nodes = parse("<script>if (a < b) {}</script><p>x</p>");
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].text_content(), "if (a < b) {}");
    }
}
