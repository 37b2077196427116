//! Documents and fragments
//!
//! A [`Document`] is the whole page the controller owns; a [`Fragment`] is
//! whatever markup a single server response carried.

use crate::error::ViewError;
use crate::markup;
use crate::node::{Element, Node};
use crate::selector::Selector;

/// Markup returned by one server response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragment {
    nodes: Vec<Node>,
}

impl Fragment {
    /// Parse fragment markup
    #[must_use]
    pub fn parse(html: &str) -> Self {
        Self {
            nodes: markup::parse(html),
        }
    }

    /// Wrap existing nodes
    #[inline]
    #[must_use]
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Top-level nodes
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Consume into top-level nodes
    #[inline]
    #[must_use]
    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    /// Top-level elements
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.nodes.iter().filter_map(Node::as_element)
    }

    /// No element and no visible text
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.nodes.iter().all(|n| match n {
            Node::Text(t) => t.trim().is_empty(),
            Node::Element(_) => false,
        })
    }

    /// Whether any element of the fragment carries `class`
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.elements()
            .any(|el| el.has_class(class) || el.descendants().any(|d| d.has_class(class)))
    }

    /// Children of the single wrapping element, or the nodes unchanged when
    /// the fragment is not wrapped
    #[must_use]
    pub fn into_unwrapped(self) -> Vec<Node> {
        let mut elements = self.nodes.iter().filter(|n| n.as_element().is_some());
        let wrapped = elements.next().is_some()
            && elements.next().is_none()
            && self
                .nodes
                .iter()
                .all(|n| !matches!(n, Node::Text(t) if !t.trim().is_empty()));
        if !wrapped {
            return self.nodes;
        }
        self.nodes
            .into_iter()
            .find_map(|n| match n {
                Node::Element(el) => Some(el.children),
                Node::Text(_) => None,
            })
            .unwrap_or_default()
    }

    /// Render back to markup
    #[must_use]
    pub fn to_html(&self) -> String {
        markup::render(&self.nodes)
    }
}

/// The page tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Create from root element
    #[inline]
    #[must_use]
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Parse a full page; multiple top-level nodes are wrapped in `<body>`
    #[must_use]
    pub fn parse(html: &str) -> Self {
        let mut nodes = markup::parse(html);
        if nodes.len() == 1 {
            if let Some(Node::Element(root)) = nodes.pop() {
                return Self { root };
            }
        }
        let mut body = Element::new("body");
        body.children = nodes;
        Self { root: body }
    }

    /// Root element
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Root element, mutably
    #[inline]
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Whether an element with this id exists
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.root.find_by_id(id).is_some()
    }

    /// Element by id
    ///
    /// # Errors
    /// `ViewError::NotFound` when absent
    pub fn get(&self, id: &str) -> Result<&Element, ViewError> {
        self.root
            .find_by_id(id)
            .ok_or_else(|| ViewError::NotFound(id.to_string()))
    }

    /// Element by id, mutably
    ///
    /// # Errors
    /// `ViewError::NotFound` when absent
    pub fn get_mut(&mut self, id: &str) -> Result<&mut Element, ViewError> {
        self.root
            .find_by_id_mut(id)
            .ok_or_else(|| ViewError::NotFound(id.to_string()))
    }

    /// Replace every child of `id`
    ///
    /// # Errors
    /// `ViewError::NotFound` when absent
    pub fn replace_children(&mut self, id: &str, nodes: Vec<Node>) -> Result<(), ViewError> {
        self.get_mut(id)?.children = nodes;
        Ok(())
    }

    /// Insert nodes before the existing children of `id`
    ///
    /// # Errors
    /// `ViewError::NotFound` when absent
    pub fn prepend_children(&mut self, id: &str, nodes: Vec<Node>) -> Result<(), ViewError> {
        let el = self.get_mut(id)?;
        let existing = std::mem::take(&mut el.children);
        el.children = nodes;
        el.children.extend(existing);
        Ok(())
    }

    /// Append nodes after the existing children of `id`
    ///
    /// # Errors
    /// `ViewError::NotFound` when absent
    pub fn append_children(&mut self, id: &str, nodes: Vec<Node>) -> Result<(), ViewError> {
        self.get_mut(id)?.children.extend(nodes);
        Ok(())
    }

    /// Detach the element with this id
    ///
    /// # Errors
    /// `ViewError::NotFound` when absent, or when `id` names the root
    pub fn remove(&mut self, id: &str) -> Result<Element, ViewError> {
        self.root
            .remove_where(&|el: &Element| el.id() == Some(id))
            .ok_or_else(|| ViewError::NotFound(id.to_string()))
    }

    /// Put `nodes` where the element with this id is
    ///
    /// # Errors
    /// `ViewError::NotFound` when absent, or when `id` names the root
    pub fn replace_with(&mut self, id: &str, nodes: Vec<Node>) -> Result<(), ViewError> {
        self.root
            .replace_where(&|el: &Element| el.id() == Some(id), nodes)
            .map_err(|_| ViewError::NotFound(id.to_string()))
    }

    /// First element matching selector (root included)
    #[must_use]
    pub fn select_first(&self, selector: &Selector) -> Option<&Element> {
        if selector.matches(&self.root) {
            return Some(&self.root);
        }
        self.root.select_first(selector)
    }

    /// All elements matching selector (root included)
    #[must_use]
    pub fn select_all(&self, selector: &Selector) -> Vec<&Element> {
        let mut found = Vec::new();
        if selector.matches(&self.root) {
            found.push(&self.root);
        }
        found.extend(self.root.select_all(selector));
        found
    }

    /// Markup of the children of `id`
    ///
    /// # Errors
    /// `ViewError::NotFound` when absent
    pub fn inner_html(&self, id: &str) -> Result<String, ViewError> {
        Ok(markup::render(&self.get(id)?.children))
    }

    /// Markup of the whole page
    #[must_use]
    pub fn to_html(&self) -> String {
        markup::render_element(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page() -> Document {
        Document::parse(r#"<body><div id="results"><p>old</p></div><ul id="list"><li>b</li></ul></body>"#)
    }

    #[test]
    fn replace_prepend_append() {
        let mut doc = page();
        doc.replace_children("results", Fragment::parse("<p>new</p>").into_nodes())
            .unwrap();
        assert_eq!(doc.inner_html("results").unwrap(), "<p>new</p>");

        doc.prepend_children("list", Fragment::parse("<li>a</li>").into_nodes())
            .unwrap();
        doc.append_children("list", Fragment::parse("<li>c</li>").into_nodes())
            .unwrap();
        assert_eq!(doc.get("list").unwrap().text_content(), "abc");
    }

    #[test]
    fn missing_region_is_not_found() {
        let mut doc = page();
        assert_eq!(
            doc.replace_children("nope", Vec::new()),
            Err(ViewError::NotFound("nope".into()))
        );
        assert!(doc.remove("nope").is_err());
    }

    #[test]
    fn remove_detaches_element() {
        let mut doc = page();
        let removed = doc.remove("list").unwrap();
        assert_eq!(removed.tag, "ul");
        assert!(!doc.contains("list"));
    }

    #[test]
    fn replace_with_swaps_element_in_place() {
        let mut doc = page();
        doc.replace_with("list", Fragment::parse(r#"<ol id="list2"></ol><hr>"#).into_nodes())
            .unwrap();
        assert!(!doc.contains("list"));
        assert_eq!(
            doc.to_html(),
            r#"<body><div id="results"><p>old</p></div><ol id="list2"></ol><hr></body>"#
        );
        assert!(doc.replace_with("list", Vec::new()).is_err());
    }

    #[test]
    fn unwrap_strips_single_wrapper_only() {
        let wrapped = Fragment::parse(r#"<div class="wrap"><span>a</span><span>b</span></div>"#);
        assert_eq!(wrapped.into_unwrapped().len(), 2);

        let flat = Fragment::parse("<span>a</span><span>b</span>");
        assert_eq!(flat.into_unwrapped().len(), 2);

        let mixed = Fragment::parse("<span>a</span> tail");
        assert_eq!(mixed.into_unwrapped().len(), 2);
    }

    #[test]
    fn blank_and_marker_detection() {
        assert!(Fragment::parse("   ").is_blank());
        assert!(!Fragment::parse("<p></p>").is_blank());
        assert!(Fragment::parse(r#"<div><span class="server-error">x</span></div>"#)
            .has_class("server-error"));
    }
}
