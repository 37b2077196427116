//! View tree nodes
//!
//! The console never touches a real browser DOM. Every region the controller
//! renders is an [`Element`] tree: tag, ordered attributes, children.

use crate::selector::Selector;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A node in the view tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    /// Element with attributes and children
    Element(Element),
    /// Character data
    Text(String),
}

impl Node {
    /// Create text node
    #[inline]
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Borrow as element
    #[inline]
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    /// Mutably borrow as element
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    /// Concatenated text content
    #[must_use]
    pub fn text_content(&self) -> String {
        match self {
            Node::Element(el) => el.text_content(),
            Node::Text(t) => t.clone(),
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

/// An element of the view tree
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Element {
    /// Lower-cased tag name
    pub tag: String,
    /// Attributes in source order
    pub attrs: IndexMap<String, String>,
    /// Child nodes
    pub children: Vec<Node>,
}

impl Element {
    /// Create empty element
    #[inline]
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// With attribute
    #[inline]
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// With id attribute
    #[inline]
    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.with_attr("id", id)
    }

    /// With class (appended to existing classes)
    #[inline]
    #[must_use]
    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    /// With child node
    #[inline]
    #[must_use]
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// With text child
    #[inline]
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Element id, if any
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Attribute value
    #[inline]
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Set attribute, returning previous value
    #[inline]
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.attrs.insert(key.into(), value.into())
    }

    /// Remove attribute
    #[inline]
    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        self.attrs.shift_remove(key)
    }

    /// Whether the attribute is present (any value)
    #[inline]
    #[must_use]
    pub fn has_attr(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }

    /// Iterate class names
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }

    /// Check class membership
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Add class if missing
    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let joined = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr("class", joined);
    }

    /// Remove class if present
    pub fn remove_class(&mut self, class: &str) {
        if !self.has_class(class) {
            return;
        }
        let joined: Vec<&str> = self.classes().filter(|c| *c != class).collect();
        let joined = joined.join(" ");
        self.set_attr("class", joined);
    }

    /// Child elements (text skipped)
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Concatenated text of all descendants
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Replace all children with a single text node
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }

    /// Pre-order iterator over descendant elements (self excluded)
    #[must_use]
    pub fn descendants(&self) -> Descendants<'_> {
        let mut stack: Vec<&Element> = self.child_elements().collect();
        stack.reverse();
        Descendants { stack }
    }

    /// Whether this element matches a selector
    #[must_use]
    pub fn matches(&self, selector: &Selector) -> bool {
        selector.matches(self)
    }

    /// First descendant matching selector
    #[must_use]
    pub fn select_first(&self, selector: &Selector) -> Option<&Element> {
        self.descendants().find(|el| selector.matches(el))
    }

    /// All descendants matching selector, document order
    #[must_use]
    pub fn select_all(&self, selector: &Selector) -> Vec<&Element> {
        self.descendants().filter(|el| selector.matches(el)).collect()
    }

    /// Find self or descendant by id
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.id() == Some(id) {
            return Some(self);
        }
        self.descendants().find(|el| el.id() == Some(id))
    }

    /// Chain of elements from self down to the element with `id`, both ends
    /// included
    #[must_use]
    pub fn path_to(&self, id: &str) -> Option<Vec<&Element>> {
        if self.id() == Some(id) {
            return Some(vec![self]);
        }
        self.child_elements().find_map(|child| {
            child.path_to(id).map(|mut tail| {
                tail.insert(0, self);
                tail
            })
        })
    }

    /// Ids of self and every descendant
    #[must_use]
    pub fn ids(&self) -> std::collections::HashSet<String> {
        self.id()
            .into_iter()
            .chain(self.descendants().filter_map(Element::id))
            .map(str::to_string)
            .collect()
    }

    /// Find self or descendant by id, mutably
    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.find_mut(&|el: &Element| el.id() == Some(id))
    }

    /// First element (self included) satisfying the predicate, mutably
    pub fn find_mut(&mut self, pred: &dyn Fn(&Element) -> bool) -> Option<&mut Element> {
        if pred(self) {
            return Some(self);
        }
        for child in &mut self.children {
            if let Node::Element(el) = child {
                if let Some(found) = el.find_mut(pred) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Apply `f` to every descendant element (self excluded) matching `pred`
    pub fn for_each_mut(&mut self, pred: &dyn Fn(&Element) -> bool, f: &mut dyn FnMut(&mut Element)) {
        for child in &mut self.children {
            if let Node::Element(el) = child {
                if pred(el) {
                    f(el);
                }
                el.for_each_mut(pred, f);
            }
        }
    }

    /// Remove the first descendant element satisfying `pred`
    pub fn remove_where(&mut self, pred: &dyn Fn(&Element) -> bool) -> Option<Element> {
        if let Some(idx) = self
            .children
            .iter()
            .position(|n| n.as_element().is_some_and(|el| pred(el)))
        {
            return match self.children.remove(idx) {
                Node::Element(el) => Some(el),
                Node::Text(_) => None,
            };
        }
        for child in &mut self.children {
            if let Node::Element(el) = child {
                if let Some(removed) = el.remove_where(pred) {
                    return Some(removed);
                }
            }
        }
        None
    }

    /// Replace the first descendant element satisfying `pred` with `nodes`
    pub fn replace_where(&mut self, pred: &dyn Fn(&Element) -> bool, nodes: Vec<Node>) -> Result<(), Vec<Node>> {
        if let Some(idx) = self
            .children
            .iter()
            .position(|n| n.as_element().is_some_and(|el| pred(el)))
        {
            self.children.splice(idx..=idx, nodes);
            return Ok(());
        }
        let mut nodes = nodes;
        for child in &mut self.children {
            if let Node::Element(el) = child {
                match el.replace_where(pred, nodes) {
                    Ok(()) => return Ok(()),
                    Err(back) => nodes = back,
                }
            }
        }
        Err(nodes)
    }

    /// Remove every descendant element satisfying `pred`, returning how many
    pub fn remove_all_where(&mut self, pred: &dyn Fn(&Element) -> bool) -> usize {
        let before = self.children.len();
        self.children
            .retain(|n| !n.as_element().is_some_and(|el| pred(el)));
        let mut removed = before - self.children.len();
        for child in &mut self.children {
            if let Node::Element(el) = child {
                removed += el.remove_all_where(pred);
            }
        }
        removed
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Element(el) => collect_text(&el.children, out),
        }
    }
}

/// Pre-order descendant iterator
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        let before = self.stack.len();
        self.stack.extend(next.child_elements());
        self.stack[before..].reverse();
        Some(next)
    }
}
