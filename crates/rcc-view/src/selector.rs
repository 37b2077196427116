//! Minimal selectors
//!
//! Only the forms the server markup actually uses: `#id`, `.class`, `tag`,
//! and `tag.class`.

use crate::error::ViewError;
use crate::node::Element;
use std::fmt;
use std::str::FromStr;

/// Parsed selector
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// `#id`
    Id(String),
    /// `.class`
    Class(String),
    /// `tag`
    Tag(String),
    /// `tag.class`
    TagClass(String, String),
}

impl Selector {
    /// Parse selector text
    ///
    /// # Errors
    /// `ViewError::InvalidSelector` on empty input or unsupported syntax
    pub fn parse(input: &str) -> Result<Self, ViewError> {
        let input = input.trim();
        let invalid = || ViewError::InvalidSelector(input.to_string());
        if input.is_empty() || input.contains(char::is_whitespace) {
            return Err(invalid());
        }
        if let Some(id) = input.strip_prefix('#') {
            if id.is_empty() {
                return Err(invalid());
            }
            return Ok(Selector::Id(id.to_string()));
        }
        if let Some(class) = input.strip_prefix('.') {
            if class.is_empty() || class.contains('.') {
                return Err(invalid());
            }
            return Ok(Selector::Class(class.to_string()));
        }
        match input.split_once('.') {
            Some((tag, class)) if !tag.is_empty() && !class.is_empty() => Ok(Selector::TagClass(
                tag.to_ascii_lowercase(),
                class.to_string(),
            )),
            Some(_) => Err(invalid()),
            None => Ok(Selector::Tag(input.to_ascii_lowercase())),
        }
    }

    /// Selector for an element id
    #[inline]
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Selector::Id(id.into())
    }

    /// Selector for a class
    #[inline]
    #[must_use]
    pub fn class(class: impl Into<String>) -> Self {
        Selector::Class(class.into())
    }

    /// Test an element
    #[must_use]
    pub fn matches(&self, el: &Element) -> bool {
        match self {
            Selector::Id(id) => el.id() == Some(id.as_str()),
            Selector::Class(class) => el.has_class(class),
            Selector::Tag(tag) => el.tag == *tag,
            Selector::TagClass(tag, class) => el.tag == *tag && el.has_class(class),
        }
    }

    /// Target id when this is an id selector
    #[inline]
    #[must_use]
    pub fn as_id(&self) -> Option<&str> {
        match self {
            Selector::Id(id) => Some(id),
            _ => None,
        }
    }
}

impl FromStr for Selector {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Id(id) => write!(f, "#{id}"),
            Selector::Class(class) => write!(f, ".{class}"),
            Selector::Tag(tag) => write!(f, "{tag}"),
            Selector::TagClass(tag, class) => write!(f, "{tag}.{class}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_forms() {
        assert_eq!(Selector::parse("#results").unwrap(), Selector::Id("results".into()));
        assert_eq!(Selector::parse(".tab").unwrap(), Selector::Class("tab".into()));
        assert_eq!(Selector::parse("FORM").unwrap(), Selector::Tag("form".into()));
        assert_eq!(
            Selector::parse("form.association").unwrap(),
            Selector::TagClass("form".into(), "association".into())
        );
    }

    #[test]
    fn rejects_unsupported_forms() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("#").is_err());
        assert!(Selector::parse("div span").is_err());
        assert!(Selector::parse(".a.b").is_err());
    }

    #[test]
    fn display_round_trips_text() {
        for text in ["#a", ".b", "c", "d.e"] {
            assert_eq!(Selector::parse(text).unwrap().to_string(), text);
        }
    }
}
