//! RCC View - the page tree the console controller mutates
//!
//! Provides:
//! - [`Element`] / [`Node`] view tree with id, class and attribute helpers
//! - [`Document`] region operations addressed by element id
//! - [`Fragment`] parsing of server-rendered markup
//! - [`Selector`] for the `#id` / `.class` / `tag` forms the markup uses
//!
//! # Example
//!
//! ```rust
//! use rcc_view::{Document, Fragment};
//!
//! let mut doc = Document::parse(r#"<body><div id="results"></div></body>"#);
//! let fragment = Fragment::parse("<h3>Companies</h3>");
//! doc.replace_children("results", fragment.into_nodes()).unwrap();
//! assert_eq!(doc.inner_html("results").unwrap(), "<h3>Companies</h3>");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod document;
pub mod error;
pub mod markup;
pub mod node;
pub mod selector;

pub use document::{Document, Fragment};
pub use error::ViewError;
pub use node::{Element, Node};
pub use selector::Selector;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
