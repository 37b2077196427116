//! Interaction bindings
//!
//! After any region is rendered, the [`Binder`] scans the new subtree and
//! records which elements respond to which interaction. Binding is keyed by
//! element id, so scanning the same subtree twice registers each element
//! once. Entries whose elements left the document are pruned on every pass.
//!
//! Elements that need a binding but carry no id are given a generated one.

use crate::field::{FieldDescriptor, EDITABLE_CLASS, FIELD_CLASS};
use indexmap::IndexMap;
use rcc_transport::ResourceRef;
use rcc_view::{Document, Element, Node, ViewError};
use std::collections::HashSet;

/// Class of a diagram root element
pub const DIAGRAM_CLASS: &str = "diagram";
/// Class of an expandable diagram node
pub const DIAGRAM_NODE_CLASS: &str = "diagram-node";

/// Form that links an association
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationForm {
    /// Form element id
    pub element_id: String,
    /// Resource gaining the association
    pub source: ResourceRef,
    /// Kind of the associated resource
    pub target_kind: String,
    /// Container listing the existing associations
    pub list_ref: Option<String>,
    /// Insert new entries before existing ones
    pub prepend: bool,
    /// Association name on the source side
    pub association_name: Option<String>,
    /// Association name on the target side
    pub reverse_association_name: Option<String>,
    /// Links an existing target instead of creating one
    pub existing: bool,
}

/// Control that removes an association
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlinkControl {
    /// Control element id
    pub element_id: String,
    /// Resource on the far side of the association
    pub resource: ResourceRef,
    /// Resource owning the association
    pub owner: Option<ResourceRef>,
    /// Association name
    pub association_name: Option<String>,
    /// Root of the diagram the control is rendered in
    pub diagram_root: Option<ResourceRef>,
}

/// What an element does when the user interacts with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Double-click opens an editor
    Field(FieldDescriptor),
    /// Submitting links an association
    AssociationForm(AssociationForm),
    /// Click removes an association
    Unlink(UnlinkControl),
    /// Click expands a diagram node in place
    DiagramNode(ResourceRef),
    /// Click activates a tab
    Tab {
        /// Pane shown by the tab
        pane: Option<String>,
    },
    /// Click opens a resource list
    ListControl(String),
    /// Click shows a resource
    ShowLink(ResourceRef),
    /// Click goes back
    BackControl,
    /// Click toggles a hidden creation panel
    NewToggle {
        /// Panel element id
        panel: String,
    },
}

/// Registry of live bindings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    entries: IndexMap<String, Binding>,
    generated: u64,
}

impl Bindings {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binding of an element
    #[inline]
    #[must_use]
    pub fn get(&self, element_id: &str) -> Option<&Binding> {
        self.entries.get(element_id)
    }

    /// Number of bound elements
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No bound elements
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All bindings in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Field descriptor of a bound field
    #[must_use]
    pub fn field(&self, element_id: &str) -> Option<&FieldDescriptor> {
        match self.entries.get(element_id) {
            Some(Binding::Field(field)) => Some(field),
            _ => None,
        }
    }

    /// Association form binding
    #[must_use]
    pub fn association_form(&self, element_id: &str) -> Option<&AssociationForm> {
        match self.entries.get(element_id) {
            Some(Binding::AssociationForm(form)) => Some(form),
            _ => None,
        }
    }

    /// Unlink control binding
    #[must_use]
    pub fn unlink_control(&self, element_id: &str) -> Option<&UnlinkControl> {
        match self.entries.get(element_id) {
            Some(Binding::Unlink(control)) => Some(control),
            _ => None,
        }
    }

    /// Kind opened by a list control
    #[must_use]
    pub fn list_kind(&self, element_id: &str) -> Option<&str> {
        match self.entries.get(element_id) {
            Some(Binding::ListControl(kind)) => Some(kind),
            _ => None,
        }
    }

    /// Panels of every creation toggle
    pub fn new_panels(&self) -> impl Iterator<Item = &str> {
        self.entries.values().filter_map(|b| match b {
            Binding::NewToggle { panel } => Some(panel.as_str()),
            _ => None,
        })
    }

    /// Ids of every bound back control
    pub fn back_controls(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, b)| matches!(b, Binding::BackControl))
            .map(|(id, _)| id.as_str())
    }

    /// Drop entries whose element is not in `live`
    pub fn prune(&mut self, live: &HashSet<String>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, _| live.contains(id));
        before - self.entries.len()
    }

    fn next_id(&mut self, taken: &HashSet<String>) -> String {
        loop {
            self.generated += 1;
            let candidate = format!("rcc-{}", self.generated);
            if !taken.contains(&candidate) {
                return candidate;
            }
        }
    }
}

/// Scans rendered subtrees into [`Bindings`]
#[derive(Debug, Clone)]
pub struct Binder {
    main_menu: String,
}

impl Binder {
    /// Create binder; `main_menu` is the id of the element whose resource
    /// buttons open lists
    #[inline]
    #[must_use]
    pub fn new(main_menu: impl Into<String>) -> Self {
        Self {
            main_menu: main_menu.into(),
        }
    }

    /// Bind every interactive element under `scope_id` (inclusive), then
    /// prune bindings of elements no longer in the document
    ///
    /// Returns the number of bindings registered by this pass.
    ///
    /// # Errors
    /// `ViewError::NotFound` when `scope_id` is absent
    pub fn bind(
        &self,
        bindings: &mut Bindings,
        document: &mut Document,
        scope_id: &str,
    ) -> Result<usize, ViewError> {
        let path = document
            .root()
            .path_to(scope_id)
            .ok_or_else(|| ViewError::NotFound(scope_id.to_string()))?;
        let in_menu = path.iter().any(|el| el.id() == Some(self.main_menu.as_str()));
        let diagram_root = path.iter().rev().find_map(|el| diagram_root_of(el));

        let mut taken = document.root().ids();
        let scope = document.get_mut(scope_id)?;
        let mut pass = Pass {
            bindings,
            taken: &mut taken,
            main_menu: &self.main_menu,
            registered: 0,
        };
        pass.visit(scope, in_menu, diagram_root.as_ref());
        let registered = pass.registered;

        let pruned = bindings.prune(&document.root().ids());
        tracing::debug!(scope = scope_id, registered, pruned, "bound subtree");
        Ok(registered)
    }
}

struct Pass<'a> {
    bindings: &'a mut Bindings,
    taken: &'a mut HashSet<String>,
    main_menu: &'a str,
    registered: usize,
}

impl Pass<'_> {
    fn visit(&mut self, el: &mut Element, in_menu: bool, diagram_root: Option<&ResourceRef>) {
        let in_menu = in_menu || el.id() == Some(self.main_menu);
        let own_root = diagram_root_of(el);
        let diagram_root = own_root.as_ref().or(diagram_root);

        if let Some(binding) = classify(el, in_menu, diagram_root) {
            let id = match el.id() {
                Some(id) => id.to_string(),
                None => {
                    let id = self.bindings.next_id(self.taken);
                    self.taken.insert(id.clone());
                    el.set_attr("id", id.clone());
                    id
                }
            };
            let binding = match binding {
                Binding::Field(mut field) => {
                    field.element_id.clone_from(&id);
                    Binding::Field(field)
                }
                Binding::AssociationForm(mut form) => {
                    form.element_id.clone_from(&id);
                    Binding::AssociationForm(form)
                }
                Binding::Unlink(mut control) => {
                    control.element_id.clone_from(&id);
                    Binding::Unlink(control)
                }
                other => other,
            };
            if self.bindings.entries.get(&id) != Some(&binding) {
                self.registered += 1;
                self.bindings.entries.insert(id, binding);
            }
        }

        for child in &mut el.children {
            if let Node::Element(child) = child {
                self.visit(child, in_menu, diagram_root);
            }
        }
    }
}

fn resource_of(el: &Element) -> Option<ResourceRef> {
    Some(ResourceRef::new(el.attr("data-resource")?, el.attr("data-id")?))
}

fn diagram_root_of(el: &Element) -> Option<ResourceRef> {
    if el.has_class(DIAGRAM_CLASS) {
        resource_of(el)
    } else {
        None
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).map(str::to_string)
}

/// Work out what an element does; ids are filled in by the caller
fn classify(el: &Element, in_menu: bool, diagram_root: Option<&ResourceRef>) -> Option<Binding> {
    if el.has_class(FIELD_CLASS) && el.has_class(EDITABLE_CLASS) {
        let mut candidate = el.clone();
        if candidate.id().is_none() {
            candidate.set_attr("id", "");
        }
        return FieldDescriptor::from_element(&candidate).map(Binding::Field);
    }
    if el.tag == "form" && (el.has_class("association") || el.has_class("update-association")) {
        let source = resource_of(el)?;
        let target_kind = el.attr("data-association")?.to_string();
        return Some(Binding::AssociationForm(AssociationForm {
            element_id: String::new(),
            source,
            target_kind,
            list_ref: non_empty(el.attr("data-list-ref")).map(|r| r.trim_start_matches('#').to_string()),
            prepend: el.attr("data-prepend").map_or(true, |v| v != "false"),
            association_name: non_empty(el.attr("data-association-name")),
            reverse_association_name: non_empty(el.attr("data-reverse-association-name")),
            existing: el.has_class("update-association"),
        }));
    }
    if el.has_class("delete-node") {
        let owner = match (el.attr("data-association"), el.attr("data-association-id")) {
            (Some(kind), Some(id)) => Some(ResourceRef::new(kind, id)),
            _ => None,
        };
        return Some(Binding::Unlink(UnlinkControl {
            element_id: String::new(),
            resource: resource_of(el)?,
            owner,
            association_name: non_empty(el.attr("data-association-name")),
            diagram_root: diagram_root.cloned(),
        }));
    }
    if el.has_class(DIAGRAM_NODE_CLASS) {
        return resource_of(el).map(Binding::DiagramNode);
    }
    if el.has_class("nav-link") && el.id().is_some() {
        let pane = non_empty(el.attr("data-target"))
            .or_else(|| non_empty(el.attr("href")))
            .map(|p| p.trim_start_matches('#').to_string());
        return Some(Binding::Tab { pane });
    }
    if el.has_class("resource-show-link") {
        return resource_of(el).map(Binding::ShowLink);
    }
    if el.has_class("back-button") {
        return Some(Binding::BackControl);
    }
    if el.has_class("resource-new-link") {
        return non_empty(el.attr("data-target")).map(|panel| Binding::NewToggle {
            panel: panel.trim_start_matches('#').to_string(),
        });
    }
    if (in_menu || el.has_class("resource-list-btn")) && el.attr("data-id").is_none() {
        return non_empty(el.attr("data-resource")).map(Binding::ListControl);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r##"<body>
        <nav id="main-menu"><button id="companies_index_btn" data-resource="Company">Companies</button></nav>
        <div id="results">
          <span id="f-name" class="resource-data-field editable" data-resource="Company" data-id="1"
                data-attr="name" data-attrname="Name" data-val="Acme">Name: Acme</span>
          <span class="resource-data-field editable" data-resource="Company" data-id="1"
                data-attr="public" data-field-type="boolean" data-val="true">public: true</span>
          <form id="add-market" class="association" data-resource="Company" data-id="1"
                data-association="Market" data-list-ref="#markets" data-association-name="markets"></form>
          <div class="diagram" data-resource="Company" data-id="1">
            <div id="node-Market-3" class="diagram-node" data-resource="Market" data-id="3">
              <a id="unlink-3" class="delete-node" data-resource="Market" data-id="3"
                 data-association="Company" data-association-id="1">x</a>
            </div>
          </div>
        </div>
      </body>"##;

    fn bound() -> (Bindings, Document) {
        let mut doc = Document::parse(PAGE);
        let mut bindings = Bindings::new();
        let binder = Binder::new("main-menu");
        let root_id = "page";
        doc.root_mut().set_attr("id", root_id);
        binder.bind(&mut bindings, &mut doc, root_id).unwrap();
        (bindings, doc)
    }

    #[test]
    fn classifies_interactive_elements() {
        let (bindings, _) = bound();
        assert_eq!(bindings.list_kind("companies_index_btn"), Some("Company"));
        assert_eq!(bindings.field("f-name").unwrap().current_value, "Acme");
        let form = bindings.association_form("add-market").unwrap();
        assert_eq!(form.list_ref.as_deref(), Some("markets"));
        assert!(form.prepend);
        assert!(!form.existing);
        assert_eq!(
            bindings.get("node-Market-3"),
            Some(&Binding::DiagramNode(ResourceRef::new("Market", 3u64)))
        );
    }

    #[test]
    fn unlink_inside_diagram_knows_its_root() {
        let (bindings, _) = bound();
        let control = bindings.unlink_control("unlink-3").unwrap();
        assert_eq!(control.diagram_root, Some(ResourceRef::new("Company", 1u64)));
        assert_eq!(control.owner, Some(ResourceRef::new("Company", 1u64)));
    }

    #[test]
    fn generates_ids_for_anonymous_fields() {
        let (bindings, doc) = bound();
        let generated: Vec<_> = bindings
            .iter()
            .filter(|(id, _)| id.starts_with("rcc-"))
            .map(|(id, _)| id.to_string())
            .collect();
        assert_eq!(generated.len(), 1);
        let field = bindings.field(&generated[0]).unwrap();
        assert_eq!(field.element_id, generated[0]);
        assert!(doc.contains(&generated[0]));
    }

    #[test]
    fn rebinding_is_idempotent() {
        let (mut bindings, mut doc) = bound();
        let before = bindings.clone();
        let registered = Binder::new("main-menu")
            .bind(&mut bindings, &mut doc, "results")
            .unwrap();
        assert_eq!(registered, 0);
        assert_eq!(bindings, before);
    }

    #[test]
    fn replaced_elements_are_pruned() {
        let (mut bindings, mut doc) = bound();
        doc.replace_children("results", Vec::new()).unwrap();
        Binder::new("main-menu")
            .bind(&mut bindings, &mut doc, "results")
            .unwrap();
        assert!(bindings.field("f-name").is_none());
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn missing_scope_is_an_error() {
        let (mut bindings, mut doc) = bound();
        assert!(Binder::new("main-menu")
            .bind(&mut bindings, &mut doc, "nope")
            .is_err());
    }
}
