//! Association saga
//!
//! Linking an association may first create the target resource. When the
//! link then fails, the freshly created target is deleted again so no
//! orphan is left behind:
//!
//! ```text
//! Idle → CreatingTarget → Linking → Committed
//!                            └→ CompensatingDelete → Failed
//! ```
//!
//! The compensating delete runs at most once per saga and only for a target
//! the saga itself created. The user always sees the error that stopped the
//! saga; a failed compensation adds a warning, it never replaces it.

use crate::controller::Controller;
use crate::error::ControllerError;
use crate::field::boolean_wire;
use crate::notify::Notice;
use crate::state_machine::{validate_transition, SagaState};
use rcc_transport::{ApiError, FormData, ResourceId, ResourceRef};
use rcc_view::{Element, Fragment, Node};
use ulid::Ulid;

/// Form key carrying the association name on link requests
pub const ASSOCIATION_NAME_PARAM: &str = "_association_name";

/// Target of a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// Link a resource that already exists
    Existing(ResourceId),
    /// Create the target from these fields first
    New(FormData),
}

/// How reloaded content enters the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkMode {
    /// Before existing entries
    #[default]
    Prepend,
    /// Instead of existing entries
    Replace,
}

/// How the view is refreshed after a successful link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Patch the target's node when it is shown under the expected role,
    /// else reload the container
    #[default]
    PatchInPlace,
    /// Always reload the container
    ReloadContainer,
}

/// Everything a link needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationLinkRequest {
    /// Resource gaining the association
    pub source: ResourceRef,
    /// Kind of the target resource
    pub target_kind: String,
    /// Existing or new target
    pub target: TargetSpec,
    /// Association name on the source side
    pub association_name: Option<String>,
    /// Association name on the target side
    pub reverse_association_name: Option<String>,
    /// Container listing the source's associations
    pub container: Option<String>,
    /// Insert mode for container reloads
    pub mode: LinkMode,
    /// Refresh policy
    pub refresh: RefreshPolicy,
    /// Form the request came from
    pub form_id: Option<String>,
    /// Submitted form values, posted along with the link
    pub form: FormData,
}

impl AssociationLinkRequest {
    /// Create link request
    #[must_use]
    pub fn new(source: ResourceRef, target_kind: impl Into<String>, target: TargetSpec) -> Self {
        Self {
            source,
            target_kind: target_kind.into(),
            target,
            association_name: None,
            reverse_association_name: None,
            container: None,
            mode: LinkMode::default(),
            refresh: RefreshPolicy::default(),
            form_id: None,
            form: FormData::new(),
        }
    }

    /// With association name
    #[inline]
    #[must_use]
    pub fn with_association_name(mut self, name: impl Into<String>) -> Self {
        self.association_name = Some(name.into());
        self
    }

    /// With reverse association name
    #[inline]
    #[must_use]
    pub fn with_reverse_association_name(mut self, name: impl Into<String>) -> Self {
        self.reverse_association_name = Some(name.into());
        self
    }

    /// With container id
    #[inline]
    #[must_use]
    pub fn with_container(mut self, id: impl Into<String>) -> Self {
        self.container = Some(id.into());
        self
    }

    /// With insert mode
    #[inline]
    #[must_use]
    pub fn with_mode(mut self, mode: LinkMode) -> Self {
        self.mode = mode;
        self
    }

    /// With refresh policy
    #[inline]
    #[must_use]
    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    /// With originating form
    #[inline]
    #[must_use]
    pub fn with_form(mut self, form_id: impl Into<String>) -> Self {
        self.form_id = Some(form_id.into());
        self
    }

    /// With submitted form values
    #[inline]
    #[must_use]
    pub fn with_form_values(mut self, form: FormData) -> Self {
        self.form = form;
        self
    }

    fn guard_key(&self) -> String {
        let origin = self
            .form_id
            .as_deref()
            .or(self.container.as_deref())
            .unwrap_or("-");
        format!("link:{}->{}@{origin}", self.source, self.target_kind)
    }
}

/// How the view was refreshed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkRefresh {
    /// Target node replaced in place
    Patched(String),
    /// Container reloaded
    Reloaded(String),
    /// Current resource view re-rendered
    ViewReloaded,
    /// Target region gone
    Stale,
}

/// Completed saga
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaReport {
    /// Saga id, for log correlation
    pub id: Ulid,
    /// Linked target
    pub target: ResourceRef,
    /// Whether the saga created the target
    pub created: bool,
    /// States passed through
    pub history: Vec<SagaState>,
    /// View refresh applied
    pub refresh: LinkRefresh,
}

struct Saga {
    id: Ulid,
    state: SagaState,
    history: Vec<SagaState>,
}

impl Saga {
    fn new() -> Self {
        Self {
            id: Ulid::new(),
            state: SagaState::Idle,
            history: vec![SagaState::Idle],
        }
    }

    fn advance(&mut self, to: SagaState) {
        match validate_transition(self.state, to) {
            Ok(()) => {
                tracing::debug!(saga = %self.id, from = ?self.state, ?to, "saga step");
                self.state = to;
                self.history.push(to);
            }
            Err(e) => tracing::error!(saga = %self.id, from = ?self.state, ?to, error = %e, "saga step refused"),
        }
    }
}

/// Input values of a form, keyed by input name
#[must_use]
pub fn form_values(form: &Element) -> FormData {
    let mut data = FormData::new();
    for el in form.descendants() {
        let Some(name) = el.attr("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        match el.tag.as_str() {
            "input" => match el.attr("type").unwrap_or("text") {
                "submit" | "button" | "reset" => {}
                "checkbox" => data.push(name, boolean_wire(el.has_attr("checked"))),
                _ => data.push(name, el.attr("value").unwrap_or_default()),
            },
            "select" => {
                let options: Vec<&Element> = el.descendants().filter(|o| o.tag == "option").collect();
                let chosen = options
                    .iter()
                    .find(|o| o.has_attr("selected"))
                    .or_else(|| options.first());
                if let Some(option) = chosen {
                    let value = option
                        .attr("value")
                        .map_or_else(|| option.text_content(), str::to_string);
                    data.push(name, value);
                }
            }
            "textarea" => data.push(name, el.text_content()),
            _ => {}
        }
    }
    data
}

/// Empty every user-editable input of a form
pub fn clear_form(form: &mut Element) {
    form.for_each_mut(
        &|el: &Element| matches!(el.tag.as_str(), "input" | "select" | "textarea" | "option"),
        &mut |el| match el.tag.as_str() {
            "input" => match el.attr("type").unwrap_or("text") {
                "hidden" | "submit" | "button" | "reset" => {}
                "checkbox" | "radio" => {
                    el.remove_attr("checked");
                }
                _ => {
                    el.set_attr("value", "");
                }
            },
            "option" => {
                el.remove_attr("selected");
            }
            "textarea" => el.children.clear(),
            _ => {}
        },
    );
}

/// Set one named input of a form
fn write_form_value(form: &mut Element, name: &str, value: &str) -> bool {
    let mut written = false;
    form.for_each_mut(&|el: &Element| el.attr("name") == Some(name), &mut |el| {
        written = true;
        match el.tag.as_str() {
            "select" => el.for_each_mut(&|o: &Element| o.tag == "option", &mut |o| {
                if o.attr("value") == Some(value) {
                    o.set_attr("selected", "selected");
                } else {
                    o.remove_attr("selected");
                }
            }),
            "textarea" => el.set_text(value),
            _ if el.attr("type") == Some("checkbox") => {
                if crate::field::is_truthy(value) {
                    el.set_attr("checked", "checked");
                } else {
                    el.remove_attr("checked");
                }
            }
            _ => {
                el.set_attr("value", value);
            }
        }
    });
    written
}

impl Controller {
    /// Link an association, creating the target first when asked to
    ///
    /// A second submission with the same origin while one is in flight is
    /// ignored with `ControllerError::InFlight`.
    ///
    /// # Errors
    /// The error that stopped the saga (`Creation`, `Validation`, `Cycle`
    /// or transport), already reported
    #[tracing::instrument(skip_all, fields(source = %request.source, target_kind = %request.target_kind))]
    pub async fn link_association(
        &self,
        request: AssociationLinkRequest,
    ) -> Result<SagaReport, ControllerError> {
        let key = request.guard_key();
        let claimed = self.with_scope(|scope| scope.claim(&key).then_some(scope.generation));
        let Some(generation) = claimed else {
            return self.fail(ControllerError::InFlight(key));
        };
        let result = self.run_saga(&request, generation).await;
        self.with_scope(|scope| scope.release(&key));
        result
    }

    async fn run_saga(
        &self,
        request: &AssociationLinkRequest,
        generation: u64,
    ) -> Result<SagaReport, ControllerError> {
        let mut saga = Saga::new();
        tracing::info!(saga = %saga.id, "saga started");

        let (target, created) = match &request.target {
            TargetSpec::Existing(id) => {
                saga.advance(SagaState::Linking);
                (ResourceRef::new(request.target_kind.as_str(), id.clone()), false)
            }
            TargetSpec::New(fields) => {
                saga.advance(SagaState::CreatingTarget);
                match self.api.create(&request.target_kind, fields.clone()).await {
                    Ok(id) => {
                        saga.advance(SagaState::Linking);
                        (ResourceRef::new(request.target_kind.as_str(), id), true)
                    }
                    Err(e) => {
                        saga.advance(SagaState::Failed);
                        return self.fail(ControllerError::from_create(e));
                    }
                }
            }
        };

        let mut form = request.form.clone();
        if let Some(name) = &request.association_name {
            if form.get(ASSOCIATION_NAME_PARAM).is_none() {
                form.push(ASSOCIATION_NAME_PARAM, name.as_str());
            }
        }

        let (err, error_fragment) = match self.api.link(&request.source, &target, form).await {
            Ok(html) => {
                let fragment = Fragment::parse(&html);
                if fragment.has_class(&self.config.error_marker_class) {
                    let text = fragment
                        .elements()
                        .map(Element::text_content)
                        .collect::<Vec<_>>()
                        .join(" ");
                    let text = text.trim();
                    let message = if text.is_empty() {
                        "Association would create a cycle.".to_string()
                    } else {
                        text.to_string()
                    };
                    (ControllerError::Cycle(message), Some(fragment))
                } else {
                    saga.advance(SagaState::Committed);
                    let refresh = self
                        .apply_link(request, &target, fragment, generation)
                        .await;
                    tracing::info!(saga = %saga.id, %target, ?refresh, "association linked");
                    return Ok(SagaReport {
                        id: saga.id,
                        target,
                        created,
                        history: saga.history,
                        refresh,
                    });
                }
            }
            Err(ApiError::Rejected { message, .. }) => (ControllerError::Validation(message), None),
            Err(other) => (ControllerError::from_api(other), None),
        };

        let compensation = if created {
            saga.advance(SagaState::CompensatingDelete);
            let deleted = self.api.delete(&target).await;
            saga.advance(SagaState::Failed);
            deleted.err()
        } else {
            saga.advance(SagaState::Failed);
            None
        };
        tracing::warn!(saga = %saga.id, %target, error = %err, compensated = created, "saga failed");

        if let (Some(fragment), Some(container)) = (error_fragment, &request.container) {
            self.with_scope(|scope| {
                if scope.generation == generation && scope.document.contains(container) {
                    let shown = scope
                        .document
                        .prepend_children(container, fragment.into_nodes())
                        .and_then(|()| scope.rebind(&self.binder, container).map(|_| ()));
                    if let Err(e) = shown {
                        tracing::debug!(error = %e, "error fragment not shown");
                    }
                }
            });
        }

        self.report(&err);
        if let Some(cleanup) = compensation {
            tracing::error!(%target, error = %cleanup, "compensating delete failed");
            self.notifier.notify(Notice::warning(format!(
                "The new {} {} could not be removed and may need to be deleted by hand: {cleanup}",
                target.kind, target.id
            )));
        }
        Err(err)
    }

    /// Put the link template into the page
    async fn apply_link(
        &self,
        request: &AssociationLinkRequest,
        target: &ResourceRef,
        fragment: Fragment,
        generation: u64,
    ) -> LinkRefresh {
        let region = self.config.results_region.clone();
        let marker = self.config.error_marker_class.clone();
        let refresh = self.with_scope(|scope| {
            if scope.generation != generation {
                tracing::warn!(%target, "view replaced during link, skipping refresh");
                return Some(LinkRefresh::Stale);
            }

            let node_id = format!("node-{}-{}", target.kind, target.id);
            let role_matches = request.reverse_association_name.is_some()
                && scope
                    .document
                    .get(&node_id)
                    .ok()
                    .and_then(|el| el.attr("data-association-name"))
                    == request.reverse_association_name.as_deref();

            let refresh = if request.refresh == RefreshPolicy::PatchInPlace && role_matches {
                let nodes = fragment.into_nodes();
                let new_id = nodes
                    .iter()
                    .filter_map(Node::as_element)
                    .find_map(Element::id)
                    .map(str::to_string);
                match scope.document.replace_with(&node_id, nodes) {
                    Ok(()) => {
                        let scope_id = new_id
                            .filter(|id| scope.document.contains(id))
                            .unwrap_or_else(|| region.clone());
                        if let Err(e) = scope.rebind(&self.binder, &scope_id) {
                            tracing::warn!(error = %e, "rebind after patch failed");
                        }
                        LinkRefresh::Patched(node_id)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "patch target vanished");
                        LinkRefresh::Stale
                    }
                }
            } else {
                match &request.container {
                    None => return None,
                    Some(container) if !scope.document.contains(container) => {
                        tracing::warn!(%container, "link container gone, skipping refresh");
                        LinkRefresh::Stale
                    }
                    Some(container) => {
                        if let Ok(el) = scope.document.get_mut(container) {
                            el.remove_all_where(&|e: &Element| e.has_class(&marker));
                        }
                        let nodes = fragment.into_nodes();
                        let inserted = match request.mode {
                            LinkMode::Prepend => scope.document.prepend_children(container, nodes),
                            LinkMode::Replace => scope.document.replace_children(container, nodes),
                        };
                        if let Err(e) = inserted.and_then(|()| scope.rebind(&self.binder, container).map(|_| ())) {
                            tracing::warn!(error = %e, "container reload failed");
                        }
                        LinkRefresh::Reloaded(container.clone())
                    }
                }
            };

            if let Err(e) = scope.recompute(&region) {
                tracing::debug!(error = %e, "aggregate recompute skipped");
            }
            if let Some(form_id) = &request.form_id {
                if let Ok(form) = scope.document.get_mut(form_id) {
                    clear_form(form);
                }
            }
            let panels: Vec<String> = scope.bindings.new_panels().map(str::to_string).collect();
            for panel in panels {
                if let Ok(el) = scope.document.get_mut(&panel) {
                    el.set_attr("hidden", "hidden");
                }
            }
            Some(refresh)
        });

        match refresh {
            Some(refresh) => refresh,
            None => {
                let current = self.with_scope(|scope| scope.navigation.current.clone());
                match current {
                    Some(resource) => match self.show_resource(&resource).await {
                        Ok(()) => LinkRefresh::ViewReloaded,
                        Err(_) => LinkRefresh::Stale,
                    },
                    None => LinkRefresh::Stale,
                }
            }
        }
    }

    /// Set an input of a bound association form
    ///
    /// # Errors
    /// `ControllerError::Unbound` when the form or input is unknown
    pub fn fill_form(&self, form_id: &str, name: &str, value: &str) -> Result<(), ControllerError> {
        self.with_scope(|scope| {
            if scope.bindings.association_form(form_id).is_none() {
                return Err(ControllerError::Unbound(form_id.to_string()));
            }
            let form = scope.document.get_mut(form_id)?;
            if write_form_value(form, name, value) {
                Ok(())
            } else {
                Err(ControllerError::Unbound(format!("{form_id} [name={name}]")))
            }
        })
    }

    /// Submit a bound association form
    ///
    /// A `form.update-association` links the existing resource named by its
    /// `id` input; a `form.association` creates the target from its inputs.
    ///
    /// # Errors
    /// `ControllerError::Unbound` for unknown forms,
    /// `ControllerError::Validation` when no existing target is selected,
    /// otherwise as [`Controller::link_association`]
    pub async fn submit_association_form(&self, form_id: &str) -> Result<SagaReport, ControllerError> {
        let prepared = self.with_scope(|scope| {
            let binding = scope.bindings.association_form(form_id)?.clone();
            let values = scope.document.get(form_id).ok().map(form_values)?;
            Some((binding, values))
        });
        let Some((binding, values)) = prepared else {
            return self.fail(ControllerError::Unbound(form_id.to_string()));
        };

        let target = if binding.existing {
            match values.get("id").filter(|id| !id.trim().is_empty()) {
                Some(id) => TargetSpec::Existing(ResourceId::new(id.trim())),
                None => {
                    return self.fail(ControllerError::Validation(format!(
                        "Select a {} to link.",
                        binding.target_kind
                    )))
                }
            }
        } else {
            TargetSpec::New(values.clone())
        };

        let mut request = AssociationLinkRequest::new(binding.source, binding.target_kind, target)
            .with_form(form_id)
            .with_form_values(values)
            .with_mode(if binding.prepend {
                LinkMode::Prepend
            } else {
                LinkMode::Replace
            });
        if let Some(name) = binding.association_name {
            request = request.with_association_name(name);
        }
        if let Some(name) = binding.reverse_association_name {
            request = request.with_reverse_association_name(name);
        }
        if let Some(container) = binding.list_ref {
            request = request.with_container(container);
        }
        self.link_association(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn form() -> Element {
        Fragment::parse(
            r#"<form id="f">
                 <input type="hidden" name="source_id" value="1">
                 <input name="name" value="EV">
                 <input type="checkbox" name="public" checked>
                 <select name="kind"><option value="a">A</option><option value="b" selected>B</option></select>
                 <textarea name="notes">hello</textarea>
                 <input type="submit" name="go" value="Save">
               </form>"#,
        )
        .elements()
        .next()
        .cloned()
        .unwrap()
    }

    #[test]
    fn collects_named_inputs() {
        let values = form_values(&form());
        assert_eq!(
            values.pairs().to_vec(),
            vec![
                ("source_id".to_string(), "1".to_string()),
                ("name".to_string(), "EV".to_string()),
                ("public".to_string(), "true".to_string()),
                ("kind".to_string(), "b".to_string()),
                ("notes".to_string(), "hello".to_string()),
            ]
        );
    }

    #[test]
    fn clearing_keeps_hidden_inputs() {
        let mut f = form();
        clear_form(&mut f);
        let values = form_values(&f);
        assert_eq!(values.get("source_id"), Some("1"));
        assert_eq!(values.get("name"), Some(""));
        assert_eq!(values.get("public"), Some("false"));
        assert_eq!(values.get("kind"), Some("a"));
        assert_eq!(values.get("notes"), Some(""));
    }

    #[test]
    fn writes_named_input() {
        let mut f = form();
        assert!(write_form_value(&mut f, "kind", "a"));
        assert!(write_form_value(&mut f, "name", "Hybrid"));
        assert!(!write_form_value(&mut f, "missing", "x"));
        let values = form_values(&f);
        assert_eq!(values.get("kind"), Some("a"));
        assert_eq!(values.get("name"), Some("Hybrid"));
    }

    #[test]
    fn guard_key_distinguishes_origins() {
        let source = ResourceRef::new("Company", 1u64);
        let a = AssociationLinkRequest::new(source.clone(), "Market", TargetSpec::New(FormData::new()))
            .with_form("form-a");
        let b = AssociationLinkRequest::new(source, "Market", TargetSpec::New(FormData::new()))
            .with_form("form-b");
        assert_ne!(a.guard_key(), b.guard_key());
    }
}
