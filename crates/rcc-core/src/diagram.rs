//! Diagram expansion
//!
//! A diagram renders a resource hierarchy. Top-level expansion replaces the
//! results region; nested expansion inserts a node's children into that
//! node's own container. Expanding an already expanded node re-renders the
//! same content into the same container, never a duplicate.
//!
//! Unlinking re-renders whatever the control was shown in: the diagram it
//! belongs to, or the resource view it sits on.

use crate::binder::Binding;
use crate::controller::Controller;
use crate::error::ControllerError;
use crate::navigation::TabPreference;
use indexmap::IndexMap;
use rcc_transport::{FormData, ResourceRef};
use rcc_view::{Fragment, ViewError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What an association-changing control was rendered in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderContext {
    /// A diagram rooted at `root`
    Diagram {
        /// Diagram root
        root: ResourceRef,
    },
    /// A full resource view
    ResourceView {
        /// Shown resource
        resource: ResourceRef,
    },
}

/// One node of the diagram
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramNode {
    /// Resource the node shows
    pub resource: ResourceRef,
    /// Element holding the node's children
    pub container_id: String,
    /// Children rendered
    pub expanded: bool,
}

/// Where an expansion renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandTarget {
    /// Replace the results region with a new diagram
    TopLevel,
    /// Insert into this node container
    Nested(String),
}

impl ExpandTarget {
    /// Nested expansion
    #[inline]
    #[must_use]
    pub fn is_nested(&self) -> bool {
        matches!(self, Self::Nested(_))
    }
}

/// Result of placing a response into the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Content rendered
    Rendered,
    /// Target left the page while the request was in flight
    Stale,
}

/// Expansion state of the diagram on the page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramTree {
    root: Option<ResourceRef>,
    nodes: IndexMap<String, DiagramNode>,
}

impl DiagramTree {
    /// Diagram root, when a diagram is shown
    #[inline]
    #[must_use]
    pub fn root(&self) -> Option<&ResourceRef> {
        self.root.as_ref()
    }

    /// Node by container id
    #[inline]
    #[must_use]
    pub fn node(&self, container_id: &str) -> Option<&DiagramNode> {
        self.nodes.get(container_id)
    }

    /// Whether the node in `container_id` is expanded
    #[must_use]
    pub fn is_expanded(&self, container_id: &str) -> bool {
        self.nodes.get(container_id).is_some_and(|n| n.expanded)
    }

    /// Number of tracked nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// No tracked nodes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Start a new diagram
    pub fn reset(&mut self, root: ResourceRef) {
        self.root = Some(root);
        self.nodes.clear();
    }

    /// Record an expanded node
    pub fn mark_expanded(&mut self, resource: ResourceRef, container_id: &str) {
        self.nodes.insert(
            container_id.to_string(),
            DiagramNode {
                resource,
                container_id: container_id.to_string(),
                expanded: true,
            },
        );
    }

    /// Forget nodes whose containers left the page
    pub fn retain_live(&mut self, live: &HashSet<String>) {
        self.nodes.retain(|id, _| live.contains(id));
    }

    /// Forget the diagram entirely
    pub fn clear(&mut self) {
        self.root = None;
        self.nodes.clear();
    }
}

fn expansion_key(resource: &ResourceRef, target: &ExpandTarget) -> String {
    match target {
        ExpandTarget::TopLevel => format!("expand:{resource}"),
        ExpandTarget::Nested(container) => format!("expand:{resource}@{container}"),
    }
}

impl Controller {
    /// Expand a diagram node
    ///
    /// A second request for the same node while one is in flight is
    /// ignored with `ControllerError::InFlight`.
    ///
    /// # Errors
    /// Rejection or transport failure, already reported
    #[tracing::instrument(skip_all, fields(resource = %resource, nested = target.is_nested()))]
    pub async fn expand_node(
        &self,
        resource: &ResourceRef,
        target: ExpandTarget,
    ) -> Result<Placement, ControllerError> {
        let key = expansion_key(resource, &target);
        let claimed = self.with_scope(|scope| {
            if let ExpandTarget::Nested(container) = &target {
                if !scope.document.contains(container) {
                    return Err(ControllerError::View(ViewError::NotFound(container.clone())));
                }
            }
            if scope.claim(&key) {
                Ok(scope.generation)
            } else {
                Err(ControllerError::InFlight(key.clone()))
            }
        });
        let generation = match claimed {
            Ok(generation) => generation,
            Err(e) => return self.fail(e),
        };

        let group_id = self.with_scope(|scope| {
            scope
                .document
                .get(self.config.results_region.as_str())
                .ok()
                .and_then(|region| region.descendants().find(|el| el.has_class("diagram")))
                .and_then(|el| el.attr("data-group-id"))
                .map(str::to_string)
        });
        let response = self
            .api
            .diagram(resource, target.is_nested(), group_id)
            .await;
        self.with_scope(|scope| scope.release(&key));

        let html = match response {
            Ok(html) => html,
            Err(e) => return self.fail(ControllerError::from_api(e)),
        };
        let fragment = Fragment::parse(&html);
        let nodes = if target.is_nested() {
            fragment.into_unwrapped()
        } else {
            fragment.into_nodes()
        };

        let region = self.config.results_region.clone();
        let placed = self.with_scope(|scope| match &target {
            ExpandTarget::TopLevel => {
                scope.render_region(&self.binder, &region, nodes, TabPreference::First)?;
                scope.diagram.reset(resource.clone());
                scope.navigation.current = None;
                scope.navigation.render_context = Some(RenderContext::Diagram {
                    root: resource.clone(),
                });
                Ok(Placement::Rendered)
            }
            ExpandTarget::Nested(container) => {
                if !scope.document.contains(container) {
                    tracing::warn!(%container, generation, current = scope.generation, "expansion target gone, dropping response");
                    return Ok(Placement::Stale);
                }
                scope.render_into(&self.binder, container, nodes)?;
                if let Ok(el) = scope.document.get_mut(container) {
                    el.set_attr("data-expanded", "true");
                }
                scope.diagram.mark_expanded(resource.clone(), container);
                scope.recompute(&region)?;
                Ok(Placement::Rendered)
            }
        });
        match placed {
            Ok(placement) => Ok(placement),
            Err(e) => self.fail(ControllerError::View(e)),
        }
    }

    /// Expand the diagram node bound to `container_id`
    ///
    /// # Errors
    /// `ControllerError::Unbound` when the element is not a diagram node,
    /// otherwise as [`Controller::expand_node`]
    pub async fn expand_bound_node(&self, container_id: &str) -> Result<Placement, ControllerError> {
        let resource = self.with_scope(|scope| match scope.bindings.get(container_id) {
            Some(Binding::DiagramNode(resource)) => Some(resource.clone()),
            _ => None,
        });
        match resource {
            Some(resource) => {
                self.expand_node(&resource, ExpandTarget::Nested(container_id.to_string()))
                    .await
            }
            None => self.fail(ControllerError::Unbound(container_id.to_string())),
        }
    }

    /// Remove the association behind an unlink control, then re-render the
    /// diagram or resource view it was shown in
    ///
    /// # Errors
    /// Rejection or transport failure, already reported
    #[tracing::instrument(skip(self))]
    pub async fn unlink(&self, control_id: &str) -> Result<RenderContext, ControllerError> {
        let control = self.with_scope(|scope| scope.bindings.unlink_control(control_id).cloned());
        let Some(control) = control else {
            return self.fail(ControllerError::Unbound(control_id.to_string()));
        };

        let context = match (&control.diagram_root, &control.owner) {
            (Some(root), _) => RenderContext::Diagram { root: root.clone() },
            (None, Some(owner)) => RenderContext::ResourceView {
                resource: owner.clone(),
            },
            (None, None) => {
                let current = self.with_scope(|scope| scope.navigation.current.clone());
                RenderContext::ResourceView {
                    resource: current.unwrap_or_else(|| control.resource.clone()),
                }
            }
        };

        let mut form = FormData::new()
            .with("resource", control.resource.kind.as_str())
            .with("id", control.resource.id.as_str());
        if let Some(owner) = &control.owner {
            form.push("association", owner.kind.as_str());
            form.push("association_id", owner.id.as_str());
        }
        if let Some(name) = &control.association_name {
            form.push("associationRef", name.as_str());
        }

        if let Err(e) = self.api.unlink(form).await {
            return self.fail(ControllerError::from_api(e));
        }
        tracing::info!(resource = %control.resource, "association removed");

        match &context {
            RenderContext::Diagram { root } => {
                self.expand_node(root, ExpandTarget::TopLevel).await?;
            }
            RenderContext::ResourceView { resource } => {
                self.show_resource(resource).await?;
            }
        }
        Ok(context)
    }
}
