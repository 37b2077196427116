//! Interaction dispatch
//!
//! Routes a user activation of a bound element to the operation its
//! binding names, the way delegated click handlers would.

use crate::binder::Binding;
use crate::controller::Controller;
use crate::diagram::{Placement, RenderContext};
use crate::edit::OpenOutcome;
use crate::error::ControllerError;
use crate::navigation::{BackOutcome, ResourceList};
use crate::saga::SagaReport;

/// What an activation did
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// Field editor opened (or already open)
    Editor(OpenOutcome),
    /// Association form submitted
    Linked(Box<SagaReport>),
    /// Association removed
    Unlinked(RenderContext),
    /// Diagram node expanded
    Expanded(Placement),
    /// Tab activated
    Tab,
    /// List opened
    List(ResourceList),
    /// Resource shown
    Shown,
    /// Back navigation
    Back(BackOutcome),
    /// Creation panel toggled; `true` when now visible
    Toggled(bool),
}

impl Controller {
    /// Activate a bound element
    ///
    /// # Errors
    /// `ControllerError::Unbound` for unbound elements, otherwise whatever
    /// the routed operation returns
    #[tracing::instrument(skip(self))]
    pub async fn activate(&self, element_id: &str) -> Result<Activation, ControllerError> {
        let binding = self.with_scope(|scope| scope.bindings.get(element_id).cloned());
        let Some(binding) = binding else {
            return self.fail(ControllerError::Unbound(element_id.to_string()));
        };
        match binding {
            Binding::Field(_) => self.open_editor(element_id).map(Activation::Editor),
            Binding::AssociationForm(_) => self
                .submit_association_form(element_id)
                .await
                .map(|report| Activation::Linked(Box::new(report))),
            Binding::Unlink(_) => self.unlink(element_id).await.map(Activation::Unlinked),
            Binding::DiagramNode(_) => self
                .expand_bound_node(element_id)
                .await
                .map(Activation::Expanded),
            Binding::Tab { .. } => self.activate_tab(element_id).map(|()| Activation::Tab),
            Binding::ListControl(kind) => self.open_resource_list(&kind).await.map(Activation::List),
            Binding::ShowLink(resource) => self.show_resource(&resource).await.map(|()| Activation::Shown),
            Binding::BackControl => self.go_back().await.map(Activation::Back),
            Binding::NewToggle { .. } => self.toggle_new_form(element_id).map(Activation::Toggled),
        }
    }
}
