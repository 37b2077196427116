//! Field edit session
//!
//! At most one field shows an editor at any time. Opening another field
//! first reverts the open one to display mode with its last committed
//! value. A click outside the editor commits a changed value and cancels an
//! unchanged one; the session is gone once either happens, so the outside
//! click can act at most once per opening.

use crate::controller::Controller;
use crate::error::ControllerError;
use crate::field::FieldDescriptor;
use crate::state_machine::{validate_transition, EditState};
use rcc_transport::ApiError;
use rcc_view::Element;

/// The open editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEdit {
    /// Field being edited
    pub field: FieldDescriptor,
    /// Current input value
    pub input: String,
    /// Lifecycle state
    pub state: EditState,
}

impl ActiveEdit {
    /// Whether the input differs from the committed value
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.field.wire_value(&self.input) != self.field.wire_value(&self.field.current_value)
    }
}

/// Result of an open request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    /// Editor shown; `reverted` is the field that was open before
    Opened {
        /// Previously open field, now back in display mode
        reverted: Option<FieldDescriptor>,
    },
    /// This field's editor was already open
    AlreadyOpen,
}

/// Single-editor session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditSession {
    active: Option<ActiveEdit>,
}

impl EditSession {
    /// Create closed session
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open editor, if any
    #[inline]
    #[must_use]
    pub fn active(&self) -> Option<&ActiveEdit> {
        self.active.as_ref()
    }

    /// Whether `element_id`'s editor is open
    #[must_use]
    pub fn is_open(&self, element_id: &str) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.field.element_id == element_id)
    }

    /// Open `field`, displacing any other open field
    pub fn try_open(&mut self, field: FieldDescriptor) -> OpenOutcome {
        if self.is_open(&field.element_id) {
            return OpenOutcome::AlreadyOpen;
        }
        let reverted = self.close(EditState::Cancelled).map(|a| a.field);
        let state = match validate_transition(EditState::Closed, EditState::Open) {
            Ok(()) => EditState::Open,
            Err(_) => EditState::Closed,
        };
        let input = field.widget().initial_value();
        self.active = Some(ActiveEdit { field, input, state });
        OpenOutcome::Opened { reverted }
    }

    /// Update the input of the open editor
    pub fn set_input(&mut self, value: impl Into<String>) -> bool {
        match &mut self.active {
            Some(active) => {
                active.input = value.into();
                true
            }
            None => false,
        }
    }

    /// Close the session with a final state
    pub fn close(&mut self, outcome: EditState) -> Option<ActiveEdit> {
        let mut active = self.active.take()?;
        if validate_transition(active.state, outcome).is_ok() {
            active.state = outcome;
        }
        Some(active)
    }

    /// Drop the session without a transition; its element was replaced
    pub fn abandon(&mut self) {
        self.active = None;
    }
}

/// Confirmed commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Committed field
    pub field: FieldDescriptor,
    /// Value sent
    pub value: String,
}

fn write_input(el: &mut Element, value: &str) {
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
}

impl Controller {
    /// Show the editor of a bound field
    ///
    /// # Errors
    /// `ControllerError::Unbound` when `field_id` is not an editable field,
    /// `ControllerError::View` when its element is gone
    pub fn open_editor(&self, field_id: &str) -> Result<OpenOutcome, ControllerError> {
        self.with_scope(|scope| {
            let field = scope
                .bindings
                .field(field_id)
                .cloned()
                .ok_or_else(|| ControllerError::Unbound(field_id.to_string()))?;
            let outcome = scope.edit.try_open(field.clone());
            if let OpenOutcome::Opened { reverted } = &outcome {
                if let Some(previous) = reverted {
                    if let Ok(el) = scope.document.get_mut(&previous.element_id) {
                        previous.render_display(el, &previous.current_value);
                    }
                }
                match scope.document.get_mut(&field.element_id) {
                    Ok(el) => field.render_editor(el),
                    Err(e) => {
                        scope.edit.abandon();
                        return Err(e.into());
                    }
                }
                tracing::debug!(field = %field.element_id, "editor opened");
            }
            Ok(outcome)
        })
    }

    /// Type into the open editor
    ///
    /// # Errors
    /// `ControllerError::Validation` when no editor is open
    pub fn set_input(&self, value: &str) -> Result<(), ControllerError> {
        self.with_scope(|scope| {
            let input_id = match scope.edit.active() {
                Some(active) => format!("{}-input", active.field.element_id),
                None => return Err(ControllerError::Validation("no editor is open".into())),
            };
            scope.edit.set_input(value);
            if let Ok(el) = scope.document.get_mut(&input_id) {
                write_input(el, value);
            }
            Ok(())
        })
    }

    /// Close the editor without a request; returns whether one was open
    pub fn cancel_editor(&self) -> bool {
        self.with_scope(|scope| match scope.edit.close(EditState::Cancelled) {
            Some(active) => {
                if let Ok(el) = scope.document.get_mut(&active.field.element_id) {
                    active.field.render_display(el, &active.field.current_value);
                }
                true
            }
            None => false,
        })
    }

    /// Commit `value` for the open field `field_id`
    ///
    /// Without an open editor for that field nothing is sent and nothing is
    /// shown to the user.
    ///
    /// # Errors
    /// `ControllerError::Validation` on rejection, or transport failure.
    /// Either restores the previous value, is reported, and still refreshes
    /// the shown view so it reflects the server's state.
    #[tracing::instrument(skip(self, value))]
    pub async fn commit_editor(&self, field_id: &str, value: &str) -> Result<CommitOutcome, ControllerError> {
        let committed = self.with_scope(|scope| {
            if !scope.edit.is_open(field_id) {
                return None;
            }
            let active = scope.edit.close(EditState::Committed)?;
            let wire = active.field.wire_value(value);
            if let Ok(el) = scope.document.get_mut(field_id) {
                active.field.render_display(el, &wire);
            }
            Some((active.field, wire))
        });
        let Some((field, wire)) = committed else {
            tracing::debug!("commit without open editor ignored");
            return Err(ControllerError::Validation(format!("no editor open for #{field_id}")));
        };

        if let Err(e) = self
            .api
            .update_attribute(&field.resource, &field.attribute_key, &wire)
            .await
        {
            self.with_scope(|scope| {
                if let Ok(el) = scope.document.get_mut(&field.element_id) {
                    field.render_display(el, &field.current_value);
                }
            });
            let err = match e {
                ApiError::Rejected { message, .. } => ControllerError::Validation(message),
                other => ControllerError::from_api(other),
            };
            self.report(&err);
            if let Some(resource) = self.with_scope(|scope| scope.navigation.current.clone()) {
                self.refresh_after_commit(&resource).await;
            }
            return Err(err);
        }
        tracing::info!(resource = %field.resource, attribute = %field.attribute_key, "attribute updated");

        let current = self.with_scope(|scope| scope.navigation.current.clone());
        match current {
            Some(resource) => self.refresh_after_commit(&resource).await,
            None => {
                let region = self.config.results_region.clone();
                self.with_scope(|scope| {
                    if scope.document.contains(&field.element_id) {
                        if let Err(e) = scope.rebind(&self.binder, &field.element_id) {
                            tracing::warn!(error = %e, "rebind after commit failed");
                        }
                    }
                    if let Err(e) = scope.recompute(&region) {
                        tracing::warn!(error = %e, "aggregate recompute skipped");
                    }
                });
            }
        }

        Ok(CommitOutcome { field, value: wire })
    }

    /// Re-render the shown view after a commit, whatever its outcome
    async fn refresh_after_commit(&self, resource: &rcc_transport::ResourceRef) {
        // show_resource reports its own failure
        if let Err(e) = self.show_resource(resource).await {
            tracing::debug!(error = %e, "refresh after commit failed");
        }
    }

    /// Handle a click outside the open editor
    ///
    /// Commits the input through [`Controller::commit_editor`] only when its
    /// wire value differs from the committed value; an unchanged input
    /// cancels the editor and sends nothing.
    ///
    /// # Errors
    /// As [`Controller::commit_editor`]
    pub async fn commit_or_cancel(&self) -> Result<Option<CommitOutcome>, ControllerError> {
        let pending = self.with_scope(|scope| {
            scope
                .edit
                .active()
                .map(|a| (a.field.element_id.clone(), a.input.clone(), a.is_dirty()))
        });
        match pending {
            None => Ok(None),
            Some((_, _, false)) => {
                self.cancel_editor();
                Ok(None)
            }
            Some((field_id, input, true)) => self.commit_editor(&field_id, &input).await.map(Some),
        }
    }
}
