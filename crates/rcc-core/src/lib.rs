//! RCC Core - interaction controller for the resource console
//!
//! Keeps a server-rendered admin page consistent while the user:
//! - edits single attributes in place (one editor at a time)
//! - links associations, creating the target first when needed and
//!   deleting it again if the link fails
//! - expands diagram nodes in place
//! - navigates between resource views, lists and the server-held back stack
//!
//! Aggregate totals are recomputed after every render, scoped to their own
//! container.
//!
//! # Example
//!
//! ```rust,ignore
//! use rcc_core::prelude::*;
//!
//! # async fn example() -> Result<(), ControllerError> {
//! let controller = Controller::connect(ControllerConfig::new().apply_env()?)?;
//! controller.show_resource(&ResourceRef::new("Company", 7u64)).await?;
//! controller.open_editor("company-7-name")?;
//! controller.commit_editor("company-7-name", "Acme Holdings").await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod aggregate;
pub mod binder;
pub mod config;
pub mod controller;
pub mod diagram;
pub mod dispatch;
pub mod edit;
pub mod error;
pub mod field;
pub mod generate;
pub mod navigation;
pub mod notify;
pub mod saga;
pub mod state_machine;

pub use aggregate::recompute_aggregates;
pub use binder::{AssociationForm, Binder, Binding, Bindings, UnlinkControl};
pub use config::{ControllerConfig, MenuEntry};
pub use controller::Controller;
pub use diagram::{DiagramNode, DiagramTree, ExpandTarget, Placement, RenderContext};
pub use dispatch::Activation;
pub use edit::{ActiveEdit, CommitOutcome, EditSession, OpenOutcome};
pub use error::{ConfigError, ControllerError, StateMachineError};
pub use field::{FieldDescriptor, FieldType, Widget};
pub use navigation::{BackOutcome, NavigationContext, ResourceList, TabPreference};
pub use notify::{Notice, Notifier, Severity, TracingNotifier};
pub use saga::{AssociationLinkRequest, LinkMode, LinkRefresh, RefreshPolicy, SagaReport, TargetSpec};
pub use state_machine::{EditState, Lifecycle, SagaState};

pub use rcc_transport::{FormData, GeneratorKind, ResourceId, ResourceRef};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the controller
    pub use crate::{
        AssociationLinkRequest, Controller, ControllerConfig, ControllerError, ExpandTarget,
        FormData, Notice, Notifier, ResourceRef, TargetSpec,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
