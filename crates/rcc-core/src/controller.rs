//! The interaction controller
//!
//! Owns the page, its bindings and every piece of per-view state:
//! - the single edit session
//! - the navigation context (current resource, active tab)
//! - the diagram expansion tree
//! - in-flight guards for sagas and expansions
//!
//! All of it sits behind one mutex. Operations take the lock only for
//! synchronous steps and never hold it across a request, so responses that
//! arrive for a region that has since been replaced are detected and
//! dropped instead of being written into the wrong place.

use crate::aggregate::recompute_aggregates;
use crate::binder::{Binder, Bindings};
use crate::config::ControllerConfig;
use crate::diagram::DiagramTree;
use crate::edit::EditSession;
use crate::error::ControllerError;
use crate::navigation::{restore_tab, NavigationContext, TabPreference};
use crate::notify::{Notice, Notifier, TracingNotifier};
use parking_lot::Mutex;
use rcc_transport::{HttpTransport, ResourceApi, Transport};
use rcc_view::{Document, Node, ViewError};
use std::collections::HashSet;
use std::sync::Arc;

/// Per-view mutable state
#[derive(Debug)]
pub(crate) struct ViewScope {
    pub(crate) document: Document,
    pub(crate) bindings: Bindings,
    pub(crate) edit: EditSession,
    pub(crate) navigation: NavigationContext,
    pub(crate) diagram: DiagramTree,
    pub(crate) in_flight: HashSet<String>,
    /// Bumped every time the results region is replaced
    pub(crate) generation: u64,
}

impl ViewScope {
    fn new(document: Document) -> Self {
        Self {
            document,
            bindings: Bindings::new(),
            edit: EditSession::new(),
            navigation: NavigationContext::default(),
            diagram: DiagramTree::default(),
            in_flight: HashSet::new(),
            generation: 0,
        }
    }

    /// Bind `scope_id` and drop per-view state for elements that are gone
    pub(crate) fn rebind(&mut self, binder: &Binder, scope_id: &str) -> Result<usize, ViewError> {
        let registered = binder.bind(&mut self.bindings, &mut self.document, scope_id)?;
        let live = self.document.root().ids();
        self.diagram.retain_live(&live);
        if let Some(active) = self.edit.active() {
            if !live.contains(&active.field.element_id) {
                tracing::debug!(field = %active.field.element_id, "editor element replaced, closing session");
                self.edit.abandon();
            }
        }
        Ok(registered)
    }

    /// Recompute aggregates under `scope_id`
    pub(crate) fn recompute(&mut self, scope_id: &str) -> Result<usize, ViewError> {
        Ok(recompute_aggregates(self.document.get_mut(scope_id)?))
    }

    /// Replace the whole results region
    ///
    /// The region stays hidden until content is bound, the tab restored and
    /// aggregates recomputed.
    pub(crate) fn render_region(
        &mut self,
        binder: &Binder,
        region_id: &str,
        nodes: Vec<Node>,
        tab: TabPreference,
    ) -> Result<(), ViewError> {
        self.edit.abandon();
        self.generation += 1;
        {
            let region = self.document.get_mut(region_id)?;
            region.set_attr("hidden", "hidden");
            region.children = nodes;
        }
        self.rebind(binder, region_id)?;
        self.navigation.active_tab = restore_tab(self.document.get_mut(region_id)?, &tab);
        self.recompute(region_id)?;
        self.document.get_mut(region_id)?.remove_attr("hidden");
        Ok(())
    }

    /// Replace the children of one element and bind them
    pub(crate) fn render_into(
        &mut self,
        binder: &Binder,
        target_id: &str,
        nodes: Vec<Node>,
    ) -> Result<(), ViewError> {
        self.document.replace_children(target_id, nodes)?;
        self.rebind(binder, target_id)?;
        Ok(())
    }

    /// Claim an in-flight slot; false when already claimed
    pub(crate) fn claim(&mut self, key: &str) -> bool {
        self.in_flight.insert(key.to_string())
    }

    /// Release an in-flight slot
    pub(crate) fn release(&mut self, key: &str) {
        self.in_flight.remove(key);
    }
}

/// Client-side interaction controller
pub struct Controller {
    pub(crate) config: ControllerConfig,
    pub(crate) api: ResourceApi,
    pub(crate) binder: Binder,
    pub(crate) notifier: Arc<dyn Notifier>,
    scope: Mutex<ViewScope>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Create controller over a transport, starting from the configured
    /// page shell
    #[must_use]
    pub fn new(
        config: ControllerConfig,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let document = Document::parse(&config.page_shell());
        Self::with_document(config, transport, notifier, document)
    }

    /// Create controller for an existing page
    #[must_use]
    pub fn with_document(
        config: ControllerConfig,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
        document: Document,
    ) -> Self {
        let binder = Binder::new(config.main_menu.clone());
        let mut scope = ViewScope::new(document);
        if scope.document.root().id().is_none() {
            scope.document.root_mut().set_attr("id", "rcc-page");
        }
        let root_id = scope.document.root().id().unwrap_or("rcc-page").to_string();
        if let Err(e) = scope.rebind(&binder, &root_id) {
            tracing::warn!(error = %e, "initial bind failed");
        }
        if let Ok(region) = scope.document.get_mut(&config.results_region) {
            recompute_aggregates(region);
        }
        tracing::info!(bindings = scope.bindings.len(), "controller ready");
        Self {
            api: ResourceApi::new(transport),
            binder,
            notifier,
            config,
            scope: Mutex::new(scope),
        }
    }

    /// Create controller talking HTTP to `config.base_url`, notifying
    /// through the log
    ///
    /// # Errors
    /// `ControllerError::Config` for invalid settings,
    /// `ControllerError::Transport` when the client cannot be built
    pub fn connect(config: ControllerConfig) -> Result<Self, ControllerError> {
        config.validate()?;
        let transport = HttpTransport::new(&config.base_url, config.timeout())?;
        Ok(Self::new(config, Arc::new(transport), Arc::new(TracingNotifier)))
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Snapshot of the page
    #[must_use]
    pub fn document(&self) -> Document {
        self.scope.lock().document.clone()
    }

    /// Markup inside an element
    ///
    /// # Errors
    /// `ControllerError::View` when the element is absent
    pub fn region_html(&self, id: &str) -> Result<String, ControllerError> {
        Ok(self.scope.lock().document.inner_html(id)?)
    }

    /// Markup of the results region
    ///
    /// # Errors
    /// `ControllerError::View` when the region is absent
    pub fn results_html(&self) -> Result<String, ControllerError> {
        self.region_html(&self.config.results_region)
    }

    /// Snapshot of the bindings
    #[must_use]
    pub fn bindings(&self) -> Bindings {
        self.scope.lock().bindings.clone()
    }

    /// Snapshot of the navigation context
    #[must_use]
    pub fn navigation(&self) -> NavigationContext {
        self.scope.lock().navigation.clone()
    }

    /// Snapshot of the diagram tree
    #[must_use]
    pub fn diagram(&self) -> DiagramTree {
        self.scope.lock().diagram.clone()
    }

    /// Element id of the field whose editor is open
    #[must_use]
    pub fn active_editor(&self) -> Option<String> {
        self.scope
            .lock()
            .edit
            .active()
            .map(|a| a.field.element_id.clone())
    }

    /// Run a synchronous step against the view state
    pub(crate) fn with_scope<R>(&self, f: impl FnOnce(&mut ViewScope) -> R) -> R {
        let mut guard = self.scope.lock();
        f(&mut guard)
    }

    /// Tell the user about a failure
    pub(crate) fn report(&self, err: &ControllerError) {
        match err {
            ControllerError::Validation(message)
            | ControllerError::Creation(message)
            | ControllerError::Cycle(message) => {
                tracing::info!(error = %err, "operation rejected");
                self.notifier.notify(Notice::error(message.clone()));
            }
            ControllerError::Transport(e) => {
                tracing::error!(error = %e, "exchange failed");
                self.notifier
                    .notify(Notice::error(self.config.generic_failure_message.clone()));
            }
            ControllerError::View(e) => {
                tracing::error!(error = %e, "view update failed");
                self.notifier
                    .notify(Notice::error(self.config.generic_failure_message.clone()));
            }
            ControllerError::Config(e) => {
                self.notifier.notify(Notice::error(e.to_string()));
            }
            ControllerError::InFlight(_) | ControllerError::Unbound(_) => {
                tracing::debug!(error = %err, "ignored interaction");
            }
        }
    }

    /// Report and hand the error back
    pub(crate) fn fail<T>(&self, err: ControllerError) -> Result<T, ControllerError> {
        self.report(&err);
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MenuEntry;
    use rcc_transport::{ApiRequest, ApiResponse, TransportError};

    mockall::mock! {
        Sink {}
        impl Notifier for Sink {
            fn notify(&self, notice: Notice);
        }
    }

    struct Offline;

    #[async_trait::async_trait]
    impl Transport for Offline {
        async fn exchange(&self, _request: ApiRequest) -> Result<ApiResponse, TransportError> {
            Err(TransportError::Network("offline".into()))
        }
    }

    #[test]
    fn shell_is_bound_on_start() {
        let config = ControllerConfig::new().with_menu_entry(MenuEntry::new("companies_index_btn", "Company"));
        let controller = Controller::new(config, Arc::new(Offline), Arc::new(TracingNotifier));
        let bindings = controller.bindings();
        assert_eq!(bindings.list_kind("companies_index_btn"), Some("Company"));
        assert_eq!(bindings.back_controls().count(), 1);
        assert_eq!(controller.results_html().unwrap(), "");
    }

    #[test]
    fn render_region_restores_visibility_and_generation() {
        let controller =
            Controller::new(ControllerConfig::new(), Arc::new(Offline), Arc::new(TracingNotifier));
        let binder = controller.binder.clone();
        controller.with_scope(|scope| {
            let nodes = rcc_view::Fragment::parse("<p>hi</p>").into_nodes();
            scope
                .render_region(&binder, "results", nodes, TabPreference::First)
                .unwrap();
            assert_eq!(scope.generation, 1);
            assert!(!scope.document.get("results").unwrap().has_attr("hidden"));
        });
        assert_eq!(controller.results_html().unwrap(), "<p>hi</p>");
    }

    #[test]
    fn in_flight_slots_are_exclusive() {
        let controller =
            Controller::new(ControllerConfig::new(), Arc::new(Offline), Arc::new(TracingNotifier));
        controller.with_scope(|scope| {
            assert!(scope.claim("expand:Company/1"));
            assert!(!scope.claim("expand:Company/1"));
            scope.release("expand:Company/1");
            assert!(scope.claim("expand:Company/1"));
        });
    }

    #[test]
    fn transport_failure_shows_generic_message() {
        let mut sink = MockSink::new();
        sink.expect_notify()
            .withf(|notice| notice.message == "An error occurred." && notice.helper.is_none())
            .times(1)
            .return_const(());
        let controller = Controller::new(ControllerConfig::new(), Arc::new(Offline), Arc::new(sink));

        let err = tokio_test::block_on(controller.show_resource(&crate::ResourceRef::new("Company", 1u64)))
            .unwrap_err();
        assert!(matches!(err, ControllerError::Transport(_)));
    }

    #[test]
    fn ignored_interactions_notify_nobody() {
        let mut sink = MockSink::new();
        sink.expect_notify().never();
        let controller = Controller::new(ControllerConfig::new(), Arc::new(Offline), Arc::new(sink));

        let err = tokio_test::block_on(controller.activate("missing")).unwrap_err();
        assert_eq!(err, ControllerError::Unbound("missing".into()));
        controller.report(&ControllerError::InFlight("expand:Company/1".into()));
    }
}
