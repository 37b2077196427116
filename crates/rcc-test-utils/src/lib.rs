//! Testing utilities for RCC workspace
//!
//! Shared test doubles and page fixtures.

#![allow(missing_docs)]

use parking_lot::Mutex;
use rcc_core::{Controller, ControllerConfig, MenuEntry, Notice, Notifier, Severity};
use rcc_transport::{ApiRequest, ApiResponse, Method, Transport, TransportError};
use rcc_view::Document;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub use rcc_view;

struct Scripted {
    method: Method,
    path: String,
    reply: Result<ApiResponse, TransportError>,
    gate: Option<Arc<Semaphore>>,
}

/// Transport answering from a script of `(method, path) → reply` entries
///
/// Each entry answers one request, first match wins. Unscripted requests
/// fail with a network error. Every request is recorded.
#[derive(Default)]
pub struct FakeTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer the next `method path` request
    pub fn on(&self, method: Method, path: &str, reply: ApiResponse) -> &Self {
        self.push(method, path, Ok(reply), None)
    }

    /// Fail the next `method path` request at the transport level
    pub fn fail(&self, method: Method, path: &str, error: TransportError) -> &Self {
        self.push(method, path, Err(error), None)
    }

    /// Answer the next `method path` request once `gate` has a permit
    pub fn on_gated(&self, method: Method, path: &str, reply: ApiResponse, gate: Arc<Semaphore>) -> &Self {
        self.push(method, path, Ok(reply), Some(gate))
    }

    fn push(
        &self,
        method: Method,
        path: &str,
        reply: Result<ApiResponse, TransportError>,
        gate: Option<Arc<Semaphore>>,
    ) -> &Self {
        self.script.lock().push_back(Scripted {
            method,
            path: path.to_string(),
            reply,
            gate,
        });
        self
    }

    /// Requests seen so far
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// `METHOD /path` of every request seen so far
    pub fn calls(&self) -> Vec<String> {
        self.requests.lock().iter().map(ToString::to_string).collect()
    }

    /// How many requests matched `METHOD /path`
    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    /// Script entries not yet consumed
    pub fn pending(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn exchange(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().push(request.clone());
        let entry = {
            let mut script = self.script.lock();
            let method = request.method();
            let path = request.path();
            script
                .iter()
                .position(|s| s.method == method && s.path == path)
                .and_then(|idx| script.remove(idx))
        };
        let Some(entry) = entry else {
            return Err(TransportError::Network(format!("unscripted request: {request}")));
        };
        if let Some(gate) = entry.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;
            permit.forget();
        }
        entry.reply
    }
}

/// Notifier that keeps every notice
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.by_severity(Severity::Error)
    }

    pub fn warnings(&self) -> Vec<String> {
        self.by_severity(Severity::Warning)
    }

    fn by_severity(&self, severity: Severity) -> Vec<String> {
        self.notices
            .lock()
            .iter()
            .filter(|n| n.severity == severity)
            .map(|n| n.message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

/// Configuration used by controller tests
pub fn test_config() -> ControllerConfig {
    ControllerConfig::new()
        .with_menu_entry(MenuEntry::new("companies_index_btn", "Company").with_label("Companies"))
        .with_menu_entry(MenuEntry::new("markets_index_btn", "Market").with_label("Markets"))
}

/// Controller over the fake transport, starting from the page shell
pub fn controller(transport: &Arc<FakeTransport>, notifier: &Arc<RecordingNotifier>) -> Controller {
    Controller::new(test_config(), transport.clone(), notifier.clone())
}

/// Controller over the fake transport for a specific page
pub fn controller_with_page(
    transport: &Arc<FakeTransport>,
    notifier: &Arc<RecordingNotifier>,
    page: &str,
) -> Controller {
    Controller::with_document(test_config(), transport.clone(), notifier.clone(), Document::parse(page))
}

pub mod fixtures {
    //! Server markup as the console receives it

    /// Editable text field
    pub fn text_field(kind: &str, id: u64, attr: &str, value: &str) -> String {
        format!(
            r#"<span id="{kind}-{id}-{attr}" class="resource-data-field editable" data-resource="{kind}" data-id="{id}" data-attr="{attr}" data-attrname="{attr}" data-val="{value}">{attr}: {value}</span>"#
        )
    }

    /// Editable boolean field
    pub fn boolean_field(kind: &str, id: u64, attr: &str, value: &str) -> String {
        format!(
            r#"<span id="{kind}-{id}-{attr}" class="resource-data-field editable" data-resource="{kind}" data-id="{id}" data-attr="{attr}" data-attrname="{attr}" data-field-type="boolean" data-val="{value}">{attr}: {value}</span>"#
        )
    }

    /// Editable multi-line text field
    pub fn textarea_field(kind: &str, id: u64, attr: &str, value: &str) -> String {
        format!(
            r#"<span id="{kind}-{id}-{attr}" class="resource-data-field editable" data-resource="{kind}" data-id="{id}" data-attr="{attr}" data-attrname="{attr}" data-field-type="textarea" data-val="{value}">{attr}: {value}</span>"#
        )
    }

    /// Full resource view with two tabs
    pub fn company_view(id: u64, name: &str) -> String {
        format!(
            r##"<div class="resource-view" data-resource="Company" data-id="{id}">
                 <ul class="nav nav-tabs">
                   <li><a id="tab-info" class="nav-link active" data-target="pane-info">Info</a></li>
                   <li><a id="tab-markets" class="nav-link" data-target="pane-markets">Markets</a></li>
                 </ul>
                 <div id="pane-info" class="tab-pane active">{name_field}{public_field}</div>
                 <div id="pane-markets" class="tab-pane">
                   <form id="add-market" class="association" data-resource="Company" data-id="{id}"
                         data-association="Market" data-list-ref="#markets-{id}" data-association-name="markets"
                         data-reverse-association-name="companies">
                     <input name="name" value="">
                   </form>
                   <div id="markets-{id}"></div>
                 </div>
               </div>"##,
            name_field = text_field("Company", id, "name", name),
            public_field = boolean_field("Company", id, "public", "true"),
        )
    }

    /// Two aggregate containers with independent contributions
    pub fn revenue_view() -> String {
        r#"<div class="resource-view" data-resource="Company" data-id="1">
             <div id="segment-a" class="aggregate"><b class="aggregate-total"></b>
               <span class="contributing" data-val="10"></span>
               <span class="contributing" data-val="20"></span>
             </div>
             <div id="segment-b" class="aggregate"><b class="aggregate-total"></b>
               <span class="contributing" data-val="5"></span>
             </div>
           </div>"#
            .to_string()
    }

    /// Diagram rooted at a company with one expandable market node
    pub fn diagram(root_id: u64) -> String {
        format!(
            r#"<div class="diagram" data-resource="Company" data-id="{root_id}">
                 <div id="node-Market-3" class="diagram-node" data-resource="Market" data-id="3"
                      data-association-name="markets"></div>
               </div>"#
        )
    }

    /// Children of a diagram node
    pub fn diagram_children() -> String {
        r#"<div><div id="node-Segment-8" class="diagram-node" data-resource="Segment" data-id="8">Segment 8
             <a id="unlink-8" class="delete-node" data-resource="Segment" data-id="8"
                data-association="Market" data-association-id="3" data-association-name="market">x</a>
           </div></div>"#
            .to_string()
    }

    /// Association node as returned by a successful link
    pub fn market_node(id: u64, role: &str) -> String {
        format!(
            r#"<div id="node-Market-{id}" class="association-node" data-association-name="{role}">Market {id}</div>"#
        )
    }

    /// Error fragment the server renders for a cyclic link
    pub fn cycle_error() -> String {
        r#"<div class="server-error">Cannot link: Market 3 is already an ancestor.</div>"#.to_string()
    }
}
