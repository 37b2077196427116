//! Association linking, compensation and in-flight guards

use pretty_assertions::assert_eq;
use rcc_core::{
    AssociationLinkRequest, ControllerError, FormData, LinkRefresh, ResourceId, ResourceRef,
    SagaState, Severity, TargetSpec,
};
use rcc_test_utils::{controller, controller_with_page, fixtures, FakeTransport, RecordingNotifier};
use rcc_transport::{ApiRequest, ApiResponse, Method, TransportError};
use std::sync::Arc;
use tokio::sync::Semaphore;

fn company() -> ResourceRef {
    ResourceRef::new("Company", 1u64)
}

fn new_market() -> AssociationLinkRequest {
    AssociationLinkRequest::new(company(), "Market", TargetSpec::New(FormData::single("name", "EV")))
        .with_association_name("markets")
        .with_container("markets-1")
}

async fn company_page() -> (Arc<FakeTransport>, Arc<RecordingNotifier>, rcc_core::Controller) {
    let transport = FakeTransport::new();
    let notifier = RecordingNotifier::new();
    transport.on(Method::Get, "/show/Company/1", ApiResponse::template(fixtures::company_view(1, "Acme")));
    let controller = controller(&transport, &notifier);
    controller.show_resource(&company()).await.unwrap();
    (transport, notifier, controller)
}

#[tokio::test]
async fn failed_link_deletes_created_target_once() {
    let (transport, notifier, controller) = company_page().await;
    transport
        .on(Method::Post, "/new/Market", ApiResponse::created(9u64))
        .on(Method::Post, "/new_association/Company/Market/1/9", ApiResponse::error("Already linked"))
        .on(Method::Delete, "/resources/Market/9", ApiResponse::default());

    let err = controller.link_association(new_market()).await.unwrap_err();

    assert_eq!(err, ControllerError::Validation("Already linked".into()));
    assert_eq!(transport.count("DELETE /resources/Market/9"), 1);
    assert_eq!(notifier.errors(), vec!["Already linked".to_string()]);
    assert!(notifier.warnings().is_empty());
    assert_eq!(transport.pending(), 0);
}

#[tokio::test]
async fn failed_compensation_warns_after_original_error() {
    let (transport, notifier, controller) = company_page().await;
    transport
        .on(Method::Post, "/new/Market", ApiResponse::created(9u64))
        .on(Method::Post, "/new_association/Company/Market/1/9", ApiResponse::error("Already linked"))
        .fail(Method::Delete, "/resources/Market/9", TransportError::Network("down".into()));

    let err = controller.link_association(new_market()).await.unwrap_err();
    assert_eq!(err, ControllerError::Validation("Already linked".into()));

    let notices = notifier.notices();
    assert_eq!(notices.len(), 2);
    assert_eq!(notices[0].severity, Severity::Error);
    assert_eq!(notices[0].message, "Already linked");
    assert_eq!(notices[1].severity, Severity::Warning);
    assert!(notices[1].message.contains("Market 9"));
    assert_eq!(transport.count("DELETE /resources/Market/9"), 1);
}

#[tokio::test]
async fn rejected_creation_never_links() {
    let (transport, notifier, controller) = company_page().await;
    transport.on(Method::Post, "/new/Market", ApiResponse::error("Name is required"));

    let err = controller.link_association(new_market()).await.unwrap_err();
    assert_eq!(err, ControllerError::Creation("Name is required".into()));
    assert_eq!(
        transport.calls(),
        vec!["GET /show/Company/1".to_string(), "POST /new/Market".to_string()]
    );
    assert_eq!(notifier.errors(), vec!["Name is required".to_string()]);
}

#[tokio::test]
async fn existing_target_is_never_deleted() {
    let (transport, _notifier, controller) = company_page().await;
    transport.on(Method::Post, "/new_association/Company/Market/1/4", ApiResponse::error("Already linked"));

    let request = AssociationLinkRequest::new(company(), "Market", TargetSpec::Existing(ResourceId::new("4")));
    controller.link_association(request).await.unwrap_err();
    assert_eq!(transport.count("DELETE /resources/Market/4"), 0);
}

#[tokio::test]
async fn cycle_is_reported_and_compensated() {
    let (transport, notifier, controller) = company_page().await;
    transport
        .on(Method::Post, "/new/Market", ApiResponse::created(9u64))
        .on(
            Method::Post,
            "/new_association/Company/Market/1/9",
            ApiResponse::template(fixtures::cycle_error()),
        )
        .on(Method::Delete, "/resources/Market/9", ApiResponse::default());

    let err = controller.link_association(new_market()).await.unwrap_err();
    assert!(err.is_cycle());
    assert_eq!(transport.count("DELETE /resources/Market/9"), 1);
    assert_eq!(
        notifier.errors(),
        vec!["Cannot link: Market 3 is already an ancestor.".to_string()]
    );
    assert!(controller.region_html("markets-1").unwrap().contains("server-error"));
}

#[tokio::test]
async fn cycle_fragment_is_bound_when_shown() {
    let (transport, _notifier, controller) = company_page().await;
    let fragment = format!(
        r#"<div class="server-error">Cannot link: Market 3 is already an ancestor. {}</div>"#,
        fixtures::text_field("Market", 3, "name", "EV")
    );
    transport.on(
        Method::Post,
        "/new_association/Company/Market/1/3",
        ApiResponse::template(fragment),
    );

    let request = AssociationLinkRequest::new(company(), "Market", TargetSpec::Existing(ResourceId::new("3")))
        .with_container("markets-1");
    let err = controller.link_association(request).await.unwrap_err();

    assert!(err.is_cycle());
    assert!(controller.region_html("markets-1").unwrap().contains("Market-3-name"));
    assert!(controller.bindings().field("Market-3-name").is_some());
}

#[tokio::test]
async fn submitted_form_creates_links_and_clears() {
    let (transport, notifier, controller) = company_page().await;
    transport
        .on(Method::Post, "/new/Market", ApiResponse::created(9u64))
        .on(
            Method::Post,
            "/new_association/Company/Market/1/9",
            ApiResponse::template(fixtures::market_node(9, "companies")),
        );

    controller.fill_form("add-market", "name", "EV").unwrap();
    let report = controller.submit_association_form("add-market").await.unwrap();

    assert!(report.created);
    assert_eq!(report.target, ResourceRef::new("Market", 9u64));
    assert_eq!(report.refresh, LinkRefresh::Reloaded("markets-1".into()));
    assert_eq!(
        report.history,
        vec![SagaState::Idle, SagaState::CreatingTarget, SagaState::Linking, SagaState::Committed]
    );
    assert!(controller.region_html("markets-1").unwrap().contains("Market 9"));

    let requests = transport.requests();
    let created_with = requests.iter().find_map(|r| match r {
        ApiRequest::CreateResource { form, .. } => Some(form.clone()),
        _ => None,
    });
    assert_eq!(created_with.unwrap().get("name"), Some("EV"));
    let link_form = requests.iter().find_map(|r| match r {
        ApiRequest::LinkAssociation { form, .. } => Some(form.clone()),
        _ => None,
    });
    let link_form = link_form.unwrap();
    assert_eq!(
        link_form.pairs().to_vec(),
        vec![
            ("name".to_string(), "EV".to_string()),
            ("_association_name".to_string(), "markets".to_string()),
        ]
    );

    let input = controller
        .document()
        .select_first(&rcc_view::Selector::parse("input").unwrap())
        .and_then(|el| el.attr("value").map(str::to_string));
    assert_eq!(input.as_deref(), Some(""));
    assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn matching_node_is_patched_in_place() {
    let transport = FakeTransport::new();
    let notifier = RecordingNotifier::new();
    let page = r#"<body><div id="results">
        <div id="markets-1"><div id="node-Market-9" data-association-name="companies">stale</div></div>
      </div></body>"#;
    let controller = controller_with_page(&transport, &notifier, page);
    transport.on(
        Method::Post,
        "/new_association/Company/Market/1/9",
        ApiResponse::template(fixtures::market_node(9, "companies")),
    );

    let request = AssociationLinkRequest::new(company(), "Market", TargetSpec::Existing(ResourceId::new("9")))
        .with_reverse_association_name("companies")
        .with_container("markets-1");
    let report = controller.link_association(request).await.unwrap();

    assert_eq!(report.refresh, LinkRefresh::Patched("node-Market-9".into()));
    assert!(!report.created);
    let html = controller.region_html("markets-1").unwrap();
    assert!(html.contains("Market 9"));
    assert!(!html.contains("stale"));
    assert_eq!(html.matches("id=\"node-Market-9\"").count(), 1);
}

#[tokio::test]
async fn duplicate_submission_is_ignored_while_in_flight() {
    let (transport, notifier, controller) = company_page().await;
    let gate = Arc::new(Semaphore::new(0));
    transport.on_gated(
        Method::Post,
        "/new_association/Company/Market/1/4",
        ApiResponse::template(fixtures::market_node(4, "companies")),
        gate.clone(),
    );

    let request = || {
        AssociationLinkRequest::new(company(), "Market", TargetSpec::Existing(ResourceId::new("4")))
            .with_container("markets-1")
    };
    let (first, second, ()) = tokio::join!(
        controller.link_association(request()),
        controller.link_association(request()),
        async { gate.add_permits(1) },
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(ControllerError::InFlight(_))));
    assert_eq!(transport.count("POST /new_association/Company/Market/1/4"), 1);
    assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn link_into_replaced_view_is_not_rendered() {
    let (transport, _notifier, controller) = company_page().await;
    let gate = Arc::new(Semaphore::new(0));
    transport
        .on_gated(
            Method::Post,
            "/new_association/Company/Market/1/4",
            ApiResponse::template(fixtures::market_node(4, "companies")),
            gate.clone(),
        )
        .on(Method::Get, "/show/Company/2", ApiResponse::template(fixtures::company_view(2, "Globex")));

    let request = AssociationLinkRequest::new(company(), "Market", TargetSpec::Existing(ResourceId::new("4")))
        .with_container("markets-1");
    let (linked, ()) = tokio::join!(controller.link_association(request), async {
        controller
            .show_resource(&ResourceRef::new("Company", 2u64))
            .await
            .unwrap();
        gate.add_permits(1);
    });

    assert_eq!(linked.unwrap().refresh, LinkRefresh::Stale);
    assert!(!controller.results_html().unwrap().contains("Market 4"));
}

#[tokio::test]
async fn update_form_without_selection_is_rejected_locally() {
    let transport = FakeTransport::new();
    let notifier = RecordingNotifier::new();
    let page = r#"<body><div id="results">
        <form id="pick-market" class="update-association" data-resource="Company" data-id="1"
              data-association="Market" data-list-ref="markets-1">
          <select name="id"><option value="">--</option><option value="4">Market 4</option></select>
        </form>
        <div id="markets-1"></div>
      </div></body>"#;
    let controller = controller_with_page(&transport, &notifier, page);

    let err = controller.submit_association_form("pick-market").await.unwrap_err();
    assert!(matches!(err, ControllerError::Validation(_)));
    assert!(transport.requests().is_empty());

    transport.on(
        Method::Post,
        "/new_association/Company/Market/1/4",
        ApiResponse::template(fixtures::market_node(4, "companies")),
    );
    controller.fill_form("pick-market", "id", "4").unwrap();
    let report = controller.submit_association_form("pick-market").await.unwrap();
    assert!(!report.created);
    assert_eq!(report.refresh, LinkRefresh::Reloaded("markets-1".into()));
}
