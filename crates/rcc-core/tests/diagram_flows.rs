//! Diagram expansion and unlinking

use pretty_assertions::assert_eq;
use rcc_core::{Activation, ControllerError, ExpandTarget, Placement, RenderContext, ResourceRef};
use rcc_test_utils::{controller, fixtures, FakeTransport, RecordingNotifier};
use rcc_transport::{ApiRequest, ApiResponse, Method};
use std::sync::Arc;
use tokio::sync::Semaphore;

fn root() -> ResourceRef {
    ResourceRef::new("Company", 1u64)
}

async fn diagram_page() -> (Arc<FakeTransport>, Arc<RecordingNotifier>, rcc_core::Controller) {
    let transport = FakeTransport::new();
    let notifier = RecordingNotifier::new();
    transport.on(Method::Get, "/diagram/Company/1", ApiResponse::result(fixtures::diagram(1)));
    let controller = controller(&transport, &notifier);
    let placed = controller.expand_node(&root(), ExpandTarget::TopLevel).await.unwrap();
    assert_eq!(placed, Placement::Rendered);
    (transport, notifier, controller)
}

#[tokio::test]
async fn top_level_diagram_becomes_the_render_context() {
    let (transport, _notifier, controller) = diagram_page().await;

    assert_eq!(controller.diagram().root(), Some(&root()));
    assert_eq!(
        controller.navigation().render_context,
        Some(RenderContext::Diagram { root: root() })
    );
    assert_eq!(controller.navigation().current, None);
    let requests = transport.requests();
    let ApiRequest::Diagram { in_diagram, .. } = &requests[0] else {
        panic!("expected a diagram request");
    };
    assert!(!in_diagram);
}

#[tokio::test]
async fn expanding_twice_renders_children_once() {
    let (transport, _notifier, controller) = diagram_page().await;
    transport
        .on(Method::Get, "/diagram/Market/3", ApiResponse::result(fixtures::diagram_children()))
        .on(Method::Get, "/diagram/Market/3", ApiResponse::result(fixtures::diagram_children()));

    for _ in 0..2 {
        let activation = controller.activate("node-Market-3").await.unwrap();
        assert_eq!(activation, Activation::Expanded(Placement::Rendered));
    }

    let html = controller.results_html().unwrap();
    assert_eq!(html.matches("id=\"node-Segment-8\"").count(), 1);
    let tree = controller.diagram();
    assert_eq!(tree.len(), 1);
    assert!(tree.is_expanded("node-Market-3"));
    assert_eq!(
        controller.document().get("node-Market-3").unwrap().attr("data-expanded"),
        Some("true")
    );

    let nested = transport
        .requests()
        .into_iter()
        .filter(|r| matches!(r, ApiRequest::Diagram { in_diagram: true, .. }))
        .count();
    assert_eq!(nested, 2);
}

#[tokio::test]
async fn group_filter_follows_the_rendered_diagram() {
    let transport = FakeTransport::new();
    let notifier = RecordingNotifier::new();
    transport
        .on(
            Method::Get,
            "/diagram/Company/1",
            ApiResponse::result(
                r#"<div class="diagram" data-resource="Company" data-id="1" data-group-id="5">
                     <div id="node-Market-3" class="diagram-node" data-resource="Market" data-id="3"></div>
                   </div>"#,
            ),
        )
        .on(Method::Get, "/diagram/Market/3", ApiResponse::result(fixtures::diagram_children()));
    let controller = controller(&transport, &notifier);

    controller.expand_node(&root(), ExpandTarget::TopLevel).await.unwrap();
    controller.expand_bound_node("node-Market-3").await.unwrap();

    let group = transport.requests().iter().find_map(|r| match r {
        ApiRequest::Diagram {
            in_diagram: true,
            group_id,
            ..
        } => group_id.clone(),
        _ => None,
    });
    assert_eq!(group.as_deref(), Some("5"));
}

#[tokio::test]
async fn stale_expansion_is_dropped() {
    let (transport, _notifier, controller) = diagram_page().await;
    let gate = Arc::new(Semaphore::new(0));
    transport
        .on_gated(
            Method::Get,
            "/diagram/Market/3",
            ApiResponse::result(fixtures::diagram_children()),
            gate.clone(),
        )
        .on(Method::Get, "/show/Company/1", ApiResponse::template(fixtures::company_view(1, "Acme")));

    let (expanded, ()) = tokio::join!(controller.expand_bound_node("node-Market-3"), async {
        controller.show_resource(&root()).await.unwrap();
        gate.add_permits(1);
    });

    assert_eq!(expanded.unwrap(), Placement::Stale);
    let html = controller.results_html().unwrap();
    assert!(!html.contains("node-Segment-8"));
    assert!(html.contains("resource-view"));
}

#[tokio::test]
async fn concurrent_expansion_of_one_node_is_ignored() {
    let (transport, notifier, controller) = diagram_page().await;
    let gate = Arc::new(Semaphore::new(0));
    transport.on_gated(
        Method::Get,
        "/diagram/Market/3",
        ApiResponse::result(fixtures::diagram_children()),
        gate.clone(),
    );

    let (first, second, ()) = tokio::join!(
        controller.expand_bound_node("node-Market-3"),
        controller.expand_bound_node("node-Market-3"),
        async { gate.add_permits(1) },
    );

    assert_eq!(first.unwrap(), Placement::Rendered);
    assert!(matches!(second, Err(ControllerError::InFlight(_))));
    assert_eq!(transport.count("GET /diagram/Market/3"), 1);
    assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn missing_container_fails_before_any_request() {
    let (transport, notifier, controller) = diagram_page().await;

    let err = controller
        .expand_node(
            &ResourceRef::new("Market", 3u64),
            ExpandTarget::Nested("node-Market-404".into()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ControllerError::View(_)));
    assert_eq!(transport.requests().len(), 1);
    assert_eq!(notifier.errors(), vec!["An error occurred.".to_string()]);
}

#[tokio::test]
async fn unlink_in_diagram_rerenders_the_diagram() {
    let (transport, _notifier, controller) = diagram_page().await;
    transport
        .on(Method::Get, "/diagram/Market/3", ApiResponse::result(fixtures::diagram_children()))
        .on(Method::Post, "/resources_delete", ApiResponse::result("ok"))
        .on(Method::Get, "/diagram/Company/1", ApiResponse::result(fixtures::diagram(1)));

    controller.expand_bound_node("node-Market-3").await.unwrap();
    let activation = controller.activate("unlink-8").await.unwrap();

    assert_eq!(activation, Activation::Unlinked(RenderContext::Diagram { root: root() }));
    let form = transport
        .requests()
        .into_iter()
        .find_map(|r| match r {
            ApiRequest::Unlink { form } => Some(form),
            _ => None,
        })
        .unwrap();
    assert_eq!(form.get("resource"), Some("Segment"));
    assert_eq!(form.get("id"), Some("8"));
    assert_eq!(form.get("association"), Some("Market"));
    assert_eq!(form.get("association_id"), Some("3"));
    assert_eq!(form.get("associationRef"), Some("market"));

    assert_eq!(transport.count("GET /diagram/Company/1"), 2);
    assert!(!controller.results_html().unwrap().contains("node-Segment-8"));
    assert!(controller.diagram().is_empty());
}

#[tokio::test]
async fn unlink_on_resource_view_reloads_the_owner() {
    let transport = FakeTransport::new();
    let notifier = RecordingNotifier::new();
    let view = r#"<div class="resource-view" data-resource="Company" data-id="1">
        <span id="market-4">Market 4
          <a id="unlink-4" class="delete-node" data-resource="Market" data-id="4"
             data-association="Company" data-association-id="1" data-association-name="markets">x</a>
        </span></div>"#;
    transport
        .on(Method::Get, "/show/Company/1", ApiResponse::template(view))
        .on(Method::Post, "/resources_delete", ApiResponse::default())
        .on(
            Method::Get,
            "/show/Company/1",
            ApiResponse::template(r#"<div class="resource-view" data-resource="Company" data-id="1"></div>"#),
        );
    let controller = controller(&transport, &notifier);
    controller.show_resource(&root()).await.unwrap();

    let context = controller.unlink("unlink-4").await.unwrap();
    assert_eq!(context, RenderContext::ResourceView { resource: root() });
    assert!(!controller.document().contains("market-4"));
}
