//! End-to-end lazy client construction through the HTTP surface.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use lazy_gateway::registry::{ClientContext, EntryState, StaticServerList};
use lazy_gateway::Gateway;

mod common;

/// Auxiliary bean standing in for an application component of the client.
struct Foo {
    id: usize,
}

#[tokio::test]
async fn test_lazy_route_constructs_client_on_first_request() {
    let backend = common::start_programmable_backend(|path| async move {
        match path.as_str() {
            "/sample" => (200, "sample".to_string()),
            _ => (404, "not found".to_string()),
        }
    })
    .await;

    let foo_instances = Arc::new(AtomicUsize::new(0));
    let counter = foo_instances.clone();
    let config = common::single_route_config("lazy", "/lazy/**", &[backend]);
    let gateway = Gateway::builder(config)
        .client_factory("lazy", move || {
            let counter = counter.clone();
            ClientContext::builder("lazy")
                .server_list(StaticServerList::new([backend]))
                .bean("foo", move || Foo {
                    id: counter.fetch_add(1, Ordering::SeqCst),
                })
                .build()
        })
        .build()
        .unwrap();
    let registry = gateway.registry().clone();
    let running = common::start_gateway(&gateway).await;
    let client = reqwest::Client::new();

    assert_eq!(registry.construction_count("lazy"), 0);
    assert_eq!(foo_instances.load(Ordering::SeqCst), 0);
    assert_eq!(registry.state("lazy"), Some(EntryState::Unloaded));

    let res = client.get(running.url("/lazy/sample")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "sample");
    assert_eq!(registry.construction_count("lazy"), 1);
    assert_eq!(foo_instances.load(Ordering::SeqCst), 1);

    let res = client.get(running.url("/lazy/sample")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "sample");
    assert_eq!(registry.construction_count("lazy"), 1);
    assert_eq!(foo_instances.load(Ordering::SeqCst), 1);

    let ctx = registry.get_or_create("lazy").await.unwrap();
    assert_eq!(ctx.bean::<Foo>("foo").unwrap().id, 0);
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let backend = common::start_mock_backend("sample").await;
    let config = common::single_route_config("lazy", "/lazy/**", &[backend]);
    let gateway = Gateway::from_config(config).unwrap();
    let running = common::start_gateway(&gateway).await;

    let res = reqwest::get(running.url("/unknown/path")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "No matching route found");
    assert_eq!(gateway.registry().construction_count("lazy"), 0);
}

#[tokio::test]
async fn test_eager_client_loaded_before_traffic() {
    let backend = common::start_mock_backend("ok").await;
    let mut config = common::single_route_config("eager", "/eager/**", &[backend]);
    config.eager_load.clients.push("eager".into());
    let gateway = Gateway::from_config(config).unwrap();

    assert_eq!(gateway.registry().state("eager"), Some(EntryState::Loaded));
    assert_eq!(gateway.registry().construction_count("eager"), 1);

    let running = common::start_gateway(&gateway).await;
    let res = reqwest::get(running.url("/eager/anything")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(gateway.registry().construction_count("eager"), 1);
}
