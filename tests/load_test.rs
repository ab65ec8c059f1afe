//! Concurrency tests: many first requests, one client construction.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use lazy_gateway::registry::{ClientContext, StaticServerList};
use lazy_gateway::Gateway;

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_requests_construct_once() {
    let backend = common::start_mock_backend("Hello from backend").await;
    let constructions = Arc::new(AtomicUsize::new(0));
    let counter = constructions.clone();

    let gateway = Gateway::builder(common::single_route_config("lazy", "/lazy/**", &[backend]))
        .client_factory("lazy", move || {
            // Slow factory widens the race window.
            std::thread::sleep(Duration::from_millis(200));
            counter.fetch_add(1, Ordering::SeqCst);
            ClientContext::builder("lazy")
                .server_list(StaticServerList::new([backend]))
                .build()
        })
        .build()
        .unwrap();
    let running = common::start_gateway(&gateway).await;

    let client = reqwest::Client::new();
    let concurrency = 32;
    let responses = join_all((0..concurrency).map(|_| {
        let client = client.clone();
        let url = running.url("/lazy/hello");
        async move { client.get(url).send().await }
    }))
    .await;

    let ok = responses
        .into_iter()
        .filter(|r| matches!(r, Ok(res) if res.status().is_success()))
        .count();
    assert_eq!(ok, concurrency);
    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    assert_eq!(gateway.registry().construction_count("lazy"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sustained_load_reuses_client() {
    let backend = common::start_mock_backend("ok").await;
    let config = common::single_route_config("web", "/**", &[backend]);
    let gateway = Gateway::from_config(config).unwrap();
    let running = common::start_gateway(&gateway).await;

    let client = reqwest::Client::new();
    let mut tasks = Vec::new();
    for _ in 0..10 {
        let client = client.clone();
        let url = running.url("/any/path");
        tasks.push(tokio::spawn(async move {
            let mut successes = 0;
            for _ in 0..20 {
                if let Ok(res) = client.get(&url).send().await {
                    if res.status().is_success() {
                        successes += 1;
                    }
                }
            }
            successes
        }));
    }

    let mut total = 0;
    for task in tasks {
        total += task.await.unwrap();
    }
    assert_eq!(total, 200);
    assert_eq!(gateway.registry().construction_count("web"), 1);
}
