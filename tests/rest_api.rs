//! REST gateway integration tests. Spawn the server and call endpoints with
//! reqwest.

use matchbook::api;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;

async fn spawn_app() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let app = api::create_router("test-venue");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, handle)
}

async fn post_order(client: &reqwest::Client, addr: SocketAddr, body: Value) -> reqwest::Response {
    client
        .post(format!("http://{}/orders", addr))
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let (addr, _handle) = spawn_app().await;
    let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn submit_limit_order_rests_open() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();
    let response = post_order(
        &client,
        addr,
        json!({
            "symbol": "rest1",
            "side": "BUY",
            "order_type": "LIMIT",
            "price": "99",
            "quantity": 10
        }),
    )
    .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["order"]["status"], "OPEN");
    assert_eq!(body["order"]["symbol"], "REST1");
    assert_eq!(body["trades"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn crossing_orders_trade_at_maker_price() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();
    post_order(
        &client,
        addr,
        json!({
            "symbol": "REST2", "side": "SELL", "order_type": "LIMIT",
            "price": "100", "quantity": 100
        }),
    )
    .await;
    let response = post_order(
        &client,
        addr,
        json!({
            "symbol": "REST2", "side": "BUY", "order_type": "LIMIT",
            "price": "101", "quantity": 100
        }),
    )
    .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["order"]["status"], "FILLED");
    let trades = body["trades"].as_array().unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0]["price"], "100");
    assert_eq!(trades[0]["quantity"], 100);
}

#[tokio::test]
async fn market_order_needs_no_price() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();
    let response = post_order(
        &client,
        addr,
        json!({
            "symbol": "REST3", "side": "SELL", "order_type": "MARKET",
            "quantity": 40
        }),
    )
    .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    // Empty book: nothing to take, remainder discarded.
    assert_eq!(body["order"]["status"], "PARTIALLY_FILLED");
    assert_eq!(body["trades"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn invalid_orders_are_rejected_with_400() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = post_order(
        &client,
        addr,
        json!({
            "symbol": "REST4", "side": "BUY", "order_type": "LIMIT",
            "price": "100", "quantity": 0
        }),
    )
    .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("quantity"));

    let response = post_order(
        &client,
        addr,
        json!({
            "symbol": "REST4", "side": "BUY", "order_type": "LIMIT",
            "quantity": 10
        }),
    )
    .await;
    assert_eq!(response.status(), 400);
    assert!(response.json::<Value>().await.unwrap()["error"]
        .as_str()
        .unwrap()
        .contains("price"));

    let response = post_order(
        &client,
        addr,
        json!({
            "symbol": "  ", "side": "SELL", "order_type": "IOC",
            "price": "100", "quantity": 10
        }),
    )
    .await;
    assert_eq!(response.status(), 400);
    assert!(response.json::<Value>().await.unwrap()["error"]
        .as_str()
        .unwrap()
        .contains("symbol"));
}

#[tokio::test]
async fn cancel_resting_then_cancel_again() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();
    let response = post_order(
        &client,
        addr,
        json!({
            "symbol": "REST5", "side": "BUY", "order_type": "LIMIT",
            "price": "95", "quantity": 10
        }),
    )
    .await;
    let body: Value = response.json().await.unwrap();
    let order_id = body["order"]["id"].as_u64().unwrap();

    let cancel = |id: u64| {
        let client = client.clone();
        async move {
            client
                .post(format!("http://{}/orders/cancel", addr))
                .json(&json!({ "symbol": "REST5", "order_id": id }))
                .send()
                .await
                .unwrap()
                .json::<Value>()
                .await
                .unwrap()
        }
    };

    assert_eq!(cancel(order_id).await["cancelled"], true);
    assert_eq!(cancel(order_id).await["cancelled"], false);
    // Unknown symbol is not an error either.
    let body = client
        .post(format!("http://{}/orders/cancel", addr))
        .json(&json!({ "symbol": "NOPE", "order_id": order_id }))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(body["cancelled"], false);
}

#[tokio::test]
async fn snapshot_appears_after_first_trade() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();
    let snapshot_url = format!("http://{}/snapshots?symbol=REST6", addr);

    let response = client.get(&snapshot_url).send().await.unwrap();
    assert_eq!(response.status(), 404);

    post_order(
        &client,
        addr,
        json!({
            "symbol": "REST6", "side": "SELL", "order_type": "LIMIT",
            "price": "100", "quantity": 30
        }),
    )
    .await;
    post_order(
        &client,
        addr,
        json!({
            "symbol": "REST6", "side": "BUY", "order_type": "LIMIT",
            "price": "100", "quantity": 30
        }),
    )
    .await;

    // The snapshot refresh is asynchronous; poll briefly.
    let mut snapshot = None;
    for _ in 0..100 {
        let response = client.get(&snapshot_url).send().await.unwrap();
        if response.status() == 200 {
            snapshot = Some(response.json::<Value>().await.unwrap());
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let snapshot = snapshot.expect("snapshot after trade");
    assert_eq!(snapshot["symbol"], "REST6");
    assert_eq!(snapshot["total_volume"], 30);
    assert_eq!(snapshot["vwap"], "100");
    assert_eq!(snapshot["last_trade_price"], "100");
}

#[tokio::test]
async fn stats_reports_engine_counters() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();
    post_order(
        &client,
        addr,
        json!({
            "symbol": "REST7", "side": "SELL", "order_type": "LIMIT",
            "price": "100", "quantity": 10
        }),
    )
    .await;
    post_order(
        &client,
        addr,
        json!({
            "symbol": "REST7", "side": "BUY", "order_type": "LIMIT",
            "price": "100", "quantity": 10
        }),
    )
    .await;

    let stats: Value = client
        .get(format!("http://{}/stats", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_orders"], 2);
    assert_eq!(stats["total_trades"], 1);
    assert_eq!(stats["active_books"], 1);
}
