//! REST/WebSocket gateway over the exchange facade.
//!
//! Used by the binary and by integration tests. Create with
//! [`create_router`]. Uses `Extension` for state so the router is
//! `Router<()>` and works with `into_make_service()`.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, Query,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::events::EventKind;
use crate::market_data::MarketDataSnapshot;
use crate::types::{Order, OrderId, OrderType, Side, Trade};
use crate::Exchange;

/// Shared app state: one exchange per process plus a broadcast channel
/// feeding WebSocket market-data clients.
#[derive(Clone)]
pub struct AppState {
    pub exchange: Arc<Exchange>,
    broadcast_tx: broadcast::Sender<MarketDataSnapshot>,
}

/// Builds shared app state and bridges trade events into the WebSocket
/// broadcast. The market-data service subscribes before this bridge, so the
/// forwarded snapshot always reflects the trade that triggered it.
pub fn create_app_state(name: &str) -> AppState {
    let exchange = Arc::new(Exchange::new(name));
    let (broadcast_tx, _) = broadcast::channel(32);
    {
        let venue = Arc::clone(&exchange);
        let tx = broadcast_tx.clone();
        exchange.subscribe(EventKind::Trade, move |event| {
            let Some(trade) = event.trade() else { return };
            if let Some(snapshot) = venue.snapshot(trade.symbol()) {
                let _ = tx.send(snapshot);
            }
        });
    }
    AppState {
        exchange,
        broadcast_tx,
    }
}

/// Builds the REST/WebSocket router with the given state.
pub fn create_router_with_state(state: AppState) -> Router<()> {
    Router::new()
        .route("/health", get(health))
        .route("/orders", post(submit_order))
        .route("/orders/cancel", post(cancel_order))
        .route("/snapshots", get(get_snapshot))
        .route("/stats", get(get_stats))
        .route("/ws/market-data", get(ws_market_data))
        .layer(Extension(state))
}

/// Convenience for tests: new state plus router in one call.
pub fn create_router(name: &str) -> Router<()> {
    create_router_with_state(create_app_state(name))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[derive(serde::Deserialize)]
struct SubmitRequest {
    symbol: String,
    side: Side,
    order_type: OrderType,
    #[serde(default)]
    price: Option<Decimal>,
    quantity: u64,
}

async fn submit_order(
    Extension(state): Extension<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Response {
    let mut order = match Order::new(
        &request.symbol,
        request.side,
        request.order_type,
        request.price,
        request.quantity,
    ) {
        Ok(order) => order,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };
    let trades = state.exchange.submit(&mut order);

    #[derive(serde::Serialize)]
    struct Out {
        order: Order,
        trades: Vec<Trade>,
    }
    (StatusCode::OK, Json(Out { order, trades })).into_response()
}

#[derive(serde::Deserialize)]
struct CancelRequest {
    symbol: String,
    order_id: u64,
}

async fn cancel_order(
    Extension(state): Extension<AppState>,
    Json(request): Json<CancelRequest>,
) -> Response {
    let cancelled = state
        .exchange
        .cancel(&request.symbol, OrderId(request.order_id));

    #[derive(serde::Serialize)]
    struct Out {
        cancelled: bool,
    }
    (StatusCode::OK, Json(Out { cancelled })).into_response()
}

#[derive(serde::Deserialize)]
struct SnapshotQuery {
    symbol: String,
}

async fn get_snapshot(
    Extension(state): Extension<AppState>,
    Query(query): Query<SnapshotQuery>,
) -> Response {
    match state.exchange.snapshot(&query.symbol) {
        Some(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "no market data for symbol" })),
        )
            .into_response(),
    }
}

async fn get_stats(Extension(state): Extension<AppState>) -> Response {
    (StatusCode::OK, Json(state.exchange.stats())).into_response()
}

/// Message pushed to WebSocket market-data clients.
#[derive(serde::Serialize)]
struct WsSnapshot<'a> {
    #[serde(rename = "type")]
    msg_type: &'static str,
    #[serde(flatten)]
    snapshot: &'a MarketDataSnapshot,
}

async fn ws_market_data(
    Extension(state): Extension<AppState>,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| handle_market_data_socket(state, socket))
}

/// On connect: push the current snapshot of every symbol, then forward each
/// refresh until the client goes away.
async fn handle_market_data_socket(state: AppState, mut socket: WebSocket) {
    for snapshot in state.exchange.all_snapshots() {
        let msg = WsSnapshot {
            msg_type: "snapshot",
            snapshot: &snapshot,
        };
        let Ok(json) = serde_json::to_string(&msg) else { return };
        if socket.send(Message::Text(json.into())).await.is_err() {
            return;
        }
    }

    let mut rx = state.broadcast_tx.subscribe();
    loop {
        tokio::select! {
            update = rx.recv() => {
                match update {
                    Ok(snapshot) => {
                        let msg = WsSnapshot { msg_type: "snapshot", snapshot: &snapshot };
                        if let Ok(json) = serde_json::to_string(&msg) {
                            if socket.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => match msg {
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }
}
