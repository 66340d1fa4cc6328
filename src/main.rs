//! Venue binary: starts the exchange and serves the REST/WebSocket gateway.

use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    let name = std::env::var("EXCHANGE_NAME").unwrap_or_else(|_| "matchbook".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let state = matchbook::api::create_app_state(&name);
    let exchange = state.exchange.clone();
    let app = matchbook::api::create_router_with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("bind");
    eprintln!("exchange [{}] listening on http://{}", exchange.name(), addr);
    axum::serve(listener, app).await.expect("serve");
}
