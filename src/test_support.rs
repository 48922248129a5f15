//! Shared fixtures for tests talking to a mocked Megaplan.

use megaplan_api::rate_limiter::RateLimiter;
use megaplan_api::{MegaplanClient, MegaplanConfig};
use mockito::{Mock, Server};
use serde_json::{json, Value};

/// Client against the mock server with pacing disabled.
pub fn client_for(server: &Server) -> MegaplanClient {
    let config = MegaplanConfig::new(server.url(), "test-token");
    MegaplanClient::new_with_limiter(config, RateLimiter::disabled()).expect("client builds")
}

/// Mocks a successful GET returning `{"data": data}`.
pub async fn mock_data(server: &mut Server, path: &str, data: Value) -> Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "data": data }).to_string())
        .create_async()
        .await
}
