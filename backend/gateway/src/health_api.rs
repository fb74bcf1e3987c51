//! Service and integration health endpoints.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::server::GatewayState;

/// Handler for `GET /`.
pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "pantry",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/api/v1",
    }))
}

/// Handler for `GET /health`.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "pantry",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Handler for `GET /api/v1/integrations/health`.
///
/// Reports which providers are wired in; it does not call them.
pub async fn integrations_health(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "ocr": state.pipeline.extractor_name(),
        "llm": state.pipeline.completer_name(),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::Value;

    use pantry_providers::{MockCompleter, MockExtractor};

    use crate::server::test_support::spawn_gateway;

    #[tokio::test]
    async fn health_routes_answer() {
        let base = spawn_gateway(
            Arc::new(MockExtractor::sample_receipt()),
            Arc::new(MockCompleter::canned()),
            1024,
        )
        .await;
        let client = reqwest::Client::new();

        let health: Value = client
            .get(format!("{base}/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");

        let integrations: Value = client
            .get(format!("{base}/api/v1/integrations/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(integrations["ok"], true);
        assert_eq!(integrations["ocr"], "mock");
        assert_eq!(integrations["llm"], "mock");

        let root = client.get(format!("{base}/")).send().await.unwrap();
        assert_eq!(root.status(), 200);
    }
}
