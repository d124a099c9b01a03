mod assets;
mod balances;
mod health;
mod ledgers;
mod params;
mod state;
mod stats;

pub use assets::asset_holders;
pub use balances::{account_balances, trustline_balance};
pub use health::health_check;
pub use ledgers::{get_ledger, list_ledgers};
pub use params::MAX_PAGE_LIMIT;
pub use state::{AppState, REQUEST_TIMEOUT_HEADER};
pub use stats::network_stats;

use axum::{http::Method, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/ledgers", get(list_ledgers))
        .route("/ledgers/:sequence", get(get_ledger))
        .route("/balances/:account_id", get(account_balances))
        .route(
            "/balances/:account_id/assets/:asset_code/:asset_issuer",
            get(trustline_balance),
        )
        .route("/assets/:code/holders", get(asset_holders))
        .route("/stats/network", get(network_stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pool::LifecycleManager;
    use crate::testing::{ready_manager, FixtureBinder};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_config() -> Config {
        Config::from_lookup(|_| None).unwrap()
    }

    async fn ready_router() -> Router {
        router(Arc::new(AppState::new(ready_manager().await, test_config())))
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_balances_share_one_pinned_sequence() {
        let app = ready_router().await;

        let (status, body) = get_json(&app, "/balances/GALICE").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["account_id"], "GALICE");
        assert_eq!(body["ledger_sequence"], 100);

        let balances = body["balances"].as_array().unwrap();
        // Native first, then USDC; EURC is zero at 100 and its 101 row is newer
        // than the native snapshot.
        assert_eq!(balances.len(), 2);
        assert_eq!(body["count"], 2);
        assert_eq!(balances[0]["asset_code"], "XLM");
        assert_eq!(balances[0]["balance"], 10000.0);
        assert_eq!(balances[0]["available"], 10000.0);
        assert_eq!(balances[1]["asset_code"], "USDC");
        assert_eq!(balances[1]["balance"], 25.0);
        assert_eq!(balances[1]["available"], 20.0);
        assert!(balances.iter().all(|b| b["ledger_sequence"] == 100));
    }

    #[tokio::test]
    async fn test_unknown_account_is_404() {
        let app = ready_router().await;

        let (status, body) = get_json(&app, "/balances/GNOBODY").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_invalid_account_is_400() {
        let app = ready_router().await;

        let (status, _) = get_json(&app, "/balances/G%27ALICE").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_trustline_lookup_uses_its_own_snapshot() {
        let app = ready_router().await;

        let (status, body) = get_json(&app, "/balances/GALICE/assets/EURC/GISSUER2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ledger_sequence"], 101);
        assert_eq!(body["balance"]["balance"], 99.0);

        let (status, _) = get_json(&app, "/balances/GALICE/assets/EURC/GISSUER9").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_recent_ledgers_newest_first() {
        let app = ready_router().await;

        let (status, body) = get_json(&app, "/ledgers?limit=2&sequence_min=950000").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["data"][0]["sequence"], 950_003);
        assert_eq!(body["data"][1]["sequence"], 950_002);
        assert_eq!(body["data"][0]["operation_count"], Value::Null);

        let (_, body) = get_json(&app, "/ledgers?limit=50&sequence_min=950002").await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["sequence"], 950_003);

        let (status, _) = get_json(&app, "/ledgers?limit=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ledger_detail() {
        let app = ready_router().await;

        let (status, body) = get_json(&app, "/ledgers/950001").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["ledger_hash"], "h950001");
        assert_eq!(body["data"]["total_xlm"], 100_000_000_000.0);
        assert_eq!(body["data"]["closed_at"], "2025-01-01T00:00:10Z");

        let (status, body) = get_json(&app, "/ledgers/1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_holders_ranked_at_latest_snapshot() {
        let app = ready_router().await;

        let (status, body) = get_json(&app, "/assets/USDC/holders").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ledger_sequence"], 130);
        let accounts: Vec<&str> = body["holders"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| h["account_id"].as_str().unwrap())
            .collect();
        assert_eq!(accounts, vec!["GBOB", "GDAVE", "GCAROL"]);

        let (_, body) = get_json(&app, "/assets/USDC/holders?issuer=GISSUER1&min_balance=10").await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["holders"][0]["account_id"], "GBOB");
        assert_eq!(body["holders"][0]["balance"], 90.0);

        let (status, _) = get_json(&app, "/assets/USDC/holders?min_balance=-1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get_json(&app, "/assets/USDC/holders?min_balance=1000000000000").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ledger_sequence"], 130);
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn test_network_stats_over_window() {
        let app = ready_router().await;

        let (status, body) = get_json(&app, "/stats/network").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ledger_sequence"], 950_003);
        assert_eq!(body["stats"]["ledger_count"], 5);
        assert_eq!(body["stats"]["first_ledger"], 949_999);
        assert_eq!(body["stats"]["last_ledger"], 950_003);
        assert_eq!(body["stats"]["total_transactions"], 80);
        assert_eq!(body["stats"]["successful_transactions"], 72);
        assert_eq!(body["stats"]["failed_transactions"], 8);
        assert_eq!(body["stats"]["avg_tx_per_ledger"], 16.0);
    }

    #[tokio::test]
    async fn test_health_reports_ready_engine() {
        let app = ready_router().await;

        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["connection"], "ready");
        assert_eq!(body["pool"]["max_size"], 2);
    }

    #[tokio::test]
    async fn test_failed_attach_is_reported_and_not_retried() {
        let binder = Arc::new(FixtureBinder::unreachable_catalog());
        let lifecycle = Arc::new(LifecycleManager::new(binder.clone(), 1));
        let app = router(Arc::new(AppState::new(lifecycle, test_config())));

        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connection"], "uninitialized");

        let (status, body) = get_json(&app, "/balances/GALICE").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "engine_unavailable");

        let (status, _) = get_json(&app, "/ledgers").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["connection"], "failed");
        assert!(body["error"].as_str().is_some());

        assert_eq!(binder.binds(), 1);
    }
}
