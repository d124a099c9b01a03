use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::pool::LifecycleManager;
use crate::query::QueryDispatcher;
use axum::http::HeaderMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Header a caller may use to shorten the per-request query deadline.
pub const REQUEST_TIMEOUT_HEADER: &str = "x-request-timeout-ms";

/// Shared state injected into every handler.
pub struct AppState {
    pub lifecycle: Arc<LifecycleManager>,
    pub config: Config,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(lifecycle: Arc<LifecycleManager>, config: Config) -> Self {
        Self {
            lifecycle,
            config,
            started_at: Instant::now(),
        }
    }

    /// Waits for a ready engine and opens a dispatcher bound to this
    /// request's deadline. Waiting on an in-flight attach counts against the
    /// same deadline; giving up does not cancel the attach.
    pub async fn dispatcher(&self, headers: &HeaderMap) -> Result<QueryDispatcher> {
        let budget = self.request_budget(headers)?;
        let deadline = Instant::now() + budget;

        let handle = tokio::time::timeout(budget, self.lifecycle.acquire())
            .await
            .map_err(|_| GatewayError::EngineBusy {
                query: "acquire engine".to_string(),
                cause: format!("engine not ready within {}ms", budget.as_millis()),
            })??;

        Ok(QueryDispatcher::with_deadline(handle, deadline, budget))
    }

    fn request_budget(&self, headers: &HeaderMap) -> Result<Duration> {
        let configured = self.config.query_timeout;

        let Some(raw) = headers.get(REQUEST_TIMEOUT_HEADER) else {
            return Ok(configured);
        };

        let millis: u64 = raw
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .filter(|ms| *ms > 0)
            .ok_or_else(|| GatewayError::InvalidRequest {
                message: format!("{} must be a positive integer", REQUEST_TIMEOUT_HEADER),
            })?;

        Ok(configured.min(Duration::from_millis(millis)))
    }
}
