//! Control Surface
//!
//! Thin HTTP layer over `Engine`. Every endpoint answers with the same
//! `{success, data, error}` envelope; engine errors map to 4xx/5xx codes
//! and never escape as raw failures.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::arbitrage::dispatcher::DispatchDecision;
use crate::arbitrage::orchestrator::ScanCycleResult;
use crate::engine::{Engine, EngineStatus, HealthReport, StrategyToggle};
use crate::error::EngineError;
use crate::stats::StatsSnapshot;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self { success: true, data: Some(data), error: None })
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::UnknownStrategy(_) | EngineError::NoSuchOpportunity(_) => StatusCode::NOT_FOUND,
            EngineError::AlreadyRunning | EngineError::NotRunning => StatusCode::CONFLICT,
            EngineError::LiveModeUnavailable | EngineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!("API error ({}): {}", status, self);
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, EngineError>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StartRequest {
    pub dry_run: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExecuteRequest {
    pub opportunity_index: Option<usize>,
}

/// An absent or blank body means "all defaults"; anything else must parse.
fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, EngineError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| EngineError::InvalidRequest(e.to_string()))
}

async fn get_status(State(engine): State<Engine>) -> Json<ApiResponse<EngineStatus>> {
    ApiResponse::ok(engine.status().await)
}

async fn get_health(State(engine): State<Engine>) -> Json<ApiResponse<HealthReport>> {
    ApiResponse::ok(engine.health().await)
}

async fn post_start(State(engine): State<Engine>, body: Bytes) -> ApiResult<EngineStatus> {
    let req: StartRequest = optional_body(&body)?;
    Ok(ApiResponse::ok(engine.start(req.dry_run).await?))
}

async fn post_stop(State(engine): State<Engine>) -> ApiResult<StatsSnapshot> {
    Ok(ApiResponse::ok(engine.stop().await?))
}

async fn post_toggle(
    State(engine): State<Engine>,
    Path(name): Path<String>,
) -> ApiResult<StrategyToggle> {
    Ok(ApiResponse::ok(engine.toggle_strategy(&name)?))
}

async fn post_execute(State(engine): State<Engine>, body: Bytes) -> ApiResult<DispatchDecision> {
    let req: ExecuteRequest = optional_body(&body)?;
    Ok(ApiResponse::ok(engine.execute(req.opportunity_index).await?))
}

async fn post_scan(State(engine): State<Engine>) -> Json<ApiResponse<ScanCycleResult>> {
    info!("Manual scan requested");
    ApiResponse::ok(engine.scan_once().await)
}

pub fn routes() -> Router<Engine> {
    Router::new()
        .route("/status", get(get_status))
        .route("/health", get(get_health))
        .route("/start", post(post_start))
        .route("/stop", post(post_stop))
        .route("/strategy/:name/toggle", post(post_toggle))
        .route("/execute", post(post_execute))
        .route("/scan", post(post_scan))
}

/// Full application: `/api/*` routes with permissive CORS.
pub fn router(engine: Engine) -> Router {
    Router::new()
        .nest("/api", routes())
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::costs::FixedCostModel;
    use crate::arbitrage::dispatcher::tests::MockExecution;
    use crate::arbitrage::ExecutionMechanism;
    use crate::arbitrage::quoter::tests::MockQuoteSource;
    use crate::arbitrage::scanners::fixtures::stable_market;
    use crate::config::EngineSettings;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use rust_decimal_macros::dec;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app() -> Router {
        app_with(true, None)
    }

    fn app_with(dry_run: bool, executor: Option<Arc<dyn ExecutionMechanism>>) -> Router {
        let settings = EngineSettings {
            scan_interval: Duration::from_millis(50),
            cooldown: Duration::from_millis(1000),
            cooldown_backoff_max: None,
            min_profit_usd: dec!(0.0001),
            top_n: 5,
            quote_timeout: Duration::from_millis(50),
            dry_run,
            trade_history: 50,
            activity_log: 100,
        };
        let engine = Engine::new(
            &settings,
            vec![stable_market()],
            Arc::new(FixedCostModel::uniform(dec!(0.0001))),
            Arc::new(MockQuoteSource::with_fallback_bps(10_010)),
            executor,
        );
        router(engine)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_and_status() {
        let app = app();

        let (status, json) = call(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["mode"], "DRY_RUN");
        assert_eq!(json["data"]["uptimeSecs"], 0);

        let (status, json) = call(&app, "GET", "/api/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["running"], false);
        assert_eq!(json["data"]["strategies"]["triangular"], true);
    }

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let app = app();

        let (_, json) = call(&app, "POST", "/api/strategy/triangular/toggle", None).await;
        assert_eq!(json["data"]["enabled"], false);
        let (_, json) = call(&app, "POST", "/api/strategy/triangular/toggle", None).await;
        assert_eq!(json["data"]["enabled"], true);

        let (status, json) = call(&app, "POST", "/api/strategy/sandwich/toggle", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("sandwich"));
    }

    #[tokio::test]
    async fn test_start_stop_endpoints() {
        let app = app();

        let (status, json) = call(&app, "POST", "/api/start", Some(r#"{"dryRun": true}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["running"], true);

        let (status, _) = call(&app, "POST", "/api/start", None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, json) = call(&app, "POST", "/api/stop", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["dispatch_attempts"], 0);

        let (status, _) = call(&app, "POST", "/api/stop", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_live_start_rejected_without_executor() {
        let app = app();
        let (status, json) = call(&app, "POST", "/api/start", Some(r#"{"dryRun": false}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_scan_then_execute_in_dry_run() {
        let app = app();

        let (status, json) = call(&app, "POST", "/api/execute", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);

        let (status, json) = call(&app, "POST", "/api/scan", None).await;
        assert_eq!(status, StatusCode::OK);
        let retained = json["data"]["opportunities"].as_array().unwrap().len();
        assert!(retained > 0 && retained <= 5);

        let (status, json) = call(&app, "POST", "/api/execute", Some(r#"{"opportunityIndex": 0}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["decision"], "skipped");
        assert_eq!(json["data"]["detail"]["reason"], "dry_run");
    }

    #[tokio::test]
    async fn test_malformed_start_body_is_rejected() {
        // live-capable and configured for LIVE: a misread body must not start it
        let app = app_with(false, Some(Arc::new(MockExecution::default())));

        for body in [r#"{"dryRun": "true"}"#, r#"{"dryrun": true}"#, "not json"] {
            let (status, json) = call(&app, "POST", "/api/start", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", body);
            assert_eq!(json["success"], false);
            assert!(json["error"].as_str().unwrap().starts_with("invalid request"));
        }

        let (_, json) = call(&app, "GET", "/api/status", None).await;
        assert_eq!(json["data"]["running"], false);

        // blank body still means defaults
        let (status, json) = call(&app, "POST", "/api/start", Some("  ")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["mode"], "LIVE");
        call(&app, "POST", "/api/stop", None).await;
    }

    #[tokio::test]
    async fn test_malformed_execute_body_is_rejected() {
        let exec = Arc::new(MockExecution::default());
        let app = app_with(false, Some(exec.clone()));
        call(&app, "POST", "/api/scan", None).await;

        for body in [r#"{"opportunityIndex": "0"}"#, r#"{"opportunityIndex": -1}"#, "{"] {
            let (status, json) = call(&app, "POST", "/api/execute", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", body);
            assert_eq!(json["success"], false);
        }
        assert_eq!(*exec.calls.lock().unwrap(), 0);
    }
}
