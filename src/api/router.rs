//! HTTP router.
//!
//! Routes are nested under `/api/`. Middleware stack (outermost → innermost):
//! Extension → CORS → Rate limiter → Access logger → Handler.
//! Endpoints: `/health`, `/analyze`, `/status/:request_id`, `/stats`.

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(ctx: ApiContext, cors_origins: &[String]) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/analyze", post(endpoints::analyze::analyze))
        .route("/status/:request_id", get(endpoints::status::get))
        .route("/stats", get(endpoints::stats::get))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(cors_layer(cors_origins))
        .layer(axum::Extension(ctx));

    Router::new().nest("/api", routes)
}

/// CORS for the configured origins. `*` allows any origin; unparsable
/// origins are skipped with a warning.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(allowed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::api::types::RateLimiter;
    use crate::db::AuditLog;
    use crate::knowledge::KnowledgeBundle;
    use crate::pipeline::ClinicalPipeline;

    const ORIGIN: &str = "http://localhost:3000";

    const PNEUMONIA_NOTE: &str = "45 year old female with fever, productive cough and pleuritic \
        chest pain for 3 days. Temp 38.9, HR 104, RR 22, SpO2 93%. Crackles at right base.";

    fn test_ctx() -> ApiContext {
        ApiContext::new(
            ClinicalPipeline::new(KnowledgeBundle::bundled().unwrap()),
            AuditLog::in_memory().unwrap(),
        )
    }

    fn app(ctx: ApiContext) -> Router {
        api_router(ctx, &[ORIGIN.to_string()])
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn response_json(response: axum::http::Response<Body>) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn analyze_body(note: &str) -> String {
        serde_json::json!({ "clinical_note": note, "input_type": "text" }).to_string()
    }

    #[tokio::test]
    async fn health_response_shape() {
        let response = app(test_ctx()).oneshot(get_req("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("cache-control").unwrap(), "no-store");

        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert!(!json["version"].as_str().unwrap().is_empty());
        assert_eq!(json["llm_configured"], false);
        assert_eq!(json["retrieval_configured"], false);
    }

    #[tokio::test]
    async fn analyze_returns_differentials_and_audits() {
        let ctx = test_ctx();
        let response = app(ctx.clone())
            .oneshot(post_json("/api/analyze", &analyze_body(PNEUMONIA_NOTE)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        let request_id = json["request_id"].as_str().unwrap().to_string();
        assert!(request_id.starts_with("req_"));
        assert_eq!(json["status"], "completed");
        let dx = json["differential_diagnoses"].as_array().unwrap();
        assert!(!dx.is_empty() && dx.len() <= 5);
        assert_eq!(dx[0]["rank"], 1);

        let status = app(ctx)
            .oneshot(get_req(&format!("/api/status/{request_id}")))
            .await
            .unwrap();
        assert_eq!(status.status(), StatusCode::OK);
        let json = response_json(status).await;
        assert_eq!(json["status"], "completed");
        assert_eq!(json["output_available"], true);
    }

    #[tokio::test]
    async fn invalid_note_is_422_and_recorded_failed() {
        let ctx = test_ctx();
        let response = app(ctx.clone())
            .oneshot(post_json("/api/analyze", &analyze_body("hi")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "INVALID_NOTE");

        let failed: i64 = {
            let audit = ctx.audit.lock().unwrap();
            audit.count_by_status(crate::models::ProcessingStatus::Failed).unwrap()
        };
        assert_eq!(failed, 1);
    }

    #[tokio::test]
    async fn malformed_body_is_400_envelope() {
        let response = app(test_ctx())
            .oneshot(post_json("/api/analyze", r#"{"note": 1}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn unknown_request_status_is_404() {
        let response = app(test_ctx())
            .oneshot(get_req("/api/status/req_000000000000"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn rate_limit_returns_429_with_retry_after() {
        let ctx = test_ctx().with_rate_limiter(RateLimiter::with_limits(2, 100));
        let router = app(ctx);
        for _ in 0..2 {
            let ok = router.clone().oneshot(get_req("/api/health")).await.unwrap();
            assert_eq!(ok.status(), StatusCode::OK);
        }
        let limited = router.oneshot(get_req("/api/health")).await.unwrap();
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(limited.headers().get("Retry-After").unwrap(), "60");
    }

    fn spoofed(forwarded_for: &str) -> Request<Body> {
        Request::builder()
            .uri("/api/health")
            .header("X-Forwarded-For", forwarded_for)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn rotating_forwarded_for_does_not_bypass_limit() {
        let router = app(test_ctx().with_rate_limiter(RateLimiter::with_limits(2, 100)));
        for ip in ["10.0.0.1", "10.0.0.2"] {
            let ok = router.clone().oneshot(spoofed(ip)).await.unwrap();
            assert_eq!(ok.status(), StatusCode::OK);
        }
        let limited = router.oneshot(spoofed("10.0.0.3")).await.unwrap();
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn trusted_proxy_limits_each_forwarded_client() {
        let ctx = test_ctx()
            .with_rate_limiter(RateLimiter::with_limits(1, 100))
            .with_trusted_forwarding(true);
        let router = app(ctx);
        let first = router.clone().oneshot(spoofed("10.0.0.1")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let other = router.clone().oneshot(spoofed("10.0.0.2")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
        let again = router.oneshot(spoofed("10.0.0.1")).await.unwrap();
        assert_eq!(again.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn stats_report_audit_counts_and_recent_requests() {
        let ctx = test_ctx();
        let ok = app(ctx.clone())
            .oneshot(post_json("/api/analyze", &analyze_body(PNEUMONIA_NOTE)))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        let rejected = app(ctx.clone())
            .oneshot(post_json("/api/analyze", &analyze_body("hi")))
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = app(ctx).oneshot(get_req("/api/stats")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "operational");
        assert_eq!(json["retrieval_configured"], false);
        assert_eq!(json["requests_total"], 2);
        assert_eq!(json["requests_by_status"]["completed"], 1);
        assert_eq!(json["requests_by_status"]["failed"], 1);
        let recent = json["recent_requests"].as_array().unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|r| r["request_id"].as_str().unwrap().starts_with("req_")));
    }

    #[tokio::test]
    async fn cors_allows_configured_origin_only() {
        let router = app(test_ctx());
        let allowed = Request::builder()
            .uri("/api/health")
            .header("Origin", ORIGIN)
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(allowed).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            ORIGIN
        );

        let other = Request::builder()
            .uri("/api/health")
            .header("Origin", "http://evil.example")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(other).await.unwrap();
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let response = app(test_ctx()).oneshot(get_req("/api/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
