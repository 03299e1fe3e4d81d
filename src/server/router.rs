//! axum `Router` wiring: `/health`, `/stats`, and the protected `/api/**`
//! surface (spec §6 HTTP surface (server)).

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, OriginalUri, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::clock::Clock;
use crate::config::ServerConfig;
use crate::crypto::Point;
use crate::server::middleware::{
    build_challenge, classify, mediate_payment, verify_presentation, Branch, VerifyOutcome,
};
use crate::server::ratelimit::RateLimiter;
use crate::server::verifier_backend::{Verifier, VerifierHandle};
use crate::wire::ErrorBody;

/// Proofs for this suite comfortably exceed 20 KB; 64 KB matches the
/// spec's recommendation (spec §6 HTTP surface (server)).
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub struct AppState<V: Verifier> {
    pub config: ServerConfig,
    pub limiter: Arc<RateLimiter>,
    pub verifier: Arc<VerifierHandle<V>>,
    pub facilitator_pubkey: Point,
    pub http: reqwest::Client,
    pub clock: Arc<dyn Clock>,
    pub started_at: Instant,
    pub service_name: String,
    /// Production builds omit `details` from error bodies (spec §7).
    pub redact_errors: bool,
}

pub fn build_router<V: Verifier + 'static>(state: Arc<AppState<V>>) -> Router {
    let expose_headers = [
        HeaderValue::from_static("x-ratelimit-limit"),
        HeaderValue::from_static("x-ratelimit-remaining"),
        HeaderValue::from_static("x-ratelimit-reset"),
    ];
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST])
        .expose_headers(expose_headers);

    Router::new()
        .route("/health", get(health_handler::<V>))
        .route("/stats", get(stats_handler::<V>))
        .route("/api/*path", any(protected_handler::<V>))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler<V: Verifier>(State(state): State<Arc<AppState<V>>>) -> Json<Value> {
    Json(json!({ "status": "ok", "service": state.service_name }))
}

async fn stats_handler<V: Verifier>(State(state): State<Arc<AppState<V>>>) -> Json<Value> {
    let stats = state.limiter.stats();
    Json(json!({
        "total_tokens": stats.total_tokens,
        "total_requests": stats.total_requests,
        "uptime": state.started_at.elapsed().as_secs(),
    }))
}

fn error_response(status: StatusCode, body: ErrorBody) -> Response {
    (status, Json(body)).into_response()
}

async fn protected_handler<V: Verifier + 'static>(
    State(state): State<Arc<AppState<V>>>,
    OriginalUri(uri): OriginalUri,
    body: Option<Json<Value>>,
) -> Response {
    let resource_url = format!("{}{}", state.config.public_base_url.trim_end_matches('/'), uri.path());
    let body = body.map(|Json(v)| v).unwrap_or(Value::Null);

    match classify(&body) {
        Branch::Neither => {
            let challenge = build_challenge(&state.config, &resource_url);
            (StatusCode::PAYMENT_REQUIRED, Json(challenge)).into_response()
        }
        Branch::PaymentBearing => {
            let requirements = build_challenge(&state.config, &resource_url).accepts.remove(0);
            match mediate_payment(&state.http, &state.config.facilitator_url, &body, requirements).await {
                Ok(success) => (StatusCode::OK, Json(success)).into_response(),
                Err(e) => {
                    let kind = e.kind();
                    error_response(
                        StatusCode::from_u16(kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                        ErrorBody::new(kind).with_details(json!({ "reason": e.to_string() }), state.redact_errors),
                    )
                }
            }
        }
        Branch::CredentialPresenting => {
            match verify_presentation(
                &state.config,
                &state.verifier,
                &state.limiter,
                state.clock.as_ref(),
                &state.facilitator_pubkey,
                &resource_url,
                &body,
            )
            .await
            {
                VerifyOutcome::ChallengeRequired => {
                    let challenge = build_challenge(&state.config, &resource_url);
                    (StatusCode::PAYMENT_REQUIRED, Json(challenge)).into_response()
                }
                VerifyOutcome::Rejected(kind, message) => error_response(
                    StatusCode::from_u16(kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                    ErrorBody::with_message(kind, message),
                ),
                VerifyOutcome::Verified(verified, check) => {
                    let mut response = (
                        StatusCode::OK,
                        Json(json!({ "tier": verified.tier, "origin_token": crate::crypto::encode_field(&verified.origin_token) })),
                    )
                        .into_response();
                    let headers = response.headers_mut();
                    headers.insert(
                        "x-ratelimit-limit",
                        HeaderValue::from_str(&state.config.rate_limit.max_requests_per_token.to_string()).unwrap(),
                    );
                    headers.insert(
                        "x-ratelimit-remaining",
                        HeaderValue::from_str(&check.remaining.to_string()).unwrap(),
                    );
                    headers.insert(
                        "x-ratelimit-reset",
                        HeaderValue::from_str(&check.reset_at.to_string()).unwrap(),
                    );
                    response
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::crypto::derive_pubkey;
    use crate::server::verifier_backend::StubVerifier;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_config() -> ServerConfig {
        ServerConfig {
            service_id: crate::F::from(1u64),
            facilitator_pubkey: "x".to_string(),
            facilitator_url: "http://localhost:9999".to_string(),
            min_tier: 0,
            skip_proof_verification: true,
            rate_limit: crate::config::RateLimitConfig { max_requests_per_token: 100, window_seconds: 60 },
            payment_amount: "10000".to_string(),
            payment_asset: "USDC".to_string(),
            payment_recipient: "0xabc".to_string(),
            network: "eip155:8453".to_string(),
            resource_description: "protected resource".to_string(),
            public_base_url: "https://example.com".to_string(),
            facilitator_timeout_seconds: 10,
        }
    }

    fn test_state() -> Arc<AppState<StubVerifier>> {
        Arc::new(AppState {
            config: test_config(),
            limiter: Arc::new(RateLimiter::new(100, 60)),
            verifier: Arc::new(VerifierHandle::new(StubVerifier::accepting())),
            facilitator_pubkey: derive_pubkey(&crate::crypto::Scalar::from(1u64)).unwrap(),
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap(),
            clock: Arc::new(FixedClock::new(1_700_000_000)),
            started_at: Instant::now(),
            service_name: "resource-server".to_string(),
            redact_errors: true,
        })
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_route_without_body_yields_402() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/whoami")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }
}
