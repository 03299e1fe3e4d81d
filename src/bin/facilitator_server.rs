//! Facilitator binary: exposes `GET /info`, `GET
//! /.well-known/zk-credential-keys`, and `POST /settle` over the
//! `CredentialIssuer` settlement algorithm (spec §4.3, §6).
//!
//! `MockPaymentBackend` is wired in when `ZKCRED_ALLOW_MOCK_PAYMENTS=true`;
//! a production deployment is expected to supply a real on-chain
//! `PaymentBackend` instead, which is out of this crate's scope (spec §1).

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use zk_credential_protocol::clock::{Clock, SystemClock};
use zk_credential_protocol::config::FacilitatorConfig;
use zk_credential_protocol::facilitator::payment::MockPaymentBackend;
use zk_credential_protocol::facilitator::{CredentialIssuer, SettleError};
use zk_credential_protocol::wire::{
    CredentialExtension, ErrorBody, ErrorKind, SettlementRequest, SettlementResponse,
    SettlementResponseExtensions,
};

struct AppState {
    issuer: CredentialIssuer<MockPaymentBackend>,
}

fn settle_error_kind(e: &SettleError) -> ErrorKind {
    match e {
        SettleError::UnsupportedSuite => ErrorKind::UnsupportedSuite,
        // Spec §4.3 step 1: a prefix mismatch is `unsupported_suite`, but a
        // malformed remainder (not `04 || X || Y`) is `invalid_proof` — a
        // format failure, not a verifier rejection, so it carries 400.
        SettleError::InvalidCommitment(_) => ErrorKind::InvalidProofFormat,
        SettleError::PaymentVerificationFailed(_) => ErrorKind::PaymentVerificationFailed,
        SettleError::PaymentSettlementFailed(_) => ErrorKind::PaymentSettlementFailed,
        SettleError::BelowMinimumTier => ErrorKind::BelowMinimumTier,
        SettleError::Backend(_) => ErrorKind::FacilitatorError,
    }
}

async fn info_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.issuer.get_info().await {
        Ok(info) => Json(info).into_response(),
        Err(e) => error_response(e),
    }
}

async fn jwks_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.issuer.jwks().await {
        Ok(jwks) => Json(jwks).into_response(),
        Err(e) => error_response(e),
    }
}

async fn settle_handler(State(state): State<Arc<AppState>>, Json(req): Json<SettlementRequest>) -> Response {
    match state
        .issuer
        .settle(&req.payment, &req.payment_requirements, &req.extensions.zk_credential)
        .await
    {
        Ok((payment_receipt, credential)) => Json(SettlementResponse {
            payment_receipt,
            extensions: SettlementResponseExtensions { zk_credential: CredentialExtension { credential } },
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(e: SettleError) -> Response {
    let kind = settle_error_kind(&e);
    let status = StatusCode::from_u16(kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorBody::with_message(kind, e.to_string()))).into_response()
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/info", get(info_handler))
        .route("/.well-known/zk-credential-keys", get(jwks_handler))
        .route("/settle", post(settle_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "facilitator_server=info,tower_http=info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    info!("starting facilitator server");

    let config = FacilitatorConfig::from_env()?;
    if !config.allow_mock_payments {
        anyhow::bail!(
            "no production PaymentBackend is wired into this binary; set ZKCRED_ALLOW_MOCK_PAYMENTS=true for local/dev use"
        );
    }
    warn!("running with MockPaymentBackend: no real funds move");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let issuer = CredentialIssuer::new(
        config.service_id,
        config.secret_key,
        config.kid,
        config.tiers,
        Arc::new(MockPaymentBackend::new()),
        clock,
    );
    issuer.initialize().await?;

    let state = Arc::new(AppState { issuer });
    let app = build_router(state);

    let addr: SocketAddr = std::env::var("ZKCRED_FACILITATOR_ADDR")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8403)));

    info!("facilitator server listening on http://{addr}");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM, letting `axum::serve` drain in-flight
/// requests before the process exits (spec §5 Resource policy).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
