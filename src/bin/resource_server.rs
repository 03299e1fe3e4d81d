//! Resource-server binary: wires `ServerConfig`, the tumbling-window rate
//! limiter, and a `Verifier` backend into the axum router (spec §6 HTTP
//! surface (server)).
//!
//! The verifier here is `StubVerifier`, gated for dev/test use by
//! `ZKCRED_SKIP_PROOF_VERIFICATION`; a production deployment swaps it for
//! a real UltraHonk FFI binding behind the same `Verifier` trait.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::signal;

use tokio::net::TcpListener;
use tracing::{info, warn};

use zk_credential_protocol::abi::SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK;
use zk_credential_protocol::clock::{Clock, SystemClock};
use zk_credential_protocol::config::ServerConfig;
use zk_credential_protocol::crypto::Point;
use zk_credential_protocol::server::ratelimit::spawn_pruner;
use zk_credential_protocol::server::router::{build_router, AppState};
use zk_credential_protocol::server::verifier_backend::{StubVerifier, VerifierHandle};
use zk_credential_protocol::server::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "resource_server=info,tower_http=info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    info!("starting resource server");

    let config = ServerConfig::from_env()?;
    if config.skip_proof_verification {
        warn!("ZKCRED_SKIP_PROOF_VERIFICATION is set: proofs are NOT being checked");
    }

    let prefix = format!("{}:", SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK);
    let pubkey_hex = config
        .facilitator_pubkey
        .strip_prefix(&prefix)
        .ok_or_else(|| anyhow::anyhow!("ZKCRED_FACILITATOR_PUBKEY is missing the suite prefix {prefix}"))?;
    let facilitator_pubkey = Point::decode_uncompressed(pubkey_hex)
        .map_err(|e| anyhow::anyhow!("invalid ZKCRED_FACILITATOR_PUBKEY: {e}"))?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit.max_requests_per_token,
        config.rate_limit.window_seconds,
    ));
    let _pruner = spawn_pruner(limiter.clone(), clock.clone(), Duration::from_secs(60));

    let verifier = Arc::new(VerifierHandle::new(StubVerifier::accepting()));
    verifier.ensure_initialized().await?;

    let addr: SocketAddr = std::env::var("ZKCRED_ADDR")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8402)));

    let redact_errors = std::env::var("ZKCRED_REDACT_ERRORS")
        .map(|s| s != "false")
        .unwrap_or(true);

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.facilitator_timeout_seconds))
        .build()?;

    let state = Arc::new(AppState {
        config,
        limiter,
        verifier: verifier.clone(),
        facilitator_pubkey,
        http,
        clock,
        started_at: Instant::now(),
        service_name: "resource-server".to_string(),
        redact_errors,
    });

    let app = build_router(state);

    info!("resource server listening on http://{addr}");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    verifier.destroy().await;
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM, so `axum::serve` can drain in-flight
/// requests before `main` releases the verifier backend (spec §5 Resource
/// policy: backend resources MUST be explicitly released on shutdown).
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
