//! MarketSentinel binary entrypoint.
//! Boots the Axum service on Shuttle: settings, tracing, metrics, router.

use std::net::SocketAddr;

use axum::Router;
use market_sentinel::config::Settings;
use market_sentinel::metrics::Metrics;
use shuttle_runtime::CustomError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Serves the router with `ConnectInfo<SocketAddr>` on every request; the
/// request gate keys on the peer address.
struct SentinelService(Router);

#[shuttle_runtime::async_trait]
impl shuttle_runtime::Service for SentinelService {
    async fn bind(self, addr: SocketAddr) -> Result<(), shuttle_runtime::Error> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(CustomError::new)?;
        axum::serve(
            listener,
            self.0.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(CustomError::new)?;
        Ok(())
    }
}

/// `LOG_FORMAT=json` for JSON lines, compact text otherwise. A subscriber
/// installed by the runtime wins.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("market_sentinel=info,tower_http=warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> Result<SentinelService, shuttle_runtime::Error> {
    // Load .env locally; no-op in deployed environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let settings = Settings::from_env();
    let metrics = Metrics::init(settings.news_cache_ttl)?;
    let router = market_sentinel::app(settings)?.merge(metrics.router());

    Ok(SentinelService(router))
}
