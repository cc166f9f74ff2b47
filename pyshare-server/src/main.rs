//! pyshare-server: share a folder with devices on the local network
//!
//! Sharing starts inactive; `POST /api/toggle-server` opens it and closing
//! it again deletes everything that was shared.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pyshare_core::Config;
use pyshare_server::{AppContext, net, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pyshare_server=debug,pyshare_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}, using defaults", e);
        Config::default()
    });

    let state = Arc::new(AppContext::from_config(&config).await?);

    let addr = SocketAddr::from((
        config.server.listen_addr.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let port = listener.local_addr()?.port();

    tracing::info!("pyshare-server listening on {}", addr);
    tracing::info!("Local:   http://localhost:{}", port);
    tracing::info!("Network: http://{}:{}", net::local_ip_string(), port);
    tracing::info!("Shared folder: {}", state.session.store().root().display());

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
