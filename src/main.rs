mod config;
mod error;
mod guard;
mod handlers;
mod metrics;
mod models;
mod portal;
mod rate_limit;
mod state;

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Args, StoreKind};
use crate::guard::LoginGuard;
use crate::rate_limit::{MemoryRateLimitStore, RateLimitStore, RemoteRateLimitStore, sweeper};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portal_guard=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // parse cli arguments
    let args = Args::parse();
    args.validate()?;

    let store: Arc<dyn RateLimitStore> = match args.store {
        StoreKind::Memory => {
            let memory = Arc::new(MemoryRateLimitStore::new(
                args.login_limit,
                args.login_window(),
            ));

            // spawn the expiry sweeper
            tokio::spawn(sweeper(Arc::clone(&memory), args.sweep_interval()));
            memory
        }
        StoreKind::Remote => {
            let url = args.store_url.as_deref().unwrap_or_default();
            let client = reqwest::Client::builder()
                .timeout(args.store_timeout())
                .build()?;
            let remote = RemoteRateLimitStore::new(client, url);
            tracing::info!("Using remote rate limit store at {}", remote.base_url());
            Arc::new(remote)
        }
    };

    let state = Arc::new(AppState {
        login_guard: LoginGuard::new(store, args.failure_policy, args.store_timeout()),
        portal_policy: args.portal_policy(),
        trust_proxy_headers: args.trust_proxy_headers,
    });

    let app = handlers::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("portal-guard listening on http://{}", addr);
    if args.store == StoreKind::Memory {
        tracing::info!(
            "Login rate limit: {} attempts per {} seconds",
            args.login_limit,
            args.login_window
        );
    }
    if args.trust_proxy_headers {
        tracing::info!("Client ip taken from X-Forwarded-For / X-Real-IP");
    }
    tracing::info!(
        "Store failure policy: {:?}, default portal: {}, landing: {:?}",
        args.failure_policy,
        args.default_portal.as_str(),
        args.landing
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
