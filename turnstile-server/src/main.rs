use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use turnstile::{CounterRegistry, ThrottlePolicy};
use turnstile_server::admission::AdmissionEngine;
use turnstile_server::config::Config;
use turnstile_server::metrics::ServerMetrics;
use turnstile_server::resolver::ClientResolver;
use turnstile_server::{app, store};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration from environment variables and CLI arguments
    let config = Config::from_env_and_args()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("turnstile={}", config.log_level).parse()?)
                .add_directive(format!("turnstile_server={}", config.log_level).parse()?),
        )
        .init();

    // Wire the admission layer: policy, store, resolver, counters
    let policy = ThrottlePolicy::new(config.min_interval)?;
    let throttle_store = store::build_store(&config.store);
    let counters = Arc::new(CounterRegistry::new());
    let resolver = ClientResolver::new(config.trust_forwarded);
    let engine = Arc::new(AdmissionEngine::new(
        policy,
        Arc::clone(&throttle_store),
        resolver,
    ));
    let metrics = Arc::new(ServerMetrics::new(Arc::clone(&counters), throttle_store));

    let router = app::build_router(engine, counters, metrics);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("listening on {}", addr);
    tracing::info!(
        "admission policy: one request per client per {:?}, store: {:?}",
        config.min_interval,
        config.store.store_type
    );

    // ConnectInfo carries the peer address the resolver keys on.
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
