//! Application entrypoint and state wiring.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use doc_ledger::config::NodeConfig;
use doc_ledger::crypto::Keypair;
use doc_ledger::documents::LocalProcessor;
use doc_ledger::ledger::Ledger;
use doc_ledger::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "doc_ledger=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = NodeConfig::from_env()?;
    tracing::info!(?cfg, "starting document ledger");

    let keypair = Keypair::load_or_generate(&cfg.key_path)
        .with_context(|| format!("loading signing key from {}", cfg.key_path.display()))?;
    tracing::info!(pubkey = %keypair.public_hex(), "document signer ready");

    // Ledger state lives only as long as the process.
    let state = AppState::new(Ledger::new(), LocalProcessor::new(keypair));
    let app = build_router(state);

    let listener = TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    tracing::info!("listening on http://{}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
