//! Mailspool webhook receiver.
//!
//! Accepts inbound email-delivery notifications from the mail relay,
//! authenticates callers by API key, and spools each notification as
//! an immutable content-addressed file. Initializes all subsystems and
//! coordinates startup and graceful shutdown.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use mailspool_api::{AppState, Config, CookieSettings};
use mailspool_core::{MulticastEventHandler, RealClock, SpoolStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting mailspool webhook receiver");

    let config = Config::load()?;
    info!(
        spool_root = %config.spool_root.display(),
        cookie_domain = %config.cookie_domain,
        host = %config.host,
        port = config.port,
        "Configuration loaded"
    );

    // An ambiguous credential table is fatal: refuse to serve traffic.
    let index = config.build_credential_index()?;
    info!(api_keys = index.len(), "Credential index built");

    let spool = SpoolStore::open(&config.spool_root)
        .with_context(|| format!("Failed to open spool at {}", config.spool_root.display()))?;
    info!(spool_root = %spool.root().display(), "Spool store ready");

    // Hook point for downstream consumers; subscribers register here.
    let events = MulticastEventHandler::new();

    let state = AppState {
        index: Arc::new(index),
        spool,
        events: Arc::new(events),
        clock: Arc::new(RealClock::new()),
        cookies: CookieSettings {
            domain: config.cookie_domain.clone(),
            max_age_secs: i64::try_from(config.cookie_max_age).unwrap_or(i64::MAX),
        },
    };

    let addr = config.parse_server_addr()?;
    info!(addr = %addr, "Mailspool is ready to receive notifications");

    mailspool_api::start_server(state, addr, Duration::from_secs(config.request_timeout))
        .await
        .context("Server failed")?;

    info!("Mailspool shutdown complete");
    Ok(())
}

/// Initializes tracing with environment-based configuration.
fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,mailspool=debug,tower_http=debug"))
        .expect("Invalid RUST_LOG environment variable");

    let fmt_layer = fmt::layer().with_target(true).with_file(true).with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}
