//! `CubeTime` Competition Server
//!
//! JSON HTTP API for QR session issuance, attempt validation and the
//! leaderboard.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use cubetime_core::config::load_config;
use cubetime_core::tracing_init::{default_filter, init_tracing};
use cubetime_core::{Clock, Config, SystemClock};
use cubetime_server::competition::Competition;
use cubetime_server::http::{AppState, build_router};
use cubetime_server::notifications::{DisabledNotifier, Notifier};
use cubetime_server::qr::SvgQrCodec;
use cubetime_server::storage::CompetitionDatabase;

#[derive(Parser, Debug)]
#[command(name = "cubetime-server")]
#[command(
    version,
    about = "CubeTime competition server - QR session validation and leaderboard"
)]
struct Args {
    /// Address to listen on. Overrides the configured address.
    #[arg(long, env = "CUBETIME_ADDR")]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file.
    #[arg(long, env = "CUBETIME_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Path to a JSON settings file.
    #[arg(long, env = "CUBETIME_CONFIG")]
    config: Option<PathBuf>,

    /// Comma-separated admin email allow-list.
    #[arg(long, env = "CUBETIME_ADMIN_EMAILS", value_delimiter = ',')]
    admin_emails: Vec<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "CUBETIME_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    apply_args(&mut config, &args);

    init_tracing(
        &default_filter(env!("CARGO_PKG_NAME"), &config.server.log_level),
        args.log_json,
    );

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.addr,
        admins = config.admins.emails.len(),
        "Starting cubetime-server"
    );
    if config.admins.emails.is_empty() {
        warn!("No admin emails configured; session issuance will be refused");
    }

    let db_path = match &config.server.database_path {
        Some(path) => path.clone(),
        None => default_db_path()?,
    };
    info!(path = %db_path.display(), "Opening competition database");
    let db = CompetitionDatabase::open(&db_path).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let competition = Competition::new(
        &db,
        &config,
        Arc::new(SvgQrCodec::default()),
        build_notifier(&config),
        Arc::clone(&clock),
    );

    let app = build_router(AppState {
        competition: Arc::new(competition),
        clock,
        allowed_origins: config.server.allowed_origins.clone(),
    });

    let listener = tokio::net::TcpListener::bind(config.server.addr).await?;
    info!(addr = %config.server.addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("Server stopped");
    Ok(())
}

/// CLI flags take precedence over every config layer.
fn apply_args(config: &mut Config, args: &Args) {
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if let Some(path) = &args.db_path {
        config.server.database_path = Some(path.clone());
    }
    let emails: Vec<String> = args
        .admin_emails
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .map(String::from)
        .collect();
    if !emails.is_empty() {
        config.admins.emails = emails;
    }
}

#[cfg(feature = "email")]
fn build_notifier(config: &Config) -> Arc<dyn Notifier> {
    use cubetime_server::notifications::HttpMailer;

    if !config.email.is_configured() {
        info!("Email not configured; QR codes will not be mailed");
        return Arc::new(DisabledNotifier);
    }

    let _ = rustls::crypto::ring::default_provider().install_default();
    let http = match reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Failed to build HTTP client; email disabled");
            return Arc::new(DisabledNotifier);
        }
    };

    match HttpMailer::from_config(&config.email, http) {
        Ok(mailer) => Arc::new(mailer),
        Err(e) => {
            warn!(error = %e, "Email disabled");
            Arc::new(DisabledNotifier)
        }
    }
}

#[cfg(not(feature = "email"))]
fn build_notifier(_config: &Config) -> Arc<dyn Notifier> {
    info!("Built without the email feature; QR codes will not be mailed");
    Arc::new(DisabledNotifier)
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".cubetime").join("cubetime.db"))
}
