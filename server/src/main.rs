use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use http_body_util::BodyExt;
use hyper::Request;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tower::ServiceExt;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use server::auth::TokenCodec;
use server::database::{self, admins, utils};
use server::{AppState, build_service};
use shared::config::{load_config, validate_config};
use shared::types::server_config::AppConfig;

/// How long shutdown waits for open connections to finish.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Admin / partner referral portal
#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(
        short,
        long,
        env = "REFERRAL_CONFIG",
        default_value = "config.toml",
        global = true
    )]
    config: String,

    /// Subcommand (defaults to serve)
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Create an admin account, or reset the password of an existing one
    CreateAdmin {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_or_default(&cli.config)?;

    let db = database::open(&config.paths.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.paths.database_url))?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, db).await,
        Command::CreateAdmin { email, password } => create_admin(&db, &email, &password).await,
    }
}

/// Load the config file, or fall back to defaults when it does not exist.
fn load_or_default(path: &str) -> Result<AppConfig> {
    if Path::new(path).exists() {
        return load_config(path).with_context(|| format!("Failed to load config {}", path));
    }

    warn!("Config file {} not found; using defaults", path);
    let config = AppConfig::default();
    validate_config(&config).context("Default configuration is invalid")?;
    Ok(config)
}

async fn create_admin(db: &SqlitePool, email: &str, password: &str) -> Result<()> {
    let email = utils::sanitize_string(email);
    if !utils::is_valid_email(&email) {
        bail!("Invalid email address: {}", email);
    }
    if password.is_empty() {
        bail!("Password must not be empty");
    }

    let hash = utils::hash_password(password)?;
    let id = admins::upsert_admin(db, &email, &hash)
        .await
        .context("Failed to store admin")?;

    info!("Admin {} ready (id {})", email, id);
    Ok(())
}

async fn serve(config: AppConfig, db: SqlitePool) -> Result<()> {
    let addr: SocketAddr = config
        .server
        .addr()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.addr()))?;
    let max_connections = config.server.max_connections;

    let secret = config.auth.signing_secret();
    let codec = TokenCodec::new(secret.as_bytes());
    let service = build_service(AppState::new(config, db, codec));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    let limiter = Arc::new(Semaphore::new(max_connections));

    info!("Listening on http://{}", addr);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received; no longer accepting connections");
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                };

                let permit = match limiter.clone().try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!("Connection limit {} reached; dropping {}", max_connections, peer);
                        continue;
                    }
                };

                let svc = service
                    .clone()
                    .map_request(|req: Request<Incoming>| req.map(|body| body.boxed_unsync()));

                tokio::task::spawn(async move {
                    let _permit = permit;
                    if let Err(err) = http1::Builder::new()
                        .timer(TokioTimer::new())
                        .serve_connection(TokioIo::new(stream), TowerToHyperService::new(svc))
                        .await
                    {
                        debug!("Error serving connection from {}: {:?}", peer, err);
                    }
                });
            }
        }
    }

    // Every open connection holds one permit.
    let all = u32::try_from(max_connections).unwrap_or(u32::MAX);
    match tokio::time::timeout(DRAIN_TIMEOUT, limiter.acquire_many(all)).await {
        Ok(_) => info!("All connections closed"),
        Err(_) => warn!("Connections still open after {:?}; exiting", DRAIN_TIMEOUT),
    }

    Ok(())
}
