//! jobmatch-server binary.
//!
//! One binary serves every identity-owning service; `--service` (or the
//! `service` config key) picks which one. Reads `jobmatch.toml` (or the path
//! given with `--config`), opens the SQLite identity store, and serves the
//! auth routes over HTTP.
//!
//! # Provisioning accounts
//!
//! Admin and agent accounts cannot self-register. Create them with:
//!
//! ```sh
//! cargo run -p jobmatch-server -- --service admin provision --name Root --email root@example.com
//! ```

mod settings;

use std::{
  io::{self, BufRead as _, Write as _},
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use axum::{
  Router,
  http::{HeaderValue, Method, header},
  routing::get,
};
use chrono::TimeDelta;
use clap::{Parser, Subcommand};
use jobmatch_auth::{AppState, SessionIssuer, TokenCodec, session::RegisterRequest};
use jobmatch_core::ServiceKind;
use jobmatch_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "jobmatch identity service")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "jobmatch.toml")]
  config: PathBuf,

  /// Which service to run as (user, admin or agent). Overrides the config.
  #[arg(short, long)]
  service: Option<ServiceKind>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve HTTP (the default).
  Serve,
  /// Create an account, reading its password from stdin, and print its code.
  Provision {
    #[arg(long)]
    name:  String,
    #[arg(long)]
    email: String,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = settings::load(&cli.config, cli.service)?;

  if cfg.uses_dev_secret() {
    tracing::warn!("using the built-in development JWT secret; set JOBMATCH_JWT_SECRET");
  }

  let issuer = build_issuer(&cfg).await?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(&cfg, issuer).await,
    Command::Provision { name, email } => provision(issuer, name, email).await,
  }
}

async fn build_issuer(cfg: &ServerConfig) -> anyhow::Result<SessionIssuer<SqliteStore>> {
  let store_path = resolve_home(&cfg.database_path);
  let store = SqliteStore::open(&store_path, cfg.service)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let ttl = TimeDelta::try_hours(cfg.token_ttl_hours).context("token_ttl_hours out of range")?;
  let codec = TokenCodec::new(cfg.jwt_secret.as_bytes(), ttl, cfg.service)
    .context("invalid token settings")?;

  SessionIssuer::new(Arc::new(store), Arc::new(codec)).context("failed to initialise issuer")
}

/// Preflight results may be cached by the browser for this long.
const CORS_MAX_AGE: Duration = Duration::from_secs(300);

/// Allow the configured browser origins to send credentialed requests with
/// a bearer token and a JSON body.
fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
  let origins = origins
    .iter()
    .map(|o| o.trim())
    .filter(|o| !o.is_empty())
    .map(|o| HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin {o:?}")))
    .collect::<anyhow::Result<Vec<_>>>()?;

  Ok(
    CorsLayer::new()
      .allow_origin(origins)
      .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
      .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
      .allow_credentials(true)
      .max_age(CORS_MAX_AGE),
  )
}

/// The full HTTP surface of one service.
fn app(cfg: &ServerConfig, issuer: SessionIssuer<SqliteStore>) -> anyhow::Result<Router> {
  Ok(
    Router::new()
      .route("/healthz", get(|| async { "ok" }))
      .nest(cfg.service.route_prefix(), jobmatch_auth::router(AppState::new(issuer)))
      .layer(cors_layer(&cfg.cors_allowed_origins)?)
      .layer(TraceLayer::new_for_http()),
  )
}

async fn serve(cfg: &ServerConfig, issuer: SessionIssuer<SqliteStore>) -> anyhow::Result<()> {
  let kind = cfg.service;
  let app = app(cfg, issuer)?;

  let address = cfg.address();
  tracing::info!(
    service = %kind,
    subject = kind.subject_attribute(),
    "Listening on http://{address}{}",
    kind.route_prefix()
  );
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

async fn provision(
  issuer: SessionIssuer<SqliteStore>,
  name:   String,
  email:  String,
) -> anyhow::Result<()> {
  let password = read_password()?;
  let account = issuer
    .provision(RegisterRequest { name, email, password })
    .await
    .context("failed to provision account")?;
  println!("{}", account.code);
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}

/// First line of stdin, without its line ending. The prompt is written to
/// stderr, leaving stdout for the provisioned code.
fn read_password() -> anyhow::Result<String> {
  eprint!("Password: ");
  io::stderr().flush().ok();
  let line = io::stdin()
    .lock()
    .lines()
    .next()
    .transpose()
    .context("failed to read password from stdin")?;
  line.context("no password on stdin")
}

/// Resolve a `~/`-relative path against `$HOME`. Other paths, and every path
/// when `HOME` is unset, are returned as given.
fn resolve_home(path: &Path) -> PathBuf {
  match (path.strip_prefix("~"), std::env::var_os("HOME")) {
    (Ok(rest), Some(home)) => Path::new(&home).join(rest),
    _ => path.to_path_buf(),
  }
}
