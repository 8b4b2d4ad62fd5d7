//! Layered service configuration: built-in development defaults, then an
//! optional TOML file, then `JOBMATCH_*` environment variables.
//!
//! `JOBMATCH_CORS_ALLOWED_ORIGINS` takes a comma-separated list.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use jobmatch_core::ServiceKind;
use serde::Deserialize;

/// Signing secret used when nothing else is configured. Fine for a laptop,
/// never for a deployment; startup warns when it is in effect.
pub const DEV_JWT_SECRET: &str = "dev-only-jwt-secret-change-me";

/// Origins of the Vite dev and preview servers of the bundled frontends.
pub const DEV_CORS_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:4173"];

const ENV_PREFIX: &str = "JOBMATCH";

/// Runtime server configuration.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub service:              ServiceKind,
  pub host:                 String,
  pub port:                 u16,
  pub database_path:        PathBuf,
  pub jwt_secret:           String,
  pub token_ttl_hours:      i64,
  /// Browser origins allowed to call the API with credentials.
  pub cors_allowed_origins: Vec<String>,
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn uses_dev_secret(&self) -> bool { self.jwt_secret == DEV_JWT_SECRET }
}

/// Build the configuration. `service` (from the command line) wins over
/// every other source.
pub fn load(path: &Path, service: Option<ServiceKind>) -> anyhow::Result<ServerConfig> {
  load_with_env(path, service, environment())
}

fn environment() -> config::Environment {
  config::Environment::with_prefix(ENV_PREFIX)
    .try_parsing(true)
    .list_separator(",")
    .with_list_parse_key("cors_allowed_origins")
}

fn load_with_env(
  path:    &Path,
  service: Option<ServiceKind>,
  env:     config::Environment,
) -> anyhow::Result<ServerConfig> {
  let mut builder = config::Config::builder()
    .set_default("service", ServiceKind::default().as_ref())?
    .set_default("host", "0.0.0.0")?
    .set_default("port", 8080_i64)?
    .set_default("database_path", "jobmatch.db")?
    .set_default("jwt_secret", DEV_JWT_SECRET)?
    .set_default("token_ttl_hours", 24_i64)?
    .set_default("cors_allowed_origins", DEV_CORS_ORIGINS.to_vec())?
    .add_source(config::File::from(path.to_path_buf()).required(false))
    .add_source(env);

  if let Some(kind) = service {
    builder = builder.set_override("service", kind.as_ref())?;
  }

  let cfg: ServerConfig = builder
    .build()
    .context("failed to read configuration")?
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  anyhow::ensure!(!cfg.jwt_secret.is_empty(), "jwt_secret must not be empty");
  anyhow::ensure!(cfg.token_ttl_hours > 0, "token_ttl_hours must be positive");
  Ok(cfg)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("jobmatch-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
  }

  #[test]
  fn defaults_apply_without_file() {
    let cfg = load(Path::new("/nonexistent/jobmatch.toml"), None).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.token_ttl_hours, 24);
    assert_eq!(cfg.service, ServiceKind::User);
    assert!(cfg.uses_dev_secret());
  }

  #[test]
  fn file_overrides_defaults() {
    let path = temp_file(
      "file.toml",
      "service = \"agent\"\nport = 9100\njwt_secret = \"agent-secret\"\n",
    );
    let cfg = load(&path, None).unwrap();
    assert_eq!(cfg.service, ServiceKind::Agent);
    assert_eq!(cfg.address(), "0.0.0.0:9100");
    assert!(!cfg.uses_dev_secret());
    std::fs::remove_file(path).ok();
  }

  #[test]
  fn command_line_service_wins() {
    let path = temp_file("cli.toml", "service = \"agent\"\n");
    let cfg = load(&path, Some(ServiceKind::Admin)).unwrap();
    assert_eq!(cfg.service, ServiceKind::Admin);
    std::fs::remove_file(path).ok();
  }

  fn env(vars: &[(&str, &str)]) -> config::Environment {
    let mut map = config::Map::new();
    for (k, v) in vars {
      map.insert((*k).to_owned(), (*v).to_owned());
    }
    environment().source(Some(map))
  }

  #[test]
  fn dev_origins_are_allowed_by_default() {
    let cfg = load_with_env(Path::new("/nonexistent/jobmatch.toml"), None, env(&[])).unwrap();
    assert_eq!(cfg.cors_allowed_origins, DEV_CORS_ORIGINS);
  }

  #[test]
  fn environment_overrides_file() {
    let path = temp_file(
      "env.toml",
      "port = 9100\njwt_secret = \"file-secret\"\ntoken_ttl_hours = 2\n",
    );
    let cfg = load_with_env(
      &path,
      None,
      env(&[
        ("JOBMATCH_PORT", "9200"),
        ("JOBMATCH_JWT_SECRET", "env-secret"),
        ("JOBMATCH_SERVICE", "admin"),
        ("JOBMATCH_CORS_ALLOWED_ORIGINS", "https://jobs.example,https://admin.example"),
      ]),
    )
    .unwrap();

    assert_eq!(cfg.port, 9200);
    assert_eq!(cfg.jwt_secret, "env-secret");
    assert_eq!(cfg.service, ServiceKind::Admin);
    // Untouched by the environment, so the file still wins over defaults.
    assert_eq!(cfg.token_ttl_hours, 2);
    assert_eq!(
      cfg.cors_allowed_origins,
      ["https://jobs.example", "https://admin.example"]
    );
    std::fs::remove_file(path).ok();
  }

  #[test]
  fn command_line_service_beats_environment() {
    let cfg = load_with_env(
      Path::new("/nonexistent/jobmatch.toml"),
      Some(ServiceKind::Agent),
      env(&[("JOBMATCH_SERVICE", "admin")]),
    )
    .unwrap();
    assert_eq!(cfg.service, ServiceKind::Agent);
  }

  #[test]
  fn empty_secret_is_rejected() {
    let path = temp_file("empty.toml", "jwt_secret = \"\"\n");
    assert!(load(&path, None).is_err());
    std::fs::remove_file(path).ok();
  }
}
