// marketplace/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Which `RemoteStore` implementation the server talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
  /// Hosted PostgREST (Supabase) over HTTPS.
  Rest,
  /// Direct Postgres connection through sqlx.
  Postgres,
  /// Process-local tables, for demos and tests.
  Memory,
}

impl FromStr for StoreBackend {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "rest" | "supabase" => Ok(StoreBackend::Rest),
      "postgres" | "pg" => Ok(StoreBackend::Postgres),
      "memory" => Ok(StoreBackend::Memory),
      other => Err(AppError::Config(format!("Unknown STORE_BACKEND '{}'", other))),
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,

  pub store_backend: StoreBackend,
  pub supabase_url: Option<String>,
  pub supabase_anon_key: Option<String>,
  pub database_url: Option<String>,
  pub request_timeout: Duration,

  // Identity used when a request carries no X-User-ID header
  pub default_buyer_id: Option<Uuid>,
  pub default_seller_id: Option<Uuid>,

  pub notification_duration: Duration,

  // Server-side dashboard sessions
  pub session_idle_timeout: Duration,
  pub max_sessions: usize,

  // Only honoured by the memory backend
  pub seed_db: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from any key lookup; `from_env` passes the process environment.
  pub fn from_lookup<F>(lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

    let server_host = get_or("SERVER_HOST", "127.0.0.1");
    let server_port = get_or("SERVER_PORT", "8080")
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;

    let store_backend = get_or("STORE_BACKEND", "rest").parse::<StoreBackend>()?;
    let supabase_url = lookup("SUPABASE_URL").map(|u| u.trim_end_matches('/').to_string());
    let supabase_anon_key = lookup("SUPABASE_ANON_KEY");
    let database_url = lookup("DATABASE_URL");

    match store_backend {
      StoreBackend::Rest if supabase_url.is_none() || supabase_anon_key.is_none() => {
        return Err(AppError::Config(
          "STORE_BACKEND=rest requires SUPABASE_URL and SUPABASE_ANON_KEY".to_string(),
        ));
      }
      StoreBackend::Postgres if database_url.is_none() => {
        return Err(AppError::Config("STORE_BACKEND=postgres requires DATABASE_URL".to_string()));
      }
      _ => {}
    }

    let request_timeout = Duration::from_secs(
      get_or("REQUEST_TIMEOUT_SECS", "30")
        .parse::<u64>()
        .map_err(|e| AppError::Config(format!("Invalid REQUEST_TIMEOUT_SECS: {}", e)))?,
    );

    let parse_id = |name: &str| -> Result<Option<Uuid>> {
      lookup(name)
        .map(|raw| Uuid::parse_str(raw.trim()).map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e))))
        .transpose()
    };
    let default_buyer_id = parse_id("DEFAULT_BUYER_ID")?;
    let default_seller_id = parse_id("DEFAULT_SELLER_ID")?;

    let notification_duration = Duration::from_millis(
      get_or("NOTIFICATION_DURATION_MS", "3000")
        .parse::<u64>()
        .map_err(|e| AppError::Config(format!("Invalid NOTIFICATION_DURATION_MS: {}", e)))?,
    );

    let session_idle_timeout = Duration::from_secs(
      get_or("SESSION_IDLE_SECS", "1800")
        .parse::<u64>()
        .map_err(|e| AppError::Config(format!("Invalid SESSION_IDLE_SECS: {}", e)))?,
    );
    let max_sessions = get_or("MAX_SESSIONS", "1000")
      .parse::<usize>()
      .map_err(|e| AppError::Config(format!("Invalid MAX_SESSIONS: {}", e)))?;
    if max_sessions == 0 {
      return Err(AppError::Config("MAX_SESSIONS must be at least 1".to_string()));
    }

    let seed_db = get_or("SEED_DB", "false")
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid SEED_DB value: {}", e)))?;

    tracing::info!(backend = ?store_backend, "Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      store_backend,
      supabase_url,
      supabase_anon_key,
      database_url,
      request_timeout,
      default_buyer_id,
      default_seller_id,
      notification_duration,
      session_idle_timeout,
      max_sessions,
      seed_db,
    })
  }
}
