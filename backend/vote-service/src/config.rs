/// Configuration management for vote-service
///
/// Everything is read from environment variables; `main` loads `.env` first.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub cors: CorsConfig,
    pub database: DatabaseConfig,
    pub store: StoreConfig,
    pub auth: AuthConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Upper bound on waiting for a post row lock; 0 disables the limit
    pub lock_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Postgres => "postgres",
            StoreBackend::Memory => "memory",
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!(
                "VOTE_STORE must be 'postgres' or 'memory', got '{}'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Posts `1..=n` created at startup in memory mode
    pub memory_seed_posts: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// RS256 public key; without it every caller is anonymous
    #[serde(skip_serializing)]
    pub jwt_public_key_pem: Option<String>,
    pub jwt_issuer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub enabled: bool,
    /// Callers allowed on admin routes, lowercased
    pub emails: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let backend: StoreBackend = match std::env::var("VOTE_STORE") {
            Ok(value) => value.parse()?,
            Err(_) => StoreBackend::Postgres,
        };
        if production && backend == StoreBackend::Memory {
            return Err("VOTE_STORE=memory is not allowed in production".to_string());
        }

        let database_url = non_empty_env("DATABASE_URL");
        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err("DATABASE_URL must be set when VOTE_STORE=postgres".to_string());
        }

        let max_connections = parse_env_or_default("DATABASE_MAX_CONNECTIONS", 10)?;
        let min_connections = parse_env_or_default("DATABASE_MIN_CONNECTIONS", 1)?;
        if max_connections == 0 || min_connections > max_connections {
            return Err(format!(
                "DATABASE_MIN_CONNECTIONS ({}) must not exceed DATABASE_MAX_CONNECTIONS ({}), which must be positive",
                min_connections, max_connections
            ));
        }

        let admin_enabled = parse_env_or_default("VOTE_ADMIN_ENABLED", false)?;
        let admin_emails: Vec<String> = std::env::var("VOTE_ADMIN_EMAILS")
            .unwrap_or_default()
            .split(',')
            .map(|e| e.trim().to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if admin_enabled && admin_emails.is_empty() {
            return Err("VOTE_ADMIN_EMAILS must list at least one admin when VOTE_ADMIN_ENABLED=true".to_string());
        }

        let jwt_public_key_pem = non_empty_env("JWT_PUBLIC_KEY_PEM").map(|pem| pem.replace("\\n", "\n"));
        if production && jwt_public_key_pem.is_none() {
            return Err("JWT_PUBLIC_KEY_PEM must be set in production".to_string());
        }

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("VOTE_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or_default("VOTE_SERVICE_PORT", 8086)?,
                workers: parse_env_or_default("VOTE_SERVICE_WORKERS", 4)?,
            },
            cors: {
                let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                    Ok(value) => value,
                    Err(_) if production => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    Err(_) => "http://localhost:3000".to_string(),
                };

                if production && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
                min_connections,
                acquire_timeout_secs: parse_env_or_default("DATABASE_ACQUIRE_TIMEOUT_SECS", 5)?,
                lock_timeout_ms: parse_env_or_default("DATABASE_LOCK_TIMEOUT_MS", 3000)?,
            },
            store: StoreConfig {
                backend,
                memory_seed_posts: parse_env_or_default("VOTE_MEMORY_SEED_POSTS", 0)?,
            },
            auth: AuthConfig {
                jwt_public_key_pem,
                jwt_issuer: non_empty_env("JWT_ISSUER"),
            },
            admin: AdminConfig {
                enabled: admin_enabled,
                emails: admin_emails,
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.app.env.eq_ignore_ascii_case("production")
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}
