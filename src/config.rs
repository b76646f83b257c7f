use anyhow::{Context, Result};
use clap::Parser;
use std::env;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub admin_token: Option<String>,
    pub default_case: String,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Case file intake portal")]
pub struct Args {
    /// Host to bind to (overrides INTAKE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides INTAKE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where payloads are stored (overrides INTAKE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides INTAKE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Bearer token for the admin API (overrides INTAKE_ADMIN_TOKEN)
    #[arg(long)]
    pub admin_token: Option<String>,

    /// Name of the case provisioned at startup (overrides INTAKE_DEFAULT_CASE)
    #[arg(long)]
    pub default_case: Option<String>,

    /// Maximum request body size for uploads (overrides INTAKE_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("INTAKE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("INTAKE_PORT", 8000u16)?;
        let env_storage =
            env::var("INTAKE_STORAGE_DIR").unwrap_or_else(|_| "./data/objects".into());
        let env_db = env::var("INTAKE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/intake.db".into());
        let env_token = env::var("INTAKE_ADMIN_TOKEN").ok();
        let env_default_case =
            env::var("INTAKE_DEFAULT_CASE").unwrap_or_else(|_| "Default".into());
        let env_max_upload = parse_env("INTAKE_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            admin_token: args
                .admin_token
                .or(env_token)
                .filter(|t| !t.trim().is_empty()),
            default_case: args.default_case.unwrap_or(env_default_case),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Token is redacted so the config can be logged at startup.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("storage_dir", &self.storage_dir)
            .field("database_url", &self.database_url)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<redacted>"))
            .field("default_case", &self.default_case)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
