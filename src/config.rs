use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use std::{env, path::PathBuf, str::FromStr};

const DEFAULT_PORT: u16 = 9000;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub image_dir: PathBuf,
    pub items_file: PathBuf,
    pub default_image: PathBuf,
    pub front_url: String,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Catalogue item and image service")]
pub struct Args {
    /// Host to bind to (overrides CATALOG_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides CATALOG_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding content-addressed images (overrides CATALOG_IMAGE_DIR)
    #[arg(long)]
    pub image_dir: Option<PathBuf>,

    /// JSON file holding item records (overrides CATALOG_ITEMS_FILE)
    #[arg(long)]
    pub items_file: Option<PathBuf>,

    /// Image served when a requested one is missing (overrides CATALOG_DEFAULT_IMAGE)
    #[arg(long)]
    pub default_image: Option<PathBuf>,

    /// Front-end origin allowed by CORS (overrides FRONT_URL)
    #[arg(long)]
    pub front_url: Option<String>,

    /// Maximum accepted request body size in bytes (overrides CATALOG_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::resolve(Args::parse(), |key| env::var(key))
    }

    /// Merge CLI args over values read through `lookup`, then defaults.
    pub fn resolve<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let var = |key: &str| -> Result<Option<String>> {
            match lookup(key) {
                Ok(value) => Ok(Some(value)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(err) => Err(err).with_context(|| format!("reading {}", key)),
            }
        };

        let env_host = var("CATALOG_HOST")?.unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parse_var(var("CATALOG_PORT")?, "CATALOG_PORT")?.unwrap_or(DEFAULT_PORT);
        let env_image_dir = var("CATALOG_IMAGE_DIR")?
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("images"));
        let env_items_file = var("CATALOG_ITEMS_FILE")?
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("items.json"));
        let env_default_image = var("CATALOG_DEFAULT_IMAGE")?.map(PathBuf::from);
        let env_front_url = var("FRONT_URL")?.unwrap_or_else(|| "http://localhost:3000".into());
        let env_max_upload = parse_var(
            var("CATALOG_MAX_UPLOAD_BYTES")?,
            "CATALOG_MAX_UPLOAD_BYTES",
        )?
        .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        // --- Merge ---
        let image_dir = args.image_dir.unwrap_or(env_image_dir);
        let default_image = args
            .default_image
            .or(env_default_image)
            .unwrap_or_else(|| image_dir.join("default.jpg"));

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            items_file: args.items_file.unwrap_or(env_items_file),
            default_image,
            image_dir,
            front_url: args.front_url.unwrap_or(env_front_url),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The configured front-end origin as a CORS header value.
    pub fn cors_origin(&self) -> Result<HeaderValue> {
        HeaderValue::from_str(&self.front_url)
            .with_context(|| format!("invalid FRONT_URL `{}`", self.front_url))
    }
}

fn parse_var<T>(value: Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("parsing {} value `{}`", key, raw))
        })
        .transpose()
}
