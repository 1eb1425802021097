use std::fs;

use anyhow::{Context, bail};
use camino::Utf8PathBuf;
use clap::{Args, Parser};

use crate::db::seed_data::SeedData;

#[derive(Args, serde::Deserialize, Clone, Debug)]
pub struct Config {
    #[arg(long, env = "DEEPSEQ_DB_URL", default_value_t = default_db_url())]
    #[serde(default = "default_db_url")]
    db_url: String,
    #[arg(long, env = "DEEPSEQ_DB_MAX_CONNECTIONS", default_value_t = 1)]
    #[serde(default = "default_db_max_connections")]
    db_max_connections: usize,
    #[arg(long, env = "DEEPSEQ_HOST", default_value_t = default_host())]
    #[serde(default = "default_host")]
    host: String,
    #[arg(long, env = "DEEPSEQ_PORT", default_value_t = default_port())]
    #[serde(default = "default_port")]
    port: u16,
    #[arg(long, env = "DEEPSEQ_MEDIA_ROOT", default_value_t = default_media_root())]
    #[serde(default = "default_media_root")]
    media_root: Utf8PathBuf,
    #[arg(long, env = "DEEPSEQ_MEDIA_URL", default_value_t = default_media_url())]
    #[serde(default = "default_media_url")]
    media_url: String,
    #[arg(long, env = "DEEPSEQ_MAX_UPLOAD_BYTES", default_value_t = default_max_upload_bytes())]
    #[serde(default = "default_max_upload_bytes")]
    max_upload_bytes: usize,
    #[arg(skip)]
    #[serde(default)]
    seed_data: Option<SeedData>,
    #[arg(long, env = "DEEPSEQ_SEED_DATA_PATH")]
    #[serde(default)]
    seed_data_path: Option<Utf8PathBuf>,
}

fn default_db_url() -> String {
    "deepseq.sqlite3".to_string()
}

fn default_db_max_connections() -> usize {
    1
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_media_root() -> Utf8PathBuf {
    Utf8PathBuf::from("media")
}

fn default_media_url() -> String {
    "/media/".to_string()
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

impl Config {
    #[must_use]
    pub fn app_address(&self) -> String {
        let Self { host, port, .. } = self;

        format!("{host}:{port}")
    }

    #[must_use]
    pub fn db_url(&self) -> &str {
        &self.db_url
    }

    #[must_use]
    pub fn db_max_connections(&self) -> usize {
        self.db_max_connections.max(1)
    }

    #[must_use]
    pub fn media_root(&self) -> &Utf8PathBuf {
        &self.media_root
    }

    /// The URL prefix uploaded files are served under, always ending in `/`.
    #[must_use]
    pub fn media_url(&self) -> String {
        let trimmed = self.media_url.trim_end_matches('/');

        format!("{trimmed}/")
    }

    /// Largest request body accepted by the request-form upload.
    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// # Errors
    /// Fails when both inline seed data and a seed data path are configured, or the file at
    /// the path can't be read or parsed.
    pub fn seed_data(&self) -> anyhow::Result<Option<SeedData>> {
        let Self {
            seed_data,
            seed_data_path,
            ..
        } = self;

        match (seed_data, seed_data_path) {
            (Some(seed_data), None) => Ok(Some(seed_data.clone())),
            (None, Some(seed_data_path)) => {
                let contents = fs::read_to_string(seed_data_path)
                    .context(format!("failed to read seed data from {seed_data_path}"))?;

                Ok(Some(serde_json::from_str(&contents)?))
            }
            (Some(_), Some(_)) => bail!("`seed_data` and `seed_data_path` are mutually exclusive"),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Parser)]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,
    #[arg(long, env = "DEEPSEQ_LOG_DIR")]
    pub log_dir: Option<Utf8PathBuf>,
}
