use eyre::{Result, bail, eyre};
use url::Url;

use crate::cli::chat::view::OutputFormat;

pub const SERVER_URL_VAR: &str = "CHAT_SERVER_URL";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: &str = "8000";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: Url,
    pub format: OutputFormat,
}

impl Config {
    /// Resolves configuration from the CLI flag and the process environment.
    pub fn resolve(server: Option<String>, format: OutputFormat) -> Result<Self> {
        Self::resolve_with(server, format, |key| std::env::var(key).ok())
    }

    /// `--server`, then `CHAT_SERVER_URL`, then the chat server's own
    /// `HOST`/`PORT` settings.
    pub fn resolve_with<F>(server: Option<String>, format: OutputFormat, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = match server.or_else(|| env(SERVER_URL_VAR)) {
            Some(url) => url,
            None => {
                let host = env("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
                let port = env("PORT").unwrap_or_else(|| DEFAULT_PORT.to_string());
                // The server binds the wildcard address; dial it locally.
                let host = if host == "0.0.0.0" { "localhost".to_string() } else { host };
                format!("http://{}:{}", host, port)
            }
        };

        let server_url =
            Url::parse(raw.trim()).map_err(|e| eyre!("Invalid server URL '{}': {}", raw, e))?;
        if !matches!(server_url.scheme(), "http" | "https") {
            bail!("Unsupported server URL scheme '{}'", server_url.scheme());
        }

        Ok(Self { server_url, format })
    }
}
