use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Explicit kubeconfig; when unset the client infers its configuration.
    #[serde(default = "default_kubeconfig")]
    pub kubeconfig: Option<PathBuf>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_console_chunk_size")]
    pub console_chunk_size: usize,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    parse_or(std::env::var(key).ok().as_deref(), default)
}

fn parse_or<T: FromStr>(value: Option<&str>, default: T) -> T {
    value
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn default_bind_addr() -> String {
    std::env::var("VM_CLOUD_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
}

fn default_kubeconfig() -> Option<PathBuf> {
    std::env::var("VM_CLOUD_KUBECONFIG")
        .ok()
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

fn default_request_timeout() -> u64 {
    env_or("VM_CLOUD_REQUEST_TIMEOUT", 30)
}

fn default_console_chunk_size() -> usize {
    env_or("VM_CLOUD_CONSOLE_CHUNK", vm_orchestrator::DEFAULT_CHUNK_SIZE)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            kubeconfig: default_kubeconfig(),
            request_timeout_secs: default_request_timeout(),
            console_chunk_size: default_console_chunk_size(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Deadline applied to every cluster call made for one request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
