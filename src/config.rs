//! Configuration parsing and validation for the relay server
//!
//! This module handles command-line argument parsing and validation using clap.
//! Both API keys are usually supplied through the environment.
use anyhow::{anyhow, bail};
use clap::Parser;
use qwen_relay::client::{DEFAULT_POOL_IDLE_TIMEOUT, DEFAULT_POOL_MAX_IDLE_PER_HOST};
use qwen_relay::relay::{
    DEFAULT_CHAT_URL, DEFAULT_SPEECH_URL, DEFAULT_UPSTREAM_TIMEOUT, RelayConfig,
};
use std::time::Duration;
use url::Url;

#[derive(Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// The port on which the relay server will listen.
    #[arg(short = 'p', long, default_value_t = 8890)]
    pub port: u16,

    /// The port on which the metrics server will listen.
    #[arg(long, default_value_t = 9090)]
    pub metrics_port: u16,

    /// Whether to enable the metrics endpoint.
    #[arg(short = 'm', long, default_value_t = true, action = clap::ArgAction::Set)]
    pub metrics: bool,

    /// The prefix to use for metrics.
    #[arg(long, default_value = "qwen_relay")]
    pub metrics_prefix: String,

    /// Key used to authenticate against DashScope.
    #[arg(long, env = "DASHSCOPE_API_KEY", hide_env_values = true)]
    pub dashscope_api_key: String,

    /// Shared secret the frontend must send as `Authorization: Bearer <key>`.
    #[arg(long, env = "FRONTEND_API_KEY", hide_env_values = true)]
    pub frontend_api_key: String,

    /// Upstream speech synthesis endpoint.
    #[arg(long, default_value = DEFAULT_SPEECH_URL)]
    pub tts_url: Url,

    /// Upstream chat-completions endpoint.
    #[arg(long, default_value = DEFAULT_CHAT_URL)]
    pub chat_url: Url,

    /// How long (in seconds) to wait for an upstream answer before giving up.
    #[arg(long, default_value_t = DEFAULT_UPSTREAM_TIMEOUT.as_secs())]
    pub upstream_timeout_secs: u64,

    /// Maximum number of idle HTTP connections to keep alive per upstream host.
    #[arg(long, default_value_t = DEFAULT_POOL_MAX_IDLE_PER_HOST)]
    pub pool_max_idle_per_host: usize,

    /// How long (in seconds) to keep idle HTTP connections alive.
    #[arg(long, default_value_t = DEFAULT_POOL_IDLE_TIMEOUT.as_secs())]
    pub pool_idle_timeout_secs: u64,
}

impl Config {
    pub fn validate(self) -> Result<Self, anyhow::Error> {
        if self.dashscope_api_key.trim().is_empty() {
            bail!("DASHSCOPE_API_KEY not found in environment variables");
        }
        if self.frontend_api_key.trim().is_empty() {
            bail!("FRONTEND_API_KEY not found in environment variables");
        }
        if self.upstream_timeout_secs == 0 {
            return Err(anyhow!("--upstream-timeout-secs must be at least 1"));
        }
        Ok(self)
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig::builder()
            .frontend_key(self.frontend_api_key.as_str())
            .upstream_key(self.dashscope_api_key.as_str())
            .speech_url(self.tts_url.clone())
            .chat_url(self.chat_url.clone())
            .timeout(Duration::from_secs(self.upstream_timeout_secs))
            .build()
    }
}
