use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// 计数存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterBackend {
    Redis,
    Memory,
}

impl FromStr for CounterBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(CounterBackend::Redis),
            "memory" => Ok(CounterBackend::Memory),
            other => Err(format!("unknown counter backend `{}`", other)),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value `{value}` for {name}")]
    Invalid { name: &'static str, value: String },
    #[error("RATE_LIMIT_WINDOW and RATE_LIMIT_REQUESTS must be set together")]
    IncompleteRateLimit,
}

/// 单个接收者的限流策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub limit_per_window: u64,
    pub retry_interval: Duration,
    pub max_retries: u32,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            limit_per_window: 20,
            retry_interval: Duration::from_secs(1),
            max_retries: 10,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub redis_url: String,
    pub telegram_bot_token: String,
    pub telegram_api_url: String,
    pub intake_queue: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u64,
    pub retry_interval_secs: u64,
    pub max_retries: u32,
    pub store_timeout_ms: u64,
    pub counter_backend: CounterBackend,
    pub expiry_check_interval_secs: u64,
    pub max_in_flight: Option<usize>,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 从任意键值来源解析配置，`from_env` 传入环境变量
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        // 窗口和上限必须一起配置
        let (window, requests) = match (
            lookup("RATE_LIMIT_WINDOW"),
            lookup("RATE_LIMIT_REQUESTS"),
        ) {
            (Some(window), Some(requests)) => (
                parse_value::<u64>("RATE_LIMIT_WINDOW", &window)?,
                parse_value::<u64>("RATE_LIMIT_REQUESTS", &requests)?,
            ),
            (None, None) => (60, 20),
            _ => return Err(ConfigError::IncompleteRateLimit),
        };
        if window == 0 {
            return Err(ConfigError::Invalid {
                name: "RATE_LIMIT_WINDOW",
                value: window.to_string(),
            });
        }
        if requests == 0 {
            return Err(ConfigError::Invalid {
                name: "RATE_LIMIT_REQUESTS",
                value: requests.to_string(),
            });
        }

        let optional = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Config {
            redis_url: required("REDIS_URL")?,
            telegram_bot_token: required("TELEGRAM_BOT_TOKEN")?,
            telegram_api_url: optional("TELEGRAM_API_URL")
                .unwrap_or_else(|| "https://api.telegram.org".into()),
            intake_queue: optional("INTAKE_QUEUE").unwrap_or_else(|| "telegram:outbound".into()),
            rate_limit_window_secs: window,
            rate_limit_requests: requests,
            retry_interval_secs: optional("RETRY_INTERVAL")
                .map(|v| parse_value("RETRY_INTERVAL", &v))
                .transpose()?
                .unwrap_or(1),
            max_retries: optional("MAX_RETRIES")
                .map(|v| parse_value("MAX_RETRIES", &v))
                .transpose()?
                .unwrap_or(10),
            store_timeout_ms: optional("STORE_TIMEOUT_MS")
                .map(|v| parse_value("STORE_TIMEOUT_MS", &v))
                .transpose()?
                .unwrap_or(2000),
            counter_backend: optional("COUNTER_BACKEND")
                .map(|v| parse_value("COUNTER_BACKEND", &v))
                .transpose()?
                .unwrap_or(CounterBackend::Redis),
            expiry_check_interval_secs: optional("EXPIRY_CHECK_INTERVAL")
                .map(|v| parse_value("EXPIRY_CHECK_INTERVAL", &v))
                .transpose()?
                .unwrap_or(5),
            max_in_flight: optional("MAX_IN_FLIGHT")
                .map(|v| parse_value::<usize>("MAX_IN_FLIGHT", &v))
                .transpose()?
                .filter(|n| *n > 0),
            server_host: optional("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: optional("SERVER_PORT")
                .map(|v| parse_value("SERVER_PORT", &v))
                .transpose()?
                .unwrap_or(3000),
        })
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn expiry_check_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_check_interval_secs.max(1))
    }

    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            window: self.rate_limit_window(),
            limit_per_window: self.rate_limit_requests,
            retry_interval: Duration::from_secs(self.retry_interval_secs),
            max_retries: self.max_retries,
        }
    }
}

fn parse_value<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}
