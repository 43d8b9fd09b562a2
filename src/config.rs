use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub browser: BrowserConfig,
    pub http: HttpConfig,
    pub timing: TimingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub user_agent: String,
    pub chrome_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Bounded wait for element presence/clickability.
    pub element_wait_secs: f64,
    /// Settle delay after a load trigger fires.
    pub settle_secs: f64,
    /// Settle delay after navigating to a target.
    pub navigation_settle_secs: f64,
    /// Politeness delay between paginated API calls.
    pub api_page_delay_secs: f64,
}

impl TimingConfig {
    pub fn element_wait(&self) -> Duration {
        Duration::from_secs_f64(self.element_wait_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs_f64(self.settle_secs)
    }

    pub fn navigation_settle(&self) -> Duration {
        Duration::from_secs_f64(self.navigation_settle_secs)
    }

    pub fn api_page_delay(&self) -> Duration {
        Duration::from_secs_f64(self.api_page_delay_secs)
    }
}

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            browser: BrowserConfig {
                headless: true,
                user_agent: DEFAULT_USER_AGENT.to_string(),
                chrome_path: None,
            },
            http: HttpConfig {
                request_timeout_secs: 30,
                retry_attempts: 2,
                retry_delay_ms: 500,
                user_agent: DEFAULT_USER_AGENT.to_string(),
            },
            timing: TimingConfig {
                element_wait_secs: 10.0,
                settle_secs: 3.0,
                navigation_settle_secs: 2.0,
                api_page_delay_secs: 1.0,
            },
        }
    }
}

impl EngineConfig {
    /// Layered load: coded defaults, then an optional `config/default` file,
    /// then `MAGPIE__`-prefixed environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = EngineConfig::default();

        let s = Config::builder()
            .set_default("browser.headless", defaults.browser.headless)?
            .set_default("browser.user_agent", defaults.browser.user_agent)?
            .set_default(
                "http.request_timeout_secs",
                defaults.http.request_timeout_secs,
            )?
            .set_default("http.retry_attempts", defaults.http.retry_attempts as u64)?
            .set_default("http.retry_delay_ms", defaults.http.retry_delay_ms)?
            .set_default("http.user_agent", defaults.http.user_agent)?
            .set_default("timing.element_wait_secs", defaults.timing.element_wait_secs)?
            .set_default("timing.settle_secs", defaults.timing.settle_secs)?
            .set_default(
                "timing.navigation_settle_secs",
                defaults.timing.navigation_settle_secs,
            )?
            .set_default(
                "timing.api_page_delay_secs",
                defaults.timing.api_page_delay_secs,
            )?
            .add_source(File::with_name("config/default").required(false))
            .add_source(Environment::with_prefix("MAGPIE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
