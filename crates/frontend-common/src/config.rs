//! Client configuration

use logistics_http::SmsRoutes;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Fixed authentication and verification settings
pub struct AuthConfig;

impl AuthConfig {
    /// Storage key for the access token
    pub const ACCESS_TOKEN_KEY: &'static str = "accessToken";

    /// Storage key for the refresh token
    pub const REFRESH_TOKEN_KEY: &'static str = "refreshToken";

    /// Resend cooldown used when the server does not advertise one
    pub const DEFAULT_RESEND_COOLDOWN_SECS: u64 = 60;

    /// How often the cooldown display is recomputed
    pub const COOLDOWN_TICK: Duration = Duration::from_millis(250);
}

/// Endpoints and transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Auth, SMS and user service
    pub api_base_url: String,

    /// Waybill service, a separate origin
    pub core_api_base_url: String,

    /// Request timeout in seconds (0 disables it)
    pub timeout_secs: u64,

    pub sms: SmsRoutes,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            core_api_base_url: "http://localhost:8081".to_string(),
            timeout_secs: 10,
            sms: SmsRoutes::default(),
        }
    }
}

impl ClientConfig {
    /// Load defaults, then the optional file, then `LOGISTICS_*` variables
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value has the wrong type
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        Self::load_from(path, environment())
    }

    fn load_from(
        path: Option<&Path>,
        env: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("api_base_url", defaults.api_base_url)?
            .set_default("core_api_base_url", defaults.core_api_base_url)?
            .set_default("timeout_secs", defaults.timeout_secs)?
            .set_default("sms.config_path", defaults.sms.config_path)?
            .set_default("sms.send_code_path", defaults.sms.send_code_path)?
            .set_default("sms.resend_code_path", defaults.sms.resend_code_path)?
            .set_default("sms.verify_code_path", defaults.sms.verify_code_path)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        builder.add_source(env).build()?.try_deserialize()
    }

    /// Request timeout, if enabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("LOGISTICS")
        .prefix_separator("_")
        .separator("__")
}
