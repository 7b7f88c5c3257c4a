//! Adapter configuration, read from a YAML file named by `TELNYX_CONFIG` or
//! from `TELNYX_*` environment variables.

use std::{fmt, fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "https://api.telnyx.com/v2";
pub const DEFAULT_VOICE_NAME: &str = "alice";
pub const DEFAULT_VOICE_LANGUAGE: &str = "en-US";

#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct TelnyxConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub from_number: String,
    #[serde(default)]
    pub connection_id: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default = "default_voice_name")]
    pub voice_name: String,
    #[serde(default = "default_voice_language")]
    pub voice_language: String,
    #[serde(default)]
    pub callback_base: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
    #[serde(default)]
    pub signature_tolerance_secs: Option<u64>,
    #[serde(default)]
    pub digits: MenuDigits,
}

/// Keypad digits of the alert call menu.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MenuDigits {
    #[serde(default = "default_ack_digit")]
    pub acknowledge: String,
    #[serde(default = "default_close_digit")]
    pub close: String,
    #[serde(default = "default_unsubscribe_digit")]
    pub unsubscribe: String,
}

impl Default for MenuDigits {
    fn default() -> Self {
        Self {
            acknowledge: default_ack_digit(),
            close: default_close_digit(),
            unsubscribe: default_unsubscribe_digit(),
        }
    }
}

impl Default for TelnyxConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: String::new(),
            from_number: String::new(),
            connection_id: String::new(),
            public_key: String::new(),
            voice_name: default_voice_name(),
            voice_language: default_voice_language(),
            callback_base: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
            signature_tolerance_secs: None,
            digits: MenuDigits::default(),
        }
    }
}

impl fmt::Debug for TelnyxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelnyxConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &redact(&self.api_key))
            .field("from_number", &self.from_number)
            .field("connection_id", &self.connection_id)
            .field("public_key", &self.public_key)
            .field("voice_name", &self.voice_name)
            .field("voice_language", &self.voice_language)
            .field("callback_base", &self.callback_base)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("lookup_timeout_ms", &self.lookup_timeout_ms)
            .field("signature_tolerance_secs", &self.signature_tolerance_secs)
            .field("digits", &self.digits)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "<redacted>" }
}

impl TelnyxConfig {
    /// Loads from the file named by `TELNYX_CONFIG` when set, else from the
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var("TELNYX_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(&path)),
            _ => Self::from_env(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let cfg: TelnyxConfig =
            serde_yaml_bw::from_str(&raw).map_err(|err| ConfigError::Parse {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;
        cfg.validated()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let cfg = Self {
            api_base: env_or("TELNYX_API_BASE", defaults.api_base),
            api_key: env_or("TELNYX_API_KEY", defaults.api_key),
            from_number: env_or("TELNYX_FROM_NUMBER", defaults.from_number),
            connection_id: env_or("TELNYX_CONNECTION_ID", defaults.connection_id),
            public_key: env_or("TELNYX_PUBLIC_KEY", defaults.public_key),
            voice_name: env_or("TELNYX_VOICE_NAME", defaults.voice_name),
            voice_language: env_or("TELNYX_VOICE_LANGUAGE", defaults.voice_language),
            callback_base: env_or("TELNYX_CALLBACK_BASE", defaults.callback_base),
            request_timeout_ms: env_u64("TELNYX_REQUEST_TIMEOUT_MS")?
                .unwrap_or(defaults.request_timeout_ms),
            lookup_timeout_ms: env_u64("TELNYX_LOOKUP_TIMEOUT_MS")?
                .unwrap_or(defaults.lookup_timeout_ms),
            signature_tolerance_secs: env_u64("TELNYX_SIGNATURE_TOLERANCE_SECS")?,
            digits: MenuDigits {
                acknowledge: env_or("TELNYX_ACK_DIGIT", defaults.digits.acknowledge),
                close: env_or("TELNYX_CLOSE_DIGIT", defaults.digits.close),
                unsubscribe: env_or("TELNYX_UNSUBSCRIBE_DIGIT", defaults.digits.unsubscribe),
            },
        };
        cfg.validated()
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        if self.voice_name.trim().is_empty() {
            self.voice_name = default_voice_name();
        }
        if self.voice_language.trim().is_empty() {
            self.voice_language = default_voice_language();
        }
        if self.api_base.trim().is_empty() {
            self.api_base = default_api_base();
        }
        let digits = [
            ("digits.acknowledge", &self.digits.acknowledge),
            ("digits.close", &self.digits.close),
            ("digits.unsubscribe", &self.digits.unsubscribe),
        ];
        for (key, digit) in digits {
            if digit.len() != 1 || !digit.chars().all(|c| c.is_ascii_digit() || c == '*' || c == '#')
            {
                return Err(ConfigError::Invalid {
                    key,
                    message: format!("expected a single keypad key, got {digit:?}"),
                });
            }
        }
        if self.digits.acknowledge == self.digits.close
            || self.digits.acknowledge == self.digits.unsubscribe
            || self.digits.close == self.digits.unsubscribe
        {
            return Err(ConfigError::Invalid {
                key: "digits",
                message: "menu digits must be distinct".into(),
            });
        }
        Ok(self)
    }

    /// Joins `path` onto the API base, tolerating slashes on either side.
    ///
    /// ```
    /// let cfg = tnx_core::TelnyxConfig::default();
    /// assert_eq!(cfg.api_url("/messages"), "https://api.telnyx.com/v2/messages");
    /// ```
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn signature_tolerance(&self) -> Option<Duration> {
        self.signature_tolerance_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn env_or(key: &str, default: String) -> String {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default,
    }
}

fn env_u64(key: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|err| ConfigError::Invalid {
                key,
                message: err.to_string(),
            }),
        _ => Ok(None),
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.into()
}

fn default_voice_name() -> String {
    DEFAULT_VOICE_NAME.into()
}

fn default_voice_language() -> String {
    DEFAULT_VOICE_LANGUAGE.into()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_lookup_timeout_ms() -> u64 {
    3_000
}

fn default_ack_digit() -> String {
    "4".into()
}

fn default_close_digit() -> String {
    "5".into()
}

fn default_unsubscribe_digit() -> String {
    "1".into()
}
