//! Sync configuration.
//!
//! Settings are layered: built-in defaults, then an optional `config.toml`
//! (`~/.config/untiscal/config.toml` by default), then environment
//! variables. Empty values count as unset at every layer.
//!
//! Credential values (`username`, `password`) may be secret references,
//! `pass::path/in/store` or `env::VAR_NAME` (see [`crate::secret`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Days, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use untiscal_core::{CalendarMeta, DateRange, SwitchPolicy};
use untiscal_providers::NameStyle;
use untiscal_providers::webuntis::WebUntisConfig;

/// Days after today used as switch date when none is configured.
pub const DEFAULT_SWITCH_OFFSET_DAYS: u64 = 28;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A required setting is absent.
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    /// A setting has an unusable value.
    #[error("invalid value for `{key}`: {message}")]
    Invalid { key: &'static str, message: String },

    /// A secret reference could not be resolved.
    #[error("failed to resolve `{key}`: {source}")]
    Secret {
        key: &'static str,
        #[source]
        source: crate::secret::SecretError,
    },
}

// ---------------------------------------------------------------------------
// Config (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for a sync run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WebUntis connection and entity settings.
    pub webuntis: WebUntisSettings,

    /// Calendar output settings.
    pub calendar: CalendarSettings,

    /// Fetch window settings.
    pub range: RangeSettings,
}

/// WebUntis connection settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebUntisSettings {
    /// Server host, e.g. `mese.webuntis.com`.
    pub server: Option<String>,

    /// School name.
    pub school: Option<String>,

    /// Username (supports `pass::` and `env::` prefixes).
    pub username: Option<String>,

    /// Password (supports `pass::` and `env::` prefixes).
    pub password: Option<String>,

    /// Class id of the current timetable; auto-detected when absent.
    pub class_id: Option<i64>,

    /// Class id of the timetable taking over at `switch_date`.
    pub future_class_id: Option<i64>,

    /// First day of the future timetable, `YYYY-MM-DD`.
    pub switch_date: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for WebUntisSettings {
    fn default() -> Self {
        Self {
            server: None,
            school: None,
            username: None,
            password: None,
            class_id: None,
            future_class_id: None,
            switch_date: None,
            timeout_secs: WebUntisConfig::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for WebUntisSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebUntisSettings")
            .field("server", &self.server)
            .field("school", &self.school)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("class_id", &self.class_id)
            .field("future_class_id", &self.future_class_id)
            .field("switch_date", &self.switch_date)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Calendar output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Calendar display name.
    pub name: String,

    /// IANA timezone of the school.
    pub timezone: String,

    /// Output file path.
    pub output: PathBuf,

    /// Whether long or short element names are shown.
    pub name_style: NameStyle,

    /// Whether cancelled lessons are published (marked `[Cancelled]`).
    pub include_cancelled: bool,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            name: untiscal_core::ics::DEFAULT_CALENDAR_NAME.to_string(),
            timezone: "Europe/Brussels".to_string(),
            output: PathBuf::from("docs/calendar.ics"),
            name_style: NameStyle::Long,
            include_cancelled: true,
        }
    }
}

/// Fetch window relative to today.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeSettings {
    /// Days before today to include.
    pub past_days: u32,

    /// Days after today to include.
    pub future_days: u32,
}

impl Default for RangeSettings {
    fn default() -> Self {
        Self {
            past_days: 60,
            future_days: 155,
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or from the default path if it
    /// exists, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Loads configuration from a specific path, without environment
    /// overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("untiscal")
    }

    /// Overrides settings from environment variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let w = &mut self.webuntis;

        if let Some(v) = get("WEBUNTIS_SERVER") {
            w.server = Some(v);
        }
        if let Some(v) = get("WEBUNTIS_SCHOOL") {
            w.school = Some(v);
        }
        if let Some(v) = get("WEBUNTIS_USERNAME") {
            w.username = Some(v);
        }
        if let Some(v) = get("WEBUNTIS_PASSWORD") {
            w.password = Some(v);
        }
        if let Some(v) = get("WEBUNTIS_CLASS_ID") {
            w.class_id = Some(parse_id("webuntis.class_id", &v)?);
        }
        if let Some(v) = get("WEBUNTIS_FUTURE_CLASS_ID") {
            w.future_class_id = Some(parse_id("webuntis.future_class_id", &v)?);
        }
        if let Some(v) = get("SEMESTER_SWITCH_DATE") {
            w.switch_date = Some(v);
        }
        Ok(())
    }

    /// Builds the WebUntis source configuration, resolving secrets.
    pub fn webuntis_config(&self) -> Result<WebUntisConfig, ConfigError> {
        let w = &self.webuntis;
        let server = required(&w.server, "webuntis.server")?;
        let school = required(&w.school, "webuntis.school")?;
        let username = resolve_secret(required(&w.username, "webuntis.username")?, "webuntis.username")?;
        let password = resolve_secret(required(&w.password, "webuntis.password")?, "webuntis.password")?;

        let config = WebUntisConfig::new(server, school).map_err(|e| ConfigError::Invalid {
            key: "webuntis.server",
            message: e.to_string(),
        })?;
        Ok(config
            .with_credentials(username, password)
            .with_timeout(Duration::from_secs(w.timeout_secs)))
    }

    /// Parses the configured timezone.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.calendar
            .timezone
            .parse::<Tz>()
            .map_err(|e| ConfigError::Invalid {
                key: "calendar.timezone",
                message: e.to_string(),
            })
    }

    /// Returns the calendar metadata.
    pub fn calendar_meta(&self) -> Result<CalendarMeta, ConfigError> {
        Ok(CalendarMeta::new(self.calendar.name.clone(), self.timezone()?))
    }

    /// Returns the fetch window `[today - past_days, today + future_days]`.
    pub fn window(&self, today: NaiveDate) -> DateRange {
        let start = today
            .checked_sub_days(Days::new(u64::from(self.range.past_days)))
            .unwrap_or(today);
        let last = today
            .checked_add_days(Days::new(u64::from(self.range.future_days)))
            .unwrap_or(today);
        DateRange::inclusive(start, last)
    }

    /// Builds the semester switch policy.
    ///
    /// A missing or unparseable switch date falls back to today plus
    /// [`DEFAULT_SWITCH_OFFSET_DAYS`]; when a future class is configured the
    /// fallback is logged as a warning.
    pub fn switch_policy(&self, today: NaiveDate) -> SwitchPolicy {
        let w = &self.webuntis;
        let fallback = today
            .checked_add_days(Days::new(DEFAULT_SWITCH_OFFSET_DAYS))
            .unwrap_or(today);

        let parsed = w
            .switch_date
            .as_deref()
            .map(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d"));
        let switch_date = match parsed {
            Some(Ok(date)) => date,
            Some(Err(_)) | None => {
                if w.future_class_id.is_some() {
                    warn!(
                        value = w.switch_date.as_deref().unwrap_or(""),
                        %fallback,
                        "Switch date missing or not YYYY-MM-DD, using default"
                    );
                }
                fallback
            }
        };

        let policy = SwitchPolicy::current_only(switch_date, w.class_id);
        match w.future_class_id {
            Some(id) => policy.with_future_entity(id),
            None => policy,
        }
    }

    /// Checks every setting a networked sync needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.webuntis_config()?;
        self.timezone()?;
        if let Some(ref date) = self.webuntis.switch_date
            && NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").is_err()
        {
            return Err(ConfigError::Invalid {
                key: "webuntis.switch_date",
                message: format!("`{date}` is not YYYY-MM-DD"),
            });
        }
        Ok(())
    }
}

fn required<'a>(value: &'a Option<String>, key: &'static str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn resolve_secret(value: &str, key: &'static str) -> Result<String, ConfigError> {
    crate::secret::resolve(value).map_err(|source| ConfigError::Secret { key, source })
}

fn parse_id(key: &'static str, value: &str) -> Result<i64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        message: format!("`{value}` is not an integer id"),
    })
}
