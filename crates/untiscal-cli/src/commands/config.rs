//! Configuration commands.

use crate::config::{Config, ConfigError};
use crate::error::SyncResult;

/// Dump the effective configuration to stdout, with the password redacted.
pub fn dump(config: &Config) -> SyncResult<()> {
    println!("# config.toml ({})", Config::default_path().display());
    println!("{}", render(config)?);
    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &Config) -> SyncResult<()> {
    config.validate()?;
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path() -> SyncResult<()> {
    println!("config: {}", Config::default_path().display());
    Ok(())
}

fn render(config: &Config) -> Result<String, ConfigError> {
    let mut redacted = config.clone();
    if redacted.webuntis.password.is_some() {
        redacted.webuntis.password = Some("<redacted>".to_string());
    }
    toml::to_string_pretty(&redacted).map_err(|e| ConfigError::Invalid {
        key: "config",
        message: format!("failed to serialize config: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_redacts_password() {
        let mut config = Config::default();
        config.webuntis.school = Some("demo".to_string());
        config.webuntis.password = Some("hunter2".to_string());

        let rendered = render(&config).unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("password = \"<redacted>\""));
        assert!(rendered.contains("school = \"demo\""));

        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.calendar.name, config.calendar.name);
    }

    #[test]
    fn validate_reports_missing_settings() {
        let err = validate(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("webuntis.server"));
    }
}
