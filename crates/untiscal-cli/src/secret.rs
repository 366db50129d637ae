//! Secret reference resolver.
//!
//! WebUntis credentials in `config.toml` or the environment can use special
//! prefixes to reference secrets stored elsewhere:
//!
//! - `pass::path/in/store` runs `pass show path/in/store` and keeps the first line
//! - `env::VAR_NAME` reads `$VAR_NAME` from the environment
//! - anything else is used as plain text

use std::process::Command;

use thiserror::Error;
use tracing::debug;

/// Reasons a secret reference cannot be resolved.
#[derive(Debug, Error)]
pub enum SecretError {
    /// `pass` could not be started.
    #[error("failed to run `pass show {path}`: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// `pass` exited with an error.
    #[error("`pass show {path}` failed ({status}): {stderr}")]
    PassFailed {
        path: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// `pass` printed nothing.
    #[error("`pass show {0}` produced no output")]
    Empty(String),

    /// The referenced environment variable is not set.
    #[error("environment variable `{0}` is not set")]
    MissingEnv(String),
}

/// Resolves a value that may contain a secret reference prefix.
pub fn resolve(value: &str) -> Result<String, SecretError> {
    if let Some(path) = value.strip_prefix("pass::") {
        debug!(path, "Resolving secret from pass");
        resolve_pass(path)
    } else if let Some(var) = value.strip_prefix("env::") {
        debug!(var, "Resolving secret from environment");
        std::env::var(var).map_err(|_| SecretError::MissingEnv(var.to_string()))
    } else {
        Ok(value.to_string())
    }
}

fn resolve_pass(path: &str) -> Result<String, SecretError> {
    let output = Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|source| SecretError::Spawn {
            path: path.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(SecretError::PassFailed {
            path: path.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| SecretError::Empty(path.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passthrough() {
        assert_eq!(resolve("hello").unwrap(), "hello");
        assert_eq!(resolve("").unwrap(), "");
        assert_eq!(resolve("p@ss::word").unwrap(), "p@ss::word");
    }

    #[test]
    fn env_prefix_resolves() {
        unsafe {
            std::env::set_var("_UNTISCAL_TEST_SECRET", "my-secret-value");
        }
        assert_eq!(
            resolve("env::_UNTISCAL_TEST_SECRET").unwrap(),
            "my-secret-value"
        );
        unsafe {
            std::env::remove_var("_UNTISCAL_TEST_SECRET");
        }
    }

    #[test]
    fn env_prefix_missing_var_errors() {
        let err = resolve("env::_UNTISCAL_NONEXISTENT_VAR_12345").unwrap_err();
        assert!(matches!(err, SecretError::MissingEnv(_)));
        assert!(err.to_string().contains("not set"));
    }

    #[test]
    fn pass_prefix_unknown_entry_errors() {
        // Fails either because `pass` is not installed or the entry is absent.
        let result = resolve("pass::nonexistent/entry/that/should/not/exist/12345");
        assert!(result.is_err());
    }
}
