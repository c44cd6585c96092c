use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Public resume page URL with a `{slug}` placeholder.
    pub resume_url_template: String,
    pub port: u16,
    pub rust_log: String,
    pub browser: BrowserConfig,
    /// Cap on simultaneous browser processes. `None` means one process per
    /// request with no upper bound.
    pub max_concurrent_renders: Option<usize>,
}

/// Headless browser launch and timing parameters.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub executable: Option<PathBuf>,
    pub no_sandbox: bool,
    pub navigation_timeout: Duration,
    pub readiness_timeout: Duration,
    pub ready_selector: String,
}

pub const SLUG_PLACEHOLDER: &str = "{slug}";

const DEFAULT_PORT: u16 = 4000;
const DEFAULT_RESUME_URL_TEMPLATE: &str = "http://localhost:3000/r/{slug}";
const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_READINESS_TIMEOUT_SECS: u64 = 15;
const DEFAULT_READY_SELECTOR: &str = "#pdf-ready";
const MAX_TIMEOUT_SECS: u64 = 600;
const MAX_CONCURRENT_RENDERS_CAP: usize = 1024;

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = var("DATABASE_URL")
            .context("Required environment variable 'DATABASE_URL' is not set")?;

        let resume_url_template =
            var("RESUME_URL_TEMPLATE").unwrap_or_else(|| DEFAULT_RESUME_URL_TEMPLATE.to_string());
        if !resume_url_template.contains(SLUG_PLACEHOLDER) {
            bail!("RESUME_URL_TEMPLATE must contain the {SLUG_PLACEHOLDER} placeholder");
        }

        let port = match var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            None => DEFAULT_PORT,
        };

        let navigation_timeout = parse_secs(
            var("NAVIGATION_TIMEOUT_SECS"),
            "NAVIGATION_TIMEOUT_SECS",
            DEFAULT_NAVIGATION_TIMEOUT_SECS,
        )?;
        let readiness_timeout = parse_secs(
            var("READINESS_TIMEOUT_SECS"),
            "READINESS_TIMEOUT_SECS",
            DEFAULT_READINESS_TIMEOUT_SECS,
        )?;
        if readiness_timeout > navigation_timeout {
            bail!(
                "READINESS_TIMEOUT_SECS ({}) must not exceed NAVIGATION_TIMEOUT_SECS ({})",
                readiness_timeout.as_secs(),
                navigation_timeout.as_secs()
            );
        }

        let no_sandbox = match var("CHROME_NO_SANDBOX") {
            Some(raw) => parse_bool(&raw).context("CHROME_NO_SANDBOX must be true or false")?,
            None => true,
        };

        let max_concurrent_renders = match var("MAX_CONCURRENT_RENDERS") {
            Some(raw) => {
                let limit = raw
                    .parse::<usize>()
                    .context("MAX_CONCURRENT_RENDERS must be a non-negative integer")?;
                if limit > MAX_CONCURRENT_RENDERS_CAP {
                    bail!(
                        "MAX_CONCURRENT_RENDERS ({limit}) must not exceed {MAX_CONCURRENT_RENDERS_CAP}"
                    );
                }
                // 0 disables the cap
                (limit > 0).then_some(limit)
            }
            None => None,
        };

        Ok(Config {
            database_url,
            resume_url_template,
            port,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            browser: BrowserConfig {
                executable: var("CHROME_EXECUTABLE")
                    .filter(|p| !p.trim().is_empty())
                    .map(PathBuf::from),
                no_sandbox,
                navigation_timeout,
                readiness_timeout,
                ready_selector: var("READY_SELECTOR")
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_READY_SELECTOR.to_string()),
            },
            max_concurrent_renders,
        })
    }
}

fn parse_secs(raw: Option<String>, key: &str, default: u64) -> Result<Duration> {
    let secs = match raw {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("{key} must be a whole number of seconds"))?,
        None => default,
    };
    if secs == 0 {
        bail!("{key} must be greater than zero");
    }
    if secs > MAX_TIMEOUT_SECS {
        bail!("{key} ({secs}) must not exceed {MAX_TIMEOUT_SECS} seconds");
    }
    Ok(Duration::from_secs(secs))
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("unrecognised boolean '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_applied() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/resumes")]).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.resume_url_template, "http://localhost:3000/r/{slug}");
        assert_eq!(config.browser.navigation_timeout, Duration::from_secs(30));
        assert_eq!(config.browser.readiness_timeout, Duration::from_secs(15));
        assert_eq!(config.browser.ready_selector, "#pdf-ready");
        assert!(config.browser.no_sandbox);
        assert!(config.browser.executable.is_none());
        assert!(config.max_concurrent_renders.is_none());
    }

    #[test]
    fn test_database_url_required() {
        let err = config_from(&[]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_template_must_contain_slug() {
        let err = config_from(&[
            ("DATABASE_URL", "postgres://localhost/resumes"),
            ("RESUME_URL_TEMPLATE", "https://example.com/r/"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("{slug}"));
    }

    #[test]
    fn test_readiness_cannot_exceed_navigation() {
        let err = config_from(&[
            ("DATABASE_URL", "postgres://localhost/resumes"),
            ("NAVIGATION_TIMEOUT_SECS", "10"),
            ("READINESS_TIMEOUT_SECS", "20"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("READINESS_TIMEOUT_SECS"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(config_from(&[
            ("DATABASE_URL", "postgres://localhost/resumes"),
            ("NAVIGATION_TIMEOUT_SECS", "0"),
        ])
        .is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/resumes"),
            ("PORT", "8081"),
            ("CHROME_EXECUTABLE", "/usr/bin/chromium"),
            ("CHROME_NO_SANDBOX", "false"),
            ("READY_SELECTOR", "#resume-painted"),
            ("MAX_CONCURRENT_RENDERS", "4"),
        ])
        .unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(
            config.browser.executable,
            Some(PathBuf::from("/usr/bin/chromium"))
        );
        assert!(!config.browser.no_sandbox);
        assert_eq!(config.browser.ready_selector, "#resume-painted");
        assert_eq!(config.max_concurrent_renders, Some(4));
    }

    #[test]
    fn test_zero_concurrency_means_unbounded() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/resumes"),
            ("MAX_CONCURRENT_RENDERS", "0"),
        ])
        .unwrap();
        assert!(config.max_concurrent_renders.is_none());
    }

    #[test]
    fn test_oversized_timeout_rejected() {
        let err = config_from(&[
            ("DATABASE_URL", "postgres://localhost/resumes"),
            ("NAVIGATION_TIMEOUT_SECS", "18446744073709551615"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("must not exceed 600"));

        assert!(config_from(&[
            ("DATABASE_URL", "postgres://localhost/resumes"),
            ("NAVIGATION_TIMEOUT_SECS", "600"),
            ("READINESS_TIMEOUT_SECS", "600"),
        ])
        .is_ok());
    }

    #[test]
    fn test_oversized_concurrency_rejected() {
        let err = config_from(&[
            ("DATABASE_URL", "postgres://localhost/resumes"),
            ("MAX_CONCURRENT_RENDERS", "100000"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("must not exceed 1024"));
    }

    #[test]
    fn test_negative_concurrency_message() {
        let err = config_from(&[
            ("DATABASE_URL", "postgres://localhost/resumes"),
            ("MAX_CONCURRENT_RENDERS", "-1"),
        ])
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "MAX_CONCURRENT_RENDERS must be a non-negative integer"
        );
    }

    #[test]
    fn test_invalid_bool_rejected() {
        assert!(config_from(&[
            ("DATABASE_URL", "postgres://localhost/resumes"),
            ("CHROME_NO_SANDBOX", "maybe"),
        ])
        .is_err());
    }
}
