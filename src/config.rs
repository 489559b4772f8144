// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Gate configuration.
//!
//! Stored as JSON in `~/.pagegate/config.json` using the option names of the
//! page script (`LOGIN_PAGE_URL`, `SESSION_TIMEOUT`, ...). Any field left out
//! of the file takes its default.
//!
//! ```json
//! {
//!   "LOGIN_PAGE_URL": "https://example.org/site/login.html",
//!   "HOME_PAGE_URL": "https://example.org/site/index.html",
//!   "SESSION_TIMEOUT": 432000000,
//!   "AUTH_CHECK_INTERVAL": 30000,
//!   "REDIRECT_DELAY": 3000
//! }
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// 120 hours in milliseconds
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 120 * 60 * 60 * 1000;

/// Check every 30 seconds
pub const DEFAULT_AUTH_CHECK_INTERVAL_MS: u64 = 30_000;

/// 3 seconds delay for redirect messages
pub const DEFAULT_REDIRECT_DELAY_MS: u64 = 3_000;

pub const DEFAULT_LOGIN_PAGE_URL: &str = "http://localhost:8000/login.html";
pub const DEFAULT_HOME_PAGE_URL: &str = "http://localhost:8000/index.html";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    #[serde(rename = "LOGIN_PAGE_URL")]
    pub login_page_url: String,

    #[serde(rename = "HOME_PAGE_URL")]
    pub home_page_url: String,

    /// Sliding session lifetime in milliseconds
    #[serde(rename = "SESSION_TIMEOUT")]
    pub session_timeout_ms: u64,

    /// Period of the background re-check in milliseconds
    #[serde(rename = "AUTH_CHECK_INTERVAL")]
    pub auth_check_interval_ms: u64,

    /// Pause between showing the redirect notice and leaving the page
    #[serde(rename = "REDIRECT_DELAY")]
    pub redirect_delay_ms: u64,

    /// Origin whose links get protected. Defaults to the home page's origin.
    #[serde(rename = "SITE_URL", skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            login_page_url: DEFAULT_LOGIN_PAGE_URL.to_string(),
            home_page_url: DEFAULT_HOME_PAGE_URL.to_string(),
            session_timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
            auth_check_interval_ms: DEFAULT_AUTH_CHECK_INTERVAL_MS,
            redirect_delay_ms: DEFAULT_REDIRECT_DELAY_MS,
            site_url: None,
        }
    }
}

impl GateConfig {
    /// Config for a site rooted at `base`, e.g. `https://example.org/site/`.
    pub fn for_site(base: &str) -> Result<Self> {
        let base = Url::parse(base).with_context(|| format!("Invalid site URL: {}", base))?;
        let login = base.join("login.html")?;
        let home = base.join("index.html")?;
        Ok(Self {
            login_page_url: login.to_string(),
            home_page_url: home.to_string(),
            site_url: Some(base.to_string()),
            ..Self::default()
        })
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn auth_check_interval(&self) -> Duration {
        Duration::from_millis(self.auth_check_interval_ms)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    /// Reject settings the guard cannot work with.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.login_page_url)
            .with_context(|| format!("LOGIN_PAGE_URL is not an absolute URL: {}", self.login_page_url))?;
        Url::parse(&self.home_page_url)
            .with_context(|| format!("HOME_PAGE_URL is not an absolute URL: {}", self.home_page_url))?;
        if let Some(site) = &self.site_url {
            Url::parse(site).with_context(|| format!("SITE_URL is not an absolute URL: {}", site))?;
        }
        if self.session_timeout_ms == 0 {
            bail!("SESSION_TIMEOUT must be greater than zero");
        }
        if self.auth_check_interval_ms == 0 {
            bail!("AUTH_CHECK_INTERVAL must be greater than zero");
        }
        if self.is_login_page(&self.home_page_url) {
            bail!("HOME_PAGE_URL must not be the login page");
        }
        Ok(())
    }

    /// Base URL of the site; its origin decides which links get protected.
    /// Falls back to the home page when `SITE_URL` is not set.
    pub fn site_base(&self) -> Result<Url> {
        let raw = self.site_url.as_deref().unwrap_or(&self.home_page_url);
        Url::parse(raw).with_context(|| format!("Invalid site URL: {}", raw))
    }

    /// Resolve a possibly relative page URL against the login page.
    pub fn resolve_page(&self, candidate: &str) -> Option<Url> {
        let base = Url::parse(&self.login_page_url).ok()?;
        base.join(candidate.trim()).ok()
    }

    /// Whether `candidate` is the login page (query and fragment ignored).
    ///
    /// Relative candidates such as `login.html` are resolved first.
    pub fn is_login_page(&self, candidate: &str) -> bool {
        match (Url::parse(&self.login_page_url), self.resolve_page(candidate)) {
            (Ok(login), Some(candidate)) => {
                login.origin() == candidate.origin() && login.path() == candidate.path()
            }
            _ => candidate.trim() == self.login_page_url,
        }
    }
}

/// `~/.pagegate`, created if missing.
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not find home directory")?;
    let dir = home.join(".pagegate");
    if !dir.exists() {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {:?}", dir))?;
    }
    Ok(dir)
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

/// Load and validate the config at `path`; a missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<GateConfig> {
    let config = if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?
    } else {
        tracing::debug!("No config at {:?}, using defaults", path);
        GateConfig::default()
    };

    config.validate()?;
    Ok(config)
}

pub fn save_config_to(path: &Path, config: &GateConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content).with_context(|| format!("Failed to write config file: {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = GateConfig::default();
        assert_eq!(config.session_timeout(), Duration::from_secs(120 * 3600));
        assert_eq!(config.auth_check_interval(), Duration::from_secs(30));
        assert_eq!(config.redirect_delay(), Duration::from_secs(3));
        config.validate().unwrap();
    }

    #[test]
    fn test_option_names_in_json() {
        let json = serde_json::to_value(GateConfig::default()).unwrap();
        for key in ["LOGIN_PAGE_URL", "HOME_PAGE_URL", "SESSION_TIMEOUT", "AUTH_CHECK_INTERVAL", "REDIRECT_DELAY"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert!(json.get("SITE_URL").is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "REDIRECT_DELAY": 500 }"#).unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.redirect_delay_ms, 500);
        assert_eq!(config.session_timeout_ms, DEFAULT_SESSION_TIMEOUT_MS);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, GateConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub").join("config.json");
        let config = GateConfig::for_site("https://example.org/site/").unwrap();

        save_config_to(&path, &config).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), config);
    }

    #[test]
    fn test_validation_failures() {
        let zero_timeout = GateConfig {
            session_timeout_ms: 0,
            ..GateConfig::default()
        };
        assert!(zero_timeout.validate().is_err());

        let relative_login = GateConfig {
            login_page_url: "login.html".to_string(),
            ..GateConfig::default()
        };
        assert!(relative_login.validate().is_err());

        let home_is_login = GateConfig {
            home_page_url: DEFAULT_LOGIN_PAGE_URL.to_string(),
            ..GateConfig::default()
        };
        assert!(home_is_login.validate().is_err());
    }

    #[test]
    fn test_for_site() {
        let config = GateConfig::for_site("https://example.org/site/").unwrap();
        assert_eq!(config.login_page_url, "https://example.org/site/login.html");
        assert_eq!(config.home_page_url, "https://example.org/site/index.html");
    }

    #[test]
    fn test_is_login_page_ignores_query_and_fragment() {
        let config = GateConfig::for_site("https://example.org/site/").unwrap();
        assert!(config.is_login_page("https://example.org/site/login.html"));
        assert!(config.is_login_page("https://example.org/site/login.html?next=1#top"));
        assert!(!config.is_login_page("https://example.org/site/index.html"));
        assert!(!config.is_login_page("https://evil.test/site/login.html"));
    }

    #[test]
    fn test_is_login_page_resolves_relative_urls() {
        let config = GateConfig::for_site("https://example.org/site/").unwrap();
        assert!(config.is_login_page("login.html"));
        assert!(config.is_login_page("./login.html?retry=1"));
        assert!(config.is_login_page("/site/login.html"));
        assert!(!config.is_login_page("courses.html"));
        assert!(!config.is_login_page("//evil.test/site/login.html"));
    }

    #[test]
    fn test_site_base_falls_back_to_home() {
        let mut config = GateConfig::default();
        assert_eq!(
            config.site_base().unwrap().origin(),
            Url::parse("http://localhost:8000/").unwrap().origin()
        );
        config.site_url = Some("https://cdn.example.org/".to_string());
        assert_eq!(
            config.site_base().unwrap().as_str(),
            "https://cdn.example.org/"
        );
    }
}
