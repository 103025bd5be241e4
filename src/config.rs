use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::search::PageLimits;

const DEFAULT_API_URL: &str = "http://localhost:8080/";
const DEFAULT_STORAGE_DIR: &str = ".tickly";

#[derive(Debug, Clone, PartialEq)]
pub struct MockConfig {
    /// Global switch; a domain is mocked only when this and its own flag are set.
    pub enabled: bool,
    pub delay: Duration,
    pub auth: bool,
    pub events: bool,
    pub structures: bool,
    pub statistics: bool,
    pub ticketing: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay: Duration::from_millis(300),
            auth: true,
            events: true,
            structures: true,
            statistics: true,
            ticketing: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Auth,
    Events,
    Structures,
    Statistics,
    Ticketing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_url: String,
    pub mock: MockConfig,
    /// Directory holding the persistent storage file.
    pub storage_dir: PathBuf,
    pub pages: PageLimits,
    pub home_count: usize,
    pub featured_count: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            mock: MockConfig::default(),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            pages: PageLimits::default(),
            home_count: 6,
            featured_count: 3,
        }
    }
}

impl AppConfig {
    /// Reads `TICKLY_*` variables from the environment (and `.env`, when
    /// present). Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let d = Self::default();
        let mock_flag = |key: &str| parse_or(&lookup, key, true);

        let config = Self {
            api_url: lookup("TICKLY_API_URL").unwrap_or(d.api_url),
            mock: MockConfig {
                enabled: parse_or(&lookup, "TICKLY_USE_MOCKS", d.mock.enabled)?,
                delay: Duration::from_millis(parse_or(&lookup, "TICKLY_MOCK_DELAY_MS", 300u64)?),
                auth: mock_flag("TICKLY_MOCK_AUTH")?,
                events: mock_flag("TICKLY_MOCK_EVENTS")?,
                structures: mock_flag("TICKLY_MOCK_STRUCTURES")?,
                statistics: mock_flag("TICKLY_MOCK_STATISTICS")?,
                ticketing: mock_flag("TICKLY_MOCK_TICKETING")?,
            },
            storage_dir: lookup("TICKLY_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.storage_dir),
            pages: PageLimits {
                default_size: parse_or(&lookup, "TICKLY_PAGE_SIZE", d.pages.default_size)?,
                max_size: parse_or(&lookup, "TICKLY_MAX_PAGE_SIZE", d.pages.max_size)?,
            },
            home_count: parse_or(&lookup, "TICKLY_HOME_COUNT", d.home_count)?,
            featured_count: parse_or(&lookup, "TICKLY_FEATURED_COUNT", d.featured_count)?,
        };

        if config.pages.max_size == 0 {
            return Err(Error::Config("TICKLY_MAX_PAGE_SIZE must be positive".into()));
        }
        Ok(config)
    }

    pub fn is_mocked(&self, domain: Domain) -> bool {
        self.mock.enabled
            && match domain {
                Domain::Auth => self.mock.auth,
                Domain::Events => self.mock.events,
                Domain::Structures => self.mock.structures,
                Domain::Statistics => self.mock.statistics,
                Domain::Ticketing => self.mock.ticketing,
            }
    }

    pub fn persistent_storage_path(&self) -> PathBuf {
        self.storage_dir.join("persistent.json")
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("invalid value for {key}: '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(from(&[]).unwrap(), AppConfig::default());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = from(&[
            ("TICKLY_API_URL", "https://api.tickly.test/"),
            ("TICKLY_USE_MOCKS", "false"),
            ("TICKLY_MOCK_DELAY_MS", "0"),
            ("TICKLY_PAGE_SIZE", "20"),
        ])
        .unwrap();
        assert_eq!(config.api_url, "https://api.tickly.test/");
        assert!(!config.is_mocked(Domain::Events));
        assert_eq!(config.mock.delay, Duration::ZERO);
        assert_eq!(config.pages.default_size, 20);
    }

    #[test]
    fn domain_flag_needs_global_switch() {
        let config = from(&[("TICKLY_MOCK_AUTH", "false")]).unwrap();
        assert!(!config.is_mocked(Domain::Auth));
        assert!(config.is_mocked(Domain::Events));

        let config = from(&[("TICKLY_MOCK_TICKETING", "false")]).unwrap();
        assert!(!config.is_mocked(Domain::Ticketing));
        assert!(config.is_mocked(Domain::Statistics));
    }

    #[test]
    fn malformed_values_are_config_errors() {
        let err = from(&[("TICKLY_MOCK_DELAY_MS", "soon")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(from(&[("TICKLY_MAX_PAGE_SIZE", "0")]).is_err());
    }
}
