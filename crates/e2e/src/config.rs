//! Harness configuration

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::error::{HarnessError, HarnessResult};

/// Readiness text the health endpoint must contain
pub const DEFAULT_READY_MESSAGE: &str = "Table Extractor API Ready";

/// Credential value the upstream provider is expected to reject
pub const DEFAULT_INVALID_CREDENTIAL: &str = "invalid_key_12345";

/// Configuration for a harness run
///
/// Loaded from TOML; every key is optional except that `credential` must be
/// supplied somewhere (file, environment or flag) before the run starts.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Root URL of the service under test (without the `/api` prefix)
    pub base_url: String,

    /// Credential forwarded as `api_key` on extract calls
    pub credential: Option<String>,

    /// Credential used by the rejected-credential scenario
    pub invalid_credential: String,

    /// Per-call transport timeout
    pub timeout_secs: u64,

    /// Substring the health endpoint's `message` must contain
    pub ready_message: String,

    /// Require extracted headers and row count to match the fixture
    pub check_fidelity: bool,

    /// TrueType fonts tried, in order, when rendering the image fixture
    pub font_paths: Vec<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8001".to_string(),
            credential: None,
            invalid_credential: DEFAULT_INVALID_CREDENTIAL.to_string(),
            timeout_secs: 60,
            ready_message: DEFAULT_READY_MESSAGE.to_string(),
            check_fidelity: true,
            font_paths: default_font_paths(),
        }
    }
}

// Keeps the credential out of logs.
impl fmt::Debug for HarnessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarnessConfig")
            .field("base_url", &self.base_url)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("invalid_credential", &self.invalid_credential)
            .field("timeout_secs", &self.timeout_secs)
            .field("ready_message", &self.ready_message)
            .field("check_fidelity", &self.check_fidelity)
            .field("font_paths", &self.font_paths)
            .finish()
    }
}

impl HarnessConfig {
    /// Parse a config from a TOML string
    pub fn from_toml(content: &str) -> HarnessResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Parse a config from a TOML file
    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check the config and return the parsed base URL
    pub fn validate(&self) -> HarnessResult<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            HarnessError::InvalidConfig(format!("base_url '{}': {}", self.base_url, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(HarnessError::InvalidConfig(format!(
                "base_url '{}': scheme must be http or https",
                self.base_url
            )));
        }

        match self.credential.as_deref() {
            Some(c) if !c.trim().is_empty() => {}
            _ => {
                return Err(HarnessError::InvalidConfig(
                    "credential is required (set TABLECHECK_API_KEY or --api-key)".to_string(),
                ))
            }
        }

        if self.timeout_secs == 0 {
            return Err(HarnessError::InvalidConfig(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(url)
    }
}

fn default_font_paths() -> Vec<PathBuf> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/Library/Fonts/Arial.ttf",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_credential() -> HarnessConfig {
        HarnessConfig {
            credential: Some("key".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.ready_message, DEFAULT_READY_MESSAGE);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(config.check_fidelity);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = HarnessConfig::from_toml(
            r#"
base_url = "https://extractor.example.com"
credential = "abc"
timeout_secs = 5
"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://extractor.example.com");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.invalid_credential, DEFAULT_INVALID_CREDENTIAL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unparseable_base_url_is_rejected() {
        let config = HarnessConfig {
            base_url: "not a url".to_string(),
            ..with_credential()
        };
        assert!(matches!(config.validate(), Err(HarnessError::InvalidConfig(_))));
    }

    #[test]
    fn test_non_http_scheme_is_rejected() {
        let config = HarnessConfig {
            base_url: "ftp://example.com".to_string(),
            ..with_credential()
        };
        assert!(matches!(config.validate(), Err(HarnessError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_credential_is_rejected() {
        let config = HarnessConfig::default();
        assert!(matches!(config.validate(), Err(HarnessError::InvalidConfig(_))));

        let blank = HarnessConfig {
            credential: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_credential() {
        let rendered = format!("{:?}", with_credential());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("\"key\""));
    }
}
