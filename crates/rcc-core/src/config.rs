//! Controller configuration
//!
//! Sources, later ones overriding earlier ones:
//! - built-in defaults
//! - a TOML file (`--config`)
//! - `RCC_BASE_URL` / `RCC_TIMEOUT_SECS`
//! - explicit `with_*` overrides

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding the server base URL
pub const ENV_BASE_URL: &str = "RCC_BASE_URL";
/// Environment variable overriding the request timeout
pub const ENV_TIMEOUT_SECS: &str = "RCC_TIMEOUT_SECS";

/// One main-menu entry that opens a resource list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    /// Element id of the menu button, e.g. `companies_index_btn`
    pub id: String,
    /// Resource kind the button lists
    pub kind: String,
    /// Button label
    #[serde(default)]
    pub label: Option<String>,
}

impl MenuEntry {
    /// Create menu entry
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            label: None,
        }
    }

    /// With button label
    #[inline]
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Server base URL
    pub base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Id of the results region resource views render into
    pub results_region: String,
    /// Id of the main menu
    pub main_menu: String,
    /// Class marking server-rendered error fragments
    pub error_marker_class: String,
    /// Message shown for transport failures
    pub generic_failure_message: String,
    /// Main-menu buttons
    pub menu: Vec<MenuEntry>,
}

impl ControllerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML configuration
    ///
    /// # Errors
    /// `ConfigError::Parse` on malformed input, `ConfigError::Invalid` on
    /// out-of-range values
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io` when the file cannot be read, otherwise as
    /// [`ControllerConfig::from_toml_str`]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&input)
    }

    /// Apply environment overrides
    ///
    /// # Errors
    /// `ConfigError::Invalid` when a variable holds an unusable value
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    ///
    /// # Errors
    /// `ConfigError::Invalid` when a value is unusable
    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "request_timeout_secs",
                message: format!("`{raw}` is not a number of seconds"),
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first bad key
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "base_url",
                message: "must not be empty".into(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "request_timeout_secs",
                message: "must be at least 1".into(),
            });
        }
        if self.results_region.is_empty() {
            return Err(ConfigError::Invalid {
                key: "results_region",
                message: "must name an element id".into(),
            });
        }
        Ok(())
    }

    /// Request timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// With base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// With results region id
    #[inline]
    #[must_use]
    pub fn with_results_region(mut self, id: impl Into<String>) -> Self {
        self.results_region = id.into();
        self
    }

    /// With menu entry
    #[inline]
    #[must_use]
    pub fn with_menu_entry(mut self, entry: MenuEntry) -> Self {
        self.menu.push(entry);
        self
    }

    /// Markup of the page shell: main menu plus empty results region
    #[must_use]
    pub fn page_shell(&self) -> String {
        let buttons: String = self
            .menu
            .iter()
            .map(|entry| {
                format!(
                    r#"<button id="{}" class="resource-list-btn" data-resource="{}">{}</button>"#,
                    entry.id,
                    entry.kind,
                    entry.label.as_deref().unwrap_or(&entry.kind)
                )
            })
            .collect();
        format!(
            r#"<body><nav id="{}">{buttons}</nav><button class="back-button" id="back-button">Back</button><div id="{}"></div></body>"#,
            self.main_menu, self.results_region
        )
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4567".into(),
            request_timeout_secs: 30,
            results_region: "results".into(),
            main_menu: "main-menu".into(),
            error_marker_class: "server-error".into(),
            generic_failure_message: "An error occurred.".into(),
            menu: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn toml_overrides_defaults() {
        let config = ControllerConfig::from_toml_str(
            r#"
            base_url = "http://admin.internal:8080"
            request_timeout_secs = 5

            [[menu]]
            id = "companies_index_btn"
            kind = "Company"
            label = "Companies"
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://admin.internal:8080");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.results_region, "results");
        assert_eq!(
            config.menu,
            vec![MenuEntry::new("companies_index_btn", "Company").with_label("Companies")]
        );
    }

    #[test]
    fn env_lookup_overrides_file() {
        let config = ControllerConfig::new()
            .apply_overrides(|key| match key {
                ENV_BASE_URL => Some("http://other:1".into()),
                ENV_TIMEOUT_SECS => Some("7".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.base_url, "http://other:1");
        assert_eq!(config.request_timeout_secs, 7);
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = ControllerConfig::new()
            .apply_overrides(|key| (key == ENV_TIMEOUT_SECS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "request_timeout_secs", .. }));
        assert!(ControllerConfig::from_toml_str("request_timeout_secs = 0").is_err());
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "results_region = \"main\"").unwrap();
        let config = ControllerConfig::load(file.path()).unwrap();
        assert_eq!(config.results_region, "main");

        let missing = ControllerConfig::load(Path::new("/nonexistent/rcc.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn shell_contains_menu_and_region() {
        let shell = ControllerConfig::new()
            .with_menu_entry(MenuEntry::new("markets_index_btn", "Market"))
            .page_shell();
        assert!(shell.contains(r#"id="markets_index_btn""#));
        assert!(shell.contains(r#"<div id="results"></div>"#));
    }
}
