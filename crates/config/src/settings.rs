// Sync settings
// Loaded from ~/.config/wrsync/config.toml (or --config)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use wrsync_core::Feed;
use wrsync_recon::config::ReconcileConfig;

use crate::error::ConfigError;

/// Wiki connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WikiSettings {
    /// MediaWiki action API endpoint
    pub api_url: String,

    /// Bot account name (password comes from the secrets lookup)
    pub username: String,

    /// Prepended to an entity id to form its page title
    pub title_prefix: String,

    /// Pause between consecutive API requests
    pub request_delay_ms: u64,

    pub user_agent: String,
}

impl Default for WikiSettings {
    fn default() -> Self {
        Self {
            api_url: "https://ukikipedia.net/mediawiki/api.php".to_string(),
            username: String::new(),
            title_prefix: "RTA Guide/".to_string(),
            request_delay_ms: 1000,
            user_agent: concat!("wrsync/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// One spreadsheet and the range read from it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetSource {
    pub spreadsheet_id: String,
    pub range: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsSettings {
    pub api_base: String,

    /// File holding an OAuth access token, used when WRSYNC_SHEETS_TOKEN is unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,

    pub ss: SheetSource,
    pub rta: SheetSource,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            api_base: "https://sheets.googleapis.com/v4".to_string(),
            token_file: None,
            ss: SheetSource {
                spreadsheet_id: "1_cOIEnuKIQ-3LA_U0ygpiL87PTSBPlHmKDId0vC7alo".to_string(),
                range: "Singlestar!B:E".to_string(),
            },
            rta: SheetSource {
                spreadsheet_id: "1J20aivGnvLlAuyRIMMclIFUmrkHXUzgcDmYa31gdtCI".to_string(),
                range: "Ultimate Star Spreadsheet v2!A:B".to_string(),
            },
        }
    }
}

impl SheetsSettings {
    pub fn source(&self, feed: Feed) -> &SheetSource {
        match feed {
            Feed::Ss => &self.ss,
            Feed::Rta => &self.rta,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub enabled: bool,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsSettings {
    pub ss: FeedSettings,
    pub rta: FeedSettings,
}

impl FeedsSettings {
    pub fn enabled(&self, feed: Feed) -> bool {
        match feed {
            Feed::Ss => self.ss.enabled,
            Feed::Rta => self.rta.enabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineBackend {
    /// One last_saved_<feed>.json per feed
    #[default]
    Json,
    /// baseline.db in the baseline directory
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub baseline_dir: PathBuf,
    pub baseline_backend: BaselineBackend,
    pub report_dir: PathBuf,

    /// Rule table; the built-in one when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<PathBuf>,
}

impl Default for PathSettings {
    fn default() -> Self {
        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wrsync");
        Self {
            baseline_dir: data.join("baseline"),
            baseline_backend: BaselineBackend::Json,
            report_dir: data.join("logs"),
            rules: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub wiki: WikiSettings,
    pub sheets: SheetsSettings,
    pub feeds: FeedsSettings,
    pub paths: PathSettings,

    /// Overrides the rule table's [reconcile] section
    #[serde(skip_serializing)]
    pub reconcile: Option<ReconcileConfig>,
}

impl Settings {
    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wrsync")
            .join("config.toml")
    }

    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load `path`, or the default location. A missing default file means defaults;
    /// a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::config_path(), false),
        };
        if !explicit && !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io { path: path.clone(), source })?;
        let settings = Self::from_toml(&contents)?;
        log::debug!("loaded config from {}", path.display());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_http_url(&self.wiki.api_url) {
            return Err(ConfigError::invalid("wiki.api_url", format!("not an http(s) URL: '{}'", self.wiki.api_url)));
        }
        if !is_http_url(&self.sheets.api_base) {
            return Err(ConfigError::invalid(
                "sheets.api_base",
                format!("not an http(s) URL: '{}'", self.sheets.api_base),
            ));
        }
        if self.wiki.request_delay_ms > 60_000 {
            return Err(ConfigError::invalid("wiki.request_delay_ms", "must be at most 60000"));
        }
        for feed in Feed::ALL {
            if self.feeds.enabled(feed) && self.sheets.source(feed).range.trim().is_empty() {
                return Err(ConfigError::invalid(range_field(feed), "empty range for an enabled feed"));
            }
        }
        Ok(())
    }

    /// Checks the fields only a live run needs.
    pub fn require_live(&self) -> Result<(), ConfigError> {
        if self.wiki.username.trim().is_empty() {
            return Err(ConfigError::Missing { field: "wiki.username" });
        }
        for feed in self.enabled_feeds() {
            if self.sheets.source(feed).spreadsheet_id.trim().is_empty() {
                return Err(ConfigError::Missing { field: spreadsheet_field(feed) });
            }
        }
        Ok(())
    }

    pub fn enabled_feeds(&self) -> Vec<Feed> {
        Feed::ALL.into_iter().filter(|f| self.feeds.enabled(*f)).collect()
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("https://") || s.starts_with("http://")
}

fn range_field(feed: Feed) -> &'static str {
    match feed {
        Feed::Ss => "sheets.ss.range",
        Feed::Rta => "sheets.rta.range",
    }
}

fn spreadsheet_field(feed: Feed) -> &'static str {
    match feed {
        Feed::Ss => "sheets.ss.spreadsheet_id",
        Feed::Rta => "sheets.rta.spreadsheet_id",
    }
}
