// Run settings
// Loaded from ~/.config/shiptrack/config.toml, then environment overrides

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder substituted with the tracking number in `tracking_url`.
pub const TRACKING_PLACEHOLDER: &str = "{tracking_number}";

/// Status groups that accept extra keywords.
pub const KEYWORD_GROUPS: [&str; 5] = ["delivered", "in_transit", "pending", "returned", "at_agency"];

pub const REPORT_FORMATS: [&str; 2] = ["csv", "xlsx"];

pub const ENV_SOURCE_DIR: &str = "SHIPTRACK_SOURCE_DIR";
pub const ENV_STORE_DIR: &str = "SHIPTRACK_STORE_DIR";
pub const ENV_TRACKING_URL: &str = "SHIPTRACK_TRACKING_URL";
pub const ENV_PACE_SECS: &str = "SHIPTRACK_PACE_SECS";

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
    /// A value (from any layer) is out of range.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => write!(f, "cannot read {}: {}", path.display(), message),
            Self::Parse { path, message } => write!(f, "invalid TOML in {}: {}", path.display(), message),
            Self::Invalid(msg) => write!(f, "invalid setting: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Folder scanned for the newest import batch
    pub source_dir: PathBuf,

    /// Folder holding tracking.csv and the differences reports
    pub store_dir: PathBuf,

    /// Carrier lookup URL, must contain `{tracking_number}`
    pub tracking_url: String,

    pub pace_secs: u64,
    pub timeout_secs: u64,

    /// "csv" or "xlsx"
    pub report_format: String,

    /// Check at most this many records per run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    pub user_agent: String,

    /// Extra keywords per status group, e.g. `delivered = ["recibido por"]`
    pub extra_keywords: BTreeMap<String, Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        let base = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shiptrack");
        Self {
            source_dir: base.join("inbox"),
            store_dir: base.join("store"),
            tracking_url: "https://interrapidisimo.com/sigue-tu-envio/?guia={tracking_number}".into(),
            pace_secs: 2,
            timeout_secs: 15,
            report_format: "csv".into(),
            limit: None,
            user_agent: concat!("shiptrack/", env!("CARGO_PKG_VERSION")).into(),
            extra_keywords: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shiptrack")
            .join("config.toml")
    }

    /// Load from `path` (or the default location), then apply environment
    /// overrides. An explicit path must exist; a missing default file means
    /// defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let p = Self::config_path();
                if p.exists() {
                    Self::from_file(&p)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&contents).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }

    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| e.to_string())
    }

    /// Apply `SHIPTRACK_*` overrides. `lookup` is `std::env::var` outside tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_SOURCE_DIR) {
            self.source_dir = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_STORE_DIR) {
            self.store_dir = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_TRACKING_URL) {
            self.tracking_url = v;
        }
        if let Some(v) = get(ENV_PACE_SECS) {
            self.pace_secs = v.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{ENV_PACE_SECS}={v} is not a whole number of seconds"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tracking_url.contains(TRACKING_PLACEHOLDER) {
            return Err(ConfigError::Invalid(format!(
                "tracking_url must contain {TRACKING_PLACEHOLDER}"
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be greater than 0".into()));
        }
        if !REPORT_FORMATS.contains(&self.report_format.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "report_format '{}' (expected csv or xlsx)",
                self.report_format
            )));
        }
        if self.limit == Some(0) {
            return Err(ConfigError::Invalid("limit must be greater than 0".into()));
        }
        if let Some(group) = self.extra_keywords.keys().find(|k| !KEYWORD_GROUPS.contains(&k.as_str())) {
            return Err(ConfigError::Invalid(format!(
                "extra_keywords.{group} is not a status group (expected one of: {})",
                KEYWORD_GROUPS.join(", ")
            )));
        }
        Ok(())
    }

    /// Lookup URL for one tracking number
    pub fn url_for(&self, tracking_number: &str) -> String {
        expand_tracking_url(&self.tracking_url, tracking_number)
    }
}

/// Substitute the form-encoded tracking number into a URL template.
pub fn expand_tracking_url(template: &str, tracking_number: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(tracking_number.as_bytes()).collect();
    template.replace(TRACKING_PLACEHOLDER, &encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let s = Settings::default();
        s.validate().unwrap();
        assert_eq!(s.pace_secs, 2);
        assert_eq!(s.timeout_secs, 15);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let s = Settings::from_toml(
            r#"
            store_dir = "/srv/shiptrack"
            report_format = "xlsx"

            [extra_keywords]
            delivered = ["recibido por"]
            "#,
        )
        .unwrap();
        assert_eq!(s.store_dir, PathBuf::from("/srv/shiptrack"));
        assert_eq!(s.report_format, "xlsx");
        assert_eq!(s.extra_keywords["delivered"], vec!["recibido por".to_string()]);
        assert_eq!(s.timeout_secs, 15);
        s.validate().unwrap();
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(Settings::from_toml("pace_secs = \"fast\"").is_err());
    }

    #[test]
    fn env_overrides_file() {
        let env: HashMap<&str, &str> = [
            (ENV_STORE_DIR, "/tmp/store"),
            (ENV_PACE_SECS, "0"),
            (ENV_SOURCE_DIR, "  "),
        ]
        .into_iter()
        .collect();

        let mut s = Settings::from_toml("source_dir = \"/in\"\npace_secs = 5").unwrap();
        s.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(s.store_dir, PathBuf::from("/tmp/store"));
        assert_eq!(s.pace_secs, 0);
        // blank values don't override
        assert_eq!(s.source_dir, PathBuf::from("/in"));
    }

    #[test]
    fn env_pace_must_be_numeric() {
        let mut s = Settings::default();
        let err = s
            .apply_env(|k| (k == ENV_PACE_SECS).then(|| "two".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn validation_rules() {
        let mut s = Settings::default();
        s.tracking_url = "https://carrier.example/track".into();
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.timeout_secs = 0;
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.report_format = "pdf".into();
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.extra_keywords.insert("lost".into(), vec!["extraviado".into()]);
        assert!(s.validate().is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn url_substitution_and_toml_round_trip() {
        let s = Settings::default();
        assert!(s.url_for("240012345").ends_with("guia=240012345"));
        let text = s.to_toml().unwrap();
        assert_eq!(Settings::from_toml(&text).unwrap(), s);
    }

    #[test]
    fn url_encodes_tracking_number() {
        let s = Settings {
            tracking_url: "https://carrier.example/track?guia={tracking_number}&lang=es".into(),
            ..Settings::default()
        };
        assert_eq!(
            s.url_for("A&B#1 2"),
            "https://carrier.example/track?guia=A%26B%231+2&lang=es"
        );
        assert_eq!(s.url_for("240-01"), "https://carrier.example/track?guia=240-01&lang=es");
    }
}
