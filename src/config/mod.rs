use crate::classifier::{Destination, MatchMode};
use crate::error::ConfigError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "drivesort.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub folders: FolderConfig,
    pub search: SearchConfig,
    pub classifier: ClassifierConfig,
    pub credentials: CredentialsConfig,
    pub drive: DriveConfig,
    pub logging: LoggingConfig,
}

/// Folder ids for the source folder and the four destinations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderConfig {
    pub source: String,
    pub dragon: String,
    pub no_instructions: String,
    pub customer: String,
    pub catchall: String,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            source: "1vDeoPMKl9ca7HCudyFMKP89GK8V4RqWP".to_string(),
            dragon: "1FsPM-xB7EH6Fc2CCu67EHDhYMotx0EYc".to_string(),
            no_instructions: "1EiScFFGiE6hdKBOZeSicnO_lxv2U3mcB".to_string(),
            customer: "108_9MeB539PK6NVEjgARZuQKfms_PPt0".to_string(),
            catchall: "1FD_UfXJ1gjOmFrjudnuMfrQ15On2JsMS".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// A file is selected when its name contains any of these
    pub terms: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            terms: vec!["Transcript".to_string(), "Recording".to_string()],
        }
    }
}

/// Prefix matching only; the Drive-side `contains` search is not affected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub match_mode: MatchMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub service_account_path: Option<PathBuf>,
    /// Name of the environment variable holding a ready-made access token
    pub access_token_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            service_account_path: None,
            access_token_env: "DRIVESORT_ACCESS_TOKEN".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub api_base: String,
    pub page_size: u32,
    pub timeout_secs: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/drive/v3".to_string(),
            page_size: 100,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for `drivesort.log` and `drivesort_err.log`; stderr only when unset
    pub log_dir: Option<PathBuf>,
    pub max_file_size: u64,
    pub backups: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            max_file_size: 1024 * 1024,
            backups: 5,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to the built-in folder ids.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            info!("No config file at {}, using built-in defaults", path.display());
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let folders = [
            ("source", &self.folders.source),
            ("dragon", &self.folders.dragon),
            ("no_instructions", &self.folders.no_instructions),
            ("customer", &self.folders.customer),
            ("catchall", &self.folders.catchall),
        ];

        for (name, id) in &folders {
            if id.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("folders.{} must not be empty", name)));
            }
        }

        for destination in Destination::ALL {
            if self.folder_for(destination) == self.folders.source {
                return Err(ConfigError::Invalid(format!(
                    "{} folder is the same as the source folder",
                    destination
                )));
            }
        }

        if self.search.terms.is_empty() || self.search.terms.iter().any(|t| t.is_empty()) {
            return Err(ConfigError::Invalid("search.terms needs at least one non-empty term".to_string()));
        }

        if !(1..=1000).contains(&self.drive.page_size) {
            return Err(ConfigError::Invalid(format!(
                "drive.page_size must be between 1 and 1000, got {}",
                self.drive.page_size
            )));
        }

        if self.logging.max_file_size == 0 {
            return Err(ConfigError::Invalid("logging.max_file_size must be greater than 0".to_string()));
        }

        Ok(())
    }

    pub fn folder_for(&self, destination: Destination) -> &str {
        match destination {
            Destination::Dragon => &self.folders.dragon,
            Destination::NoInstructions => &self.folders.no_instructions,
            Destination::Customer => &self.folders.customer,
            Destination::Catchall => &self.folders.catchall,
        }
    }

    /// Drive query selecting candidate files in the source folder.
    pub fn search_query(&self) -> String {
        let terms = self
            .search
            .terms
            .iter()
            .map(|term| format!("name contains '{}'", escape_query_value(term)))
            .collect::<Vec<_>>()
            .join(" or ");

        format!(
            "'{}' in parents and ({}) and trashed = false",
            escape_query_value(&self.folders.source),
            terms
        )
    }
}

pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query() {
        let config = Config::default();
        assert_eq!(
            config.search_query(),
            "'1vDeoPMKl9ca7HCudyFMKP89GK8V4RqWP' in parents and \
             (name contains 'Transcript' or name contains 'Recording') and trashed = false"
        );
    }

    #[test]
    fn test_query_escaping() {
        assert_eq!(escape_query_value("Matt's"), "Matt\\'s");
        assert_eq!(escape_query_value(r"a\b"), r"a\\b");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [folders]
            source = "src-folder"

            [drive]
            page_size = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.folders.source, "src-folder");
        assert_eq!(config.folders.dragon, FolderConfig::default().dragon);
        assert_eq!(config.drive.page_size, 10);
        assert_eq!(config.search.terms, vec!["Transcript", "Recording"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_match_mode_from_toml() {
        let config: Config = toml::from_str(
            r#"
            [classifier]
            match_mode = "case-insensitive"
            "#,
        )
        .unwrap();
        assert_eq!(config.classifier.match_mode, MatchMode::CaseInsensitive);
        assert_eq!(config.search, SearchConfig::default());
    }

    #[test]
    fn test_match_mode_leaves_query_alone() {
        let mut config = Config::default();
        let query = config.search_query();

        config.classifier.match_mode = MatchMode::CaseInsensitive;
        assert_eq!(config.search_query(), query);
    }

    #[test]
    fn test_match_mode_under_search_rejected() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            [search]
            match_mode = "case-insensitive"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_logging_section() {
        let config: Config = toml::from_str(
            r#"
            [logging]
            log_dir = "logs"
            backups = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.log_dir, Some(PathBuf::from("logs")));
        assert_eq!(config.logging.max_file_size, 1024 * 1024);
        assert_eq!(config.logging.backups, 2);
        assert!(config.validate().is_ok());
        assert_eq!(Config::default().logging.log_dir, None);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();
        config.folders.customer = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.folders.catchall = config.folders.source.clone();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.search.terms.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.drive.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.max_file_size = 0;
        assert!(config.validate().is_err());
    }
}
