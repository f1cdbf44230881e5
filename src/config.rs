use crate::constants::{
    DEFAULT_LOG_DIR, DEFAULT_ORDERS_FILE, DEFAULT_OUTPUT_FILE, DEFAULT_RESTAURANTS_FILE,
    DEFAULT_USERS_FILE, ENV_BASE_DIR, ENV_OUTPUT_FILE,
};
use crate::error::{MergeError, Result};
use crate::ingestion::ExtractionMode;
use crate::join::DuplicateKeyPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the pipeline reads and writes, and how it treats its inputs.
///
/// File names are resolved against `base_dir`; an absolute file name is used
/// as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub base_dir: PathBuf,
    pub orders_file: String,
    pub users_file: String,
    pub restaurants_file: String,
    pub output_file: String,
    pub delimiter: char,
    pub extraction: ExtractionMode,
    pub duplicate_keys: DuplicateKeyPolicy,
    pub log_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            orders_file: DEFAULT_ORDERS_FILE.to_string(),
            users_file: DEFAULT_USERS_FILE.to_string(),
            restaurants_file: DEFAULT_RESTAURANTS_FILE.to_string(),
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            delimiter: ',',
            extraction: ExtractionMode::default(),
            duplicate_keys: DuplicateKeyPolicy::default(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

impl PipelineConfig {
    /// Reads a TOML config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MergeError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `DELIVERY_MERGE_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(ENV_BASE_DIR).filter(|v| !v.trim().is_empty()) {
            self.base_dir = PathBuf::from(dir);
        }
        if let Some(output) = lookup(ENV_OUTPUT_FILE).filter(|v| !v.trim().is_empty()) {
            self.output_file = output;
        }
    }

    /// Applies command-line values, which take precedence over everything else.
    pub fn apply_overrides(
        &mut self,
        base_dir: Option<PathBuf>,
        output: Option<String>,
        extraction: Option<ExtractionMode>,
        duplicate_keys: Option<DuplicateKeyPolicy>,
    ) {
        if let Some(dir) = base_dir {
            self.base_dir = dir;
        }
        if let Some(name) = output {
            self.output_file = name;
        }
        if let Some(mode) = extraction {
            self.extraction = mode;
        }
        if let Some(policy) = duplicate_keys {
            self.duplicate_keys = policy;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;
        for (key, name) in [
            ("orders_file", &self.orders_file),
            ("users_file", &self.users_file),
            ("restaurants_file", &self.restaurants_file),
            ("output_file", &self.output_file),
        ] {
            if name.trim().is_empty() {
                return Err(MergeError::Config(format!("'{}' must not be empty", key)));
            }
        }
        Ok(())
    }

    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() && self.delimiter != '"' && self.delimiter != '\n' {
            Ok(self.delimiter as u8)
        } else {
            Err(MergeError::Config(format!(
                "delimiter {:?} must be a single ASCII character other than a quote or newline",
                self.delimiter
            )))
        }
    }

    pub fn orders_path(&self) -> PathBuf {
        self.base_dir.join(&self.orders_file)
    }

    pub fn users_path(&self) -> PathBuf {
        self.base_dir.join(&self.users_file)
    }

    pub fn restaurants_path(&self) -> PathBuf {
        self.base_dir.join(&self.restaurants_file)
    }

    pub fn output_path(&self) -> PathBuf {
        self.base_dir.join(&self.output_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_resolve_against_base_dir() {
        let config = PipelineConfig {
            base_dir: PathBuf::from("/data/delivery"),
            ..PipelineConfig::default()
        };
        assert_eq!(config.orders_path(), PathBuf::from("/data/delivery/orders.csv"));
        assert_eq!(config.users_path(), PathBuf::from("/data/delivery/users.json"));
        assert_eq!(
            config.restaurants_path(),
            PathBuf::from("/data/delivery/restaurants.sql")
        );
        assert_eq!(
            config.output_path(),
            PathBuf::from("/data/delivery/final_food_delivery_dataset.csv")
        );
    }

    #[test]
    fn test_toml_overrides_selected_keys() {
        let config = PipelineConfig::from_toml_str(
            r#"
            base_dir = "/srv/input"
            output_file = "merged.csv"
            extraction = "grammar"
            duplicate_keys = "first_match"
            delimiter = ";"
            "#,
        )
        .unwrap();

        assert_eq!(config.base_dir, PathBuf::from("/srv/input"));
        assert_eq!(config.output_file, "merged.csv");
        assert_eq!(config.orders_file, DEFAULT_ORDERS_FILE);
        assert_eq!(config.extraction, ExtractionMode::Grammar);
        assert_eq!(config.duplicate_keys, DuplicateKeyPolicy::FirstMatch);
        assert_eq!(config.delimiter_byte().unwrap(), b';');
    }

    #[test]
    fn test_unknown_keys_and_bad_delimiters_rejected() {
        assert!(matches!(
            PipelineConfig::from_toml_str("base_directory = \"/x\""),
            Err(MergeError::Toml(_))
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("delimiter = \"é\""),
            Err(MergeError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let env: HashMap<&str, &str> = [(ENV_BASE_DIR, "/from/env"), (ENV_OUTPUT_FILE, "")]
            .into_iter()
            .collect();
        let mut config = PipelineConfig::from_toml_str("base_dir = \"/from/file\"").unwrap();
        config.apply_env_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.base_dir, PathBuf::from("/from/env"));
        assert_eq!(config.output_file, DEFAULT_OUTPUT_FILE);
    }

    #[test]
    fn test_cli_overrides_env_overrides_file() {
        let env: HashMap<&str, &str> = [(ENV_BASE_DIR, "/from/env"), (ENV_OUTPUT_FILE, "env.csv")]
            .into_iter()
            .collect();
        let mut config = PipelineConfig::from_toml_str(
            r#"
            base_dir = "/from/file"
            output_file = "file.csv"
            extraction = "grammar"
            "#,
        )
        .unwrap();
        config.apply_env_from(|key| env.get(key).map(|v| v.to_string()));
        config.apply_overrides(
            Some(PathBuf::from("/from/cli")),
            None,
            None,
            Some(DuplicateKeyPolicy::FirstMatch),
        );

        assert_eq!(config.base_dir, PathBuf::from("/from/cli"));
        assert_eq!(config.output_file, "env.csv");
        assert_eq!(config.extraction, ExtractionMode::Grammar);
        assert_eq!(config.duplicate_keys, DuplicateKeyPolicy::FirstMatch);
        assert_eq!(config.delimiter, ',');
    }

    #[test]
    fn test_missing_config_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::load(&dir.path().join("merge.toml")).unwrap_err();
        assert!(matches!(err, MergeError::Config(_)));
    }
}
