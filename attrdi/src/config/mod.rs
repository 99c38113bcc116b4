//! Configuration access
//!
//! [`Configuration`] wraps a layered `config::Config` and exposes typed
//! section lookups. Paths may use `:` or `.` as separator, so
//! `"AppSettings:Mailer"` and `"AppSettings.Mailer"` are the same section.
//!
//! # Example
//!
//! ```rust,no_run
//! use attrdi::config::Configuration;
//!
//! let (configuration, env) = Configuration::load(std::path::Path::new(".")).unwrap();
//! println!("Running in {} environment", env);
//! let flags: Option<Vec<String>> = configuration.get("DIFeatureFlags:Features").unwrap();
//! ```

pub mod env;

pub use env::{load_dotenv, Environment};

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Prefix for environment variable overrides (`APP_SECTION__KEY=value`)
pub const ENV_PREFIX: &str = "APP";

/// Read-only view over layered configuration sources
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    inner: config::Config,
}

impl Configuration {
    /// Configuration with no values; every lookup misses
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_config(inner: config::Config) -> Self {
        Self { inner }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_str_with(json, config::FileFormat::Json)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::from_str_with(toml, config::FileFormat::Toml)
    }

    fn from_str_with(text: &str, format: config::FileFormat) -> Result<Self> {
        let inner = config::Config::builder()
            .add_source(config::File::from_str(text, format))
            .build()?;
        Ok(Self { inner })
    }

    /// Load settings for a project root
    ///
    /// Sources, later overriding earlier:
    /// 1. `.env` files (see [`load_dotenv`]) exported into the process
    /// 2. `appsettings.toml` / `appsettings.json`
    /// 3. `appsettings.{environment}.toml` / `.json`
    /// 4. `APP_`-prefixed environment variables, `__` separating levels
    pub fn load(project_root: &Path) -> Result<(Self, Environment)> {
        let environment = load_dotenv(project_root);

        let mut builder = config::Config::builder();
        for stem in ["appsettings".to_string(), format!("appsettings.{}", environment)] {
            for extension in ["toml", "json"] {
                let path = project_root.join(format!("{}.{}", stem, extension));
                builder = builder.add_source(config::File::from(path).required(false));
            }
        }
        let inner = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        tracing::debug!(root = %project_root.display(), %environment, "Configuration loaded");
        Ok((Self { inner }, environment))
    }

    /// Deserialize the value at `path`; a missing path yields `None`
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let normalized = normalize_path(path);
        let lookup = match self.inner.get::<T>(&normalized) {
            // some sources store keys lowercased
            Err(config::ConfigError::NotFound(_)) if normalized.chars().any(char::is_uppercase) => {
                self.inner.get::<T>(&normalized.to_lowercase())
            }
            other => other,
        };
        match lookup {
            Ok(value) => Ok(Some(value)),
            Err(config::ConfigError::NotFound(_)) => Ok(None),
            Err(source) => Err(Error::Options {
                path: path.to_string(),
                source,
            }),
        }
    }

    /// Deserialize the section at `path`, or `T::default()` when it is missing
    pub fn section<T: DeserializeOwned + Default>(&self, path: &str) -> Result<T> {
        Ok(self.get::<T>(path)?.unwrap_or_default())
    }

    pub fn contains(&self, path: &str) -> bool {
        matches!(self.get::<config::Value>(path), Ok(Some(_)))
    }

    pub fn inner(&self) -> &config::Config {
        &self.inner
    }
}

fn normalize_path(path: &str) -> String {
    path.trim_matches(':').replace(':', ".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Mailer {
        sender: String,
        retries: u32,
    }

    const SETTINGS: &str = r#"{
        "appsettings": { "mailer": { "sender": "noreply@example.com", "retries": 3 } },
        "flags": { "Features": ["A", "B"] }
    }"#;

    #[test]
    fn colon_and_dot_paths_are_equivalent() {
        let configuration = Configuration::from_json_str(SETTINGS).unwrap();
        let expected = Mailer {
            sender: "noreply@example.com".to_string(),
            retries: 3,
        };

        assert_eq!(configuration.get::<Mailer>("appsettings:mailer").unwrap(), Some(expected));
        assert!(configuration.contains("appsettings.mailer"));
    }

    #[test]
    fn missing_sections_are_none() {
        let configuration = Configuration::from_json_str(SETTINGS).unwrap();
        assert_eq!(configuration.get::<Mailer>("appsettings:absent").unwrap(), None);
        assert_eq!(Configuration::empty().get::<Mailer>("appsettings:mailer").unwrap(), None);
        assert!(Configuration::empty().section::<Vec<String>>("flags").unwrap().is_empty());
    }

    #[test]
    fn malformed_sections_are_errors() {
        let configuration = Configuration::from_json_str(SETTINGS).unwrap();
        let error = configuration.get::<u32>("appsettings:mailer").unwrap_err();
        assert!(matches!(error, Error::Options { ref path, .. } if path == "appsettings:mailer"));
    }

    #[test]
    fn sections_deserialize_to_maps() {
        let configuration = Configuration::from_json_str(SETTINGS).unwrap();
        let flags: HashMap<String, Vec<String>> = configuration.get("flags").unwrap().unwrap();
        let names = flags.values().next().unwrap();
        assert_eq!(names, &vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn loads_settings_files_from_root() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(
            root.path().join("appsettings.toml"),
            "[mailer]\nsender = \"ops@example.com\"\nretries = 5\n",
        )
        .unwrap();

        let (configuration, _) = Configuration::load(root.path()).unwrap();
        let mailer: Mailer = configuration.get("mailer").unwrap().unwrap();
        assert_eq!(mailer.retries, 5);
    }
}
