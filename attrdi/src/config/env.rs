use std::path::Path;

/// Deployment environment, selected by `APP_ENV`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Local,
    Development,
    Staging,
    Production,
    Testing,
    Custom(String),
}

impl Environment {
    /// Detect environment from APP_ENV or default to Local
    pub fn detect() -> Self {
        Self::from_name(std::env::var("APP_ENV").ok().as_deref())
    }

    fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("production") => Self::Production,
            Some("staging") => Self::Staging,
            Some("development") => Self::Development,
            Some("testing") => Self::Testing,
            Some("local") | Some("") | None => Self::Local,
            Some(other) => Self::Custom(other.to_string()),
        }
    }

    /// Suffix used for environment-specific `.env` and settings files
    pub fn file_suffix(&self) -> &str {
        match self {
            Self::Local => "local",
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Custom(name) => name.as_str(),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_suffix())
    }
}

/// Load environment variables from .env files with proper precedence
///
/// Precedence (later overrides earlier):
/// 1. .env
/// 2. .env.local
/// 3. .env.{environment}
/// 4. .env.{environment}.local
/// 5. Actual process environment variables
pub fn load_dotenv(project_root: &Path) -> Environment {
    let env = Environment::detect();
    let suffix = env.file_suffix();

    // dotenvy never overwrites, so load the most specific file first
    let files = [
        format!(".env.{}.local", suffix),
        format!(".env.{}", suffix),
        ".env.local".to_string(),
        ".env".to_string(),
    ];
    for file in files {
        let path = project_root.join(&file);
        if dotenvy::from_path(&path).is_ok() {
            tracing::debug!(path = %path.display(), "Loaded environment file");
        }
    }

    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_names() {
        assert_eq!(Environment::from_name(None), Environment::Local);
        assert_eq!(Environment::from_name(Some("production")), Environment::Production);
        assert_eq!(
            Environment::from_name(Some("qa")),
            Environment::Custom("qa".to_string())
        );
        assert_eq!(Environment::Testing.to_string(), "testing");
    }
}
