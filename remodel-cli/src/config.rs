//! CLI configuration handling.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CliError, CliResult};

/// Default config file name (lives in project root)
pub const CONFIG_FILE_NAME: &str = "remodel.toml";

/// Default models directory (relative to project root)
pub const MODELS_DIR: &str = "models";

/// Default state directory for the plan and ledger (relative to project root)
pub const STATE_DIR: &str = "migrations";

/// Remodel CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Model descriptor configuration
    pub models: ModelsConfig,

    /// State file configuration
    pub state: StateConfig,

    /// Migration behavior configuration
    pub migration: MigrationSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            models: ModelsConfig::default(),
            state: StateConfig::default(),
            migration: MigrationSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a project root, with a hint when the
    /// project has not been initialized yet
    pub fn load_from_root(root: &Path) -> CliResult<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Err(CliError::Config(format!(
                "{} not found. Run 'remodel init' first.",
                CONFIG_FILE_NAME
            )));
        }
        Self::load(&path)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> CliResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Create a default config for a specific dialect
    pub fn default_for_dialect(dialect: &str) -> Self {
        let mut config = Self::default();
        config.database.dialect = dialect.to_string();
        config
    }

    /// Resolve the database URL from the config or the environment
    pub fn database_url(&self) -> CliResult<String> {
        // Try config first
        if let Some(ref url) = self.database.url {
            // Expand environment variables
            let expanded = expand_env_var(url);
            if !expanded.is_empty() && !expanded.contains("${") {
                return Ok(expanded);
            }
        }

        // Try environment variable
        std::env::var("DATABASE_URL").map_err(|_| {
            CliError::Config(
                "Database URL not found. Set DATABASE_URL environment variable or configure in remodel.toml"
                    .to_string(),
            )
        })
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database dialect (mysql, postgres)
    pub dialect: String,

    /// Database connection URL; supports ${VAR} expansion
    pub url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dialect: "mysql".to_string(),
            url: None,
        }
    }
}

/// Model descriptor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Directory scanned for model descriptor files
    pub dir: PathBuf,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(MODELS_DIR),
        }
    }
}

/// State file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Directory holding the plan and ledger files
    pub dir: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(STATE_DIR),
        }
    }
}

/// Migration behavior configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    /// Tables protected from dropping, on top of the built-in set
    pub protected_tables: Vec<String>,

    /// Tables hidden from introspection entirely
    pub exclude_tables: Vec<String>,

    /// Apply destructive operations without prompting
    pub allow_destructive: bool,
}

/// Expand environment variables in a string
fn expand_env_var(s: &str) -> String {
    let mut result = s.to_string();

    // Match ${VAR} pattern
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}").unwrap();
    for cap in re.captures_iter(s) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    // Also match $VAR pattern (no braces)
    let re2 = regex_lite::Regex::new(r"\$([A-Z_][A-Z0-9_]*)").unwrap();
    for cap in re2.captures_iter(&result.clone()) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}
