//! CLI command implementations.

pub mod apply;
pub mod generate;
pub mod init;
pub mod status;
pub mod version;

use std::path::{Path, PathBuf};

use remodel_migrate::{DriverRegistry, MigrationConfig, MigrationEngine};

use crate::config::Config;
use crate::error::CliResult;

/// Build the registry of dialects compiled into this binary.
pub fn driver_registry() -> DriverRegistry {
    #[cfg_attr(
        not(any(feature = "mysql", feature = "postgres")),
        allow(unused_mut)
    )]
    let mut registry = DriverRegistry::new();

    #[cfg(feature = "mysql")]
    remodel_mysql::register(&mut registry);

    #[cfg(feature = "postgres")]
    remodel_postgres::register(&mut registry);

    registry
}

/// Load the config from an explicit path or the current directory.
pub(crate) fn load_config(explicit: Option<&PathBuf>) -> CliResult<Config> {
    match explicit {
        Some(path) => Config::load(path),
        None => Config::load_from_root(Path::new(".")),
    }
}

/// Connect a migration engine for the configured database.
pub(crate) async fn connect_engine(config: &Config) -> CliResult<MigrationEngine> {
    let url = config.database_url()?;
    let registry = driver_registry();
    let driver = registry
        .connect_with(&config.database.dialect, &url)
        .await?;

    let mut migration = MigrationConfig::new().state_dir(config.state.dir.clone());
    for table in &config.migration.protected_tables {
        migration = migration.protect(table.clone());
    }
    for table in &config.migration.exclude_tables {
        migration = migration.exclude(table.clone());
    }

    Ok(MigrationEngine::new(migration, driver))
}
