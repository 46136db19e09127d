//! # Remodel
//!
//! Declarative schema migrations for MySQL and PostgreSQL.
//!
//! Remodel reads model descriptors, introspects the live database through a
//! dialect driver, diffs the two into an ordered migration plan, and applies
//! the plan with a JSON ledger recording every executed operation.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use remodel::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Declare models (or load *.toml descriptors with `load_dir`)
//!     let mut registry = ModelRegistry::new();
//!     registry.register(
//!         ModelDescriptor::new("User")
//!             .field(FieldDescriptor::scalar("id", ScalarType::Uuid))
//!             .field(FieldDescriptor::scalar("email", ScalarType::String))
//!             .unique("email"),
//!     )?;
//!
//!     // Connect a dialect driver
//!     let mut drivers = DriverRegistry::new();
//!     remodel::mysql::register(&mut drivers);
//!     let driver = drivers.connect("mysql://app@localhost:3306/app").await?;
//!
//!     // Plan, persist, apply
//!     let engine = MigrationEngine::new(
//!         MigrationConfig::new().state_dir("./migrations"),
//!         driver,
//!     );
//!     let plan = engine.plan(&registry).await?;
//!     engine.persist(&plan).await?;
//!     let report = engine.apply(&plan, &ApplyOptions::new()).await?;
//!     println!("{}", report.summary());
//!
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Model descriptors, schema types, and desired-schema extraction.
pub mod schema {
    pub use remodel_schema::*;
}

/// The migration engine: introspection, diffing, plans, apply, and state.
pub mod migrate {
    pub use remodel_migrate::*;
}

/// MySQL dialect driver.
#[cfg(feature = "mysql")]
#[cfg_attr(docsrs, doc(cfg(feature = "mysql")))]
pub mod mysql {
    pub use remodel_mysql::*;
}

/// PostgreSQL dialect driver.
#[cfg(feature = "postgres")]
#[cfg_attr(docsrs, doc(cfg(feature = "postgres")))]
pub mod postgres {
    pub use remodel_postgres::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::migrate::{
        ApplyOptions, DriverRegistry, MigrationConfig, MigrationEngine, MigrationPlan,
    };
    pub use crate::schema::{FieldDescriptor, ModelDescriptor, ModelRegistry, ScalarType};
}

// Re-export key types at the crate root
pub use migrate::{MigrateResult, MigrationError};
pub use schema::{SchemaError, SchemaResult};
