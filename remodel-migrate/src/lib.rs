//! # remodel-migrate
//!
//! Migration engine for Remodel.
//!
//! This crate provides functionality for:
//! - Live-schema introspection through pluggable dialect drivers
//! - Schema diffing between registered models and database state
//! - Deterministic, dependency-ordered migration plans with destructive
//!   operations flagged
//! - SQL rendering through the driver's dialect
//! - A JSON plan file and execution ledger for resumable, idempotent applies
//!
//! ## Architecture
//!
//! The engine extracts the desired schema from model descriptors, snapshots
//! the live database through a driver, and diffs the two into an ordered
//! plan. Applying renders each operation to SQL, executes it, and records
//! its identifier in the ledger before moving on, so an interrupted run
//! resumes where it stopped.
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌─────────────┐
//! │ Model Extract│────▶│ Schema Differ  │────▶│ Plan (JSON) │
//! └──────────────┘     └────────────────┘     └─────────────┘
//!        ▲                     ▲                     │
//!        │                     │                     ▼
//! ┌──────────────┐     ┌────────────────┐     ┌─────────────┐
//! │ Driver       │────▶│ Introspector   │     │ Apply SQL   │
//! └──────────────┘     └────────────────┘     └─────────────┘
//!                                                    │
//!                                                    ▼
//!                                            ┌─────────────┐
//!                                            │ Ledger      │
//!                                            └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use remodel_migrate::{ApplyOptions, MigrationConfig, MigrationEngine};
//! use remodel_schema::ModelRegistry;
//!
//! async fn run_migrations() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load model descriptors
//!     let registry = ModelRegistry::load_dir("./models")?;
//!
//!     // Connect a dialect driver
//!     let driver = /* e.g. remodel_mysql::MySqlDriver::connect(url).await? */;
//!
//!     // Configure and build the engine
//!     let config = MigrationConfig::new().state_dir("./migrations");
//!     let engine = MigrationEngine::new(config, Box::new(driver));
//!
//!     // Plan and persist
//!     let plan = engine.plan(&registry).await?;
//!     println!("Plan: {}", plan.summary());
//!     engine.persist(&plan).await?;
//!
//!     // Apply
//!     let report = engine.apply(&plan, &ApplyOptions::new()).await?;
//!     println!("{}", report.summary());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## State Files
//!
//! The state directory holds two JSON files:
//!
//! ```text
//! migrations/
//! ├── plan.json       # Ordered operations, warnings, timestamps
//! └── ledger.json     # Executed operation identifiers
//! ```
//!
//! Both are read leniently: a missing or damaged file behaves as empty
//! state, and the `verify` option on apply reconciles a lost ledger
//! against what the live schema already satisfies.

pub mod compat;
pub mod diff;
pub mod driver;
pub mod engine;
pub mod error;
pub mod introspect;
pub mod op;
pub mod sql;
pub mod state;

#[cfg(test)]
mod testing;

// Re-exports
pub use compat::{classify, is_narrowing, parse_sql_type, ParsedType, TypeChange};
pub use diff::{SchemaDiffer, DEFAULT_PROTECTED_TABLES};
pub use driver::{Connector, Driver, DriverFuture, DriverRegistry, SqlDialect};
pub use engine::{
    ApplyOptions, ApplyReport, MigrationConfig, MigrationEngine, MigrationStatus, VerifyReport,
};
pub use error::{MigrateResult, MigrationError};
pub use introspect::{assemble_table, IntrospectOptions, Introspector};
pub use op::{MigrationOp, MigrationPlan, OpKind};
pub use sql::SqlGenerator;
pub use state::{Ledger, StateStore, LEDGER_FILE, PLAN_FILE};
