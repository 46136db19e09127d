//! `remodel version` command - Display version information.

use crate::error::CliResult;
use crate::output::{self, kv};

/// Package version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
const NAME: &str = env!("CARGO_PKG_NAME");

/// Run the version command
pub async fn run() -> CliResult<()> {
    output::header("Remodel");

    kv("Version", VERSION);
    kv("Binary", NAME);

    #[cfg(debug_assertions)]
    let build_mode = "debug";
    #[cfg(not(debug_assertions))]
    let build_mode = "release";

    kv("Build", build_mode);

    // Dialects compiled into this binary
    let mut dialects = Vec::new();

    #[cfg(feature = "mysql")]
    dialects.push("mysql");

    #[cfg(feature = "postgres")]
    dialects.push("postgres");

    if dialects.is_empty() {
        dialects.push("none");
    }

    kv("Dialects", &dialects.join(", "));

    output::newline();

    output::section("Components");
    kv("remodel-schema", env!("CARGO_PKG_VERSION"));
    kv("remodel-migrate", env!("CARGO_PKG_VERSION"));

    Ok(())
}
