//! # gridmodel
//!
//! Operator binary for the gridmodel network model store.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            apps/gridmodel (THE BINARY)       │
//! │                                              │
//! │   ┌──────────┐   ┌──────────┐   ┌─────────┐  │
//! │   │  CLI     │   │  Config  │   │ Logging │  │
//! │   │ (clap)   │   │  (toml)  │   │(tracing)│  │
//! │   └────┬─────┘   └────┬─────┘   └─────────┘  │
//! │        └──────┬───────┘                      │
//! │               ▼                              │
//! │       ┌────────────────┐                     │
//! │       │ gridmodel-core │                     │
//! │       │  (THE LOGIC)   │                     │
//! │       └────────────────┘                     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! gridmodel --log-path deltas.log status
//! gridmodel apply -f delta.json
//! gridmodel import -f records.json
//! gridmodel extent --kind Switch --attr IDOBJ_NAME
//! gridmodel related --gid 0x0000000100000001 --property BASEVOLTAGE_CONDEQ
//! ```

use clap::Parser;
use gridmodel::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // GRIDMODEL_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("GRIDMODEL_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gridmodel=info,gridmodel_core=info".into());

    // Logs go to stderr so command output on stdout stays parseable.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
