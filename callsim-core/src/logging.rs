//! Structured logging for simulation runs
//!
//! All crates in the workspace log through `tracing`. Nothing is printed until a
//! subscriber is installed, which is left to the binary or test embedding the
//! engine.
//!
//! # Controlling output
//!
//! ```rust
//! use callsim_core::init_simulation_logging_with_level;
//! init_simulation_logging_with_level("debug");
//! ```
//!
//! `RUST_LOG` takes precedence over the level passed in code:
//!
//! ```bash
//! RUST_LOG=callsim_components=trace cargo test
//! ```
//!
//! # Level guidelines
//! - **TRACE**: every scheduled, cancelled and dispatched event, customer transitions
//! - **DEBUG**: per-run and per-candidate summaries
//! - **INFO**: optimizer decisions and run completion
//! - **WARN**: degraded behaviour such as distribution fallbacks

use tracing::{info, Span};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging at `info` level.
pub fn init_simulation_logging() -> bool {
    init_simulation_logging_with_level("info")
}

/// Initialize logging with a specific level
///
/// Returns `false` when a global subscriber was already installed, which makes
/// the call safe to repeat from several tests in one process.
///
/// # Arguments
/// * `level` - Log level: "trace", "debug", "info", "warn", or "error"
pub fn init_simulation_logging_with_level(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "{level},callsim_core::scheduler=info,callsim_components={level},callsim_staffing={level}"
        )
        .into()
    });

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        info!("Simulation logging initialized at level: {}", level);
    }
    installed
}

/// Create a span for tracking one simulation run
pub fn simulation_span(name: &str, servers: usize, seed: Option<u64>) -> Span {
    tracing::debug_span!("simulation", name = name, servers = servers, seed = ?seed)
}

/// Create a span for one replication of an optimizer candidate
pub fn replication_span(agents: usize, replication: usize) -> Span {
    tracing::debug_span!("replication", agents = agents, replication = replication)
}
