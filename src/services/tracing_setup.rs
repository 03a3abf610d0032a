//! Tracing subscriber setup
//!
//! Shared by the CLI and tests: file logging plus `RUST_LOG` filtering with a
//! DEBUG default.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Log file used when none is given: `{temp}/compiler-session-{PID}.log`
pub fn default_log_path() -> PathBuf {
    std::env::temp_dir().join(format!("compiler-session-{}.log", std::process::id()))
}

/// Install the global subscriber writing to `log_file_path`.
///
/// Returns false if the file can't be created or a subscriber is already set.
pub fn init_global(log_file_path: &Path) -> bool {
    let Ok(log_file) = File::create(log_file_path) else {
        return false;
    };
    build_subscriber(log_file).try_init().is_ok()
}

/// Build the subscriber writing to `log_file`
pub fn build_subscriber(log_file: File) -> impl tracing::Subscriber + Send + Sync {
    let mut env_filter =
        EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into());
    // HTTP client internals are noisy at debug
    for directive in ["ureq=info", "rustls=info"] {
        if let Ok(directive) = directive.parse() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}
