use tracing_subscriber::EnvFilter;

/// Workspace crate targets that receive log output
const CRATE_TARGETS: &[&str] = &["oceansync", "oceansync_core", "oceansync_player"];

/// Initialize tracing from the `-v` count.
///
/// 0 maps to warn, 1 to info, 2 to debug and 3 or more to trace.
/// `RUST_LOG` takes precedence when set.
pub fn init(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let default_filter = CRATE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
