use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "OSS_ISSUES_LOG";

/// Installs the stderr subscriber. stdout is left to the report itself.
///
/// The filter comes from `OSS_ISSUES_LOG`, then `RUST_LOG`, then a default
/// that only shows warnings (`--verbose` adds this crate's debug events).
pub fn init(verbose: bool) {
    let fallback = if verbose { "warn,oss_issues=debug" } else { "warn" };
    let filter = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
