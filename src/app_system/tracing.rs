use tracing_subscriber::EnvFilter;

use super::AppConfig;

/// Installs the global subscriber: `RUST_LOG` filtering (falling back to the
/// configured level), uptime timestamps and the compact formatter.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn setup_tracing(config: &AppConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .compact()
        .try_init();
}
