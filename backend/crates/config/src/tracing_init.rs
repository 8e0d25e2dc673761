use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG`, then `LOG_LEVEL`, then `default_level`.
/// `LOG_FORMAT=json` switches to one JSON object per event, which is what the
/// log collector in front of the agent expects in production.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| EnvFilter::try_from_env("LOG_LEVEL"))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let result = if json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init()
    } else {
        fmt().with_env_filter(filter).with_target(true).try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
