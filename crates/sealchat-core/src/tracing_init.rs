//! Logging setup shared by the relay and the chat client.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter from `RUST_LOG`, or `default_filter` when it is unset or invalid.
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the global subscriber, writing to stderr.
///
/// `log_json` switches from the human format to one JSON object per event.
/// Stdout is left alone because the client prints chat traffic there.
/// A second call is a no-op.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let registry = tracing_subscriber::registry().with(env_filter(default_filter));
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(!log_json);
    let installed = if log_json {
        registry.with(fmt.json()).try_init()
    } else {
        registry.with(fmt).try_init()
    };
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_used_without_env() {
        // RUST_LOG is not set by the test harness.
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(env_filter("sealchat_relay=info").to_string(), "sealchat_relay=info");
        }
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing("warn", false);
        init_tracing("warn", true);
    }
}
