use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter, e.g. `TORPEDO_LOG=torpedo=debug`.
pub const LOG_ENV: &str = "TORPEDO_LOG";

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable. Defaults to `info`.
pub fn init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var(LOG_ENV)
                .from_env_lossy(),
        )
        .init();
}
