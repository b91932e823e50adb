use crate::config::LogLevel;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the JSON tracing subscriber. The hosting runtime calls this once,
/// before `Predictor::setup`.
pub fn init_telemetry(log_level: &LogLevel) {
    let filter = format!("{},ort=info", log_level.as_str());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(false)
                .with_level(true),
        )
        .init();
}
