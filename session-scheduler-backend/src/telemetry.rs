use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::AppError;

const DEFAULT_LOG_LEVEL: &str = "info,session_scheduler_engine=debug,session_scheduler_backend=debug";

/// Logs to stdout, filtered by `RUST_LOG`.
pub fn setup_tracing() -> Result<(), AppError> {
    let stdout_log = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(
            stdout_log.with_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into()),
            ),
        )
        .try_init()?;
    Ok(())
}
