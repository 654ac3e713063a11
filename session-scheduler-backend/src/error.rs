use session_scheduler_config::ConfigError;
use session_scheduler_engine::ScheduleError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    File(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("poison error: {0}")]
    Poison(#[from] std::sync::PoisonError<()>),
    #[error("no tokio runtime: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
    #[error("join error: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("tracing error: {0}")]
    Tracing(#[from] tracing_subscriber::util::TryInitError),
}
