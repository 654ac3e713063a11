mod sample;

use session_scheduler_backend::config::search_options;
use session_scheduler_backend::telemetry::setup_tracing;
use session_scheduler_backend::{AppError, Scheduler};
use session_scheduler_config::get_config;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    setup_tracing()?;
    let config = get_config()?;

    let scheduler = Scheduler::from_config(&config);
    sample::seed(&scheduler)?;

    let report = scheduler
        .make_schedule(search_options(&config.search))?
        .await??;
    info!(report = %serde_json::to_string(&report)?, "schedule committed");

    println!("{}", serde_json::to_string_pretty(&scheduler.timetable()?)?);
    Ok(())
}
