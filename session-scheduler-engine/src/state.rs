use serde::Serialize;
use tracing::warn;

use crate::error::ScheduleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    IdleClean,
    IdleStale,
    Running,
    RunningPendingChanges,
}

/// Tracks whether the committed schedule is out of date and whether a search is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleState {
    changes_since_last_schedule: bool,
    changes_since_scheduler_snapshot: bool,
    scheduler_running: bool,
}

impl ScheduleState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            changes_since_last_schedule: false,
            changes_since_scheduler_snapshot: false,
            scheduler_running: false,
        }
    }

    /// Called on every mutation of the live data.
    pub fn modify(&mut self) {
        self.changes_since_last_schedule = true;
        if self.scheduler_running {
            self.changes_since_scheduler_snapshot = true;
        }
    }

    pub fn start_search(&mut self) -> Result<(), ScheduleError> {
        if self.scheduler_running {
            return Err(ScheduleError::SearchInProgress);
        }
        self.scheduler_running = true;
        self.changes_since_scheduler_snapshot = false;
        Ok(())
    }

    pub fn search_succeeded(&mut self) {
        if !self.scheduler_running {
            warn!("search finished but none was running");
        }
        self.scheduler_running = false;
        if !self.changes_since_scheduler_snapshot {
            self.changes_since_last_schedule = false;
        }
    }

    pub fn search_failed(&mut self) {
        if !self.scheduler_running {
            warn!("search failed but none was running");
        }
        self.scheduler_running = false;
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.scheduler_running
    }

    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.changes_since_last_schedule
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        match (self.scheduler_running, self.changes_since_last_schedule) {
            (false, false) => Phase::IdleClean,
            (false, true) => Phase::IdleStale,
            (true, _) if self.changes_since_scheduler_snapshot => Phase::RunningPendingChanges,
            (true, _) => Phase::Running,
        }
    }
}
