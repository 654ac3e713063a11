use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use session_scheduler_config::Config;
use session_scheduler_engine::search::{run, SearchOutcome};
use session_scheduler_engine::{
    DiscussionId, ScheduleError, ScheduleState, SearchOptions, SearchStore, SlotMask, SlotScore,
    Store, Strategy, Timetable, UserId, Validation,
};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::timetable_from_config;
use crate::error::AppError;
use crate::persist::{JsonFilePersist, NoPersist, Persist};

/// Summary of a committed search run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub strategy: Strategy,
    pub heuristic_score: Option<u32>,
    pub random_score: Option<u32>,
    pub candidates: usize,
    pub score: SlotScore,
    /// The live data changed while the search ran.
    pub stale: bool,
    pub persist_error: Option<String>,
}

fn lock(store: &Mutex<Store>) -> Result<MutexGuard<'_, Store>, AppError> {
    store.lock().map_err(|_| PoisonError::new(()).into())
}

/// Owns the live data. All access goes through a single lock which is never held while a
/// search is computing.
#[derive(Clone)]
pub struct Scheduler {
    store: Arc<Mutex<Store>>,
    persist: Arc<dyn Persist>,
}

impl Scheduler {
    #[must_use]
    pub fn new(timetable: Timetable, persist: Arc<dyn Persist>) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store::new(timetable))),
            persist,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let persist: Arc<dyn Persist> = match &config.persist_path {
            Some(path) => Arc::new(JsonFilePersist::new(path)),
            None => Arc::new(NoPersist),
        };
        Self::new(timetable_from_config(config), persist)
    }

    pub fn add_user(&self, name: impl Into<String>) -> Result<UserId, AppError> {
        Ok(lock(&self.store)?.add_user(name))
    }

    pub fn add_discussion(
        &self,
        owner: UserId,
        title: impl Into<String>,
        is_public: bool,
    ) -> Result<DiscussionId, AppError> {
        Ok(lock(&self.store)?.add_discussion(owner, title, is_public)?)
    }

    pub fn set_interest(
        &self,
        user: UserId,
        discussion: DiscussionId,
        value: i32,
    ) -> Result<(), AppError> {
        Ok(lock(&self.store)?.set_interest(user, discussion, value)?)
    }

    pub fn set_public(&self, discussion: DiscussionId, is_public: bool) -> Result<(), AppError> {
        Ok(lock(&self.store)?.set_public(discussion, is_public)?)
    }

    pub fn set_possible_slots(
        &self,
        discussion: DiscussionId,
        possible_slots: SlotMask,
    ) -> Result<(), AppError> {
        Ok(lock(&self.store)?.set_possible_slots(discussion, possible_slots)?)
    }

    pub fn set_locked_slots(&self, locked: SlotMask) -> Result<(), AppError> {
        lock(&self.store)?.set_locked_slots(locked);
        Ok(())
    }

    pub fn state(&self) -> Result<ScheduleState, AppError> {
        Ok(*lock(&self.store)?.state())
    }

    pub fn timetable(&self) -> Result<Timetable, AppError> {
        Ok(lock(&self.store)?.timetable().clone())
    }

    /// Score of the committed schedule against the current interests.
    pub fn schedule_score(&self) -> Result<SlotScore, AppError> {
        let store = lock(&self.store)?;
        let mut schedule = store.schedule().cloned().ok_or(ScheduleError::NoSchedule)?;
        Ok(schedule
            .score(store.ledger(), Validation::Production)
            .map_err(ScheduleError::from)?)
    }

    /// Takes a snapshot and starts the search on the blocking thread pool.
    ///
    /// Errors found while snapshotting are returned directly, everything after that through
    /// the handle. Needs a tokio runtime, without one nothing is started.
    pub fn make_schedule(
        &self,
        options: SearchOptions,
    ) -> Result<JoinHandle<Result<RunReport, AppError>>, AppError> {
        let runtime = Handle::try_current()?;
        let snapshot = lock(&self.store)?
            .start_search(options.validation)
            .inspect_err(|err| info!("not starting search: {err}"))?;
        let mut guard = RunGuard {
            store: Arc::clone(&self.store),
            armed: true,
        };
        let persist = Arc::clone(&self.persist);
        Ok(runtime.spawn_blocking(move || {
            finish_run(&mut guard, persist.as_ref(), &snapshot, &options)
        }))
    }
}

/// Ends the run in the store if it is dropped before the run got to commit, for example
/// because the search panicked.
struct RunGuard {
    store: Arc<Mutex<Store>>,
    armed: bool,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if self.armed {
            error!("search ended without a result");
            self.store
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .abort_search();
        }
    }
}

fn finish_run(
    guard: &mut RunGuard,
    persist: &dyn Persist,
    snapshot: &SearchStore,
    options: &SearchOptions,
) -> Result<RunReport, AppError> {
    let outcome = run(snapshot, options);

    let mut store = lock(&guard.store)?;
    // from here on the store's state is updated below, whatever happens
    guard.armed = false;
    let SearchOutcome {
        schedule,
        score,
        strategy,
        heuristic_score,
        random_score,
        candidates,
    } = match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("search failed: {err}");
            store.abort_search();
            return Err(err.into());
        }
    };
    store.commit(schedule)?;
    let timetable = store.timetable().clone();
    let stale = store.state().is_stale();
    drop(store);

    let persist_error = persist
        .persist(&timetable)
        .inspect_err(|err| error!("persisting timetable failed: {err}"))
        .err()
        .map(|err| err.to_string());

    Ok(RunReport {
        strategy,
        heuristic_score,
        random_score,
        candidates,
        score,
        stale,
        persist_error,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use session_scheduler_engine::{Day, Store, Timetable, TimetableSlot, Validation};

    use super::{lock, RunGuard};
    use crate::error::AppError;

    fn running_store() -> Result<Arc<Mutex<Store>>, AppError> {
        let mut store = Store::new(Timetable::new(
            vec![Day::new("Monday", vec![TimetableSlot::new("09:00", false)])],
            Vec::new(),
        ));
        store.start_search(Validation::Production)?;
        Ok(Arc::new(Mutex::new(store)))
    }

    #[test]
    fn dropped_guard_ends_the_run() -> Result<(), AppError> {
        let store = running_store()?;
        drop(RunGuard {
            store: Arc::clone(&store),
            armed: true,
        });
        assert!(!lock(&store)?.state().is_running());
        Ok(())
    }

    #[test]
    fn disarmed_guard_leaves_a_new_run_alone() -> Result<(), AppError> {
        let store = running_store()?;
        drop(RunGuard {
            store: Arc::clone(&store),
            armed: false,
        });
        assert!(lock(&store)?.state().is_running());
        Ok(())
    }

    #[test]
    fn guard_recovers_a_poisoned_lock() -> Result<(), AppError> {
        let store = running_store()?;
        let poisoner = Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _locked = poisoner.lock();
            panic!("search crashed while holding the lock");
        })
        .join();
        drop(RunGuard {
            store: Arc::clone(&store),
            armed: true,
        });
        let state = *store
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .state();
        assert!(!state.is_running());
        Ok(())
    }
}
