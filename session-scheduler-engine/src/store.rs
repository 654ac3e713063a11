use alloc::sync::Arc;

use tracing::{error, info};

use crate::error::{InternalError, ScheduleError};
use crate::ledger::{DiscussionId, Ledger, UserId};
use crate::mask::SlotMask;
use crate::schedule::Schedule;
use crate::search::Validation;
use crate::slot::Slot;
use crate::snapshot::SearchStore;
use crate::state::ScheduleState;
use crate::timetable::Timetable;

/// The live data. Every mutation marks the committed schedule as stale.
#[derive(Debug, Clone)]
pub struct Store {
    ledger: Ledger,
    locked: SlotMask,
    schedule: Option<Arc<Schedule>>,
    timetable: Timetable,
    state: ScheduleState,
}

impl Store {
    #[must_use]
    pub fn new(timetable: Timetable) -> Self {
        Self {
            ledger: Ledger::new(),
            locked: SlotMask::new(),
            schedule: None,
            timetable,
            state: ScheduleState::new(),
        }
    }

    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub const fn locked(&self) -> &SlotMask {
        &self.locked
    }

    #[must_use]
    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_deref()
    }

    #[must_use]
    pub const fn timetable(&self) -> &Timetable {
        &self.timetable
    }

    #[must_use]
    pub const fn state(&self) -> &ScheduleState {
        &self.state
    }

    pub fn add_user(&mut self, name: impl Into<String>) -> UserId {
        self.state.modify();
        self.ledger.add_user(name)
    }

    pub fn add_discussion(
        &mut self,
        owner: UserId,
        title: impl Into<String>,
        is_public: bool,
    ) -> Result<DiscussionId, ScheduleError> {
        let slot_count = self.timetable.slot_count();
        let id = self
            .ledger
            .add_discussion(owner, title, is_public, slot_count)?;
        self.state.modify();
        Ok(id)
    }

    pub fn set_interest(
        &mut self,
        user: UserId,
        discussion: DiscussionId,
        value: i32,
    ) -> Result<(), ScheduleError> {
        self.ledger.set_interest(user, discussion, value)?;
        self.state.modify();
        Ok(())
    }

    pub fn set_public(
        &mut self,
        discussion: DiscussionId,
        is_public: bool,
    ) -> Result<(), ScheduleError> {
        self.ledger.set_public(discussion, is_public)?;
        self.state.modify();
        Ok(())
    }

    pub fn set_possible_slots(
        &mut self,
        discussion: DiscussionId,
        possible_slots: SlotMask,
    ) -> Result<(), ScheduleError> {
        self.ledger.set_possible_slots(discussion, possible_slots)?;
        self.state.modify();
        Ok(())
    }

    pub fn set_locked_slots(&mut self, locked: SlotMask) {
        self.timetable.update_is_final(&locked);
        self.locked = locked;
        self.state.modify();
    }

    /// Copies what a search needs and marks a search as running.
    ///
    /// Nothing changes if the snapshot can't be taken.
    pub fn start_search(&mut self, validation: Validation) -> Result<SearchStore, ScheduleError> {
        if self.state.is_running() {
            return Err(ScheduleError::SearchInProgress);
        }
        let store = SearchStore::new(
            &self.ledger,
            &self.locked,
            self.timetable.slot_count(),
            self.schedule.clone(),
            validation,
        )?;
        self.state.start_search()?;
        Ok(store)
    }

    /// Replaces the committed schedule and re-places the timetable in one step.
    ///
    /// If the schedule doesn't fit the timetable, or would change a slot that got locked while
    /// the search ran, the previous schedule stays and the run counts as failed.
    pub fn commit(&mut self, schedule: Schedule) -> Result<(), ScheduleError> {
        if let Some(index) = self.locked_since_snapshot(&schedule) {
            error!(slot = index, "slot was locked during the search, not committing schedule");
            self.state.search_failed();
            return Err(InternalError::LockedSlotChanged(index).into());
        }
        let mut timetable = self.timetable.clone();
        if let Err(err) = timetable.place(&schedule, &self.ledger) {
            error!("not committing schedule: {err}");
            self.state.search_failed();
            return Err(err.into());
        }
        timetable.update_is_final(&self.locked);
        self.timetable = timetable;
        self.schedule = Some(Arc::new(schedule));
        self.state.search_succeeded();
        info!(stale = self.state.is_stale(), "committed schedule");
        Ok(())
    }

    /// A slot that is locked now but wasn't when `schedule` was searched, and whose contents
    /// differ from the committed schedule.
    fn locked_since_snapshot(&self, schedule: &Schedule) -> Option<usize> {
        let committed = |index| {
            self.schedule()
                .and_then(|committed| committed.slot(index))
                .map_or(&[][..], Slot::discussions)
        };
        self.locked
            .iter()
            .filter(|index| !schedule.is_locked(*index))
            .find(|index| {
                schedule.slot(*index).map_or(&[][..], Slot::discussions) != committed(*index)
            })
    }

    /// Ends a run that didn't produce a schedule.
    pub fn abort_search(&mut self) {
        self.state.search_failed();
    }
}
