use alloc::sync::Arc;

use itertools::Itertools;
use tracing::{debug, error};

use crate::error::ScheduleError;
use crate::ledger::{Discussion, DiscussionId, Ledger};
use crate::mask::SlotMask;
use crate::schedule::Schedule;
use crate::search::Validation;

/// A private copy of everything a search reads, so the live store is only locked while the
/// copy is taken.
#[derive(Debug, Clone)]
pub struct SearchStore {
    ledger: Ledger,
    locked: SlotMask,
    slot_count: usize,
    prior: Option<Arc<Schedule>>,
    worklist: Vec<DiscussionId>,
    validation: Validation,
}

impl SearchStore {
    pub fn new(
        ledger: &Ledger,
        locked: &SlotMask,
        slot_count: usize,
        prior: Option<Arc<Schedule>>,
        validation: Validation,
    ) -> Result<Self, ScheduleError> {
        let moderated = ledger
            .discussions()
            .filter(|discussion| !discussion.is_public())
            .map(Discussion::id)
            .collect_vec();
        if !moderated.is_empty() {
            debug!(?moderated, "refusing to schedule discussions awaiting moderation");
            return Err(ScheduleError::ModeratedDiscussions(moderated));
        }

        if locked.covers(slot_count) {
            return Err(ScheduleError::AllSlotsLocked);
        }

        if validation == Validation::Strict {
            ledger
                .check_symmetry()
                .inspect_err(|err| error!("refusing to snapshot: {err}"))?;
        }

        let worklist = ledger
            .discussions()
            .map(Discussion::id)
            .filter(|id| {
                !prior.as_ref().is_some_and(|prior| {
                    prior
                        .placement(*id)
                        .is_some_and(|index| locked.contains(index))
                })
            })
            .collect_vec();

        debug!(
            slot_count,
            locked = locked.len(),
            worklist = worklist.len(),
            "took search snapshot"
        );

        Ok(Self {
            ledger: ledger.clone(),
            locked: locked.clone(),
            slot_count,
            prior,
            worklist,
            validation,
        })
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
    pub const fn slot_count(&self) -> usize {
        self.slot_count
    }

    #[must_use]
    pub fn prior(&self) -> Option<&Schedule> {
        self.prior.as_deref()
    }

    /// Discussions that are not already sitting in a locked slot.
    #[must_use]
    pub fn worklist(&self) -> &[DiscussionId] {
        &self.worklist
    }

    #[must_use]
    pub const fn validation(&self) -> Validation {
        self.validation
    }
}
