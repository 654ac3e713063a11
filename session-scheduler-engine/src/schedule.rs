use alloc::collections::BTreeMap;

use crate::error::InternalError;
use crate::ledger::{Discussion, DiscussionId, Ledger};
use crate::mask::SlotMask;
use crate::search::Validation;
use crate::slot::{Slot, SlotScore};
use crate::snapshot::SearchStore;

/// One full candidate solution: a slot per non-break timetable slot, in calendar order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    slots: Vec<Slot>,
    locked: SlotMask,
}

impl Schedule {
    /// An empty schedule sized for `store`, with every locked slot copied from the previously
    /// committed schedule. Attendance in copied slots follows the snapshot's interests.
    #[must_use]
    pub fn template(store: &SearchStore) -> Self {
        let slots = (0..store.slot_count())
            .map(|index| {
                if store.locked().contains(index) {
                    let mut slot = store
                        .prior()
                        .and_then(|prior| prior.slot(index))
                        .cloned()
                        .unwrap_or_default();
                    slot.refresh_attendance(store.ledger());
                    slot
                } else {
                    Slot::new()
                }
            })
            .collect();
        Self {
            slots,
            locked: store.locked().clone(),
        }
    }

    #[must_use]
    pub fn with_slots(slots: Vec<Slot>, locked: SlotMask) -> Self {
        Self { slots, locked }
    }

    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Slot> {
        self.slots.get_mut(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub const fn locked(&self) -> &SlotMask {
        &self.locked
    }

    #[must_use]
    pub fn is_locked(&self, index: usize) -> bool {
        self.locked.contains(index)
    }

    /// The slot `discussion` is placed in.
    #[must_use]
    pub fn placement(&self, discussion: DiscussionId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.contains(discussion))
    }

    /// Slots the search may put `discussion` into.
    pub fn open_slots<'a>(&'a self, discussion: &'a Discussion) -> impl Iterator<Item = usize> + 'a {
        (0..self.slots.len())
            .filter(move |index| !self.is_locked(*index) && discussion.is_slot_permitted(*index))
    }

    pub fn score(
        &mut self,
        ledger: &Ledger,
        validation: Validation,
    ) -> Result<SlotScore, InternalError> {
        let mut total = SlotScore::default();
        for slot in &mut self.slots {
            total += slot.score(ledger, validation)?;
        }
        Ok(total)
    }

    /// Every discussion may appear in at most one slot.
    pub fn check_unique(&self) -> Result<(), InternalError> {
        let mut seen = BTreeMap::new();
        for (index, slot) in self.slots.iter().enumerate() {
            for discussion in slot.discussions() {
                if seen.insert(*discussion, index).is_some() {
                    return Err(InternalError::DuplicatePlacement(*discussion));
                }
            }
        }
        Ok(())
    }

    /// Locked slots must hold exactly what `template` put there.
    pub fn check_locked(&self, template: &Self) -> Result<(), InternalError> {
        for index in self.locked.iter() {
            if self.slot(index).map(Slot::discussions) != template.slot(index).map(Slot::discussions)
            {
                return Err(InternalError::LockedSlotChanged(index));
            }
        }
        Ok(())
    }
}
