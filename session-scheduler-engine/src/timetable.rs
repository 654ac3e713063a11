use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::InternalError;
use crate::ledger::{Discussion, DiscussionId, Ledger, UserId};
use crate::mask::SlotMask;
use crate::schedule::Schedule;
use crate::slot::Slot;

/// A room. Exactly one location, the last one, is not a place and takes whatever doesn't fit
/// anywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub name: String,
    pub capacity: u32,
    pub is_place: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimetableDiscussion {
    pub id: DiscussionId,
    pub title: String,
    pub location: String,
    pub attendee_count: usize,
    pub score: u32,
    pub attending: Vec<String>,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimetableSlot {
    pub time: String,
    pub is_break: bool,
    pub is_locked: bool,
    pub discussions: Vec<TimetableDiscussion>,
}

impl TimetableSlot {
    #[must_use]
    pub fn new(time: impl Into<String>, is_break: bool) -> Self {
        Self {
            time: time.into(),
            is_break,
            is_locked: false,
            discussions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Day {
    pub name: String,
    /// Every non-break slot of the day is locked.
    pub is_final: bool,
    pub slots: Vec<TimetableSlot>,
}

impl Day {
    #[must_use]
    pub fn new(name: impl Into<String>, slots: Vec<TimetableSlot>) -> Self {
        Self {
            name: name.into(),
            is_final: false,
            slots,
        }
    }
}

/// The calendar a schedule is projected onto. Non-break slots correspond, in order, to the
/// slots of a [`Schedule`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Timetable {
    days: Vec<Day>,
    locations: Vec<Location>,
}

impl Timetable {
    #[must_use]
    pub fn new(days: Vec<Day>, locations: Vec<Location>) -> Self {
        Self { days, locations }
    }

    #[must_use]
    pub fn days(&self) -> &[Day] {
        &self.days
    }

    #[must_use]
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Number of slots that can hold discussions.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.days
            .iter()
            .flat_map(|day| &day.slots)
            .filter(|slot| !slot.is_break)
            .count()
    }

    fn check_locations(&self) -> Result<(), InternalError> {
        match self.locations.split_last() {
            Some((catch_all, places))
                if !catch_all.is_place && places.iter().all(|location| location.is_place) =>
            {
                Ok(())
            }
            _ => {
                error!(locations = ?self.locations, "misconfigured catch-all location");
                Err(InternalError::CatchAllLocation)
            }
        }
    }

    /// Projects `schedule` onto the calendar. On error the timetable is left unchanged.
    pub fn place(&mut self, schedule: &Schedule, ledger: &Ledger) -> Result<(), InternalError> {
        let timetable = self.slot_count();
        if schedule.len() != timetable {
            error!(
                schedule = schedule.len(),
                timetable, "schedule doesn't fit the timetable"
            );
            return Err(InternalError::SlotCountMismatch {
                schedule: schedule.len(),
                timetable,
            });
        }
        self.check_locations()?;

        let placed = schedule
            .slots()
            .iter()
            .map(|slot| self.place_slot(slot, ledger))
            .collect_vec();

        let mut placed = placed.into_iter();
        for timetable_slot in self.days.iter_mut().flat_map(|day| &mut day.slots) {
            if timetable_slot.is_break {
                continue;
            }
            timetable_slot.discussions = placed.next().unwrap_or_default();
        }
        debug!(slots = timetable, "placed schedule onto timetable");
        Ok(())
    }

    /// Display data for one slot. The discussions with the most attendees get the first
    /// places, everything beyond the number of places shares the catch-all.
    fn place_slot(&self, slot: &Slot, ledger: &Ledger) -> Vec<TimetableDiscussion> {
        let names = |users: &mut dyn Iterator<Item = UserId>| {
            users
                .filter_map(|user| ledger.user(user).map(|user| user.name().to_owned()))
                .collect_vec()
        };
        let mut discussions = slot
            .discussions()
            .iter()
            .filter_map(|id| ledger.discussion(*id))
            .map(|discussion: &Discussion| {
                let attending = names(&mut slot.attendees(discussion.id()));
                TimetableDiscussion {
                    id: discussion.id(),
                    title: discussion.title().to_owned(),
                    location: String::new(),
                    attendee_count: attending.len(),
                    score: slot.discussion_score(discussion).score,
                    attending,
                    missing: names(&mut slot.missing(discussion)),
                }
            })
            .collect_vec();
        // stable, equal counts keep slot order
        discussions.sort_by_key(|discussion| core::cmp::Reverse(discussion.attendee_count));

        let mut places = self.locations.iter().filter(|location| location.is_place);
        let catch_all = self.locations.last();
        for discussion in &mut discussions {
            if let Some(location) = places.next().or(catch_all) {
                discussion.location.clone_from(&location.name);
            }
        }
        discussions
    }

    /// Marks slots as locked and days as final when all of their non-break slots are locked.
    pub fn update_is_final(&mut self, locked: &SlotMask) {
        let mut index = 0;
        for day in &mut self.days {
            let mut is_final = true;
            for slot in &mut day.slots {
                if slot.is_break {
                    continue;
                }
                slot.is_locked = locked.contains(index);
                is_final &= slot.is_locked;
                index += 1;
            }
            day.is_final = is_final;
        }
    }
}
