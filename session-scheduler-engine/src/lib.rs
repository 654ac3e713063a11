//! Assigns discussions to concurrent time slots so that as many attendees as possible get to
//! see what they are most interested in, and projects the result onto a calendar.

extern crate alloc;

pub mod error;
pub mod ledger;
pub mod mask;
pub mod schedule;
pub mod search;
pub mod slot;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod timetable;

pub use error::{InternalError, ScheduleError};
pub use ledger::{Discussion, DiscussionId, Interest, Ledger, User, UserId};
pub use mask::SlotMask;
pub use schedule::Schedule;
pub use search::{Algorithm, SearchOptions, SearchOutcome, Strategy, Validation};
pub use slot::{Slot, SlotScore};
pub use snapshot::SearchStore;
pub use state::{Phase, ScheduleState};
pub use store::Store;
pub use timetable::{Day, Location, Timetable, TimetableDiscussion, TimetableSlot};
