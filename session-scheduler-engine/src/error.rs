use thiserror::Error;

use crate::ledger::{DiscussionId, UserId};

/// Errors a caller can correct, plus a wrapper for bugs caught at the run boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("interest {0} is outside of 0..=100")]
    InvalidInterest(i32),
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error("discussion {0} not found")]
    DiscussionNotFound(DiscussionId),
    #[error("all slots are locked, nothing left to schedule")]
    AllSlotsLocked,
    #[error("a schedule search is already in progress")]
    SearchInProgress,
    #[error("discussions awaiting moderation can't be scheduled: {0:?}")]
    ModeratedDiscussions(Vec<DiscussionId>),
    #[error("the search did not produce any schedule")]
    NoSchedule,
    #[error("internal error: {0}")]
    Internal(#[from] InternalError),
}

/// Invariant violations. These abort the current run only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InternalError {
    #[error("interest ledger is asymmetric for user {user} and discussion {discussion}")]
    AsymmetricLedger {
        user: UserId,
        discussion: DiscussionId,
    },
    #[error("schedule has {schedule} slots but the timetable has {timetable} non-break slots")]
    SlotCountMismatch { schedule: usize, timetable: usize },
    #[error("discussion {0} is placed in more than one slot")]
    DuplicatePlacement(DiscussionId),
    #[error("locked slot {0} changed during the search")]
    LockedSlotChanged(usize),
    #[error("the last location must be the only one that is not a place")]
    CatchAllLocation,
    #[error(
        "user {user} attends discussion {attending} although they prefer discussion {preferred} \
         in the same slot"
    )]
    SuboptimalAttendance {
        user: UserId,
        attending: DiscussionId,
        preferred: DiscussionId,
    },
}
