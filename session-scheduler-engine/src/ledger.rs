use alloc::collections::BTreeMap;
use core::cell::Cell;
use core::fmt::{self, Display};

use serde::Serialize;

use crate::error::{InternalError, ScheduleError};
use crate::mask::SlotMask;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct UserId(pub u32);

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DiscussionId(pub u32);

impl Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

impl Display for DiscussionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.0)
    }
}

/// How much a user wants to attend a discussion. Zero means the same as not being in the ledger.
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Interest(u8);

impl Interest {
    pub const MAX: Self = Self(100);
    pub const NONE: Self = Self(0);

    pub fn new(value: i32) -> Result<Self, ScheduleError> {
        u8::try_from(value)
            .ok()
            .filter(|value| *value <= Self::MAX.0)
            .map(Self)
            .ok_or(ScheduleError::InvalidInterest(value))
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0 as u32
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone)]
pub struct User {
    id: UserId,
    name: String,
    interests: BTreeMap<DiscussionId, Interest>,
}

impl User {
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn interest(&self, discussion: DiscussionId) -> Interest {
        self.interests
            .get(&discussion)
            .copied()
            .unwrap_or(Interest::NONE)
    }

    pub fn interests(&self) -> impl Iterator<Item = (DiscussionId, Interest)> + '_ {
        self.interests.iter().map(|(id, interest)| (*id, *interest))
    }
}

#[derive(Debug, Clone)]
pub struct Discussion {
    id: DiscussionId,
    owner: UserId,
    title: String,
    is_public: bool,
    interested: BTreeMap<UserId, Interest>,
    possible_slots: SlotMask,
    // None means dirty, filled on the next call to max_score
    max_score: Cell<Option<u32>>,
}

impl Discussion {
    #[must_use]
    pub const fn id(&self) -> DiscussionId {
        self.id
    }

    #[must_use]
    pub const fn owner(&self) -> UserId {
        self.owner
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub const fn is_public(&self) -> bool {
        self.is_public
    }

    #[must_use]
    pub const fn possible_slots(&self) -> &SlotMask {
        &self.possible_slots
    }

    #[must_use]
    pub fn is_slot_permitted(&self, index: usize) -> bool {
        self.possible_slots.contains(index)
    }

    #[must_use]
    pub fn interest(&self, user: UserId) -> Interest {
        self.interested
            .get(&user)
            .copied()
            .unwrap_or(Interest::NONE)
    }

    pub fn interested(&self) -> impl Iterator<Item = (UserId, Interest)> + '_ {
        self.interested.iter().map(|(id, interest)| (*id, *interest))
    }

    /// Sum of every interested user's score, the best this discussion can ever achieve.
    ///
    /// Recomputed on the first call after the interest set changed and cached afterwards.
    #[must_use]
    pub fn max_score(&self) -> u32 {
        if let Some(score) = self.max_score.get() {
            return score;
        }
        let score = self.interested.values().map(|interest| interest.value()).sum();
        self.max_score.set(Some(score));
        score
    }

    fn invalidate_max_score(&self) {
        self.max_score.set(None);
    }
}

/// Users, discussions and the interest between them, kept symmetric in both directions.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    users: BTreeMap<UserId, User>,
    discussions: BTreeMap<DiscussionId, Discussion>,
    next_user: u32,
    next_discussion: u32,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, name: impl Into<String>) -> UserId {
        let id = UserId(self.next_user);
        self.next_user += 1;
        self.users.insert(id, User {
            id,
            name: name.into(),
            interests: BTreeMap::new(),
        });
        id
    }

    /// New discussions may be placed in any of the first `slot_count` slots.
    pub fn add_discussion(
        &mut self,
        owner: UserId,
        title: impl Into<String>,
        is_public: bool,
        slot_count: usize,
    ) -> Result<DiscussionId, ScheduleError> {
        if !self.users.contains_key(&owner) {
            return Err(ScheduleError::UserNotFound(owner));
        }
        let id = DiscussionId(self.next_discussion);
        self.next_discussion += 1;
        self.discussions.insert(id, Discussion {
            id,
            owner,
            title: title.into(),
            is_public,
            interested: BTreeMap::new(),
            possible_slots: SlotMask::full(slot_count),
            max_score: Cell::new(None),
        });
        Ok(id)
    }

    pub fn set_interest(
        &mut self,
        user: UserId,
        discussion: DiscussionId,
        value: i32,
    ) -> Result<(), ScheduleError> {
        let interest = Interest::new(value)?;
        let user_entry = self
            .users
            .get_mut(&user)
            .ok_or(ScheduleError::UserNotFound(user))?;
        let discussion_entry = self
            .discussions
            .get_mut(&discussion)
            .ok_or(ScheduleError::DiscussionNotFound(discussion))?;

        if interest.is_none() {
            user_entry.interests.remove(&discussion);
            discussion_entry.interested.remove(&user);
        } else {
            user_entry.interests.insert(discussion, interest);
            discussion_entry.interested.insert(user, interest);
        }
        discussion_entry.invalidate_max_score();
        Ok(())
    }

    pub fn set_public(
        &mut self,
        discussion: DiscussionId,
        is_public: bool,
    ) -> Result<(), ScheduleError> {
        self.discussion_mut(discussion)?.is_public = is_public;
        Ok(())
    }

    pub fn set_possible_slots(
        &mut self,
        discussion: DiscussionId,
        possible_slots: SlotMask,
    ) -> Result<(), ScheduleError> {
        self.discussion_mut(discussion)?.possible_slots = possible_slots;
        Ok(())
    }

    #[must_use]
    pub fn interest(&self, user: UserId, discussion: DiscussionId) -> Interest {
        self.users
            .get(&user)
            .map_or(Interest::NONE, |user| user.interest(discussion))
    }

    #[must_use]
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    #[must_use]
    pub fn discussion(&self, id: DiscussionId) -> Option<&Discussion> {
        self.discussions.get(&id)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> + '_ {
        self.users.values()
    }

    pub fn discussions(&self) -> impl Iterator<Item = &Discussion> + '_ {
        self.discussions.values()
    }

    /// Every interest recorded on a user must be recorded with the same value on the discussion
    /// and the other way around.
    pub fn check_symmetry(&self) -> Result<(), InternalError> {
        for user in self.users.values() {
            for (discussion, interest) in user.interests() {
                let mirrored = self
                    .discussions
                    .get(&discussion)
                    .map(|entry| entry.interest(user.id));
                if mirrored != Some(interest) {
                    return Err(InternalError::AsymmetricLedger {
                        user: user.id,
                        discussion,
                    });
                }
            }
        }
        for discussion in self.discussions.values() {
            for (user, interest) in discussion.interested() {
                if self.interest(user, discussion.id) != interest {
                    return Err(InternalError::AsymmetricLedger {
                        user,
                        discussion: discussion.id,
                    });
                }
            }
        }
        Ok(())
    }

    fn discussion_mut(&mut self, id: DiscussionId) -> Result<&mut Discussion, ScheduleError> {
        self.discussions
            .get_mut(&id)
            .ok_or(ScheduleError::DiscussionNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::{Interest, Ledger};
    use crate::error::ScheduleError;
    use crate::ledger::{DiscussionId, UserId};

    #[test]
    fn interest_outside_range_is_rejected() {
        assert_eq!(Interest::new(101), Err(ScheduleError::InvalidInterest(101)));
        assert_eq!(Interest::new(-1), Err(ScheduleError::InvalidInterest(-1)));
        assert_eq!(Interest::new(100), Ok(Interest::MAX));
    }

    #[test]
    fn set_interest_updates_both_directions() -> Result<(), ScheduleError> {
        let mut ledger = Ledger::new();
        let alice = ledger.add_user("alice");
        let talk = ledger.add_discussion(alice, "talk", true, 2)?;

        ledger.set_interest(alice, talk, 40)?;
        assert_eq!(ledger.interest(alice, talk).value(), 40);
        let discussion = ledger.discussion(talk).ok_or(ScheduleError::DiscussionNotFound(talk))?;
        assert_eq!(discussion.interest(alice).value(), 40);
        assert_eq!(discussion.max_score(), 40);

        ledger.set_interest(alice, talk, 0)?;
        let discussion = ledger.discussion(talk).ok_or(ScheduleError::DiscussionNotFound(talk))?;
        assert_eq!(discussion.interested().count(), 0);
        assert_eq!(discussion.max_score(), 0);
        assert!(ledger.check_symmetry().is_ok());
        Ok(())
    }

    #[test]
    fn max_score_is_recomputed_after_change() -> Result<(), ScheduleError> {
        let mut ledger = Ledger::new();
        let alice = ledger.add_user("alice");
        let bob = ledger.add_user("bob");
        let talk = ledger.add_discussion(alice, "talk", true, 1)?;
        ledger.set_interest(alice, talk, 30)?;
        assert_eq!(ledger.discussion(talk).map(|d| d.max_score()), Some(30));
        ledger.set_interest(bob, talk, 50)?;
        assert_eq!(ledger.discussion(talk).map(|d| d.max_score()), Some(80));
        Ok(())
    }

    #[test]
    fn unknown_entities_are_not_found() -> Result<(), ScheduleError> {
        let mut ledger = Ledger::new();
        let alice = ledger.add_user("alice");
        let talk = ledger.add_discussion(alice, "talk", true, 1)?;
        assert_eq!(
            ledger.set_interest(UserId(99), talk, 10),
            Err(ScheduleError::UserNotFound(UserId(99)))
        );
        assert_eq!(
            ledger.set_interest(alice, DiscussionId(99), 10),
            Err(ScheduleError::DiscussionNotFound(DiscussionId(99)))
        );
        assert_eq!(
            ledger.set_interest(alice, DiscussionId(99), 500),
            Err(ScheduleError::InvalidInterest(500))
        );
        Ok(())
    }
}
