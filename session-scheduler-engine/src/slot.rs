use alloc::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::error::InternalError;
use crate::ledger::{Discussion, DiscussionId, Interest, Ledger, UserId};
use crate::search::Validation;

/// Achieved and missed interest. `missed` is diagnostic only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SlotScore {
    pub score: u32,
    pub missed: u32,
}

impl core::ops::AddAssign for SlotScore {
    fn add_assign(&mut self, rhs: Self) {
        self.score += rhs.score;
        self.missed += rhs.missed;
    }
}

/// The discussions running concurrently in one time unit and who attends which of them.
///
/// A user is only in the attendance map if they are interested in at least one of the
/// discussions, and then always attends the one they are most interested in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    // insertion ordered, never contains duplicates
    discussions: Vec<DiscussionId>,
    attendance: BTreeMap<UserId, DiscussionId>,
}

impl Slot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn discussions(&self) -> &[DiscussionId] {
        &self.discussions
    }

    #[must_use]
    pub fn contains(&self, discussion: DiscussionId) -> bool {
        self.discussions.contains(&discussion)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.discussions.is_empty()
    }

    #[must_use]
    pub fn attending(&self, user: UserId) -> Option<DiscussionId> {
        self.attendance.get(&user).copied()
    }

    #[must_use]
    pub const fn attendance(&self) -> &BTreeMap<UserId, DiscussionId> {
        &self.attendance
    }

    pub fn attendees(&self, discussion: DiscussionId) -> impl Iterator<Item = UserId> + '_ {
        self.attendance
            .iter()
            .filter(move |(_, attending)| **attending == discussion)
            .map(|(user, _)| *user)
    }

    fn current_interest(&self, ledger: &Ledger, user: UserId) -> Interest {
        self.attending(user)
            .map_or(Interest::NONE, |attending| ledger.interest(user, attending))
    }

    /// Recomputes who attends what from the ledger, keeping the discussions as they are.
    pub fn refresh_attendance(&mut self, ledger: &Ledger) {
        self.attendance.clear();
        for &id in &self.discussions {
            let Some(discussion) = ledger.discussion(id) else {
                continue;
            };
            for (user, interest) in discussion.interested() {
                if interest > self.current_interest(ledger, user) {
                    self.attendance.insert(user, id);
                }
            }
        }
    }

    /// Users who would switch to `discussion`, with how much each of them would gain.
    ///
    /// Ties stay with the discussion the user already attends.
    fn gains<'a>(
        &'a self,
        ledger: &'a Ledger,
        discussion: &'a Discussion,
    ) -> impl Iterator<Item = (UserId, u32)> + 'a {
        discussion.interested().filter_map(move |(user, interest)| {
            let current = self.current_interest(ledger, user);
            (interest > current).then(|| (user, interest.value() - current.value()))
        })
    }

    /// The score `assign` would add, without changing anything.
    #[must_use]
    pub fn evaluate(&self, ledger: &Ledger, discussion: &Discussion) -> u32 {
        if self.contains(discussion.id()) {
            return 0;
        }
        self.gains(ledger, discussion).map(|(_, gain)| gain).sum()
    }

    /// Adds `discussion` and moves every user who prefers it over their current choice.
    /// Returns the added score. Adding a discussion twice is a no-op.
    pub fn assign(&mut self, ledger: &Ledger, discussion: &Discussion) -> u32 {
        if self.contains(discussion.id()) {
            return 0;
        }
        let gains: Vec<(UserId, u32)> = self.gains(ledger, discussion).collect();
        let mut delta = 0;
        for (user, gain) in gains {
            self.attendance.insert(user, discussion.id());
            delta += gain;
        }
        self.discussions.push(discussion.id());
        delta
    }

    /// Where each attendee of `discussion` would go instead, and the score lost by the move.
    fn removal_plan(
        &self,
        ledger: &Ledger,
        discussion: DiscussionId,
    ) -> (Vec<(UserId, Option<DiscussionId>)>, u32) {
        let mut plan = Vec::new();
        let mut loss = 0;
        for user in self.attendees(discussion) {
            let current = ledger.interest(user, discussion);
            let mut best: Option<(DiscussionId, Interest)> = None;
            for &other in self.discussions.iter().filter(|other| **other != discussion) {
                let interest = ledger.interest(user, other);
                if !interest.is_none() && best.map_or(true, |(_, best)| interest > best) {
                    best = Some((other, interest));
                }
            }
            let replacement = best.map_or(Interest::NONE, |(_, interest)| interest);
            loss += current.value().saturating_sub(replacement.value());
            plan.push((user, best.map(|(other, _)| other)));
        }
        (plan, loss)
    }

    /// The score `remove` would lose, without changing anything.
    #[must_use]
    pub fn evaluate_remove(&self, ledger: &Ledger, discussion: DiscussionId) -> u32 {
        if !self.contains(discussion) {
            return 0;
        }
        self.removal_plan(ledger, discussion).1
    }

    /// Takes `discussion` out of the slot. Its attendees move to their next favourite
    /// discussion here or leave the slot. Returns the lost score.
    pub fn remove(&mut self, ledger: &Ledger, discussion: DiscussionId) -> u32 {
        if !self.contains(discussion) {
            warn!(%discussion, "tried to remove a discussion that is not in the slot");
            return 0;
        }
        let (plan, loss) = self.removal_plan(ledger, discussion);
        for (user, replacement) in plan {
            match replacement {
                Some(replacement) => {
                    self.attendance.insert(user, replacement);
                }
                None => {
                    self.attendance.remove(&user);
                }
            }
        }
        self.discussions.retain(|other| *other != discussion);
        loss
    }

    /// Score of a single discussion in this slot.
    ///
    /// Every interested user who doesn't attend it counts as missing it, even if they missed
    /// other discussions in this slot as well.
    #[must_use]
    pub fn discussion_score(&self, discussion: &Discussion) -> SlotScore {
        let mut result = SlotScore::default();
        for (user, interest) in discussion.interested() {
            if self.attending(user) == Some(discussion.id()) {
                result.score += interest.value();
            } else {
                result.missed += interest.value();
            }
        }
        result
    }

    /// Users interested in `discussion` who attend something else in this slot.
    pub fn missing<'a>(&'a self, discussion: &'a Discussion) -> impl Iterator<Item = UserId> + 'a {
        discussion
            .interested()
            .filter(move |(user, _)| self.attending(*user) != Some(discussion.id()))
            .map(|(user, _)| user)
    }

    /// Finds a user whose attendance is not their favourite discussion in this slot.
    fn find_suboptimal(
        &self,
        ledger: &Ledger,
    ) -> Option<(UserId, Option<DiscussionId>, DiscussionId)> {
        for &id in &self.discussions {
            let Some(discussion) = ledger.discussion(id) else {
                continue;
            };
            for (user, interest) in discussion.interested() {
                if interest > self.current_interest(ledger, user) {
                    let mut preferred = (id, interest);
                    for &other in &self.discussions {
                        let other_interest = ledger.interest(user, other);
                        if other_interest > preferred.1 {
                            preferred = (other, other_interest);
                        }
                    }
                    return Some((user, self.attending(user), preferred.0));
                }
            }
        }
        None
    }

    /// Sums every discussion's score.
    ///
    /// Before scoring, attendance is checked against the ledger. Under strict validation a user
    /// attending something they like less than another discussion here is an error, otherwise
    /// it is fixed and logged.
    pub fn score(
        &mut self,
        ledger: &Ledger,
        validation: Validation,
    ) -> Result<SlotScore, InternalError> {
        while let Some((user, attending, preferred)) = self.find_suboptimal(ledger) {
            match validation {
                Validation::Strict => {
                    return Err(InternalError::SuboptimalAttendance {
                        user,
                        attending: attending.unwrap_or(preferred),
                        preferred,
                    });
                }
                Validation::Production => {
                    warn!(%user, ?attending, %preferred, "correcting suboptimal attendance");
                    self.attendance.insert(user, preferred);
                }
            }
        }

        let mut result = SlotScore::default();
        for id in &self.discussions {
            if let Some(discussion) = ledger.discussion(*id) {
                result += self.discussion_score(discussion);
            }
        }
        Ok(result)
    }

    #[cfg(test)]
    pub(crate) fn force_attendance(&mut self, user: UserId, discussion: DiscussionId) {
        self.attendance.insert(user, discussion);
    }
}
