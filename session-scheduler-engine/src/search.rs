use core::cmp::Reverse;
use core::time::Duration;
use std::time::Instant;

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::seq::SliceRandom as _;
use rand::{Rng, SeedableRng as _};
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn};

use crate::error::{InternalError, ScheduleError};
use crate::ledger::DiscussionId;
use crate::schedule::Schedule;
use crate::slot::SlotScore;
use crate::snapshot::SearchStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Algorithm {
    /// Heuristic and randomized restart, keep the better one.
    #[default]
    Combined,
    Heuristic,
    Random,
    /// Heuristic followed by hill climbing with the mutation operator.
    Climb,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Validation {
    /// Fix and log inconsistencies.
    #[default]
    Production,
    /// Abort the run on any inconsistency.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub algorithm: Algorithm,
    pub validation: Validation,
    /// Wall-clock budget of the randomized strategies. Checked between whole candidates.
    pub duration: Duration,
    pub seed: Option<u64>,
    /// Upper bound of discussions evicted by one mutation.
    pub mutation_max: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            validation: Validation::default(),
            duration: Duration::from_secs(5),
            seed: None,
            mutation_max: 4,
        }
    }
}

impl SearchOptions {
    fn rng(&self) -> StdRng {
        self.seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
    }
}

/// Which strategy produced the committed schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strategy {
    Heuristic,
    Random,
    Climb,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub schedule: Schedule,
    pub score: SlotScore,
    pub strategy: Strategy,
    pub heuristic_score: Option<u32>,
    pub random_score: Option<u32>,
    /// Full schedules built by the randomized strategies.
    pub candidates: usize,
}

/// Greedy construction: the most wanted discussions first, each into the open slot where it
/// adds the most. Discussions that add nothing anywhere stay unplaced.
#[must_use]
pub fn heuristic(store: &SearchStore) -> Schedule {
    let ledger = store.ledger();
    let mut schedule = Schedule::template(store);

    let order = store
        .worklist()
        .iter()
        .filter_map(|id| ledger.discussion(*id))
        .sorted_by_key(|discussion| Reverse(discussion.max_score()));

    for discussion in order {
        let mut best: Option<(usize, u32)> = None;
        for index in schedule.open_slots(discussion) {
            let Some(slot) = schedule.slot(index) else {
                continue;
            };
            let delta = slot.evaluate(ledger, discussion);
            if delta > 0 && best.map_or(true, |(_, best)| delta > best) {
                best = Some((index, delta));
            }
        }
        match best.and_then(|(index, _)| schedule.slot_mut(index).map(|slot| (index, slot))) {
            Some((index, slot)) => {
                let delta = slot.assign(ledger, discussion);
                debug!(discussion = %discussion.id(), slot = index, delta, "placed discussion");
            }
            None => {
                warn!(
                    discussion = %discussion.id(),
                    title = discussion.title(),
                    "no slot improves the score, leaving discussion unplaced"
                );
            }
        }
    }
    schedule
}

/// Puts `discussion` into a uniformly chosen open slot. Returns the chosen slot, if any.
pub fn assign_random(
    schedule: &mut Schedule,
    store: &SearchStore,
    discussion: DiscussionId,
    rng: &mut impl Rng,
) -> Option<usize> {
    let ledger = store.ledger();
    let discussion = ledger.discussion(discussion)?;
    let open = schedule.open_slots(discussion).collect_vec();
    let index = *open.choose(rng)?;
    schedule.slot_mut(index)?.assign(ledger, discussion);
    Some(index)
}

/// A schedule with every worklist discussion in a random open slot.
pub fn random_schedule(store: &SearchStore, rng: &mut impl Rng) -> Schedule {
    let mut schedule = Schedule::template(store);
    for discussion in store.worklist() {
        if assign_random(&mut schedule, store, *discussion, rng).is_none() {
            debug!(%discussion, "no open slot for discussion");
        }
    }
    schedule
}

/// Randomized restart. Builds at least one candidate and keeps building until `budget` ran
/// out, returning the best candidate and how many were built.
pub fn random_search(
    store: &SearchStore,
    budget: Duration,
    rng: &mut impl Rng,
) -> Result<(Schedule, SlotScore, usize), InternalError> {
    let start = Instant::now();
    let mut best: Option<(Schedule, SlotScore)> = None;
    let mut candidates = 0;
    loop {
        let mut candidate = random_schedule(store, rng);
        let score = candidate.score(store.ledger(), store.validation())?;
        candidates += 1;
        if best.as_ref().map_or(true, |(_, best)| score.score > best.score) {
            debug!(candidates, score = score.score, "new best random schedule");
            best = Some((candidate, score));
        }
        if start.elapsed() >= budget {
            break;
        }
    }
    let (schedule, score) = best.unwrap_or_default();
    Ok((schedule, score, candidates))
}

/// Evicts between one and `max_evictions` discussions from random unlocked slots and places
/// them again at random. Returns the evicted discussions.
pub fn mutate(
    schedule: &mut Schedule,
    store: &SearchStore,
    max_evictions: usize,
    rng: &mut impl Rng,
) -> Vec<DiscussionId> {
    let ledger = store.ledger();
    let mut evicted = Vec::new();
    let count = rng.gen_range(1..=max_evictions.max(1));
    for _ in 0..count {
        let occupied = (0..schedule.len())
            .filter(|index| !schedule.is_locked(*index))
            .filter(|index| schedule.slot(*index).is_some_and(|slot| !slot.is_empty()))
            .collect_vec();
        let Some(&index) = occupied.choose(rng) else {
            break;
        };
        let Some(slot) = schedule.slot_mut(index) else {
            break;
        };
        let Some(&discussion) = slot.discussions().choose(rng) else {
            break;
        };
        slot.remove(ledger, discussion);
        evicted.push(discussion);
    }
    for discussion in &evicted {
        assign_random(schedule, store, *discussion, rng);
    }
    evicted
}

/// Hill climbing from `start`: keep every mutation that doesn't make the score worse.
pub fn climb(
    store: &SearchStore,
    start: Schedule,
    budget: Duration,
    max_evictions: usize,
    rng: &mut impl Rng,
) -> Result<(Schedule, SlotScore, usize), InternalError> {
    let started = Instant::now();
    let mut current = start;
    let mut current_score = current.score(store.ledger(), store.validation())?;
    let mut iterations = 0;
    while started.elapsed() < budget {
        let mut candidate = current.clone();
        mutate(&mut candidate, store, max_evictions, rng);
        let score = candidate.score(store.ledger(), store.validation())?;
        iterations += 1;
        if score.score >= current_score.score {
            current = candidate;
            current_score = score;
        }
    }
    Ok((current, current_score, iterations))
}

/// Runs the strategies selected by `options` over `store` and returns the best schedule.
///
/// The result is checked for duplicate placements and for changes to locked slots before it
/// is returned, so a caller can commit it as is.
pub fn run(store: &SearchStore, options: &SearchOptions) -> Result<SearchOutcome, ScheduleError> {
    let span = info_span!(
        "search",
        algorithm = ?options.algorithm,
        worklist = store.worklist().len(),
        slots = store.slot_count()
    );
    let _entered = span.enter();

    let ledger = store.ledger();
    let validation = store.validation();
    let mut rng = options.rng();

    let heuristic_run = matches!(
        options.algorithm,
        Algorithm::Combined | Algorithm::Heuristic | Algorithm::Climb
    )
    .then(|| {
        let mut schedule = heuristic(store);
        schedule.score(ledger, validation).map(|score| (schedule, score))
    })
    .transpose()?;

    let random_run = matches!(options.algorithm, Algorithm::Combined | Algorithm::Random)
        .then(|| random_search(store, options.duration, &mut rng))
        .transpose()?;

    let heuristic_score = heuristic_run.as_ref().map(|(_, score)| score.score);
    let random_score = random_run.as_ref().map(|(_, score, _)| score.score);
    let mut candidates = random_run.as_ref().map_or(0, |(_, _, candidates)| *candidates);

    let (schedule, score, strategy) = match (heuristic_run, random_run) {
        (Some((heuristic, heuristic_score)), Some((random, random_score, _))) => {
            if random_score.score > heuristic_score.score {
                (random, random_score, Strategy::Random)
            } else {
                (heuristic, heuristic_score, Strategy::Heuristic)
            }
        }
        (Some((heuristic, _)), None) if options.algorithm == Algorithm::Climb => {
            let (schedule, score, iterations) =
                climb(store, heuristic, options.duration, options.mutation_max, &mut rng)?;
            candidates = iterations;
            (schedule, score, Strategy::Climb)
        }
        (Some((heuristic, score)), None) => (heuristic, score, Strategy::Heuristic),
        (None, Some((random, score, _))) => (random, score, Strategy::Random),
        (None, None) => return Err(ScheduleError::NoSchedule),
    };

    let template = Schedule::template(store);
    schedule
        .check_unique()
        .and_then(|()| schedule.check_locked(&template))
        .inspect_err(|err| error!(?schedule, "search produced an invalid schedule: {err}"))?;

    info!(
        ?strategy,
        score = score.score,
        missed = score.missed,
        heuristic_score,
        random_score,
        candidates,
        "search finished"
    );

    Ok(SearchOutcome {
        schedule,
        score,
        strategy,
        heuristic_score,
        random_score,
        candidates,
    })
}

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use rand::rngs::StdRng;
    use rand::SeedableRng as _;

    use super::{heuristic, mutate, random_search, run, Algorithm, SearchOptions, Strategy, Validation};
    use crate::error::ScheduleError;
    use crate::ledger::{DiscussionId, Ledger, UserId};
    use crate::mask::SlotMask;
    use crate::snapshot::SearchStore;

    /// Three users who each want a different pair of four discussions, three slots.
    fn conference() -> Result<(Ledger, Vec<UserId>, Vec<DiscussionId>), ScheduleError> {
        let mut ledger = Ledger::new();
        let users: Vec<UserId> = ["ada", "bob", "cyd"]
            .into_iter()
            .map(|name| ledger.add_user(name))
            .collect();
        let discussions = (0..4)
            .map(|i| ledger.add_discussion(users[0], format!("talk {i}"), true, 3))
            .collect::<Result<Vec<_>, _>>()?;
        let grid = [[100, 80, 0, 10], [90, 0, 70, 0], [0, 60, 100, 40]];
        for (user, row) in users.iter().zip(grid) {
            for (discussion, value) in discussions.iter().zip(row) {
                ledger.set_interest(*user, *discussion, value)?;
            }
        }
        Ok((ledger, users, discussions))
    }

    fn options(algorithm: Algorithm) -> SearchOptions {
        SearchOptions {
            algorithm,
            validation: Validation::Strict,
            duration: Duration::from_millis(20),
            seed: Some(7),
            mutation_max: 2,
        }
    }

    #[test]
    fn heuristic_places_most_wanted_discussions() -> Result<(), ScheduleError> {
        let (ledger, _, discussions) = conference()?;
        let store = SearchStore::new(&ledger, &SlotMask::new(), 3, None, Validation::Strict)?;
        let mut schedule = heuristic(&store);
        schedule.check_unique()?;
        for discussion in &discussions {
            assert!(schedule.placement(*discussion).is_some());
        }
        // the first two talks are wanted by the same people and must not share a slot
        assert_ne!(
            schedule.placement(discussions[0]),
            schedule.placement(discussions[1])
        );
        let score = schedule.score(&ledger, Validation::Strict)?;
        assert!(score.score >= 100 + 90 + 100);
        Ok(())
    }

    #[test]
    fn heuristic_leaves_unwanted_discussions_unplaced() -> Result<(), ScheduleError> {
        let mut ledger = Ledger::new();
        let user = ledger.add_user("user");
        let wanted = ledger.add_discussion(user, "wanted", true, 2)?;
        let unwanted = ledger.add_discussion(user, "unwanted", true, 2)?;
        ledger.set_interest(user, wanted, 50)?;
        let store = SearchStore::new(&ledger, &SlotMask::new(), 2, None, Validation::Strict)?;

        let schedule = heuristic(&store);
        assert!(schedule.placement(wanted).is_some());
        assert_eq!(schedule.placement(unwanted), None);
        Ok(())
    }

    #[test]
    fn heuristic_respects_permitted_slots() -> Result<(), ScheduleError> {
        let mut ledger = Ledger::new();
        let user = ledger.add_user("user");
        let talk = ledger.add_discussion(user, "talk", true, 3)?;
        ledger.set_interest(user, talk, 50)?;
        ledger.set_possible_slots(talk, [2].into_iter().collect())?;
        let store = SearchStore::new(&ledger, &SlotMask::new(), 3, None, Validation::Strict)?;
        assert_eq!(heuristic(&store).placement(talk), Some(2));
        Ok(())
    }

    #[test]
    fn random_search_builds_at_least_one_candidate() -> Result<(), ScheduleError> {
        let (ledger, _, discussions) = conference()?;
        let store = SearchStore::new(&ledger, &SlotMask::new(), 3, None, Validation::Strict)?;
        let mut rng = StdRng::seed_from_u64(1);
        let (schedule, _, candidates) = random_search(&store, Duration::ZERO, &mut rng)?;
        assert_eq!(candidates, 1);
        schedule.check_unique()?;
        for discussion in &discussions {
            assert!(schedule.placement(*discussion).is_some());
        }
        Ok(())
    }

    #[test]
    fn mutation_keeps_every_discussion_placed_once() -> Result<(), ScheduleError> {
        let (ledger, _, discussions) = conference()?;
        let store = SearchStore::new(&ledger, &SlotMask::new(), 3, None, Validation::Strict)?;
        let mut rng = StdRng::seed_from_u64(3);
        let mut schedule = heuristic(&store);
        for _ in 0..50 {
            let evicted = mutate(&mut schedule, &store, 3, &mut rng);
            assert!(!evicted.is_empty());
            schedule.check_unique()?;
            for discussion in &discussions {
                assert!(schedule.placement(*discussion).is_some());
            }
            assert!(schedule.score(&ledger, Validation::Strict).is_ok());
        }
        Ok(())
    }

    #[test]
    fn combined_commits_the_better_score() -> Result<(), ScheduleError> {
        let (ledger, _, _) = conference()?;
        let store = SearchStore::new(&ledger, &SlotMask::new(), 3, None, Validation::Strict)?;
        let outcome = run(&store, &options(Algorithm::Combined))?;
        let heuristic_score = outcome.heuristic_score.unwrap_or_default();
        let random_score = outcome.random_score.unwrap_or_default();
        assert_eq!(outcome.score.score, heuristic_score.max(random_score));
        match outcome.strategy {
            Strategy::Heuristic => assert!(heuristic_score >= random_score),
            Strategy::Random => assert!(random_score > heuristic_score),
            Strategy::Climb => panic!("combined search never climbs"),
        }
        assert!(outcome.candidates >= 1);
        Ok(())
    }

    #[test]
    fn combined_takes_random_when_greedy_gets_stuck() -> Result<(), ScheduleError> {
        // the favourite grabs the first slot, after that the runner-up, which can only go
        // there, adds nothing
        let mut ledger = Ledger::new();
        let user = ledger.add_user("user");
        let favourite = ledger.add_discussion(user, "favourite", true, 2)?;
        let runner_up = ledger.add_discussion(user, "runner-up", true, 2)?;
        ledger.set_interest(user, favourite, 100)?;
        ledger.set_interest(user, runner_up, 90)?;
        ledger.set_possible_slots(runner_up, [0].into_iter().collect())?;
        let store = SearchStore::new(&ledger, &SlotMask::new(), 2, None, Validation::Strict)?;

        let outcome = run(&store, &SearchOptions {
            duration: Duration::from_millis(50),
            ..options(Algorithm::Combined)
        })?;
        assert_eq!(outcome.heuristic_score, Some(100));
        assert_eq!(outcome.strategy, Strategy::Random);
        assert_eq!(outcome.score.score, 190);
        assert_eq!(outcome.schedule.placement(runner_up), Some(0));
        assert_eq!(outcome.schedule.placement(favourite), Some(1));
        Ok(())
    }

    #[test]
    fn locked_slots_survive_a_rerun() -> Result<(), ScheduleError> {
        let (ledger, _, _) = conference()?;
        let store = SearchStore::new(&ledger, &SlotMask::new(), 3, None, Validation::Strict)?;
        let first = run(&store, &options(Algorithm::Heuristic))?.schedule;

        let locked: SlotMask = [1].into_iter().collect();
        let store = SearchStore::new(
            &ledger,
            &locked,
            3,
            Some(alloc::sync::Arc::new(first.clone())),
            Validation::Strict,
        )?;
        for algorithm in [Algorithm::Combined, Algorithm::Random, Algorithm::Climb] {
            let outcome = run(&store, &options(algorithm))?;
            assert_eq!(
                outcome.schedule.slot(1).map(crate::slot::Slot::discussions),
                first.slot(1).map(crate::slot::Slot::discussions)
            );
            outcome.schedule.check_unique()?;
        }
        Ok(())
    }

    #[test]
    fn climb_never_ends_below_the_heuristic() -> Result<(), ScheduleError> {
        let (ledger, _, _) = conference()?;
        let store = SearchStore::new(&ledger, &SlotMask::new(), 3, None, Validation::Strict)?;
        let outcome = run(&store, &options(Algorithm::Climb))?;
        assert_eq!(outcome.strategy, Strategy::Climb);
        assert!(outcome.score.score >= outcome.heuristic_score.unwrap_or_default());
        Ok(())
    }
}
