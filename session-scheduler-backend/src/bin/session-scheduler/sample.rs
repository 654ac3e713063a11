// a small event to run the scheduler against until there is a real frontend

use session_scheduler_backend::{AppError, Scheduler};
use session_scheduler_engine::SlotMask;

const PEOPLE: [&str; 8] = [
    "Alice", "Bob", "Carol", "Dave", "Erin", "Frank", "Grace", "Heidi",
];

// (owner, title, moderated)
const DISCUSSIONS: [(usize, &str, bool); 7] = [
    (0, "Borrow checker war stories", false),
    (1, "Async in production", false),
    (2, "Writing parsers by hand", false),
    (3, "Embedded without an allocator", false),
    (4, "Property testing", false),
    (5, "Build times", false),
    (6, "Unconference retro", true),
];

// (person, discussion, interest)
const INTERESTS: [(usize, usize, i32); 22] = [
    (0, 0, 100),
    (0, 1, 60),
    (0, 4, 30),
    (1, 1, 100),
    (1, 5, 80),
    (2, 2, 90),
    (2, 0, 40),
    (2, 3, 20),
    (3, 3, 100),
    (3, 2, 70),
    (4, 4, 100),
    (4, 0, 50),
    (5, 5, 90),
    (5, 1, 90),
    (6, 0, 70),
    (6, 2, 70),
    (6, 4, 10),
    (7, 3, 40),
    (7, 5, 60),
    (7, 1, 30),
    (0, 6, 50),
    (7, 6, 80),
];

pub fn seed(scheduler: &Scheduler) -> Result<(), AppError> {
    let people = PEOPLE
        .iter()
        .map(|name| scheduler.add_user(*name))
        .collect::<Result<Vec<_>, _>>()?;
    let discussions = DISCUSSIONS
        .iter()
        .map(|(owner, title, moderated)| {
            scheduler.add_discussion(people[*owner], *title, !*moderated)
        })
        .collect::<Result<Vec<_>, _>>()?;
    for (person, discussion, interest) in INTERESTS {
        scheduler.set_interest(people[person], discussions[discussion], interest)?;
    }
    // the retro has to happen on the last afternoon
    scheduler.set_possible_slots(discussions[6], [5].into_iter().collect::<SlotMask>())?;
    scheduler.set_public(discussions[6], true)?;
    Ok(())
}
