//! The scheduling service: live data behind one lock, out-of-line search runs, commit and
//! persistence of the resulting timetable.

pub mod config;
pub mod error;
pub mod persist;
pub mod service;
pub mod telemetry;

pub use error::AppError;
pub use persist::{JsonFilePersist, NoPersist, Persist};
pub use service::{RunReport, Scheduler};
