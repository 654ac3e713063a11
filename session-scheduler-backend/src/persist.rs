use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::PathBuf;

use session_scheduler_engine::Timetable;
use tracing::debug;

use crate::error::AppError;

/// Called with the new timetable after every successful commit.
pub trait Persist: Send + Sync {
    fn persist(&self, timetable: &Timetable) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoPersist;

impl Persist for NoPersist {
    fn persist(&self, _timetable: &Timetable) -> Result<(), AppError> {
        Ok(())
    }
}

/// Writes the timetable as pretty printed json, replacing the file.
#[derive(Debug, Clone)]
pub struct JsonFilePersist {
    path: PathBuf,
}

impl JsonFilePersist {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Persist for JsonFilePersist {
    fn persist(&self, timetable: &Timetable) -> Result<(), AppError> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, timetable)?;
        writer.flush()?;
        debug!(path = %self.path.display(), "persisted timetable");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use session_scheduler_engine::{Day, Location, Timetable, TimetableSlot};

    use super::{JsonFilePersist, Persist};
    use crate::error::AppError;

    #[test]
    fn writes_json() -> Result<(), AppError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("timetable.json");
        let timetable = Timetable::new(
            vec![Day::new("Sunday", vec![TimetableSlot::new("10:00", false)])],
            vec![Location {
                name: "Garden".to_owned(),
                capacity: 0,
                is_place: false,
            }],
        );
        JsonFilePersist::new(&path).persist(&timetable)?;

        let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(written["days"][0]["name"], "Sunday");
        assert_eq!(written["locations"][0]["is_place"], false);
        Ok(())
    }

    #[test]
    fn missing_directory_is_an_error() {
        let persist = JsonFilePersist::new("/nonexistent/dir/timetable.json");
        assert!(matches!(
            persist.persist(&Timetable::default()),
            Err(AppError::File(_))
        ));
    }
}
