use core::time::Duration;

use itertools::Itertools;
use session_scheduler_config::{AlgorithmConfig, Config, SearchConfig, ValidationConfig};
use session_scheduler_engine::{
    Algorithm, Day, Location, SearchOptions, Timetable, TimetableSlot, Validation,
};

#[must_use]
pub fn timetable_from_config(config: &Config) -> Timetable {
    let days = config
        .timetable
        .days
        .iter()
        .map(|day| {
            Day::new(
                day.name.clone(),
                day.slots
                    .iter()
                    .map(|slot| TimetableSlot::new(slot.time.clone(), slot.is_break))
                    .collect_vec(),
            )
        })
        .collect_vec();
    let locations = config
        .locations
        .iter()
        .map(|location| Location {
            name: location.name.clone(),
            capacity: location.capacity,
            is_place: location.is_place,
        })
        .collect_vec();
    Timetable::new(days, locations)
}

#[must_use]
pub const fn search_options(config: &SearchConfig) -> SearchOptions {
    SearchOptions {
        algorithm: match config.algorithm {
            AlgorithmConfig::Combined => Algorithm::Combined,
            AlgorithmConfig::Heuristic => Algorithm::Heuristic,
            AlgorithmConfig::Random => Algorithm::Random,
            AlgorithmConfig::Climb => Algorithm::Climb,
        },
        validation: match config.validation {
            ValidationConfig::Production => Validation::Production,
            ValidationConfig::Strict => Validation::Strict,
        },
        duration: Duration::from_millis(config.duration_ms),
        seed: config.seed,
        mutation_max: config.mutation_max,
    }
}

#[cfg(test)]
mod tests {
    use session_scheduler_config::{
        AlgorithmConfig, Config, DayConfig, LocationConfig, SearchConfig, SlotConfig,
        TimetableConfig,
    };
    use session_scheduler_engine::Algorithm;

    use super::{search_options, timetable_from_config};

    #[test]
    fn builds_timetable() {
        let config = Config {
            search: SearchConfig::default(),
            timetable: TimetableConfig {
                days: vec![DayConfig {
                    name: "Saturday".to_owned(),
                    slots: vec![
                        SlotConfig {
                            time: "10:00".to_owned(),
                            is_break: false,
                        },
                        SlotConfig {
                            time: "11:00".to_owned(),
                            is_break: true,
                        },
                        SlotConfig {
                            time: "12:00".to_owned(),
                            is_break: false,
                        },
                    ],
                }],
            },
            locations: vec![LocationConfig {
                name: "Lobby".to_owned(),
                capacity: 0,
                is_place: false,
            }],
            persist_path: None,
        };
        let timetable = timetable_from_config(&config);
        assert_eq!(timetable.slot_count(), 2);
        assert_eq!(timetable.days()[0].slots[1].time, "11:00");
        assert_eq!(timetable.locations()[0].name, "Lobby");
    }

    #[test]
    fn maps_search_options() {
        let options = search_options(&SearchConfig {
            algorithm: AlgorithmConfig::Climb,
            duration_ms: 250,
            seed: Some(7),
            ..SearchConfig::default()
        });
        assert_eq!(options.algorithm, Algorithm::Climb);
        assert_eq!(options.duration.as_millis(), 250);
        assert_eq!(options.seed, Some(7));
    }
}
