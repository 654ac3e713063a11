use core::fmt::{Debug, Display};

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmConfig {
    #[default]
    Combined,
    Heuristic,
    Random,
    Climb,
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValidationConfig {
    #[default]
    Production,
    Strict,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct SearchConfig {
    pub algorithm: AlgorithmConfig,
    pub validation: ValidationConfig,
    pub duration_ms: u64,
    pub seed: Option<u64>,
    pub mutation_max: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmConfig::default(),
            validation: ValidationConfig::default(),
            duration_ms: 5000,
            seed: None,
            mutation_max: 4,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SlotConfig {
    pub time: String,
    #[serde(default)]
    pub is_break: bool,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DayConfig {
    pub name: String,
    pub slots: Vec<SlotConfig>,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TimetableConfig {
    pub days: Vec<DayConfig>,
}

impl Default for TimetableConfig {
    fn default() -> Self {
        let day = |name: &str| DayConfig {
            name: name.to_owned(),
            slots: [("09:00", false), ("10:30", false), ("12:00", true), ("13:30", false)]
                .into_iter()
                .map(|(time, is_break)| SlotConfig {
                    time: time.to_owned(),
                    is_break,
                })
                .collect(),
        };
        Self {
            days: vec![day("Monday"), day("Tuesday")],
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LocationConfig {
    pub name: String,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default = "default_is_place")]
    pub is_place: bool,
}

const fn default_is_place() -> bool {
    true
}

fn default_locations() -> Vec<LocationConfig> {
    [("Main hall", 200, true), ("Room 1", 60, true), ("Room 2", 40, true), ("Hallway", 0, false)]
        .into_iter()
        .map(|(name, capacity, is_place)| LocationConfig {
            name: name.to_owned(),
            capacity,
            is_place,
        })
        .collect()
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub timetable: TimetableConfig,
    #[serde(default = "default_locations")]
    pub locations: Vec<LocationConfig>,
    #[serde(default)]
    pub persist_path: Option<String>,
}

#[derive(thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Figment(#[from] figment::Error),
}

impl Debug for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// `scheduler.toml` overridden by `SCHED_` environment variables, nested keys separated by `__`.
#[must_use]
pub fn figment() -> Figment {
    Figment::new()
        .merge(Toml::file("scheduler.toml"))
        .merge(Env::prefixed("SCHED_").split("__"))
}

pub fn get_config() -> Result<Config, ConfigError> {
    Ok(figment().extract()?)
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::{figment, AlgorithmConfig, Config, ValidationConfig};

    #[test]
    fn empty_config_has_defaults() {
        Jail::expect_with(|_jail| {
            let config: Config = figment().extract()?;
            assert_eq!(config.search.algorithm, AlgorithmConfig::Combined);
            assert_eq!(config.timetable.days.len(), 2);
            assert_eq!(config.locations.last().map(|l| l.is_place), Some(false));
            assert_eq!(config.persist_path, None);
            Ok(())
        });
    }

    #[test]
    fn file_and_env_are_merged() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "scheduler.toml",
                r#"
                [search]
                algorithm = "heuristic"
                duration_ms = 100

                [[timetable.days]]
                name = "Saturday"
                slots = [{ time = "10:00" }, { time = "12:00", is_break = true }]

                [[locations]]
                name = "Lobby"
                is_place = false
                "#,
            )?;
            jail.set_env("SCHED_SEARCH__VALIDATION", "strict");
            jail.set_env("SCHED_SEARCH__SEED", "42");

            let config: Config = figment().extract()?;
            assert_eq!(config.search.algorithm, AlgorithmConfig::Heuristic);
            assert_eq!(config.search.validation, ValidationConfig::Strict);
            assert_eq!(config.search.duration_ms, 100);
            assert_eq!(config.search.seed, Some(42));
            assert_eq!(config.timetable.days[0].slots.len(), 2);
            assert!(config.timetable.days[0].slots[1].is_break);
            assert_eq!(config.locations.len(), 1);
            Ok(())
        });
    }
}
