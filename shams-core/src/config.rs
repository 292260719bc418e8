use std::env;

use thiserror::Error;

use crate::ParseKindError;

/// How mess capacity is treated when applications are approved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessCapacityMode {
    /// Capacity is only displayed, approvals never check it
    #[default]
    Advisory,
    /// Approvals fail once the approved applications reach capacity
    Enforced,
}

impl std::str::FromStr for MessCapacityMode {
    type Err = ParseKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "advisory" => Ok(Self::Advisory),
            "enforced" => Ok(Self::Enforced),
            other => Err(ParseKindError {
                kind: "MessCapacityMode",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{variable} is invalid: {reason}")]
    Invalid {
        variable: &'static str,
        reason: String,
    },
}

/// Policy knobs of the allocation workflow
#[derive(Debug, Clone)]
pub struct Config {
    pub mess_capacity: MessCapacityMode,
    /// How long a login session stays valid
    pub session_duration_in_days: i64,
}

impl Config {
    pub const MESS_CAPACITY_VAR: &'static str = "SHAMS_MESS_CAPACITY";
    pub const SESSION_DAYS_VAR: &'static str = "SHAMS_SESSION_DAYS";
    /// Ten years, well inside what a session expiry timestamp can hold
    pub const MAX_SESSION_DAYS: i64 = 3650;

    /// Reads the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration from any variable source, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let mess_capacity = match lookup(Self::MESS_CAPACITY_VAR) {
            Some(value) => value.trim().parse::<MessCapacityMode>().map_err(|e| {
                ConfigError::Invalid {
                    variable: Self::MESS_CAPACITY_VAR,
                    reason: e.to_string(),
                }
            })?,
            None => defaults.mess_capacity,
        };

        let session_duration_in_days = match lookup(Self::SESSION_DAYS_VAR) {
            Some(value) => value
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|days| (1..=Self::MAX_SESSION_DAYS).contains(days))
                .ok_or_else(|| ConfigError::Invalid {
                    variable: Self::SESSION_DAYS_VAR,
                    reason: format!(
                        "{value:?} is not a number of days between 1 and {}",
                        Self::MAX_SESSION_DAYS
                    ),
                })?,
            None => defaults.session_duration_in_days,
        };

        Ok(Self {
            mess_capacity,
            session_duration_in_days,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mess_capacity: MessCapacityMode::Advisory,
            session_duration_in_days: 7,
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::{Config, ConfigError, MessCapacityMode};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_to_advisory_mess_capacity() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.mess_capacity, MessCapacityMode::Advisory);
        assert_eq!(config.session_duration_in_days, 7);
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("SHAMS_MESS_CAPACITY", "enforced"),
            ("SHAMS_SESSION_DAYS", "30"),
        ]))
        .unwrap();

        assert_eq!(config.mess_capacity, MessCapacityMode::Enforced);
        assert_eq!(config.session_duration_in_days, 30);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Config::from_lookup(lookup(&[("SHAMS_MESS_CAPACITY", "maybe")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SHAMS_SESSION_DAYS", "-1")])).is_err());
    }

    #[test]
    fn session_days_are_capped() {
        let longest = Config::from_lookup(lookup(&[("SHAMS_SESSION_DAYS", "3650")])).unwrap();
        assert_eq!(longest.session_duration_in_days, Config::MAX_SESSION_DAYS);

        for days in ["3651", "9223372036854775807"] {
            let result = Config::from_lookup(lookup(&[("SHAMS_SESSION_DAYS", days)]));
            assert!(
                matches!(result, Err(ConfigError::Invalid { variable: "SHAMS_SESSION_DAYS", .. })),
                "{days} was accepted"
            );
        }
    }
}
