use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Remote endpoints the run observes or calls.
pub mod endpoints {
    pub const SIGN_IN: &str = "https://factorialhr.com/users/sign_in";
    pub const CLOCK_IN_VIEW: &str = "https://app.factorialhr.com/attendance/clock-in";
    /// Outbound requests under this prefix carry the period id as their last path segment.
    pub const PERIODS_PREFIX: &str = "https://api.factorialhr.com/attendance/periods/";
    pub const TEAMS_PREFIX: &str = "https://api.factorialhr.com/teams";
    pub const SHIFTS: &str = "https://api.factorialhr.com/attendance/shifts";
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time '{0}', expected HH:MM")]
pub struct ClockTimeError(pub String);

/// A validated time of day in `HH:MM` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    hour: u8,
    minute: u8,
}

impl ClockTime {
    pub const DEFAULT_CLOCK_IN: ClockTime = ClockTime { hour: 10, minute: 0 };
    pub const DEFAULT_CLOCK_OUT: ClockTime = ClockTime { hour: 18, minute: 0 };

    pub fn new(hour: u8, minute: u8) -> Result<Self, ClockTimeError> {
        if hour > 23 || minute > 59 {
            return Err(ClockTimeError(format!("{hour}:{minute}")));
        }
        Ok(Self { hour, minute })
    }
}

impl FromStr for ClockTime {
    type Err = ClockTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ClockTimeError(s.to_string());
        let (h, m) = s.split_once(':').ok_or_else(err)?;
        if m.contains(':') {
            return Err(err());
        }
        let hour: u8 = h.trim().parse().map_err(|_| err())?;
        let minute: u8 = m.trim().parse().map_err(|_| err())?;
        Self::new(hour, minute).map_err(|_| err())
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The month whose attendance table is scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetMonth {
    pub year: i32,
    pub month: u32,
}

impl TargetMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn current() -> Self {
        let today = Local::now().date_naive();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn clock_in_url(&self) -> String {
        format!("{}/{}/{}", endpoints::CLOCK_IN_VIEW, self.year, self.month)
    }
}

impl fmt::Display for TargetMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}
