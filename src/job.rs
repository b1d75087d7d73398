use std::fmt;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};

/// Unique identifier for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Minute-resolution timestamp ("YYYY-MM-DDTHH:MM") marking the most recent
/// dispatch decision for a job. Two decisions within the same calendar minute
/// produce the same key, which is what the matcher deduplicates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinuteKey(String);

impl MinuteKey {
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self(now.format("%Y-%m-%dT%H:%M").to_string())
    }
}

impl fmt::Display for MinuteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Recurrence rule for a job. Each variant carries exactly the fields its
/// type requires, so a stored schedule is valid by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Schedule {
    Hourly {
        minute: u32,
    },
    Daily {
        hour: u32,
        minute: u32,
    },
    Weekly {
        #[serde(rename = "dayOfWeek")]
        day_of_week: u32,
        hour: u32,
        minute: u32,
    },
}

/// A registered recurring job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(flatten)]
    pub schedule: Schedule,
    #[serde(rename = "lastRun")]
    pub last_run: Option<MinuteKey>,
}

impl Job {
    pub fn new(id: JobId, schedule: Schedule) -> Self {
        Self {
            id,
            schedule,
            last_run: None,
        }
    }
}

/// Error type for rejected job specifications
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error(r#"type must be "hourly", "daily", or "weekly""#)]
    UnknownType,

    #[error("For hourly jobs, minute must be 0–59")]
    HourlyFields,

    #[error("For daily jobs, hour 0–23 and minute 0–59 are required")]
    DailyFields,

    #[error("For weekly jobs, dayOfWeek 0–6 (0=Sunday), hour 0–23, minute 0–59 are required")]
    WeeklyFields,
}

/// Raw job specification as received from a client.
///
/// All fields are optional at the wire level, and a field of the wrong JSON
/// type deserializes to `None` rather than failing the request body parse,
/// so `validate()` answers with the type-specific message either way.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobSpec {
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub minute: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub hour: Option<i64>,
    #[serde(rename = "dayOfWeek", default, deserialize_with = "lenient_int")]
    pub day_of_week: Option<i64>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_owned))
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_i64())
}

impl JobSpec {
    pub fn validate(&self) -> Result<Schedule, ValidationError> {
        fn in_range(value: Option<i64>, max: i64) -> Option<u32> {
            value.filter(|v| (0..=max).contains(v)).map(|v| v as u32)
        }

        match self.kind.as_deref() {
            Some("hourly") => {
                let minute = in_range(self.minute, 59).ok_or(ValidationError::HourlyFields)?;
                Ok(Schedule::Hourly { minute })
            }
            Some("daily") => {
                let hour = in_range(self.hour, 23).ok_or(ValidationError::DailyFields)?;
                let minute = in_range(self.minute, 59).ok_or(ValidationError::DailyFields)?;
                Ok(Schedule::Daily { hour, minute })
            }
            Some("weekly") => {
                let day_of_week =
                    in_range(self.day_of_week, 6).ok_or(ValidationError::WeeklyFields)?;
                let hour = in_range(self.hour, 23).ok_or(ValidationError::WeeklyFields)?;
                let minute = in_range(self.minute, 59).ok_or(ValidationError::WeeklyFields)?;
                Ok(Schedule::Weekly {
                    day_of_week,
                    hour,
                    minute,
                })
            }
            _ => Err(ValidationError::UnknownType),
        }
    }
}
