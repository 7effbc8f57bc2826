use chrono::{DateTime, Utc};

use crate::Level;

/// A fully built log record, ready to be rendered by a sink.
#[derive(Debug, Clone)]
pub struct Record {
    pub level: Level,
    pub name: Option<String>,
    pub message: String,
    pub time: DateTime<Utc>,
}

impl Record {
    /// Creates a record stamped with the current time.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            name: None,
            message: message.into(),
            time: Utc::now(),
        }
    }

    /// Sets the logger name
    pub fn with_name(self, name: &str) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    /// Overrides the timestamp.
    pub fn with_time(self, time: DateTime<Utc>) -> Self {
        Self { time, ..self }
    }
}

impl From<&log::Record<'_>> for Record {
    fn from(record: &log::Record<'_>) -> Self {
        Record::new(record.level().into(), record.args().to_string()).with_name(record.target())
    }
}
