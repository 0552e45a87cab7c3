//! Calendar collaborator surface.

use chrono::{Local, NaiveDateTime, TimeZone};
use serde::Serialize;

use crate::error::ReminderError;

/// A raw calendar event as supplied by the calendar collaborator,
/// pre-filtered to the configured calendar and ordered by descending
/// start time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentEvent {
    pub title: String,
    pub start_epoch_ms: i64,
}

impl AppointmentEvent {
    pub fn new(title: impl Into<String>, start_epoch_ms: i64) -> Self {
        Self {
            title: title.into(),
            start_epoch_ms,
        }
    }

    /// The event start as local wall-clock time. None when the timestamp
    /// is unrepresentable in the local timezone.
    pub fn local_start_time(&self) -> Option<NaiveDateTime> {
        Local
            .timestamp_millis_opt(self.start_epoch_ms)
            .single()
            .map(|dt| dt.naive_local())
    }
}

/// Supplies upcoming events; implemented outside the core.
pub trait CalendarSource {
    fn events(&self) -> Result<Vec<AppointmentEvent>, ReminderError>;
}

/// Writes new events to the business calendar; implemented outside the core.
pub trait CalendarWriter {
    fn add_event(
        &self,
        title: &str,
        start_epoch_ms: i64,
        end_epoch_ms: i64,
    ) -> Result<(), ReminderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_local_start_time_round_trips() {
        let now = Local::now();
        let event = AppointmentEvent::new("Amy Tan booking", now.timestamp_millis());
        let start = event.local_start_time().unwrap();
        assert_eq!(start.hour(), now.naive_local().hour());
        assert_eq!(start.date(), now.date_naive());
    }
}
