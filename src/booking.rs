//! New-booking flow: create a titled event on the business calendar.
//!
//! Events written here carry the app-added title format, which is exactly
//! what the extractor matches first on the next generation pass.

use chrono::{Local, NaiveDateTime, TimeZone};

use crate::calendar::CalendarWriter;
use crate::config::ConfigStore;
use crate::error::ReminderError;
use crate::settings::Settings;
use crate::title::CLIENT_PLACEHOLDER;

/// Title for a booking created by this system.
pub fn generate_event_title(settings: &Settings, store: &ConfigStore, client: &str) -> String {
    let format = settings
        .app_added_event_title
        .value(store)
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| CLIENT_PLACEHOLDER.to_string());
    format.replace(CLIENT_PLACEHOLDER, client)
}

/// Hand a new booking to the calendar-write collaborator.
pub fn add_booking(
    writer: &dyn CalendarWriter,
    settings: &Settings,
    store: &ConfigStore,
    client: &str,
    start: NaiveDateTime,
    duration_mins: i64,
) -> Result<(), ReminderError> {
    let title = generate_event_title(settings, store, client);
    let start_ms = Local
        .from_local_datetime(&start)
        .single()
        .ok_or_else(|| {
            ReminderError::Config(format!("booking start time is not a valid local time: {start}"))
        })?
        .timestamp_millis();
    let end_ms = start_ms + duration_mins * 60 * 1000;

    log::info!("adding booking for {client} at {start}");
    writer.add_event(&title, start_ms, end_ms)
}
