//! Reminder generation pipeline.
//!
//! Turns the calendar collaborator's event list into a classified list of
//! reminders: filter to the lookahead window, extract the client name from
//! the title, resolve it to a contact, consult the sent/dismissed logs,
//! render the message. The engine itself is stateless across runs — all
//! durable state lives in the two processed-reminder logs — and a refresh
//! mutex serializes concurrent generations so two runs cannot race the
//! logs' compaction.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use chrono::{Duration, Local, NaiveDateTime};
use serde::Serialize;

use crate::calendar::AppointmentEvent;
use crate::config::{ConfigStore, CONFIG_FILE};
use crate::contacts::{Contact, ContactDirectory};
use crate::error::ReminderError;
use crate::message;
use crate::processed_log::ProcessedReminderLog;
use crate::resolver;
use crate::settings::Settings;
use crate::title::{extract_client_name, TitlePattern, CLIENT_PLACEHOLDER};
use crate::util::format_appointment_time;

/// Log file names under the application data directory.
pub const SENT_LOG_FILE: &str = "sent_reminders.log";
pub const DISMISSED_LOG_FILE: &str = "dismissed_reminders.log";

/// Hands an outbound message to the SMS transport; implemented outside
/// the core. "Sent" means handed over, not confirmed delivered.
pub trait MessageGateway {
    fn send(&self, phone: &str, body: &str) -> Result<(), ReminderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Pending,
    Error,
    Sent,
    Dismissed,
}

/// One classified reminder row, regenerated from scratch on every refresh.
///
/// Within a single generation pass, reminders are identical when
/// `(name, phone_number, message, start_time)` coincide — overlapping
/// calendar entries for the same booking collapse to one row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub status: ReminderStatus,
    /// UI selection toggle; always constructed unselected.
    pub selected: bool,
    pub name: String,
    /// The extracted title name, when it differs from the contact's.
    pub name_in_calendar: Option<String>,
    pub phone_number: Option<String>,
    pub status_description: Option<String>,
    pub message: String,
    pub contact: Option<Contact>,
    pub start_time: NaiveDateTime,
}

impl Reminder {
    fn dedup_key(&self) -> (String, Option<String>, String, NaiveDateTime) {
        (
            self.name.clone(),
            self.phone_number.clone(),
            self.message.clone(),
            self.start_time,
        )
    }

    /// One-line display form: pending rows show recipient and message,
    /// terminal rows show their status description.
    pub fn display_line(&self) -> String {
        match self.status {
            ReminderStatus::Pending => {
                let name = match &self.name_in_calendar {
                    Some(in_calendar) => format!("{in_calendar}->{}", self.name),
                    None => self.name.clone(),
                };
                format!(
                    "[{name}, {}] {}",
                    self.phone_number.as_deref().unwrap_or(""),
                    self.message
                )
            }
            _ => self.status_description.clone().unwrap_or_default(),
        }
    }
}

pub struct ReminderEngine {
    settings: Settings,
    store: ConfigStore,
    sent_log: ProcessedReminderLog,
    dismissed_log: ProcessedReminderLog,
    refresh_lock: Mutex<()>,
}

impl ReminderEngine {
    /// Build an engine over an explicit data directory (config + logs).
    pub fn new(settings: Settings, data_dir: &Path) -> Self {
        Self {
            settings,
            store: ConfigStore::open(data_dir.join(CONFIG_FILE)),
            sent_log: ProcessedReminderLog::new(data_dir.join(SENT_LOG_FILE)),
            dismissed_log: ProcessedReminderLog::new(data_dir.join(DISMISSED_LOG_FILE)),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Build an engine over the default per-user data directory.
    pub fn open() -> Result<Self, ReminderError> {
        let data_dir = dirs::home_dir()
            .ok_or_else(|| ReminderError::Config("home directory not found".to_string()))?
            .join(".booking-reminder");
        std::fs::create_dir_all(&data_dir)
            .map_err(|e| ReminderError::persistence(&data_dir, e))?;
        Ok(Self::new(Settings::new(), &data_dir))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &ConfigStore {
        &self.store
    }

    /// Prune stale entries from both logs; run once at startup.
    pub fn compact_logs(&self) -> Result<(), ReminderError> {
        self.sent_log.record_and_compact(None)?;
        self.dismissed_log.record_and_compact(None)
    }

    /// Generate the classified reminder list for the current moment.
    ///
    /// Events must be ordered by descending start time; scanning stops at
    /// the first event already in the past. Only events starting exactly
    /// `reminder_days_ahead` days from today qualify.
    pub fn generate(
        &self,
        events: &[AppointmentEvent],
        directory: &ContactDirectory,
    ) -> Result<Vec<Reminder>, ReminderError> {
        let _guard = self.refresh_lock.lock().unwrap_or_else(|p| p.into_inner());
        self.generate_at(events, directory, Local::now().naive_local())
    }

    fn generate_at(
        &self,
        events: &[AppointmentEvent],
        directory: &ContactDirectory,
        now: NaiveDateTime,
    ) -> Result<Vec<Reminder>, ReminderError> {
        let days_ahead = self.settings.reminder_days_ahead.value(&self.store).unwrap_or(1);

        let app_added_format = self
            .settings
            .app_added_event_title
            .value(&self.store)
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| CLIENT_PLACEHOLDER.to_string());
        let event_title_format = self
            .settings
            .event_title_format
            .value(&self.store)
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| CLIENT_PLACEHOLDER.to_string());

        // App-added titles are exact strings this system wrote; the general
        // format is regex-capable to tolerate hand-entered titles.
        let patterns = [
            TitlePattern::compile(&app_added_format, false)?,
            TitlePattern::compile(&event_title_format, true)?,
        ];

        let mut seen = HashSet::new();
        let mut reminders = Vec::new();

        for event in events {
            let Some(start) = event.local_start_time() else {
                log::debug!("skipping event with unrepresentable start time: {}", event.title);
                continue;
            };

            // Descending order: everything after the first past event is
            // also in the past.
            if start < now {
                break;
            }
            if start.date() - now.date() != Duration::days(days_ahead) {
                continue;
            }

            let Some(client_name) = extract_client_name(&event.title, &patterns) else {
                continue;
            };

            let reminder = self.classify(directory, &client_name, start)?;
            if seen.insert(reminder.dedup_key()) {
                reminders.push(reminder);
            }
        }

        log::debug!("generated {} reminders", reminders.len());
        Ok(reminders)
    }

    /// Classify one extracted event into a reminder row. Precedence:
    /// dismissed log, then sent log, then phone availability.
    fn classify(
        &self,
        directory: &ContactDirectory,
        client_name: &str,
        start: NaiveDateTime,
    ) -> Result<Reminder, ReminderError> {
        let contact = resolver::resolve(directory, client_name);
        let message = message::render(&self.settings, &self.store, contact, start, None);
        let when = format_appointment_time(start);

        let (status, name, name_in_calendar, phone_number, status_description) = match contact {
            Some(contact) => {
                let name = contact.display_name.clone();
                let name_in_calendar = (client_name.to_lowercase()
                    != contact.display_name.to_lowercase())
                .then(|| client_name.to_string());
                let phone_number = contact.most_likely_number.clone();

                if self.dismissed_log.is_logged(contact, start)? {
                    (
                        ReminderStatus::Dismissed,
                        name,
                        name_in_calendar,
                        phone_number,
                        Some(format!("Reminder for {} on {when} is dismissed.", contact.display_name)),
                    )
                } else if self.sent_log.is_logged(contact, start)? {
                    (
                        ReminderStatus::Sent,
                        name,
                        name_in_calendar,
                        phone_number,
                        Some(format!("Reminder for {} on {when} already sent.", contact.display_name)),
                    )
                } else if phone_number.is_some() {
                    (ReminderStatus::Pending, name, name_in_calendar, phone_number, None)
                } else {
                    (
                        ReminderStatus::Error,
                        name,
                        name_in_calendar,
                        None,
                        Some(format!(
                            "ERROR: Unable to send message to {client_name} for an appointment on \
                             {when} since no valid mobile phone number is provided. This reminder \
                             needs to be manually handled."
                        )),
                    )
                }
            }
            None => (
                ReminderStatus::Error,
                client_name.to_string(),
                None,
                None,
                Some(format!(
                    "ERROR: Unable to find contact details for {client_name} for an appointment \
                     on {when}. This reminder needs to be manually handled."
                )),
            ),
        };

        Ok(Reminder {
            status,
            selected: false,
            name,
            name_in_calendar,
            phone_number,
            status_description,
            message,
            contact: contact.cloned(),
            start_time: start,
        })
    }

    /// Hand each selected pending reminder to the gateway and record it in
    /// the sent log. Returns the recipient names, in order.
    pub fn send_selected(
        &self,
        reminders: &[Reminder],
        gateway: &dyn MessageGateway,
    ) -> Result<Vec<String>, ReminderError> {
        let mut sent = Vec::new();
        for reminder in Self::selected_pending(reminders) {
            let (Some(contact), Some(phone)) = (&reminder.contact, &reminder.phone_number) else {
                continue;
            };
            gateway.send(phone, &reminder.message)?;
            self.sent_log.record_and_compact(Some((contact, reminder.start_time)))?;
            log::info!("reminder sent to {} for {}", reminder.name, reminder.start_time);
            sent.push(reminder.name.clone());
        }
        Ok(sent)
    }

    /// Record each selected pending reminder in the dismissed log.
    /// Returns how many were dismissed.
    pub fn dismiss_selected(&self, reminders: &[Reminder]) -> Result<usize, ReminderError> {
        let mut dismissed = 0;
        for reminder in Self::selected_pending(reminders) {
            let Some(contact) = &reminder.contact else {
                continue;
            };
            self.dismissed_log.record_and_compact(Some((contact, reminder.start_time)))?;
            dismissed += 1;
        }
        Ok(dismissed)
    }

    fn selected_pending(reminders: &[Reminder]) -> impl Iterator<Item = &Reminder> {
        reminders
            .iter()
            .filter(|r| r.selected && r.status == ReminderStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct RecordingGateway {
        sent: std::sync::Mutex<Vec<(String, String)>>,
    }

    impl RecordingGateway {
        fn new() -> Self {
            Self {
                sent: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    impl MessageGateway for RecordingGateway {
        fn send(&self, phone: &str, body: &str) -> Result<(), ReminderError> {
            self.sent.lock().unwrap().push((phone.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn engine_in(dir: &tempfile::TempDir) -> ReminderEngine {
        let engine = ReminderEngine::new(Settings::new(), dir.path());
        engine.config().set("consultant_name", "Dana Lee").unwrap();
        engine.config().set("organization_name", "Riverside Physio").unwrap();
        engine.config().set("organization_phone", "0400999888").unwrap();
        engine
    }

    fn directory() -> ContactDirectory {
        ContactDirectory::from_contacts([
            Contact::with_number("Amy Tan", "0411111111"),
            Contact::with_number("Jane Doe", "0422222222"),
            Contact::new("Sam No-Phone"),
        ])
    }

    /// An event starting `days` from now at the given hour, titled with
    /// the default app-added format.
    fn event(name: &str, days: i64, hour: u32) -> AppointmentEvent {
        let start = (Local::now() + Duration::days(days))
            .date_naive()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        let ms = Local
            .from_local_datetime(&start)
            .single()
            .unwrap()
            .timestamp_millis();
        AppointmentEvent::new(format!("{name} booking"), ms)
    }

    #[test]
    fn test_end_to_end_pending_reminder() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(&dir);

        let reminders = engine.generate(&[event("Amy Tan", 1, 10)], &directory()).unwrap();
        assert_eq!(reminders.len(), 1);
        let reminder = &reminders[0];
        assert_eq!(reminder.status, ReminderStatus::Pending);
        assert_eq!(reminder.name, "Amy Tan");
        assert_eq!(reminder.phone_number.as_deref(), Some("0411111111"));
        assert!(reminder.name_in_calendar.is_none());
        assert!(reminder.message.contains("10:00am"));
        assert!(reminder.message.contains("Dana Lee"));
    }

    #[test]
    fn test_window_is_exact_equality() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(&dir);

        let events = [
            event("Amy Tan", 3, 10),
            event("Amy Tan", 2, 10),
            event("Jane Doe", 1, 10),
        ];
        let reminders = engine.generate(&events, &directory()).unwrap();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].name, "Jane Doe");
    }

    #[test]
    fn test_scan_stops_at_first_past_event() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(&dir);

        // Descending by start time; the malformed tail after the past
        // event is never reached.
        let events = [
            event("Amy Tan", 1, 23),
            event("Jane Doe", -1, 10),
            event("Jane Doe", 1, 9),
        ];
        let reminders = engine.generate(&events, &directory()).unwrap();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].name, "Amy Tan");
    }

    #[test]
    fn test_duplicate_events_collapse() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(&dir);

        let events = [event("Amy Tan", 1, 10), event("Amy Tan", 1, 10)];
        let reminders = engine.generate(&events, &directory()).unwrap();
        assert_eq!(reminders.len(), 1);
    }

    #[test]
    fn test_unmatched_title_is_skipped_and_others_continue() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(&dir);

        // "4pm" is not a valid name unit, so neither title format matches.
        let events = [
            event("Amy Tan", 1, 11),
            AppointmentEvent::new("staff meeting 4pm", event("x", 1, 10).start_epoch_ms),
        ];
        let reminders = engine.generate(&events, &directory()).unwrap();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].name, "Amy Tan");
    }

    #[test]
    fn test_unresolved_contact_is_error_row() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(&dir);

        let events = [event("Nobody Known", 1, 10), event("Amy Tan", 1, 9)];
        let reminders = engine.generate(&events, &directory()).unwrap();
        assert_eq!(reminders.len(), 2);

        let error = reminders.iter().find(|r| r.name == "Nobody Known").unwrap();
        assert_eq!(error.status, ReminderStatus::Error);
        assert!(error
            .status_description
            .as_deref()
            .unwrap()
            .contains("Unable to find contact details"));
        // Error rows still carry the would-be message.
        assert!(!error.message.is_empty());
    }

    #[test]
    fn test_contact_without_number_is_error_row() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(&dir);

        let reminders = engine
            .generate(&[event("Sam No-Phone", 1, 10)], &directory())
            .unwrap();
        assert_eq!(reminders[0].status, ReminderStatus::Error);
        assert!(reminders[0]
            .status_description
            .as_deref()
            .unwrap()
            .contains("no valid mobile phone number"));
    }

    #[test]
    fn test_send_records_and_reclassifies_as_sent() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(&dir);
        let gateway = RecordingGateway::new();
        let events = [event("Amy Tan", 1, 10)];

        let mut reminders = engine.generate(&events, &directory()).unwrap();
        reminders[0].selected = true;
        let sent = engine.send_selected(&reminders, &gateway).unwrap();
        assert_eq!(sent, vec!["Amy Tan".to_string()]);
        assert_eq!(gateway.sent.lock().unwrap().len(), 1);
        assert_eq!(gateway.sent.lock().unwrap()[0].0, "0411111111");

        let regenerated = engine.generate(&events, &directory()).unwrap();
        assert_eq!(regenerated[0].status, ReminderStatus::Sent);
    }

    #[test]
    fn test_dismissed_wins_over_sent() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(&dir);
        let gateway = RecordingGateway::new();
        let events = [event("Amy Tan", 1, 10)];

        let mut reminders = engine.generate(&events, &directory()).unwrap();
        reminders[0].selected = true;
        engine.send_selected(&reminders, &gateway).unwrap();
        engine.dismiss_selected(&reminders).unwrap();

        let regenerated = engine.generate(&events, &directory()).unwrap();
        assert_eq!(regenerated[0].status, ReminderStatus::Dismissed);
    }

    #[test]
    fn test_only_selected_pending_rows_are_sent() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(&dir);
        let gateway = RecordingGateway::new();

        let events = [event("Amy Tan", 1, 10), event("Jane Doe", 1, 9)];
        let reminders = engine.generate(&events, &directory()).unwrap();
        // Nothing selected: nothing sent.
        let sent = engine.send_selected(&reminders, &gateway).unwrap();
        assert!(sent.is_empty());
        assert!(gateway.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_name_in_calendar_set_when_names_differ() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(&dir);

        // "Doe Jane" resolves to "Jane Doe" via the token-set rule.
        let start_ms = event("x", 1, 10).start_epoch_ms;
        let events = [AppointmentEvent::new("Doe Jane booking", start_ms)];
        let reminders = engine.generate(&events, &directory()).unwrap();
        assert_eq!(reminders[0].name, "Jane Doe");
        assert_eq!(reminders[0].name_in_calendar.as_deref(), Some("Doe Jane"));
        assert!(reminders[0].display_line().starts_with("[Doe Jane->Jane Doe,"));
    }

    #[test]
    fn test_compact_logs_is_callable_at_startup() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(&dir);
        engine.compact_logs().unwrap();
    }
}
