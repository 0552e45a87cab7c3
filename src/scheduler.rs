//! Daily reminder check task.
//!
//! A dedicated background task sleeps until the configured notification
//! time, runs one generation pass, then reschedules itself from the clock
//! — a slow run pushes the next run later instead of compounding drift.
//! Shutdown is cooperative: signal the task and it stops after the
//! current iteration.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::calendar::CalendarSource;
use crate::contacts::{ContactDirectory, ContactSource};
use crate::engine::{Reminder, ReminderEngine};
use crate::error::ReminderError;

/// Fallback check time when the setting is unset and has no default.
const FALLBACK_CHECK_TIME: (u32, u32) = (17, 30);

/// Receives the generated reminder list when a daily check finds work;
/// implemented outside the core (OS notification, console, test probe).
pub trait ReminderNotifier: Send + Sync {
    fn notify(&self, reminders: &[Reminder]);
}

/// Time until the next occurrence of `notify_at`, wrapping past midnight.
/// A check due exactly now is scheduled for tomorrow.
pub fn next_check_delay(now: NaiveTime, notify_at: NaiveTime) -> Duration {
    let until = notify_at.signed_duration_since(now);
    let until = if until > chrono::Duration::zero() {
        until
    } else {
        until + chrono::Duration::days(1)
    };
    until.to_std().unwrap_or_default()
}

pub struct DailyChecker {
    engine: Arc<ReminderEngine>,
    calendar: Arc<dyn CalendarSource + Send + Sync>,
    contacts: Arc<dyn ContactSource + Send + Sync>,
    notifier: Arc<dyn ReminderNotifier>,
}

impl DailyChecker {
    pub fn new(
        engine: Arc<ReminderEngine>,
        calendar: Arc<dyn CalendarSource + Send + Sync>,
        contacts: Arc<dyn ContactSource + Send + Sync>,
        notifier: Arc<dyn ReminderNotifier>,
    ) -> Self {
        Self {
            engine,
            calendar,
            contacts,
            notifier,
        }
    }

    /// Start the check loop. Returns the task handle and a shutdown
    /// sender; send `true` to stop the loop after its current iteration.
    pub fn spawn(self) -> (JoinHandle<()>, watch::Sender<bool>) {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            loop {
                let delay = self.delay_until_next_check();
                log::debug!("next daily reminder check in {}s", delay.as_secs());

                tokio::select! {
                    _ = tokio::time::sleep(delay) => self.run_check_once(),
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            log::info!("daily reminder checker stopped");
        });

        (handle, shutdown_tx)
    }

    fn delay_until_next_check(&self) -> Duration {
        let notify_at = self
            .engine
            .settings()
            .daily_notification_time
            .value(self.engine.config())
            .or_else(|| NaiveTime::from_hms_opt(FALLBACK_CHECK_TIME.0, FALLBACK_CHECK_TIME.1, 0))
            .unwrap_or_default();
        next_check_delay(Local::now().time(), notify_at)
    }

    /// One check iteration; failures are logged and the loop keeps going.
    fn run_check_once(&self) {
        match self.check() {
            Ok(count) => log::info!("daily reminder check produced {count} reminders"),
            Err(e) => log::warn!("daily reminder check failed: {e}"),
        }
    }

    fn check(&self) -> Result<usize, ReminderError> {
        let mut directory = ContactDirectory::new();
        directory.refresh(self.contacts.as_ref())?;

        let events = self.calendar.events()?;
        let reminders = self.engine.generate(&events, &directory)?;
        if !reminders.is_empty() {
            self.notifier.notify(&reminders);
        }
        Ok(reminders.len())
    }
}
