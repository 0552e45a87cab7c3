//! Durable log of reminders already sent or dismissed.
//!
//! One line per entry, `{phone}|{local ISO timestamp}`. Lookups go through
//! an in-memory index built lazily from the file; every write re-reads the
//! file, drops entries whose appointments are past for reminding, appends
//! the new entry if it is not already present, and rewrites the file, so
//! the log never grows unbounded. A single mutex per log instance covers
//! cache rebuild and writes; the "sent" and "dismissed" logs are separate
//! instances over disjoint files and never serialize against each other.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};

use crate::contacts::Contact;
use crate::error::ReminderError;
use crate::util::atomic_write_str;

/// Timestamp format for log lines.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Default)]
struct LogState {
    /// phone number -> appointment start times. None means stale.
    cache: Option<HashMap<String, Vec<NaiveDateTime>>>,
}

pub struct ProcessedReminderLog {
    path: PathBuf,
    state: Mutex<LogState>,
}

impl ProcessedReminderLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(LogState::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// An appointment is past for reminding when its date is earlier than
    /// tomorrow; such entries can never match a generated reminder again
    /// and are dropped on the next write.
    pub fn is_date_past_for_reminding(start: NaiveDateTime, today: NaiveDate) -> bool {
        start.date() - today < Duration::days(1)
    }

    /// Whether this exact (phone, start time) pair has been recorded.
    /// A contact without a usable number is never logged.
    pub fn is_logged(
        &self,
        contact: &Contact,
        start_time: NaiveDateTime,
    ) -> Result<bool, ReminderError> {
        let number = match contact.most_likely_number.as_deref() {
            Some(n) if !n.trim().is_empty() => n,
            _ => return Ok(false),
        };

        // A poisoned lock is safe to reuse: the cache is rebuilt from disk.
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if state.cache.is_none() {
            let mut cache: HashMap<String, Vec<NaiveDateTime>> = HashMap::new();
            for (phone, start) in self.read_entries()? {
                cache.entry(phone).or_default().push(start);
            }
            state.cache = Some(cache);
        }

        Ok(state
            .cache
            .as_ref()
            .and_then(|cache| cache.get(number))
            .map(|starts| starts.contains(&start_time))
            .unwrap_or(false))
    }

    /// Compact the log and optionally record a new entry.
    ///
    /// Re-reads the file, keeps only entries still relevant for reminding,
    /// appends the new entry unless an identical line is already retained,
    /// and rewrites the file. Passing None compacts without recording
    /// (startup pruning). Recording the same entry twice is a no-op.
    pub fn record_and_compact(
        &self,
        new_entry: Option<(&Contact, NaiveDateTime)>,
    ) -> Result<(), ReminderError> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        let today = Local::now().date_naive();

        let new_pair = new_entry.and_then(|(contact, start)| {
            contact
                .most_likely_number
                .as_deref()
                .filter(|n| !n.trim().is_empty())
                .map(|n| (n.to_string(), start))
        });

        let mut retained: Vec<(String, NaiveDateTime)> = Vec::new();
        let mut already_present = false;
        let mut dropped = 0usize;
        for (phone, start) in self.read_entries()? {
            if Self::is_date_past_for_reminding(start, today) {
                dropped += 1;
                continue;
            }
            if let Some((ref new_phone, new_start)) = new_pair {
                if *new_phone == phone && new_start == start {
                    already_present = true;
                }
            }
            retained.push((phone, start));
        }

        if let Some((phone, start)) = new_pair {
            if !already_present {
                retained.push((phone, start));
            }
        }

        if dropped > 0 {
            log::info!(
                "compacted {dropped} stale entries from {}",
                self.path.display()
            );
        }

        let mut out = String::new();
        for (phone, start) in &retained {
            out.push_str(phone);
            out.push('|');
            out.push_str(&start.format(TIMESTAMP_FORMAT).to_string());
            out.push('\n');
        }

        // Invalidate before writing: a failed write must not leave a cache
        // that claims to reflect the file.
        state.cache = None;
        atomic_write_str(&self.path, &out)
            .map_err(|e| ReminderError::persistence(&self.path, e))?;
        Ok(())
    }

    /// Parse the log file. Blank lines, lines without exactly one `|` and
    /// lines with an unparsable timestamp are skipped.
    fn read_entries(&self) -> Result<Vec<(String, NaiveDateTime)>, ReminderError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ReminderError::persistence(&self.path, e)),
        };

        let mut entries = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split('|').collect();
            if parts.len() != 2 {
                log::debug!("skipping malformed line in {}", self.path.display());
                continue;
            }
            match NaiveDateTime::parse_from_str(parts[1].trim(), TIMESTAMP_FORMAT) {
                Ok(start) => entries.push((parts[0].trim().to_string(), start)),
                Err(_) => {
                    log::debug!("skipping unparsable timestamp in {}", self.path.display());
                }
            }
        }
        Ok(entries)
    }
}
