//! Contact snapshot and directory.
//!
//! The directory is a lowercase-name-keyed snapshot refreshed on demand
//! from a [`ContactSource`] collaborator (the OS address book, a CSV
//! export, a test fixture). Contacts are immutable between refreshes.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::ReminderError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub display_name: String,
    /// Normalized local-format mobile number, when the contact has one.
    pub most_likely_number: Option<String>,
}

impl Contact {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            most_likely_number: None,
        }
    }

    pub fn with_number(display_name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            most_likely_number: Some(number.into()),
        }
    }

    /// Build a contact from raw directory numbers; the first number that
    /// normalizes to a mobile number wins.
    pub fn with_best_number<S: AsRef<str>>(
        display_name: impl Into<String>,
        raw_numbers: &[S],
    ) -> Self {
        Self {
            display_name: display_name.into(),
            most_likely_number: raw_numbers
                .iter()
                .find_map(|raw| normalize_mobile_number(raw.as_ref())),
        }
    }
}

/// Normalize a raw phone number to local mobile format.
///
/// Strips spaces, accepts `04…` as-is and rewrites `+614…` to `04…`.
/// Anything else (landlines, short codes) is not usable for reminders.
pub fn normalize_mobile_number(raw: &str) -> Option<String> {
    let number = raw.trim().replace(' ', "");
    if number.starts_with("04") {
        Some(number)
    } else {
        number
            .strip_prefix("+614")
            .map(|rest| format!("04{rest}"))
    }
}

/// Supplies the contact list; implemented outside the core.
pub trait ContactSource {
    fn load(&self) -> Result<Vec<Contact>, ReminderError>;
}

#[derive(Debug, Clone, Default)]
pub struct ContactDirectory {
    by_name: HashMap<String, Contact>,
}

impl ContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_contacts(contacts: impl IntoIterator<Item = Contact>) -> Self {
        let by_name = contacts
            .into_iter()
            .map(|c| (c.display_name.to_lowercase(), c))
            .collect();
        Self { by_name }
    }

    /// Replace the snapshot with a fresh load from the source.
    pub fn refresh(&mut self, source: &dyn ContactSource) -> Result<(), ReminderError> {
        let contacts = source.load()?;
        log::debug!("contact directory refreshed: {} contacts", contacts.len());
        *self = Self::from_contacts(contacts);
        Ok(())
    }

    /// Exact lookup by full display name, case-insensitive.
    pub fn lookup(&self, name: &str) -> Option<&Contact> {
        self.by_name.get(&name.to_lowercase())
    }

    pub fn contacts(&self) -> impl Iterator<Item = &Contact> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
