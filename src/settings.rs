//! Typed, self-describing configuration fields.
//!
//! Each setting is declared once as a `Field<T>` with a config key, a
//! human label and an optional default. Typed access parses the raw config
//! string and falls back to the default when the key is absent or the
//! string does not parse — reading a setting never fails. The non-generic
//! [`SettingsField`] trait gives UI and validation code one interface over
//! the whole registry without knowing field types.

use chrono::NaiveTime;

use crate::config::ConfigStore;
use crate::error::ReminderError;
use crate::message;

/// Default outbound message template.
pub const DEFAULT_MESSAGE_TEMPLATE: &str = "Appointment reminder for <time> with <consultant> at \
<organization>. Please reply Y to confirm or call <phone> to reschedule. Thanks.";

/// A value that can live in the config store.
pub trait FieldValue: Clone {
    /// Parse the persisted config string. None means "does not parse" and
    /// the field falls back to its default.
    fn from_config_string(raw: &str) -> Option<Self>;

    fn to_config_string(&self) -> String;

    fn from_ui_string(raw: &str) -> Option<Self> {
        Self::from_config_string(raw)
    }

    fn to_ui_string(&self) -> String {
        self.to_config_string()
    }
}

impl FieldValue for String {
    fn from_config_string(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }

    fn to_config_string(&self) -> String {
        self.clone()
    }
}

impl FieldValue for i64 {
    fn from_config_string(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }

    fn to_config_string(&self) -> String {
        self.to_string()
    }
}

impl FieldValue for NaiveTime {
    fn from_config_string(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .or_else(|_| NaiveTime::parse_from_str(raw, "%I:%M %p"))
            .ok()
    }

    fn to_config_string(&self) -> String {
        self.format("%H:%M").to_string()
    }

    fn to_ui_string(&self) -> String {
        self.format("%-I:%M %p").to_string()
    }
}

/// One declared setting.
#[derive(Debug, Clone)]
pub struct Field<T> {
    key: &'static str,
    label: &'static str,
    default: Option<T>,
}

impl<T: FieldValue> Field<T> {
    fn new(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            default: None,
        }
    }

    fn with_default(key: &'static str, label: &'static str, default: T) -> Self {
        Self {
            key,
            label,
            default: Some(default),
        }
    }

    pub fn key(&self) -> &str {
        self.key
    }

    /// Current typed value: parsed config string, or the default when the
    /// key is absent or unparsable. Never fails.
    pub fn value(&self, store: &ConfigStore) -> Option<T> {
        match store.get(self.key) {
            Some(raw) => T::from_config_string(&raw).or_else(|| {
                log::debug!("config value for {} does not parse, using default", self.key);
                self.default.clone()
            }),
            None => self.default.clone(),
        }
    }

    /// Convert and persist a typed value.
    pub fn set_value(&self, store: &ConfigStore, value: &T) -> Result<(), ReminderError> {
        store.set(self.key, &value.to_config_string())
    }
}

/// Non-generic capability interface over a field, for registry iteration.
pub trait SettingsField {
    fn config_key(&self) -> &str;

    fn label(&self) -> &str;

    /// Current value rendered for display, empty when unset.
    fn ui_string(&self, store: &ConfigStore) -> String;

    /// Parse a UI string and persist it.
    fn set_from_ui_string(&self, store: &ConfigStore, raw: &str) -> Result<(), ReminderError>;

    /// Per-field validation: (error, warning), both empty when valid.
    fn validate(&self, store: &ConfigStore) -> (String, String);
}

impl<T: FieldValue> SettingsField for Field<T> {
    fn config_key(&self) -> &str {
        self.key
    }

    fn label(&self) -> &str {
        self.label
    }

    fn ui_string(&self, store: &ConfigStore) -> String {
        self.value(store)
            .map(|v| v.to_ui_string())
            .unwrap_or_default()
    }

    fn set_from_ui_string(&self, store: &ConfigStore, raw: &str) -> Result<(), ReminderError> {
        match T::from_ui_string(raw) {
            Some(value) => self.set_value(store, &value),
            None => Err(ReminderError::Config(format!(
                "invalid value for {}: {raw:?}",
                self.label
            ))),
        }
    }

    fn validate(&self, store: &ConfigStore) -> (String, String) {
        // A present-but-unparsable string is worth surfacing even though
        // value() silently falls back to the default.
        if let Some(raw) = store.get(self.key) {
            if T::from_config_string(&raw).is_none() {
                return (
                    format!("Invalid {}: {raw:?}.", self.label),
                    String::new(),
                );
            }
        }
        (String::new(), String::new())
    }
}

/// The full settings registry, declared once per process and passed to the
/// engine and its collaborators.
#[derive(Debug, Clone)]
pub struct Settings {
    pub daily_notification_time: Field<NaiveTime>,
    pub reminder_days_ahead: Field<i64>,
    pub consultant_name: Field<String>,
    pub organization_name: Field<String>,
    pub organization_phone: Field<String>,
    pub message_template: Field<String>,
    pub contacts_account_name: Field<String>,
    pub calendar_account_name: Field<String>,
    pub calendar_display_name: Field<String>,
    pub event_title_format: Field<String>,
    pub app_added_event_title: Field<String>,
}

impl Settings {
    pub fn new() -> Self {
        Self {
            daily_notification_time: Field::with_default(
                "daily_notification_time",
                "daily notification time",
                NaiveTime::from_hms_opt(17, 30, 0).unwrap_or_default(),
            ),
            reminder_days_ahead: Field::with_default(
                "reminder_days_ahead",
                "reminder days ahead",
                1,
            ),
            consultant_name: Field::new("consultant_name", "consultant name"),
            organization_name: Field::new("organization_name", "organization name"),
            organization_phone: Field::new("organization_phone", "organization phone"),
            message_template: Field::with_default(
                "message_template",
                "message template",
                DEFAULT_MESSAGE_TEMPLATE.to_string(),
            ),
            contacts_account_name: Field::new("contacts_account_name", "contacts account name"),
            calendar_account_name: Field::new("calendar_account_name", "calendar account name"),
            calendar_display_name: Field::new("calendar_display_name", "calendar display name"),
            event_title_format: Field::with_default(
                "event_title_format",
                "event title format",
                "<client>".to_string(),
            ),
            app_added_event_title: Field::with_default(
                "app_added_event_title",
                "app-added event title",
                "<client> booking".to_string(),
            ),
        }
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> Vec<&dyn SettingsField> {
        vec![
            &self.daily_notification_time,
            &self.reminder_days_ahead,
            &self.consultant_name,
            &self.organization_name,
            &self.organization_phone,
            &self.message_template,
            &self.contacts_account_name,
            &self.calendar_account_name,
            &self.calendar_display_name,
            &self.event_title_format,
            &self.app_added_event_title,
        ]
    }

    /// Validate every field plus the rendered message template.
    /// Returns (errors, warnings) suitable for a first-run settings check.
    pub fn validate_all(&self, store: &ConfigStore) -> (Vec<String>, Vec<String>) {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for field in self.fields() {
            let (error, warning) = field.validate(store);
            if !error.is_empty() {
                errors.push(error);
            }
            if !warning.is_empty() {
                warnings.push(warning);
            }
        }

        let (template_errors, template_warnings) = message::validate_template(self, store);
        errors.extend(template_errors);
        warnings.extend(template_warnings);

        (errors, warnings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, Settings, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("main.cfg"));
        (dir, Settings::new(), store)
    }

    #[test]
    fn test_absent_key_falls_back_to_default() {
        let (_dir, settings, store) = setup();
        assert_eq!(settings.reminder_days_ahead.value(&store), Some(1));
        assert_eq!(
            settings.daily_notification_time.value(&store),
            NaiveTime::from_hms_opt(17, 30, 0)
        );
        assert_eq!(settings.consultant_name.value(&store), None);
    }

    #[test]
    fn test_unparsable_value_falls_back_silently() {
        let (_dir, settings, store) = setup();
        store.set("reminder_days_ahead", "soon").unwrap();
        assert_eq!(settings.reminder_days_ahead.value(&store), Some(1));
    }

    #[test]
    fn test_unparsable_value_is_a_validation_error() {
        let (_dir, settings, store) = setup();
        store.set("daily_notification_time", "late-ish").unwrap();
        let (error, warning) = settings.daily_notification_time.validate(&store);
        assert!(error.contains("daily notification time"));
        assert!(warning.is_empty());
    }

    #[test]
    fn test_typed_round_trip() {
        let (_dir, settings, store) = setup();
        let time = NaiveTime::from_hms_opt(8, 15, 0).unwrap();
        settings.daily_notification_time.set_value(&store, &time).unwrap();
        assert_eq!(settings.daily_notification_time.value(&store), Some(time));
        assert_eq!(store.get("daily_notification_time").as_deref(), Some("08:15"));
    }

    #[test]
    fn test_time_parses_twelve_hour_ui_string() {
        let (_dir, settings, store) = setup();
        settings
            .daily_notification_time
            .set_from_ui_string(&store, "5:30 PM")
            .unwrap();
        assert_eq!(
            settings.daily_notification_time.value(&store),
            NaiveTime::from_hms_opt(17, 30, 0)
        );
    }

    #[test]
    fn test_set_from_ui_string_rejects_garbage() {
        let (_dir, settings, store) = setup();
        let result = settings.reminder_days_ahead.set_from_ui_string(&store, "many");
        assert!(result.is_err());
    }

    #[test]
    fn test_registry_order_matches_declaration() {
        let (_dir, settings, _store) = setup();
        let keys: Vec<&str> = settings.fields().iter().map(|f| f.config_key()).collect();
        assert_eq!(keys.first().copied(), Some("daily_notification_time"));
        assert_eq!(keys.last().copied(), Some("app_added_event_title"));
        assert_eq!(keys.len(), 11);
    }
}
