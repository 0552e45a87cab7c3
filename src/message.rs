//! Outbound message rendering.
//!
//! Template substitution is placeholder-by-placeholder: a placeholder is
//! only touched when it appears in the template, and a placeholder whose
//! configured value is blank stays literal in the output. Blank settings
//! values are validation errors (reported through the optional sink); a
//! missing client name is data-dependent and stays silent.

use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::config::ConfigStore;
use crate::contacts::Contact;
use crate::settings::Settings;
use crate::title::CLIENT_PLACEHOLDER;
use crate::util::format_appointment_time;

/// Single-segment SMS length ceiling.
pub const MAX_SINGLE_SMS_LEN: usize = 160;

const TIME_PLACEHOLDER: &str = "<time>";
const CONSULTANT_PLACEHOLDER: &str = "<consultant>";
const ORGANIZATION_PLACEHOLDER: &str = "<organization>";
const PHONE_PLACEHOLDER: &str = "<phone>";

/// Render the configured message template for one appointment.
///
/// When an error sink is supplied, blank settings values behind present
/// placeholders are reported to it; rendering itself never fails.
pub fn render(
    settings: &Settings,
    store: &ConfigStore,
    contact: Option<&Contact>,
    start_time: NaiveDateTime,
    mut errors: Option<&mut Vec<String>>,
) -> String {
    let mut message = settings.message_template.value(store).unwrap_or_default();

    if message.contains(TIME_PLACEHOLDER) {
        message = message.replace(TIME_PLACEHOLDER, &format_appointment_time(start_time));
    }

    substitute_setting(
        &mut message,
        CONSULTANT_PLACEHOLDER,
        settings.consultant_name.value(store),
        "Missing consultant name.",
        &mut errors,
    );
    substitute_setting(
        &mut message,
        ORGANIZATION_PLACEHOLDER,
        settings.organization_name.value(store),
        "Missing organization name.",
        &mut errors,
    );
    substitute_setting(
        &mut message,
        PHONE_PLACEHOLDER,
        settings.organization_phone.value(store),
        "Missing organization phone.",
        &mut errors,
    );

    if message.contains(CLIENT_PLACEHOLDER) {
        if let Some(contact) = contact {
            message = message.replace(CLIENT_PLACEHOLDER, &contact.display_name);
        }
    }

    message
}

fn substitute_setting(
    message: &mut String,
    placeholder: &str,
    value: Option<String>,
    missing: &str,
    errors: &mut Option<&mut Vec<String>>,
) {
    if !message.contains(placeholder) {
        return;
    }
    match value {
        Some(value) if !value.trim().is_empty() => {
            *message = message.replace(placeholder, &value);
        }
        _ => {
            if let Some(sink) = errors.as_deref_mut() {
                sink.push(missing.to_string());
            }
        }
    }
}

/// Validate the configured template by rendering it against a dummy
/// contact and date. Returns (errors, warnings): blank settings behind
/// present placeholders are errors, an over-long rendering is a warning.
pub fn validate_template(settings: &Settings, store: &ConfigStore) -> (Vec<String>, Vec<String>) {
    let dummy_contact = Contact::with_number("Alexandra Witherspoon", "0400000000");
    let dummy_start = NaiveDate::from_ymd_opt(2024, 9, 18)
        .and_then(|d| d.and_hms_opt(15, 30, 0))
        .unwrap_or_else(|| Local::now().naive_local());

    let mut errors = Vec::new();
    let rendered = render(
        settings,
        store,
        Some(&dummy_contact),
        dummy_start,
        Some(&mut errors),
    );

    let mut warnings = Vec::new();
    if rendered.chars().count() > MAX_SINGLE_SMS_LEN {
        warnings.push(format!(
            "Message may exceed the single-SMS limit of {MAX_SINGLE_SMS_LEN} characters."
        ));
    }

    (errors, warnings)
}
