//! Client-name extraction from calendar event titles.
//!
//! A title format is literal text with a single `<client>` placeholder.
//! Compiling a format expands the placeholder into a capturing group that
//! matches 1–5 whitespace/comma-separated name units and anchors the
//! whole pattern: a format only matches a complete title, never a
//! substring. Formats can be declared regex-capable, in which case their
//! literal text is taken verbatim instead of being escaped.

use regex::Regex;

use crate::error::ReminderError;

/// Placeholder token substituted with the client name.
pub const CLIENT_PLACEHOLDER: &str = "<client>";

/// One token of a client name: letters first, then letters, digits,
/// apostrophes, hyphens or periods.
const NAME_UNIT: &str = "[A-Za-z][A-Za-z0-9'’\\-.]*";

/// Upper bound on name units a client name may span.
const MAX_NAME_UNITS: usize = 5;

/// Capturing group for a client name. Alternatives are ordered from five
/// units down to one; the regex engine prefers earlier alternatives, so
/// longer names win on ambiguity.
fn client_name_group() -> String {
    let mut alternatives = Vec::with_capacity(MAX_NAME_UNITS);
    for units in (1..=MAX_NAME_UNITS).rev() {
        if units == 1 {
            alternatives.push(NAME_UNIT.to_string());
        } else {
            alternatives.push(format!("{NAME_UNIT}(?:[\\s,]+{NAME_UNIT}){{{}}}", units - 1));
        }
    }
    format!("({})", alternatives.join("|"))
}

/// A compiled title format.
#[derive(Debug, Clone)]
pub struct TitlePattern {
    regex: Regex,
}

impl TitlePattern {
    /// Compile a title format. When `treat_as_regex` is false all
    /// non-placeholder text is escaped for literal matching.
    pub fn compile(format: &str, treat_as_regex: bool) -> Result<TitlePattern, ReminderError> {
        let format = format.trim();

        let body = match format.split_once(CLIENT_PLACEHOLDER) {
            Some((before, after)) => {
                let (before, after) = if treat_as_regex {
                    (before.to_string(), after.to_string())
                } else {
                    (regex::escape(before), regex::escape(after))
                };
                format!("{before}{}{after}", client_name_group())
            }
            None if treat_as_regex => format.to_string(),
            None => regex::escape(format),
        };

        let regex = Regex::new(&format!("^{body}$"))
            .map_err(|e| ReminderError::Pattern(e.to_string()))?;
        Ok(TitlePattern { regex })
    }

    /// Match against a complete title and return the captured client name.
    pub fn extract(&self, title: &str) -> Option<String> {
        self.regex
            .captures(title)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Try each compiled pattern in order against the whole title; the first
/// full match wins.
pub fn extract_client_name(title: &str, patterns: &[TitlePattern]) -> Option<String> {
    let title = title.trim();
    patterns.iter().find_map(|pattern| pattern.extract(title))
}
