use std::fs;
use std::io;
use std::path::Path;

use chrono::NaiveDateTime;

/// Write a file atomically: write to a sibling temp file, then rename over
/// the target. Creates parent directories as needed.
pub fn atomic_write_str(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Format an appointment start time for display and message text.
///
/// Example: "Tuesday 12 Mar 2024 @ 4:30pm" — 12-hour clock, no leading zero
/// on the hour, lowercase am/pm.
pub fn format_appointment_time(start: NaiveDateTime) -> String {
    start.format("%A %-d %b %Y @ %-I:%M%P").to_string()
}
