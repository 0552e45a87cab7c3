//! Persistent key=value configuration store.
//!
//! Plain-text file, one `key=value` per line, both sides trimmed. Lines
//! that are blank or do not split into exactly two parts on `=` are
//! skipped on read. Reads go to the file every time so a value is never
//! stale; writes rewrite the whole file atomically, preserving line order.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ReminderError;
use crate::util::atomic_write_str;

/// Default config file name under the application data directory.
pub const CONFIG_FILE: &str = "main.cfg";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Open a store backed by the given file. The file may not exist yet;
    /// a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the value for a key, or None when the key (or the file) is
    /// absent. An unreadable file is treated as absent after a warning so
    /// callers can fall back to field defaults.
    pub fn get(&self, key: &str) -> Option<String> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("failed to read config {}: {}", self.path.display(), e);
                return None;
            }
        };

        for line in content.lines() {
            let parts: Vec<&str> = line.split('=').collect();
            if parts.len() != 2 {
                continue;
            }
            if parts[0].trim() == key {
                return Some(parts[1].trim().to_string());
            }
        }
        None
    }

    /// Set a key, replacing its value in place or appending a new line,
    /// and rewrite the file.
    pub fn set(&self, key: &str, value: &str) -> Result<(), ReminderError> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        let mut replaced = false;

        if let Ok(content) = fs::read_to_string(&self.path) {
            for line in content.lines() {
                let parts: Vec<&str> = line.split('=').collect();
                if parts.len() != 2 {
                    continue;
                }
                let k = parts[0].trim().to_string();
                let v = if k == key {
                    replaced = true;
                    value.to_string()
                } else {
                    parts[1].trim().to_string()
                };
                pairs.push((k, v));
            }
        }

        if !replaced {
            pairs.push((key.to_string(), value.to_string()));
        }

        let mut out = String::new();
        for (k, v) in &pairs {
            out.push_str(k);
            out.push('=');
            out.push_str(v);
            out.push('\n');
        }

        atomic_write_str(&self.path, &out)
            .map_err(|e| ReminderError::persistence(&self.path, e))
    }
}
