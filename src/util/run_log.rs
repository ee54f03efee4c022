//! append-only log of watcher runs.
//!
//! every line is prefixed with the name of the watcher that wrote it.
//! one `RunLog` can be shared by several watchers running at the same time,
//! lines are written whole while holding the lock.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use chrono::DateTime;
use chrono_tz::Tz;
use itertools::Itertools;
use crate::constants::DATE_FORMAT;

/// handle to the log file. cheap to clone, all clones write to the same file.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
    /// opened on first write
    file: Arc<Mutex<Option<File>>>,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), file: Arc::new(Mutex::new(None)) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// append one line. failing to write the log must not end a run,
    /// so errors are only reported through tracing.
    fn write_line(&self, line: &str) {
        // a poisoned lock only means another watcher panicked mid-write
        let mut file = self.file.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        if file.is_none() {
            match OpenOptions::new().create(true).append(true).open(&self.path) {
                Ok(opened) => *file = Some(opened),
                Err(err) => {
                    tracing::error!(path = %self.path.display(), "could not open run log: {err}");
                    return;
                }
            }
        }

        if let Some(file) = file.as_mut() {
            if let Err(err) = writeln!(file, "{line}") {
                tracing::error!(path = %self.path.display(), "could not write run log: {err}");
            }
        }
    }
}

/// `RunLog` bound to one watcher
#[derive(Debug, Clone)]
pub struct Logger {
    name: &'static str,
    verbose: bool,
    sink: RunLog,
}

impl Logger {
    pub fn new(name: &'static str, sink: RunLog) -> Self {
        Self { name, verbose: false, sink }
    }

    /// echo every line to stdout, not only elevated ones
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// `elevated` lines are always echoed
    pub fn append(&self, message: &str, elevated: bool) {
        let line = format!("{}: {}", self.name, message);
        self.sink.write_line(&line);

        if self.verbose || elevated {
            println!("{line}");
        }
    }

    pub fn log(&self, message: &str) {
        self.append(message, false);
    }

    /// writes all lines of `summary` aligned and empties it
    pub fn flush(&self, summary: &mut Summary) {
        for line in summary.drain_lines() {
            self.log(&line);
        }
    }
}

/// labeled values which are logged as one block with aligned values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    entries: Vec<(String, String)>,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>, value: impl ToString) {
        self.entries.push((label.into(), value.to_string()));
    }

    /// entries of `other` go after the own ones
    pub fn extend(&mut self, other: Summary) {
        self.entries.extend(other.entries);
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// format like "Hub:         10.0.0.2" with every label padded to the longest one.
    /// the summary is empty afterwards.
    pub fn drain_lines(&mut self) -> Vec<String> {
        let width = self.entries.iter()
            .map(|(label, _)| label.chars().count())
            .max()
            .unwrap_or(0);

        self.entries.drain(..)
            .map(|(label, value)| {
                let padding = width - label.chars().count();
                format!("{label}: {:padding$} {value}", "")
            })
            .collect_vec()
    }
}

/// like "Fri Oct 16 18:30:00 CEST 2026"
pub fn date_string(time: &DateTime<Tz>) -> String {
    time.format(DATE_FORMAT).to_string()
}
