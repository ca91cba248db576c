use std::fs::{self, OpenOptions};
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{SecondsFormat, Utc};

/// Append-only failure log shared by every pipeline step.
///
/// Each call writes one `[timestamp] message` line. Writing never fails the
/// caller; a log that cannot be written is reported through tracing instead.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: Utf8PathBuf,
}

impl ErrorLog {
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn append(&self, message: &str) {
        tracing::warn!(target: "species_sync::errors", "{message}");
        let line = format!(
            "[{}] {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            message.replace('\n', " ")
        );
        if let Err(err) = self.write_line(&line) {
            tracing::error!(path = %self.path, "failed to append to error log: {err}");
        }
    }

    fn write_line(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_str().is_empty() {
                fs::create_dir_all(parent.as_std_path())?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_std_path())?;
        file.write_all(line.as_bytes())
    }
}
