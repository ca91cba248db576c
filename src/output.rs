use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunResult};
use crate::report::CompletenessReport;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

/// Prints per-species progress lines to stdout.
pub struct ConsoleOutput;

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        println!(
            "[{}/{}] {} - {} (sound: {}, map: {}, species data: {})",
            event.index + 1,
            event.total,
            event.display_name,
            event.scientific_name,
            event.sound,
            event.map,
            event.data
        );
    }
}

/// Swallows progress; used for machine-readable output.
pub struct JsonOutput;

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

impl JsonOutput {
    pub fn print_run(result: &RunResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_report(report: &CompletenessReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub fn print_summary(report: &CompletenessReport) -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.write_all(report.render_summary().as_bytes())
}
