use colored::{Color, Colorize};
use gob_core::{HealthReport, HealthStatus};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::io::{self, Stdout, Write};

pub struct Logger<W: Write = Stdout> {
    output: W,
}

impl<W: Write> Logger<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }

    fn string_to_color(s: &str) -> Color {
        let colors = [
            Color::Green,
            Color::Blue,
            Color::Magenta,
            Color::Cyan,
            Color::BrightGreen,
            Color::BrightBlue,
            Color::BrightMagenta,
            Color::BrightCyan,
        ];

        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        let hash = hasher.finish();

        let idx = usize::try_from(hash).unwrap_or_default() % colors.len();
        colors[idx]
    }

    pub fn log(&mut self, service_name: &str, message: &str) {
        let prefix = format!("[{service_name}]").color(Self::string_to_color(service_name));
        for line in message.lines() {
            let _ = writeln!(self.output, "{prefix} {line}");
        }
    }

    pub fn system(&mut self, message: &str) {
        let prefix = "[system]".color(Color::Red);
        for line in message.lines() {
            let _ = writeln!(self.output, "{prefix} {line}");
        }
    }

    pub fn error(&mut self, message: &str) {
        let prefix = "[error]".color(Color::BrightRed).bold();
        for line in message.lines() {
            let _ = writeln!(self.output, "{prefix} {line}");
        }
    }

    /// One line per service, colored by health.
    pub fn health(&mut self, report: &HealthReport) {
        for entry in report.entries() {
            let status = match entry.status {
                HealthStatus::Healthy => entry.status.to_string().green(),
                HealthStatus::Down => entry.status.to_string().red(),
            };
            let line = match entry.last_exit {
                Some(exit) => format!("{status} (last {exit})"),
                None => status.to_string(),
            };
            self.log(&entry.service, &line);
        }
    }

    /// Write `report` as pretty JSON.
    pub fn json(&mut self, report: &HealthReport) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut self.output, report)?;
        writeln!(self.output)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(io::stdout())
    }
}
