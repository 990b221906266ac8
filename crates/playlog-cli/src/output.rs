//! Human and JSON renderings of command results

use playlog_core::domain::{SyncKind, SyncOutcome};
use playlog_sync::FlushReport;

/// Chosen with the global `--json` flag
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Sink for everything a command prints
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);

    /// Result of one catalog sync
    fn outcome(&self, kind: SyncKind, outcome: SyncOutcome);

    /// Result of one queue flush
    fn flush_report(&self, report: &FlushReport);
}

/// Terminal output: status marks on stdout, problems on stderr
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {}

    fn outcome(&self, kind: SyncKind, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Success => self.success(&format!("{kind} sync accepted")),
            SyncOutcome::Skipped => self.success(&format!("{kind} unchanged, nothing sent")),
            SyncOutcome::Cooldown => self.warn(&format!("{kind} sync is in cooldown")),
            SyncOutcome::Error => self.error(&format!("{kind} sync failed, see logs")),
        }
    }

    fn flush_report(&self, report: &FlushReport) {
        if report.total() == 0 {
            self.success("Nothing pending");
            return;
        }
        self.success(&format!("Delivered {} pending operation(s)", report.delivered));
        if report.requeued > 0 {
            self.info(&format!("{} kept for the next flush", report.requeued));
        }
        if report.dropped > 0 {
            self.warn(&format!("{} dropped after repeated failures", report.dropped));
        }
    }
}

/// JSON output formatter, one document per result
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!("{}", serde_json::json!({"success": true, "message": message}));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", serde_json::json!({"success": false, "error": message}));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", serde_json::json!({"level": "warning", "message": message}));
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }

    fn outcome(&self, kind: SyncKind, outcome: SyncOutcome) {
        self.print_json(&serde_json::json!({"kind": kind, "outcome": outcome}));
    }

    fn flush_report(&self, report: &FlushReport) {
        self.print_json(&serde_json::to_value(report).unwrap_or_default());
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}
