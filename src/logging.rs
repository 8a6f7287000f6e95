//! # Console Output
//!
//! Colorized log lines for interactive runs and colored verdict labels for
//! the evaluation summary.

use crate::evaluator::Verdict;
use colored::*;
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

/// Formats each event as a single line colored by its level.
///
/// No timestamps or targets are printed. Warnings and errors get a level
/// prefix so they stand out once colors are stripped (e.g. when piped).
pub struct ColorizedFormatter;

impl<S, N> FormatEvent<S, N> for ColorizedFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut buffer = String::new();
        ctx.format_fields(Writer::new(&mut buffer), event)?;

        let level = *event.metadata().level();
        let line = match level {
            Level::ERROR | Level::WARN => format!("{}: {}", level, buffer),
            Level::INFO | Level::DEBUG | Level::TRACE => buffer,
        };

        writeln!(writer, "{}", colorize_level(level, &line))
    }
}

fn colorize_level(level: Level, line: &str) -> ColoredString {
    match level {
        Level::INFO => line.white(),
        Level::WARN => line.yellow(),
        Level::ERROR => line.red(),
        Level::DEBUG => line.blue(),
        Level::TRACE => line.purple(),
    }
}

/// Verdict label colored for the summary: PASS green, WARNING yellow, FAIL red
pub fn colorize_verdict(verdict: Verdict) -> ColoredString {
    let label = verdict.to_string();
    match verdict {
        Verdict::Pass => label.green().bold(),
        Verdict::Warning => label.yellow().bold(),
        Verdict::Fail => label.red().bold(),
    }
}

/// Color a comparison line by the verdict it reports
pub fn colorize_line(verdict: Verdict, line: &str) -> ColoredString {
    match verdict {
        Verdict::Pass => line.normal(),
        Verdict::Warning => line.yellow(),
        Verdict::Fail => line.red(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorize_verdict_keeps_label() {
        colored::control::set_override(false);
        assert_eq!(colorize_verdict(Verdict::Pass).to_string(), "PASS");
        assert_eq!(colorize_verdict(Verdict::Warning).to_string(), "WARNING");
        assert_eq!(colorize_verdict(Verdict::Fail).to_string(), "FAIL");
        assert_eq!(colorize_line(Verdict::Fail, "FAIL: x").to_string(), "FAIL: x");
    }
}
