//! # Utility Functions
//!
//! Small helpers shared by the describe and report code: number formatting
//! for human readable result lines, report identifiers and host details
//! recorded alongside the report for reproducibility.

use uuid::Uuid;

/// Generate a unique identifier for a report record
///
/// Creates a UUID v4 string so records written by separate evaluations of
/// the same flow can be told apart once collected by the report writer.
pub fn generate_report_id() -> String {
    Uuid::new_v4().to_string()
}

/// Format a value with thousands separators and two decimal places
///
/// Throughput figures span many orders of magnitude (a few hundred CPU
/// percent up to tens of millions of packets per second), so grouping the
/// integer digits keeps result lines readable.
///
/// ## Examples
///
/// ```rust
/// # use netperf_eval::utils::format_number;
/// assert_eq!(format_number(1234567.891), "1,234,567.89");
/// assert_eq!(format_number(-1050.0), "-1,050.00");
/// assert_eq!(format_number(12.5), "12.50");
/// ```
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return format!("{}", value);
    }

    let formatted = format!("{:.2}", value.abs());
    let (integer, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, fraction)
}

/// Number of logical CPUs of the evaluating host
pub fn get_cpu_count() -> usize {
    num_cpus::get()
}
