// ABOUTME: Metric names and recording helpers built on the metrics facade
// ABOUTME: No-ops unless the binary installs an exporter

use std::time::Duration;

pub const EVENTS_TOTAL: &str = "gordy_events_total";
pub const COMMANDS_TOTAL: &str = "gordy_commands_total";
pub const COMMAND_DURATION_SECONDS: &str = "gordy_command_duration_seconds";
pub const GREETINGS_TOTAL: &str = "gordy_greetings_total";
pub const SEND_FAILURES_TOTAL: &str = "gordy_send_failures_total";

/// Count one inbound event by kind
pub fn record_event(kind: &'static str) {
    metrics::counter!(EVENTS_TOTAL, "kind" => kind).increment(1);
}

/// Count one finished command invocation and record how long it ran
pub fn record_command(name: &str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!(COMMANDS_TOTAL, "command" => name.to_string(), "outcome" => outcome)
        .increment(1);
    metrics::histogram!(COMMAND_DURATION_SECONDS, "command" => name.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_greeting() {
    metrics::counter!(GREETINGS_TOTAL).increment(1);
}

/// Count an outbound operation that the transport rejected
pub fn record_send_failure(operation: &'static str) {
    metrics::counter!(SEND_FAILURES_TOTAL, "operation" => operation).increment(1);
}
