use std::io::{self, IsTerminal};
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Targets of the workspace crates, raised to a finer level by [`env_filter`].
pub const WORKSPACE_TARGETS: &[&str] = &[
    "nosql_agent_backend",
    "api",
    "query_engine",
    "chat_store",
    "ai_llm_service",
];

/// RFC3339 UTC timer implemented via `chrono`.
/// Example output: `2025-09-12T10:20:30Z`
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        let s = now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        w.write_str(&s)
    }
}

/// Formatting layer for the whole process.
///
/// - RFC3339 UTC timestamps
/// - Compact single-line format with target and `file:line`
/// - Span close events (durations of instrumented calls)
/// - ANSI colors only when stdout is a terminal
pub fn layer<S>() -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let use_ansi = io::stdout().is_terminal();

    fmt::layer()
        .with_timer(ChronoRfc3339Utc)
        .with_level(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(use_ansi)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .event_format(fmt::format().compact().with_source_location(true))
}

/// Level directive for one target, e.g. `query_engine=debug`.
pub fn level_directive(target: &str, level: Level) -> Option<Directive> {
    let s = format!("{target}={}", level.as_str().to_lowercase());
    Directive::from_str(&s).ok()
}

/// `RUST_LOG` if set, otherwise `default` with `level` applied to every
/// workspace crate.
///
/// Example: `default = "info"`, `level = Level::DEBUG` shows INFO for
/// dependencies and DEBUG for the workspace.
pub fn env_filter(default: &str, level: Level) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    WORKSPACE_TARGETS
        .iter()
        .filter_map(|t| level_directive(t, level))
        .fold(EnvFilter::new(default), EnvFilter::add_directive)
}
