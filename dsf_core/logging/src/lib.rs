use time::macros::format_description;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    // RUST_LOG wins, otherwise info
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Multi-line output with thread names, for embedders and debugging sessions.
pub fn init_logger() {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_thread_names(true)
                .with_line_number(false)
                .with_file(false)
                .pretty(),
        )
        .with(env_filter())
        .init();
}

/// Single-line output with a local timestamp, used by the `dsf` binary.
pub fn init_cli_logger() {
    let time_format =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:2]");

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_timer(fmt::time::LocalTime::new(time_format))
                .with_target(false)
                .with_level(true)
                .with_thread_names(false)
                .with_line_number(false)
                .with_file(false)
                .with_span_events(fmt::format::FmtSpan::NONE)
                .compact(),
        )
        .with(env_filter())
        .init();
}
