//! Shared command line utilities for the workspace binaries: clap styling,
//! verbosity flags and tracing subscriber setup.

use std::{io::Write, sync::Mutex};

pub use clap;

pub mod verbose {
    pub use clap_verbosity_flag::{Level, Verbosity};
}

/// Colour scheme of the help message.
pub fn get_styles() -> clap::builder::Styles {
    use clap::builder::styling::{AnsiColor, Effects};

    clap::builder::Styles::styled()
        .usage(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default() | Effects::BOLD)
        .invalid(AnsiColor::Red.on_default() | Effects::BOLD)
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
        .valid(AnsiColor::Green.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Cyan.on_default())
}

/// Map the `-v`/`-q` flags to a tracing level. No flag only shows errors.
pub fn verbose_level_to_trace(level: Option<verbose::Level>) -> &'static tracing::Level {
    match level {
        Some(verbose::Level::Error) => &tracing::Level::WARN,
        Some(verbose::Level::Warn) => &tracing::Level::INFO,
        Some(verbose::Level::Info) => &tracing::Level::DEBUG,
        Some(verbose::Level::Debug) => &tracing::Level::TRACE,
        Some(verbose::Level::Trace) => &tracing::Level::TRACE,
        None => &tracing::Level::ERROR,
    }
}

/// Install the global subscriber. Logs go to stderr, or as json lines to
/// `log_file` when one is given.
pub fn logging_setup<W>(level: &tracing::Level, log_file: Option<W>)
where
    W: Write + Send + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_max_level(*level)
        .with_target(false)
        .without_time();

    let result = match log_file {
        Some(file) => builder
            .json()
            .with_writer(Mutex::new(file))
            .try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    if let Err(err) = result {
        eprintln!("logging is already set up: {err}");
    }
}
