//! Log output for the `quote` binary.
//!
//! Every invocation is one short command, so the subscriber is assembled once
//! from [`LogSettings`] and never reconfigured. Console output goes to stderr
//! to keep command output on stdout clean.

use std::{
    fs::File,
    io::{self, IsTerminal},
    path::Path,
    sync::Mutex,
};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    EnvFilter,
    fmt::{
        self, FmtContext,
        format::{FormatEvent, FormatFields, Writer},
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// `2025-03-01T10:15:00.123+00:00  INFO quote_core message key=value`
struct LocalFmt;

fn level_color(level: Level) -> &'static str {
    match level {
        Level::ERROR => "\x1b[1;31m",
        Level::WARN => "\x1b[1;33m",
        Level::INFO => "\x1b[1;32m",
        Level::DEBUG => "\x1b[1;34m",
        Level::TRACE => "\x1b[1;35m",
    }
}

impl<S, N> FormatEvent<S, N> for LocalFmt
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
        let level = *meta.level();
        // Crate name only; module paths make CLI logs hard to scan.
        let origin = meta.target().split("::").next().unwrap_or_default();

        if writer.has_ansi_escapes() {
            write!(
                writer,
                "\x1b[2m{timestamp}\x1b[0m {}{level:>5}\x1b[0m \x1b[36m{origin}\x1b[0m ",
                level_color(level)
            )?;
        } else {
            write!(writer, "{timestamp} {level:>5} {origin} ")?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// What to log and where.
pub struct LogSettings {
    /// Level or EnvFilter directive from the config file or `--log-level`.
    pub level: String,
    /// Value of `RUST_LOG`; wins over `level` when it parses.
    pub env_override: Option<String>,
    /// Console output on stderr; off with `--quiet`.
    pub console: bool,
    /// Already opened log file, appended to in plain text.
    pub file: Option<File>,
}

impl LogSettings {
    /// Console logging at `level`, honouring `RUST_LOG`.
    pub fn new(level: &str) -> Self {
        Self {
            level: level.to_string(),
            env_override: std::env::var(EnvFilter::DEFAULT_ENV).ok(),
            console: true,
            file: None,
        }
    }

    pub fn filter(&self) -> Result<EnvFilter> {
        if let Some(filter) = self
            .env_override
            .as_deref()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
        {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.level)
            .with_context(|| format!("invalid log level '{}'", self.level))
    }

    /// Builds the subscriber without installing it.
    pub fn into_subscriber(self) -> Result<impl Subscriber + Send + Sync + 'static> {
        let filter = self.filter()?;

        let console = self.console.then(|| {
            fmt::layer()
                .event_format(LocalFmt)
                .with_ansi(io::stderr().is_terminal())
                .with_writer(io::stderr)
        });
        let file = self.file.map(|file| {
            fmt::layer()
                .event_format(LocalFmt)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
        });

        Ok(tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .with(file))
    }
}

/// Opens `path` for appending. The directory must already exist.
pub fn open_log_file(path: &Path) -> Result<File> {
    File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file '{}'", path.display()))
}

/// Installs the global subscriber. Call once at startup.
pub fn init_logging(settings: LogSettings) -> Result<()> {
    settings
        .into_subscriber()?
        .try_init()
        .context("logging already initialized")
}
