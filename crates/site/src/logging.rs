//! Tracing setup.
//!
//! The console layer is always on and honours `RUST_LOG`. Outside debug mode
//! a second layer appends INFO and above to the log file, one line per event:
//!
//! ```text
//! 2026-01-31 14:02:11,532 INFO: Vestibule startup addr=127.0.0.1:5000 debug=false admin_login=true [in crates/site/src/logging.rs:79]
//! ```

use std::fmt;
use std::fs::{File, OpenOptions};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{Event, Level, Subscriber, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Timestamp layout of file log lines.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

const DEFAULT_FILTER: &str = "info,tower_http=debug";

/// Install the global subscriber.
pub fn init(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console = tracing_subscriber::fmt::layer().with_filter(filter);

    let file = if config.debug {
        None
    } else {
        Some(file_layer(Mutex::new(open_log_file(&config.log_file)?)))
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .context("failed to install tracing subscriber")
}

/// Open the log file for appending, creating it if needed.
pub fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

/// Layer writing INFO and above in the file line format.
pub fn file_layer<S, W>(writer: W) -> impl Layer<S> + Send + Sync + 'static
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .event_format(LogLineFormat)
        .with_filter(LevelFilter::INFO)
}

/// The one informational entry emitted when the server starts.
///
/// Written once the listener is bound. Every other startup step logs at
/// DEBUG so the file log gets exactly this line. Only non-sensitive
/// settings are included.
pub fn log_startup(config: &Config, addr: SocketAddr) {
    info!(
        %addr,
        debug = config.debug,
        admin_login = config.admin_password_hash.is_some(),
        "Vestibule startup"
    );
}

/// `<timestamp> <LEVEL>: <message> [in <file>:<line>]`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLineFormat;

impl<S, N> FormatEvent<S, N> for LogLineFormat
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
        let meta = event.metadata();
        write!(
            writer,
            "{} {}: ",
            Local::now().format(TIMESTAMP_FORMAT),
            level_name(*meta.level())
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(
            writer,
            " [in {}:{}]",
            meta.file().unwrap_or("<unknown>"),
            meta.line().unwrap_or(0)
        )
    }
}

/// Level names as they appear in the file log.
fn level_name(level: Level) -> &'static str {
    if level == Level::WARN {
        "WARNING"
    } else {
        level.as_str()
    }
}
