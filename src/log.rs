use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;
use error_stack::{AttachmentKind, Context, FrameKind, IntoReport, Report, ResultExt};
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

#[derive(Debug)]
pub struct AppLogError;
impl fmt::Display for AppLogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("App log error")
    }
}
impl std::error::Error for AppLogError {}

pub type AppLogResult<T> = error_stack::Result<T, AppLogError>;

/// `2024-05-01 18:03:12,415`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTime;

impl FormatTime for LogTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S,%3f"))
    }
}

/// `<timestamp> - <LEVEL> - <message>`, one event per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLine {
    timer: LogTime,
}

fn level_name(level: &Level) -> &'static str {
    if *level == Level::WARN {
        "WARNING"
    } else {
        level.as_str()
    }
}

impl<S, N> FormatEvent<S, N> for LogLine
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
        self.timer.format_time(&mut writer)?;
        write!(writer, " - {} - ", level_name(event.metadata().level()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Event log for one run, writing `LogLine`s at INFO and above to `make_writer`.
///
/// The dispatch is scoped by the caller with `tracing::dispatcher::set_default`
/// so nothing is installed process-wide.
pub fn dispatch<W>(make_writer: W) -> Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .event_format(LogLine::default())
        .with_writer(make_writer);
    let subscriber = tracing_subscriber::registry()
        .with(layer)
        .with(LevelFilter::INFO);
    Dispatch::new(subscriber)
}

/// Opens `path` in append mode, creating it when needed.
pub fn file_dispatch(path: &Path) -> AppLogResult<Dispatch> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .into_report()
        .attach_printable(format!("Failed to open log file at {}", path.display()))
        .change_context(AppLogError)?;
    Ok(dispatch(Mutex::new(file)))
}

/// One-line rendering of a report for the log file: printable attachments
/// and contexts, outermost first.
pub fn report_summary<C: Context>(report: &Report<C>) -> String {
    let mut parts: Vec<String> = vec![];
    for frame in report.frames() {
        let part = match frame.kind() {
            FrameKind::Context(context) => context.to_string(),
            FrameKind::Attachment(AttachmentKind::Printable(attachment)) => attachment.to_string(),
            _ => continue,
        };
        if !part.is_empty() && !parts.contains(&part) {
            parts.push(part);
        }
    }
    parts.join(": ")
}
