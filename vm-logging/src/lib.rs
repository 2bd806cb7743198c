use std::{
    env,
    path::{Path, PathBuf},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, writer::MakeWriterExt, MakeWriter},
    layer::Layered,
    prelude::*,
    registry,
    util::TryInitError,
    EnvFilter, Registry,
};

const DEFAULT_LOG_FILE: &str = "/tmp/vm-cloud.log";

/// Crates that are too chatty at the service's default level.
const QUIET_CRATES: &[&str] = &["tokio=warn", "hyper=warn", "hyper_util=warn", "tower=warn"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    File,
    Both,
    None,
}

impl LogOutput {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => LogOutput::File,
            "both" => LogOutput::Both,
            "none" => LogOutput::None,
            _ => LogOutput::Console,
        }
    }

    fn console(self) -> bool {
        matches!(self, LogOutput::Console | LogOutput::Both)
    }

    fn file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Json,
}

/// Logging configuration, read from `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT` and
/// `LOG_FILE_PATH`. `RUST_LOG`, when set, overrides `LOG_LEVEL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub output: LogOutput,
    pub format: LogFormat,
    pub file_path: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Human,
        };

        Self {
            level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            output: lookup("LOG_OUTPUT")
                .map(|value| LogOutput::parse(&value))
                .unwrap_or(LogOutput::Console),
            format,
            file_path: lookup("LOG_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
        }
    }

    pub fn env_filter(&self) -> EnvFilter {
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));
        for directive in QUIET_CRATES {
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }
        filter
    }

    fn file_location(&self) -> (&Path, &Path) {
        let dir = self
            .file_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("/tmp"));
        let name = self
            .file_path
            .file_name()
            .map(Path::new)
            .unwrap_or_else(|| Path::new("vm-cloud.log"));
        (dir, name)
    }
}

/// Install the global subscriber. Keep the returned guard alive for as long as
/// file output should be flushed.
pub fn init_subscriber(settings: &LogSettings) -> Result<Option<WorkerGuard>, TryInitError> {
    let subscriber = registry().with(settings.env_filter());

    let (file_writer, guard) = if settings.output.file() {
        let (dir, name) = settings.file_location();
        let appender = tracing_appender::rolling::daily(dir, name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(writer), Some(guard))
    } else {
        (None, None)
    };

    match (settings.output.console(), file_writer) {
        (true, Some(file)) => install(subscriber, settings.format, std::io::stdout.and(file))?,
        (true, None) => install(subscriber, settings.format, std::io::stdout)?,
        (false, Some(file)) => install(subscriber, settings.format, file)?,
        (false, None) => subscriber.try_init()?,
    }

    tracing::debug!(
        level = %settings.level,
        output = ?settings.output,
        format = ?settings.format,
        "logging initialized"
    );
    Ok(guard)
}

fn install<W>(
    subscriber: Layered<EnvFilter, Registry>,
    format: LogFormat,
    writer: W,
) -> Result<(), TryInitError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_writer(writer);
    match format {
        LogFormat::Json => subscriber.with(layer.json()).try_init(),
        LogFormat::Human => subscriber.with(layer.pretty()).try_init(),
    }
}
