use anyhow::{Context, Result};
use clap::{ArgAction, Args, ValueEnum};
use indicatif::ProgressStyle;
use lazy_static::lazy_static;
use std::fs::File;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::level_filters::LevelFilter;
use tracing::Metadata;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_indicatif::filter::{hide_indicatif_span_fields, IndicatifFilter};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::fmt::format::{DefaultFields, Format, PrettyFields};
use tracing_subscriber::{filter::filter_fn, prelude::*, Registry};

pub const DEFAULT_LOG_DIR: &str = "/tmp/glob-loader";

lazy_static! {
    /// Where command output goes. Once logging is installed this writes above
    /// any progress bars instead of through them.
    pub static ref STDOUT_WRITER: Arc<RwLock<Box<dyn Write + Sync + Send>>> =
        Arc::new(RwLock::new(Box::new(std::io::stdout())));
}

fn load_progress_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{span_child_prefix} {spinner:.green} {wide_msg} {pos}/{len} modules [{elapsed}]",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("##-")
}

#[derive(Args, Debug)]
pub struct LoggingOpts {
    /// Show debug output. Repeat for trace output.
    #[arg(short, long, action = ArgAction::Count, global(true))]
    pub verbose: u8,

    /// How load progress is shown. `plain` never redraws the terminal.
    #[arg(
        long,
        global(true),
        default_value = "auto",
        env = "GLOB_LOADER_OUTPUT_PROGRESS"
    )]
    pub progress: ProgressMode,

    /// Directory the log file for each run is written to.
    #[arg(
        long,
        global(true),
        default_value = DEFAULT_LOG_DIR,
        env = "GLOB_LOADER_LOG_DIR"
    )]
    pub log_dir: PathBuf,
}

#[derive(ValueEnum, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProgressMode {
    /// Draw progress bars when stdout is a terminal
    Auto,
    /// Never draw progress bars
    Plain,
    /// Always draw progress bars
    Tty,
}

impl ProgressMode {
    fn draws_bars(self) -> bool {
        match self {
            ProgressMode::Auto => std::io::stdout().is_terminal(),
            ProgressMode::Plain => false,
            ProgressMode::Tty => true,
        }
    }
}

/// Console events are the ones logged for the user, plus anything that must
/// always be shown. Everything else only reaches the log file.
fn is_console_event(metadata: &Metadata<'_>, level: LevelFilter) -> bool {
    match metadata.target() {
        "user" => level >= *metadata.level(),
        "always" => true,
        _ => false,
    }
}

impl LoggingOpts {
    pub fn level_filter(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    pub fn log_file(&self, run_id: &str, command: &str) -> PathBuf {
        self.log_dir
            .join(format!("glob-loader-{}-{}.log", command, run_id))
    }

    /// Installs the global subscriber. The returned guard flushes the log file
    /// and has to live until the process exits.
    pub async fn install(&self, run_id: &str, command: &str) -> Result<(WorkerGuard, PathBuf)> {
        std::fs::create_dir_all(&self.log_dir)
            .with_context(|| format!("Unable to create {}", self.log_dir.display()))?;
        let log_file = self.log_file(run_id, command);
        let file = File::create(&log_file)
            .with_context(|| format!("Unable to create {}", log_file.display()))?;
        let (file_writer, guard) =
            tracing_appender::non_blocking(strip_ansi_escapes::Writer::new(file));

        let bars = IndicatifLayer::new()
            .with_span_field_formatter(hide_indicatif_span_fields(DefaultFields::new()))
            .with_progress_style(load_progress_style());
        *STDOUT_WRITER.write().await = Box::new(bars.get_stdout_writer());

        let level = self.level_filter();
        let console = tracing_subscriber::fmt::layer()
            .event_format(
                Format::default()
                    .with_target(false)
                    .without_time()
                    .compact(),
            )
            .fmt_fields(PrettyFields::new())
            .with_writer(bars.get_stdout_writer())
            .with_filter(filter_fn(move |metadata| {
                is_console_event(metadata, level)
            }));

        let file_output = tracing_subscriber::fmt::layer()
            .event_format(Format::default().pretty())
            .with_ansi(false)
            .with_writer(file_writer);

        let bars = self
            .progress
            .draws_bars()
            .then(|| bars.with_filter(IndicatifFilter::new(false)));

        let subscriber = Registry::default()
            .with(console)
            .with(bars)
            .with(file_output);
        tracing::subscriber::set_global_default(subscriber)?;

        Ok((guard, log_file))
    }
}
