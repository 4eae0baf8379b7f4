use crate::loader::prelude::{FailurePolicy, LoadOptions, LoaderError, SortOrder};
use clap::{ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use super::RUN_ID_ENV_VAR;

#[derive(ValueEnum, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SortArg {
    /// Keep the order files were matched in
    None,
    /// Sort by path
    Name,
    /// Sort by path, reversed
    NameDesc,
}

#[derive(ValueEnum, Debug, Copy, Clone, PartialEq, Eq)]
pub enum OnErrorArg {
    /// Stop at the first module that fails to load
    Abort,
    /// Report the failure and continue with the next module
    Skip,
}

#[derive(Parser, Debug)]
#[clap(group = ArgGroup::new("load"))]
pub struct LoadArgs {
    /// Fail when a pattern matches nothing or a path cannot be read.
    #[arg(long, env = "GLOB_LOADER_STRICT", default_value = "false", global(true))]
    pub strict: bool,

    /// Load at most this many modules at once. Unset loads them one after another.
    #[arg(long, env = "GLOB_LOADER_LIMIT", global(true))]
    pub limit: Option<usize>,

    /// Order modules are delivered in.
    #[arg(long, env = "GLOB_LOADER_SORT", default_value = "none", global(true))]
    pub sort: SortArg,

    /// Treat more than one match as an error.
    #[arg(long, env = "GLOB_LOADER_UNIQUE", default_value = "false", global(true))]
    pub unique: bool,

    /// Drop this file from the matches, normally the caller's own module.
    #[arg(long, env = "GLOB_LOADER_EXCLUDE", global(true))]
    pub exclude: Option<PathBuf>,

    /// What to do when a module fails to load.
    #[arg(long, env = "GLOB_LOADER_ON_ERROR", default_value = "abort", global(true))]
    pub on_error: OnErrorArg,

    /// Give up on a module after this many milliseconds.
    #[arg(long, env = "GLOB_LOADER_TIMEOUT_MS", global(true))]
    pub timeout_ms: Option<u64>,

    /// Override the working directory patterns are resolved against.
    #[arg(long, short = 'C', env = "GLOB_LOADER_WORKING_DIR", global(true))]
    pub working_dir: Option<PathBuf>,

    /// Unique value used to name log files for this run.
    #[arg(long, global(true), env = RUN_ID_ENV_VAR)]
    pub run_id: Option<String>,
}

impl LoadArgs {
    pub fn generate_run_id() -> String {
        let id = nanoid::nanoid!(4, &nanoid::alphabet::SAFE);
        let now = chrono::Local::now();
        let current_time = now.format("%Y%m%d");
        format!("{}-{}", current_time, id)
    }

    pub fn get_run_id(&self) -> String {
        self.run_id.clone().unwrap_or_else(Self::generate_run_id)
    }

    pub fn to_load_options(&self) -> Result<LoadOptions, LoaderError> {
        let mut builder = LoadOptions::builder();
        builder
            .strict(self.strict)
            .unique(self.unique)
            .sort(match self.sort {
                SortArg::None => SortOrder::Unsorted,
                SortArg::Name => SortOrder::Alphanumeric,
                SortArg::NameDesc => SortOrder::custom(|a, b| b.cmp(a)),
            })
            .on_error(match self.on_error {
                OnErrorArg::Abort => FailurePolicy::Abort,
                OnErrorArg::Skip => FailurePolicy::Skip,
            });

        if let Some(limit) = self.limit {
            builder.limit(limit);
        }
        if let Some(exclude) = &self.exclude {
            builder.exclude_self(exclude.clone());
        }
        if let Some(dir) = &self.working_dir {
            builder.working_dir(dir.clone());
        }
        if let Some(timeout) = self.timeout_ms {
            builder.load_timeout(Duration::from_millis(timeout));
        }

        let options = builder
            .build()
            .map_err(|e| LoaderError::InvalidOptions(e.to_string()))?;
        debug!("Using load options {:?}", options);
        Ok(options)
    }
}
