use colored::Colorize;
use std::cmp::max;
use std::path::Path;
use tracing::info;

mod config_load;
mod logging;

pub const RUN_ID_ENV_VAR: &str = "GLOB_LOADER_RUN_ID";

pub mod prelude {
    pub use super::config_load::{LoadArgs, OnErrorArg, SortArg};
    pub use super::logging::{LoggingOpts, STDOUT_WRITER};
    pub use super::{display_path, print_details, ModuleSummary, RUN_ID_ENV_VAR};
}

/// One row of `glob-loader list` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSummary {
    pub name: String,
    pub documents: usize,
    pub path: String,
}

/// Shows `path` relative to `working_dir` when possible, otherwise a shortened form.
pub fn display_path(working_dir: &Path, path: &Path) -> String {
    let loc = path.display().to_string();
    match pathdiff::diff_paths(path, working_dir) {
        Some(diff) => diff.display().to_string(),
        None => match loc.char_indices().rev().nth(34) {
            Some((start, _)) if start > 0 => format!("...{}", &loc[start..]),
            _ => loc,
        },
    }
}

pub fn print_details(modules: &[ModuleSummary]) {
    let max_name_length = modules
        .iter()
        .map(|x| x.name.len())
        .max()
        .unwrap_or(20);
    let max_name_length = max(max_name_length, 20) + 2;

    info!(target: "user", "  {:max_name_length$}{:12}{}", "Name".white().bold(), "Documents".white().bold(), "Path".white().bold());
    for module in modules {
        info!(target: "user", "- {:max_name_length$}{:12}{}", module.name, module.documents, module.path);
    }
}
