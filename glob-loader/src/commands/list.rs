use crate::loader::prelude::{load, LoadedModule, Manifest};
use crate::shared::prelude::{display_path, print_details, LoadArgs, ModuleSummary};
use anyhow::Result;
use clap::Args;
use serde_yaml::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Glob patterns of the modules to load
    #[arg(required = true)]
    pub patterns: Vec<String>,
}

pub async fn list_modules(load_args: &LoadArgs, args: &ListArgs) -> Result<i32> {
    let options = load_args.to_load_options()?;
    let working_dir = match &options.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    let mut modules = Vec::new();
    let mut failures = 0;
    load(args.patterns.clone(), options, |result| match result {
        Ok(module) => modules.push(summarize(&working_dir, &module)),
        Err(_) => failures += 1,
    })
    .await?;

    if !modules.is_empty() {
        print_details(&modules);
    }
    info!(target: "user", "Loaded {} modules, {} failed", modules.len(), failures);

    Ok(if failures > 0 { 1 } else { 0 })
}

/// Uses the manifest's `name` when it has one, the file stem otherwise.
pub fn summarize(working_dir: &Path, module: &LoadedModule<Arc<Manifest>>) -> ModuleSummary {
    let name = module
        .exports
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            module
                .path
                .file_stem()
                .map(|x| x.to_string_lossy().to_string())
        })
        .unwrap_or_default();

    ModuleSummary {
        name,
        documents: module.exports.documents.len(),
        path: display_path(working_dir, &module.path),
    }
}
