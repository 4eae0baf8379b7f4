use crate::loader::prelude::load;
use crate::shared::prelude::{display_path, LoadArgs, STDOUT_WRITER};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use serde_yaml::Value;
use std::io::Write;
use tracing::warn;

#[derive(Debug, Args)]
pub struct DumpArgs {
    /// Glob patterns of the modules to load
    #[arg(required = true)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DumpEntry {
    pub path: String,
    pub documents: Vec<Value>,
}

pub async fn dump_modules(load_args: &LoadArgs, args: &DumpArgs) -> Result<i32> {
    let options = load_args.to_load_options()?;
    let working_dir = match &options.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    let mut entries = Vec::new();
    let mut failures = 0;
    load(args.patterns.clone(), options, |result| match result {
        Ok(module) => entries.push(DumpEntry {
            path: display_path(&working_dir, &module.path),
            documents: module.exports.documents.clone(),
        }),
        Err(_) => failures += 1,
    })
    .await?;

    let json = serde_json::to_string_pretty(&entries)?;
    writeln!(STDOUT_WRITER.write().await, "{}", json)?;

    if failures > 0 {
        warn!(target: "user", "{} modules could not be loaded", failures);
        return Ok(1);
    }
    Ok(0)
}
