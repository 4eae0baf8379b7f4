use anyhow::Result;
use clap::{Parser, Subcommand};
use glob_loader::prelude::*;
use human_panic::setup_panic;
use tracing::{enabled, error, info, Level};

/// glob-loader
///
/// Finds modules by glob pattern, loads each one, and reports what was
/// loaded. Useful for checking which handlers, plugins or manifests a
/// service will pick up at start-up.
#[derive(Parser)]
#[clap(author, version = env!("GLOB_LOADER_VERSION"), about)]
struct Cli {
    #[clap(flatten)]
    logging: LoggingOpts,

    #[clap(flatten)]
    load: LoadArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
struct VersionArgs {
    #[arg(long, action)]
    pub short: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load matching modules and list them.
    #[clap(alias("l"))]
    List(ListArgs),
    /// Load matching modules and print their contents as JSON.
    #[clap(alias("d"))]
    Dump(DumpArgs),
    /// Print version info and exit
    #[clap(alias("v"))]
    Version(VersionArgs),
}

#[tokio::main]
async fn main() {
    setup_panic!();
    dotenvy::dotenv().ok();
    let opts = Cli::parse();

    let (_guard, file_location) = match opts
        .logging
        .install(&opts.load.get_run_id(), "root")
        .await
    {
        Ok(configured) => configured,
        Err(e) => {
            eprintln!("Unable to configure logging. {}", e);
            std::process::exit(2);
        }
    };

    let error_code = match handle_commands(&opts).await {
        Ok(code) => code,
        Err(e) => {
            error!(target: "user", "{}", e);
            exit_code(&e)
        }
    };

    if error_code != 0 || enabled!(Level::DEBUG) {
        info!(target: "user", "More detailed logs at {}", file_location.display());
    }

    std::process::exit(error_code);
}

async fn handle_commands(opts: &Cli) -> Result<i32> {
    match &opts.command {
        Command::List(args) => list_modules(&opts.load, args).await,
        Command::Dump(args) => dump_modules(&opts.load, args).await,
        Command::Version(args) => show_version(args).map(|_| 0),
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<LoaderError>() {
        Some(LoaderError::Expansion(_))
        | Some(LoaderError::InvalidOptions(_))
        | Some(LoaderError::WorkingDir(_)) => 2,
        _ => 1,
    }
}

fn show_version(args: &VersionArgs) -> Result<()> {
    if args.short {
        info!(target: "always", "{}", env!("GLOB_LOADER_VERSION"));
    } else {
        info!(target: "always", "glob-loader: {}", env!("GLOB_LOADER_VERSION"));
        info!(target: "always", "{:>12}: {}", "Build Timestamp", env!("VERGEN_BUILD_TIMESTAMP"));
        info!(target: "always", "{:>12}: {}", "Git Sha", env!("VERGEN_GIT_SHA"));
    }
    Ok(())
}
