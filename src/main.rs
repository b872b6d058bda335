use std::{error::Error, process::ExitCode};

use clap::Parser;
use env_logger::Env;

use repodex::{
    chooser::NonInteractive,
    cli::{
        args::{CliArgs, Command},
        command_handlers::{do_clone, do_ls, do_mv, do_rm, do_track, do_untrack},
    },
    config::RepodexConfig,
    Workspace, WorkspaceError,
};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            match e.downcast_ref::<WorkspaceError>() {
                Some(error) if error.is_resolution_failure() => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli_args = CliArgs::parse();

    let config = RepodexConfig::load(cli_args.config.as_deref())?;
    let mut builder = Workspace::builder().config(config);
    if cli_args.non_interactive {
        builder = builder.selector(NonInteractive);
    }
    let mut workspace = builder.try_build()?;

    match cli_args.cmd {
        Command::Clone {
            locator,
            source,
            target,
            golang,
        } => do_clone(&mut workspace, locator, source, target, golang).await,
        Command::Mv {
            source,
            target,
            remote,
        } => do_mv(&mut workspace, &source, target, remote),
        Command::Rm { path } => do_rm(&mut workspace, &path),
        Command::Ls => do_ls(&workspace),
        Command::Track { path } => do_track(&mut workspace, &path),
        Command::Untrack { path } => do_untrack(&mut workspace, &path),
    }
}
