use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Keeps an index of local git clones and resolves short slugs across hosts.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct CliArgs {
    #[clap(subcommand)]
    pub cmd: Command,
    /// Configuration file, defaults to ~/.repodex/config.toml
    #[clap(short, long, env = "REPODEX_CONFIG")]
    pub config: Option<PathBuf>,
    /// Never prompt; several candidates are reported as an error
    #[clap(long)]
    pub non_interactive: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Clones a repository by URL or slug and indexes it
    Clone {
        /// A URL such as git@github.com:org/repo.git or a slug such as org/repo
        locator: String,
        /// Resolve the slug with this source only
        #[clap(short, long)]
        source: Option<String>,
        /// Clone into this directory instead of the canonical location
        #[clap(short, long, conflicts_with = "golang")]
        target: Option<PathBuf>,
        /// Lay the clone out under $GOPATH/src
        #[clap(short, long)]
        golang: bool,
    },
    /// Moves a directory and keeps the index in step
    Mv {
        source: PathBuf,
        /// New location; omit to move to the canonical location of a remote
        #[clap(conflicts_with = "remote")]
        target: Option<PathBuf>,
        /// Remote whose URL determines the new location
        #[clap(short, long)]
        remote: Option<String>,
    },
    /// Deletes an indexed directory
    Rm { path: PathBuf },
    /// Lists indexed directories
    Ls,
    /// Indexes an existing directory
    Track { path: PathBuf },
    /// Removes a directory from the index without deleting it
    Untrack { path: PathBuf },
}
