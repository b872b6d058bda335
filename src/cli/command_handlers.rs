use std::{
    error::Error,
    path::{Path, PathBuf},
};

use log::debug;

use crate::{CloneRequest, Layout, MoveTarget, Workspace};

/// Handler to clone command
pub async fn do_clone(
    workspace: &mut Workspace,
    locator: String,
    source: Option<String>,
    target: Option<PathBuf>,
    golang: bool,
) -> Result<(), Box<dyn Error>> {
    let request = CloneRequest {
        locator,
        source,
        target,
        layout: if golang { Layout::Go } else { Layout::Default },
    };
    let destination = workspace.clone_repo(request).await?;
    println!("{}", destination.display());
    Ok(())
}

/// Handler to mv command
/// Without a target the directory moves to the canonical location of one of
/// its remotes.
pub fn do_mv(
    workspace: &mut Workspace,
    source: &Path,
    target: Option<PathBuf>,
    remote: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let target = match target {
        Some(path) => MoveTarget::Path(path),
        None => MoveTarget::Remote(remote),
    };
    let destination = workspace.move_dir(source, target)?;
    println!("{}", destination.display());
    Ok(())
}

pub fn do_rm(workspace: &mut Workspace, path: &Path) -> Result<(), Box<dyn Error>> {
    let removed = workspace.remove(path)?;
    println!("{}", removed.display());
    Ok(())
}

pub fn do_ls(workspace: &Workspace) -> Result<(), Box<dyn Error>> {
    debug!("{} indexed directories", workspace.index().len());
    for entry in workspace.index().list() {
        println!("{}", entry.path.display());
    }
    Ok(())
}

pub fn do_track(workspace: &mut Workspace, path: &Path) -> Result<(), Box<dyn Error>> {
    let tracked = workspace.track(path)?;
    println!("{}", tracked.display());
    Ok(())
}

pub fn do_untrack(workspace: &mut Workspace, path: &Path) -> Result<(), Box<dyn Error>> {
    let untracked = workspace.untrack(path)?;
    println!("{}", untracked.display());
    Ok(())
}
