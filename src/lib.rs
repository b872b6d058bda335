pub mod chooser;
pub mod cli;
pub mod cloner;
pub mod config;
pub mod git;
pub mod index;
pub mod layout;
pub mod model;
pub mod resolver;
pub mod workspace;

pub use workspace::{
    CloneRequest, Layout, MoveTarget, Workspace, WorkspaceBuilder, WorkspaceError,
};
