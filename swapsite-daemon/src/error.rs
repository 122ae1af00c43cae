use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use swapsite_core::{Slot, SourceKind};
use swapsite_sync::{BuildError, LinkError, RevisionError, SyncError};

/// Error surface for the daemon runtime and HTTP server.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings error: {0}")]
    Config(#[from] swapsite_core::ConfigError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("deployment failed: {0}")]
    Deploy(#[from] DeployError),

    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A build slot directory is missing and cannot be created, or is not a directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("slot {slot} path {path} exists but is not a directory")]
    NotADirectory { slot: Slot, path: PathBuf },

    #[error("cannot create slot {slot} directory {path}: {source}")]
    Create {
        slot: Slot,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot inspect slot {slot} directory {path}: {source}")]
    Inspect {
        slot: Slot,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Pipeline stage a deployment pass failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Directories,
    Sync,
    Revision,
    Link,
    Build,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Directories => write!(f, "directories"),
            Stage::Sync => write!(f, "sync"),
            Stage::Revision => write!(f, "revision"),
            Stage::Link => write!(f, "link"),
            Stage::Build => write!(f, "build"),
        }
    }
}

/// A deployment pass aborted. Nothing live was changed.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("could not sync {origin} source: {error}")]
    Sync {
        origin: SourceKind,
        #[source]
        error: SyncError,
    },

    #[error("could not read {origin} revision: {error}")]
    Revision {
        origin: SourceKind,
        #[source]
        error: RevisionError,
    },

    #[error("could not relink content: {0}")]
    Link(#[from] LinkError),

    #[error("could not build slot {slot}: {error}")]
    Build {
        slot: Slot,
        #[source]
        error: BuildError,
    },
}

impl DeployError {
    pub fn stage(&self) -> Stage {
        match self {
            DeployError::Directory(_) => Stage::Directories,
            DeployError::Sync { .. } => Stage::Sync,
            DeployError::Revision { .. } => Stage::Revision,
            DeployError::Link(_) => Stage::Link,
            DeployError::Build { .. } => Stage::Build,
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
