//! Error types for swapsite-sync.
//!
//! One enum per collaborator so the daemon can tell which stage failed
//! without string matching.

use std::path::PathBuf;

use thiserror::Error;

/// An external program could not be run or exited unsuccessfully.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Exit {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Fetching or resetting a working copy failed.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The default-branch revision of a working copy could not be read.
#[derive(Debug, Error)]
pub enum RevisionError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("no revision reported for `{branch}` in {path}")]
    Empty { path: PathBuf, branch: String },
}

/// Relinking external content into the generator input failed.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("cannot resolve absolute path of {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot remove stale entry {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot link {link} -> {target}: {source}")]
    Create {
        link: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The site generator did not produce a complete output tree.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
