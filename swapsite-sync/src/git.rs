//! `git`-backed [`RepositorySyncer`].
//!
//! A sync is clone-if-missing, then `fetch origin`, `reset --hard
//! origin/<branch>` and `clean -f -x -d`. The clean step also removes
//! anything linked into the working copy, so callers relink afterwards.

use std::path::Path;
use std::process::Command;

use swapsite_core::Fingerprint;

use crate::command;
use crate::error::{io_err, RevisionError, SyncError};
use crate::RepositorySyncer;

/// Shells out to the `git` binary on `PATH`.
///
/// The operator's system and global git config apply, so credential
/// helpers, `url.<base>.insteadOf` rewrites and `safe.directory` entries
/// work as they do for an interactive `git`.
#[derive(Debug, Clone)]
pub struct GitSyncer {
    default_branch: String,
}

impl GitSyncer {
    pub fn new(default_branch: impl Into<String>) -> Self {
        Self {
            default_branch: default_branch.into(),
        }
    }

    fn remote_ref(&self) -> String {
        format!("origin/{}", self.default_branch)
    }
}

/// `git` with terminal prompts off, so a missing credential fails fast
/// instead of hanging the deployment.
fn git_command(workdir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(workdir);
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd
}

impl RepositorySyncer for GitSyncer {
    fn sync(&self, remote: &str, destination: &Path) -> Result<(), SyncError> {
        match std::fs::symlink_metadata(destination) {
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let parent = match destination.parent() {
                    Some(p) if !p.as_os_str().is_empty() => p,
                    _ => Path::new("."),
                };
                std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
                tracing::info!("cloning into {}", destination.display());
                let mut clone = git_command(parent);
                let name = destination_name(destination)?;
                clone.arg("clone").arg(remote).arg(name);
                command::run(&mut clone)?;
            }
            Err(err) => return Err(io_err(destination, err)),
        }

        let remote_ref = self.remote_ref();
        command::run(git_command(destination).args(["fetch", "origin"]))?;
        let reset = ["reset", "--hard", remote_ref.as_str()];
        command::run(git_command(destination).args(reset))?;
        command::run(git_command(destination).args(["clean", "-f", "-x", "-d"]))?;
        tracing::debug!("{} reset to {remote_ref}", destination.display());
        Ok(())
    }

    fn current_revision(&self, destination: &Path) -> Result<Fingerprint, RevisionError> {
        let remote_ref = self.remote_ref();
        let mut rev_parse = git_command(destination);
        rev_parse.args(["rev-parse", remote_ref.as_str()]);
        let output = command::run(&mut rev_parse)?;
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if sha.is_empty() {
            return Err(RevisionError::Empty {
                path: destination.to_path_buf(),
                branch: remote_ref,
            });
        }
        Ok(Fingerprint(sha))
    }
}

fn destination_name(destination: &Path) -> Result<&std::ffi::OsStr, SyncError> {
    destination.file_name().ok_or_else(|| {
        io_err(
            destination,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "clone destination has no final path component",
            ),
        )
    })
}
