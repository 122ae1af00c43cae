//! # swapsite-sync
//!
//! The external collaborators a deployment pass drives: fetching content
//! sources, stitching them into the generator input, and running the
//! generator.
//!
//! Each collaborator is a trait so the daemon's orchestrator can be driven
//! by fakes in tests. [`GitSyncer`], [`SymlinkLinker`] and
//! [`GeneratorBuilder`] are the production implementations.

mod command;
pub mod builder;
pub mod error;
pub mod git;
pub mod link;

use std::path::Path;

use swapsite_core::Fingerprint;

pub use builder::GeneratorBuilder;
pub use error::{BuildError, CommandError, LinkError, RevisionError, SyncError};
pub use git::GitSyncer;
pub use link::SymlinkLinker;

/// Keeps a local working copy current with a remote's default branch.
pub trait RepositorySyncer: Send + Sync {
    /// Clone or update `destination` so it matches the remote default branch.
    fn sync(&self, remote: &str, destination: &Path) -> Result<(), SyncError>;

    /// Fingerprint of the default branch as last fetched into `destination`.
    fn current_revision(&self, destination: &Path) -> Result<Fingerprint, RevisionError>;
}

/// Re-establishes links from external content into the generator input tree.
pub trait ContentLinker: Send + Sync {
    fn relink(&self, site_dir: &Path, posts_dir: &Path, uploads_dir: &Path)
        -> Result<(), LinkError>;
}

/// Renders a generator input tree into an output directory.
///
/// `Ok` means `destination` is a complete, servable tree.
pub trait SiteBuilder: Send + Sync {
    fn build(&self, source: &Path, destination: &Path) -> Result<(), BuildError>;
}
