//! Scriptable collaborators and a temp-dir harness for orchestrator tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use swapsite_core::{Fingerprint, Fingerprints, Slot};
use swapsite_daemon::{
    BuildSlotManager, Collaborators, DeploymentOrchestrator, OrchestratorState, SiteLayout,
};
use swapsite_sync::{
    BuildError, CommandError, ContentLinker, LinkError, RepositorySyncer, RevisionError,
    SiteBuilder, SyncError,
};
use tempfile::TempDir;

fn command_failure(what: &str) -> CommandError {
    CommandError::Exit {
        command: what.to_string(),
        status: "exit status: 1".to_string(),
        stderr: "injected".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Syncer
// ---------------------------------------------------------------------------

/// Reports whatever revision the test last published for a checkout.
#[derive(Default)]
pub struct FakeSyncer {
    upstream: Mutex<HashMap<PathBuf, String>>,
    fetched: Mutex<HashMap<PathBuf, String>>,
    failing: Mutex<Option<PathBuf>>,
    unreadable: Mutex<Option<PathBuf>>,
    pub sync_calls: Mutex<Vec<PathBuf>>,
}

impl FakeSyncer {
    pub fn publish(&self, checkout: &Path, revision: &str) {
        self.upstream
            .lock()
            .unwrap()
            .insert(checkout.to_path_buf(), revision.to_string());
    }

    pub fn fail_sync_for(&self, checkout: Option<&Path>) {
        *self.failing.lock().unwrap() = checkout.map(Path::to_path_buf);
    }

    /// Sync succeeds but the revision of `checkout` cannot be read.
    pub fn fail_revision_for(&self, checkout: Option<&Path>) {
        *self.unreadable.lock().unwrap() = checkout.map(Path::to_path_buf);
    }
}

impl RepositorySyncer for FakeSyncer {
    fn sync(&self, _remote: &str, destination: &Path) -> Result<(), SyncError> {
        self.sync_calls
            .lock()
            .unwrap()
            .push(destination.to_path_buf());
        if self.failing.lock().unwrap().as_deref() == Some(destination) {
            return Err(SyncError::Command(command_failure("git fetch origin")));
        }
        std::fs::create_dir_all(destination).map_err(|source| SyncError::Io {
            path: destination.to_path_buf(),
            source,
        })?;
        let upstream = self.upstream.lock().unwrap().get(destination).cloned();
        if let Some(revision) = upstream {
            self.fetched
                .lock()
                .unwrap()
                .insert(destination.to_path_buf(), revision);
        }
        Ok(())
    }

    fn current_revision(&self, destination: &Path) -> Result<Fingerprint, RevisionError> {
        if self.unreadable.lock().unwrap().as_deref() == Some(destination) {
            return Err(RevisionError::Command(command_failure("git rev-parse")));
        }
        self.fetched
            .lock()
            .unwrap()
            .get(destination)
            .cloned()
            .map(Fingerprint)
            .ok_or_else(|| RevisionError::Empty {
                path: destination.to_path_buf(),
                branch: "origin/master".to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Linker
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeLinker {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl ContentLinker for FakeLinker {
    fn relink(&self, site_dir: &Path, _posts: &Path, _uploads: &Path) -> Result<(), LinkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(LinkError::Create {
                link: site_dir.join("_posts"),
                target: PathBuf::from("/nowhere"),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Writes `index.html` with the current `content`, tracking concurrency.
///
/// With a gate installed, each build writes a partial tree, signals
/// `started`, and waits for `release` before completing.
pub struct FakeBuilder {
    pub content: Mutex<String>,
    pub fail: AtomicBool,
    pub builds: Mutex<Vec<PathBuf>>,
    pub delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
}

impl Default for FakeBuilder {
    fn default() -> Self {
        Self {
            content: Mutex::new("v1".to_string()),
            fail: AtomicBool::new(false),
            builds: Mutex::new(Vec::new()),
            delay: Mutex::new(Duration::ZERO),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            gate: Mutex::new(None),
        }
    }
}

impl FakeBuilder {
    pub fn set_content(&self, content: &str) {
        *self.content.lock().unwrap() = content.to_string();
    }

    /// Returns (started, release) ends for the test side.
    pub fn install_gate(&self) -> (Receiver<()>, Sender<()>) {
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        *self.gate.lock().unwrap() = Some((started_tx, release_rx));
        (started_rx, release_tx)
    }

    pub fn build_count(&self) -> usize {
        self.builds.lock().unwrap().len()
    }
}

impl SiteBuilder for FakeBuilder {
    fn build(&self, _source: &Path, destination: &Path) -> Result<(), BuildError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let result = self.do_build(destination);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl FakeBuilder {
    fn do_build(&self, destination: &Path) -> Result<(), BuildError> {
        let io = |source| BuildError::Io {
            path: destination.to_path_buf(),
            source,
        };
        std::fs::write(destination.join("index.html"), "partial")
            .map_err(io)?;

        let gate = self.gate.lock().unwrap().take();
        if let Some((started, release)) = gate {
            let _ = started.send(());
            let _ = release.recv();
        }
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(BuildError::Command(command_failure("jekyll build")));
        }
        let content = self.content.lock().unwrap().clone();
        std::fs::write(destination.join("index.html"), content)
            .map_err(io)?;
        self.builds.lock().unwrap().push(destination.to_path_buf());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub root: TempDir,
    pub syncer: Arc<FakeSyncer>,
    pub linker: Arc<FakeLinker>,
    pub builder: Arc<FakeBuilder>,
    pub orchestrator: Arc<DeploymentOrchestrator>,
    pub site_dir: PathBuf,
    pub posts_repo_dir: PathBuf,
}

impl Harness {
    /// Both sources published at `site-1` / `posts-1`.
    pub fn new() -> Self {
        let root = TempDir::new().expect("root");
        let site_dir = root.path().join("jekyll");
        let posts_repo_dir = root.path().join("posts");

        let syncer = Arc::new(FakeSyncer::default());
        let linker = Arc::new(FakeLinker::default());
        let builder = Arc::new(FakeBuilder::default());
        syncer.publish(&site_dir, "site-1");
        syncer.publish(&posts_repo_dir, "posts-1");

        let orchestrator = Arc::new(DeploymentOrchestrator::new(
            SiteLayout {
                site_remote: "https://git.example.com/site.git".to_string(),
                posts_remote: "https://git.example.com/posts.git".to_string(),
                site_dir: site_dir.clone(),
                posts_repo_dir: posts_repo_dir.clone(),
                posts_dir: posts_repo_dir.join("posts"),
                uploads_dir: posts_repo_dir.join("uploads"),
            },
            BuildSlotManager::new(root.path().join("BUILD_A"), root.path().join("BUILD_B")),
            Collaborators {
                syncer: syncer.clone(),
                linker: linker.clone(),
                builder: builder.clone(),
            },
        ));

        Self {
            root,
            syncer,
            linker,
            builder,
            orchestrator,
            site_dir,
            posts_repo_dir,
        }
    }

    pub fn publish_site(&self, revision: &str) {
        self.syncer.publish(&self.site_dir, revision);
    }

    pub fn publish_posts(&self, revision: &str) {
        self.syncer.publish(&self.posts_repo_dir, revision);
    }

    pub fn slot_dir(&self, slot: Slot) -> PathBuf {
        match slot {
            Slot::A => self.root.path().join("BUILD_A"),
            Slot::B => self.root.path().join("BUILD_B"),
        }
    }

    pub fn served_file(&self, slot: Slot) -> String {
        std::fs::read_to_string(self.slot_dir(slot).join("index.html"))
            .unwrap_or_default()
    }

    pub fn state(&self) -> OrchestratorState {
        self.orchestrator.state().expect("a build is live")
    }
}

pub fn fingerprints(site: &str, posts: &str) -> Fingerprints {
    Fingerprints {
        site: Fingerprint::from(site),
        posts: Fingerprint::from(posts),
    }
}
