//! Blue-green deployment passes.
//!
//! A pass runs sync → relink → (conditional) build → swap while holding the
//! orchestrator lock for its whole duration. Builds only ever target the
//! standby slot, and [`OrchestratorState`] plus the live route change together
//! at a single commit point after the build succeeded. Any earlier failure
//! leaves the previously deployed slot serving and the stored fingerprints as
//! they were.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use swapsite_core::{Fingerprint, Fingerprints, Settings, Slot, SourceKind};
use swapsite_sync::{
    ContentLinker, GeneratorBuilder, GitSyncer, RepositorySyncer, SiteBuilder, SymlinkLinker,
};

use crate::error::DeployError;
use crate::router::{SiteHandler, StaticSite, TrafficRouter};
use crate::slots::BuildSlotManager;

/// What started a deployment pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// First pass of the process; always builds.
    Startup,
    /// Upstream notification; builds only when a fingerprint moved.
    Webhook,
}

/// Where a pass currently is. `Idle` whenever no pass holds the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Syncing = 1,
    Building = 2,
    Swapping = 3,
}

impl Phase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Phase::Syncing,
            2 => Phase::Building,
            3 => Phase::Swapping,
            _ => Phase::Idle,
        }
    }
}

/// What is live right now. Only exists once a build has succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrchestratorState {
    pub active: Slot,
    pub fingerprints: Fingerprints,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploySummary {
    pub trigger: Trigger,
    pub slot: Slot,
    pub fingerprints: Fingerprints,
    pub duration_ms: u128,
    pub deployed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum DeployOutcome {
    /// A build ran and traffic now goes to `summary.slot`.
    Deployed(DeploySummary),
    /// Both sources matched the live fingerprints; nothing was built.
    Unchanged { active: Slot },
}

/// Remote locations and working-copy layout for the two sources.
#[derive(Clone)]
pub struct SiteLayout {
    pub site_remote: String,
    pub posts_remote: String,
    /// Site working copy; also the generator input.
    pub site_dir: PathBuf,
    pub posts_repo_dir: PathBuf,
    /// Linked into the site tree as `_posts`.
    pub posts_dir: PathBuf,
    /// Linked into the site tree as `uploads`.
    pub uploads_dir: PathBuf,
}

impl SiteLayout {
    pub fn from_settings(settings: &Settings) -> Self {
        let remote = &settings.app.remote;
        let paths = &settings.app.paths;
        Self {
            site_remote: remote.url_for(SourceKind::Site),
            posts_remote: remote.url_for(SourceKind::Posts),
            site_dir: paths.site_dir.clone(),
            posts_repo_dir: paths.posts_repo_dir.clone(),
            posts_dir: paths.posts_dir(),
            uploads_dir: paths.uploads_dir(),
        }
    }

    fn remote(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::Site => &self.site_remote,
            SourceKind::Posts => &self.posts_remote,
        }
    }

    fn checkout(&self, kind: SourceKind) -> &std::path::Path {
        match kind {
            SourceKind::Site => &self.site_dir,
            SourceKind::Posts => &self.posts_repo_dir,
        }
    }
}

/// The external programs a pass drives.
#[derive(Clone)]
pub struct Collaborators {
    pub syncer: Arc<dyn RepositorySyncer>,
    pub linker: Arc<dyn ContentLinker>,
    pub builder: Arc<dyn SiteBuilder>,
}

impl Collaborators {
    /// `git`, symlinks and the configured generator.
    pub fn from_settings(settings: &Settings) -> Self {
        let generator = &settings.app.generator;
        Self {
            syncer: Arc::new(GitSyncer::new(settings.app.remote.default_branch.clone())),
            linker: Arc::new(SymlinkLinker),
            builder: Arc::new(
                GeneratorBuilder::new(generator.program.clone())
                    .with_args(generator.args.clone()),
            ),
        }
    }
}

pub struct DeploymentOrchestrator {
    layout: SiteLayout,
    slots: BuildSlotManager,
    collaborators: Collaborators,
    handlers: [Arc<dyn SiteHandler>; 2],
    router: TrafficRouter,
    state: Mutex<Option<OrchestratorState>>,
    phase: AtomicU8,
}

impl DeploymentOrchestrator {
    /// Each slot gets a [`StaticSite`] handler up front; swaps only repoint
    /// the router between them. The router starts on slot A, which the
    /// startup pass builds into before anything is served.
    pub fn new(layout: SiteLayout, slots: BuildSlotManager, collaborators: Collaborators) -> Self {
        let a: Arc<dyn SiteHandler> = Arc::new(StaticSite::new(slots.directory_for(Slot::A)));
        let b: Arc<dyn SiteHandler> = Arc::new(StaticSite::new(slots.directory_for(Slot::B)));
        let router = TrafficRouter::new(Slot::A, a.clone());
        Self {
            layout,
            slots,
            collaborators,
            handlers: [a, b],
            router,
            state: Mutex::new(None),
            phase: AtomicU8::new(Phase::Idle as u8),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let paths = &settings.app.paths;
        Self::new(
            SiteLayout::from_settings(settings),
            BuildSlotManager::new(paths.build_a.clone(), paths.build_b.clone()),
            Collaborators::from_settings(settings),
        )
    }

    /// Serving-side handle; cheap to clone.
    pub fn router(&self) -> TrafficRouter {
        self.router.clone()
    }

    pub fn slots(&self) -> &BuildSlotManager {
        &self.slots
    }

    /// Current phase, readable without waiting for a running pass.
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Snapshot of what is live. Blocks while a pass is running.
    pub fn state(&self) -> Option<OrchestratorState> {
        self.lock_state().clone()
    }

    /// Run one deployment pass. Blocks until any running pass has finished.
    ///
    /// Runs external programs; call from a blocking context.
    pub fn deploy(&self, trigger: Trigger) -> Result<DeployOutcome, DeployError> {
        let started = Instant::now();
        let mut state = self.lock_state();
        let _idle = IdleOnDrop(&self.phase);
        tracing::info!(trigger = ?trigger, "deployment pass started");

        let result = self.run_pass(trigger, &mut state, started);
        match &result {
            Ok(DeployOutcome::Deployed(summary)) => tracing::info!(
                trigger = ?trigger,
                slot = %summary.slot,
                site = %summary.fingerprints.site.short(),
                posts = %summary.fingerprints.posts.short(),
                duration_ms = summary.duration_ms,
                "deployed new build",
            ),
            Ok(DeployOutcome::Unchanged { active }) => tracing::info!(
                trigger = ?trigger,
                slot = %active,
                "sources unchanged, nothing to build",
            ),
            Err(err) => tracing::error!(
                trigger = ?trigger,
                stage = %err.stage(),
                error = %err,
                "deployment pass failed; live slot untouched",
            ),
        }
        result
    }

    fn run_pass(
        &self,
        trigger: Trigger,
        state: &mut Option<OrchestratorState>,
        started: Instant,
    ) -> Result<DeployOutcome, DeployError> {
        self.set_phase(Phase::Syncing);
        self.slots.bootstrap()?;
        let fingerprints = self.sync_sources()?;

        // Sync cleans untracked files out of the site tree, links included.
        self.collaborators.linker.relink(
            &self.layout.site_dir,
            &self.layout.posts_dir,
            &self.layout.uploads_dir,
        )?;

        if trigger == Trigger::Webhook {
            if let Some(live) = state.as_ref() {
                if live.fingerprints == fingerprints {
                    return Ok(DeployOutcome::Unchanged {
                        active: live.active,
                    });
                }
            }
        }

        let target = match state.as_ref() {
            Some(live) => self.slots.standby_of(live.active),
            None => Slot::A,
        };

        self.set_phase(Phase::Building);
        let destination = self.slots.directory_for(target);
        tracing::info!(slot = %target, destination = %destination.display(), "building");
        self.collaborators
            .builder
            .build(&self.layout.site_dir, destination)
            .map_err(|error| DeployError::Build {
                slot: target,
                error,
            })?;

        self.set_phase(Phase::Swapping);
        *state = Some(OrchestratorState {
            active: target,
            fingerprints: fingerprints.clone(),
        });
        self.router.install(target, self.handler_for(target));

        Ok(DeployOutcome::Deployed(DeploySummary {
            trigger,
            slot: target,
            fingerprints,
            duration_ms: started.elapsed().as_millis(),
            deployed_at: Utc::now(),
        }))
    }

    /// Sync site then posts, then read both revisions.
    fn sync_sources(&self) -> Result<Fingerprints, DeployError> {
        let syncer = &self.collaborators.syncer;
        for kind in [SourceKind::Site, SourceKind::Posts] {
            tracing::debug!(origin = %kind, "syncing");
            syncer
                .sync(self.layout.remote(kind), self.layout.checkout(kind))
                .map_err(|error| DeployError::Sync {
                    origin: kind,
                    error,
                })?;
        }
        Ok(Fingerprints {
            site: self.revision(SourceKind::Site)?,
            posts: self.revision(SourceKind::Posts)?,
        })
    }

    fn revision(&self, kind: SourceKind) -> Result<Fingerprint, DeployError> {
        self.collaborators
            .syncer
            .current_revision(self.layout.checkout(kind))
            .map_err(|error| DeployError::Revision {
                origin: kind,
                error,
            })
    }

    fn handler_for(&self, slot: Slot) -> Arc<dyn SiteHandler> {
        match slot {
            Slot::A => self.handlers[0].clone(),
            Slot::B => self.handlers[1].clone(),
        }
    }

    fn set_phase(&self, phase: Phase) {
        tracing::debug!(phase = ?phase, "phase transition");
        self.phase.store(phase as u8, Ordering::Release);
    }

    // State is only written at the commit point, so a panic inside a
    // collaborator cannot leave it half-updated.
    fn lock_state(&self) -> std::sync::MutexGuard<'_, Option<OrchestratorState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct IdleOnDrop<'a>(&'a AtomicU8);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(Phase::Idle as u8, Ordering::Release);
    }
}
