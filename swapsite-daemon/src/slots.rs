//! The two fixed build output directories.
//!
//! Only the active/standby labeling ever changes; the slot → directory
//! mapping is fixed at construction. Callers serialize access.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use swapsite_core::Slot;

use crate::error::DirectoryError;

#[derive(Debug, Clone)]
pub struct BuildSlotManager {
    a: PathBuf,
    b: PathBuf,
}

impl BuildSlotManager {
    pub fn new(a: impl Into<PathBuf>, b: impl Into<PathBuf>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
        }
    }

    /// Ensure both slot directories exist, creating missing ones. Idempotent.
    pub fn bootstrap(&self) -> Result<(), DirectoryError> {
        for slot in [Slot::A, Slot::B] {
            ensure_dir(slot, self.directory_for(slot))?;
        }
        Ok(())
    }

    pub fn standby_of(&self, active: Slot) -> Slot {
        active.other()
    }

    pub fn directory_for(&self, slot: Slot) -> &Path {
        match slot {
            Slot::A => &self.a,
            Slot::B => &self.b,
        }
    }
}

fn ensure_dir(slot: Slot, path: &Path) -> Result<(), DirectoryError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(DirectoryError::NotADirectory {
            slot,
            path: path.to_path_buf(),
        }),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            std::fs::create_dir_all(path).map_err(|source| DirectoryError::Create {
                slot,
                path: path.to_path_buf(),
                source,
            })?;
            tracing::info!(%slot, path = %path.display(), "created slot directory");
            Ok(())
        }
        Err(source) => Err(DirectoryError::Inspect {
            slot,
            path: path.to_path_buf(),
            source,
        }),
    }
}
