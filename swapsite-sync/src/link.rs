//! Symlink-backed [`ContentLinker`].
//!
//! The generator expects posts under `<site>/_posts` and uploads under
//! `<site>/uploads`; both live in the separately synced posts repository.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::LinkError;
use crate::ContentLinker;

pub const POSTS_LINK: &str = "_posts";
pub const UPLOADS_LINK: &str = "uploads";

/// Replaces `_posts` and `uploads` inside the site tree with symlinks to
/// absolute external paths.
#[derive(Debug, Clone, Default)]
pub struct SymlinkLinker;

impl ContentLinker for SymlinkLinker {
    fn relink(
        &self,
        site_dir: &Path,
        posts_dir: &Path,
        uploads_dir: &Path,
    ) -> Result<(), LinkError> {
        let posts_link = site_dir.join(POSTS_LINK);
        let uploads_link = site_dir.join(UPLOADS_LINK);

        remove_entry(&posts_link)?;
        remove_entry(&uploads_link)?;

        let posts_target = absolute(posts_dir)?;
        let uploads_target = absolute(uploads_dir)?;

        create_link(&posts_target, &posts_link)?;
        create_link(&uploads_target, &uploads_link)?;
        tracing::debug!(
            "linked {} -> {}, {} -> {}",
            posts_link.display(),
            posts_target.display(),
            uploads_link.display(),
            uploads_target.display()
        );
        Ok(())
    }
}

/// Remove whatever sits at `path` without following symlinks.
fn remove_entry(path: &Path) -> Result<(), LinkError> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(LinkError::Remove {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|source| LinkError::Remove {
        path: path.to_path_buf(),
        source,
    })
}

fn absolute(path: &Path) -> Result<PathBuf, LinkError> {
    std::path::absolute(path).map_err(|source| LinkError::Resolve {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn create_link(target: &Path, link: &Path) -> Result<(), LinkError> {
    std::os::unix::fs::symlink(target, link).map_err(|source| LinkError::Create {
        link: link.to_path_buf(),
        target: target.to_path_buf(),
        source,
    })
}

#[cfg(windows)]
fn create_link(target: &Path, link: &Path) -> Result<(), LinkError> {
    std::os::windows::fs::symlink_dir(target, link).map_err(|source| LinkError::Create {
        link: link.to_path_buf(),
        target: target.to_path_buf(),
        source,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Layout {
        _root: TempDir,
        site: PathBuf,
        posts: PathBuf,
        uploads: PathBuf,
    }

    fn layout() -> Layout {
        let root = TempDir::new().expect("root");
        let site = root.path().join("jekyll");
        let posts = root.path().join("posts").join("posts");
        let uploads = root.path().join("posts").join("uploads");
        for dir in [&site, &posts, &uploads] {
            std::fs::create_dir_all(dir).expect("mkdir");
        }
        std::fs::write(posts.join("2020-01-01-hello.md"), "hi\n")
            .expect("write post");
        Layout {
            _root: root,
            site,
            posts,
            uploads,
        }
    }

    fn relink(l: &Layout) -> Result<(), LinkError> {
        SymlinkLinker.relink(&l.site, &l.posts, &l.uploads)
    }

    #[test]
    fn relink_creates_absolute_symlinks() {
        let l = layout();
        relink(&l).expect("relink");

        let posts_link = l.site.join(POSTS_LINK);
        let target = std::fs::read_link(&posts_link).expect("read_link");
        assert!(target.is_absolute());
        assert!(posts_link.join("2020-01-01-hello.md").is_file());
        let uploads = std::fs::symlink_metadata(l.site.join(UPLOADS_LINK)).unwrap();
        assert!(uploads.file_type().is_symlink());
    }

    #[test]
    fn relink_is_repeatable() {
        let l = layout();
        relink(&l).expect("first");
        relink(&l).expect("second");
        assert!(l.site.join(POSTS_LINK).join("2020-01-01-hello.md").is_file());
    }

    #[test]
    fn relink_replaces_real_directories_without_touching_sources() {
        let l = layout();
        let stale = l.site.join(POSTS_LINK);
        std::fs::create_dir_all(&stale).expect("mkdir stale");
        std::fs::write(stale.join("old.md"), "old\n").expect("write stale");

        relink(&l).expect("relink");

        assert!(!l.site.join(POSTS_LINK).join("old.md").exists());
        assert!(l.posts.join("2020-01-01-hello.md").is_file());
    }

    #[test]
    fn missing_site_dir_is_a_link_error() {
        let l = layout();
        let missing = l.site.join("nope");
        let err = SymlinkLinker
            .relink(&missing, &l.posts, &l.uploads)
            .unwrap_err();
        assert!(matches!(err, LinkError::Create { .. }), "got {err}");
    }
}
