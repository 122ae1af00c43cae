//! Layered YAML settings.
//!
//! # Storage layout
//!
//! ```text
//! ./defaults.yml   (required: full set of values)
//! ./settings.yml   (optional: deep-merged over defaults)
//! ```
//!
//! # API pattern
//!
//! - `load_at(defaults, overrides)`: explicit paths; used in tests with `TempDir`
//! - `load()`: uses the conventional paths relative to the working directory

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::ConfigError;
use crate::types::SourceKind;

pub const DEFAULT_SETTINGS_PATH: &str = "./defaults.yml";
pub const SETTINGS_PATH: &str = "./settings.yml";

const REDACTED: &str = "********";

// ---------------------------------------------------------------------------
// 1. Schema
// ---------------------------------------------------------------------------

/// Root of the settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub app: AppSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    pub remote: RemoteSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub paths: PathSettings,
    #[serde(default)]
    pub generator: GeneratorSettings,
}

/// Where the two content sources live upstream.
///
/// Repo URLs are templates: the first `%s` receives the username, the
/// second the password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSettings {
    pub site_repo: String,
    pub posts_repo: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

impl fmt::Debug for RemoteSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSettings")
            .field("site_repo", &self.site_repo)
            .field("posts_repo", &self.posts_repo)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("default_branch", &self.default_branch)
            .finish()
    }
}

impl RemoteSettings {
    /// Remote URL for a source with credentials substituted in.
    pub fn url_for(&self, kind: SourceKind) -> String {
        let template = match kind {
            SourceKind::Site => &self.site_repo,
            SourceKind::Posts => &self.posts_repo,
        };
        expand_credentials(template, &self.username, &self.password)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub listen: SocketAddr,
    pub webhook_path: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            webhook_path: "/__updateposts__".to_string(),
        }
    }
}

/// On-disk layout: working copies and the two build slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Working copy of the site source; also the generator's input tree.
    pub site_dir: PathBuf,
    /// Working copy of the posts source.
    pub posts_repo_dir: PathBuf,
    pub build_a: PathBuf,
    pub build_b: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            site_dir: PathBuf::from("./jekyll"),
            posts_repo_dir: PathBuf::from("./posts"),
            build_a: PathBuf::from("./BUILD_A"),
            build_b: PathBuf::from("./BUILD_B"),
        }
    }
}

impl PathSettings {
    /// `<posts_repo_dir>/posts`
    pub fn posts_dir(&self) -> PathBuf {
        self.posts_repo_dir.join("posts")
    }

    /// `<posts_repo_dir>/uploads`
    pub fn uploads_dir(&self) -> PathBuf {
        self.posts_repo_dir.join("uploads")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub program: String,
    /// Inserted before `build`, e.g. `[exec, jekyll]` with `program: bundle`.
    pub args: Vec<String>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            program: "jekyll".to_string(),
            args: Vec::new(),
        }
    }
}

fn default_branch() -> String {
    "master".to_string()
}

impl Settings {
    /// Copy with the password masked, for display.
    pub fn redacted(&self) -> Settings {
        let mut copy = self.clone();
        if !copy.app.remote.password.is_empty() {
            copy.app.remote.password = REDACTED.to_string();
        }
        copy
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let remote = &self.app.remote;
        if remote.site_repo.trim().is_empty() {
            return Err(invalid("app.remote.site_repo", "must not be empty"));
        }
        if remote.posts_repo.trim().is_empty() {
            return Err(invalid("app.remote.posts_repo", "must not be empty"));
        }
        if remote.default_branch.trim().is_empty() {
            return Err(invalid("app.remote.default_branch", "must not be empty"));
        }
        let hook = &self.app.server.webhook_path;
        if !hook.starts_with('/') || hook.len() < 2 {
            return Err(invalid(
                "app.server.webhook_path",
                format!("must be an absolute path other than `/`, got `{hook}`"),
            ));
        }
        let paths = &self.app.paths;
        if paths.build_a == paths.build_b {
            return Err(invalid("app.paths.build_b", "must differ from app.paths.build_a"));
        }
        if self.app.generator.program.trim().is_empty() {
            return Err(invalid("app.generator.program", "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load `defaults`, deep-merge `overrides` over it when present, and validate.
///
/// Returns `ConfigError::NotFound` if `defaults` is absent,
/// `ConfigError::Parse` (with path + line context) if either file is malformed.
pub fn load_at(defaults: &Path, overrides: &Path) -> Result<Settings, ConfigError> {
    if !defaults.exists() {
        return Err(ConfigError::NotFound {
            path: defaults.to_path_buf(),
        });
    }
    let mut doc = read_yaml(defaults)?;
    if overrides.exists() {
        merge(&mut doc, read_yaml(overrides)?);
    }
    let settings: Settings = serde_yaml::from_value(doc).map_err(ConfigError::Schema)?;
    settings.validate()?;
    Ok(settings)
}

/// `load_at` with the conventional paths.
pub fn load() -> Result<Settings, ConfigError> {
    load_at(Path::new(DEFAULT_SETTINGS_PATH), Path::new(SETTINGS_PATH))
}

fn read_yaml(path: &Path) -> Result<Value, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Mappings merge key by key; any other overlay value replaces the base.
/// A null overlay (empty file, bare key) leaves the base untouched.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// 3. Credentials
// ---------------------------------------------------------------------------

/// Substitute `%s` placeholders positionally: username first, then password.
/// Extra placeholders are left as-is.
fn expand_credentials(template: &str, username: &str, password: &str) -> String {
    let mut values = [username, password].into_iter();
    let mut out = String::with_capacity(template.len() + username.len() + password.len());
    let mut rest = template;
    while let Some(idx) = rest.find("%s") {
        out.push_str(&rest[..idx]);
        match values.next() {
            Some(value) => out.push_str(value),
            None => out.push_str("%s"),
        }
        rest = &rest[idx + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_fill_placeholders_in_order() {
        assert_eq!(
            expand_credentials("https://%s:%s@host/repo.git", "bot", "pw"),
            "https://bot:pw@host/repo.git"
        );
    }

    #[test]
    fn credentials_without_placeholders_pass_through() {
        assert_eq!(
            expand_credentials("git@host:site.git", "bot", "pw"),
            "git@host:site.git"
        );
    }

    #[test]
    fn credentials_extra_placeholder_is_kept() {
        assert_eq!(expand_credentials("%s/%s/%s", "u", "p"), "u/p/%s");
    }

    #[test]
    fn merge_recurses_into_mappings() {
        let mut base: Value = serde_yaml::from_str("a: {b: 1, c: 2}\nd: 3").unwrap();
        let overlay: Value = serde_yaml::from_str("a: {c: 20}\ne: 5").unwrap();
        merge(&mut base, overlay);
        let expected: Value = serde_yaml::from_str("a: {b: 1, c: 20}\nd: 3\ne: 5").unwrap();
        assert_eq!(base, expected);
    }

    #[test]
    fn merge_ignores_null_overlay() {
        let mut base: Value = serde_yaml::from_str("a: 1").unwrap();
        merge(&mut base, Value::Null);
        assert_eq!(base, serde_yaml::from_str::<Value>("a: 1").unwrap());
    }

    #[test]
    fn debug_output_hides_password() {
        let remote = RemoteSettings {
            site_repo: "s".into(),
            posts_repo: "p".into(),
            username: "bot".into(),
            password: "hunter2".into(),
            default_branch: default_branch(),
        };
        let rendered = format!("{remote:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains(REDACTED));
    }
}
