//! Static-site generator [`SiteBuilder`].

use std::path::Path;
use std::process::Command;

use crate::command;
use crate::error::BuildError;
use crate::SiteBuilder;

/// Runs `<program> [args..] build --source <src> --destination <dest>`.
///
/// Leading args cover wrappers such as `bundle exec jekyll`.
#[derive(Debug, Clone)]
pub struct GeneratorBuilder {
    program: String,
    args: Vec<String>,
}

impl GeneratorBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for GeneratorBuilder {
    fn default() -> Self {
        Self::new("jekyll")
    }
}

impl SiteBuilder for GeneratorBuilder {
    fn build(&self, source: &Path, destination: &Path) -> Result<(), BuildError> {
        std::fs::create_dir_all(destination).map_err(|source| BuildError::Io {
            path: destination.to_path_buf(),
            source,
        })?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("build")
            .arg("--source")
            .arg(source)
            .arg("--destination")
            .arg(destination);
        let output = command::run(&mut cmd)?;
        tracing::info!(
            "{} built {} into {}",
            self.program,
            source.display(),
            destination.display()
        );
        tracing::debug!("{}", String::from_utf8_lossy(&output.stdout).trim());
        Ok(())
    }
}
