//! `swapsite check-config`

use anyhow::{Context, Result};
use clap::Args;

use super::super::ConfigArgs;

#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

impl CheckConfigArgs {
    pub fn run(self) -> Result<()> {
        let settings = self.config.load()?;
        let rendered = serde_yaml::to_string(&settings.redacted())
            .context("failed to render resolved settings")?;
        print!("{rendered}");
        eprintln!(
            "settings OK (defaults '{}', overrides '{}')",
            self.config.defaults.display(),
            self.config.settings.display()
        );
        Ok(())
    }
}
