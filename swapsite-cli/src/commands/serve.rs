//! `swapsite serve`: startup build, then HTTP until ctrl-c.

use anyhow::{Context, Result};
use clap::Args;

use swapsite_daemon::start_blocking;

use super::super::ConfigArgs;

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

impl ServeArgs {
    pub fn run(self) -> Result<()> {
        let settings = self.config.load()?;
        start_blocking(settings).context("swapsite daemon exited with an error")
    }
}
