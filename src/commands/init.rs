use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::config::{CONFIG_TOML, Config};
use crate::error::ExitError;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory to write idiombot.toml into
    #[arg(default_value = ".")]
    pub dir: PathBuf,
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let path = self.dir.join(CONFIG_TOML);
        if path.exists() && !self.force {
            return Err(ExitError::Config(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            ))
            .into());
        }
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let contents = Config::default().to_toml()?;
        fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote default config");
        println!("Created {}", path.display());
        Ok(())
    }
}
