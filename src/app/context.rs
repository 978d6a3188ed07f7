use anyhow::Result;

use crate::{cli::Cli, config::SmokeConfig};

#[derive(Debug, Clone)]
pub struct AppContext {
    pub cfg: SmokeConfig,
    pub verbosity: u8,
}

impl AppContext {
    pub const fn new(cfg: SmokeConfig, verbosity: u8) -> Self {
        Self { cfg, verbosity }
    }

    /// Load config from the environment and apply global CLI overrides.
    /// `SMOKE_VERBOSE` counts as one `-v`.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut cfg = SmokeConfig::load()?;
        if let Some(image) = &cli.image {
            cfg.image.clone_from(image);
        }
        if let Some(runtime) = &cli.runtime {
            cfg.runtime.clone_from(runtime);
        }
        let verbosity = cli.verbose.max(u8::from(cfg.verbose));
        Ok(Self::new(cfg, verbosity))
    }
}
