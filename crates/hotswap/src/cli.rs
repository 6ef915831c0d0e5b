use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use hotswap_core::{UpdateMode, UpdateRequest};

#[derive(Parser, Debug)]
#[command(name = "updater", version)]
#[command(about = "Apply an update package to an installed application", long_about = None)]
pub struct Cli {
    /// Update package, relative to the target directory unless absolute
    pub package: PathBuf,

    #[arg(long = "type", value_enum, default_value_t = ModeArg::Full)]
    pub mode: ModeArg,

    /// Installation directory (defaults to the current directory)
    #[arg(long)]
    pub target_dir: Option<PathBuf>,

    /// Program to launch from the installation after a successful update
    #[arg(long)]
    pub restart: Option<String>,

    /// Wait for this process to exit before touching any file
    #[arg(long)]
    pub wait_pid: Option<u32>,

    /// Expected SHA-256 of the package
    #[arg(long)]
    pub sha256: Option<String>,

    /// JSON file overriding engine timeouts, retries and the skip list
    #[arg(long)]
    pub settings: Option<PathBuf>,

    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Incremental,
    Full,
}

impl From<ModeArg> for UpdateMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Incremental => Self::Incremental,
            ModeArg::Full => Self::Full,
        }
    }
}

impl Cli {
    #[must_use]
    pub fn request(&self) -> UpdateRequest {
        UpdateRequest {
            package: self.package.clone(),
            mode: self.mode.into(),
            restart: self.restart.clone(),
            wait_pid: self.wait_pid,
            expected_sha256: self.sha256.clone(),
        }
    }
}
