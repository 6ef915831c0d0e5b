mod cli;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use hotswap_core::{Engine, EngineSettings};
use hotswap_platform::InstallPaths;
use log::error;

use crate::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    logging::init_logging(&log_dir, cli.verbose);

    let settings = match &cli.settings {
        Some(path) => match EngineSettings::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                error!("{err}");
                return ExitCode::FAILURE;
            }
        },
        None => EngineSettings::default(),
    };

    let paths = match InstallPaths::new(cli.target_dir.as_deref()) {
        Ok(paths) => paths,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut engine = Engine::new(paths, settings);
    if let Some(name) = own_executable_name() {
        engine.protect(&name);
    }

    let report = engine.run(&cli.request()).await;
    ExitCode::from(report.exit_code())
}

fn own_executable_name() -> Option<String> {
    let exe = std::env::current_exe().ok()?;
    exe.file_name()?.to_str().map(str::to_string)
}
