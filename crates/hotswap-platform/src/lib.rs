mod commands;
pub mod paths;
mod process;

pub use commands::{Detach, spawn_detached};
pub use paths::{InstallPaths, PathsError};
pub use process::{ProcessProbe, SystemProbe};
