//! Command dispatch: bridges CLI args -> core Device/Coordinator -> output.

pub mod config_cmd;
pub mod detect;
pub mod set;
pub mod status;
pub mod util;
pub mod watch;

use ventaly_config::Config;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts, cfg: Config) -> Result<(), CliError> {
    match cmd {
        Command::Detect(args) => detect::handle(args, global, cfg).await,
        Command::Status(args) => status::handle(&args, global, &cfg).await,
        Command::Set(args) => set::handle(args, global, &cfg).await,
        Command::Watch(args) => watch::handle(&args, global, &cfg).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
