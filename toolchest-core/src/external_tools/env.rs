//! Launch helpers for installed tools.
//!
//! Native tools run directly. Tools shipped for a runtime (the Tika jar) are
//! launched through that runtime's executable.

use std::process::Command;
use tracing::debug;

use super::types::InstalledArtifact;

/// Builds a command that runs `artifact`.
///
/// With a `runtime`, the command is `<runtime> -jar <artifact>`.
pub fn command_for(artifact: &InstalledArtifact, runtime: Option<&InstalledArtifact>) -> Command {
    let command = match runtime {
        Some(runtime) => {
            let mut command = Command::new(runtime.path());
            command.arg("-jar").arg(artifact.path());
            command
        }
        None => Command::new(artifact.path()),
    };
    debug!("Command for {}: {:?}", artifact.tool, command);
    command
}
