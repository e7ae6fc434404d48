//! Toolchest command-line front-end.
//!
//! Installs the managed native tools and reports where they live.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use toolchest_core::{
    ExternalToolManager, PlatformTag, ProvisionConfig, ToolId, ToolStatus,
};

#[derive(Debug, Parser)]
#[command(name = "toolchest", version, about = "Install pinned native tools")]
struct Cli {
    /// Directory to install tools into.
    #[arg(long, global = true, env = "TOOLCHEST_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// JSON config file; flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Maximum number of concurrent installs.
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    /// Overall deadline for an install run, in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Install for this platform (e.g. linux-64) instead of the host.
    #[arg(long, global = true)]
    platform: Option<PlatformTag>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Install tools (all of them when none are named).
    Install {
        #[arg(value_name = "TOOL")]
        tools: Vec<ToolId>,
    },
    /// Show the install status of every tool.
    Status,
    /// Print the executable path of an installed tool.
    Path {
        #[arg(value_name = "TOOL")]
        tool: ToolId,
    },
}

impl Cli {
    fn provision_config(&self) -> Result<ProvisionConfig> {
        let mut config = match &self.config {
            Some(path) => ProvisionConfig::load(path)?,
            None => ProvisionConfig::from_env(),
        };
        if let Some(data_dir) = &self.data_dir {
            config = config.with_data_dir(data_dir);
        }
        if let Some(jobs) = self.jobs {
            config = config.with_max_concurrency(jobs);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_install_timeout(Duration::from_secs(timeout));
        }
        if let Some(platform) = self.platform {
            config = config.with_platform(platform);
        }
        Ok(config)
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(format!(
                "warn,toolchest={level},toolchest_core={level}"
            ))
        });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tracing::debug!("Starting toolchest v{}", toolchest_core::VERSION);

    let config = cli.provision_config()?;
    let manager = ExternalToolManager::new(config)?;

    match cli.command {
        Command::Install { tools } => {
            let report = if tools.is_empty() {
                manager.install_all_report().await
            } else {
                manager.install_tools(&tools).await
            };
            for (id, result) in report.iter() {
                match result {
                    Ok(artifact) => println!("{:<8} {}", id, artifact.path().display()),
                    Err(e) => eprintln!("{:<8} FAILED ({}): {}", id, e.step(), e),
                }
            }
            Ok(exit_code(report.success()))
        }
        Command::Status => {
            for info in manager.list_tools() {
                let status = match &info.status {
                    ToolStatus::Installed { path } => path.display().to_string(),
                    ToolStatus::NotInstalled => "not installed".to_string(),
                    ToolStatus::UnsupportedPlatform => "unsupported on this platform".to_string(),
                };
                println!(
                    "{:<8} {:<10} {}",
                    info.definition.id, info.definition.version, status
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Path { tool } => match manager.executable_path(tool) {
            Some(path) => {
                println!("{}", path.display());
                Ok(ExitCode::SUCCESS)
            }
            None => {
                eprintln!("{} is not installed", tool);
                Ok(exit_code(false))
            }
        },
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "toolchest",
            "install",
            "ffprobe",
            "tika",
            "--data-dir",
            "/srv/tools",
            "--jobs",
            "2",
            "--timeout",
            "300",
            "--platform",
            "darwin-64",
        ])
        .unwrap();

        let config = cli.provision_config().unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/tools"));
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.install_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(config.platform, Some(PlatformTag::DARWIN_64));
        match cli.command {
            Command::Install { tools } => assert_eq!(tools, vec![ToolId::Ffprobe, ToolId::Tika]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_tool_rejected() {
        assert!(Cli::try_parse_from(["toolchest", "path", "photoshop"]).is_err());
    }
}
