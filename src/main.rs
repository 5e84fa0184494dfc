use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod provision;

use provision::ProvisionError;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project config file (defaults to provision.toml or .provision.toml in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Container CLI to use (docker, podman, or e.g. "docker --context remote")
    #[arg(long, global = true)]
    container_cli: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pull every configured image that is not present locally (default)
    Pull,
    /// Show the configured images and whether they are present locally
    #[command(visible_alias = "ls")]
    List,
    /// Write a provision.toml with the built-in image list
    Init {
        /// Overwrite an existing provision.toml
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    // Initialize tracing for all commands
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        error!("{:#}", err);
        std::process::exit(exit_code(&err));
    }
}

fn run(cli: &Cli) -> Result<()> {
    let load_settings =
        || config::Settings::load(cli.config.as_deref(), cli.container_cli.as_deref());

    match cli.command.as_ref().unwrap_or(&Commands::Pull) {
        Commands::Init { force } => {
            let cwd = std::env::current_dir()?;
            cli::init::init_config(&cwd, *force)?;
        }
        Commands::Pull => {
            cli::pull::pull_images(&load_settings()?)?;
        }
        Commands::List => {
            cli::list::list_images(&load_settings()?)?;
        }
    }

    Ok(())
}

/// A failed pull exits with the runtime's own status; anything else exits with 1
fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<ProvisionError>()
        .map(ProvisionError::exit_code)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_means_pull() {
        let cli = Cli::try_parse_from(["provision-images"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
        assert!(cli.container_cli.is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "provision-images",
            "list",
            "--container-cli",
            "podman",
            "--config",
            "stack.toml",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::List)));
        assert_eq!(cli.container_cli.as_deref(), Some("podman"));
        assert_eq!(cli.config, Some(PathBuf::from("stack.toml")));
    }

    #[test]
    fn test_exit_code_mapping() {
        let pull_failure = anyhow::Error::new(ProvisionError::PullFailed {
            reference: "b".to_string(),
            code: Some(18),
        });
        assert_eq!(exit_code(&pull_failure), 18);

        let wrapped = pull_failure.context("while provisioning");
        assert_eq!(exit_code(&wrapped), 18);

        assert_eq!(exit_code(&anyhow::anyhow!("bad config")), 1);
    }

    #[test]
    fn test_pull_and_list_load_settings_first() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing.toml");

        for command in ["pull", "list"] {
            let cli = Cli::try_parse_from([
                "provision-images",
                command,
                "--config",
                missing.to_str().unwrap(),
            ])
            .unwrap();

            let err = run(&cli).unwrap_err();
            assert!(err.to_string().contains("does not exist"));
            assert_eq!(exit_code(&err), 1);
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
