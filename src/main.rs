//! `winctl`: command-line front end for service, registry and launch operations.
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`);
//! `-v` raises the default to `debug`.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use winctl::registry::{Mismatch, OnError, ValueKind};
use winctl::service::StartMode;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "winctl", version, about = "Control Windows services, registry values and programs")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Query and control services.
    #[command(subcommand)]
    Service(ServiceCommand),
    /// Read, write and delete registry values.
    #[command(subcommand)]
    Registry(RegistryCommand),
    /// Launch a program.
    Launch(LaunchArgs),
}

#[derive(Debug, Subcommand)]
enum ServiceCommand {
    /// Print the current status.
    Status { name: String },
    /// Request a start, forwarding any extra arguments to the service.
    Start {
        #[arg(allow_hyphen_values = true)]
        name: String,
        /// Passed through unchanged, including ones that start with '-'.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Request a stop.
    Stop { name: String },
    /// Request a pause.
    Pause { name: String },
    /// Change the persisted start mode (boot, system, auto, manual, disabled).
    SetStartup { name: String, mode: StartMode },
    /// Print the persisted start mode.
    StartupType { name: String },
}

#[derive(Debug, Subcommand)]
enum RegistryCommand {
    /// Print a value if it exists with the expected kind.
    ///
    /// Exits 1 when the value is absent and 2 when it has another kind.
    Get {
        path: String,
        name: String,
        #[arg(long)]
        kind: ValueKind,
        /// Delete the value if its kind does not match.
        #[arg(long, default_value_t = false)]
        delete_on_mismatch: bool,
        /// Expand environment references in REG_EXPAND_SZ data.
        #[arg(long, default_value_t = false)]
        expand: bool,
    },
    /// Print whether a value exists.
    Exists { path: String, name: String },
    /// Write a value, creating the key if needed.
    Set {
        path: String,
        name: String,
        #[arg(long)]
        kind: ValueKind,
        #[arg(required = true)]
        data: Vec<String>,
    },
    /// Delete values under a key; exits 1 if any deletion failed.
    DeleteValues(BulkArgs),
    /// Delete subkeys and everything below them; exits 1 if any deletion failed.
    DeleteKeys(BulkArgs),
}

#[derive(Debug, Args)]
struct BulkArgs {
    path: String,
    #[arg(required = true)]
    names: Vec<String>,
    /// Stop at the first failure instead of continuing.
    #[arg(long, default_value_t = false)]
    abort_on_error: bool,
}

impl BulkArgs {
    fn policy(&self) -> OnError {
        if self.abort_on_error {
            OnError::Abort
        } else {
            OnError::Continue
        }
    }
}

#[derive(Debug, Args)]
struct LaunchArgs {
    #[arg(allow_hyphen_values = true)]
    program: String,
    /// Passed through unchanged, including ones that start with '-'.
    /// Launch options must come before the program.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
    /// Working directory for the program.
    #[arg(long)]
    cwd: Option<String>,
    /// Do not show a window.
    #[arg(long, default_value_t = false)]
    hidden: bool,
    /// Run through the elevation prompt.
    #[arg(long, default_value_t = false)]
    elevated: bool,
    /// Wait for exit and return the program's exit code.
    #[arg(long, default_value_t = false)]
    wait: bool,
}

fn mismatch_policy(delete: bool) -> Mismatch {
    if delete {
        Mismatch::Delete
    } else {
        Mismatch::Keep
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    run(cli)
}

#[cfg(not(windows))]
fn run(_cli: Cli) -> Result<ExitCode> {
    anyhow::bail!("winctl only runs on Windows")
}

#[cfg(windows)]
fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Service(cmd) => commands::service(cmd),
        Commands::Registry(cmd) => commands::registry(cmd),
        Commands::Launch(args) => commands::launch(args),
    }
}

#[cfg(windows)]
mod commands {
    use super::{mismatch_policy, BulkArgs, LaunchArgs, RegistryCommand, ServiceCommand};
    use anyhow::{Context, Result};
    use std::process::ExitCode;
    use tracing::warn;
    use winctl::process::Launcher;
    use winctl::registry::{self, Lookup, Value};
    use winctl::service;

    pub(super) fn service(cmd: ServiceCommand) -> Result<ExitCode> {
        match cmd {
            ServiceCommand::Status { name } => {
                println!("{}", service::status(&name)?);
            }
            ServiceCommand::Start { name, args } => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                service::start(&name, &args)?;
            }
            ServiceCommand::Stop { name } => service::stop(&name)?,
            ServiceCommand::Pause { name } => service::pause(&name)?,
            ServiceCommand::SetStartup { name, mode } => {
                service::set_startup_type(&name, mode)
                    .with_context(|| format!("setting start mode of '{name}' to {mode}"))?;
            }
            ServiceCommand::StartupType { name } => {
                println!("{}", service::startup_type(&name)?);
            }
        }
        Ok(ExitCode::SUCCESS)
    }

    pub(super) fn registry(cmd: RegistryCommand) -> Result<ExitCode> {
        match cmd {
            RegistryCommand::Get {
                path,
                name,
                kind,
                delete_on_mismatch,
                expand,
            } => {
                let policy = mismatch_policy(delete_on_mismatch);
                match registry::get_value(&path, &name, kind, policy)? {
                    Lookup::Present(value) => {
                        let value = if expand { value.expand()? } else { value };
                        println!("{value}");
                        Ok(ExitCode::SUCCESS)
                    }
                    Lookup::Absent => Ok(ExitCode::from(1)),
                    Lookup::WrongKind => {
                        warn!(%path, %name, %kind, "value exists with another kind");
                        Ok(ExitCode::from(2))
                    }
                }
            }
            RegistryCommand::Exists { path, name } => {
                println!("{}", registry::value_exists(&path, &name)?);
                Ok(ExitCode::SUCCESS)
            }
            RegistryCommand::Set {
                path,
                name,
                kind,
                data,
            } => {
                let data: Vec<&str> = data.iter().map(String::as_str).collect();
                let value = Value::parse_as(kind, &data)?;
                registry::set_value(&path, &name, &value)?;
                Ok(ExitCode::SUCCESS)
            }
            RegistryCommand::DeleteValues(args) => {
                bulk(&args, registry::delete_values(&args.path, &args.names, args.policy())?)
            }
            RegistryCommand::DeleteKeys(args) => {
                bulk(&args, registry::delete_subtrees(&args.path, &args.names, args.policy())?)
            }
        }
    }

    fn bulk(args: &BulkArgs, failed: bool) -> Result<ExitCode> {
        if failed {
            warn!(path = %args.path, "one or more deletions failed");
            Ok(ExitCode::FAILURE)
        } else {
            Ok(ExitCode::SUCCESS)
        }
    }

    pub(super) fn launch(args: LaunchArgs) -> Result<ExitCode> {
        let mut launcher = Launcher::new(&args.program).args(args.args);
        if let Some(dir) = args.cwd {
            launcher = launcher.current_dir(dir);
        }
        if args.hidden {
            launcher = launcher.hidden();
        }
        if args.elevated {
            launcher = launcher.elevated();
        }
        if args.wait {
            launcher = launcher.wait();
        }

        let launched = launcher
            .launch()
            .with_context(|| format!("launching '{}'", args.program))?;
        match launched.exit_code {
            Some(code) => Ok(ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX))),
            None => {
                println!("{}", launched.pid);
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set_startup() {
        let cli = Cli::try_parse_from(["winctl", "service", "set-startup", "Spooler", "disabled"])
            .unwrap();
        match cli.command {
            Commands::Service(ServiceCommand::SetStartup { name, mode }) => {
                assert_eq!(name, "Spooler");
                assert_eq!(mode, StartMode::Disabled);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    fn launch_args(argv: &[&str]) -> (bool, LaunchArgs) {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Launch(args) => (cli.verbose, args),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_launch_passes_hyphen_arguments_through() {
        let (verbose, args) = launch_args(&["winctl", "launch", "tool.exe", "-v", "--quiet"]);
        assert!(!verbose);
        assert_eq!(args.program, "tool.exe");
        assert_eq!(args.args, ["-v", "--quiet"]);

        let (_, args) = launch_args(&["winctl", "launch", "setup.exe", "/S", "--quiet"]);
        assert_eq!(args.args, ["/S", "--quiet"]);
    }

    #[test]
    fn test_launch_options_before_program() {
        let (verbose, args) = launch_args(&[
            "winctl", "-v", "launch", "--wait", "--hidden", "setup.exe", "--wait",
        ]);
        assert!(verbose);
        assert!(args.wait);
        assert!(args.hidden);
        assert_eq!(args.args, ["--wait"]);
    }

    #[test]
    fn test_service_start_passes_hyphen_arguments_through() {
        let cli =
            Cli::try_parse_from(["winctl", "service", "start", "Svc", "-v", "--debug"]).unwrap();
        assert!(!cli.verbose);
        match cli.command {
            Commands::Service(ServiceCommand::Start { name, args }) => {
                assert_eq!(name, "Svc");
                assert_eq!(args, ["-v", "--debug"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_mode() {
        assert!(
            Cli::try_parse_from(["winctl", "service", "set-startup", "Spooler", "later"]).is_err()
        );
    }

    #[test]
    fn test_parse_bulk_policy() {
        let cli = Cli::try_parse_from([
            "winctl",
            "registry",
            "delete-values",
            r"HKEY_CURRENT_USER\Software\Vendor",
            "a",
            "b",
            "--abort-on-error",
        ])
        .unwrap();
        match cli.command {
            Commands::Registry(RegistryCommand::DeleteValues(args)) => {
                assert_eq!(args.names, ["a", "b"]);
                assert_eq!(args.policy(), OnError::Abort);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_get_kind() {
        let cli = Cli::try_parse_from([
            "winctl",
            "registry",
            "get",
            r"HKEY_LOCAL_MACHINE\SOFTWARE\Vendor",
            "Retries",
            "--kind",
            "dword",
            "--delete-on-mismatch",
        ])
        .unwrap();
        match cli.command {
            Commands::Registry(RegistryCommand::Get {
                kind,
                delete_on_mismatch,
                ..
            }) => {
                assert_eq!(kind, ValueKind::DWord);
                assert_eq!(mismatch_policy(delete_on_mismatch), Mismatch::Delete);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
