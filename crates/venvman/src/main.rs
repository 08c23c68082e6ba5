mod cli;
mod logging;

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use venvman::{DriverStatus, VenvError, VenvManager};
use venvman_platform::AppPaths;

use cli::{Cli, Commands};

const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;

#[derive(Serialize)]
struct Listing<'a> {
    driver: &'static str,
    environments: &'a [String],
}

#[derive(Serialize)]
struct DriverReport<'a> {
    selected: Option<&'static str>,
    drivers: &'a [DriverStatus],
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let log_file = cli.log_file.clone().or_else(|| {
        cli.log
            .then(|| AppPaths::new().ok().map(|paths| paths.log_file()))
            .flatten()
    });
    logging::init_logging(cli.verbose, log_file.as_deref(), MAX_LOG_SIZE);

    if let Err(e) = run(cli.command).await {
        log::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<(), VenvError> {
    let manager = VenvManager::from_env()?.with_cached_selection();

    match command {
        Commands::List { json } => {
            let names = manager.list_virtual_envs().await?;
            if json {
                let listing = Listing {
                    driver: manager.driver_name().await?,
                    environments: &names,
                };
                print_json(&listing)?;
            } else {
                for name in names {
                    println!("{name}");
                }
            }
        }
        Commands::Make(args) => {
            let path = manager.make_virtual_env_with(&args.name, &args.options()).await?;
            println!("{}", path.display());
        }
        Commands::Remove { name, discard } => {
            if discard {
                manager.discard_virtual_env(&name).await?;
            } else {
                manager.remove_virtual_env(&name).await?;
            }
        }
        Commands::Resolve { name } => {
            let path = manager.resolve_virtual_env(&name).await?;
            println!("{}", path.display());
        }
        Commands::Ensure {
            name,
            version,
            force,
        } => {
            let path = manager
                .ensure_virtual_env(&name, version.as_deref(), force)
                .await?;
            println!("{}", path.display());
        }
        Commands::PythonVersion { path } => {
            println!("{}", manager.python_version(&path).await?);
        }
        Commands::Driver => println!("{}", manager.driver_name().await?),
        Commands::Drivers { json } => {
            let statuses = manager.driver_statuses().await;
            let selected = manager.driver_name().await.ok();
            if json {
                print_json(&DriverReport {
                    selected,
                    drivers: &statuses,
                })?;
            } else {
                print_statuses(&statuses, selected);
            }
        }
        Commands::Check => {
            let output = manager.check_environment().await?;
            if !output.stdout.is_empty() {
                println!("{}", output.stdout);
            }
            if !output.stderr.is_empty() {
                eprint!("{}", output.stderr);
            }
            if !output.success() {
                let setup = manager
                    .settings()
                    .setup_file
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("the shell rc file"));
                return Err(VenvError::Execution {
                    command: format!(". {}", setup.display()),
                    status: output.status,
                    output: output.diagnostic().to_string(),
                });
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), VenvError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| VenvError::parse("json output", e.to_string()))?;
    println!("{text}");
    Ok(())
}

fn print_statuses(statuses: &[DriverStatus], selected: Option<&str>) {
    let width = statuses
        .iter()
        .map(|status| status.name.len())
        .max()
        .unwrap_or(0);

    for status in statuses {
        let marker = if Some(status.name) == selected { "*" } else { " " };
        let state = if status.available {
            "available".to_string()
        } else {
            format!(
                "unavailable: {}",
                status.reason.as_deref().unwrap_or("unknown reason")
            )
        };
        println!("{marker} {:width$}  {state}", status.name);
    }
}
