//! Command dispatch

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::ConfigurationService;
use crate::application::sources::parse_schema_entry;
use crate::application::{ApplicationError, ConfigSources};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::MergeMode;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Get { path, raw, args }) => cmd_get(cli, path, *raw, args),
        Some(Commands::TryGet { path }) => cmd_try_get(cli, path),
        Some(Commands::Nodes { path }) => cmd_nodes(cli, path),
        Some(Commands::Tree) => cmd_tree(cli),
        Some(Commands::Dump) => cmd_dump(cli),
        Some(Commands::Config { command }) => cmd_config(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see 'rsconf --help'".to_string(),
        )),
    }
}

fn project_dir(cli: &Cli) -> CliResult<PathBuf> {
    match &cli.project_dir {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir()
            .map_err(|e| CliError::Infra(InfraError::io("current directory", e))),
    }
}

/// Settings from files and environment, with command-line flags on top.
fn effective_settings(cli: &Cli) -> CliResult<Settings> {
    let dir = project_dir(cli)?;
    let mut settings = Settings::load(Some(&dir))?;
    if cli.append {
        settings.merge_mode = MergeMode::Append;
    }
    if cli.expand_env {
        settings.expand_env_on_load = true;
    }
    Ok(settings)
}

fn sources(cli: &Cli, settings: &Settings) -> CliResult<ConfigSources> {
    let sources = if let Some(dir) = &cli.dir {
        ConfigSources::from_dir(dir)?
    } else if !cli.files.is_empty() {
        if cli.schemas.is_empty() {
            ConfigSources::new(cli.files.clone())
        } else {
            let schemas = cli.schemas.iter().map(|s| parse_schema_entry(s)).collect();
            ConfigSources::with_schemas(cli.files.clone(), schemas)?
        }
    } else {
        ConfigSources::from_settings(settings)?
    };

    if sources.is_empty() {
        return Err(CliError::InvalidArgs(
            "no documents: pass --file, --dir, or set 'files' in .rsconf.toml".to_string(),
        ));
    }
    Ok(sources)
}

/// Build the service and load the configured documents.
fn loaded_service(cli: &Cli) -> CliResult<ConfigurationService> {
    let settings = effective_settings(cli)?;
    let sources = sources(cli, &settings)?;
    debug!("loading {} documents", sources.len());

    let container =
        ServiceContainer::with_properties(settings, cli.properties.iter().cloned());
    let mut service = container.configuration_service()?;
    service.load(&sources)?;
    Ok(service)
}

#[instrument(skip(cli))]
fn cmd_get(cli: &Cli, path: &str, raw: bool, args: &[String]) -> CliResult<()> {
    let service = loaded_service(cli)?;
    let value = if raw {
        service.raw_value(path)?
    } else {
        service.value_with_args(path, args)?
    };
    output::info(&value);
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_try_get(cli: &Cli, path: &str) -> CliResult<()> {
    let service = loaded_service(cli)?;
    if let Some(value) = service.try_value(path)? {
        output::info(&value);
    }
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_nodes(cli: &Cli, path: &str) -> CliResult<()> {
    let service = loaded_service(cli)?;
    let nodes = service.nodes(path)?;
    if nodes.is_empty() {
        output::warning(&format!("no nodes at {path}"));
    }
    for node in nodes {
        output::info(&node);
    }
    Ok(())
}

fn cmd_tree(cli: &Cli) -> CliResult<()> {
    let service = loaded_service(cli)?;
    let config = service.current()?;
    output::info(&config.to_tree());
    Ok(())
}

fn cmd_dump(cli: &Cli) -> CliResult<()> {
    let service = loaded_service(cli)?;
    let config = service.current()?;
    for (path, value) in config.entries() {
        output::entry(&path, &value);
    }
    Ok(())
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = effective_settings(cli)?;
            output::info(&settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let target = if *global {
                global_config_path().ok_or_else(|| ApplicationError::Config {
                    message: "cannot determine global config directory".into(),
                })?
            } else {
                local_config_path(&project_dir(cli)?)
            };
            write_template(&target)
        }
        ConfigCommands::Path => {
            output::header("Settings paths");
            match global_config_path() {
                Some(p) => output::detail(&format!("global: {}", p.display())),
                None => output::detail(&"global: <unavailable>"),
            }
            output::detail(&format!(
                "local:  {}",
                local_config_path(&project_dir(cli)?).display()
            ));
            Ok(())
        }
    }
}

fn write_template(target: &Path) -> CliResult<()> {
    if target.exists() {
        return Err(CliError::Usage(format!(
            "config already exists: {}",
            target.display()
        )));
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| InfraError::io(format!("create {}", parent.display()), e))?;
    }
    std::fs::write(target, Settings::template())
        .map_err(|e| InfraError::io(format!("write {}", target.display()), e))?;
    output::action("Created", &target.display());
    Ok(())
}
