//! Command handlers
//!
//! Each handler loads what it needs through the `ServiceContainer` and
//! renders results with `cli::output`. Handlers return the process exit code.

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, info, instrument};

use crate::application::services::{output_path, AugmentRequest};
use crate::cli::args::{Cli, Commands, ConfigCommands, Op};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, OpKind, Settings};
use crate::exitcode;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::{InfraError, InfraResult};

/// Dispatch the parsed command line.
pub fn execute(cli: &Cli) -> CliResult<i32> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see `morphaug --help`".to_string(),
        ));
    };

    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(exitcode::OK);
    }

    let config_dir = match &cli.config_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().map_err(InfraError::WorkingDirectory)?,
    };
    let settings = Settings::load(Some(&config_dir))?;
    debug!("settings: {:?}", settings);
    let container = ServiceContainer::new(settings);

    match command {
        Commands::Perturb {
            input,
            output,
            ops,
            seed,
        } => cmd_perturb(&container, input, output.as_deref(), ops, *seed),
        Commands::Views {
            path,
            count,
            seed,
            output_dir,
        } => cmd_views(&container, path, *count, *seed, output_dir.as_deref()),
        Commands::Inspect { input, tree } => cmd_inspect(&container, input, *tree),
        Commands::Config { command } => cmd_config(&container, command, &config_dir),
        Commands::Completion { .. } => Ok(exitcode::OK),
    }
}

/// Seed from the command line, else the configuration, else a fresh random one.
fn resolve_seed(explicit: Option<u64>, settings: &Settings) -> u64 {
    match explicit.or(settings.seed) {
        Some(seed) => seed,
        None => {
            let seed = rand::random::<u64>();
            info!("no seed configured, using {}", seed);
            seed
        }
    }
}

#[instrument(skip(container))]
fn cmd_perturb(
    container: &ServiceContainer,
    input: &Path,
    destination: Option<&Path>,
    ops: &[Op],
    seed: Option<u64>,
) -> CliResult<i32> {
    let settings = &container.settings;
    settings.validate()?;

    let pipeline = if ops.is_empty() {
        settings.pipeline()
    } else {
        let kinds: Vec<OpKind> = ops.iter().copied().map(OpKind::from).collect();
        settings.pipeline_of(&kinds)
    };
    let seed = resolve_seed(seed, settings);
    let destination = destination.map(Path::to_path_buf).unwrap_or_else(|| {
        output_path(input, settings.output_dir.as_deref(), "_perturbed")
    });

    let outcome = container
        .augment
        .perturb_file(input, &destination, &pipeline, seed)?;

    output::perturb_outcome(&outcome, &pipeline, seed);
    Ok(exitcode::OK)
}

#[instrument(skip(container))]
fn cmd_views(
    container: &ServiceContainer,
    path: &Path,
    count: Option<usize>,
    seed: Option<u64>,
    output_dir: Option<&Path>,
) -> CliResult<i32> {
    let settings = &container.settings;
    settings.validate()?;

    let views = count.unwrap_or(settings.views);
    if views == 0 {
        return Err(CliError::InvalidArgs("--count must be at least 1".to_string()));
    }

    let inputs = container.reconstructions().discover(path)?;
    let input_root = if path.is_dir() {
        Some(path.to_path_buf())
    } else {
        path.parent().map(Path::to_path_buf)
    };
    let request = AugmentRequest {
        inputs,
        input_root,
        pipeline: settings.pipeline(),
        views,
        seed: resolve_seed(seed, settings),
        output_dir: output_dir
            .map(Path::to_path_buf)
            .or_else(|| settings.output_dir.clone()),
    };

    let report = container.augment.run(&request);
    output::batch(&request, &report);

    if report.skipped.is_empty() {
        Ok(exitcode::OK)
    } else {
        Ok(exitcode::PARTIAL)
    }
}

#[instrument(skip(container))]
fn cmd_inspect(container: &ServiceContainer, input: &Path, outline: bool) -> CliResult<i32> {
    let tree = container.reconstructions().load(input)?;

    output::reconstruction(input, &tree, outline);
    Ok(exitcode::OK)
}

fn cmd_config(
    container: &ServiceContainer,
    command: &ConfigCommands,
    config_dir: &Path,
) -> CliResult<i32> {
    match command {
        ConfigCommands::Show => {
            output::plain(&container.settings.to_toml()?);
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".to_string())
                })?
            } else {
                local_config_path(config_dir)
            };
            init_config(container, &path)?;
            output::created(&path);
        }
        ConfigCommands::Path => {
            let global = global_config_path();
            let local = local_config_path(config_dir);
            match global {
                Some(path) => {
                    output::plain(&format!("global: {}{}", path.display(), marker(&path)))
                }
                None => output::plain("global: (unavailable)"),
            }
            output::plain(&format!("local:  {}{}", local.display(), marker(&local)));
        }
    }
    Ok(exitcode::OK)
}

fn init_config(container: &ServiceContainer, path: &Path) -> InfraResult<()> {
    if container.fs.exists(path) {
        return Err(InfraError::ConfigExists(path.to_path_buf()));
    }
    container
        .fs
        .ensure_parent(path)
        .and_then(|()| container.fs.write(path, &Settings::template()))
        .map_err(|e| InfraError::config_write(path, e))
}

fn marker(path: &Path) -> &'static str {
    if path.exists() {
        " (exists)"
    } else {
        ""
    }
}
