//! Command dispatch: wires settings, services and terminal output

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::CommandFactory;
use clap_complete::generate;
use generational_arena::Index;
use termtree::Tree;
use tracing::{debug, instrument, warn};

use crate::application::services::{FileOutcome, UnravelService};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::Morphology;
use crate::infrastructure::RealFileSystem;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::File {
            input,
            output,
            window_half_length,
        }) => {
            let settings = load_settings(cli, *window_half_length)?;
            cmd_file(&settings, input, output)
        }
        Some(Commands::Dir {
            input_dir,
            output_dir,
            window_half_length,
            sequential,
        }) => {
            let mut settings = load_settings(cli, *window_half_length)?;
            if *sequential {
                settings.parallel = false;
            }
            cmd_dir(&settings, input_dir, output_dir)
        }
        Some(Commands::Info { file }) => {
            let settings = load_settings(cli, None)?;
            cmd_info(&settings, file)
        }
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => cmd_config_show(cli),
            ConfigCommands::Path => cmd_config_path(),
            ConfigCommands::Init { force } => cmd_config_init(*force),
        },
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => {
            Cli::command()
                .print_help()
                .map_err(|e| CliError::io("print help", e))?;
            Ok(())
        }
    }
}

/// Layered settings with the command-line window override on top.
fn load_settings(cli: &Cli, window_half_length: Option<usize>) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(half) = window_half_length {
        settings.window_half_length = half;
    }
    debug!("settings: {:?}", settings);
    Ok(settings)
}

fn service(settings: &Settings) -> UnravelService {
    UnravelService::new(Arc::new(RealFileSystem), settings.unravel_options())
}

#[instrument(skip(settings))]
fn cmd_file(settings: &Settings, input: &Path, output: &Path) -> CliResult<()> {
    let summary = service(settings).unravel_to(input, output)?;
    output::success(&format!("{} -> {}", input.display(), output.display()));
    output::detail(&format!(
        "{} sections, {} points, max displacement {:.3}",
        summary.sections, summary.points, summary.max_displacement
    ));
    Ok(())
}

#[instrument(skip(settings))]
fn cmd_dir(settings: &Settings, input_dir: &Path, output_dir: &Path) -> CliResult<()> {
    let report = service(settings).unravel_dir(
        input_dir,
        output_dir,
        &settings.extensions,
        settings.parallel,
    )?;

    output::header(&format!(
        "Unravelling {} → {}",
        input_dir.display(),
        output_dir.display()
    ));
    for outcome in &report.outcomes {
        let name = outcome
            .input()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| outcome.input().display().to_string());
        match outcome {
            FileOutcome::Unravelled { summary, .. } => output::success_detail(&format!(
                "{} (max displacement {:.3})",
                name, summary.max_displacement
            )),
            FileOutcome::Failed { reason, .. } => {
                warn!("Unravelling {} failed", name);
                warn!("{}", reason);
                output::failure(&name);
            }
        }
    }

    let succeeded = report.succeeded().count();
    output::action(
        "Done",
        &format!("{} of {} files unravelled", succeeded, report.outcomes.len()),
    );
    Ok(())
}

#[instrument(skip(settings))]
fn cmd_info(settings: &Settings, file: &Path) -> CliResult<()> {
    let morphology = service(settings).load(file)?;
    output::info(&section_tree(file, &morphology));
    output::detail(&format!(
        "{} sections, {} leaves, {} points, depth {}, {} soma points",
        morphology.section_count(),
        morphology.leaf_sections().len(),
        morphology.point_count(),
        morphology.depth(),
        morphology.soma().points.len()
    ));
    Ok(())
}

/// Section hierarchy labelled with pre-order ids, types and point counts.
fn section_tree(file: &Path, morphology: &Morphology) -> Tree<String> {
    let positions: HashMap<Index, usize> = morphology
        .iter()
        .enumerate()
        .map(|(pos, (idx, _))| (idx, pos))
        .collect();

    fn build(
        morphology: &Morphology,
        positions: &HashMap<Index, usize>,
        idx: Index,
    ) -> Tree<String> {
        let label = match morphology.section(idx) {
            Some(section) => format!(
                "#{} {} ({} points)",
                positions.get(&idx).copied().unwrap_or_default(),
                section.section_type(),
                section.points().len()
            ),
            None => "?".to_string(),
        };
        let children = morphology
            .section(idx)
            .map(|s| s.children().to_vec())
            .unwrap_or_default();
        Tree::new(label).with_leaves(
            children
                .into_iter()
                .map(|child| build(morphology, positions, child)),
        )
    }

    Tree::new(file.display().to_string()).with_leaves(
        morphology
            .roots()
            .iter()
            .map(|&root| build(morphology, &positions, root)),
    )
}

fn cmd_config_show(cli: &Cli) -> CliResult<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    output::info(&settings.to_toml()?);
    Ok(())
}

fn cmd_config_path() -> CliResult<()> {
    match global_config_path() {
        Some(path) => {
            output::info(&path.display());
            Ok(())
        }
        None => Err(CliError::Usage(
            "cannot determine config directory for this platform".into(),
        )),
    }
}

fn cmd_config_init(force: bool) -> CliResult<()> {
    let path = global_config_path().ok_or_else(|| {
        CliError::Usage("cannot determine config directory for this platform".into())
    })?;
    if path.exists() && !force {
        return Err(CliError::Usage(format!(
            "config already exists: {} (use --force to overwrite)",
            path.display()
        )));
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .map_err(|e| CliError::io(format!("create {}", dir.display()), e))?;
    }
    std::fs::write(&path, Settings::template())
        .map_err(|e| CliError::io(format!("write {}", path.display()), e))?;
    output::action("Created", &path.display());
    Ok(())
}
