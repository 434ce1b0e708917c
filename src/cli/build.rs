//! Build and watch command implementations

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_FATAL, EXIT_SUCCESS};
use crate::config::{load_config, merge_cli_overrides, CliOverrides, Mode};
use crate::pipeline::{BuildContext, BuildPipeline};

/// Load configuration, apply overrides, and construct the pipeline.
///
/// Errors here are configuration problems; the caller maps them to the
/// fatal exit code.
fn prepare_pipeline(
    config_path: Option<&Path>,
    overrides: &CliOverrides,
    verbose: bool,
) -> Result<BuildPipeline, String> {
    let (mut config, project_root) =
        load_config(config_path).map_err(|e| e.to_string())?;
    merge_cli_overrides(&mut config, overrides);

    let problems = config.validate();
    if !problems.is_empty() {
        return Err(format!("invalid configuration:\n  - {}", problems.join("\n  - ")));
    }

    let context = BuildContext::new(config, project_root).with_verbose(verbose);
    if verbose {
        println!("Project root: {}", context.project_root.display());
        println!("Source: {}", context.src_dir().display());
        println!("Output: {}", context.out_dir().display());
        println!("Mode: {}", context.config.build.mode);
    }

    let src_dir = context.src_dir();
    if !src_dir.exists() {
        return Err(format!(
            "source directory not found: {} (create it or pass --src)",
            src_dir.display()
        ));
    }

    Ok(BuildPipeline::new(context))
}

/// Run the build command
pub fn run_build(
    config: Option<&Path>,
    out: Option<&Path>,
    src: Option<&Path>,
    mode: Option<Mode>,
    entry: &[PathBuf],
    verbose: bool,
) -> ExitCode {
    let overrides = CliOverrides {
        out: out.map(Path::to_path_buf),
        src: src.map(Path::to_path_buf),
        mode,
        entry: if entry.is_empty() { None } else { Some(entry.to_vec()) },
        ..Default::default()
    };

    let mut pipeline = match prepare_pipeline(config, &overrides, verbose) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    match pipeline.build() {
        Ok(report) => {
            for warning in &report.warnings {
                eprintln!("Warning: {}", warning);
            }
            if report.is_success() {
                println!("{}", report.summary());
                ExitCode::from(EXIT_SUCCESS)
            } else {
                for failure in &report.failures {
                    eprintln!("Error: {}", failure);
                }
                eprintln!("{}", report.summary());
                ExitCode::from(EXIT_ERROR)
            }
        }
        Err(e) => {
            eprintln!("Build error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the watch command
pub fn run_watch(config: Option<&Path>, mode: Option<Mode>, verbose: bool) -> ExitCode {
    let overrides = CliOverrides { mode, ..Default::default() };

    let pipeline = match prepare_pipeline(config, &overrides, verbose) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    println!("Starting watch mode...");
    println!("Press Ctrl+C to stop");
    println!();

    // Failed builds keep the watcher alive; only watcher setup or a dead
    // event channel ends up here.
    match crate::watch::watch_and_rebuild(pipeline) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Watch error: {}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}
