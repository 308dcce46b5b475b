//! atomic-caldera - Atomic Red Team to Caldera ability converter

#![forbid(unsafe_code)]

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use atomic_caldera::cli::Cli;
use atomic_caldera::config::Config;
use atomic_caldera::preflight::run_preflight;
use atomic_caldera::prompt::{AssumeYes, Confirm, LinePrompt};
use atomic_caldera::taxonomy::StixCatalog;
use atomic_caldera::{Error, convert};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(err) = main_impl() {
        print_error_with_hints(&err);
        std::process::exit(1);
    }
}

fn main_impl() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = match Config::from_cli(&cli, &cwd) {
        Ok(config) => config,
        Err(err) => {
            print_help();
            return Err(err.into());
        }
    };

    let report = run_preflight(&config);
    tracing::debug!(overall = %report.overall, "Preflight finished");
    if !report.passed() {
        print_help();
        eprint!("\n{}", report.render_text());
        return Err(Error::preflight(report.failure_summary()).into());
    }

    if report.existing_abilities > 0 {
        tracing::warn!(
            count = report.existing_abilities,
            path = %config.abilities_dir().display(),
            "Output directory already contains abilities"
        );
        println!(
            "The output directory {} already contains {} abilities.",
            config.abilities_dir().display(),
            report.existing_abilities
        );
        let question = "Would you like to continue?";
        let proceed = if config.assume_yes {
            AssumeYes.confirm(question)?
        } else {
            LinePrompt::stdio().confirm(question)?
        };
        if !proceed {
            println!("You chose not to continue. Exiting.");
            return Ok(());
        }
    }

    let catalog = StixCatalog::open(&config.cti_dir)?;
    tracing::info!(techniques = catalog.len(), "CTI catalog indexed");

    let summary = convert::run_with_progress(&config, &catalog, |path| {
        println!("Processing: {}", path.display());
    })?;
    println!("\n{summary}");
    Ok(())
}

fn print_help() {
    let mut stderr = io::stderr();
    let _ = Cli::command().write_help(&mut stderr);
    let _ = writeln!(stderr);
}

fn print_error_with_hints(err: &anyhow::Error) {
    for cause in err.chain() {
        if let Some(error) = cause.downcast_ref::<Error>() {
            eprint!("{}", atomic_caldera::error_hints::format_error_with_hints(error));
            return;
        }
    }

    eprintln!("{err}");
}
