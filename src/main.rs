use anyhow::{Context, Result, bail};
use clap::Parser;
use console::style;
use sprigfix::config::{self, ConfigSource};
use sprigfix::inserter::TargetOutcome;
use sprigfix::{PatchReport, Patcher, WriteMode, diff};
use std::path::Path;

mod cli;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = cli::Cli::parse();
    let (config, source) = config::resolve(cli.config.as_deref())?;

    if cli.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let Some(file) = cli.file.as_deref() else {
        bail!("no file to patch");
    };

    match &source {
        ConfigSource::File(path) => println!("Recipe: {}", path.display()),
        ConfigSource::BuiltIn => println!("Recipe: built-in"),
    }

    let patcher = Patcher::new(config)?;
    let binding = &patcher.config().inserter.binding.name;
    let mode = if cli.dry_run {
        WriteMode::DryRun
    } else {
        WriteMode::InPlace
    };

    let outcome = patcher
        .patch_file(file, mode)
        .with_context(|| format!("Failed to patch {}", file.display()))?;

    print_report(&outcome.report, binding);

    if cli.dry_run {
        println!("{}", diff::render_diff(&outcome.original, &outcome.text));
        println!("{}", style("Dry run: nothing written.").dim());
    } else {
        print_completion(file, outcome.report.changed);
    }

    if cli.strict {
        outcome.report.require_complete()?;
    }

    Ok(())
}

fn print_report(report: &PatchReport, binding: &str) {
    for (name, outcome) in &report.insertion.outcomes {
        match outcome {
            TargetOutcome::Inserted { line } => {
                println!("{} {binding} to {name} (line {line})", style("Added").green());
            }
            TargetOutcome::AlreadyPresent { .. } => {
                println!("{}", style(format!("{name} already declares {binding}")).dim());
            }
            TargetOutcome::Unterminated { line } => {
                println!(
                    "{} {name} at line {line} has no opening brace",
                    style("warning:").yellow().bold()
                );
            }
            TargetOutcome::NotFound => {
                println!("{} {name} not found", style("warning:").yellow().bold());
            }
        }
    }

    for (name, count) in &report.rewrite.counts {
        if *count == 0 {
            println!(
                "{} pattern '{name}' matched no calls",
                style("warning:").yellow().bold()
            );
        } else {
            println!("{} {count} call(s) with '{name}'", style("Rewrote").green());
        }
    }
}

fn print_completion(file: &Path, changed: bool) {
    if changed {
        println!("{} {}", style("Patched").green().bold(), file.display());
    } else {
        println!("No changes needed for {}", file.display());
    }
}
