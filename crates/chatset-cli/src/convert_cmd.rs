use anyhow::Context;
use std::path::{Path, PathBuf};

use chatset_config::ConvertConfig;
use chatset_convert::{
    convert_file, inspect_file, ConversionReport, ConvertJob, ConvertOptions, DatasetSummary,
    RoleMap,
};
use chatset_types::SYSTEM;

pub(crate) const DEFAULT_INPUT: &str = "dataset.json";

/// Values of the `convert` subcommand that override config.
#[derive(Debug, Default)]
pub(crate) struct ConvertFlags {
    pub(crate) system_role: Option<String>,
    pub(crate) dry_run: bool,
}

pub(crate) fn convert_options(config: &ConvertConfig, flags: &ConvertFlags) -> ConvertOptions {
    let mut overrides = config.roles.clone().unwrap_or_default();
    if let Some(role) = &flags.system_role {
        overrides.insert(SYSTEM.to_string(), role.clone());
    }

    ConvertOptions {
        target: config.target.unwrap_or_default(),
        detect: config.detect.unwrap_or_default(),
        roles: RoleMap::with_overrides(overrides),
        alpaca_pick: config.alpaca_pick.unwrap_or_default(),
        fallback: config.fallback.unwrap_or_default(),
        strict: config.strict.unwrap_or(false),
    }
}

pub(crate) fn convert_job(config: &ConvertConfig, options: &ConvertOptions, dry_run: bool) -> ConvertJob {
    let input = config
        .input
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT));
    let mut job = if config.in_place.unwrap_or(false) {
        ConvertJob::in_place(input)
    } else {
        let output = config
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(options.target.default_output_file()));
        ConvertJob::new(input, output)
    };
    job.dry_run = dry_run;
    job
}

pub(crate) fn run_convert(config: &ConvertConfig, flags: &ConvertFlags) -> anyhow::Result<()> {
    let options = convert_options(config, flags);
    let job = convert_job(config, &options, flags.dry_run);

    let report = convert_file(&job, &options)
        .with_context(|| format!("Failed to convert {}", job.input.display()))?;
    print_report(&job, &options, &report);
    Ok(())
}

fn print_report(job: &ConvertJob, options: &ConvertOptions, report: &ConversionReport) {
    println!(
        "Converted {}/{} records from {} to {}",
        report.converted,
        report.total,
        job.input.display(),
        options.target
    );

    if !report.skipped.is_empty() {
        println!("\nSkipped {} record(s):", report.skipped.len());
        for skipped in &report.skipped {
            println!("  #{:<6} {}", skipped.index, skipped.reason);
        }
    }

    if report.fallback_used {
        println!("\nNo record converted; wrote {} built-in sample(s).", report.written);
    }

    match (&report.output_path, &report.backup_path) {
        (Some(output), Some(backup)) => println!(
            "\nReplaced {} ({} records), original kept at {}",
            output.display(),
            report.written,
            backup.display()
        ),
        (Some(output), None) => {
            println!("\nWrote {} records to {}", report.written, output.display())
        }
        (None, _) => println!(
            "\nDry run: {} records would be written to {}",
            report.written,
            job.output.display()
        ),
    }
}

pub(crate) fn run_inspect(config: &ConvertConfig, input: Option<&Path>) -> anyhow::Result<()> {
    let input = input
        .map(Path::to_path_buf)
        .or_else(|| config.input.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT));
    let summary = inspect_file(&input, config.detect.unwrap_or_default())
        .with_context(|| format!("Failed to inspect {}", input.display()))?;
    print_summary(&input, &summary);
    Ok(())
}

fn print_summary(input: &Path, summary: &DatasetSummary) {
    println!("Dataset: {}", input.display());
    println!("Records: {}", summary.total);
    if summary.first_keys.is_empty() {
        println!("First record keys: (none)");
    } else {
        println!("First record keys: {}", summary.first_keys.join(", "));
    }
    println!();
    for (shape, count) in summary.shape_counts() {
        println!("  {:<14} {:>8}", shape, count);
    }
}
