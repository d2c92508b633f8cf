//! Batch command - associate values in many documents.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use anchorval_core::{AssociationReport, Diagnostics, ValueAssociator};

use super::{check_resolution_rate, load_config, AssociationArgs};
use crate::input;
use crate::output::{self, OutputFormat};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Fail when fewer than this share of all anchors (0.0-1.0) is resolved
    #[arg(long)]
    fail_under: Option<f64>,

    #[command(flatten)]
    association: AssociationArgs,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    report: Option<AssociationReport>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.association.apply(&mut config)?;
    let associator = Arc::new(args.association.build(&config)?);

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| input::is_supported(p))
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let mut handles = Vec::with_capacity(files.len());

    for path in files {
        let permit = semaphore.clone().acquire_owned().await?;
        let associator = Arc::clone(&associator);
        let association = args.association.clone();
        let pb = overall_pb.clone();

        handles.push(tokio::task::spawn_blocking(move || {
            let file_start = Instant::now();
            let outcome = process_single_file(&path, &associator, &association);
            drop(permit);
            pb.inc(1);

            let processing_time_ms = file_start.elapsed().as_millis() as u64;
            match outcome {
                Ok(report) => FileResult {
                    path,
                    report: Some(report),
                    error: None,
                    processing_time_ms,
                },
                Err(e) => FileResult {
                    path,
                    report: None,
                    error: Some(format!("{:#}", e)),
                    processing_time_ms,
                },
            }
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await?);
    }

    overall_pb.finish_with_message("Complete");

    if let Some(failed) = results.iter().find(|r| r.error.is_some()) {
        let message = failed.error.as_deref().unwrap_or("unknown error");
        if args.continue_on_error {
            for result in results.iter().filter(|r| r.error.is_some()) {
                warn!(
                    "Failed to process {}: {}",
                    result.path.display(),
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
        } else {
            error!("Failed to process {}: {}", failed.path.display(), message);
            anyhow::bail!("Processing failed for {}: {}", failed.path.display(), message);
        }
    }

    if let Some(ref output_dir) = args.output_dir {
        for result in &results {
            if let Some(report) = &result.report {
                write_output(output_dir, result, report, &args, &config.profile)?;
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let successful = results.iter().filter(|r| r.report.is_some()).count();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    let totals = combine(results.iter().filter_map(|r| r.report.as_ref()).map(|r| &r.diagnostics));

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );
    output::print_summary(&totals);

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    check_resolution_rate(&totals, args.fail_under)
}

fn process_single_file(
    path: &Path,
    associator: &ValueAssociator,
    association: &AssociationArgs,
) -> anyhow::Result<AssociationReport> {
    let text = input::load_text(path)?;
    if text.trim().is_empty() {
        anyhow::bail!("No text extracted from {}", path.display());
    }
    Ok(association.associate(associator, &text))
}

fn write_output(
    output_dir: &Path,
    result: &FileResult,
    report: &AssociationReport,
    args: &BatchArgs,
    profile: &anchorval_core::LocaleNumericProfile,
) -> anyhow::Result<()> {
    let output_name = result
        .path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let output_path = output_dir.join(format!("{}.{}", output_name, args.format.extension()));

    let source = result.path.display().to_string();
    let content = output::format_report(report, &source, profile, args.format, false)?;

    fs::write(&output_path, content)?;
    debug!("Wrote output to {}", output_path.display());
    Ok(())
}

/// Sum per-file diagnostics; the average confidence is weighted by anchors.
fn combine<'a>(all: impl Iterator<Item = &'a Diagnostics>) -> Diagnostics {
    let mut totals = Diagnostics::default();
    let mut confidence_sum = 0.0;

    for d in all {
        totals.total_anchors += d.total_anchors;
        totals.resolved += d.resolved;
        totals.fallback += d.fallback;
        totals.unresolved += d.unresolved;
        totals.duplicate_identifiers += d.duplicate_identifiers;
        confidence_sum += d.average_confidence * d.total_anchors as f64;
    }

    if totals.total_anchors > 0 {
        totals.average_confidence = confidence_sum / totals.total_anchors as f64;
    }
    totals
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "anchors",
        "resolved",
        "fallback",
        "unresolved",
        "duplicate_identifiers",
        "average_confidence",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result.path.file_name().and_then(|s| s.to_str()).unwrap_or("");

        if let Some(report) = &result.report {
            let d = &report.diagnostics;
            wtr.write_record([
                filename,
                "success",
                &d.total_anchors.to_string(),
                &d.resolved.to_string(),
                &d.fallback.to_string(),
                &d.unresolved.to_string(),
                &d.duplicate_identifiers.to_string(),
                &format!("{:.4}", d.average_confidence),
                &result.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                "",
                "",
                &result.processing_time_ms.to_string(),
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_weights_confidence_by_anchors() {
        let a = Diagnostics {
            total_anchors: 3,
            resolved: 3,
            average_confidence: 1.0,
            ..Default::default()
        };
        let b = Diagnostics {
            total_anchors: 1,
            unresolved: 1,
            duplicate_identifiers: 1,
            average_confidence: 0.0,
            ..Default::default()
        };

        let totals = combine([&a, &b].into_iter());
        assert_eq!(totals.total_anchors, 4);
        assert_eq!(totals.resolved, 3);
        assert_eq!(totals.unresolved, 1);
        assert_eq!(totals.duplicate_identifiers, 1);
        assert_eq!(totals.average_confidence, 0.75);
    }
}
