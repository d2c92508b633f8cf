//! Process command - associate values in a single document.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use super::{check_resolution_rate, load_config, AssociationArgs};
use crate::input;
use crate::output::{self, OutputFormat};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (.txt or .pdf)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// List every candidate under its anchor (text output)
    #[arg(long)]
    show_candidates: bool,

    /// Fail when fewer than this share of anchors (0.0-1.0) is resolved
    #[arg(long)]
    fail_under: Option<f64>,

    #[command(flatten)]
    association: AssociationArgs,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.association.apply(&mut config)?;
    let associator = args.association.build(&config)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);

    pb.set_message("Reading document...");
    let text = input::load_text(&args.input)?;
    if text.trim().is_empty() {
        warn!("No text found in {}", args.input.display());
    }

    pb.set_message("Associating values...");
    let report = args.association.associate(&associator, &text);
    pb.finish_and_clear();

    let source = args.input.display().to_string();
    let rendered = output::format_report(
        &report,
        &source,
        &config.profile,
        args.format,
        args.show_candidates,
    )?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &rendered)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", rendered.trim_end());
    }

    output::print_summary(&report.diagnostics);
    debug!("Total processing time: {:?}", start.elapsed());

    check_resolution_rate(&report.diagnostics, args.fail_under)
}
