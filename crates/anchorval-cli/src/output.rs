//! Report formatting: JSON, CSV and a plain text summary.

use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;

use anchorval_core::{AssociationReport, AssociationResult, Diagnostics, LocaleNumericProfile, Resolution};

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON report
    Json,
    /// CSV, one row per anchor
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    /// File extension for outputs in this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// JSON document written for one source file.
#[derive(Serialize)]
struct ReportDocument<'a> {
    source: &'a str,
    processed_at: DateTime<Utc>,
    #[serde(flatten)]
    report: &'a AssociationReport,
}

/// Format a report.
///
/// `show_candidates` lists every candidate under its anchor in text output;
/// JSON always carries them.
pub fn format_report(
    report: &AssociationReport,
    source: &str,
    profile: &LocaleNumericProfile,
    format: OutputFormat,
    show_candidates: bool,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&ReportDocument {
            source,
            processed_at: Utc::now(),
            report,
        })?),
        OutputFormat::Csv => format_csv(report),
        OutputFormat::Text => Ok(format_text(report, source, profile, show_candidates)),
    }
}

fn format_csv(report: &AssociationReport) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "identifier",
        "position",
        "selected_value",
        "confidence",
        "resolution",
        "candidates",
        "duplicate",
    ])?;

    for result in &report.results {
        let duplicate = report
            .duplicate_anchors
            .iter()
            .any(|d| d.identifier == result.anchor.identifier);

        wtr.write_record([
            result.anchor.identifier.as_str(),
            &result.anchor.position.to_string(),
            &result.selected_value.map(|v| v.to_string()).unwrap_or_default(),
            &format!("{:.4}", result.confidence),
            resolution_label(result.resolution),
            &result.candidates_considered.len().to_string(),
            if duplicate { "true" } else { "false" },
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(
    report: &AssociationReport,
    source: &str,
    profile: &LocaleNumericProfile,
    show_candidates: bool,
) -> String {
    let mut output = String::new();

    output.push_str(&format!("Source: {}\n\n", source));

    for result in &report.results {
        output.push_str(&format_result_line(result, profile));

        if show_candidates {
            for (i, scored) in result.candidates_considered.iter().enumerate() {
                let marker = if result.selected_candidate == Some(i) { "*" } else { " " };
                let tags: Vec<String> = scored
                    .candidate
                    .context_tags
                    .iter()
                    .map(|t| t.to_string())
                    .collect();
                output.push_str(&format!(
                    "    {} {:>16}  offset {:>5}  score {:>6.3}  {}\n",
                    marker,
                    scored.candidate.raw_text,
                    scored.candidate.offset_from_anchor,
                    scored.score,
                    tags.join(", ")
                ));
            }
        }
    }

    if !report.duplicate_anchors.is_empty() {
        output.push_str("\nDuplicate anchors:\n");
        for duplicate in &report.duplicate_anchors {
            let positions: Vec<String> = duplicate.positions.iter().map(|p| p.to_string()).collect();
            output.push_str(&format!(
                "  {} at {}\n",
                duplicate.identifier,
                positions.join(", ")
            ));
        }
    }

    output.push('\n');
    output.push_str(&summary_line(&report.diagnostics));
    output.push('\n');
    output
}

fn format_result_line(result: &AssociationResult, profile: &LocaleNumericProfile) -> String {
    match (result.selected_value, result.resolution) {
        (Some(value), Resolution::Fallback) => format!(
            "{:<14} {:>18}  (fallback, confidence {:.2})\n",
            result.anchor.identifier,
            profile.format(value),
            result.confidence
        ),
        (Some(value), _) => format!(
            "{:<14} {:>18}  (confidence {:.2})\n",
            result.anchor.identifier,
            profile.format(value),
            result.confidence
        ),
        (None, _) => format!("{:<14} {:>18}\n", result.anchor.identifier, "unresolved"),
    }
}

fn resolution_label(resolution: Resolution) -> &'static str {
    match resolution {
        Resolution::Resolved => "resolved",
        Resolution::Fallback => "fallback",
        Resolution::Unresolved => "unresolved",
    }
}

/// One-line count summary.
pub fn summary_line(diagnostics: &Diagnostics) -> String {
    format!(
        "{} anchors: {} resolved, {} fallback, {} unresolved, {} duplicate identifiers (average confidence {:.2})",
        diagnostics.total_anchors,
        diagnostics.resolved,
        diagnostics.fallback,
        diagnostics.unresolved,
        diagnostics.duplicate_identifiers,
        diagnostics.average_confidence
    )
}

/// Print the count summary to stderr, keeping stdout for the report.
pub fn print_summary(diagnostics: &Diagnostics) {
    let marker = if diagnostics.unresolved == 0 {
        style("✓").green()
    } else {
        style("!").yellow()
    };
    eprintln!("{} {}", marker, summary_line(diagnostics));
}
