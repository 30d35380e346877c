//! Markdown and JSON report generation.
//!
//! This module renders a [`SessionReport`] as a Markdown document or as
//! pretty-printed JSON.

use super::{AttentionRow, CardRow, EntityReport, ReportMetadata, SessionReport};
use crate::cli::OutputFormat;
use crate::models::TrafficLight;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &SessionReport) -> String {
    let mut output = String::new();

    // Title
    output.push_str(&format!(
        "# Health Check Report: {}\n\n",
        report.metadata.session.name
    ));

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_attention_section(&report.needs_attention));
    output.push_str(&generate_entity_section("Teams", &report.teams));
    output.push_str(&generate_entity_section("Departments", &report.departments));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Session:** {} (#{})\n",
        metadata.session.name, metadata.session.id
    ));
    section.push_str(&format!(
        "- **Session Date:** {}\n",
        metadata.session.date.format("%Y-%m-%d")
    ));
    if !metadata.session.is_active {
        section.push_str("- **Status:** closed\n");
    }
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(pct) = metadata.participation_pct {
        section.push_str(&format!("- **Participation:** {:.1}%\n", pct));
    }
    section.push_str(&format!(
        "- **Complete:** {}\n",
        if metadata.session_complete { "yes" } else { "no" }
    ));
    section.push_str(&format!(
        "- **Teams Reported:** {}\n",
        metadata.teams_reported
    ));
    section.push_str(&format!(
        "- **Departments Reported:** {}\n",
        metadata.departments_reported
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &SessionReport) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");

    if !report.needs_attention.is_empty() {
        toc.push_str("- [Needs Attention](#needs-attention)\n");
    }

    toc.push_str("- [Teams](#teams)\n");
    for team in &report.teams {
        toc.push_str(&format!("  - [{}](#{})\n", team.name, anchor(&team.name)));
    }

    toc.push_str("- [Departments](#departments)\n");
    for department in &report.departments {
        toc.push_str(&format!(
            "  - [{}](#{})\n",
            department.name,
            anchor(&department.name)
        ));
    }

    toc.push('\n');

    toc
}

fn anchor(name: &str) -> String {
    name.replace(['/', '.', ' ', '&'], "-").to_lowercase()
}

/// Generate the "needs attention" table.
fn generate_attention_section(rows: &[AttentionRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Needs Attention\n\n");
    section.push_str("| Team | Card | Status | Red | Amber |\n");
    section.push_str("|:---|:---|:---:|:---:|:---:|\n");
    for row in rows {
        section.push_str(&format!(
            "| {} | {} | {} | {:.1}% | {:.1}% |\n",
            row.team,
            row.card,
            row.average_vote.emoji(),
            row.red_pct,
            row.amber_pct
        ));
    }
    section.push('\n');

    section
}

/// Generate the section for all teams or all departments.
fn generate_entity_section(title: &str, entities: &[EntityReport]) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", title));

    if entities.is_empty() {
        section.push_str("No summaries recorded for this session.\n\n");
        return section;
    }

    for entity in entities {
        section.push_str(&generate_entity_block(entity));
    }

    section
}

/// Generate the block for a single team or department.
fn generate_entity_block(entity: &EntityReport) -> String {
    let mut block = String::new();

    block.push_str(&format!(
        "### {} {{#{}}}\n\n",
        entity.name,
        anchor(&entity.name)
    ));

    let health = entity
        .health
        .map(|light| format!("{} {}", light.emoji(), light))
        .unwrap_or_else(|| "n/a".to_string());
    match entity.participation_pct {
        Some(pct) => block.push_str(&format!(
            "*Overall health: {} | Participation: {:.1}%*\n\n",
            health, pct
        )),
        None => block.push_str(&format!("*Overall health: {}*\n\n", health)),
    }

    block.push_str(&format!(
        "| Card | Status | Progress | {} Green | {} Amber | {} Red | Trend |\n",
        TrafficLight::Green.emoji(),
        TrafficLight::Amber.emoji(),
        TrafficLight::Red.emoji(),
    ));
    block.push_str("|:---|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    for row in &entity.cards {
        block.push_str(&generate_card_row(row));
    }
    block.push('\n');

    block
}

fn generate_card_row(row: &CardRow) -> String {
    let trend = row
        .trend
        .map(|t| format!("{} {}", t.arrow(), t))
        .unwrap_or_else(|| "-".to_string());

    format!(
        "| {} | {} {} | {} | {:.1}% | {:.1}% | {:.1}% | {} |\n",
        row.card,
        row.average_vote.emoji(),
        row.average_vote,
        row.progress_summary,
        row.distribution.green,
        row.distribution.amber,
        row.distribution.red,
        trend
    )
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by healthcheck v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &SessionReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Render the report in the requested format.
pub fn render(report: &SessionReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => generate_json_report(report),
        OutputFormat::Markdown => Ok(generate_markdown_report(report)),
    }
}

/// Write the report to a file.
pub fn write_report(report: &SessionReport, format: OutputFormat, path: &Path) -> Result<()> {
    let content = render(report, format)?;

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report file: {}", path.display()))?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
