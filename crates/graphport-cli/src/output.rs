//! Terminal output formatting.

use std::path::Path;

use colored::{ColoredString, Colorize};
use graphport_core::{ExportOutcome, ExportPlan, ResolutionMethod};

fn method_colored(method: ResolutionMethod) -> ColoredString {
    match method {
        ResolutionMethod::Constraint => method.as_str().green(),
        ResolutionMethod::IdProperty => method.as_str().cyan(),
        ResolutionMethod::UniqueValue => method.as_str().yellow(),
        ResolutionMethod::Surrogate => method.as_str().red(),
    }
}

/// Print identifiers, patterns and declared constraints.
pub fn print_plan(plan: &ExportPlan) {
    println!();
    println!("{}", "Labels".bold());
    println!("{:<28} {:<24} {:<14}", "Label", "Identifier", "Method");
    println!("{}", "─".repeat(68));
    if plan.labels.is_empty() {
        println!("{}", "No labels found.".dimmed());
    }
    for label in &plan.labels {
        println!(
            "{:<28} {:<24} {:<14}",
            truncate(&label.label, 26),
            truncate(label.identifier.field(), 22),
            method_colored(label.method)
        );
    }

    println!();
    println!("{}", "Relationship patterns".bold());
    println!("{}", "─".repeat(68));
    if plan.patterns.is_empty() {
        println!("{}", "No relationship patterns found.".dimmed());
    }
    for pattern in &plan.patterns {
        println!(
            "  ({})-[:{}]->({})",
            pattern.source_label.cyan(),
            pattern.rel_type.yellow(),
            pattern.target_label.cyan()
        );
    }

    let schema = &plan.schema;
    if !schema.constraints.is_empty() || !schema.indexes.is_empty() {
        println!();
        println!("{}", "Constraints and indexes".bold());
        println!("{}", "─".repeat(68));
        for c in &schema.constraints {
            println!(
                "  {} {} {}({})",
                "constraint".dimmed(),
                c.importer_kind(),
                c.entity,
                c.properties.join(", ")
            );
        }
        for i in &schema.indexes {
            println!(
                "  {} {} {}({})",
                "index".dimmed(),
                i.importer_kind(),
                i.entity,
                i.properties.join(", ")
            );
        }
    }

    let heuristic = plan
        .labels
        .iter()
        .filter(|l| l.method == ResolutionMethod::UniqueValue)
        .count();
    if heuristic > 0 {
        println!();
        println!(
            "{} {} label(s) use an identifier that is unique in the data but not enforced by a constraint.",
            "!".yellow().bold(),
            heuristic
        );
    }
}

/// Print the export summary; `detailed` adds one line per file.
pub fn print_export_summary(outcome: &ExportOutcome, model_path: &Path, detailed: bool) {
    if detailed {
        println!();
        println!("{:<48} {:>10} {:>10}", "File", "Rows", "Skipped");
        println!("{}", "─".repeat(70));
        for file in &outcome.files {
            let skipped = if file.skipped > 0 {
                file.skipped.to_string().yellow()
            } else {
                file.skipped.to_string().dimmed()
            };
            println!(
                "{:<48} {:>10} {:>10}",
                truncate(&file.file_name, 46),
                file.written,
                skipped
            );
        }
    }

    let elapsed = outcome.finished_at - outcome.started_at;
    println!();
    println!("  Labels:           {}", outcome.plan.labels.len());
    println!("  Patterns:         {}", outcome.plan.patterns.len());
    println!("  Rows written:     {}", outcome.rows_written().to_string().bold());
    if outcome.rows_skipped() > 0 {
        println!(
            "  Rows skipped:     {} {}",
            outcome.rows_skipped().to_string().yellow(),
            "(null identifiers)".dimmed()
        );
    }
    println!("  Format:           {}", outcome.model.version.document_version());
    println!("  Model:            {}", model_path.display());
    println!(
        "  Duration:         {:.1}s",
        elapsed.num_milliseconds() as f64 / 1000.0
    );
}

/// Truncate to `max` characters, adding an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
