//! Output formatting for testtrace results.
//!
//! Supports three output formats:
//! - Text: plain `<type> <method>` listing, untested first
//! - Pretty: colored terminal output with a coverage summary
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use crate::analysis::{AnalysisResult, ClassifiedMethod, SkippedProject};
use crate::coverage::CoverageSummary;

// =============================================================================
// JSON Format
// =============================================================================

/// JSON report structure.
#[derive(Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub model: String,
    pub propagation: String,
    pub markers: Vec<String>,
    pub summary: CoverageSummary,
    pub projects_analyzed: usize,
    pub tested: Vec<JsonMethod>,
    pub untested: Vec<JsonMethod>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_projects: Vec<SkippedProject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved_attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub malformed_types: Vec<String>,
}

/// JSON method entry.
#[derive(Serialize, Deserialize)]
pub struct JsonMethod {
    pub project: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub method: String,
    pub signature: String,
}

/// Build the JSON report for a run.
pub fn build_json(
    model_path: &str,
    markers: &[String],
    result: &AnalysisResult,
    summary: &CoverageSummary,
) -> JsonReport {
    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: model_path.to_string(),
        propagation: result.propagation.to_string(),
        markers: markers.to_vec(),
        summary: summary.clone(),
        projects_analyzed: result.projects_analyzed,
        tested: result.tested.iter().map(method_to_json).collect(),
        untested: result.untested.iter().map(method_to_json).collect(),
        skipped_projects: result.skipped_projects.clone(),
        unresolved_attributes: result.unresolved_attributes.clone(),
        malformed_types: result.malformed_types.clone(),
    }
}

/// Write results in JSON format.
pub fn write_json(
    model_path: &str,
    markers: &[String],
    result: &AnalysisResult,
    summary: &CoverageSummary,
) -> anyhow::Result<()> {
    let report = build_json(model_path, markers, result, summary);
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

fn method_to_json(m: &ClassifiedMethod) -> JsonMethod {
    JsonMethod {
        project: m.project.clone(),
        type_name: m.type_name.clone(),
        method: m.name.clone(),
        signature: m.signature(),
    }
}

// =============================================================================
// Text Format
// =============================================================================

/// Write the plain listing: untested methods, then tested methods.
pub fn write_text<W: Write>(out: &mut W, result: &AnalysisResult) -> io::Result<()> {
    writeln!(out, "Untested Methods:")?;
    writeln!(out)?;
    for m in &result.untested {
        writeln!(out, "{}", m)?;
    }
    writeln!(out, "Tested Methods:")?;
    writeln!(out)?;
    for m in &result.tested {
        writeln!(out, "{}", m)?;
    }
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results in pretty (human-readable) format.
pub fn write_pretty(
    model_path: &str,
    markers: &[String],
    result: &AnalysisResult,
    summary: &CoverageSummary,
    show_tested: bool,
) {
    // Header
    println!();
    print!("  ");
    print!("{}", "testtrace".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Model:       ".dimmed());
    println!("{}", model_path);
    print!("  {}", "Propagation: ".dimmed());
    println!("{}", result.propagation);
    print!("  {}", "Markers:     ".dimmed());
    println!("{}", markers.join(", "));
    println!();

    write_summary(summary, result.projects_analyzed);
    println!();

    if !result.untested.is_empty() {
        write_methods("Untested", &result.untested, false);
        println!();
    }

    if show_tested && !result.tested.is_empty() {
        write_methods("Tested", &result.tested, true);
        println!();
    }

    if result.has_diagnostics() {
        write_diagnostics(result);
        println!();
    }

    write_final_status(summary);
    println!();
}

fn write_summary(summary: &CoverageSummary, projects: usize) {
    if summary.passed {
        print!("  {}", "✓ PASS".green());
    } else {
        print!("  {}", "✗ FAIL".red());
    }

    print!("  Tested: ");
    write_colored_percent(summary.percent);
    print!(
        "  ({} of {} methods, {} project{})",
        summary.tested,
        summary.total,
        projects,
        if projects != 1 { "s" } else { "" }
    );
    println!();
}

fn write_colored_percent(p: f64) {
    let text = format!("{:.1}%", p);
    match p {
        p if p >= 80.0 => print!("{}", text.green().bold()),
        p if p >= 60.0 => print!("{}", text.green()),
        p if p >= 40.0 => print!("{}", text.yellow()),
        p if p >= 20.0 => print!("{}", text.yellow().bold()),
        _ => print!("{}", text.red()),
    }
}

fn write_methods(title: &str, methods: &[ClassifiedMethod], tested: bool) {
    println!("  {} ({}):", title.bold(), methods.len());
    println!();

    let mut current_project: Option<&str> = None;
    for m in methods {
        if current_project != Some(m.project.as_str()) {
            println!("    {}", m.project.dimmed());
            current_project = Some(m.project.as_str());
        }
        let tag = if tested {
            "✓".green()
        } else {
            "✗".red()
        };
        print!("      {} ", tag);
        print!("{}", m.type_name.blue());
        println!(" {}", m.signature());
    }
}

fn write_diagnostics(result: &AnalysisResult) {
    println!("  {}", "Diagnostics:".bold());

    for skipped in &result.skipped_projects {
        print!("    {} ", "SKIP ".yellow());
        print!("{}", skipped.name.blue());
        println!("  {}", skipped.reason.dimmed());
    }
    for name in &result.unresolved_attributes {
        print!("    {} ", "INFO ".blue());
        println!("unresolved attribute type {}", name);
    }
    for name in &result.malformed_types {
        print!("    {} ", "WARN ".yellow());
        println!("cyclic base type chain in {}", name);
    }
}

fn write_final_status(summary: &CoverageSummary) {
    match summary.threshold {
        Some(t) => print!("  {}", format!("Threshold: {:.1}%", t).dimmed()),
        None => print!("  {}", "Threshold: none".dimmed()),
    }
    print!("  Tested: ");
    write_colored_percent(summary.percent);
    print!("  ");

    if summary.passed {
        print!("{}", "PASSED".green());
    } else {
        print!("{}", "FAILED".red());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Propagation;
    use crate::coverage;

    fn sample() -> AnalysisResult {
        let mut result = AnalysisResult::new(Propagation::OneHop);
        result.add_method(
            ClassifiedMethod {
                project: "App".to_string(),
                type_name: "App.Calc".to_string(),
                name: "Add".to_string(),
                parameters: vec!["int".to_string()],
            },
            true,
        );
        result.add_method(
            ClassifiedMethod {
                project: "App".to_string(),
                type_name: "App.Calc+Memory".to_string(),
                name: "Clear".to_string(),
                parameters: vec![],
            },
            false,
        );
        result.projects_analyzed = 1;
        result.skip_project("Web", "build failed");
        result
    }

    #[test]
    fn test_text_listing() {
        let mut out = Vec::new();
        write_text(&mut out, &sample()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Untested Methods:\n\nApp.Calc+Memory Clear\nTested Methods:\n\nApp.Calc Add\n"
        );
    }

    #[test]
    fn test_json_report() {
        let result = sample();
        let summary = coverage::calculate_with_threshold(&result, None);
        let report = build_json("model.yaml", &["T".to_string()], &result, &summary);
        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&report).unwrap()).unwrap();

        assert_eq!(value["propagation"], "one_hop");
        assert_eq!(value["summary"]["total"], 2);
        assert_eq!(value["tested"][0]["type"], "App.Calc");
        assert_eq!(value["tested"][0]["signature"], "Add(int)");
        assert_eq!(value["skipped_projects"][0]["name"], "Web");
        assert!(value.get("malformed_types").is_none());
    }
}
