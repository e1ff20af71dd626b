//! Command-line interface for testtrace.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::analysis::{MarkerSet, Propagation, Runner};
use crate::config::{self, Config};
use crate::coverage;
use crate::model::Snapshot;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Default config file names to search for.
const DEFAULT_CONFIG_NAMES: &[&str] = &["testtrace.yaml", ".testtrace.yaml"];

/// Static test reachability - find the methods no test ever reaches.
///
/// Testtrace reads a compiled solution model and classifies every method
/// as tested or untested: a method is tested when it carries a test marker
/// attribute or is called, directly or through other methods, by one that
/// does. Nothing is executed.
#[derive(Parser)]
#[command(name = "testtrace")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify every method in a solution model as tested or untested
    #[command(visible_alias = "check")]
    Analyze(AnalyzeArgs),
    /// Create a new testtrace config from a template
    Init(InitArgs),
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Solution model to analyze (.yaml, .yml or .json)
    pub model: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Test marker type name; repeatable, replaces the config's markers
    #[arg(short = 'm', long = "marker")]
    pub markers: Vec<String>,

    /// Propagation mode: transitive or one_hop
    #[arg(short, long)]
    pub propagation: Option<String>,

    /// Output format: pretty, text, or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Minimum tested percentage (exit non-zero if below)
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Per-project timeout in seconds
    #[arg(long)]
    pub project_timeout: Option<u64>,

    /// List tested methods too in pretty output
    #[arg(long)]
    pub show_tested: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "testtrace.yaml")]
    pub output: PathBuf,

    /// Template to use
    #[arg(short, long, default_value = "minimal")]
    pub template: String,

    /// List available templates
    #[arg(short, long)]
    pub list: bool,
}

/// Available config templates.
struct Template {
    name: &'static str,
    description: &'static str,
    content: &'static str,
}

/// All available templates.
static TEMPLATES: &[Template] = &[
    Template {
        name: "minimal",
        description: "Single placeholder marker to edit",
        content: include_str!("templates/minimal.yaml"),
    },
    Template {
        name: "mstest",
        description: "MSTest [TestMethod]",
        content: include_str!("templates/mstest.yaml"),
    },
    Template {
        name: "nunit",
        description: "NUnit [Test], [TestCase], [TestCaseSource], [Theory]",
        content: include_str!("templates/nunit.yaml"),
    },
    Template {
        name: "xunit",
        description: "xUnit [Fact] and everything derived from it",
        content: include_str!("templates/xunit.yaml"),
    },
];

/// Discover a config file in the current directory.
fn discover_config() -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

/// Load the config, letting command-line flags override it.
fn resolve_config(args: &AnalyzeArgs) -> anyhow::Result<Config> {
    let path = args.config.clone().or_else(|| {
        if args.markers.is_empty() {
            discover_config()
        } else {
            None
        }
    });

    let mut config = match path {
        Some(p) => Config::parse_file(&p)
            .map_err(|e| anyhow::anyhow!("parsing config {}: {}", p.display(), e))?,
        None if args.markers.is_empty() => anyhow::bail!(
            "no config file found (looked for {}) and no --marker given",
            DEFAULT_CONFIG_NAMES.join(", ")
        ),
        None => Config::default(),
    };

    if !args.markers.is_empty() {
        config.markers = args.markers.clone();
    }
    if let Some(mode) = &args.propagation {
        config.propagation = Some(mode.parse::<Propagation>().map_err(anyhow::Error::msg)?);
    }
    if let Some(threshold) = args.threshold {
        config.min_tested_percent = Some(threshold);
    }
    if let Some(secs) = args.project_timeout {
        config.project_timeout_secs = Some(secs);
    }

    config::validate(&config).map_err(|e| anyhow::anyhow!("invalid config: {}", e))?;
    Ok(config)
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "text" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty', 'text', or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let config = match resolve_config(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Run 'testtrace init' to create a config file");
            return Ok(EXIT_ERROR);
        }
    };

    let snapshot = match Snapshot::load(&args.model) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading model {}: {}", args.model.display(), e);
            return Ok(EXIT_ERROR);
        }
    };

    let markers: MarkerSet = config.marker_set();
    tracing::info!(
        model = %args.model.display(),
        methods = snapshot.method_count(),
        markers = markers.len(),
        "starting analysis"
    );

    let result = Runner::new(&snapshot, markers.clone())
        .propagation(config.get_propagation())
        .project_timeout(config.project_timeout())
        .run();

    let summary = coverage::calculate_with_threshold(&result, config.min_tested_percent);
    let model_str = args.model.to_string_lossy().to_string();

    match args.format.as_str() {
        "json" => {
            report::write_json(&model_str, markers.names(), &result, &summary)?;
        }
        "text" => {
            let stdout = std::io::stdout();
            report::write_text(&mut stdout.lock(), &result)?;
        }
        _ => {
            report::write_pretty(
                &model_str,
                markers.names(),
                &result,
                &summary,
                args.show_tested,
            );
        }
    }

    if summary.passed {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Write a starter config from one of the built-in templates.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.list {
        return list_templates();
    }

    let Some(template) = TEMPLATES.iter().find(|t| t.name == args.template) else {
        let known: Vec<&str> = TEMPLATES.iter().map(|t| t.name).collect();
        eprintln!(
            "Error: no template named {:?} (choose one of: {})",
            args.template,
            known.join(", ")
        );
        return Ok(EXIT_ERROR);
    };

    // Never clobber an existing config.
    if args.output.exists() {
        eprintln!(
            "Error: {} already exists, refusing to overwrite it",
            args.output.display()
        );
        return Ok(EXIT_ERROR);
    }

    if let Some(dir) = args.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        if dir != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(dir) {
                eprintln!("Error: cannot create {}: {}", dir.display(), e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, template.content) {
        eprintln!("Error: cannot write {}: {}", args.output.display(), e);
        return Ok(EXIT_ERROR);
    }

    println!(
        "Wrote {} ({} markers)",
        args.output.display(),
        template.name
    );
    println!();
    println!("Check that the marker types match the attributes your tests use, then run:");
    println!(
        "  testtrace analyze <solution.yaml> --config {}",
        args.output.display()
    );

    Ok(EXIT_SUCCESS)
}

/// Print the built-in templates.
fn list_templates() -> anyhow::Result<i32> {
    println!("Marker templates:");
    println!();

    for template in TEMPLATES {
        let label = match template.name {
            "minimal" => "minimal (default)".to_string(),
            name => name.to_string(),
        };
        println!("  {:<20} {}", label, template.description);
    }

    println!();
    println!("Pick one with: testtrace init --template <name>");

    Ok(EXIT_SUCCESS)
}
