//! Integration tests for the init and analyze commands.

use std::path::PathBuf;

use tempfile::TempDir;
use testtrace::cli::{self, AnalyzeArgs, InitArgs, EXIT_ERROR, EXIT_FAILED, EXIT_SUCCESS};
use testtrace::config::{self, Config};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn analyze_args(model: PathBuf) -> AnalyzeArgs {
    AnalyzeArgs {
        model,
        config: Some(testdata_path().join("testtrace.yaml")),
        markers: vec![],
        propagation: None,
        format: "text".to_string(),
        threshold: None,
        project_timeout: None,
        show_tested: false,
    }
}

#[test]
fn test_init_writes_valid_config() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("nested").join("testtrace.yaml");

    let args = InitArgs {
        output: output.clone(),
        template: "xunit".to_string(),
        list: false,
    };
    assert_eq!(cli::run_init(&args).unwrap(), EXIT_SUCCESS);

    let config = Config::parse_file(&output).expect("written config should parse");
    assert!(config::validate(&config).is_ok());
    assert!(config.markers.contains(&"Xunit.FactAttribute".to_string()));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("testtrace.yaml");
    std::fs::write(&output, "markers: [Keep.Me]\n").unwrap();

    let args = InitArgs {
        output: output.clone(),
        template: "minimal".to_string(),
        list: false,
    };
    assert_eq!(cli::run_init(&args).unwrap(), EXIT_ERROR);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "markers: [Keep.Me]\n"
    );
}

#[test]
fn test_init_unknown_template() {
    let temp = TempDir::new().unwrap();
    let args = InitArgs {
        output: temp.path().join("testtrace.yaml"),
        template: "junit".to_string(),
        list: false,
    };
    assert_eq!(cli::run_init(&args).unwrap(), EXIT_ERROR);
}

#[test]
fn test_analyze_exit_codes() {
    let model = testdata_path().join("solution.yaml");

    // 69.2% tested against the fixture's 50% gate.
    assert_eq!(cli::run_analyze(&analyze_args(model.clone())).unwrap(), EXIT_SUCCESS);

    let mut args = analyze_args(model.clone());
    args.threshold = Some(90.0);
    assert_eq!(cli::run_analyze(&args).unwrap(), EXIT_FAILED);

    let mut args = analyze_args(model);
    args.format = "xml".to_string();
    assert_eq!(cli::run_analyze(&args).unwrap(), EXIT_ERROR);
}

#[test]
fn test_analyze_load_errors() {
    let temp = TempDir::new().unwrap();

    let missing = analyze_args(temp.path().join("missing.yaml"));
    assert_eq!(cli::run_analyze(&missing).unwrap(), EXIT_ERROR);

    let broken = temp.path().join("broken.yaml");
    std::fs::write(
        &broken,
        "projects:\n  - name: P\n    types:\n      - name: A\n        base: Nowhere.Base\n",
    )
    .unwrap();
    assert_eq!(cli::run_analyze(&analyze_args(broken)).unwrap(), EXIT_ERROR);

    let unsupported = temp.path().join("model.txt");
    std::fs::write(&unsupported, "projects: []\n").unwrap();
    assert_eq!(cli::run_analyze(&analyze_args(unsupported)).unwrap(), EXIT_ERROR);
}
