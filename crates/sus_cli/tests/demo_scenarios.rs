//! Integration tests running the demo scenarios with the demo config

use std::path::PathBuf;

use sus_cli::config::SusConfig;
use sus_cli::report::{RunReport, Status};
use sus_cli::runner::Runner;
use sus_cli::scenario::Scenario;

fn demos() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

fn run_demo(name: &str) -> RunReport {
    let config = SusConfig::load(&demos()).unwrap();
    let scenario = Scenario::load(&demos().join(name)).unwrap();
    Runner::run(config, &scenario).unwrap()
}

#[test]
fn test_fruit_picker_demo_passes() {
    let report = run_demo("fruit_picker.json");
    assert_eq!(report.status, Status::Passed, "{:?}", report.failures);
    assert_eq!(report.expectations, 7);
    assert_eq!(report.widgets["fruit"]["lifecycle"], "idle");
}

#[test]
fn test_gallery_demo_passes() {
    let report = run_demo("gallery.json");
    assert_eq!(report.status, Status::Passed, "{:?}", report.failures);
    assert_eq!(report.widgets["hero"]["loaded"], true);
    assert_eq!(report.widgets["faq"]["expanded"], serde_json::json!([0, 2]));
}

#[test]
fn test_report_written_to_disk() {
    let report = run_demo("gallery.json");
    let path = std::env::temp_dir().join(format!("sus-report-{}.json", std::process::id()));
    report.write(&path).unwrap();

    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["scenario"], "gallery");
    assert_eq!(written["status"], "passed");

    let _ = std::fs::remove_file(path);
}
