use objlint::core::error::LintError;
use objlint::{RunOptions, run_batch};
use std::fs;
use std::path::Path;
use tempfile::{TempDir, tempdir};

const GOOD: &str = r#"<root><BehaviorTree ID="t"/><TreeNodesModel><SubTree ID="t"><MetadataFields>
<Metadata subcategory="Motion"/><Metadata description="Move"/>
</MetadataFields></SubTree></TreeNodesModel></root>"#;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, content).expect("write");
}

fn corpus() -> TempDir {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    write(root, "objectives/good.xml", GOOD);
    write(root, "objectives/deprecated.xml", r#"<root><BehaviorTree _subtreeOnly="true"/><TreeNodesModel/></root>"#);
    write(root, "objectives/nested/no_model.xml", "<root><BehaviorTree/></root>");
    write(root, "config/launch.xml", "<launch><arg name=\"x\"/></launch>");
    write(root, ".cache/broken.xml", "<root><unclosed></root>");
    write(root, "README.md", "# not xml");
    for i in 0..20 {
        write(root, &format!("bulk/tree_{i:02}.xml"), GOOD);
    }
    tmp
}

#[test]
fn counts_every_xml_file_and_reports_each_failure_once() {
    let tmp = corpus();
    let summary = run_batch(&RunOptions::new(tmp.path())).expect("batch");

    assert_eq!(summary.total(), 25);
    assert_eq!(summary.failed_count(), 3);
    assert_eq!(summary.objective_count(), 21);

    let lines = summary.error_lines();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().any(|l| l.starts_with("Error validating objectives/deprecated.xml: ") && l.contains("deprecated")));
    assert!(lines.iter().any(|l| l == "Error validating objectives/nested/no_model.xml: TreeNodesModel not found"));
    assert!(lines.iter().any(|l| l.starts_with("Error validating .cache/broken.xml: ")));

    let err = summary.into_result().unwrap_err();
    assert!(matches!(err, LintError::ValidationFailed(3)));
    assert_eq!(err.to_string(), "Validation failed for 3 files.");
}

#[test]
fn sequential_and_parallel_runs_agree() {
    let tmp = corpus();
    let one = run_batch(&RunOptions {
        jobs: Some(1),
        ..RunOptions::new(tmp.path())
    })
    .expect("sequential");
    let many = run_batch(&RunOptions {
        jobs: Some(8),
        ..RunOptions::new(tmp.path())
    })
    .expect("parallel");

    assert_eq!(one.reports, many.reports);
    assert_eq!(one.error_lines(), many.error_lines());
}

#[test]
fn results_follow_discovery_order() {
    let tmp = corpus();
    let summary = run_batch(&RunOptions::new(tmp.path())).expect("batch");
    let paths: Vec<_> = summary.reports.iter().map(|r| r.path.clone()).collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
}

#[test]
fn clean_tree_succeeds() {
    let tmp = tempdir().expect("tempdir");
    write(tmp.path(), "a.xml", GOOD);
    write(tmp.path(), "b.xml", "<root><NotATree/></root>");
    let summary = run_batch(&RunOptions::new(tmp.path()))
        .expect("batch")
        .into_result()
        .expect("no failures");
    assert_eq!(summary.total(), 2);
    assert!(summary.summary_line().starts_with("Validated 2 files in "));
}

#[test]
fn empty_tree_validates_zero_files() {
    let tmp = tempdir().expect("tempdir");
    let summary = run_batch(&RunOptions::new(tmp.path())).expect("batch");
    assert_eq!(summary.total(), 0);
    assert!(summary.into_result().is_ok());
}

#[test]
fn excluded_directories_are_not_validated() {
    let tmp = corpus();
    let summary = run_batch(&RunOptions {
        exclude: vec![".cache".to_string(), "nested".to_string()],
        ..RunOptions::new(tmp.path())
    })
    .expect("batch");
    assert_eq!(summary.total(), 23);
    assert_eq!(summary.failed_count(), 1);
}
