use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use objlint::core::document::Document;
use objlint::{RunOptions, run_batch, validate_source};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn objective(steps: usize) -> String {
    let mut body = String::new();
    for i in 0..steps {
        body.push_str(&format!(
            "      <Action ID=\"MoveToWaypoint\" waypoint_name=\"wp_{i}\" joint_group_name=\"manipulator\"/>\n"
        ));
    }
    format!(
        r#"<?xml version="1.0"?>
<root BTCPP_format="4" main_tree_to_execute="Patrol">
  <BehaviorTree ID="Patrol" _description="Visit every waypoint">
    <Control ID="Sequence">
{body}    </Control>
  </BehaviorTree>
  <TreeNodesModel>
    <SubTree ID="Patrol">
      <MetadataFields>
        <Metadata subcategory="Motion"/>
        <Metadata description="Visit every waypoint"/>
      </MetadataFields>
    </SubTree>
  </TreeNodesModel>
</root>
"#
    )
}

/// Parse plus rule evaluation for documents of growing size
fn bench_single_document(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_document");
    group.measurement_time(Duration::from_secs(5));

    for steps in [10usize, 100, 1000] {
        let src = objective(steps);
        group.bench_with_input(BenchmarkId::new("parse", steps), &src, |b, src| {
            b.iter(|| black_box(Document::parse(src).is_ok()));
        });
        group.bench_with_input(BenchmarkId::new("validate", steps), &src, |b, src| {
            b.iter(|| black_box(validate_source(src)));
        });
    }

    group.finish();
}

/// Whole batch over a generated tree, sequential versus pooled
fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");
    group.measurement_time(Duration::from_secs(10));

    let temp_dir = TempDir::new().unwrap();
    let src = objective(50);
    for i in 0..200 {
        let dir = temp_dir.path().join(format!("pkg_{}", i % 10));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("objective_{i}.xml")), &src).unwrap();
    }

    for jobs in [1usize, 4] {
        group.bench_with_input(BenchmarkId::new("run_batch", jobs), &jobs, |b, jobs| {
            let options = RunOptions {
                jobs: Some(*jobs),
                ..RunOptions::new(temp_dir.path())
            };
            b.iter(|| black_box(run_batch(&options).unwrap().total()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_document, bench_batch);
criterion_main!(benches);
