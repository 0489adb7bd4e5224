//! Tests for ReconstructionService and AugmentService

mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use common::SAMPLE_SWC;
use morphaug::application::services::{AugmentRequest, AugmentService, ReconstructionService};
use morphaug::application::ApplicationError;
use morphaug::config::Settings;
use morphaug::domain::{swc, DomainError, MalformedInput};
use morphaug::infrastructure::traits::RealFileSystem;
use morphaug::util::testing;

/// Helper to create SWC files for testing
fn create_swc_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::create_dir_all(path.parent().unwrap()).expect("create dir");
    std::fs::write(&path, content).expect("write swc file");
    path
}

fn service() -> AugmentService {
    testing::init_test_setup();
    AugmentService::new(Arc::new(RealFileSystem))
}

fn request(inputs: Vec<PathBuf>, root: &Path, out: &Path, seed: u64) -> AugmentRequest {
    AugmentRequest {
        inputs,
        input_root: Some(root.to_path_buf()),
        pipeline: Settings::default().pipeline(),
        views: 2,
        seed,
        output_dir: Some(out.to_path_buf()),
    }
}

#[test]
fn given_swc_file_when_loading_then_tree_validated() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = create_swc_file(temp.path(), "n1.swc", SAMPLE_SWC);
    let service = ReconstructionService::new(Arc::new(RealFileSystem));

    // Act
    let tree = service.load(&path).unwrap();

    // Assert
    assert_eq!(tree.len(), 11);
    assert_eq!(tree.branch_points().len(), 3);
}

#[test]
fn given_two_roots_when_loading_then_invalid_reconstruction_names_file() {
    let temp = TempDir::new().unwrap();
    let path = create_swc_file(
        temp.path(),
        "bad.swc",
        "1 1 0 0 0 1 -1\n2 3 1 0 0 1 -1\n",
    );
    let service = ReconstructionService::new(Arc::new(RealFileSystem));

    let err = service.load(&path).unwrap_err();

    match err {
        ApplicationError::InvalidReconstruction { path: p, source } => {
            assert_eq!(p, path);
            assert!(matches!(
                source,
                DomainError::MalformedInput(MalformedInput::MultipleRoots(_))
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn given_nested_directory_when_discovering_then_sorted_swc_files_only() {
    // Arrange
    let temp = TempDir::new().unwrap();
    create_swc_file(temp.path(), "b.swc", SAMPLE_SWC);
    create_swc_file(temp.path(), "a.swc", SAMPLE_SWC);
    create_swc_file(temp.path(), "sub/c.SWC", SAMPLE_SWC);
    create_swc_file(temp.path(), "notes.txt", "not a reconstruction");
    let service = ReconstructionService::new(Arc::new(RealFileSystem));

    // Act
    let found = service.discover(temp.path()).unwrap();

    // Assert
    let names: Vec<String> = found
        .iter()
        .map(|p| p.strip_prefix(temp.path()).unwrap().display().to_string())
        .collect();
    assert_eq!(names, vec!["a.swc", "b.swc", "sub/c.SWC"]);
}

#[test]
fn given_directory_without_swc_when_discovering_then_no_inputs() {
    let temp = TempDir::new().unwrap();
    create_swc_file(temp.path(), "notes.txt", "x");
    let service = ReconstructionService::new(Arc::new(RealFileSystem));

    let err = service.discover(temp.path()).unwrap_err();

    assert!(matches!(err, ApplicationError::NoInputs(_)));
}

#[test]
fn given_single_file_when_perturbing_then_output_written_and_parseable() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let input = create_swc_file(temp.path(), "n1.swc", SAMPLE_SWC);
    let output = temp.path().join("out/n1_perturbed.swc");
    let pipeline = Settings::default().pipeline();

    // Act
    let outcome = service()
        .perturb_file(&input, &output, &pipeline, 17)
        .unwrap();

    // Assert
    let written = std::fs::read_to_string(&output).unwrap();
    let tree = swc::parse(&written).unwrap();
    assert_eq!(tree.len(), outcome.nodes_after);
    assert_eq!(outcome.nodes_before, 11);
    assert_eq!(swc::fingerprint(&tree), outcome.fingerprint);
    assert_eq!(outcome.steps.len(), 3);
}

#[test]
fn given_batch_with_corrupt_file_when_running_then_corrupt_skipped_rest_written() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let cells = temp.path().join("cells");
    let out = temp.path().join("out");
    let good = create_swc_file(&cells, "good.swc", SAMPLE_SWC);
    let nested = create_swc_file(&cells, "deep/other.swc", SAMPLE_SWC);
    let corrupt = create_swc_file(&cells, "corrupt.swc", "1 1 0 0 0 1 -1\n2 3 oops 0 0 1 1\n");
    let service = service();
    let inputs = service.reconstructions().discover(&cells).unwrap();
    assert_eq!(inputs.len(), 3);

    // Act
    let report = service.run(&request(inputs, &cells, &out, 5));

    // Assert
    assert_eq!(report.written.len(), 2);
    assert_eq!(report.views_written(), 4);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].source, corrupt);

    assert!(out.join("good_view1.swc").is_file());
    assert!(out.join("good_view2.swc").is_file());
    assert!(out.join("deep/other_view1.swc").is_file());
    assert!(out.join("deep/other_view2.swc").is_file());
    assert!(!out.join("corrupt_view1.swc").exists());

    let sources: Vec<&PathBuf> = report.written.iter().map(|f| &f.source).collect();
    assert!(sources.contains(&&good));
    assert!(sources.contains(&&nested));
}

#[test]
fn given_same_seed_when_running_batch_twice_then_identical_views() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let cells = temp.path().join("cells");
    create_swc_file(&cells, "a.swc", SAMPLE_SWC);
    create_swc_file(&cells, "b.swc", SAMPLE_SWC);
    let service = service();
    let inputs = service.reconstructions().discover(&cells).unwrap();

    // Act
    let first = service.run(&request(inputs.clone(), &cells, &temp.path().join("o1"), 99));
    let second = service.run(&request(inputs, &cells, &temp.path().join("o2"), 99));

    // Assert
    let prints = |report: &morphaug::application::services::BatchReport| {
        report
            .written
            .iter()
            .flat_map(|f| f.fingerprints.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(prints(&first), prints(&second));
    // same content, different seeds per item: a and b get different views
    assert_ne!(
        first.written[0].fingerprints[0],
        first.written[1].fingerprints[0]
    );
}

#[test]
fn given_views_written_next_to_inputs_when_rerunning_then_outputs_not_augmented_again() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let cells = temp.path().join("cells");
    let input = create_swc_file(&cells, "n1.swc", SAMPLE_SWC);
    let service = service();
    let in_place = |inputs: Vec<PathBuf>| AugmentRequest {
        output_dir: None,
        ..request(inputs, &cells, &cells, 3)
    };
    let first = service.run(&in_place(service.reconstructions().discover(&cells).unwrap()));
    assert_eq!(first.views_written(), 2);
    assert!(cells.join("n1_view1.swc").is_file());

    // Act
    let rediscovered = service.reconstructions().discover(&cells).unwrap();
    let second = service.run(&in_place(rediscovered.clone()));

    // Assert
    assert_eq!(rediscovered, vec![input]);
    assert_eq!(second.views_written(), 2);
    assert!(!cells.join("n1_view1_view1.swc").exists());
    let on_disk = std::fs::read_dir(&cells).unwrap().count();
    assert_eq!(on_disk, 3);
}

#[test]
fn given_generated_file_named_explicitly_when_discovering_then_kept() {
    let temp = TempDir::new().unwrap();
    let view = create_swc_file(temp.path(), "n1_view1.swc", SAMPLE_SWC);
    let service = ReconstructionService::new(Arc::new(RealFileSystem));

    let found = service.discover(&view).unwrap();

    assert_eq!(found, vec![view]);
}
