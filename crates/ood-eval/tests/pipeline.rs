use std::{
    fs,
    path::{Path, PathBuf},
};

use approx::assert_relative_eq;
use burn::{
    backend::NdArray,
    tensor::{Tensor, TensorData},
};
use image::{GrayImage, Luma};
use ood_eval::{
    append_results,
    data::{DataError, LogitArchive},
    metric::{DatasetKind, ScoringMethod},
    run_evaluation, run_iou, EvalConfig, RecordedLogits,
};

type TestBackend = NdArray;

/// Two-channel logits (one class, then void) whose void probability is `p`.
fn void_logits(probabilities: [f32; 4]) -> Tensor<TestBackend, 3> {
    let mut values = vec![0.0_f32; 4];
    values.extend(probabilities.iter().map(|p| (p / (1.0 - p)).ln()));
    Tensor::from_data(TensorData::new(values, [2, 2, 2]), &Default::default())
}

fn write_mask(path: &Path, codes: [u8; 4]) {
    let mask = GrayImage::from_fn(2, 2, |x, y| Luma([codes[(y * 2 + x) as usize]]));
    mask.save(path).unwrap();
}

struct Benchmark {
    _root: tempfile::TempDir,
    images: Vec<PathBuf>,
    logits: PathBuf,
}

/// A RoadAnomaly layout with two images: `a` has anomalies on its diagonal,
/// `b` has none.
fn road_anomaly_benchmark() -> Benchmark {
    let root = tempfile::tempdir().unwrap();
    let images_dir = root.path().join("RoadAnomaly").join("images");
    let masks_dir = root.path().join("RoadAnomaly").join("labels_masks");
    let logits = root.path().join("logits");
    for dir in [&images_dir, &masks_dir, &logits] {
        fs::create_dir_all(dir).unwrap();
    }

    let images = vec![images_dir.join("a.jpg"), images_dir.join("b.jpg")];
    for image in &images {
        fs::write(image, b"").unwrap();
    }

    write_mask(&masks_dir.join("a.png"), [2, 0, 0, 2]);
    write_mask(&masks_dir.join("b.png"), [0, 0, 0, 0]);

    let archive = LogitArchive::new(&logits);
    archive
        .record(&images[0], void_logits([0.9, 0.1, 0.2, 0.8]))
        .unwrap();
    archive
        .record(&images[1], void_logits([0.7, 0.6, 0.5, 0.4]))
        .unwrap();

    Benchmark {
        _root: root,
        images,
        logits,
    }
}

fn void_config(results_log: &Path) -> EvalConfig {
    EvalConfig::new()
        .with_method(ScoringMethod::Void)
        .with_num_classes(1)
        .with_height(2)
        .with_width(2)
        .with_results_log(results_log.display().to_string())
}

#[test]
fn separable_benchmark_scores_perfectly() {
    let benchmark = road_anomaly_benchmark();
    let results_log = benchmark.logits.join("results.txt");
    let config = void_config(&results_log);
    let source = RecordedLogits::new(&benchmark.logits);

    let summary =
        run_evaluation::<TestBackend, _>(&config, &benchmark.images, &source, &Default::default())
            .unwrap();

    assert_eq!(summary.dataset, "RoadAnomaly");
    assert_eq!(summary.method, "void");
    assert_eq!(summary.temperature, None);
    assert_eq!(summary.images_seen, 2);
    assert_eq!(summary.images_accepted, 1);
    assert_eq!(summary.ood_pixels, 2);
    assert_eq!(summary.id_pixels, 2);
    assert_relative_eq!(summary.auprc, 1.0, epsilon = 1e-9);
    assert_relative_eq!(summary.fpr_at_95_tpr, 0.0, epsilon = 1e-9);

    append_results(&results_log, &summary).unwrap();
    append_results(&results_log, &summary).unwrap();
    let contents = fs::read_to_string(&results_log).unwrap();
    assert_eq!(
        contents.lines().collect::<Vec<_>>(),
        vec![
            "RoadAnomaly void AUPRC score: 100.000 FPR@TPR95: 0.000",
            "RoadAnomaly void AUPRC score: 100.000 FPR@TPR95: 0.000",
        ]
    );
}

#[test]
fn benchmark_without_anomalies_is_insufficient() {
    let benchmark = road_anomaly_benchmark();
    let config = void_config(&benchmark.logits.join("results.txt"));
    let source = RecordedLogits::new(&benchmark.logits);

    let result = run_evaluation::<TestBackend, _>(
        &config,
        &benchmark.images[1..],
        &source,
        &Default::default(),
    );

    let error = result.unwrap_err();
    assert!(error.to_string().contains("Insufficient"), "{error}");
}

#[test]
fn missing_ground_truth_is_fatal() {
    let benchmark = road_anomaly_benchmark();
    let config = void_config(&benchmark.logits.join("results.txt"));
    let source = RecordedLogits::new(&benchmark.logits);

    fs::remove_file(
        benchmark.images[0]
            .parent()
            .unwrap()
            .with_file_name("labels_masks")
            .join("a.png"),
    )
    .unwrap();

    let error = run_evaluation::<TestBackend, _>(
        &config,
        &benchmark.images,
        &source,
        &Default::default(),
    )
    .unwrap_err();
    assert!(matches!(
        error.downcast_ref::<DataError>(),
        Some(DataError::GroundTruthNotFound { .. })
    ));
}

#[test]
fn void_method_requires_void_channel() {
    let benchmark = road_anomaly_benchmark();
    // Two semantic classes: the recorded logits carry no void channel.
    let config = void_config(&benchmark.logits.join("results.txt")).with_num_classes(2);
    let source = RecordedLogits::new(&benchmark.logits);

    let result = run_evaluation::<TestBackend, _>(
        &config,
        &benchmark.images,
        &source,
        &Default::default(),
    );
    assert!(result.is_err());
}

#[test]
fn explicit_dataset_controls_ground_truth_lookup() {
    let benchmark = road_anomaly_benchmark();
    // Fishyscapes Static also swaps .jpg for .png and leaves labels untouched,
    // so the anomaly code 2 is never recognized as OOD.
    let config = void_config(&benchmark.logits.join("results.txt"))
        .with_dataset(Some(DatasetKind::FishyscapesStatic));
    let source = RecordedLogits::new(&benchmark.logits);

    let result = run_evaluation::<TestBackend, _>(
        &config,
        &benchmark.images,
        &source,
        &Default::default(),
    );
    let error = result.unwrap_err();
    assert!(error.to_string().contains("Insufficient"), "{error}");
}

#[test]
fn cityscapes_iou_ignores_void_pixels() {
    let root = tempfile::tempdir().unwrap();
    let image_dir = root.path().join("leftImg8bit/val/lindau");
    let label_dir = root.path().join("gtFine/val/lindau");
    let logits = root.path().join("logits");
    for dir in [&image_dir, &label_dir, &logits] {
        fs::create_dir_all(dir).unwrap();
    }

    let image = image_dir.join("lindau_000000_000019_leftImg8bit.png");
    fs::write(&image, b"").unwrap();
    write_mask(
        &label_dir.join("lindau_000000_000019_gtFine_labelTrainIds.png"),
        [0, 1, 255, 0],
    );

    // Argmax predicts class 0 at the first pixel and class 1 elsewhere.
    let values = vec![
        1.0_f32, 0.0, 0.0, 0.0, //
        0.0, 1.0, 1.0, 1.0, //
        -1.0, -1.0, -1.0, -1.0,
    ];
    let tensor = Tensor::<TestBackend, 3>::from_data(
        TensorData::new(values, [3, 2, 2]),
        &Default::default(),
    );
    LogitArchive::new(&logits).record(&image, tensor).unwrap();

    let config = EvalConfig::new()
        .with_num_classes(2)
        .with_height(2)
        .with_width(2);
    let report = run_iou::<TestBackend, _>(
        &config,
        &[image],
        &RecordedLogits::new(&logits),
        &Default::default(),
    )
    .unwrap();

    assert_eq!(report.classes.len(), 2);
    assert_eq!(report.classes[0].name, "class 0");
    assert_relative_eq!(report.classes[0].iou, 0.5, epsilon = 1e-9);
    assert_relative_eq!(report.classes[1].iou, 0.5, epsilon = 1e-9);
    assert_relative_eq!(report.mean, 0.5, epsilon = 1e-9);
}
