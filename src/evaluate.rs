//! Evaluation harness
//!
//! Runs the extraction over a directory of samples whose filenames (minus
//! extension) are the expected target lines, and writes per-image and
//! aggregate accuracy reports.

use crate::error::OcrError;
use crate::extract::{write_json, Extraction, Extractor};
use crate::loader;
use crate::selector::SelectionStrategy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const PER_IMAGE_RESULTS_FILE: &str = "per_image_results.json";
pub const METRICS_FILE: &str = "evaluation_metrics.json";
pub const SELECTOR_COMPARISON_FILE: &str = "selector_comparison.json";

/// Outcome for one sample image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRecord {
    pub filename: String,
    pub expected: String,
    pub predicted: Option<String>,
    pub exact_match: bool,
    pub character_accuracy: f64,
    pub rotation_used: u16,
    pub ocr_avg_confidence: f32,
}

impl EvaluationRecord {
    pub fn new(
        filename: &str,
        predicted: Option<String>,
        rotation_used: u16,
        ocr_avg_confidence: f32,
    ) -> Self {
        let expected = expected_from_filename(filename);
        let exact_match = predicted.as_deref() == Some(expected.as_str());
        let character_accuracy = character_accuracy(&expected, predicted.as_deref().unwrap_or(""));

        Self {
            filename: filename.to_string(),
            expected,
            predicted,
            exact_match,
            character_accuracy,
            rotation_used,
            ocr_avg_confidence,
        }
    }
}

/// Aggregate accuracy over every evaluated sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationMetrics {
    pub total_images: usize,
    pub correct_exact_matches: usize,
    pub exact_match_accuracy: f64,
    pub average_character_accuracy: f64,
}

impl EvaluationMetrics {
    /// Ratios are 0 when nothing was evaluated
    pub fn from_records(records: &[EvaluationRecord]) -> Self {
        let total_images = records.len();
        let correct_exact_matches = records.iter().filter(|r| r.exact_match).count();
        let accuracy_sum: f64 = records.iter().map(|r| r.character_accuracy).sum();

        let ratio = |value: f64| {
            if total_images == 0 {
                0.0
            } else {
                value / total_images as f64
            }
        };

        Self {
            total_images,
            correct_exact_matches,
            exact_match_accuracy: ratio(correct_exact_matches as f64),
            average_character_accuracy: ratio(accuracy_sum),
        }
    }
}

/// Everything one harness run produced
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub records: Vec<EvaluationRecord>,
    pub metrics: EvaluationMetrics,
    /// Metrics per selector strategy over the same OCR output, when requested
    pub selector_comparison: Option<BTreeMap<String, EvaluationMetrics>>,
}

/// The expected target line: the filename without its final extension
pub fn expected_from_filename(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Similarity in [0, 1]: twice the longest common subsequence over the
/// combined length, compared by characters.
/// An empty expected string only matches an empty prediction.
pub fn character_accuracy(expected: &str, predicted: &str) -> f64 {
    let expected: Vec<char> = expected.chars().collect();
    let predicted: Vec<char> = predicted.chars().collect();

    if expected.is_empty() {
        return if predicted.is_empty() { 1.0 } else { 0.0 };
    }

    let lcs = longest_common_subsequence(&expected, &predicted);
    2.0 * lcs as f64 / (expected.len() + predicted.len()) as f64
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Sample images in `dir`, sorted by filename
pub fn list_samples(dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
    let mut samples = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && loader::is_supported_image(&path) {
            samples.push(path);
        }
    }
    samples.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(samples)
}

/// Run the extraction on one sample and score it
pub fn evaluate_sample(
    extractor: &Extractor,
    path: &Path,
) -> Result<(EvaluationRecord, Extraction), OcrError> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let extraction = extractor.process_file(path)?;
    let record = EvaluationRecord::new(
        &filename,
        extraction.target_line.clone(),
        extraction.rotation_used(),
        extraction.avg_confidence(),
    );

    Ok((record, extraction))
}

/// Evaluate every sample in `samples_dir`. Samples that fail are logged and
/// skipped; they do not count towards the totals.
pub fn run(
    extractor: &Extractor,
    samples_dir: &Path,
    compare_selectors: bool,
) -> Result<EvaluationReport, OcrError> {
    let samples = list_samples(samples_dir)?;
    tracing::info!(
        "Evaluating {} samples from {} (engine {}, selector {})",
        samples.len(),
        samples_dir.display(),
        extractor.engine_name(),
        extractor.selector().as_str()
    );

    let mut records = Vec::new();
    let mut per_selector: BTreeMap<String, Vec<EvaluationRecord>> = BTreeMap::new();

    for path in &samples {
        let (record, extraction) = match evaluate_sample(extractor, path) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        tracing::info!(
            "[{}] rot={} conf={:.2} expected={} predicted={:?} exact={} char_acc={:.2}",
            record.filename,
            record.rotation_used,
            record.ocr_avg_confidence,
            record.expected,
            record.predicted,
            record.exact_match,
            record.character_accuracy
        );

        if compare_selectors {
            for strategy in SelectionStrategy::ALL {
                per_selector
                    .entry(strategy.as_str().to_string())
                    .or_default()
                    .push(EvaluationRecord::new(
                        &record.filename,
                        strategy.select_from_text(&extraction.raw_text),
                        record.rotation_used,
                        record.ocr_avg_confidence,
                    ));
            }
        }

        records.push(record);
    }

    let metrics = EvaluationMetrics::from_records(&records);
    tracing::info!(
        "Exact match accuracy {:.2}%, average character accuracy {:.2}% over {} images",
        metrics.exact_match_accuracy * 100.0,
        metrics.average_character_accuracy * 100.0,
        metrics.total_images
    );

    let selector_comparison = compare_selectors.then(|| {
        SelectionStrategy::ALL
            .iter()
            .map(|strategy| {
                let name = strategy.as_str().to_string();
                let records = per_selector.get(&name).map(Vec::as_slice).unwrap_or(&[]);
                (name, EvaluationMetrics::from_records(records))
            })
            .collect()
    });

    Ok(EvaluationReport {
        records,
        metrics,
        selector_comparison,
    })
}

/// Write the reports into `results_dir`, creating it if needed
pub fn write_report(report: &EvaluationReport, results_dir: &Path) -> Result<(), OcrError> {
    fs::create_dir_all(results_dir)?;

    write_json(&results_dir.join(PER_IMAGE_RESULTS_FILE), &report.records)?;
    write_json(&results_dir.join(METRICS_FILE), &report.metrics)?;
    if let Some(comparison) = &report.selector_comparison {
        write_json(&results_dir.join(SELECTOR_COMPARISON_FILE), comparison)?;
    }

    tracing::info!("Results saved to {}", results_dir.display());
    Ok(())
}
