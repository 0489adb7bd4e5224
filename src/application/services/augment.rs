//! Augmentation service
//!
//! Runs a perturbation pipeline over one or many reconstructions. Batches
//! are processed in parallel; every neuron gets its own RNG seeded from the
//! batch seed and its position in the sorted input list, so results do not
//! depend on scheduling. A neuron that fails is logged and skipped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::application::error_ext::DomainResultExt;
use crate::application::services::ReconstructionService;
use crate::application::ApplicationResult;
use crate::domain::perturb::{Pipeline, StepSummary};
use crate::domain::swc;
use crate::infrastructure::traits::FileSystem;

/// Derive the seed of item `index` from the batch seed.
///
/// One splitmix64 step: golden-ratio increment, then the finalizer.
pub fn item_seed(base: u64, index: usize) -> u64 {
    let mut z =
        base.wrapping_add((index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Output path `<dir>/<stem><suffix>.swc`, with `dir` defaulting to the input's directory.
pub fn output_path(input: &Path, dir: Option<&Path>, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "reconstruction".to_string());
    let dir = dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{stem}{suffix}.swc"))
}

/// Batch augmentation parameters.
#[derive(Debug, Clone)]
pub struct AugmentRequest {
    /// Reconstructions to augment
    pub inputs: Vec<PathBuf>,
    /// Common ancestor of `inputs`, used to mirror sub-directories under `output_dir`
    pub input_root: Option<PathBuf>,
    pub pipeline: Pipeline,
    /// Views written per neuron
    pub views: usize,
    pub seed: u64,
    /// Destination directory (default: beside each input)
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AugmentedFile {
    pub source: PathBuf,
    pub outputs: Vec<PathBuf>,
    /// SHA-256 of each written view
    pub fingerprints: Vec<String>,
    /// Step summaries of every view, in view order
    pub steps: Vec<Vec<StepSummary>>,
}

impl AugmentedFile {
    /// Whether any step of any view fell short of its request.
    pub fn has_partial_effect(&self) -> bool {
        self.steps.iter().flatten().any(|s| s.partial().is_some())
    }
}

#[derive(Debug, Clone)]
pub struct Skipped {
    pub source: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub written: Vec<AugmentedFile>,
    pub skipped: Vec<Skipped>,
}

impl BatchReport {
    pub fn views_written(&self) -> usize {
        self.written.iter().map(|f| f.outputs.len()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct PerturbOutcome {
    pub output: PathBuf,
    pub steps: Vec<StepSummary>,
    pub fingerprint: String,
    pub nodes_before: usize,
    pub nodes_after: usize,
}

/// Service for producing augmented views of reconstructions.
pub struct AugmentService {
    reconstructions: ReconstructionService,
}

impl AugmentService {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            reconstructions: ReconstructionService::new(fs),
        }
    }

    pub fn reconstructions(&self) -> &ReconstructionService {
        &self.reconstructions
    }

    /// Apply `pipeline` once to `input` and write the result to `output`.
    pub fn perturb_file(
        &self,
        input: &Path,
        output: &Path,
        pipeline: &Pipeline,
        seed: u64,
    ) -> ApplicationResult<PerturbOutcome> {
        debug!("perturb_file: {} -> {} seed={}", input.display(), output.display(), seed);
        let tree = self.reconstructions.load(input)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let outcome = pipeline.apply(&tree, &mut rng).for_reconstruction(input)?;
        self.reconstructions.save(output, &outcome.tree)?;
        Ok(PerturbOutcome {
            output: output.to_path_buf(),
            fingerprint: swc::fingerprint(&outcome.tree),
            nodes_before: tree.len(),
            nodes_after: outcome.tree.len(),
            steps: outcome.steps,
        })
    }

    /// Write `request.views` augmented views of every input, in parallel.
    ///
    /// Failures are isolated per neuron: they are logged, reported in
    /// `BatchReport::skipped`, and do not stop the batch.
    pub fn run(&self, request: &AugmentRequest) -> BatchReport {
        info!(
            "augmenting {} reconstructions: {} views each, pipeline {}, seed {}",
            request.inputs.len(),
            request.views,
            request.pipeline,
            request.seed
        );

        let results: Vec<(PathBuf, ApplicationResult<AugmentedFile>)> = request
            .inputs
            .par_iter()
            .enumerate()
            .map(|(index, input)| {
                let result = self.augment_one(request, input, item_seed(request.seed, index));
                (input.clone(), result)
            })
            .collect();

        let mut report = BatchReport::default();
        for (source, result) in results {
            match result {
                Ok(file) => report.written.push(file),
                Err(e) => {
                    warn!("skipping {}: {}", source.display(), e);
                    report.skipped.push(Skipped {
                        source,
                        reason: e.to_string(),
                    });
                }
            }
        }
        info!(
            "wrote {} views for {} reconstructions, skipped {}",
            report.views_written(),
            report.written.len(),
            report.skipped.len()
        );
        report
    }

    fn augment_one(
        &self,
        request: &AugmentRequest,
        input: &Path,
        seed: u64,
    ) -> ApplicationResult<AugmentedFile> {
        let tree = self.reconstructions.load(input)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let views = request
            .pipeline
            .views(&tree, request.views, &mut rng)
            .for_reconstruction(input)?;

        let dir = self.view_dir(request, input);
        let mut file = AugmentedFile {
            source: input.to_path_buf(),
            outputs: Vec::with_capacity(views.len()),
            fingerprints: Vec::with_capacity(views.len()),
            steps: Vec::with_capacity(views.len()),
        };
        for (k, view) in views.into_iter().enumerate() {
            let output = output_path(input, dir.as_deref(), &format!("_view{}", k + 1));
            self.reconstructions.save(&output, &view.tree)?;
            file.fingerprints.push(swc::fingerprint(&view.tree));
            file.outputs.push(output);
            file.steps.push(view.steps);
        }
        debug!("{}: {} views", input.display(), file.outputs.len());
        Ok(file)
    }

    /// Output directory for `input`, mirroring its place below `input_root`.
    fn view_dir(&self, request: &AugmentRequest, input: &Path) -> Option<PathBuf> {
        let out = request.output_dir.as_ref()?;
        let relative = request
            .input_root
            .as_ref()
            .and_then(|root| input.parent()?.strip_prefix(root).ok());
        Some(match relative {
            Some(rel) => out.join(rel),
            None => out.clone(),
        })
    }
}
