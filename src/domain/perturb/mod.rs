//! Randomized, structure-preserving perturbations of a reconstruction.
//!
//! Every operator is a pure function `(&Tree, params, &mut Rng) -> new Tree`:
//! the input is never modified, so one source neuron can yield any number of
//! independent views. Passing the same seeded RNG state yields byte-identical
//! output.

pub mod dropping;
pub mod point;
pub mod rotate;
pub mod weighting;

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::error::DomainResult;
use crate::domain::tree::Tree;

pub use dropping::{drop_branches, DropParams, DropReport, PartialEffect, Shortfall};
pub use point::{perturb_points, PointParams, PointReport};
pub use rotate::{rotate, RotateReport};
pub use weighting::{BranchWeighting, WeightingStrategy};

/// One configured operator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Perturbation {
    Point(PointParams),
    Drop(DropParams),
    Rotate,
}

impl Perturbation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Point(_) => "point",
            Self::Drop(_) => "drop",
            Self::Rotate => "rotate",
        }
    }

    pub fn apply<R: Rng + ?Sized>(&self, tree: &Tree, rng: &mut R) -> DomainResult<Applied> {
        match self {
            Self::Point(params) => {
                let report = perturb_points(tree, params, rng)?;
                Ok(Applied {
                    summary: StepSummary::Point {
                        moved: report.moved.len(),
                    },
                    tree: report.tree,
                })
            }
            Self::Drop(params) => {
                let report = drop_branches(tree, params, rng)?;
                Ok(Applied {
                    summary: StepSummary::Drop {
                        branches: report.dropped.len(),
                        removed: report.removed,
                        partial: report.partial,
                    },
                    tree: report.tree,
                })
            }
            Self::Rotate => {
                let report = rotate(tree, rng);
                Ok(Applied {
                    summary: StepSummary::Rotate {
                        angle_degrees: report
                            .rotation
                            .map(|r| r.angle.to_degrees())
                            .unwrap_or(0.0),
                    },
                    tree: report.tree,
                })
            }
        }
    }
}

/// Result of a single operator inside a pipeline.
#[derive(Debug, Clone)]
pub struct Applied {
    pub tree: Tree,
    pub summary: StepSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepSummary {
    Point {
        moved: usize,
    },
    Drop {
        branches: usize,
        removed: usize,
        partial: Option<PartialEffect>,
    },
    Rotate {
        angle_degrees: f64,
    },
}

impl StepSummary {
    pub fn partial(&self) -> Option<&PartialEffect> {
        match self {
            Self::Drop { partial, .. } => partial.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for StepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point { moved } => write!(f, "point: moved {moved} nodes"),
            Self::Drop {
                branches,
                removed,
                partial: None,
            } => write!(f, "drop: {branches} branches, {removed} nodes"),
            Self::Drop {
                branches,
                partial: Some(p),
                ..
            } => write!(f, "drop: {branches} branches, partial: {p}"),
            Self::Rotate { angle_degrees } => write!(f, "rotate: {angle_degrees:.1}°"),
        }
    }
}

/// Ordered composition of operators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub steps: Vec<Perturbation>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub tree: Tree,
    pub steps: Vec<StepSummary>,
}

impl Pipeline {
    pub fn new(steps: Vec<Perturbation>) -> Self {
        Self { steps }
    }

    /// Thread `tree` through every step in order.
    #[instrument(level = "debug", skip(self, tree, rng), fields(steps = self.steps.len()))]
    pub fn apply<R: Rng + ?Sized>(
        &self,
        tree: &Tree,
        rng: &mut R,
    ) -> DomainResult<PipelineOutcome> {
        let mut current = tree.clone();
        let mut steps = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let applied = step.apply(&current, rng)?;
            current = applied.tree;
            steps.push(applied.summary);
        }
        Ok(PipelineOutcome {
            tree: current,
            steps,
        })
    }

    /// `count` independent augmented views of the same source tree.
    pub fn views<R: Rng + ?Sized>(
        &self,
        tree: &Tree,
        count: usize,
        rng: &mut R,
    ) -> DomainResult<Vec<PipelineOutcome>> {
        (0..count).map(|_| self.apply(tree, rng)).collect()
    }

    /// The matched pair of views used as a positive pair in contrastive training.
    pub fn view_pair<R: Rng + ?Sized>(
        &self,
        tree: &Tree,
        rng: &mut R,
    ) -> DomainResult<(PipelineOutcome, PipelineOutcome)> {
        let first = self.apply(tree, rng)?;
        let second = self.apply(tree, rng)?;
        Ok((first, second))
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.steps.iter().map(Perturbation::name).collect();
        write!(f, "{}", names.join(" -> "))
    }
}
