//! Point perturbation: jitter a random subset of non-root nodes.

use std::collections::BTreeMap;

use glam::DVec3;
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::geometry::random_unit_vector;
use crate::domain::node::NodeId;
use crate::domain::tree::Tree;

/// Largest shift applied to a single node, in µm.
pub const DEFAULT_MAX_SHIFT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointParams {
    /// Share of non-root nodes to move, in [0, 1]
    pub proportion: f64,
    /// Upper bound of the uniformly drawn shift distance (µm)
    pub max_shift: f64,
}

impl Default for PointParams {
    fn default() -> Self {
        Self {
            proportion: 0.5,
            max_shift: DEFAULT_MAX_SHIFT,
        }
    }
}

impl PointParams {
    pub fn new(proportion: f64) -> Self {
        Self {
            proportion,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if !(0.0..=1.0).contains(&self.proportion) {
            return Err(DomainError::invalid_argument(
                "proportion",
                format!("must be within [0, 1], got {}", self.proportion),
            ));
        }
        if !self.max_shift.is_finite() || self.max_shift < 0.0 {
            return Err(DomainError::invalid_argument(
                "max_shift",
                format!("must be finite and non-negative, got {}", self.max_shift),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PointReport {
    pub tree: Tree,
    /// Ids of moved nodes, ascending
    pub moved: Vec<NodeId>,
}

/// Move `round(proportion × (n − 1))` randomly chosen non-root nodes, each by
/// a uniform distance in `[0, max_shift]` along a uniform random direction.
///
/// Only the chosen nodes move; their descendants keep their coordinates.
#[instrument(level = "debug", skip(tree, rng), fields(nodes = tree.len()))]
pub fn perturb_points<R: Rng + ?Sized>(
    tree: &Tree,
    params: &PointParams,
    rng: &mut R,
) -> DomainResult<PointReport> {
    params.validate()?;

    let root = tree.root_id();
    let candidates: Vec<NodeId> = tree.ids().filter(|&id| id != root).collect();
    let count = (params.proportion * candidates.len() as f64).round() as usize;
    let count = count.min(candidates.len());

    let mut offsets: BTreeMap<NodeId, DVec3> = BTreeMap::new();
    for i in index::sample(rng, candidates.len(), count).into_iter() {
        let distance = rng.gen_range(0.0..=params.max_shift);
        let direction = random_unit_vector(rng);
        offsets.insert(candidates[i], direction * distance);
    }
    debug!("moving {} of {} non-root nodes", offsets.len(), candidates.len());

    let perturbed = tree.map_positions(|node| match offsets.get(&node.id) {
        Some(offset) => node.position + *offset,
        None => node.position,
    });

    Ok(PointReport {
        tree: perturbed,
        moved: offsets.into_keys().collect(),
    })
}
