//! Branch dropping: delete a few randomly chosen subtrees.

use std::collections::HashSet;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::domain::branch::{branches, Branch};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::NodeId;
use crate::domain::perturb::weighting::{probabilities, WeightingStrategy};
use crate::domain::tree::Tree;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropParams {
    /// Share of the total node count to remove, in [0, 1]
    pub fraction: f64,
    /// Maximum number of branches dropped in one call
    pub max_branches: usize,
    pub weighting: WeightingStrategy,
}

impl Default for DropParams {
    fn default() -> Self {
        Self {
            fraction: 0.02,
            max_branches: 8,
            weighting: WeightingStrategy::default(),
        }
    }
}

impl DropParams {
    pub fn validate(&self) -> DomainResult<()> {
        if !(0.0..=1.0).contains(&self.fraction) {
            return Err(DomainError::invalid_argument(
                "fraction",
                format!("must be within [0, 1], got {}", self.fraction),
            ));
        }
        if self.max_branches == 0 {
            return Err(DomainError::invalid_argument(
                "max_branches",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Number of nodes the call tries to remove from a tree of `total` nodes.
    pub fn target(&self, total: usize) -> usize {
        ((self.fraction * total as f64).ceil() as usize).min(total)
    }
}

/// Why branch dropping removed fewer nodes than requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortfall {
    /// Only the root branch exists; dropping it would disconnect the root
    NoEligibleBranches,
    /// `max_branches` reached before the node target
    BranchBudgetExhausted,
    /// Every eligible branch was dropped and the target is still unmet
    CandidatesExhausted,
    /// The branches left would overshoot the target by more than one terminal branch
    OversizedCandidates,
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoEligibleBranches => write!(f, "no droppable branches"),
            Self::BranchBudgetExhausted => write!(f, "branch budget exhausted"),
            Self::CandidatesExhausted => write!(f, "candidate branches exhausted"),
            Self::OversizedCandidates => write!(f, "remaining branches exceed the node budget"),
        }
    }
}

/// An operation achieved less than requested. Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialEffect {
    pub requested: usize,
    pub achieved: usize,
    pub reason: Shortfall,
}

impl fmt::Display for PartialEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "removed {} of {} requested nodes ({})",
            self.achieved, self.requested, self.reason
        )
    }
}

#[derive(Debug, Clone)]
pub struct DropReport {
    pub tree: Tree,
    /// Start nodes of the dropped branches, in drop order
    pub dropped: Vec<NodeId>,
    /// Nodes removed in total (branches plus everything below them)
    pub removed: usize,
    pub target: usize,
    pub partial: Option<PartialEffect>,
}

impl DropReport {
    fn unchanged(tree: &Tree, target: usize, reason: Option<Shortfall>) -> Self {
        Self {
            tree: tree.clone(),
            dropped: Vec::new(),
            removed: 0,
            target,
            partial: reason.map(|reason| PartialEffect {
                requested: target,
                achieved: 0,
                reason,
            }),
        }
    }
}

/// Drop whole subtrees, chosen by weighted sampling without replacement,
/// until `ceil(fraction × n)` nodes are gone or `max_branches` branches have
/// been dropped.
///
/// A drawn branch is skipped when removing it (with everything below) would
/// push the total past the target by more than the largest terminal branch,
/// so `removed <= target + max terminal branch size`.
///
/// The branch holding the root is never eligible, so the root survives and
/// the result stays a single connected tree. Surviving ids are unchanged.
#[instrument(level = "debug", skip(tree, rng), fields(nodes = tree.len()))]
pub fn drop_branches<R: Rng + ?Sized>(
    tree: &Tree,
    params: &DropParams,
    rng: &mut R,
) -> DomainResult<DropReport> {
    params.validate()?;

    let target = params.target(tree.len());
    if target == 0 {
        return Ok(DropReport::unchanged(tree, target, None));
    }

    let all = branches(tree);
    let eligible: Vec<&Branch> = all.iter().filter(|b| !b.is_root).collect();
    if eligible.is_empty() {
        debug!("no eligible branches among {}", all.len());
        return Ok(DropReport::unchanged(
            tree,
            target,
            Some(Shortfall::NoEligibleBranches),
        ));
    }

    let weights = probabilities(&params.weighting, &eligible);
    let order = weighted_order(&weights, rng);

    // Every terminal branch fits, so the loop can always make progress
    let slack = eligible
        .iter()
        .filter(|b| b.is_terminal)
        .map(|b| b.len())
        .max()
        .unwrap_or(1);
    let allowance = target + slack;

    let mut removed_ids: HashSet<NodeId> = HashSet::new();
    let mut dropped = Vec::new();
    let mut oversized = 0usize;
    let mut shortfall = None;

    for i in order {
        if removed_ids.len() >= target {
            break;
        }
        if dropped.len() >= params.max_branches {
            shortfall = Some(Shortfall::BranchBudgetExhausted);
            break;
        }
        let start = eligible[i].start();
        if removed_ids.contains(&start) {
            continue;
        }
        // A descendant branch may already be gone; count only new nodes
        let fresh: Vec<NodeId> = tree
            .subtree(start)
            .map(|n| n.id)
            .filter(|id| !removed_ids.contains(id))
            .collect();
        if removed_ids.len() + fresh.len() > allowance {
            trace!("skip {}: {} nodes over allowance {}", start, fresh.len(), allowance);
            oversized += 1;
            continue;
        }
        removed_ids.extend(fresh);
        dropped.push(start);
    }
    let removed = removed_ids.len();
    if removed >= target {
        shortfall = None;
    } else if shortfall.is_none() {
        shortfall = Some(if oversized > 0 {
            Shortfall::OversizedCandidates
        } else {
            Shortfall::CandidatesExhausted
        });
    }

    debug!(
        "dropped {} branches, {} of {} target nodes",
        dropped.len(),
        removed,
        target
    );

    Ok(DropReport {
        tree: tree.without_subtrees(&dropped),
        dropped,
        removed,
        target,
        partial: shortfall.map(|reason| PartialEffect {
            requested: target,
            achieved: removed,
            reason,
        }),
    })
}

/// Weighted random permutation (without replacement) of the indices with
/// positive probability, via exponential keys `ln(u) / p`: the largest key
/// is drawn first.
fn weighted_order<R: Rng + ?Sized>(probabilities: &[f64], rng: &mut R) -> Vec<usize> {
    let mut keyed: Vec<(f64, usize)> = probabilities
        .iter()
        .enumerate()
        .filter(|&(_, &p)| p > 0.0)
        .map(|(i, &p)| {
            // u in (0, 1] keeps ln finite
            let u: f64 = 1.0 - rng.gen::<f64>();
            (u.ln() / p, i)
        })
        .collect();
    keyed.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    keyed.into_iter().map(|(_, i)| i).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn given_weights_when_ordering_then_zero_weights_excluded() {
        let mut rng = StdRng::seed_from_u64(3);
        let order = weighted_order(&[0.5, 0.0, 0.5], &mut rng);
        assert_eq!(order.len(), 2);
        assert!(!order.contains(&1));
    }

    #[test]
    fn given_dominant_weight_when_ordering_then_usually_first() {
        let mut rng = StdRng::seed_from_u64(5);
        let firsts = (0..1000)
            .filter(|_| weighted_order(&[0.95, 0.05], &mut rng)[0] == 0)
            .count();
        assert!(firsts > 900, "heavy item first {firsts} times");
    }

    #[test]
    fn given_fraction_when_computing_target_then_rounds_up() {
        let params = DropParams::default();
        assert_eq!(params.target(5), 1);
        assert_eq!(params.target(1000), 20);
        assert_eq!(params.target(0), 0);
    }
}
