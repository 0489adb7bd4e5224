//! Drop-probability models for branch dropping.
//!
//! The selection algorithm only sees normalized probabilities, so a model
//! can be swapped without touching it: implement [`BranchWeighting`] or pick
//! a variant of the config-selectable [`WeightingStrategy`].

use serde::{Deserialize, Serialize};

use crate::domain::branch::Branch;

/// Lengths below this (µm) are clamped so coincident points keep a finite weight.
pub const MIN_LENGTH: f64 = 1e-6;

/// Relative (unnormalized) drop weight of a branch.
pub trait BranchWeighting {
    fn weight(&self, branch: &Branch) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeightingStrategy {
    /// 1 / branch path length: short branches go first
    #[default]
    InverseLength,
    /// 1 / cable length of everything below the branch start: favours
    /// peripheral branches with little hanging off them
    InverseSubtreeLength,
    /// Every eligible branch equally likely
    Uniform,
}

impl BranchWeighting for WeightingStrategy {
    fn weight(&self, branch: &Branch) -> f64 {
        match self {
            Self::InverseLength => 1.0 / branch.path_length.max(MIN_LENGTH),
            Self::InverseSubtreeLength => 1.0 / branch.subtree_length.max(MIN_LENGTH),
            Self::Uniform => 1.0,
        }
    }
}

impl std::fmt::Display for WeightingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InverseLength => write!(f, "inverse_length"),
            Self::InverseSubtreeLength => write!(f, "inverse_subtree_length"),
            Self::Uniform => write!(f, "uniform"),
        }
    }
}

/// Normalized drop probabilities, one per branch, summing to 1.
///
/// Negative or non-finite weights count as 0. If every weight is 0 the
/// result is all zeros (nothing can be drawn).
pub fn probabilities<W: BranchWeighting + ?Sized>(
    weighting: &W,
    branches: &[&Branch],
) -> Vec<f64> {
    let weights: Vec<f64> = branches
        .iter()
        .map(|b| weighting.weight(b))
        .map(|w| if w.is_finite() && w > 0.0 { w } else { 0.0 })
        .collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return vec![0.0; weights.len()];
    }
    weights.into_iter().map(|w| w / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::NodeId;
    use rstest::rstest;

    fn branch(path_length: f64, subtree_length: f64) -> Branch {
        Branch {
            nodes: vec![NodeId(2)],
            is_root: false,
            is_terminal: true,
            path_length,
            subtree_size: 1,
            subtree_length,
        }
    }

    #[rstest]
    #[case(WeightingStrategy::InverseLength)]
    #[case(WeightingStrategy::InverseSubtreeLength)]
    #[case(WeightingStrategy::Uniform)]
    fn given_strategy_when_normalizing_then_sums_to_one(#[case] strategy: WeightingStrategy) {
        let a = branch(1.0, 4.0);
        let b = branch(3.0, 3.0);
        let c = branch(0.0, 0.0);
        let p = probabilities(&strategy, &[&a, &b, &c]);
        assert_eq!(p.len(), 3);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn given_inverse_length_when_weighting_then_shorter_is_likelier() {
        let short = branch(1.0, 10.0);
        let long = branch(4.0, 4.0);
        let p = probabilities(&WeightingStrategy::InverseLength, &[&short, &long]);
        assert!((p[0] - 0.8).abs() < 1e-12);
        assert!((p[1] - 0.2).abs() < 1e-12);

        let p = probabilities(&WeightingStrategy::InverseSubtreeLength, &[&short, &long]);
        assert!(p[1] > p[0]);
    }

    #[test]
    fn given_strategy_toml_when_deserializing_then_tag_selects_variant() {
        #[derive(Deserialize)]
        struct Holder {
            weighting: WeightingStrategy,
        }
        let holder: Holder = toml::from_str("[weighting]\nkind = \"uniform\"\n").unwrap();
        assert_eq!(holder.weighting, WeightingStrategy::Uniform);
    }
}
