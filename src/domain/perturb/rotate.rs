//! Rigid rotation of the whole tree about its root.

use rand::Rng;
use tracing::{debug, instrument};

use crate::domain::geometry::{random_angle, random_unit_vector, Rotation};
use crate::domain::tree::Tree;

#[derive(Debug, Clone)]
pub struct RotateReport {
    pub tree: Tree,
    /// Applied rotation; `None` for a single-node tree
    pub rotation: Option<Rotation>,
}

/// Rotate every node about the root by a random angle in `[0, 2π)` around a
/// uniformly random axis.
///
/// The rotation is an isometry, so all pairwise distances (and therefore
/// segment and branch lengths) are preserved; the root stays where it is.
#[instrument(level = "debug", skip(tree, rng), fields(nodes = tree.len()))]
pub fn rotate<R: Rng + ?Sized>(tree: &Tree, rng: &mut R) -> RotateReport {
    if tree.len() < 2 {
        return RotateReport {
            tree: tree.clone(),
            rotation: None,
        };
    }

    let axis = random_unit_vector(rng);
    let angle = random_angle(rng);
    let rotation = Rotation::new(axis, angle, tree.root().position);
    debug!(
        "axis=({:.3}, {:.3}, {:.3}) angle={:.2}°",
        axis.x,
        axis.y,
        axis.z,
        angle.to_degrees()
    );

    let rotated = tree.map_positions(|node| {
        if node.is_root() {
            node.position
        } else {
            rotation.apply(node.position)
        }
    });

    RotateReport {
        tree: rotated,
        rotation: Some(rotation),
    }
}
