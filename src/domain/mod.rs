//! Domain layer: the reconstruction model and its perturbation operators
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod branch;
pub mod builder;
pub mod display;
pub mod error;
pub mod geometry;
pub mod node;
pub mod perturb;
pub mod swc;
pub mod tree;

pub use branch::{branches, Branch};
pub use builder::TreeBuilder;
pub use display::{TreeOutline, TreeSummary};
pub use error::{DomainError, DomainResult, MalformedInput};
pub use node::{Node, NodeId, StructureType};
pub use perturb::{
    drop_branches, perturb_points, rotate, DropParams, PartialEffect, Perturbation, Pipeline,
    PointParams, Shortfall, WeightingStrategy,
};
pub use tree::Tree;
