//! morphaug: structure-preserving perturbations of SWC neuron reconstructions.
//!
//! Layers, innermost first:
//! - `domain`: the tree model, SWC codec and perturbation operators (pure, no I/O)
//! - `application`: services that load, augment and save reconstructions
//! - `infrastructure`: filesystem boundary and service wiring
//! - `cli`: argument parsing, command dispatch and terminal output

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
