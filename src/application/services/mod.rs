//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem) but are themselves
//! concrete structs, not traits.

mod augment;
mod reconstruction;

pub use augment::{
    item_seed, output_path, AugmentRequest, AugmentService, AugmentedFile, BatchReport,
    PerturbOutcome, Skipped,
};
pub use reconstruction::ReconstructionService;
