//! Name-based merging of PMX models.
//!
//! A patch model is merged into a base model by matching records on their
//! names. Bones and materials (with their vertices, faces and textures) are
//! always appended; morphs, physics and display groups follow
//! [`MergeOptions`].
//!
//! # Example
//!
//! ```no_run
//! use pmxmerge_core::{merge_pmx_files, LogDiagnostics, MergeOptions, MergeRequest};
//! use pmxmerge_core::UpdateFeatures;
//!
//! let options = MergeOptions::default().with_update(UpdateFeatures::MORPH);
//! let request = MergeRequest::new("base.pmx", "patch.pmx")
//!     .with_output("merged.pmx")
//!     .with_options(options);
//!
//! let outcome = merge_pmx_files(&request, &mut LogDiagnostics)?;
//! println!("{}", outcome.stats);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [`merge_models`] does the same on models already in memory.

pub mod diagnostics;
mod error;
mod files;
mod merge;
mod options;
mod validate;

pub use diagnostics::{Diagnostics, LogDiagnostics, MergeEvent};
pub use error::{Error, Result};
pub use files::{merge_pmx_files, MergeOutcome, MergeRequest};
pub use merge::{merge_models, MergeStats};
pub use options::{AppendFeatures, MergeOptions, UpdateFeatures};
pub use validate::{Role, ValidationReport};
