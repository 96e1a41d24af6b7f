//! pmxmerge - PMX 2.0 model codec and name-based merge library.
//!
//! This crate provides a unified interface to the pmxmerge crates.
//!
//! # Crates
//!
//! - [`pmxmerge_common`] - Binary stream primitives (reader, writer, index widths, text)
//! - [`pmxmerge_pmx`] - Model graph, named collections and the PMX load/save codec
//! - [`pmxmerge_core`] - Merge options, validation, diagnostics and the merge engine
//!
//! # Example
//!
//! ```no_run
//! use pmxmerge::prelude::*;
//!
//! let mut base = Model::open("base.pmx")?;
//! let patch = Model::open("patch.pmx")?;
//!
//! let stats = merge_models(&mut base, &patch, &MergeOptions::default(), &mut LogDiagnostics)?;
//! println!("{stats}");
//! base.save("merged.pmx")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export all sub-crates
pub use pmxmerge_common as common;
pub use pmxmerge_core as core;
pub use pmxmerge_pmx as pmx;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use pmxmerge_common::{BinaryReader, BinaryWriter, IndexWidth, TextEncoding};
    pub use pmxmerge_core::{
        merge_models, merge_pmx_files, AppendFeatures, Diagnostics, LogDiagnostics, MergeEvent,
        MergeOptions, MergeOutcome, MergeRequest, MergeStats, Role, UpdateFeatures,
        ValidationReport,
    };
    pub use pmxmerge_pmx::{
        Bone, DisplayGroup, Joint, Material, Model, ModelSummary, Morph, MorphKind, NameIssue,
        Named, NamedList, RigidBody, Vertex, VertexId,
    };
}

// Re-export commonly used types at the crate root
pub use pmxmerge_core::{merge_pmx_files, MergeOptions, MergeRequest};
pub use pmxmerge_pmx::Model;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
