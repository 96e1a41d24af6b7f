//! PMX 2.0 model graph and codec.
//!
//! Models are loaded into a graph where every cross reference is a name
//! (bones, materials, morphs, rigid bodies) or a model-local [`VertexId`].
//! Positional indices exist only in the file; saving derives them again from
//! the current order of each collection, using the smallest index width that
//! fits.
//!
//! # Example
//!
//! ```no_run
//! use pmxmerge_pmx::Model;
//!
//! let mut model = Model::open("base.pmx")?;
//! println!("{}", model.summary());
//!
//! for issue in model.validate() {
//!     println!("{}", issue);
//! }
//!
//! if let Some(bone) = model.bones.get_mut("arm_L") {
//!     bone.location[1] += 0.5;
//! }
//! model.save("base_edited.pmx")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Named collections
//!
//! Materials, bones, morphs, display groups, rigid bodies and joints live in
//! [`NamedList`]s. Lists loaded from a file keep whatever names the file
//! holds, duplicates included, so [`Model::validate`] can report them. Every
//! mutation through the list API rejects empty and duplicate names.

mod codec;
mod error;
pub mod header;
pub mod model;
mod named;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

pub use error::{Error, Result};
pub use header::{Header, IndexWidths};
pub use model::*;
pub use named::{NameIssue, NameProblem, Named, NamedList};

pub use pmxmerge_common::{IndexWidth, TextEncoding};

use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

/// Hash map keyed with FxHash.
pub type FxHashMap<K, V> = hashbrown::HashMap<K, V, BuildHasherDefault<FxHasher>>;

/// Hash set keyed with FxHash.
pub type FxHashSet<T> = hashbrown::HashSet<T, BuildHasherDefault<FxHasher>>;
