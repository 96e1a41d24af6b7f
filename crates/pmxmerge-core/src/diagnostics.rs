//! Structured merge progress reporting.
//!
//! The merge engine never logs on its own. It hands every notable step to a
//! [`Diagnostics`] sink, so embedders decide whether events go to the `log`
//! facade, into a test vector, or nowhere.

use std::fmt;
use std::path::PathBuf;

use log::Level;
use pmxmerge_pmx::ModelSummary;

use crate::options::MergeOptions;
use crate::validate::Role;

/// One step of a merge.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeEvent {
    /// A merge is starting with these options.
    Started { options: MergeOptions },
    /// An input model finished loading.
    Loaded { role: Role, summary: ModelSummary },
    /// The output path is the base path.
    OverwritingBase { path: PathBuf },
    /// A patch record was added to the base.
    Appended {
        kind: &'static str,
        name: String,
        index: usize,
    },
    /// Selected fields of a base record were overwritten from the patch.
    Updated {
        kind: &'static str,
        name: String,
        index: usize,
    },
    /// A base record was replaced whole by the patch record.
    Replaced {
        kind: &'static str,
        name: String,
        index: usize,
    },
    /// A base material took over the patch material's faces.
    FacesReplaced { material: String, faces: usize },
    /// Patch offsets were appended to a same-named vertex or UV morph.
    OffsetsConcatenated { morph: String, added: usize },
    /// Same-named morphs of different types; the patch morph won.
    MorphTypeMismatch {
        morph: String,
        base: &'static str,
        patch: &'static str,
    },
    /// Patch entries were added to an existing display group.
    DisplayItemsAdded { group: String, added: usize },
    /// The base gained extra UV channels to hold patch vertices.
    ExtraUvsWidened { from: u8, to: u8 },
    /// Textures no material references anymore were dropped.
    TexturesPurged { count: usize },
    /// Vertices no face references anymore were dropped.
    VerticesPurged { count: usize },
    /// References to missing records were unset.
    DanglingReferencesCleared { count: usize },
    /// A family finished merging; `count` is the base collection size.
    FamilyMerged { kind: &'static str, count: usize },
    /// The merged model was written.
    Saved { path: PathBuf, summary: ModelSummary },
}

impl MergeEvent {
    /// Log level this event deserves.
    pub fn level(&self) -> Level {
        match self {
            MergeEvent::OverwritingBase { .. } | MergeEvent::MorphTypeMismatch { .. } => {
                Level::Warn
            }
            MergeEvent::DanglingReferencesCleared { count } if *count > 0 => Level::Warn,
            MergeEvent::Started { .. }
            | MergeEvent::Loaded { .. }
            | MergeEvent::FamilyMerged { .. }
            | MergeEvent::Saved { .. } => Level::Info,
            _ => Level::Debug,
        }
    }
}

impl fmt::Display for MergeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeEvent::Started { options } => write!(f, "merging: {options}"),
            MergeEvent::Loaded { role, summary } => write!(f, "{role} model: {summary}"),
            MergeEvent::OverwritingBase { path } => {
                write!(f, "overwriting the base model '{}'", path.display())
            }
            MergeEvent::Appended { kind, name, index } => {
                write!(f, "added {kind} '{name}' (index {index})")
            }
            MergeEvent::Updated { kind, name, index } => {
                write!(f, "updated {kind} '{name}' (index {index})")
            }
            MergeEvent::Replaced { kind, name, index } => {
                write!(f, "replaced {kind} '{name}' (index {index})")
            }
            MergeEvent::FacesReplaced { material, faces } => {
                write!(f, "material '{material}' now has {faces} faces from the patch")
            }
            MergeEvent::OffsetsConcatenated { morph, added } => {
                write!(f, "morph '{morph}' gained {added} offsets")
            }
            MergeEvent::MorphTypeMismatch { morph, base, patch } => write!(
                f,
                "morph '{morph}' is a {base} morph in the base but a {patch} morph in the patch; \
                 replacing it"
            ),
            MergeEvent::DisplayItemsAdded { group, added } => {
                write!(f, "display group '{group}' gained {added} entries")
            }
            MergeEvent::ExtraUvsWidened { from, to } => {
                write!(f, "extra UV channels raised from {from} to {to}")
            }
            MergeEvent::TexturesPurged { count } => write!(f, "dropped {count} unused textures"),
            MergeEvent::VerticesPurged { count } => write!(f, "dropped {count} unused vertices"),
            MergeEvent::DanglingReferencesCleared { count } => {
                write!(f, "unset {count} references to missing records")
            }
            MergeEvent::FamilyMerged { kind, count } => {
                write!(f, "{kind} merge done, base now holds {count}")
            }
            MergeEvent::Saved { path, summary } => {
                write!(f, "saved '{}': {summary}", path.display())
            }
        }
    }
}

/// Receiver of merge events.
pub trait Diagnostics {
    fn emit(&mut self, event: MergeEvent);
}

/// Forwards every event to the `log` facade at [`MergeEvent::level`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn emit(&mut self, event: MergeEvent) {
        log::log!(target: "pmxmerge", event.level(), "{event}");
    }
}

/// Collects events, mostly for tests.
impl Diagnostics for Vec<MergeEvent> {
    fn emit(&mut self, event: MergeEvent) {
        self.push(event);
    }
}

/// Drops every event.
impl Diagnostics for () {
    fn emit(&mut self, _event: MergeEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        let mismatch = MergeEvent::MorphTypeMismatch {
            morph: "smile".into(),
            base: "vertex",
            patch: "group",
        };
        assert_eq!(mismatch.level(), Level::Warn);
        assert_eq!(
            MergeEvent::DanglingReferencesCleared { count: 0 }.level(),
            Level::Debug
        );
        assert_eq!(
            MergeEvent::FamilyMerged { kind: "bone", count: 3 }.level(),
            Level::Info
        );
    }

    #[test]
    fn test_vec_collects() {
        let mut events = Vec::new();
        let sink: &mut dyn Diagnostics = &mut events;
        sink.emit(MergeEvent::TexturesPurged { count: 2 });
        assert_eq!(events, vec![MergeEvent::TexturesPurged { count: 2 }]);
        assert_eq!(events[0].to_string(), "dropped 2 unused textures");
    }
}
