//! Pass for group, bone and material morphs. Vertex and UV morphs travel
//! with the mesh.

use pmxmerge_pmx::{Morph, Named};

use super::Merger;
use crate::options::{AppendFeatures, UpdateFeatures};
use crate::Result;

impl Merger<'_> {
    pub(super) fn merge_morphs(&mut self) -> Result<()> {
        let patch = self.patch;
        let append = self.options.append.contains(AppendFeatures::MORPH);
        let update = self.options.update.contains(UpdateFeatures::MORPH);

        for morph in patch.morphs.iter().filter(|m| !m.kind.is_mesh()) {
            match self.base.morphs.index_of(morph.name()) {
                None if append => {
                    let index = self.base.morphs.push(morph.clone())?;
                    self.appended(Morph::KIND, morph.name(), index);
                }
                Some(index) if update => {
                    self.base.morphs.replace_at(index, morph.clone())?;
                    self.replaced(Morph::KIND, morph.name(), index);
                }
                _ => {}
            }
        }

        self.family_done(Morph::KIND, self.base.morphs.len());
        Ok(())
    }
}
