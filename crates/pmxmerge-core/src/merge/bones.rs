//! Bone pass.

use pmxmerge_pmx::{Bone, Named};

use super::Merger;
use crate::options::UpdateFeatures;
use crate::Result;

impl Merger<'_> {
    /// Append patch bones the base lacks. Existing bones get the selected
    /// update grains copied in place, keeping their position.
    pub(super) fn merge_bones(&mut self) -> Result<()> {
        let patch = self.patch;
        let grains =
            self.options.update & (UpdateFeatures::BONE_LOCATION | UpdateFeatures::BONE_SETTING);

        for bone in &patch.bones {
            let Some(index) = self.base.bones.index_of(bone.name()) else {
                let index = self.base.bones.push(bone.clone())?;
                self.appended(Bone::KIND, bone.name(), index);
                continue;
            };
            if grains.is_empty() {
                continue;
            }
            if let Some(existing) = self.base.bones.at_mut(index) {
                if grains.contains(UpdateFeatures::BONE_LOCATION) {
                    existing.copy_location_from(bone);
                }
                if grains.contains(UpdateFeatures::BONE_SETTING) {
                    existing.copy_settings_from(bone);
                }
            }
            self.updated(Bone::KIND, bone.name(), index);
        }

        self.family_done(Bone::KIND, self.base.bones.len());
        Ok(())
    }
}
