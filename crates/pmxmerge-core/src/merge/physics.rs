//! Rigid body and joint pass.

use pmxmerge_pmx::{Joint, Model, Named, NamedList, RigidBody};

use super::Merger;
use crate::options::{AppendFeatures, UpdateFeatures};
use crate::Result;

fn rigid_bodies(model: &mut Model) -> &mut NamedList<RigidBody> {
    &mut model.rigid_bodies
}

fn joints(model: &mut Model) -> &mut NamedList<Joint> {
    &mut model.joints
}

impl Merger<'_> {
    /// Joints are handled after rigid bodies so they can connect bodies
    /// added in the same pass.
    pub(super) fn merge_physics(&mut self) -> Result<()> {
        let patch = self.patch;
        if self.options.update.contains(UpdateFeatures::PHYSICS) {
            self.replace_existing(&patch.rigid_bodies, rigid_bodies)?;
            self.replace_existing(&patch.joints, joints)?;
        }
        if self.options.append.contains(AppendFeatures::PHYSICS) {
            self.append_missing(&patch.rigid_bodies, rigid_bodies)?;
            self.append_missing(&patch.joints, joints)?;
        }

        self.family_done(RigidBody::KIND, self.base.rigid_bodies.len());
        self.family_done(Joint::KIND, self.base.joints.len());
        Ok(())
    }
}
