//! Display group pass.

use pmxmerge_pmx::{DisplayGroup, Model, Named, NamedList};

use super::Merger;
use crate::diagnostics::MergeEvent;
use crate::options::{AppendFeatures, UpdateFeatures};
use crate::Result;

fn display_groups(model: &mut Model) -> &mut NamedList<DisplayGroup> {
    &mut model.display_groups
}

impl Merger<'_> {
    /// Replacing runs first, so with both append and update selected a
    /// shared group ends up equal to the patch group.
    pub(super) fn merge_display(&mut self) -> Result<()> {
        let patch = self.patch;
        if self.options.update.contains(UpdateFeatures::DISPLAY) {
            self.replace_existing(&patch.display_groups, display_groups)?;
        }
        if self.options.append.contains(AppendFeatures::DISPLAY) {
            self.append_missing(&patch.display_groups, display_groups)?;
            for group in &patch.display_groups {
                let Some(existing) = self.base.display_groups.get_mut(group.name()) else {
                    continue;
                };
                let added = existing.merge_items(&group.items);
                if added > 0 {
                    self.emit(MergeEvent::DisplayItemsAdded {
                        group: group.name().to_owned(),
                        added,
                    });
                }
            }
        }

        self.family_done(DisplayGroup::KIND, self.base.display_groups.len());
        Ok(())
    }
}
