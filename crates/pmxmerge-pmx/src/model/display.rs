//! Display groups shown in the editor's frame panel.

use crate::named::impl_named;

/// One entry of a display group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DisplayItem {
    Bone(Option<String>),
    Morph(Option<String>),
}

impl DisplayItem {
    pub(crate) const BONE: u8 = 0;
    pub(crate) const MORPH: u8 = 1;

    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Bone(name) | Self::Morph(name) => name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayGroup {
    name: String,
    pub name_en: String,
    /// Set for the built-in "Root" and expression groups.
    pub special: bool,
    pub items: Vec<DisplayItem>,
}

impl_named!(DisplayGroup, "display group");

impl DisplayGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_en: String::new(),
            special: false,
            items: Vec::new(),
        }
    }

    /// Append each item not already listed, keeping existing order.
    /// Returns the number added.
    pub fn merge_items<'a>(&mut self, items: impl IntoIterator<Item = &'a DisplayItem>) -> usize {
        let mut added = 0;
        for item in items {
            if !self.items.contains(item) {
                self.items.push(item.clone());
                added += 1;
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_items_is_set_like() {
        let mut group = DisplayGroup::new("arms");
        group.items = vec![
            DisplayItem::Bone(Some("arm_L".into())),
            DisplayItem::Morph(Some("smile".into())),
        ];
        let patch = [
            DisplayItem::Bone(Some("arm_R".into())),
            DisplayItem::Bone(Some("arm_L".into())),
            DisplayItem::Bone(Some("smile".into())),
        ];

        assert_eq!(group.merge_items(&patch), 2);
        assert_eq!(group.items[2], DisplayItem::Bone(Some("arm_R".into())));
        assert_eq!(group.items[3], DisplayItem::Bone(Some("smile".into())));
    }
}
