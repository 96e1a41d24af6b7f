//! Merge feature selection.

use std::fmt;

use bitflags::bitflags;

use crate::{Error, Result};

bitflags! {
    /// Optional families copied from the patch when the base lacks them.
    /// Bones and materials are always appended.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AppendFeatures: u8 {
        const MORPH = 1 << 0;
        const PHYSICS = 1 << 1;
        const DISPLAY = 1 << 2;
    }
}

bitflags! {
    /// Families whose existing base records are overwritten from the patch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UpdateFeatures: u8 {
        /// Bone location and display connection.
        const BONE_LOCATION = 1 << 0;
        /// Every other bone field.
        const BONE_SETTING = 1 << 1;
        /// Material render settings. Faces are never touched.
        const MATERIAL_SETTING = 1 << 2;
        const MORPH = 1 << 3;
        const PHYSICS = 1 << 4;
        const DISPLAY = 1 << 5;
    }
}

impl AppendFeatures {
    /// Parse a comma separated list of feature names, case-insensitive.
    /// `all` and `none` are accepted as shorthands.
    pub fn parse_list(list: &str) -> Result<Self> {
        parse_list(list, |name| Self::from_name(name))
    }

    /// Upper-case feature names, in bit order.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

impl UpdateFeatures {
    /// Parse a comma separated list of feature names, case-insensitive.
    ///
    /// Besides the flag names this accepts `BONE` (both bone grains) and
    /// `MAT_SETTING`, plus the `all` and `none` shorthands.
    pub fn parse_list(list: &str) -> Result<Self> {
        parse_list(list, |name| match name {
            "BONE" => Some(Self::BONE_LOCATION | Self::BONE_SETTING),
            "MAT_SETTING" => Some(Self::MATERIAL_SETTING),
            other => Self::from_name(other),
        })
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

fn parse_list<F>(list: &str, lookup: impl Fn(&str) -> Option<F>) -> Result<F>
where
    F: bitflags::Flags + Copy,
{
    let mut flags = F::empty();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let name = item.to_ascii_uppercase();
        match name.as_str() {
            "ALL" => flags = F::all(),
            "NONE" => flags = F::empty(),
            _ => {
                let flag = lookup(&name)
                    .ok_or_else(|| Error::InvalidRequest(format!("unknown feature '{item}'")))?;
                flags.insert(flag);
            }
        }
    }
    Ok(flags)
}

/// Which optional families a merge appends and updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    pub append: AppendFeatures,
    pub update: UpdateFeatures,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            append: AppendFeatures::all(),
            update: UpdateFeatures::all(),
        }
    }
}

impl MergeOptions {
    /// Append bones and materials only, update nothing.
    pub fn minimal() -> Self {
        Self {
            append: AppendFeatures::empty(),
            update: UpdateFeatures::empty(),
        }
    }

    pub fn with_append(mut self, append: AppendFeatures) -> Self {
        self.append = append;
        self
    }

    pub fn with_update(mut self, update: UpdateFeatures) -> Self {
        self.update = update;
        self
    }
}

impl fmt::Display for MergeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |names: Vec<&str>| {
            if names.is_empty() {
                "nothing".to_string()
            } else {
                names.join(", ")
            }
        };
        write!(
            f,
            "append {} (bones and materials always), update {}",
            list(self.append.names()),
            list(self.update.names())
        )
    }
}
