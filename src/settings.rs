//! Last-used paths and merge toggles, kept between runs as a flat JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use pmxmerge::prelude::*;

/// Default settings file, looked up in the working directory.
pub const DEFAULT_FILE: &str = ".pmxmerge.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base: Option<PathBuf>,
    pub patch: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub append_morph: bool,
    pub append_physics: bool,
    pub append_display: bool,
    pub update_bone_location: bool,
    pub update_bone_setting: bool,
    pub update_material_setting: bool,
    pub update_morph: bool,
    pub update_physics: bool,
    pub update_display: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let mut settings = Self {
            base: None,
            patch: None,
            output: None,
            append_morph: false,
            append_physics: false,
            append_display: false,
            update_bone_location: false,
            update_bone_setting: false,
            update_material_setting: false,
            update_morph: false,
            update_physics: false,
            update_display: false,
        };
        settings.set_options(&MergeOptions::default());
        settings
    }
}

impl Settings {
    /// Read the settings file. A missing or unreadable file yields the
    /// defaults; the tool must keep working without it.
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                log::debug!("no settings at '{}' ({err}), using defaults", path.display());
                return Self::default();
            }
        };
        match serde_json::from_str(&text) {
            Ok(settings) => settings,
            Err(err) => {
                log::warn!(
                    "ignoring corrupt settings file '{}': {err}",
                    path.display()
                );
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create '{}'", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write settings '{}'", path.display()))?;
        Ok(())
    }

    pub fn options(&self) -> MergeOptions {
        let mut append = AppendFeatures::empty();
        append.set(AppendFeatures::MORPH, self.append_morph);
        append.set(AppendFeatures::PHYSICS, self.append_physics);
        append.set(AppendFeatures::DISPLAY, self.append_display);

        let mut update = UpdateFeatures::empty();
        update.set(UpdateFeatures::BONE_LOCATION, self.update_bone_location);
        update.set(UpdateFeatures::BONE_SETTING, self.update_bone_setting);
        update.set(UpdateFeatures::MATERIAL_SETTING, self.update_material_setting);
        update.set(UpdateFeatures::MORPH, self.update_morph);
        update.set(UpdateFeatures::PHYSICS, self.update_physics);
        update.set(UpdateFeatures::DISPLAY, self.update_display);

        MergeOptions { append, update }
    }

    pub fn set_options(&mut self, options: &MergeOptions) {
        self.append_morph = options.append.contains(AppendFeatures::MORPH);
        self.append_physics = options.append.contains(AppendFeatures::PHYSICS);
        self.append_display = options.append.contains(AppendFeatures::DISPLAY);

        let update = options.update;
        self.update_bone_location = update.contains(UpdateFeatures::BONE_LOCATION);
        self.update_bone_setting = update.contains(UpdateFeatures::BONE_SETTING);
        self.update_material_setting = update.contains(UpdateFeatures::MATERIAL_SETTING);
        self.update_morph = update.contains(UpdateFeatures::MORPH);
        self.update_physics = update.contains(UpdateFeatures::PHYSICS);
        self.update_display = update.contains(UpdateFeatures::DISPLAY);
    }

    /// Remember the paths and options of a request.
    pub fn record(&mut self, request: &MergeRequest) {
        self.base = Some(request.base.clone());
        self.patch = Some(request.patch.clone());
        self.output = request.output.clone();
        self.set_options(&request.options);
    }
}
