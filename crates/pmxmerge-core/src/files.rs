//! File-level merge: resolve paths, load both inputs, merge, save atomically.

use std::fs;
use std::path::{Path, PathBuf};

use pmxmerge_pmx::{Model, ModelSummary};

use crate::diagnostics::{Diagnostics, MergeEvent};
use crate::merge::{merge_models, MergeStats};
use crate::options::MergeOptions;
use crate::validate::Role;
use crate::{Error, Result};

/// Paths and options of one merge run.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeRequest {
    pub base: PathBuf,
    pub patch: PathBuf,
    /// Destination. `None` or an empty path overwrites the base model.
    pub output: Option<PathBuf>,
    pub options: MergeOptions,
}

impl MergeRequest {
    pub fn new(base: impl Into<PathBuf>, patch: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            patch: patch.into(),
            output: None,
            options: MergeOptions::default(),
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_options(mut self, options: MergeOptions) -> Self {
        self.options = options;
        self
    }

    /// Where the merged model will be written.
    ///
    /// A relative output next to an absolute base is taken relative to the
    /// base model's directory.
    pub fn resolve_output(&self) -> PathBuf {
        match self.output.as_deref() {
            None => self.base.clone(),
            Some(output) if output.as_os_str().is_empty() => self.base.clone(),
            Some(output) if output.is_relative() && self.base.is_absolute() => self
                .base
                .parent()
                .map_or_else(|| output.to_path_buf(), |dir| dir.join(output)),
            Some(output) => output.to_path_buf(),
        }
    }

    /// Reject requests that cannot produce a sensible merge, returning the
    /// resolved output path otherwise.
    pub fn check(&self) -> Result<PathBuf> {
        if self.base.as_os_str().is_empty() {
            return Err(Error::InvalidRequest("no base model given".into()));
        }
        if self.patch.as_os_str().is_empty() {
            return Err(Error::InvalidRequest("no patch model given".into()));
        }
        if same_file(&self.base, &self.patch) {
            return Err(Error::InvalidRequest(format!(
                "base and patch are the same file '{}'",
                self.base.display()
            )));
        }
        let output = self.resolve_output();
        let is_pmx = output
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pmx"));
        if !is_pmx {
            return Err(Error::InvalidRequest(format!(
                "output '{}' must have a .pmx extension",
                output.display()
            )));
        }
        Ok(output)
    }
}

/// What a successful [`merge_pmx_files`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub base: PathBuf,
    pub patch: PathBuf,
    pub output: PathBuf,
    pub stats: MergeStats,
    /// Counts of the written model.
    pub summary: ModelSummary,
}

/// Load both models of `request`, merge the patch into the base and write
/// the result.
///
/// The output file is replaced only once the merged model has been fully
/// serialised, so a failure never leaves a partial file behind, even when
/// the output is the base model itself.
pub fn merge_pmx_files(
    request: &MergeRequest,
    diagnostics: &mut dyn Diagnostics,
) -> Result<MergeOutcome> {
    let output = request.check()?;
    diagnostics.emit(MergeEvent::Started {
        options: request.options,
    });

    let mut base = load(Role::Base, &request.base, diagnostics)?;
    let patch = load(Role::Patch, &request.patch, diagnostics)?;
    if same_file(&output, &request.base) {
        diagnostics.emit(MergeEvent::OverwritingBase {
            path: output.clone(),
        });
    }

    let stats = merge_models(&mut base, &patch, &request.options, diagnostics)?;

    base.save(&output).map_err(|source| Error::Save {
        path: output.clone(),
        source,
    })?;
    let summary = base.summary();
    diagnostics.emit(MergeEvent::Saved {
        path: output.clone(),
        summary,
    });

    Ok(MergeOutcome {
        base: request.base.clone(),
        patch: request.patch.clone(),
        output,
        stats,
        summary,
    })
}

fn load(role: Role, path: &Path, diagnostics: &mut dyn Diagnostics) -> Result<Model> {
    let model = Model::open(path).map_err(|source| Error::Load {
        role,
        path: path.to_path_buf(),
        source,
    })?;
    diagnostics.emit(MergeEvent::Loaded {
        role,
        summary: model.summary(),
    });
    Ok(model)
}

/// Path equality, looking through symlinks and `..` when both paths exist.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
