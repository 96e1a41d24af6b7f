//! Pre-merge name validation.

use std::fmt;

use pmxmerge_pmx::{Model, NameIssue};

/// Which input a model plays in a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Base,
    Patch,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Base => "base",
            Role::Patch => "patch",
        })
    }
}

/// Every empty or duplicate name found in the merge inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<(Role, NameIssue)>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the issues of one model.
    pub fn check(&mut self, role: Role, model: &Model) -> &mut Self {
        self.issues
            .extend(model.validate().into_iter().map(|issue| (role, issue)));
        self
    }

    /// Report for a base and patch pair.
    pub fn for_inputs(base: &Model, patch: &Model) -> Self {
        let mut report = Self::new();
        report.check(Role::Base, base).check(Role::Patch, patch);
        report
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Issues belonging to one input.
    pub fn issues_for(&self, role: Role) -> impl Iterator<Item = &NameIssue> {
        self.issues
            .iter()
            .filter(move |(r, _)| *r == role)
            .map(|(_, issue)| issue)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} naming problem(s) must be fixed before merging",
            self.issues.len()
        )?;
        for (role, issue) in &self.issues {
            write!(f, "\n  {role}: {issue}")?;
        }
        Ok(())
    }
}
