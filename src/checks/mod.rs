//! Repository checks.
//!
//! A check sees every profile directory, then every cached package
//! version, then gets a final [`Check::finish`] call for repository-wide
//! results. All hooks default to producing nothing.

use std::path::PathBuf;

use crate::error::Result;
use crate::package::Package;
use crate::profile::ProfileNode;
use crate::repo::{RepoSet, Repository};
use crate::report::{Report, ReportKind};

mod glsa;
mod profiles;
mod python;

pub use glsa::GlsaCheck;
pub use profiles::{ProfilesCheck, RepoProfilesCheck};
pub use python::PythonCheck;

/// State shared by every check of a scan.
#[derive(Debug, Clone)]
pub struct CheckContext {
    /// Target repository first, then its masters.
    pub repos: RepoSet,
    /// Whether the target is the main gentoo repository, which enables
    /// checks and validations that only make sense there.
    pub gentoo_repo: bool,
    /// Explicit GLSA directory.
    pub glsa_dir: Option<PathBuf>,
}

impl CheckContext {
    pub fn target(&self) -> &Repository {
        self.repos.target()
    }
}

/// A repository check.
pub trait Check {
    /// CamelCase name of the check.
    fn name(&self) -> &'static str;

    /// Result kinds the check may emit.
    fn known_results(&self) -> &'static [ReportKind];

    /// Inspect one profile directory.
    fn feed_profile(&mut self, _ctx: &CheckContext, _node: &ProfileNode) -> Result<Vec<Report>> {
        Ok(Vec::new())
    }

    /// Inspect one package version.
    fn feed_package(&mut self, _ctx: &CheckContext, _pkg: &Package) -> Vec<Report> {
        Vec::new()
    }

    /// Emit repository-wide results once everything was fed.
    fn finish(&mut self, _ctx: &CheckContext) -> Result<Vec<Report>> {
        Ok(Vec::new())
    }
}

/// Boxed check trait object.
pub type CheckBox = Box<dyn Check>;
