//! Running checks over a repository.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::checks::{
    CheckBox, CheckContext, GlsaCheck, ProfilesCheck, PythonCheck, RepoProfilesCheck,
};
use crate::error::{Error, Result};
use crate::profile::{ProfileNode, NON_PROFILE_DIRS};
use crate::repo::RepoSet;
use crate::report::Report;

/// The checks a scan can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CheckKind {
    Profiles,
    RepoProfiles,
    Glsa,
    Python,
}

impl CheckKind {
    /// Every check, in the order they run.
    pub const ALL: &'static [CheckKind] = &[
        CheckKind::Profiles,
        CheckKind::RepoProfiles,
        CheckKind::Glsa,
        CheckKind::Python,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CheckKind::Profiles => "ProfilesCheck",
            CheckKind::RepoProfiles => "RepoProfilesCheck",
            CheckKind::Glsa => "GlsaCheck",
            CheckKind::Python => "PythonCheck",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CheckKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CheckKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::UnknownCheck(s.to_string()))
    }
}

/// Options for a [`Scanner`].
#[derive(Debug, Clone)]
pub struct ScanOptions {
    repo: PathBuf,
    masters: Vec<PathBuf>,
    glsa_dir: Option<PathBuf>,
    gentoo_repo: Option<bool>,
    checks: Option<Vec<CheckKind>>,
}

impl ScanOptions {
    /// Scan the repository at `repo` with every check enabled.
    #[must_use]
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        ScanOptions {
            repo: repo.into(),
            masters: Vec::new(),
            glsa_dir: None,
            gentoo_repo: None,
            checks: None,
        }
    }

    /// Add a master repository, used to resolve atoms and categories.
    #[must_use]
    pub fn master(mut self, path: impl Into<PathBuf>) -> Self {
        self.masters.push(path.into());
        self
    }

    /// Read advisories from `path` instead of `metadata/glsa`.
    #[must_use]
    pub fn glsa_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.glsa_dir = Some(path.into());
        self
    }

    /// Treat the target as the gentoo repository or not. By default this
    /// is decided by its repo id.
    #[must_use]
    pub fn gentoo_repo(mut self, gentoo_repo: bool) -> Self {
        self.gentoo_repo = Some(gentoo_repo);
        self
    }

    /// Restrict the scan to `checks`.
    #[must_use]
    pub fn checks<I>(mut self, checks: I) -> Self
    where
        I: IntoIterator<Item = CheckKind>,
    {
        self.checks = Some(checks.into_iter().collect());
        self
    }
}

/// Loaded repositories plus the checks to run over them.
pub struct Scanner {
    ctx: CheckContext,
    checks: Vec<CheckBox>,
}

impl fmt::Debug for Scanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("ctx", &self.ctx)
            .field("checks", &self.check_names())
            .finish()
    }
}

impl Scanner {
    /// Load the repositories and set up the requested checks.
    ///
    /// Checks that do not apply to the target, like [`CheckKind::Glsa`]
    /// outside the gentoo repository, are silently left out.
    ///
    /// # Errors
    ///
    /// Returns an error if a repository or the GLSA directory cannot be
    /// read.
    pub fn new(options: ScanOptions) -> Result<Scanner> {
        let repos = RepoSet::load(&options.repo, &options.masters)?;
        let gentoo_repo = options
            .gentoo_repo
            .unwrap_or_else(|| repos.target().repo_id() == "gentoo");
        let ctx = CheckContext {
            repos,
            gentoo_repo,
            glsa_dir: options.glsa_dir,
        };

        let mut kinds = options.checks.unwrap_or_else(|| CheckKind::ALL.to_vec());
        kinds.sort();
        kinds.dedup();

        let mut checks: Vec<CheckBox> = Vec::new();
        for kind in kinds {
            match kind {
                CheckKind::Profiles => checks.push(Box::new(ProfilesCheck::new(&ctx))),
                CheckKind::RepoProfiles => checks.push(Box::new(RepoProfilesCheck::new())),
                CheckKind::Glsa => {
                    if let Some(check) = GlsaCheck::new(&ctx)? {
                        checks.push(Box::new(check));
                    }
                }
                CheckKind::Python => checks.push(Box::new(PythonCheck::new())),
            }
        }
        info!(
            repo = ctx.target().repo_id(),
            gentoo_repo,
            checks = checks.len(),
            "scanner ready"
        );
        Ok(Scanner { ctx, checks })
    }

    pub fn context(&self) -> &CheckContext {
        &self.ctx
    }

    /// Names of the checks that will run.
    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Run every check: profile directories first, then package versions,
    /// then the repository-wide results.
    ///
    /// # Errors
    ///
    /// Returns an error if profile data cannot be read.
    pub fn run(&mut self) -> Result<Vec<Report>> {
        let ctx = &self.ctx;
        let mut reports = Vec::new();

        for node in profile_nodes(&ctx.target().profiles_base())? {
            debug!(profile = node.name(), "feeding profile");
            for check in &mut self.checks {
                reports.extend(check.feed_profile(ctx, &node)?);
            }
        }

        for pkg in ctx.target().packages() {
            for check in &mut self.checks {
                reports.extend(check.feed_package(ctx, pkg));
            }
        }

        for check in &mut self.checks {
            reports.extend(check.finish(ctx)?);
        }
        info!(results = reports.len(), "scan complete");
        Ok(reports)
    }
}

/// Every directory of the `profiles/` tree, root included, in name order.
fn profile_nodes(base: &Path) -> Result<Vec<ProfileNode>> {
    if !base.is_dir() {
        return Ok(Vec::new());
    }
    let mut nodes = Vec::new();
    let walker = WalkDir::new(base)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() != 1 || !NON_PROFILE_DIRS.iter().any(|d| e.file_name() == *d)
        });
    for entry in walker {
        let entry = entry.map_err(|e| Error::Io {
            path: base.to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(base) else {
            continue;
        };
        nodes.push(ProfileNode::load(base, &rel.to_string_lossy())?);
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportKind;
    use crate::testutil::TestRepo;

    #[test]
    fn check_names() {
        assert_eq!("PythonCheck".parse::<CheckKind>().unwrap(), CheckKind::Python);
        assert_eq!(CheckKind::RepoProfiles.to_string(), "RepoProfilesCheck");
        assert_eq!(
            "Bogus".parse::<CheckKind>().unwrap_err(),
            Error::UnknownCheck("Bogus".into())
        );
    }

    #[test]
    fn gentoo_repo_detection() {
        let gentoo = TestRepo::new("gentoo");
        let scanner = Scanner::new(ScanOptions::new(gentoo.path())).unwrap();
        assert!(scanner.context().gentoo_repo);
        // no glsa source, so the GLSA check drops out
        assert_eq!(
            scanner.check_names(),
            ["ProfilesCheck", "RepoProfilesCheck", "PythonCheck"]
        );

        let overlay = TestRepo::new("overlay");
        let scanner = Scanner::new(
            ScanOptions::new(overlay.path())
                .gentoo_repo(true)
                .checks([CheckKind::Python, CheckKind::Python]),
        )
        .unwrap();
        assert!(scanner.context().gentoo_repo);
        assert_eq!(scanner.check_names(), ["PythonCheck"]);
    }

    #[test]
    fn profile_walk_skips_data_dirs() {
        let test = TestRepo::new("test")
            .dir("profiles/base")
            .dir("profiles/default/linux")
            .dir("profiles/desc")
            .dir("profiles/updates")
            .dir("profiles/arch/desc");
        let names: Vec<String> = profile_nodes(&test.profiles())
            .unwrap()
            .iter()
            .map(|n| n.name().to_string())
            .collect();
        assert_eq!(
            names,
            ["", "arch", "arch/desc", "base", "default", "default/linux"]
        );
    }

    #[test]
    fn runs_profile_and_package_checks() {
        let test = TestRepo::new("test")
            .file("profiles/arch.list", "amd64\n")
            .file("profiles/categories", "dev-python\n")
            .file("profiles/profiles.desc", "amd64 base stable\n")
            .file("profiles/base/use.mask", "bogus\n")
            .package(
                "dev-python/foo-1",
                "EAPI=8\nDESCRIPTION=x\nSLOT=0\nRDEPEND=dev-lang/python:3.12\n",
            );
        let mut scanner = Scanner::new(ScanOptions::new(test.path())).unwrap();
        let kinds: Vec<ReportKind> = scanner.run().unwrap().iter().map(|r| r.kind()).collect();
        assert_eq!(
            kinds,
            [ReportKind::UnknownProfileUse, ReportKind::MissingPythonEclass]
        );
    }
}
