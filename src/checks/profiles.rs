use std::collections::BTreeSet;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use super::{Check, CheckContext};
use crate::error::Result;
use crate::profile::{
    dir_parents, Diagnostic, ProfileNode, ProfileRoots, ProfileStack, ProfilesDesc,
    NON_PROFILE_DIRS, ROOT_PROFILE_DIRS,
};
use crate::report::{Report, ReportKind};

/// How the data of a profile file is verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verify {
    /// Parsing alone reports everything there is to report.
    Parse,
    Deprecated,
    Keywords,
    Use,
    Atoms,
    PackageUse,
}

const KNOWN_FILES: &[(&str, Verify)] = &[
    ("parent", Verify::Parse),
    ("eapi", Verify::Parse),
    ("deprecated", Verify::Deprecated),
    ("package.keywords", Verify::Keywords),
    ("package.accept_keywords", Verify::Keywords),
    ("use.force", Verify::Use),
    ("use.stable.force", Verify::Use),
    ("use.mask", Verify::Use),
    ("use.stable.mask", Verify::Use),
    ("packages", Verify::Atoms),
    ("package.mask", Verify::Atoms),
    ("package.unmask", Verify::Atoms),
    ("package.deprecated", Verify::Atoms),
    ("package.use", Verify::PackageUse),
    ("package.use.force", Verify::PackageUse),
    ("package.use.stable.force", Verify::PackageUse),
    ("package.use.mask", Verify::PackageUse),
    ("package.use.stable.mask", Verify::PackageUse),
];

/// Known profile statuses of the gentoo repository.
const KNOWN_PROFILE_STATUSES: &[&str] = &["stable", "dev", "exp"];

/// Scans profile files for unknown flags, packages and keywords.
#[derive(Debug)]
pub struct ProfilesCheck {
    roots: ProfileRoots,
    available_iuse: BTreeSet<String>,
    valid_keywords: BTreeSet<String>,
}

impl ProfilesCheck {
    pub fn new(ctx: &CheckContext) -> Self {
        let target = ctx.target();
        ProfilesCheck {
            roots: ctx.repos.profile_roots(),
            available_iuse: target.known_use_flags(),
            valid_keywords: target.valid_keywords(),
        }
    }

    /// Flags in `flags` that are not in `known`, sorted and prefixed.
    fn unknown(flags: &[String], known: &BTreeSet<String>, prefix: &str) -> Vec<String> {
        flags
            .iter()
            .filter(|f| !known.contains(*f))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|f| format!("{prefix}{f}"))
            .collect()
    }

    fn verify(
        &self,
        ctx: &CheckContext,
        node: &ProfileNode,
        file: &str,
        verify: Verify,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Vec<Report>> {
        let path = node.relpath(file);
        let mut reports = Vec::new();
        match verify {
            Verify::Parse if file == "parent" => {
                node.parents(&self.roots, diagnostics)?;
            }
            Verify::Parse => {
                node.eapi(diagnostics)?;
            }
            Verify::Deprecated => {
                if let Some(deprecation) = node.deprecated(diagnostics)? {
                    let base = ctx.target().profiles_base();
                    if ProfileNode::load(&base, &deprecation.replacement).is_err() {
                        reports.push(Report::ProfileError(format!(
                            "nonexistent replacement '{}' for deprecated profile: '{}'",
                            deprecation.replacement,
                            node.name()
                        )));
                    }
                }
            }
            Verify::Keywords => {
                for entry in node.package_keywords(file, diagnostics)? {
                    let invalid: BTreeSet<&String> = entry
                        .keywords
                        .iter()
                        .filter(|k| !self.valid_keywords.contains(*k))
                        .collect();
                    if !invalid.is_empty() {
                        reports.push(Report::UnknownProfilePackageKeywords {
                            path: path.clone(),
                            atom: entry.atom.to_string(),
                            keywords: invalid.into_iter().cloned().collect(),
                        });
                    }
                }
            }
            Verify::Use => {
                let flags = node.use_flags(file, diagnostics)?;
                for (list, prefix) in [(&flags.disabled, "-"), (&flags.enabled, "")] {
                    let unknown = Self::unknown(list, &self.available_iuse, prefix);
                    if !unknown.is_empty() {
                        reports.push(Report::UnknownProfileUse {
                            path: path.clone(),
                            flags: unknown,
                        });
                    }
                }
            }
            Verify::Atoms => {
                for atom in node.atoms(file, diagnostics)?.iter() {
                    if ctx.repos.match_atom(atom).is_empty() {
                        reports.push(Report::UnknownProfilePackage {
                            path: path.clone(),
                            atom: atom.to_string(),
                        });
                    }
                }
            }
            Verify::PackageUse => {
                for entry in node.package_use(file, diagnostics)? {
                    let pkgs = ctx.repos.match_atom(&entry.atom);
                    if pkgs.is_empty() {
                        reports.push(Report::UnknownProfilePackage {
                            path: path.clone(),
                            atom: entry.atom.to_string(),
                        });
                        continue;
                    }
                    let available: BTreeSet<String> = pkgs
                        .iter()
                        .flat_map(|pkg| pkg.metadata.iuse_stripped())
                        .map(String::from)
                        .collect();
                    let flags = &entry.flags;
                    for (list, prefix) in [(&flags.disabled, "-"), (&flags.enabled, "")] {
                        let unknown = Self::unknown(list, &available, prefix);
                        if !unknown.is_empty() {
                            reports.push(Report::UnknownProfilePackageUse {
                                path: path.clone(),
                                atom: entry.atom.to_string(),
                                flags: unknown,
                            });
                        }
                    }
                }
            }
        }
        Ok(reports)
    }
}

impl Check for ProfilesCheck {
    fn name(&self) -> &'static str {
        "ProfilesCheck"
    }

    fn known_results(&self) -> &'static [ReportKind] {
        &[
            ReportKind::UnknownProfilePackage,
            ReportKind::UnknownProfilePackageUse,
            ReportKind::UnknownProfileUse,
            ReportKind::UnknownProfilePackageKeywords,
            ReportKind::ProfileWarning,
            ReportKind::ProfileError,
        ]
    }

    fn feed_profile(&mut self, ctx: &CheckContext, node: &ProfileNode) -> Result<Vec<Report>> {
        let mut reports = Vec::new();
        let stable_masks = node.eapi(&mut Vec::new())?.has_stable_use_masks();
        for file in node.files() {
            let known = KNOWN_FILES.iter().find(|(name, _)| *name == file.as_str());
            let Some(&(_, verify)) = known else {
                continue;
            };
            if file.contains(".stable.") && !stable_masks {
                debug!(profile = node.name(), file = %file, "stable masks need EAPI 5");
                continue;
            }
            let mut diagnostics = Vec::new();
            reports.extend(self.verify(ctx, node, file, verify, &mut diagnostics)?);
            reports.extend(diagnostics.into_iter().map(Report::from));
        }
        Ok(reports)
    }
}

/// Scans the `profiles/` tree as a whole: categories, arches,
/// `profiles.desc` and the profiles it lists.
#[derive(Debug, Default)]
pub struct RepoProfilesCheck;

impl RepoProfilesCheck {
    pub fn new() -> Self {
        RepoProfilesCheck
    }
}

/// Directories under `base`, relative to it, that could hold profiles.
fn available_profile_dirs(base: &Path) -> BTreeSet<String> {
    WalkDir::new(base)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| {
            e.depth() != 1 || !NON_PROFILE_DIRS.iter().any(|d| e.file_name() == *d)
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter_map(|e| {
            let rel = e.path().strip_prefix(base).ok()?;
            Some(rel.to_string_lossy().into_owned())
        })
        .filter(|d| !ROOT_PROFILE_DIRS.contains(&d.as_str()))
        .collect()
}

impl Check for RepoProfilesCheck {
    fn name(&self) -> &'static str {
        "RepoProfilesCheck"
    }

    fn known_results(&self) -> &'static [ReportKind] {
        &[
            ReportKind::ArchesWithoutProfiles,
            ReportKind::UnusedProfileDirs,
            ReportKind::NonexistentProfilePath,
            ReportKind::UnknownCategoryDirs,
            ReportKind::NonexistentCategories,
            ReportKind::LaggingProfileEapi,
            ReportKind::ProfileError,
            ReportKind::ProfileWarning,
        ]
    }

    fn finish(&mut self, ctx: &CheckContext) -> Result<Vec<Report>> {
        let repo = ctx.target();
        let base = repo.profiles_base();
        let mut reports = Vec::new();

        let category_dirs = repo.category_dirs()?;
        let categories = ctx.repos.categories();
        let unknown: Vec<String> = category_dirs.difference(&categories).cloned().collect();
        if !unknown.is_empty() {
            reports.push(Report::UnknownCategoryDirs(unknown));
        }
        let nonexistent: BTreeSet<String> = repo
            .categories()
            .iter()
            .filter(|c| !category_dirs.contains(*c))
            .cloned()
            .collect();
        if !nonexistent.is_empty() {
            reports.push(Report::NonexistentCategories(nonexistent.into_iter().collect()));
        }

        let known_status = ctx.gentoo_repo.then_some(KNOWN_PROFILE_STATUSES);
        let mut diagnostics = Vec::new();
        let profiles =
            ProfilesDesc::parse(&base, known_status, repo.known_arches(), &mut diagnostics)?;

        let listed = profiles.arches();
        let without: Vec<String> = repo
            .known_arches()
            .iter()
            .filter(|arch| !listed.contains(arch.as_str()))
            .cloned()
            .collect();
        if !without.is_empty() {
            reports.push(Report::ArchesWithoutProfiles(without));
        }
        reports.extend(diagnostics.into_iter().map(Report::from));

        let roots = ctx.repos.profile_roots();
        let mut seen_dirs = BTreeSet::new();
        let mut lagging: Vec<Report> = Vec::new();
        for entry in &profiles.entries {
            let stack = match ProfileStack::load(&base, &roots, &entry.path) {
                Ok(stack) => stack,
                Err(e) => {
                    debug!(profile = %entry.path, error = %e, "unusable profile");
                    reports.push(Report::NonexistentProfilePath(entry.path.clone()));
                    continue;
                }
            };
            let mut ignored = Vec::new();
            let leaf = stack.leaf();
            let eapi = leaf.eapi(&mut ignored)?;
            for parent in stack.nodes() {
                if parent.base() == base {
                    seen_dirs.extend(dir_parents(parent.name()));
                }
                if !ctx.gentoo_repo {
                    continue;
                }
                let parent_eapi = parent.eapi(&mut ignored)?;
                if eapi >= parent_eapi {
                    continue;
                }
                let report = Report::LaggingProfileEapi {
                    profile: leaf.name().to_string(),
                    eapi,
                    parent: parent.name().to_string(),
                    parent_eapi,
                };
                let existing = lagging.iter_mut().find(|r| {
                    matches!(r, Report::LaggingProfileEapi { profile, .. } if profile == leaf.name())
                });
                match existing {
                    Some(slot) => *slot = report,
                    None => lagging.push(report),
                }
            }
        }
        reports.extend(lagging);

        let unused: Vec<String> = available_profile_dirs(&base)
            .difference(&seen_dirs)
            .cloned()
            .collect();
        if !unused.is_empty() {
            reports.push(Report::UnusedProfileDirs(unused));
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{RepoSet, Repository};
    use crate::testutil::TestRepo;

    const CACHE: &str = "EAPI=8\nDESCRIPTION=x\nSLOT=0\nIUSE=+ssl test\nKEYWORDS=~amd64\n";

    fn context(test: &TestRepo, gentoo_repo: bool) -> CheckContext {
        let repo = Repository::load(test.path()).unwrap();
        CheckContext {
            repos: RepoSet::new(repo, Vec::new()),
            gentoo_repo,
            glsa_dir: None,
        }
    }

    fn feed(test: &TestRepo, name: &str) -> Vec<String> {
        let ctx = context(test, true);
        let mut check = ProfilesCheck::new(&ctx);
        let node = ProfileNode::load(&test.profiles(), name).unwrap();
        check
            .feed_profile(&ctx, &node)
            .unwrap()
            .iter()
            .map(|r| format!("{}: {r}", r.name()))
            .collect()
    }

    fn base_repo() -> TestRepo {
        TestRepo::new("test")
            .file("profiles/arch.list", "amd64\nx86\n")
            .file("profiles/categories", "dev-libs\n")
            .file("profiles/use.desc", "doc - docs\n")
            .package("dev-libs/foo-1", CACHE)
    }

    #[test]
    fn unknown_packages() {
        let test = base_repo().file(
            "profiles/base/package.mask",
            "dev-libs/foo\n-dev-libs/gone\n>=dev-libs/foo-2\n",
        );
        assert_eq!(
            feed(&test, "base"),
            [
                "UnknownProfilePackage: 'base/package.mask': unknown package: '>=dev-libs/foo-2'",
                "UnknownProfilePackage: 'base/package.mask': unknown package: 'dev-libs/gone'",
            ]
        );
    }

    #[test]
    fn unknown_use() {
        let test = base_repo().file("profiles/base/use.mask", "doc amd64 -bogus nope\n");
        assert_eq!(
            feed(&test, "base"),
            [
                "UnknownProfileUse: 'base/use.mask': unknown USE flag: '-bogus'",
                "UnknownProfileUse: 'base/use.mask': unknown USE flag: 'nope'",
            ]
        );
    }

    #[test]
    fn unknown_package_use() {
        let test = base_repo().file(
            "profiles/base/package.use",
            "dev-libs/foo ssl -test -x y z\ndev-libs/bar ssl\n",
        );
        assert_eq!(
            feed(&test, "base"),
            [
                "UnknownProfilePackageUse: 'base/package.use': unknown package USE flag: 'dev-libs/foo[-x]'",
                "UnknownProfilePackageUse: 'base/package.use': unknown package USE flags: 'dev-libs/foo[y, z]'",
                "UnknownProfilePackage: 'base/package.use': unknown package: 'dev-libs/bar'",
            ]
        );
    }

    #[test]
    fn unknown_keywords() {
        let test = base_repo().file(
            "profiles/package.accept_keywords",
            "dev-libs/foo ~amd64 ** ~ppc sparc\n",
        );
        assert_eq!(
            feed(&test, ""),
            ["UnknownProfilePackageKeywords: 'package.accept_keywords': unknown package keywords: dev-libs/foo: 'sparc', '~ppc'"]
        );
    }

    #[test]
    fn deprecated_and_parse_errors() {
        let test = base_repo()
            .file("profiles/old/deprecated", "new/profile\n")
            .file("profiles/old/eapi", "99\n")
            .file("profiles/old/parent", "../missing\n")
            .file("profiles/old/package.mask", "=dev-libs/foo\n");
        assert_eq!(
            feed(&test, "old"),
            [
                "ProfileError: nonexistent replacement 'new/profile' for deprecated profile: 'old'",
                "ProfileError: 'old/eapi': unsupported EAPI: '99'",
                "ProfileError: 'old/package.mask', line 1: parsing error: invalid atom: =dev-libs/foo: operator without version",
                "ProfileError: 'old/parent', line 1: nonexistent parent: '../missing'",
            ]
        );
    }

    #[test]
    fn stable_masks_need_eapi_5() {
        let test = base_repo()
            .file("profiles/old/use.stable.mask", "nope\n")
            .file("profiles/new/eapi", "5\n")
            .file("profiles/new/use.stable.mask", "nope\n");
        assert!(feed(&test, "old").is_empty());
        assert_eq!(
            feed(&test, "new"),
            ["UnknownProfileUse: 'new/use.stable.mask': unknown USE flag: 'nope'"]
        );
    }

    fn finish(test: &TestRepo, gentoo_repo: bool) -> Vec<String> {
        let ctx = context(test, gentoo_repo);
        RepoProfilesCheck::new()
            .finish(&ctx)
            .unwrap()
            .iter()
            .map(|r| format!("{}: {r}", r.name()))
            .collect()
    }

    fn profiles_repo() -> TestRepo {
        base_repo()
            .file("profiles/categories", "dev-libs\nsys-apps\n")
            .dir("app-misc")
            .file(
                "profiles/profiles.desc",
                "amd64 default/linux/amd64 stable\n\
                 amd64 missing dev\n\
                 x86 default/linux/amd64 weird\n",
            )
            .file("profiles/base/eapi", "7\n")
            .file("profiles/default/linux/parent", "../../base\n")
            .file("profiles/default/linux/eapi", "8\n")
            .file("profiles/default/linux/amd64/parent", "..\n")
            .file("profiles/default/linux/amd64/eapi", "5\n")
            .dir("profiles/unused/sub")
            .dir("profiles/desc")
            .dir("profiles/updates")
            .dir("profiles/embedded")
    }

    #[test]
    fn repo_profiles_gentoo() {
        let test = profiles_repo();
        assert_eq!(
            finish(&test, true),
            [
                "UnknownCategoryDirs: unknown category dir: app-misc",
                "NonexistentCategories: nonexistent profiles/categories entry: sys-apps",
                "ProfileWarning: 'profiles.desc', line 3: unknown profile status: 'weird'",
                "NonexistentProfilePath: nonexistent profile path: 'missing'",
                "LaggingProfileEapi: 'default/linux/amd64' profile has EAPI 5, 'default/linux' parent has EAPI 8",
                "UnusedProfileDirs: unused profile dirs: 'unused', 'unused/sub'",
            ]
        );
    }

    #[test]
    fn repo_profiles_overlay() {
        let test = profiles_repo().file("profiles/arch.list", "amd64\nx86\narm\n");
        assert_eq!(
            finish(&test, false),
            [
                "UnknownCategoryDirs: unknown category dir: app-misc",
                "NonexistentCategories: nonexistent profiles/categories entry: sys-apps",
                "ArchesWithoutProfiles: arch without profiles: arm",
                "NonexistentProfilePath: nonexistent profile path: 'missing'",
                "UnusedProfileDirs: unused profile dirs: 'unused', 'unused/sub'",
            ]
        );
    }
}
