use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::atom::Atom;
use crate::cache::CacheEntry;
use crate::error::{Error, Result};
use crate::files::{data_lines, read_optional, subdirs};
use crate::keyword::Keyword;
use crate::package::{Cpv, Package};
use crate::profile::ProfileRoots;

/// Top-level directories of a repository that are never categories.
const NON_CATEGORY_DIRS: &[&str] = &[
    "eclass", "licenses", "metadata", "profiles", "scripts", "distfiles", "packages", "local",
    "CVS",
];

/// An ebuild repository on disk, read through its profiles data and
/// metadata cache.
#[derive(Debug, Clone)]
pub struct Repository {
    location: PathBuf,
    repo_id: String,
    masters: Vec<String>,
    categories: Vec<String>,
    arches: BTreeSet<String>,
    global_use: BTreeSet<String>,
    local_use: BTreeSet<String>,
    use_expand: BTreeSet<String>,
    implicit_use: BTreeSet<String>,
    packages: BTreeMap<String, Vec<Package>>,
}

impl Repository {
    /// Load the repository rooted at `location`.
    ///
    /// Missing optional files are treated as empty. Unreadable or invalid
    /// md5-cache entries are logged and skipped.
    pub fn load(location: impl Into<PathBuf>) -> Result<Repository> {
        let location = location.into();
        if !location.is_dir() {
            return Err(Error::Io {
                path: location,
                message: "not a directory".to_string(),
            });
        }
        let profiles = location.join("profiles");

        let layout = read_optional(&location.join("metadata/layout.conf"))?.unwrap_or_default();
        let layout_value = |key: &str| {
            data_lines(&layout).find_map(|(_, line)| {
                let (k, v) = line.split_once('=')?;
                (k.trim() == key).then(|| v.trim().to_string())
            })
        };

        let repo_id = read_optional(&profiles.join("repo_name"))?
            .and_then(|s| s.lines().next().map(|l| l.trim().to_string()))
            .filter(|s| !s.is_empty())
            .or_else(|| layout_value("repo-name"))
            .or_else(|| {
                location
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_default();
        let masters = layout_value("masters")
            .map(|v| v.split_whitespace().map(String::from).collect())
            .unwrap_or_default();

        let categories = read_words(&profiles.join("categories"))?;
        let arches: BTreeSet<String> = read_words(&profiles.join("arch.list"))?
            .into_iter()
            .collect();

        let global_use = read_flag_descriptions(&profiles.join("use.desc"), |flag| {
            Some(flag.to_string())
        })?;
        let local_use = read_flag_descriptions(&profiles.join("use.local.desc"), |entry| {
            entry.split_once(':').map(|(_, flag)| flag.to_string())
        })?;

        let mut use_expand = BTreeSet::new();
        let desc_dir = profiles.join("desc");
        if desc_dir.is_dir() {
            let entries = fs::read_dir(&desc_dir).map_err(|e| Error::io(&desc_dir, e))?;
            for entry in entries {
                let path = entry.map_err(|e| Error::io(&desc_dir, e))?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("desc") {
                    continue;
                }
                let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_lowercase())
                else {
                    continue;
                };
                use_expand.extend(read_flag_descriptions(&path, |value| {
                    Some(format!("{stem}_{value}"))
                })?);
            }
        }

        let mut implicit_use = arches.clone();
        implicit_use.extend(read_iuse_implicit(&profiles)?);

        let packages = read_md5_cache(&location.join("metadata/md5-cache"))?;
        debug!(
            repo = %repo_id,
            packages = packages.values().map(Vec::len).sum::<usize>(),
            "loaded repository"
        );

        Ok(Repository {
            location,
            repo_id,
            masters,
            categories,
            arches,
            global_use,
            local_use,
            use_expand,
            implicit_use,
            packages,
        })
    }

    /// Repository root directory.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// `profiles/` under the repository root.
    pub fn profiles_base(&self) -> PathBuf {
        self.location.join("profiles")
    }

    /// Repository name.
    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    /// Master repository names from `metadata/layout.conf`.
    pub fn masters(&self) -> &[String] {
        &self.masters
    }

    /// Entries of `profiles/categories`.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Entries of `profiles/arch.list`.
    pub fn known_arches(&self) -> &BTreeSet<String> {
        &self.arches
    }

    /// Keywords that may appear in profile keyword files.
    pub fn valid_keywords(&self) -> BTreeSet<String> {
        Keyword::valid_set(&self.arches)
    }

    /// Every USE flag the repository documents or implies: global,
    /// USE_EXPAND, implicit and local flags.
    pub fn known_use_flags(&self) -> BTreeSet<String> {
        self.global_use
            .iter()
            .chain(&self.use_expand)
            .chain(&self.implicit_use)
            .chain(&self.local_use)
            .cloned()
            .collect()
    }

    /// Top-level directories that look like categories.
    pub fn category_dirs(&self) -> Result<BTreeSet<String>> {
        Ok(subdirs(&self.location)?
            .into_iter()
            .filter(|d| !d.starts_with('.') && !NON_CATEGORY_DIRS.contains(&d.as_str()))
            .collect())
    }

    /// All cached package versions, ordered by key then version.
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values().flatten()
    }

    /// Package versions matching `atom`.
    pub fn match_atom<'a>(&'a self, atom: &'a Atom) -> impl Iterator<Item = &'a Package> {
        self.packages
            .get(&atom.key())
            .into_iter()
            .flatten()
            .filter(move |pkg| atom.matches(pkg))
    }
}

/// The target repository together with its masters; atoms are resolved
/// against all of them.
#[derive(Debug, Clone)]
pub struct RepoSet {
    repos: Vec<Repository>,
}

impl RepoSet {
    /// Build a set from an already loaded target and its masters.
    pub fn new(target: Repository, masters: Vec<Repository>) -> Self {
        let mut repos = vec![target];
        repos.extend(masters);
        RepoSet { repos }
    }

    /// Load the target repository and the master repositories at `masters`.
    pub fn load(target: &Path, masters: &[PathBuf]) -> Result<Self> {
        let target = Repository::load(target)?;
        let masters = masters
            .iter()
            .map(Repository::load)
            .collect::<Result<Vec<_>>>()?;
        for name in target.masters() {
            if !masters.iter().any(|m| m.repo_id() == name) {
                warn!(repo = %target.repo_id(), master = %name, "master repository not loaded");
            }
        }
        Ok(RepoSet::new(target, masters))
    }

    /// The repository being scanned.
    pub fn target(&self) -> &Repository {
        &self.repos[0]
    }

    /// Target first, then masters in the order given.
    pub fn repos(&self) -> &[Repository] {
        &self.repos
    }

    /// Package versions matching `atom` in any repository. An atom with a
    /// `::repo` restriction only searches that repository.
    pub fn match_atom<'a>(&'a self, atom: &'a Atom) -> Vec<&'a Package> {
        self.repos
            .iter()
            .filter(|repo| atom.repo.as_deref().map_or(true, |r| r == repo.repo_id()))
            .flat_map(|repo| repo.match_atom(atom))
            .collect()
    }

    /// Where `repo:path` profile parents resolve to.
    pub fn profile_roots(&self) -> ProfileRoots {
        self.repos
            .iter()
            .fold(ProfileRoots::new(), |roots, repo| {
                roots.with(repo.repo_id(), repo.profiles_base())
            })
    }

    /// Categories declared by the target or any master.
    pub fn categories(&self) -> BTreeSet<String> {
        self.repos
            .iter()
            .flat_map(|repo| repo.categories().iter().cloned())
            .collect()
    }
}

fn read_words(path: &Path) -> Result<Vec<String>> {
    let contents = read_optional(path)?.unwrap_or_default();
    Ok(data_lines(&contents)
        .flat_map(|(_, line)| line.split_whitespace())
        .map(String::from)
        .collect())
}

/// Read `name - description` lines, mapping each name through `flag`.
fn read_flag_descriptions<F>(path: &Path, flag: F) -> Result<BTreeSet<String>>
where
    F: Fn(&str) -> Option<String>,
{
    let contents = read_optional(path)?.unwrap_or_default();
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let name = match line.split_once(" - ") {
                Some((name, _)) => name.trim(),
                None => line.split_whitespace().next()?,
            };
            flag(name)
        })
        .collect())
}

/// `IUSE_IMPLICIT` values from every `make.defaults` under `profiles`.
fn read_iuse_implicit(profiles: &Path) -> Result<BTreeSet<String>> {
    let mut flags = BTreeSet::new();
    for entry in WalkDir::new(profiles).into_iter().filter_map(|e| e.ok()) {
        if entry.file_name() != "make.defaults" || !entry.file_type().is_file() {
            continue;
        }
        let contents = read_optional(entry.path())?.unwrap_or_default();
        for (_, line) in data_lines(&contents) {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            if key.trim() != "IUSE_IMPLICIT" {
                continue;
            }
            flags.extend(
                value
                    .trim_matches(|c| c == '"' || c == '\'')
                    .split_whitespace()
                    .filter(|flag| !flag.starts_with('$'))
                    .map(String::from),
            );
        }
    }
    Ok(flags)
}

fn read_md5_cache(cache_dir: &Path) -> Result<BTreeMap<String, Vec<Package>>> {
    let mut packages: BTreeMap<String, Vec<Package>> = BTreeMap::new();
    for category in subdirs(cache_dir)? {
        let dir = cache_dir.join(&category);
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| Error::Io {
                path: dir.clone(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy();
            let cpv = match Cpv::from_parts(&category, &file_name) {
                Ok(cpv) => cpv,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "skipping cache entry");
                    continue;
                }
            };
            let contents = fs::read_to_string(entry.path()).map_err(|e| Error::io(entry.path(), e))?;
            match CacheEntry::parse(&contents) {
                Ok(cache) => packages.entry(cpv.key()).or_default().push(Package {
                    cpv,
                    metadata: cache.metadata,
                }),
                Err(e) => warn!(%cpv, error = %e, "skipping invalid cache entry"),
            }
        }
    }
    for versions in packages.values_mut() {
        versions.sort_by(|a, b| a.cpv.cmp(&b.cpv));
    }
    Ok(packages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestRepo;

    const CACHE: &str = "EAPI=8\nDESCRIPTION=test\nSLOT=0\nIUSE=+ssl\nKEYWORDS=~amd64\n";

    fn sample() -> TestRepo {
        TestRepo::new("sample")
            .file("metadata/layout.conf", "masters = gentoo\n")
            .file("profiles/categories", "dev-libs\nsys-apps\n")
            .file("profiles/arch.list", "amd64\n# comment\nx86\n")
            .file("profiles/use.desc", "ssl - Enable SSL # really\ntest - Run tests\n")
            .file("profiles/use.local.desc", "dev-libs/foo:bar - Local flag\n")
            .file("profiles/desc/python_targets.desc", "python3_12 - Build for 3.12\n")
            .file("profiles/base/make.defaults", "IUSE_IMPLICIT=\"prefix test\"\n")
            .package("dev-libs/foo-1.0", CACHE)
            .package("dev-libs/foo-1.10", CACHE)
            .package("dev-libs/foo-1.2", CACHE)
            .file("metadata/md5-cache/dev-libs/bad-1", "SLOT=0\n")
            .file("metadata/md5-cache/dev-libs/notaversion", CACHE)
            .dir("eclass")
            .dir(".git")
            .dir("app-misc")
    }

    #[test]
    fn load_metadata() {
        let test = sample();
        let repo = Repository::load(test.path()).unwrap();
        assert_eq!(repo.repo_id(), "sample");
        assert_eq!(repo.masters(), ["gentoo"]);
        assert_eq!(repo.categories(), ["dev-libs", "sys-apps"]);
        assert_eq!(repo.known_arches().len(), 2);

        let flags = repo.known_use_flags();
        for flag in ["ssl", "test", "bar", "python_targets_python3_12", "prefix", "amd64"] {
            assert!(flags.contains(flag), "{flag}");
        }
        assert!(!flags.contains("dev-libs/foo:bar"));
    }

    #[test]
    fn category_dirs_skip_non_categories() {
        let test = sample();
        let repo = Repository::load(test.path()).unwrap();
        let dirs: Vec<String> = repo.category_dirs().unwrap().into_iter().collect();
        assert_eq!(dirs, vec!["app-misc", "dev-libs"]);
    }

    #[test]
    fn packages_sorted_and_invalid_skipped() {
        let test = sample();
        let repo = Repository::load(test.path()).unwrap();
        let cpvs: Vec<String> = repo.packages().map(|p| p.cpv.to_string()).collect();
        assert_eq!(cpvs, vec!["dev-libs/foo-1.0", "dev-libs/foo-1.2", "dev-libs/foo-1.10"]);
    }

    #[test]
    fn matching_across_masters() {
        let master = TestRepo::new("gentoo").package("sys-apps/bar-2", CACHE);
        let test = sample();
        let set = RepoSet::load(test.path(), &[master.path().to_path_buf()]).unwrap();

        let atom: Atom = ">=dev-libs/foo-1.2".parse().unwrap();
        assert_eq!(set.match_atom(&atom).len(), 2);
        let atom: Atom = "sys-apps/bar".parse().unwrap();
        assert_eq!(set.match_atom(&atom).len(), 1);
        let atom: Atom = "sys-apps/bar::sample".parse().unwrap();
        assert!(set.match_atom(&atom).is_empty());
        assert!(set.categories().contains("sys-apps"));

        let roots = set.profile_roots();
        assert_eq!(roots.get("gentoo"), Some(master.profiles().as_path()));
        assert_eq!(roots.get("sample"), Some(test.profiles().as_path()));
        assert_eq!(roots.get("other"), None);
    }

    #[test]
    fn repo_name_fallbacks() {
        let test = TestRepo::new("")
            .file("metadata/layout.conf", "repo-name = from-layout\n");
        let repo = Repository::load(test.path()).unwrap();
        assert_eq!(repo.repo_id(), "from-layout");
    }

    #[test]
    fn missing_location() {
        let test = TestRepo::new("x");
        assert!(Repository::load(test.path().join("missing")).is_err());
    }
}
