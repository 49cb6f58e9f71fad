//! Profile directories under `profiles/` and the data files they carry.
//!
//! Parsing is lenient: a malformed line is recorded as a [`Diagnostic`] and
//! skipped, so a single bad entry never hides the rest of a file. Only
//! failures that make a profile unusable (missing directories, unreadable
//! files, parent cycles) are returned as [`Error`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::atom::Atom;
use crate::eapi::Eapi;
use crate::error::{Error, Result};
use crate::files::{data_lines, read_optional};
use crate::report::Severity;
use crate::syntax::is_flag_char;

/// Directories under `profiles/` that never hold profile data.
pub const NON_PROFILE_DIRS: &[&str] = &["desc", "updates"];

/// Directories under `profiles/` that are profile roots and never have to
/// be referenced from `profiles.desc`.
pub const ROOT_PROFILE_DIRS: &[&str] = &["embedded"];

/// A problem found while parsing profile data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Records diagnostics for one file, prefixed with its location.
struct FileLog<'a> {
    path: String,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl FileLog<'_> {
    fn warning(&mut self, lineno: usize, message: impl fmt::Display) {
        let message = format!("'{}', line {lineno}: {message}", self.path);
        self.diagnostics.push(Diagnostic::warning(message));
    }

    fn error(&mut self, lineno: usize, message: impl fmt::Display) {
        let message = format!("'{}', line {lineno}: {message}", self.path);
        self.diagnostics.push(Diagnostic::error(message));
    }
}

/// Atoms added and removed (`-atom`) by an incremental atom file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomEntries {
    pub added: Vec<Atom>,
    pub removed: Vec<Atom>,
}

impl AtomEntries {
    /// Every atom in the file, removals included.
    pub fn iter(&self) -> impl Iterator<Item = &Atom> {
        self.added.iter().chain(&self.removed)
    }
}

/// Flags enabled and disabled (`-flag`) by a USE setting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UseFlags {
    pub disabled: Vec<String>,
    pub enabled: Vec<String>,
}

impl UseFlags {
    fn push(&mut self, flag: &str) -> bool {
        // `-*` resets inherited settings and names no flag.
        if flag == "-*" {
            return true;
        }
        let (list, name) = match flag.strip_prefix('-') {
            Some(name) => (&mut self.disabled, name),
            None => (&mut self.enabled, flag),
        };
        if name.is_empty() || !name.chars().all(is_flag_char) {
            return false;
        }
        list.push(name.to_string());
        true
    }
}

/// One line of a `package.use*` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUse {
    pub atom: Atom,
    pub flags: UseFlags,
}

/// One line of a `package.keywords` or `package.accept_keywords` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageKeywords {
    pub atom: Atom,
    pub keywords: Vec<String>,
}

/// A `deprecated` file: the replacement profile plus an optional message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deprecation {
    pub replacement: String,
    pub message: Option<String>,
}

/// A single profile directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileNode {
    base: PathBuf,
    name: String,
    files: BTreeSet<String>,
}

impl ProfileNode {
    /// Open the profile `name` (relative to `base`, the `profiles/`
    /// directory). The empty name is the profiles root itself.
    pub fn load(base: &Path, name: &str) -> Result<ProfileNode> {
        let name = normalize(name)
            .ok_or_else(|| Error::Profile(format!("invalid profile path: '{name}'")))?;
        let path = base.join(&name);
        if !path.is_dir() {
            return Err(Error::Profile(format!("nonexistent profile: '{name}'")));
        }
        let mut files = BTreeSet::new();
        for entry in fs::read_dir(&path).map_err(|e| Error::io(&path, e))? {
            let entry = entry.map_err(|e| Error::io(&path, e))?;
            if entry.path().is_file() {
                files.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(ProfileNode {
            base: base.to_path_buf(),
            name,
            files,
        })
    }

    /// The `profiles/` directory the profile belongs to.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Path relative to `profiles/`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> PathBuf {
        self.base.join(&self.name)
    }

    /// Regular files present in the directory.
    pub fn files(&self) -> &BTreeSet<String> {
        &self.files
    }

    /// `file` relative to `profiles/`, as used in messages.
    pub fn relpath(&self, file: &str) -> String {
        if self.name.is_empty() {
            file.to_string()
        } else {
            format!("{}/{file}", self.name)
        }
    }

    fn read(&self, file: &str) -> Result<String> {
        Ok(read_optional(&self.path().join(file))?.unwrap_or_default())
    }

    fn log<'a>(&self, file: &str, diagnostics: &'a mut Vec<Diagnostic>) -> FileLog<'a> {
        FileLog {
            path: self.relpath(file),
            diagnostics,
        }
    }

    /// Parent profiles listed in `parent`.
    ///
    /// Plain entries are relative to this profile. `repo:path` entries are
    /// looked up in `roots`; a repository that is not loaded is an error.
    pub fn parents(
        &self,
        roots: &ProfileRoots,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Vec<ProfileNode>> {
        let contents = self.read("parent")?;
        let mut log = self.log("parent", diagnostics);
        let mut parents = Vec::new();
        for (lineno, line) in data_lines(&contents) {
            let (base, resolved) = match line.split_once(':') {
                Some((repo, path)) => match roots.get(repo) {
                    Some(base) => (base, normalize(path)),
                    None => {
                        log.error(lineno, format!("unknown repo '{repo}' in parent: '{line}'"));
                        continue;
                    }
                },
                None => (self.base.as_path(), normalize(&format!("{}/{line}", self.name))),
            };
            match resolved {
                Some(name) if base.join(&name).is_dir() => {
                    parents.push(ProfileNode::load(base, &name)?);
                }
                _ => log.error(lineno, format!("nonexistent parent: '{line}'")),
            }
        }
        Ok(parents)
    }

    /// EAPI from the `eapi` file; EAPI 0 when absent or unsupported.
    pub fn eapi(&self, diagnostics: &mut Vec<Diagnostic>) -> Result<Eapi> {
        let contents = self.read("eapi")?;
        match Eapi::from_file_contents(&contents) {
            Ok(eapi) => Ok(eapi),
            Err(_) => {
                let message = format!(
                    "'{}': unsupported EAPI: '{}'",
                    self.relpath("eapi"),
                    contents.trim()
                );
                diagnostics.push(Diagnostic::error(message));
                Ok(Eapi::Zero)
            }
        }
    }

    /// Contents of the `deprecated` file, if the profile is deprecated.
    pub fn deprecated(&self, diagnostics: &mut Vec<Diagnostic>) -> Result<Option<Deprecation>> {
        if !self.files.contains("deprecated") {
            return Ok(None);
        }
        let contents = self.read("deprecated")?;
        let mut lines = contents.lines().map(str::trim).skip_while(|l| l.is_empty());
        let Some(replacement) = lines.next() else {
            let message = format!("'{}': missing replacement profile", self.relpath("deprecated"));
            diagnostics.push(Diagnostic::error(message));
            return Ok(None);
        };
        let message = lines.collect::<Vec<_>>().join("\n");
        let message = message.trim();
        Ok(Some(Deprecation {
            replacement: replacement.to_string(),
            message: (!message.is_empty()).then(|| message.to_string()),
        }))
    }

    /// Incremental atom files: `packages`, `package.mask`,
    /// `package.unmask` and `package.deprecated`.
    ///
    /// `packages` entries may carry the `*` system set marker.
    pub fn atoms(&self, file: &str, diagnostics: &mut Vec<Diagnostic>) -> Result<AtomEntries> {
        let contents = self.read(file)?;
        let mut log = self.log(file, diagnostics);
        let mut entries = AtomEntries::default();
        for (lineno, line) in data_lines(&contents) {
            let (negated, entry) = match line.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, line),
            };
            let entry = if file == "packages" {
                entry.strip_prefix('*').unwrap_or(entry)
            } else {
                entry
            };
            if entry.is_empty() {
                log.error(lineno, format!("invalid line: '{line}'"));
                continue;
            }
            match entry.parse::<Atom>() {
                Ok(atom) if negated => entries.removed.push(atom),
                Ok(atom) => entries.added.push(atom),
                Err(e) => log.error(lineno, format!("parsing error: {e}")),
            }
        }
        Ok(entries)
    }

    /// `use.force`, `use.mask` and their stable variants.
    pub fn use_flags(&self, file: &str, diagnostics: &mut Vec<Diagnostic>) -> Result<UseFlags> {
        let contents = self.read(file)?;
        let mut log = self.log(file, diagnostics);
        let mut flags = UseFlags::default();
        for (lineno, line) in data_lines(&contents) {
            for flag in line.split_whitespace() {
                if !flags.push(flag) {
                    log.error(lineno, format!("invalid USE flag: '{flag}'"));
                }
            }
        }
        Ok(flags)
    }

    /// `package.use`, `package.use.force`, `package.use.mask` and their
    /// stable variants.
    pub fn package_use(&self, file: &str, diagnostics: &mut Vec<Diagnostic>) -> Result<Vec<PackageUse>> {
        let contents = self.read(file)?;
        let mut log = self.log(file, diagnostics);
        let mut entries = Vec::new();
        for (lineno, line) in data_lines(&contents) {
            let mut words = line.split_whitespace();
            let Some(atom) = words.next() else { continue };
            let atom = match atom.parse::<Atom>() {
                Ok(atom) => atom,
                Err(e) => {
                    log.error(lineno, format!("parsing error: {e}"));
                    continue;
                }
            };
            let mut flags = UseFlags::default();
            let mut any = false;
            for flag in words {
                any = true;
                if !flags.push(flag) {
                    log.error(lineno, format!("invalid USE flag: '{flag}'"));
                }
            }
            if !any {
                log.warning(lineno, format!("missing USE flag(s): '{line}'"));
                continue;
            }
            entries.push(PackageUse { atom, flags });
        }
        Ok(entries)
    }

    /// `package.keywords` and `package.accept_keywords`.
    ///
    /// An `accept_keywords` line without keywords is valid and means the
    /// testing keyword of the current arch.
    pub fn package_keywords(
        &self,
        file: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Vec<PackageKeywords>> {
        let contents = self.read(file)?;
        let mut log = self.log(file, diagnostics);
        let mut entries = Vec::new();
        for (lineno, line) in data_lines(&contents) {
            let mut words = line.split_whitespace();
            let Some(atom) = words.next() else { continue };
            match atom.parse::<Atom>() {
                Ok(atom) => entries.push(PackageKeywords {
                    atom,
                    keywords: words.map(String::from).collect(),
                }),
                Err(e) => log.error(lineno, format!("parsing error: {e}")),
            }
        }
        Ok(entries)
    }
}

/// `profiles/` directories of the loaded repositories, by repo id, for
/// resolving `repo:path` parents.
#[derive(Debug, Clone, Default)]
pub struct ProfileRoots {
    roots: BTreeMap<String, PathBuf>,
}

impl ProfileRoots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `base` for `repo_id`. The first registration of an id wins.
    #[must_use]
    pub fn with(mut self, repo_id: impl Into<String>, base: impl Into<PathBuf>) -> Self {
        self.roots.entry(repo_id.into()).or_insert_with(|| base.into());
        self
    }

    pub fn get(&self, repo_id: &str) -> Option<&Path> {
        self.roots.get(repo_id).map(PathBuf::as_path)
    }
}

/// A profile together with its resolved parents.
#[derive(Debug, Clone)]
pub struct ProfileStack {
    nodes: Vec<ProfileNode>,
}

impl ProfileStack {
    /// Resolve the profile `name` under `base` and its parents
    /// depth-first, looking up `repo:path` parents in `roots`.
    ///
    /// Fails when the profile or any parent is missing, a `parent` entry
    /// is invalid, or the parents form a cycle.
    pub fn load(base: &Path, roots: &ProfileRoots, name: &str) -> Result<ProfileStack> {
        let mut nodes = Vec::new();
        let mut visiting = Vec::new();
        let leaf = ProfileNode::load(base, name)?;
        collect_stack(leaf, roots, &mut visiting, &mut nodes)?;
        debug!(profile = name, depth = nodes.len(), "resolved profile stack");
        Ok(ProfileStack { nodes })
    }

    /// Parents before children; the profile itself is last.
    pub fn nodes(&self) -> &[ProfileNode] {
        &self.nodes
    }

    /// The profile the stack was loaded for.
    pub fn leaf(&self) -> &ProfileNode {
        &self.nodes[self.nodes.len() - 1]
    }
}

fn collect_stack(
    node: ProfileNode,
    roots: &ProfileRoots,
    visiting: &mut Vec<(PathBuf, String)>,
    nodes: &mut Vec<ProfileNode>,
) -> Result<()> {
    let path = node.path();
    if visiting.iter().any(|(p, _)| *p == path) {
        let chain: Vec<&str> = visiting.iter().map(|(_, n)| n.as_str()).collect();
        return Err(Error::Profile(format!(
            "profile parent cycle: {} -> {}",
            chain.join(" -> "),
            node.name()
        )));
    }
    let mut diagnostics = Vec::new();
    let parents = node.parents(roots, &mut diagnostics)?;
    if let Some(d) = diagnostics.iter().find(|d| d.severity == Severity::Error) {
        return Err(Error::Profile(d.message.clone()));
    }
    visiting.push((path, node.name().to_string()));
    for parent in parents {
        collect_stack(parent, roots, visiting, nodes)?;
    }
    visiting.pop();
    nodes.push(node);
    Ok(())
}

/// One `arch profile status` line of `profiles.desc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEntry {
    pub arch: String,
    pub path: String,
    pub status: String,
    pub deprecated: bool,
}

/// The profiles listed in `profiles/profiles.desc`.
#[derive(Debug, Clone, Default)]
pub struct ProfilesDesc {
    pub entries: Vec<ProfileEntry>,
}

impl ProfilesDesc {
    /// Parse `profiles.desc` under `base`; a missing file lists nothing.
    ///
    /// Statuses are only validated when `known_status` is given.
    pub fn parse(
        base: &Path,
        known_status: Option<&[&str]>,
        known_arch: &BTreeSet<String>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<ProfilesDesc> {
        let contents = read_optional(&base.join("profiles.desc"))?.unwrap_or_default();
        let mut log = FileLog {
            path: "profiles.desc".to_string(),
            diagnostics,
        };
        let mut entries = Vec::new();
        for (lineno, line) in data_lines(&contents) {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let &[arch, path, status] = fields.as_slice() else {
                log.error(
                    lineno,
                    "invalid profile line format: should be 'arch profile status'",
                );
                continue;
            };
            if let Some(statuses) = known_status {
                if !statuses.contains(&status) {
                    log.warning(lineno, format!("unknown profile status: '{status}'"));
                }
            }
            if !known_arch.contains(arch) {
                log.warning(lineno, format!("unknown arch: '{arch}'"));
            }
            let path = normalize(path).unwrap_or_else(|| path.to_string());
            let deprecated = base.join(&path).join("deprecated").is_file();
            entries.push(ProfileEntry {
                arch: arch.to_string(),
                path,
                status: status.to_string(),
                deprecated,
            });
        }
        Ok(ProfilesDesc { entries })
    }

    /// Arches with at least one listed profile.
    pub fn arches(&self) -> BTreeSet<&str> {
        self.entries.iter().map(|e| e.arch.as_str()).collect()
    }
}

/// A path and each of its ancestors, innermost first.
///
/// ```
/// use portage_lint::profile::dir_parents;
///
/// assert_eq!(dir_parents("/a/b/c/"), ["a/b/c", "a/b", "a"]);
/// ```
pub fn dir_parents(path: &str) -> Vec<String> {
    let mut parents = Vec::new();
    let mut path = normalize(path).unwrap_or_default();
    while !path.is_empty() {
        let next = path.rsplit_once('/').map(|(dir, _)| dir.to_string());
        parents.push(path);
        path = next.unwrap_or_default();
    }
    parents
}

/// Lexically normalise a relative path: drop empty and `.` segments and
/// resolve `..`. Returns `None` when `..` climbs above the root.
pub(crate) fn normalize(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            _ => parts.push(part),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestRepo;

    fn errors(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.message.as_str())
            .collect()
    }

    #[test]
    fn normalize_paths() {
        assert_eq!(normalize("a//b/./c/").as_deref(), Some("a/b/c"));
        assert_eq!(normalize("a/b/../c").as_deref(), Some("a/c"));
        assert_eq!(normalize("../a"), None);
        assert_eq!(dir_parents("a"), ["a"]);
        assert!(dir_parents("").is_empty());
    }

    #[test]
    fn node_files_and_parents() {
        let test = TestRepo::new("test")
            .file("profiles/base/eapi", "5\n")
            .file("profiles/default/linux/parent", "../../base\n# c\ntest:base\nmissing\nother:foo\n")
            .file("profiles/default/linux/make.defaults", "");
        let node = ProfileNode::load(&test.profiles(), "default/linux").unwrap();
        assert_eq!(node.name(), "default/linux");
        assert!(node.files().contains("parent"));
        assert_eq!(node.relpath("parent"), "default/linux/parent");

        let mut diags = Vec::new();
        let roots = ProfileRoots::new().with("test", test.profiles());
        let parents = node.parents(&roots, &mut diags).unwrap();
        let names: Vec<&str> = parents.iter().map(|p| p.name()).collect();
        assert_eq!(names, ["base", "base"]);
        assert_eq!(
            errors(&diags),
            [
                "'default/linux/parent', line 4: nonexistent parent: 'missing'",
                "'default/linux/parent', line 5: unknown repo 'other' in parent: 'other:foo'",
            ]
        );

        let root = ProfileNode::load(&test.profiles(), "").unwrap();
        assert_eq!(root.relpath("package.mask"), "package.mask");
        assert!(ProfileNode::load(&test.profiles(), "nope").is_err());
    }

    #[test]
    fn eapi_file() {
        let test = TestRepo::new("test")
            .file("profiles/a/eapi", " 7\n")
            .file("profiles/b/eapi", "foo\n")
            .dir("profiles/c");
        let mut diags = Vec::new();
        let load = |name| ProfileNode::load(&test.profiles(), name).unwrap();
        assert_eq!(load("a").eapi(&mut diags).unwrap(), Eapi::Seven);
        assert_eq!(load("c").eapi(&mut diags).unwrap(), Eapi::Zero);
        assert!(diags.is_empty());
        assert_eq!(load("b").eapi(&mut diags).unwrap(), Eapi::Zero);
        assert_eq!(errors(&diags), ["'b/eapi': unsupported EAPI: 'foo'"]);
    }

    #[test]
    fn deprecated_file() {
        let test = TestRepo::new("test")
            .file("profiles/old/deprecated", "\nnew/profile\nplease migrate\n")
            .file("profiles/empty/deprecated", "\n");
        let mut diags = Vec::new();
        let node = ProfileNode::load(&test.profiles(), "old").unwrap();
        let dep = node.deprecated(&mut diags).unwrap().unwrap();
        assert_eq!(dep.replacement, "new/profile");
        assert_eq!(dep.message.as_deref(), Some("please migrate"));

        let node = ProfileNode::load(&test.profiles(), "empty").unwrap();
        assert_eq!(node.deprecated(&mut diags).unwrap(), None);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn atom_files() {
        let test = TestRepo::new("test")
            .file("profiles/package.mask", "dev-libs/foo\n-=dev-libs/bar-1\nnot an atom\n-\n")
            .file("profiles/packages", "*sys-apps/baselayout\n-*sys-apps/openrc\n");
        let node = ProfileNode::load(&test.profiles(), "").unwrap();
        let mut diags = Vec::new();
        let masks = node.atoms("package.mask", &mut diags).unwrap();
        assert_eq!(masks.added.len(), 1);
        assert_eq!(masks.removed[0].to_string(), "=dev-libs/bar-1");
        assert_eq!(masks.iter().count(), 2);
        assert_eq!(errors(&diags).len(), 2);

        let packages = node.atoms("packages", &mut Vec::new()).unwrap();
        assert_eq!(packages.added[0].key(), "sys-apps/baselayout");
        assert_eq!(packages.removed[0].key(), "sys-apps/openrc");
    }

    #[test]
    fn use_files() {
        let test = TestRepo::new("test")
            .file("profiles/use.mask", "-* ssl\n-test\nbad$flag\n")
            .file(
                "profiles/package.use",
                "dev-libs/foo ssl -test\ndev-libs/bar\n=bad 1\n",
            );
        let node = ProfileNode::load(&test.profiles(), "").unwrap();
        let mut diags = Vec::new();
        let flags = node.use_flags("use.mask", &mut diags).unwrap();
        assert_eq!(flags.enabled, ["ssl"]);
        assert_eq!(flags.disabled, ["test"]);
        assert_eq!(errors(&diags), ["'use.mask', line 3: invalid USE flag: 'bad$flag'"]);

        let mut diags = Vec::new();
        let entries = node.package_use("package.use", &mut diags).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].flags.enabled, ["ssl"]);
        assert_eq!(entries[0].flags.disabled, ["test"]);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert_eq!(diags[0].message, "'package.use', line 2: missing USE flag(s): 'dev-libs/bar'");
    }

    #[test]
    fn keyword_files() {
        let test = TestRepo::new("test")
            .file("profiles/package.accept_keywords", "dev-libs/foo ~amd64 **\nsys-apps/bar\n");
        let node = ProfileNode::load(&test.profiles(), "").unwrap();
        let entries = node
            .package_keywords("package.accept_keywords", &mut Vec::new())
            .unwrap();
        assert_eq!(entries[0].keywords, ["~amd64", "**"]);
        assert!(entries[1].keywords.is_empty());
    }

    #[test]
    fn stack_order_and_cycles() {
        let test = TestRepo::new("test")
            .file("profiles/base/eapi", "5\n")
            .file("profiles/arch/amd64/parent", "../../base\n")
            .file("profiles/default/parent", "../base\n../arch/amd64\n")
            .file("profiles/loop/a/parent", "../b\n")
            .file("profiles/loop/b/parent", "../a\n")
            .file("profiles/broken/parent", "../gone\n");
        let roots = ProfileRoots::new().with("test", test.profiles());
        let load = |name| ProfileStack::load(&test.profiles(), &roots, name);
        let stack = load("default").unwrap();
        let names: Vec<&str> = stack.nodes().iter().map(|n| n.name()).collect();
        assert_eq!(names, ["base", "base", "arch/amd64", "default"]);
        assert_eq!(stack.leaf().name(), "default");

        let err = load("loop/a").unwrap_err();
        assert!(err.to_string().contains("cycle"));
        assert!(load("broken").is_err());
        assert!(load("nope").is_err());
    }

    #[test]
    fn stack_across_repos() {
        let master = TestRepo::new("gentoo")
            .file("profiles/base/eapi", "8\n")
            .file("profiles/default/linux/parent", "../../base\n");
        let overlay = TestRepo::new("mine").file("profiles/mine/parent", "gentoo:default/linux\n");
        let roots = ProfileRoots::new()
            .with("mine", overlay.profiles())
            .with("gentoo", master.profiles());

        let stack = ProfileStack::load(&overlay.profiles(), &roots, "mine").unwrap();
        let nodes: Vec<(&str, bool)> = stack
            .nodes()
            .iter()
            .map(|n| (n.name(), n.base() == overlay.profiles()))
            .collect();
        assert_eq!(
            nodes,
            [("base", false), ("default/linux", false), ("mine", true)]
        );

        let alone = ProfileRoots::new().with("mine", overlay.profiles());
        let err = ProfileStack::load(&overlay.profiles(), &alone, "mine").unwrap_err();
        assert!(err.to_string().contains("unknown repo 'gentoo'"));
    }

    #[test]
    fn profiles_desc() {
        let test = TestRepo::new("test")
            .file(
                "profiles/profiles.desc",
                "amd64 default//linux/ stable\nx86 default/linux\nppc default/linux dev\namd64 old weird\n",
            )
            .file("profiles/old/deprecated", "default/linux\n")
            .dir("profiles/default/linux");
        let arches: BTreeSet<String> = ["amd64", "x86"].map(String::from).into();
        let mut diags = Vec::new();
        let desc = ProfilesDesc::parse(
            &test.profiles(),
            Some(&["stable", "dev", "exp"]),
            &arches,
            &mut diags,
        )
        .unwrap();
        assert_eq!(desc.entries.len(), 3);
        assert_eq!(desc.entries[0].path, "default/linux");
        assert!(desc.entries[2].deprecated);
        assert_eq!(desc.arches().into_iter().collect::<Vec<_>>(), ["amd64", "ppc"]);
        let messages: Vec<&str> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "'profiles.desc', line 2: invalid profile line format: should be 'arch profile status'",
                "'profiles.desc', line 3: unknown arch: 'ppc'",
                "'profiles.desc', line 4: unknown profile status: 'weird'",
            ]
        );

        let mut diags = Vec::new();
        ProfilesDesc::parse(&test.profiles(), None, &arches, &mut diags).unwrap();
        assert_eq!(diags.len(), 2);
    }
}
