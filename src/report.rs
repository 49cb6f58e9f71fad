//! Results emitted by the checks.

use std::fmt;

use crate::eapi::Eapi;
use crate::package::Cpv;
use crate::profile::Diagnostic;

/// Severity of a result or profile diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// What a result is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// The repository's `profiles/` tree as a whole.
    Profiles,
    /// A single package version.
    Version(Cpv),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Profiles => write!(f, "profiles"),
            Scope::Version(cpv) => write!(f, "{cpv}"),
        }
    }
}

/// Result kinds, without their data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    UnknownProfilePackage,
    UnknownProfilePackageUse,
    UnknownProfileUse,
    UnknownProfilePackageKeywords,
    ProfileWarning,
    ProfileError,
    UnusedProfileDirs,
    ArchesWithoutProfiles,
    NonexistentProfilePath,
    LaggingProfileEapi,
    UnknownCategoryDirs,
    NonexistentCategories,
    VulnerablePackage,
    MissingPythonEclass,
    PythonSingleUseMismatch,
    PythonMissingRequiredUse,
}

impl ReportKind {
    /// CamelCase result name.
    pub fn name(self) -> &'static str {
        match self {
            ReportKind::UnknownProfilePackage => "UnknownProfilePackage",
            ReportKind::UnknownProfilePackageUse => "UnknownProfilePackageUse",
            ReportKind::UnknownProfileUse => "UnknownProfileUse",
            ReportKind::UnknownProfilePackageKeywords => "UnknownProfilePackageKeywords",
            ReportKind::ProfileWarning => "ProfileWarning",
            ReportKind::ProfileError => "ProfileError",
            ReportKind::UnusedProfileDirs => "UnusedProfileDirs",
            ReportKind::ArchesWithoutProfiles => "ArchesWithoutProfiles",
            ReportKind::NonexistentProfilePath => "NonexistentProfilePath",
            ReportKind::LaggingProfileEapi => "LaggingProfileEapi",
            ReportKind::UnknownCategoryDirs => "UnknownCategoryDirs",
            ReportKind::NonexistentCategories => "NonexistentCategories",
            ReportKind::VulnerablePackage => "VulnerablePackage",
            ReportKind::MissingPythonEclass => "MissingPythonEclass",
            ReportKind::PythonSingleUseMismatch => "PythonSingleUseMismatch",
            ReportKind::PythonMissingRequiredUse => "PythonMissingRequiredUSE",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            ReportKind::ProfileError
            | ReportKind::NonexistentProfilePath
            | ReportKind::VulnerablePackage => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single check result.
///
/// `Display` renders the human readable description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// A profile file names a package that exists in no searched repository.
    UnknownProfilePackage { path: String, atom: String },
    /// A `package.use*` entry sets flags no matching package declares.
    UnknownProfilePackageUse {
        path: String,
        atom: String,
        flags: Vec<String>,
    },
    /// A `use.*` file names flags the repository does not know.
    UnknownProfileUse { path: String, flags: Vec<String> },
    /// A package keywords file uses keywords outside the known arches.
    UnknownProfilePackageKeywords {
        path: String,
        atom: String,
        keywords: Vec<String>,
    },
    /// Badly formatted profile data.
    ProfileWarning(String),
    /// Erroneous profile data.
    ProfileError(String),
    UnusedProfileDirs(Vec<String>),
    ArchesWithoutProfiles(Vec<String>),
    /// A `profiles.desc` entry pointing at a missing or broken profile.
    NonexistentProfilePath(String),
    /// A profile with an older EAPI than one of its parents.
    LaggingProfileEapi {
        profile: String,
        eapi: Eapi,
        parent: String,
        parent_eapi: Eapi,
    },
    /// Top-level directories missing from every `profiles/categories`.
    UnknownCategoryDirs(Vec<String>),
    /// `profiles/categories` entries without a directory.
    NonexistentCategories(Vec<String>),
    /// A package version affected by a security advisory.
    VulnerablePackage {
        cpv: Cpv,
        glsa: String,
        arches: Vec<String>,
    },
    /// Python interpreter dependency without a python eclass.
    MissingPythonEclass {
        cpv: Cpv,
        eclass: &'static str,
        attr: &'static str,
        atom: String,
    },
    /// `PYTHON_TARGETS` and `PYTHON_SINGLE_TARGET` flags disagree.
    PythonSingleUseMismatch {
        cpv: Cpv,
        flags: Vec<String>,
        single_flags: Vec<String>,
    },
    /// REQUIRED_USE lacks the constraint the python eclass would generate.
    PythonMissingRequiredUse { cpv: Cpv },
}

impl Report {
    pub fn kind(&self) -> ReportKind {
        match self {
            Report::UnknownProfilePackage { .. } => ReportKind::UnknownProfilePackage,
            Report::UnknownProfilePackageUse { .. } => ReportKind::UnknownProfilePackageUse,
            Report::UnknownProfileUse { .. } => ReportKind::UnknownProfileUse,
            Report::UnknownProfilePackageKeywords { .. } => {
                ReportKind::UnknownProfilePackageKeywords
            }
            Report::ProfileWarning(_) => ReportKind::ProfileWarning,
            Report::ProfileError(_) => ReportKind::ProfileError,
            Report::UnusedProfileDirs(_) => ReportKind::UnusedProfileDirs,
            Report::ArchesWithoutProfiles(_) => ReportKind::ArchesWithoutProfiles,
            Report::NonexistentProfilePath(_) => ReportKind::NonexistentProfilePath,
            Report::LaggingProfileEapi { .. } => ReportKind::LaggingProfileEapi,
            Report::UnknownCategoryDirs(_) => ReportKind::UnknownCategoryDirs,
            Report::NonexistentCategories(_) => ReportKind::NonexistentCategories,
            Report::VulnerablePackage { .. } => ReportKind::VulnerablePackage,
            Report::MissingPythonEclass { .. } => ReportKind::MissingPythonEclass,
            Report::PythonSingleUseMismatch { .. } => ReportKind::PythonSingleUseMismatch,
            Report::PythonMissingRequiredUse { .. } => ReportKind::PythonMissingRequiredUse,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn severity(&self) -> Severity {
        self.kind().severity()
    }

    pub fn scope(&self) -> Scope {
        match self {
            Report::VulnerablePackage { cpv, .. }
            | Report::MissingPythonEclass { cpv, .. }
            | Report::PythonSingleUseMismatch { cpv, .. }
            | Report::PythonMissingRequiredUse { cpv } => Scope::Version(cpv.clone()),
            _ => Scope::Profiles,
        }
    }
}

impl From<Diagnostic> for Report {
    fn from(diagnostic: Diagnostic) -> Self {
        match diagnostic.severity {
            Severity::Warning => Report::ProfileWarning(diagnostic.message),
            Severity::Error => Report::ProfileError(diagnostic.message),
        }
    }
}

/// `singular` for exactly one item, `plural` otherwise.
fn pluralism<'a, T>(items: &[T], singular: &'a str, plural: &'a str) -> &'a str {
    if items.len() == 1 {
        singular
    } else {
        plural
    }
}

fn quoted(items: &[String]) -> String {
    items
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::UnknownProfilePackage { path, atom } => {
                write!(f, "'{path}': unknown package: '{atom}'")
            }
            Report::UnknownProfilePackageUse { path, atom, flags } => write!(
                f,
                "'{path}': unknown package USE flag{}: '{atom}[{}]'",
                pluralism(flags, "", "s"),
                flags.join(", ")
            ),
            Report::UnknownProfileUse { path, flags } => write!(
                f,
                "'{path}': unknown USE flag{}: {}",
                pluralism(flags, "", "s"),
                quoted(flags)
            ),
            Report::UnknownProfilePackageKeywords {
                path,
                atom,
                keywords,
            } => write!(
                f,
                "'{path}': unknown package keyword{}: {atom}: {}",
                pluralism(keywords, "", "s"),
                quoted(keywords)
            ),
            Report::ProfileWarning(msg) | Report::ProfileError(msg) => f.write_str(msg),
            Report::UnusedProfileDirs(dirs) => write!(
                f,
                "unused profile dir{}: {}",
                pluralism(dirs, "", "s"),
                quoted(dirs)
            ),
            Report::ArchesWithoutProfiles(arches) => write!(
                f,
                "arch{} without profiles: {}",
                pluralism(arches, "", "es"),
                arches.join(", ")
            ),
            Report::NonexistentProfilePath(path) => {
                write!(f, "nonexistent profile path: '{path}'")
            }
            Report::LaggingProfileEapi {
                profile,
                eapi,
                parent,
                parent_eapi,
            } => write!(
                f,
                "'{profile}' profile has EAPI {eapi}, '{parent}' parent has EAPI {parent_eapi}"
            ),
            Report::UnknownCategoryDirs(dirs) => write!(
                f,
                "unknown category dir{}: {}",
                pluralism(dirs, "", "s"),
                dirs.join(", ")
            ),
            Report::NonexistentCategories(categories) => write!(
                f,
                "nonexistent profiles/categories entr{}: {}",
                pluralism(categories, "y", "ies"),
                categories.join(", ")
            ),
            Report::VulnerablePackage { glsa, arches, .. } => write!(
                f,
                "vulnerable via {glsa}, keyword{}: {}",
                pluralism(arches, "", "s"),
                arches.join(", ")
            ),
            Report::MissingPythonEclass {
                eclass, attr, atom, ..
            } => write!(f, "missing {eclass} eclass usage for {attr}=\"{atom}\""),
            Report::PythonSingleUseMismatch {
                flags,
                single_flags,
                ..
            } => write!(
                f,
                "mismatched flags in IUSE: PYTHON_TARGETS={} and PYTHON_SINGLE_TARGET={}",
                flags.join(" "),
                single_flags.join(" ")
            ),
            Report::PythonMissingRequiredUse { .. } => {
                write!(f, "missing REQUIRED_USE=\"${{PYTHON_REQUIRED_USE}}\"")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn profile_descriptions() {
        let report = Report::UnknownProfileUse {
            path: "base/use.mask".to_string(),
            flags: strings(&["-foo"]),
        };
        assert_eq!(report.to_string(), "'base/use.mask': unknown USE flag: '-foo'");
        assert_eq!(report.severity(), Severity::Warning);
        assert_eq!(report.scope(), Scope::Profiles);

        let report = Report::UnknownProfilePackageUse {
            path: "package.use".to_string(),
            atom: "dev-libs/foo".to_string(),
            flags: strings(&["a", "-b"]),
        };
        assert_eq!(
            report.to_string(),
            "'package.use': unknown package USE flags: 'dev-libs/foo[a, -b]'"
        );

        let report = Report::UnknownProfilePackageKeywords {
            path: "package.accept_keywords".to_string(),
            atom: "dev-libs/foo".to_string(),
            keywords: strings(&["~foo"]),
        };
        assert_eq!(
            report.to_string(),
            "'package.accept_keywords': unknown package keyword: dev-libs/foo: '~foo'"
        );
    }

    #[test]
    fn repo_descriptions() {
        let report = Report::ArchesWithoutProfiles(strings(&["arm"]));
        assert_eq!(report.to_string(), "arch without profiles: arm");
        let report = Report::ArchesWithoutProfiles(strings(&["arm", "ppc"]));
        assert_eq!(report.to_string(), "arches without profiles: arm, ppc");

        let report = Report::NonexistentCategories(strings(&["foo"]));
        assert_eq!(report.to_string(), "nonexistent profiles/categories entry: foo");
        let report = Report::NonexistentCategories(strings(&["foo", "bar"]));
        assert_eq!(
            report.to_string(),
            "nonexistent profiles/categories entries: foo, bar"
        );

        let report = Report::UnusedProfileDirs(strings(&["a", "b"]));
        assert_eq!(report.to_string(), "unused profile dirs: 'a', 'b'");

        let report = Report::LaggingProfileEapi {
            profile: "default/linux".to_string(),
            eapi: Eapi::Five,
            parent: "base".to_string(),
            parent_eapi: Eapi::Seven,
        };
        assert_eq!(
            report.to_string(),
            "'default/linux' profile has EAPI 5, 'base' parent has EAPI 7"
        );

        let report = Report::NonexistentProfilePath("foo".to_string());
        assert_eq!(report.severity(), Severity::Error);
    }

    #[test]
    fn version_descriptions() {
        let cpv: Cpv = "dev-libs/foo-1".parse().unwrap();
        let report = Report::VulnerablePackage {
            cpv: cpv.clone(),
            glsa: "glsa-202401-01".to_string(),
            arches: strings(&["amd64", "x86"]),
        };
        assert_eq!(
            report.to_string(),
            "vulnerable via glsa-202401-01, keywords: amd64, x86"
        );
        assert_eq!(report.scope(), Scope::Version(cpv.clone()));
        assert_eq!(report.name(), "VulnerablePackage");

        let report = Report::MissingPythonEclass {
            cpv: cpv.clone(),
            eclass: "python-any-r1",
            attr: "DEPEND",
            atom: "dev-lang/python".to_string(),
        };
        assert_eq!(
            report.to_string(),
            "missing python-any-r1 eclass usage for DEPEND=\"dev-lang/python\""
        );

        let report = Report::PythonMissingRequiredUse { cpv };
        assert_eq!(report.to_string(), "missing REQUIRED_USE=\"${PYTHON_REQUIRED_USE}\"");
        assert_eq!(report.name(), "PythonMissingRequiredUSE");
    }
}
