use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::metadata::PackageMetadata;
use crate::version::Version;

/// A fully qualified package version: `category/package-version`.
///
/// ```
/// use portage_lint::Cpv;
///
/// let cpv: Cpv = "dev-lang/python-3.12.1-r1".parse().unwrap();
/// assert_eq!(cpv.key(), "dev-lang/python");
/// assert_eq!(cpv.version.to_string(), "3.12.1-r1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cpv {
    /// Category name.
    pub category: String,
    /// Package name.
    pub package: String,
    /// Package version.
    pub version: Version,
}

impl Cpv {
    /// `category/package` without the version.
    pub fn key(&self) -> String {
        format!("{}/{}", self.category, self.package)
    }

    /// Build a cpv from a category and a `package-version` file stem,
    /// as found under `metadata/md5-cache/<category>/`.
    pub fn from_parts(category: &str, package_version: &str) -> Result<Cpv> {
        format!("{category}/{package_version}").parse()
    }
}

impl FromStr for Cpv {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidAtom(s.to_string());
        let (category, rest) = s.split_once('/').ok_or_else(invalid)?;
        if !is_valid_category(category) {
            return Err(invalid());
        }
        let (package, version) = split_version(rest).ok_or_else(invalid)?;
        Ok(Cpv {
            category: category.to_string(),
            package: package.to_string(),
            version,
        })
    }
}

impl fmt::Display for Cpv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}-{}", self.category, self.package, self.version)
    }
}

impl PartialOrd for Cpv {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cpv {
    fn cmp(&self, other: &Self) -> Ordering {
        self.category
            .cmp(&other.category)
            .then_with(|| self.package.cmp(&other.package))
            .then_with(|| self.version.cmp(&other.version))
    }
}

/// A package version in a repository together with its cached metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Package identity.
    pub cpv: Cpv,
    /// Metadata read from the md5-cache.
    pub metadata: PackageMetadata,
}

impl Package {
    /// `category/package` without the version.
    pub fn key(&self) -> String {
        self.cpv.key()
    }
}

/// Split `name-version` at the first hyphen that starts a valid version
/// and leaves a valid package name.
pub(crate) fn split_version(s: &str) -> Option<(&str, Version)> {
    s.match_indices('-').find_map(|(i, _)| {
        let (name, version) = (&s[..i], &s[i + 1..]);
        if !is_valid_package(name) {
            return None;
        }
        version.parse::<Version>().ok().map(|v| (name, v))
    })
}

/// Category names: `[A-Za-z0-9+_.-]`, not starting with `-`, `.` or `+`.
pub(crate) fn is_valid_category(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with(['-', '.', '+'])
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '_' | '.' | '-'))
}

/// Package names: `[A-Za-z0-9+_-]`, not starting with `-` or `+`, and not
/// ending in something that looks like a version.
pub(crate) fn is_valid_package(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with(['-', '+'])
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '_' | '-'))
        && !s
            .match_indices('-')
            .any(|(i, _)| s[i + 1..].parse::<Version>().is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cpv() {
        let cpv: Cpv = "x11-libs/gtk+-3.24.41".parse().unwrap();
        assert_eq!(cpv.category, "x11-libs");
        assert_eq!(cpv.package, "gtk+");
        assert_eq!(cpv.to_string(), "x11-libs/gtk+-3.24.41");
    }

    #[test]
    fn hyphenated_names() {
        let cpv: Cpv = "dev-python/python-dateutil-2.8.2-r1".parse().unwrap();
        assert_eq!(cpv.package, "python-dateutil");
        assert_eq!(cpv.version.revision(), "1");

        let cpv = Cpv::from_parts("app-misc", "foo-2-3").unwrap_err();
        assert!(matches!(cpv, Error::InvalidAtom(_)));
    }

    #[test]
    fn invalid() {
        for s in ["dev-lang/python", "python-3", "-cat/foo-1", "cat/-foo-1", "cat/foo-"] {
            assert!(s.parse::<Cpv>().is_err(), "{s}");
        }
    }

    #[test]
    fn ordering() {
        let mut cpvs: Vec<Cpv> = ["b/a-1", "a/b-2", "a/b-10", "a/a-1"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        cpvs.sort();
        let sorted: Vec<String> = cpvs.iter().map(|c| c.to_string()).collect();
        assert_eq!(sorted, vec!["a/a-1", "a/b-2", "a/b-10", "b/a-1"]);
    }
}
