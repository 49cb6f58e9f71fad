use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Stability level for an architecture keyword.
///
/// See [PMS 7.3.3](https://projects.gentoo.org/pms/9/pms.html#keywords).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stability {
    /// The package is stable on this architecture (e.g. `amd64`).
    Stable,
    /// The package is testing/unstable on this architecture (e.g. `~amd64`).
    Testing,
    /// The package is disabled on this architecture (e.g. `-amd64`).
    Disabled,
    /// All architectures are disabled (`-*`).
    DisabledAll,
}

/// A single architecture keyword from a package's `KEYWORDS`.
///
/// Each keyword consists of an architecture name and a stability level.
/// GLSA checks report the arches of the enabled keywords, see
/// [`Keyword::is_enabled`].
///
/// See [PMS 7.3.3](https://projects.gentoo.org/pms/9/pms.html#keywords).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Keyword {
    /// Architecture name (e.g. `amd64`, `arm64`, `x86`).
    pub arch: String,
    /// Stability classification.
    pub stability: Stability,
}

impl Keyword {
    /// Parse a space-separated `KEYWORDS` line into a list of keywords.
    ///
    /// # Examples
    ///
    /// ```
    /// use portage_lint::{Keyword, Stability};
    ///
    /// let kws = Keyword::parse_line("amd64 ~arm64 -x86 -*").unwrap();
    /// assert_eq!(kws.len(), 4);
    /// assert_eq!(kws[0].stability, Stability::Stable);
    /// assert_eq!(kws[1].stability, Stability::Testing);
    /// assert_eq!(kws[2].stability, Stability::Disabled);
    /// assert_eq!(kws[3].stability, Stability::DisabledAll);
    /// ```
    pub fn parse_line(input: &str) -> Result<Vec<Keyword>> {
        input
            .split_whitespace()
            .map(|token| token.parse())
            .collect()
    }

    /// Whether the keyword enables the package on its arch (stable or testing).
    ///
    /// # Examples
    ///
    /// ```
    /// use portage_lint::Keyword;
    ///
    /// let kws = Keyword::parse_line("amd64 ~x86 -ppc -*").unwrap();
    /// let enabled: Vec<bool> = kws.iter().map(Keyword::is_enabled).collect();
    /// assert_eq!(enabled, [true, true, false, false]);
    /// ```
    pub fn is_enabled(&self) -> bool {
        matches!(self.stability, Stability::Stable | Stability::Testing)
    }

    /// The set of keywords a profile may legitimately reference for the
    /// given arches.
    ///
    /// Besides `arch`, `~arch`, `-arch` and `-~arch` for every known arch,
    /// the wildcards `*`, `~*`, `**` and `-*` are accepted.
    ///
    /// # Examples
    ///
    /// ```
    /// use portage_lint::Keyword;
    ///
    /// let valid = Keyword::valid_set(["amd64"]);
    /// assert!(valid.contains("~amd64"));
    /// assert!(valid.contains("**"));
    /// assert!(!valid.contains("~x86"));
    /// ```
    pub fn valid_set<I, S>(arches: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut valid: BTreeSet<String> = ["*", "~*", "**", "-*"]
            .into_iter()
            .map(String::from)
            .collect();
        for arch in arches {
            let arch = arch.as_ref();
            valid.insert(arch.to_string());
            valid.insert(format!("~{arch}"));
            valid.insert(format!("-{arch}"));
            valid.insert(format!("-~{arch}"));
        }
        valid
    }
}

impl FromStr for Keyword {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (arch, stability) = match s {
            "" => return Err(Error::InvalidKeyword("empty keyword".to_string())),
            "-*" => ("*", Stability::DisabledAll),
            _ => {
                if let Some(arch) = s.strip_prefix('~') {
                    (arch, Stability::Testing)
                } else if let Some(arch) = s.strip_prefix('-') {
                    (arch, Stability::Disabled)
                } else {
                    (s, Stability::Stable)
                }
            }
        };
        if arch.is_empty() {
            return Err(Error::InvalidKeyword(s.to_string()));
        }
        Ok(Keyword {
            arch: arch.to_string(),
            stability,
        })
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.stability {
            Stability::Stable => write!(f, "{}", self.arch),
            Stability::Testing => write!(f, "~{}", self.arch),
            Stability::Disabled => write!(f, "-{}", self.arch),
            Stability::DisabledAll => write!(f, "-*"),
        }
    }
}
