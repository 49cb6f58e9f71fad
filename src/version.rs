use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use winnow::ascii::digit1;
use winnow::combinator::{alt, opt, preceded, repeat, separated};
use winnow::prelude::*;
use winnow::token::one_of;

use crate::error::{Error, Result};

/// Version suffix kind, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SuffixKind {
    /// `_alpha`
    Alpha,
    /// `_beta`
    Beta,
    /// `_pre`
    Pre,
    /// `_rc`
    Rc,
    /// `_p`
    P,
}

impl SuffixKind {
    fn as_str(self) -> &'static str {
        match self {
            SuffixKind::Alpha => "alpha",
            SuffixKind::Beta => "beta",
            SuffixKind::Pre => "pre",
            SuffixKind::Rc => "rc",
            SuffixKind::P => "p",
        }
    }
}

/// A version suffix such as `_rc2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suffix {
    /// Suffix kind.
    pub kind: SuffixKind,
    /// Optional number; a missing number compares as zero.
    pub number: Option<String>,
}

/// A package version as defined by [PMS 3.2].
///
/// Components are kept as written so `1.01` and `1.1` display differently,
/// while comparisons follow the PMS algorithm: `1.0 == 1.00`, `1.01 < 1.1`,
/// `1_rc1 < 1 < 1_p1`, and a missing revision equals `-r0`.
///
/// [PMS 3.2]: https://projects.gentoo.org/pms/latest/pms.html#version-specifications
///
/// ```
/// use portage_lint::Version;
///
/// let a: Version = "1.2.3_rc1-r2".parse().unwrap();
/// let b: Version = "1.2.3".parse().unwrap();
/// assert!(a < b);
/// assert_eq!(a.to_string(), "1.2.3_rc1-r2");
/// ```
#[derive(Debug, Clone)]
pub struct Version {
    numbers: Vec<String>,
    letter: Option<char>,
    suffixes: Vec<Suffix>,
    revision: Option<String>,
}

impl Version {
    /// The revision number, zero when absent.
    pub fn revision(&self) -> &str {
        self.revision.as_deref().map_or("0", trim_leading_zeros)
    }

    /// Whether an explicit, non-zero revision is present.
    pub fn has_revision(&self) -> bool {
        self.revision() != "0"
    }

    /// Compare ignoring revisions; equality here is the `~` operator.
    pub fn cmp_base(&self, other: &Version) -> Ordering {
        cmp_numbers(&self.numbers, &other.numbers)
            .then_with(|| self.letter.cmp(&other.letter))
            .then_with(|| cmp_suffixes(&self.suffixes, &other.suffixes))
    }

    /// Component-wise prefix match used by `=ver*`.
    ///
    /// Only as many components as the pattern names are compared, so
    /// `1.2*` matches `1.2`, `1.2.3` and `1.2_beta` but not `1.20`.
    ///
    /// ```
    /// use portage_lint::Version;
    ///
    /// let pattern: Version = "2".parse().unwrap();
    /// assert!(pattern.glob_matches(&"2.7.18".parse().unwrap()));
    /// assert!(!pattern.glob_matches(&"20".parse().unwrap()));
    /// ```
    pub fn glob_matches(&self, other: &Version) -> bool {
        if other.numbers.len() < self.numbers.len() {
            return false;
        }
        let numbers_match = self
            .numbers
            .iter()
            .zip(&other.numbers)
            .enumerate()
            .all(|(i, (a, b))| cmp_component(i, a, b) == Ordering::Equal);
        if !numbers_match {
            return false;
        }

        let has_tail =
            self.letter.is_some() || !self.suffixes.is_empty() || self.revision.is_some();
        if !has_tail {
            return true;
        }
        if other.numbers.len() != self.numbers.len() {
            return false;
        }
        if self.letter.is_some() && self.letter != other.letter {
            return false;
        }
        if self.suffixes.len() > other.suffixes.len()
            || cmp_suffixes(&self.suffixes, &other.suffixes[..self.suffixes.len()])
                != Ordering::Equal
        {
            return false;
        }
        if self.revision.is_some() {
            return other.suffixes.len() == self.suffixes.len()
                && self.revision() == other.revision();
        }
        true
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_base(other)
            .then_with(|| cmp_int(self.revision(), other.revision()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.numbers.join("."))?;
        if let Some(letter) = self.letter {
            write!(f, "{letter}")?;
        }
        for suffix in &self.suffixes {
            write!(f, "_{}", suffix.kind.as_str())?;
            if let Some(ref n) = suffix.number {
                write!(f, "{n}")?;
            }
        }
        if let Some(ref rev) = self.revision {
            write!(f, "-r{rev}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        version
            .parse(s)
            .map_err(|_| Error::InvalidVersion(s.to_string()))
    }
}

fn trim_leading_zeros(s: &str) -> &str {
    let trimmed = s.trim_start_matches('0');
    if trimmed.is_empty() {
        "0"
    } else {
        trimmed
    }
}

/// Integer comparison on digit strings of any length.
fn cmp_int(a: &str, b: &str) -> Ordering {
    let (a, b) = (trim_leading_zeros(a), trim_leading_zeros(b));
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_component(index: usize, a: &str, b: &str) -> Ordering {
    if index > 0 && (a.starts_with('0') || b.starts_with('0')) {
        a.trim_end_matches('0').cmp(b.trim_end_matches('0'))
    } else {
        cmp_int(a, b)
    }
}

fn cmp_numbers(a: &[String], b: &[String]) -> Ordering {
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        match cmp_component(i, x, y) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

fn cmp_suffixes(a: &[Suffix], b: &[Suffix]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ord = x.kind.cmp(&y.kind).then_with(|| {
            cmp_int(
                x.number.as_deref().unwrap_or("0"),
                y.number.as_deref().unwrap_or("0"),
            )
        });
        if ord != Ordering::Equal {
            return ord;
        }
    }
    // An extra `_p` makes a version newer, any other extra suffix older.
    match (a.get(b.len()), b.get(a.len())) {
        (Some(extra), _) if extra.kind == SuffixKind::P => Ordering::Greater,
        (Some(_), _) => Ordering::Less,
        (_, Some(extra)) if extra.kind == SuffixKind::P => Ordering::Less,
        (_, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// Winnow parsers

fn suffix(input: &mut &str) -> ModalResult<Suffix> {
    let kind = preceded(
        '_',
        alt((
            "alpha".value(SuffixKind::Alpha),
            "beta".value(SuffixKind::Beta),
            "pre".value(SuffixKind::Pre),
            "rc".value(SuffixKind::Rc),
            "p".value(SuffixKind::P),
        )),
    )
    .parse_next(input)?;
    let number = opt(digit1).parse_next(input)?.map(String::from);
    Ok(Suffix { kind, number })
}

pub(crate) fn version(input: &mut &str) -> ModalResult<Version> {
    let numbers: Vec<String> = separated(1.., digit1.map(String::from), '.').parse_next(input)?;
    let letter = opt(one_of('a'..='z')).parse_next(input)?;
    let suffixes: Vec<Suffix> = repeat(0.., suffix).parse_next(input)?;
    let revision = opt(preceded("-r", digit1))
        .parse_next(input)?
        .map(String::from);
    Ok(Version {
        numbers,
        letter,
        suffixes,
        revision,
    })
}
