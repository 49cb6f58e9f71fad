use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::package::{is_valid_category, is_valid_package, split_version, Package};
use crate::syntax::is_flag_char;
use crate::version::Version;

/// Blocker prefix of an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Blocker {
    /// `!`
    Weak,
    /// `!!`
    Strong,
}

/// Version operator of an atom.
///
/// See [PMS 8.3.1](https://projects.gentoo.org/pms/latest/pms.html#operators).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `=`
    Equal,
    /// `=` with a trailing `*`
    EqualGlob,
    /// `~`
    Approximate,
    /// `>=`
    GreaterOrEqual,
    /// `>`
    Greater,
}

impl Operator {
    fn prefix(self) -> &'static str {
        match self {
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
            Operator::Equal | Operator::EqualGlob => "=",
            Operator::Approximate => "~",
            Operator::GreaterOrEqual => ">=",
            Operator::Greater => ">",
        }
    }

    /// Whether `candidate` satisfies `self` applied to `bound`.
    pub fn matches(self, bound: &Version, candidate: &Version) -> bool {
        let ord = candidate.cmp(bound);
        match self {
            Operator::Less => ord == Ordering::Less,
            Operator::LessOrEqual => ord != Ordering::Greater,
            Operator::Equal => ord == Ordering::Equal,
            Operator::EqualGlob => bound.glob_matches(candidate),
            Operator::Approximate => candidate.cmp_base(bound) == Ordering::Equal,
            Operator::GreaterOrEqual => ord != Ordering::Less,
            Operator::Greater => ord == Ordering::Greater,
        }
    }
}

/// Slot dependency of an atom.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotDep {
    /// `:*`
    Any,
    /// `:=`
    Rebuild,
    /// `:slot`, `:slot/subslot` or `:slot=`.
    Slot {
        /// Slot name.
        slot: String,
        /// Optional sub-slot.
        subslot: Option<String>,
        /// Trailing `=` operator.
        rebuild: bool,
    },
}

impl fmt::Display for SlotDep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SlotDep::Any => write!(f, "*"),
            SlotDep::Rebuild => write!(f, "="),
            SlotDep::Slot {
                slot,
                subslot,
                rebuild,
            } => {
                write!(f, "{slot}")?;
                if let Some(sub) = subslot {
                    write!(f, "/{sub}")?;
                }
                if *rebuild {
                    write!(f, "=")?;
                }
                Ok(())
            }
        }
    }
}

/// A package dependency atom.
///
/// Supports blockers, version operators (including `=ver*`), slot and
/// sub-slot dependencies, `::repo` and USE dependencies. USE dependencies are
/// kept verbatim; they are not evaluated by [`Atom::matches`].
///
/// See [PMS 8.3](https://projects.gentoo.org/pms/latest/pms.html#package-dependency-specifications).
///
/// ```
/// use portage_lint::{Atom, Operator};
///
/// let atom: Atom = ">=dev-lang/python-3.11:3.11[sqlite]".parse().unwrap();
/// assert_eq!(atom.key(), "dev-lang/python");
/// assert_eq!(atom.op, Some(Operator::GreaterOrEqual));
/// assert_eq!(atom.use_deps, vec!["sqlite"]);
/// assert_eq!(atom.to_string(), ">=dev-lang/python-3.11:3.11[sqlite]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    /// Blocker prefix, if any.
    pub blocker: Option<Blocker>,
    /// Version operator; present exactly when `version` is.
    pub op: Option<Operator>,
    /// Category name.
    pub category: String,
    /// Package name.
    pub package: String,
    /// Version bound.
    pub version: Option<Version>,
    /// Slot dependency.
    pub slot: Option<SlotDep>,
    /// Repository restriction.
    pub repo: Option<String>,
    /// USE dependencies, verbatim.
    pub use_deps: Vec<String>,
}

impl Atom {
    /// `category/package`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.category, self.package)
    }

    /// Whether this is a blocker (`!` or `!!`).
    pub fn is_blocker(&self) -> bool {
        self.blocker.is_some()
    }

    /// Whether `pkg` satisfies the atom's name, version and slot parts.
    ///
    /// Blockers are matched like plain atoms; callers decide what a match
    /// means.
    pub fn matches(&self, pkg: &Package) -> bool {
        if self.category != pkg.cpv.category || self.package != pkg.cpv.package {
            return false;
        }
        if let (Some(op), Some(bound)) = (self.op, &self.version) {
            if !op.matches(bound, &pkg.cpv.version) {
                return false;
            }
        }
        match &self.slot {
            Some(SlotDep::Slot { slot, subslot, .. }) => {
                let pkg_slot = &pkg.metadata.slot;
                if *slot != pkg_slot.slot {
                    return false;
                }
                match subslot {
                    Some(sub) => {
                        let pkg_sub = pkg_slot.subslot.as_deref().unwrap_or(&pkg_slot.slot);
                        pkg_sub == sub.as_str()
                    }
                    None => true,
                }
            }
            _ => true,
        }
    }
}

impl FromStr for Atom {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |why: &str| Error::InvalidAtom(format!("{s}: {why}"));

        let (blocker, rest) = if let Some(rest) = s.strip_prefix("!!") {
            (Some(Blocker::Strong), rest)
        } else if let Some(rest) = s.strip_prefix('!') {
            (Some(Blocker::Weak), rest)
        } else {
            (None, s)
        };

        let (mut op, rest) = [
            ("<=", Operator::LessOrEqual),
            (">=", Operator::GreaterOrEqual),
            ("<", Operator::Less),
            (">", Operator::Greater),
            ("=", Operator::Equal),
            ("~", Operator::Approximate),
        ]
        .iter()
        .find_map(|&(prefix, op)| rest.strip_prefix(prefix).map(|r| (Some(op), r)))
        .unwrap_or((None, rest));

        let (rest, use_deps) = match rest.strip_suffix(']') {
            Some(body) => {
                let (rest, deps) = body
                    .split_once('[')
                    .ok_or_else(|| invalid("unmatched ']'"))?;
                let use_deps = deps
                    .split(',')
                    .map(|dep| {
                        if dep.is_empty() || !dep.chars().all(is_use_dep_char) {
                            Err(invalid("invalid USE dependency"))
                        } else {
                            Ok(dep.to_string())
                        }
                    })
                    .collect::<Result<Vec<_>>>()?;
                (rest, use_deps)
            }
            None => (rest, Vec::new()),
        };

        let (rest, repo) = match rest.split_once("::") {
            Some((rest, repo)) if is_valid_package(repo) => (rest, Some(repo.to_string())),
            Some(_) => return Err(invalid("invalid repository name")),
            None => (rest, None),
        };

        let (rest, slot) = match rest.split_once(':') {
            Some((rest, slot)) => {
                let slot = parse_slot_dep(slot).ok_or_else(|| invalid("invalid slot"))?;
                (rest, Some(slot))
            }
            None => (rest, None),
        };

        let rest = match rest.strip_suffix('*') {
            Some(rest) if op == Some(Operator::Equal) => {
                op = Some(Operator::EqualGlob);
                rest
            }
            Some(_) => return Err(invalid("'*' is only valid with '='")),
            None => rest,
        };

        let (category, name) = rest
            .split_once('/')
            .ok_or_else(|| invalid("missing category"))?;
        if !is_valid_category(category) {
            return Err(invalid("invalid category"));
        }

        let (package, version) = if op.is_some() {
            let (package, version) =
                split_version(name).ok_or_else(|| invalid("operator without version"))?;
            (package, Some(version))
        } else if is_valid_package(name) {
            (name, None)
        } else {
            return Err(invalid("invalid package name"));
        };

        Ok(Atom {
            blocker,
            op,
            category: category.to_string(),
            package: package.to_string(),
            version,
            slot,
            repo,
            use_deps,
        })
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.blocker {
            Some(Blocker::Strong) => write!(f, "!!")?,
            Some(Blocker::Weak) => write!(f, "!")?,
            None => {}
        }
        if let Some(op) = self.op {
            write!(f, "{}", op.prefix())?;
        }
        write!(f, "{}/{}", self.category, self.package)?;
        if let Some(ref version) = self.version {
            write!(f, "-{version}")?;
        }
        if self.op == Some(Operator::EqualGlob) {
            write!(f, "*")?;
        }
        if let Some(ref slot) = self.slot {
            write!(f, ":{slot}")?;
        }
        if let Some(ref repo) = self.repo {
            write!(f, "::{repo}")?;
        }
        if !self.use_deps.is_empty() {
            write!(f, "[{}]", self.use_deps.join(","))?;
        }
        Ok(())
    }
}

fn is_use_dep_char(c: char) -> bool {
    is_flag_char(c) || matches!(c, '!' | '?' | '=' | '(' | ')')
}

fn is_valid_slot_name(s: &str) -> bool {
    is_valid_category(s)
}

fn parse_slot_dep(s: &str) -> Option<SlotDep> {
    match s {
        "*" => return Some(SlotDep::Any),
        "=" => return Some(SlotDep::Rebuild),
        _ => {}
    }
    let (s, rebuild) = match s.strip_suffix('=') {
        Some(s) => (s, true),
        None => (s, false),
    };
    let (slot, subslot) = match s.split_once('/') {
        Some((slot, sub)) => (slot, Some(sub)),
        None => (s, None),
    };
    if !is_valid_slot_name(slot) || !subslot.map_or(true, is_valid_slot_name) {
        return None;
    }
    Some(SlotDep::Slot {
        slot: slot.to_string(),
        subslot: subslot.map(String::from),
        rebuild,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheEntry;
    use crate::package::Cpv;

    fn pkg(cpv: &str, slot: &str) -> Package {
        let entry = CacheEntry::parse(&format!("DESCRIPTION=test\nSLOT={slot}\n")).unwrap();
        Package {
            cpv: cpv.parse::<Cpv>().unwrap(),
            metadata: entry.metadata,
        }
    }

    fn atom(s: &str) -> Atom {
        s.parse().unwrap()
    }

    #[test]
    fn parse_plain() {
        let a = atom("dev-lang/python");
        assert_eq!(a.key(), "dev-lang/python");
        assert!(a.op.is_none() && a.version.is_none() && a.slot.is_none());
    }

    #[test]
    fn parse_everything() {
        let a = atom("!!~app-misc/foo-1.2-r1:2/2.1=::gentoo[bar,-baz,qux(+)?]");
        assert_eq!(a.blocker, Some(Blocker::Strong));
        assert_eq!(a.op, Some(Operator::Approximate));
        assert_eq!(a.version.as_ref().map(|v| v.to_string()), Some("1.2-r1".into()));
        assert_eq!(
            a.slot,
            Some(SlotDep::Slot {
                slot: "2".into(),
                subslot: Some("2.1".into()),
                rebuild: true
            })
        );
        assert_eq!(a.repo.as_deref(), Some("gentoo"));
        assert_eq!(a.use_deps, vec!["bar", "-baz", "qux(+)?"]);
        assert_eq!(
            a.to_string(),
            "!!~app-misc/foo-1.2-r1:2/2.1=::gentoo[bar,-baz,qux(+)?]"
        );
    }

    #[test]
    fn parse_slot_operators() {
        assert_eq!(atom("dev-lang/python:*").slot, Some(SlotDep::Any));
        assert_eq!(atom("dev-lang/python:=").slot, Some(SlotDep::Rebuild));
        assert_eq!(atom("=dev-lang/python-2*").op, Some(Operator::EqualGlob));
        assert_eq!(atom("=dev-lang/python-2*").to_string(), "=dev-lang/python-2*");
    }

    #[test]
    fn invalid() {
        for s in [
            "python",
            ">=dev-lang/python",
            "dev-lang/python-3",
            ">dev-lang/python-3*",
            "dev-lang/python:",
            "dev-lang/python[]",
            "dev-lang/python[ssl",
            "dev-lang/python::",
            "-dev/foo",
        ] {
            assert!(s.parse::<Atom>().is_err(), "{s}");
        }
    }

    #[test]
    fn version_matching() {
        let p = pkg("dev-lang/python-2.7.18-r1", "2.7");
        assert!(atom("dev-lang/python").matches(&p));
        assert!(atom("=dev-lang/python-2*").matches(&p));
        assert!(atom("~dev-lang/python-2.7.18").matches(&p));
        assert!(atom(">=dev-lang/python-2.7.18").matches(&p));
        assert!(atom("<dev-lang/python-3").matches(&p));
        assert!(!atom("=dev-lang/python-2.7.18").matches(&p));
        assert!(!atom(">dev-lang/python-2.7.18-r1").matches(&p));
        assert!(!atom("=dev-lang/python-3*").matches(&p));
        assert!(!atom("dev-lang/pypy").matches(&p));
    }

    #[test]
    fn slot_matching() {
        let p = pkg("dev-libs/openssl-3.0.13", "0/3");
        assert!(atom("dev-libs/openssl:0").matches(&p));
        assert!(atom("dev-libs/openssl:0/3").matches(&p));
        assert!(atom("dev-libs/openssl:=").matches(&p));
        assert!(!atom("dev-libs/openssl:0/1.1").matches(&p));
        assert!(!atom("dev-libs/openssl:1").matches(&p));

        let p = pkg("dev-libs/foo-1", "2");
        assert!(atom("dev-libs/foo:2/2").matches(&p));
    }
}
