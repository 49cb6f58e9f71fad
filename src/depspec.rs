use std::fmt;

use winnow::ascii::multispace0;
use winnow::combinator::{alt, dispatch, peek, preceded, repeat};
use winnow::prelude::*;
use winnow::token::any;

use crate::atom::Atom;
use crate::error::{Error, Result};
use crate::syntax::{conditional_head, group, token};

/// A node in a dependency specification (`DEPEND`, `RDEPEND`, ...).
///
/// See [PMS 8.2](https://projects.gentoo.org/pms/latest/pms.html#dependency-specification-format).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepSpec {
    /// A package atom.
    Atom(Atom),
    /// `|| ( ... )`
    AnyOf(Vec<DepSpec>),
    /// `flag? ( ... )` or `!flag? ( ... )`.
    UseConditional {
        /// USE flag name.
        flag: String,
        /// `true` for `!flag?`.
        negated: bool,
        /// Entries guarded by this flag.
        entries: Vec<DepSpec>,
    },
    /// All-of group; the top level and bare `( ... )`.
    All(Vec<DepSpec>),
}

impl DepSpec {
    /// Parse a dependency string. An empty string is an empty `All`.
    ///
    /// ```
    /// use portage_lint::DepSpec;
    ///
    /// let deps = DepSpec::parse("ssl? ( dev-libs/openssl ) || ( a/b c/d )").unwrap();
    /// let keys: Vec<String> = deps.atoms().map(|a| a.key()).collect();
    /// assert_eq!(keys, vec!["dev-libs/openssl", "a/b", "c/d"]);
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        dep_string
            .parse(input)
            .map(DepSpec::All)
            .map_err(|e| Error::InvalidDepSpec(format!("{e}")))
    }

    /// Whether the specification holds no atoms at all.
    pub fn is_empty(&self) -> bool {
        self.atoms().next().is_none()
    }

    /// Every atom in the tree, in document order, ignoring structure.
    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        let mut out = Vec::new();
        collect_atoms(self, &mut out);
        out.into_iter()
    }
}

impl Default for DepSpec {
    fn default() -> Self {
        DepSpec::All(Vec::new())
    }
}

fn collect_atoms<'a>(spec: &'a DepSpec, out: &mut Vec<&'a Atom>) {
    match spec {
        DepSpec::Atom(atom) => out.push(atom),
        DepSpec::AnyOf(entries)
        | DepSpec::All(entries)
        | DepSpec::UseConditional { entries, .. } => {
            for entry in entries {
                collect_atoms(entry, out);
            }
        }
    }
}

impl fmt::Display for DepSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (prefix, entries) = match self {
            DepSpec::Atom(atom) => return write!(f, "{atom}"),
            DepSpec::All(entries) => {
                let parts: Vec<String> = entries.iter().map(|e| e.to_string()).collect();
                return write!(f, "{}", parts.join(" "));
            }
            DepSpec::AnyOf(entries) => ("||".to_string(), entries),
            DepSpec::UseConditional {
                flag,
                negated,
                entries,
            } => (format!("{}{flag}?", if *negated { "!" } else { "" }), entries),
        };
        write!(f, "{prefix} ( ")?;
        for entry in entries {
            write!(f, "{entry} ")?;
        }
        write!(f, ")")
    }
}

// Winnow parsers

fn atom(input: &mut &str) -> ModalResult<DepSpec> {
    token
        .try_map(|s: &str| s.parse::<Atom>())
        .map(DepSpec::Atom)
        .parse_next(input)
}

fn use_conditional(input: &mut &str) -> ModalResult<DepSpec> {
    let (negated, flag) = conditional_head.parse_next(input)?;
    let entries = group("USE conditional group", dep_entries).parse_next(input)?;
    Ok(DepSpec::UseConditional {
        flag,
        negated,
        entries,
    })
}

fn dep_entry(input: &mut &str) -> ModalResult<DepSpec> {
    dispatch! {peek(any);
        '|' => preceded("||", group("'||' group", dep_entries)).map(DepSpec::AnyOf),
        '(' => group("paren group", dep_entries).map(DepSpec::All),
        _ => alt((use_conditional, atom)),
    }
    .parse_next(input)
}

fn dep_entries(input: &mut &str) -> ModalResult<Vec<DepSpec>> {
    repeat(0.., preceded(multispace0, dep_entry)).parse_next(input)
}

fn dep_string(input: &mut &str) -> ModalResult<Vec<DepSpec>> {
    let entries = dep_entries(input)?;
    multispace0.parse_next(input)?;
    Ok(entries)
}
