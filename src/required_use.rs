use std::fmt;

use winnow::ascii::multispace0;
use winnow::combinator::{alt, dispatch, opt, peek, preceded, repeat};
use winnow::prelude::*;
use winnow::token::any;

use crate::error::{Error, Result};
use crate::syntax::{conditional_head, group, use_flag};

/// A node in a `REQUIRED_USE` expression tree.
///
/// See [PMS 7.3.4](https://projects.gentoo.org/pms/9/pms.html#use-state-constraints).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequiredUseExpr {
    /// A single USE flag, possibly negated with `!`.
    Flag {
        /// Flag name.
        name: String,
        /// `true` if prefixed with `!`.
        negated: bool,
    },
    /// `|| ( ... )`
    AnyOf(Vec<RequiredUseExpr>),
    /// `^^ ( ... )`
    ExactlyOne(Vec<RequiredUseExpr>),
    /// `?? ( ... )`
    AtMostOne(Vec<RequiredUseExpr>),
    /// `flag? ( ... )` or `!flag? ( ... )`.
    UseConditional {
        /// USE flag name.
        flag: String,
        /// `true` for `!flag?`.
        negated: bool,
        /// Children guarded by this flag.
        entries: Vec<RequiredUseExpr>,
    },
    /// All children must hold; used for the top level and bare `( ... )`.
    All(Vec<RequiredUseExpr>),
}

impl RequiredUseExpr {
    /// Parse a `REQUIRED_USE` expression string.
    ///
    /// ```
    /// use portage_lint::RequiredUseExpr;
    ///
    /// let expr = RequiredUseExpr::parse("^^ ( gui qt gtk )").unwrap();
    /// assert!(matches!(expr, RequiredUseExpr::ExactlyOne(_)));
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let mut entries = required_use_string
            .parse(input)
            .map_err(|e| Error::InvalidRequiredUse(format!("{e}")))?;

        Ok(if entries.len() == 1 {
            entries.remove(0)
        } else {
            RequiredUseExpr::All(entries)
        })
    }

    /// The entries at the top level of the expression.
    ///
    /// ```
    /// use portage_lint::RequiredUseExpr;
    ///
    /// let expr = RequiredUseExpr::parse("a || ( b c )").unwrap();
    /// assert_eq!(expr.top_level().len(), 2);
    /// let expr = RequiredUseExpr::parse("|| ( b c )").unwrap();
    /// assert_eq!(expr.top_level().len(), 1);
    /// ```
    pub fn top_level(&self) -> &[RequiredUseExpr] {
        match self {
            RequiredUseExpr::All(entries) => entries,
            other => std::slice::from_ref(other),
        }
    }

    /// The flag name if this is a plain, non-negated flag.
    pub fn plain_flag(&self) -> Option<&str> {
        match self {
            RequiredUseExpr::Flag {
                name,
                negated: false,
            } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for RequiredUseExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RequiredUseExpr::Flag { name, negated } => {
                if *negated {
                    write!(f, "!")?;
                }
                write!(f, "{name}")
            }
            RequiredUseExpr::AnyOf(entries) => fmt_group(f, "|| ", entries),
            RequiredUseExpr::ExactlyOne(entries) => fmt_group(f, "^^ ", entries),
            RequiredUseExpr::AtMostOne(entries) => fmt_group(f, "?? ", entries),
            RequiredUseExpr::UseConditional {
                flag,
                negated,
                entries,
            } => {
                let bang = if *negated { "!" } else { "" };
                fmt_group(f, &format!("{bang}{flag}? "), entries)
            }
            RequiredUseExpr::All(entries) => fmt_entries(f, entries),
        }
    }
}

fn fmt_group(f: &mut fmt::Formatter, prefix: &str, entries: &[RequiredUseExpr]) -> fmt::Result {
    write!(f, "{prefix}( ")?;
    fmt_entries(f, entries)?;
    write!(f, " )")
}

fn fmt_entries(f: &mut fmt::Formatter, entries: &[RequiredUseExpr]) -> fmt::Result {
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{entry}")?;
    }
    Ok(())
}

// Winnow parsers

fn flag(input: &mut &str) -> ModalResult<RequiredUseExpr> {
    let negated = opt('!').parse_next(input)?.is_some();
    let name = use_flag.parse_next(input)?.to_string();
    Ok(RequiredUseExpr::Flag { name, negated })
}

fn use_conditional(input: &mut &str) -> ModalResult<RequiredUseExpr> {
    let (negated, flag) = conditional_head.parse_next(input)?;
    let entries = group("USE conditional group", required_use_entries).parse_next(input)?;
    Ok(RequiredUseExpr::UseConditional {
        flag,
        negated,
        entries,
    })
}

fn required_use_entry(input: &mut &str) -> ModalResult<RequiredUseExpr> {
    dispatch! {peek(any);
        '|' => preceded("||", group("'||' group", required_use_entries))
            .map(RequiredUseExpr::AnyOf),
        '^' => preceded("^^", group("'^^' group", required_use_entries))
            .map(RequiredUseExpr::ExactlyOne),
        '?' => preceded("??", group("'??' group", required_use_entries))
            .map(RequiredUseExpr::AtMostOne),
        '(' => group("paren group", required_use_entries).map(RequiredUseExpr::All),
        _ => alt((use_conditional, flag)),
    }
    .parse_next(input)
}

fn required_use_entries(input: &mut &str) -> ModalResult<Vec<RequiredUseExpr>> {
    repeat(0.., preceded(multispace0, required_use_entry)).parse_next(input)
}

fn required_use_string(input: &mut &str) -> ModalResult<Vec<RequiredUseExpr>> {
    let entries = required_use_entries(input)?;
    multispace0.parse_next(input)?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag(name: &str) -> RequiredUseExpr {
        RequiredUseExpr::Flag {
            name: name.to_string(),
            negated: false,
        }
    }

    #[test]
    fn parse_single_flag() {
        assert_eq!(RequiredUseExpr::parse("ssl").unwrap(), flag("ssl"));
    }

    #[test]
    fn parse_negated_flag() {
        let expr = RequiredUseExpr::parse("!debug").unwrap();
        assert!(matches!(expr, RequiredUseExpr::Flag { negated: true, .. }));
        assert_eq!(expr.plain_flag(), None);
    }

    #[test]
    fn parse_operators() {
        let expr = RequiredUseExpr::parse("|| ( a b ) ^^ ( c d ) ?? ( e f )").unwrap();
        let top = expr.top_level();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0], RequiredUseExpr::AnyOf(vec![flag("a"), flag("b")]));
        assert_eq!(top[1], RequiredUseExpr::ExactlyOne(vec![flag("c"), flag("d")]));
        assert_eq!(top[2], RequiredUseExpr::AtMostOne(vec![flag("e"), flag("f")]));
    }

    #[test]
    fn parse_use_conditional() {
        let expr = RequiredUseExpr::parse(
            "python_single_target_python3_6? ( python_targets_python3_6 )",
        )
        .unwrap();
        match expr {
            RequiredUseExpr::UseConditional {
                flag: name,
                negated,
                entries,
            } => {
                assert_eq!(name, "python_single_target_python3_6");
                assert!(!negated);
                assert_eq!(entries, vec![flag("python_targets_python3_6")]);
            }
            other => panic!("expected UseConditional, got {other:?}"),
        }
    }

    #[test]
    fn parse_multiline_whitespace() {
        let expr = RequiredUseExpr::parse("|| ( a\n     b )\n").unwrap();
        assert_eq!(expr, RequiredUseExpr::AnyOf(vec![flag("a"), flag("b")]));
    }

    #[test]
    fn parse_empty() {
        let expr = RequiredUseExpr::parse("").unwrap();
        assert_eq!(expr, RequiredUseExpr::All(Vec::new()));
        assert!(expr.top_level().is_empty());
    }

    #[test]
    fn unbalanced() {
        assert!(RequiredUseExpr::parse("|| ( a b").is_err());
        assert!(RequiredUseExpr::parse("a )").is_err());
    }

    #[test]
    fn display() {
        let input = "a? ( b ) !c? ( || ( d e ) ) ^^ ( f g )";
        let expr = RequiredUseExpr::parse(input).unwrap();
        assert_eq!(expr.to_string(), input);
    }
}
