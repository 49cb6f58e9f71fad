//! Winnow building blocks shared by the dependency and `REQUIRED_USE`
//! grammars.

use winnow::ascii::multispace0;
use winnow::combinator::{cut_err, delimited, opt};
use winnow::error::{ContextError, ErrMode, StrContext};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

pub(crate) fn is_flag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '@')
}

/// A bare USE flag name.
pub(crate) fn use_flag<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., is_flag_char).parse_next(input)
}

/// `flag?` or `!flag?`, returning `(negated, flag)`.
pub(crate) fn conditional_head(input: &mut &str) -> ModalResult<(bool, String)> {
    let negated = opt('!').parse_next(input)?.is_some();
    let flag = use_flag.parse_next(input)?.to_string();
    '?'.parse_next(input)?;
    Ok((negated, flag))
}

/// A parenthesised group. Once the opening paren is seen the group must
/// close, so failures are not backtracked.
pub(crate) fn group<'s, O, P>(
    label: &'static str,
    inner: P,
) -> impl Parser<&'s str, O, ErrMode<ContextError>>
where
    P: Parser<&'s str, O, ErrMode<ContextError>>,
{
    cut_err(delimited((multispace0, '('), inner, (multispace0, ')')))
        .context(StrContext::Label(label))
}

/// A whitespace-delimited token.
pub(crate) fn token<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_till(1.., char::is_whitespace).parse_next(input)
}
