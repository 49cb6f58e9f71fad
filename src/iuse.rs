use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Default state for an IUSE flag.
///
/// Flags may be prefixed with `+` (enabled by default) or `-` (disabled by
/// default) in the `IUSE` variable. Profile checks only care about the flag
/// name, see [`IUse::stripped`].
///
/// See [PMS 7.2](https://projects.gentoo.org/pms/9/pms.html#mandatory-ebuilddefined-variables).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IUseDefault {
    /// `+flag`, enabled by default.
    Enabled,
    /// `-flag`, disabled by default.
    Disabled,
}

/// A single USE flag entry from a package's `IUSE`.
///
/// See [PMS 7.2](https://projects.gentoo.org/pms/9/pms.html#mandatory-ebuilddefined-variables).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IUse {
    /// The USE flag name (without prefix).
    pub name: String,
    /// Optional default state prefix (`+` or `-`).
    pub default: Option<IUseDefault>,
}

impl IUse {
    /// Parse a space-separated `IUSE` line into a list of flags.
    ///
    /// # Examples
    ///
    /// ```
    /// use portage_lint::{IUse, IUseDefault};
    ///
    /// let flags = IUse::parse_line("+ssl -debug test").unwrap();
    /// assert_eq!(flags.len(), 3);
    /// assert_eq!(flags[0].name, "ssl");
    /// assert_eq!(flags[0].default, Some(IUseDefault::Enabled));
    /// assert_eq!(flags[1].name, "debug");
    /// assert_eq!(flags[1].default, Some(IUseDefault::Disabled));
    /// assert_eq!(flags[2].name, "test");
    /// assert_eq!(flags[2].default, None);
    /// ```
    pub fn parse_line(input: &str) -> Result<Vec<IUse>> {
        input
            .split_whitespace()
            .map(|token| token.parse())
            .collect()
    }

    /// Flag names with the default prefixes stripped.
    ///
    /// These are the names `package.use` entries and `REQUIRED_USE` refer
    /// to.
    ///
    /// # Examples
    ///
    /// ```
    /// use portage_lint::IUse;
    ///
    /// let flags = IUse::parse_line("+ssl -debug python_targets_python3_12").unwrap();
    /// let names: Vec<&str> = IUse::stripped(&flags).collect();
    /// assert_eq!(names, ["ssl", "debug", "python_targets_python3_12"]);
    /// ```
    pub fn stripped(flags: &[IUse]) -> impl Iterator<Item = &str> {
        flags.iter().map(|flag| flag.name.as_str())
    }
}

impl FromStr for IUse {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, default) = if let Some(name) = s.strip_prefix('+') {
            (name, Some(IUseDefault::Enabled))
        } else if let Some(name) = s.strip_prefix('-') {
            (name, Some(IUseDefault::Disabled))
        } else {
            (s, None)
        };
        if name.is_empty() {
            return Err(Error::InvalidIUse(s.to_string()));
        }
        Ok(IUse {
            name: name.to_string(),
            default,
        })
    }
}

impl fmt::Display for IUse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.default {
            Some(IUseDefault::Enabled) => write!(f, "+{}", self.name),
            Some(IUseDefault::Disabled) => write!(f, "-{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
