use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// EAPI (Ebuild API) version of an ebuild or a profile directory.
///
/// Profiles declare their EAPI in an `eapi` file; a profile without one is
/// EAPI 0. Variants are ordered, so "older than" is a plain comparison.
///
/// See [PMS 5.2.2](https://projects.gentoo.org/pms/latest/pms.html#the-eapi-file).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Eapi {
    /// EAPI 0.
    #[default]
    Zero,
    /// EAPI 1.
    One,
    /// EAPI 2.
    Two,
    /// EAPI 3.
    Three,
    /// EAPI 4.
    Four,
    /// EAPI 5, adds stable USE masking/forcing in profiles.
    Five,
    /// EAPI 6.
    Six,
    /// EAPI 7, adds `BDEPEND`.
    Seven,
    /// EAPI 8, adds `IDEPEND`.
    Eight,
    /// EAPI 9.
    Nine,
}

impl Eapi {
    /// Whether profiles of this EAPI may use `use.stable.*` and
    /// `package.use.stable.*` files.
    pub fn has_stable_use_masks(&self) -> bool {
        *self >= Eapi::Five
    }

    /// Whether this EAPI supports `BDEPEND`.
    pub fn has_bdepend(&self) -> bool {
        *self >= Eapi::Seven
    }

    /// Whether this EAPI supports `IDEPEND`.
    pub fn has_idepend(&self) -> bool {
        *self >= Eapi::Eight
    }

    /// Parse the contents of a profile `eapi` file.
    ///
    /// Surrounding whitespace is ignored and an empty file means EAPI 0.
    ///
    /// ```
    /// use portage_lint::Eapi;
    ///
    /// assert_eq!(Eapi::from_file_contents("5\n").unwrap(), Eapi::Five);
    /// assert_eq!(Eapi::from_file_contents("").unwrap(), Eapi::Zero);
    /// ```
    pub fn from_file_contents(contents: &str) -> Result<Self> {
        match contents.trim() {
            "" => Ok(Eapi::Zero),
            s => s.parse(),
        }
    }
}

impl fmt::Display for Eapi {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let n = match self {
            Eapi::Zero => "0",
            Eapi::One => "1",
            Eapi::Two => "2",
            Eapi::Three => "3",
            Eapi::Four => "4",
            Eapi::Five => "5",
            Eapi::Six => "6",
            Eapi::Seven => "7",
            Eapi::Eight => "8",
            Eapi::Nine => "9",
        };
        f.write_str(n)
    }
}

impl FromStr for Eapi {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "0" => Ok(Eapi::Zero),
            "1" => Ok(Eapi::One),
            "2" => Ok(Eapi::Two),
            "3" => Ok(Eapi::Three),
            "4" => Ok(Eapi::Four),
            "5" => Ok(Eapi::Five),
            "6" => Ok(Eapi::Six),
            "7" => Ok(Eapi::Seven),
            "8" => Ok(Eapi::Eight),
            "9" => Ok(Eapi::Nine),
            _ => Err(Error::InvalidEapi(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known() {
        assert_eq!("0".parse::<Eapi>().unwrap(), Eapi::Zero);
        assert_eq!("7".parse::<Eapi>().unwrap(), Eapi::Seven);
        assert_eq!("9".parse::<Eapi>().unwrap(), Eapi::Nine);
    }

    #[test]
    fn invalid_eapi() {
        assert!("10".parse::<Eapi>().is_err());
        assert!("".parse::<Eapi>().is_err());
        assert!("foo".parse::<Eapi>().is_err());
    }

    #[test]
    fn file_contents() {
        assert_eq!(Eapi::from_file_contents("  8 \n").unwrap(), Eapi::Eight);
        assert_eq!(Eapi::from_file_contents("\n").unwrap(), Eapi::Zero);
        assert!(Eapi::from_file_contents("5-hdepend").is_err());
    }

    // String ordering would put "10" before "9"; the enum keeps the
    // numeric order.
    #[test]
    fn ordering() {
        assert!(Eapi::Zero < Eapi::Five);
        assert!(Eapi::Eight < Eapi::Nine);
        assert_eq!(Eapi::default(), Eapi::Zero);
    }

    #[test]
    fn feature_queries() {
        assert!(!Eapi::Four.has_stable_use_masks());
        assert!(Eapi::Five.has_stable_use_masks());
        assert!(!Eapi::Six.has_bdepend());
        assert!(Eapi::Seven.has_bdepend());
        assert!(!Eapi::Seven.has_idepend());
        assert!(Eapi::Eight.has_idepend());
    }
}
