use std::collections::HashMap;

use portage_atom::Slot;

use crate::depspec::DepSpec;
use crate::eapi::Eapi;
use crate::error::{Error, Result};
use crate::iuse::IUse;
use crate::keyword::Keyword;
use crate::metadata::PackageMetadata;
use crate::required_use::RequiredUseExpr;

/// A parsed md5-cache entry.
///
/// Represents a single file from `metadata/md5-cache/<category>/<package>-<version>`.
///
/// See [PMS 14.2](https://projects.gentoo.org/pms/9/pms.html#mddict-cache-file-format).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The ebuild metadata.
    pub metadata: PackageMetadata,

    /// MD5 checksum of the ebuild file (from `_md5_`).
    pub md5: Option<String>,

    /// Eclass inheritance list with checksums (from `_eclasses_`).
    pub eclasses: Vec<(String, String)>,
}

impl CacheEntry {
    /// Parse a md5-cache file's contents.
    ///
    /// Lines are `KEY=VALUE` pairs in arbitrary order; keys the checks do
    /// not use are ignored. Inherited eclasses are the names listed in
    /// `INHERITED` followed by those of `_eclasses_` not already listed.
    ///
    /// ```
    /// use portage_lint::CacheEntry;
    ///
    /// let input = "\
    /// EAPI=7
    /// DESCRIPTION=Example package
    /// SLOT=0
    /// KEYWORDS=~amd64
    /// RDEPEND=dev-lang/python:3.12
    /// _eclasses_=python-single-r1\tabc123
    /// ";
    /// let entry = CacheEntry::parse(input).unwrap();
    /// assert!(entry.metadata.inherits("python-single-r1"));
    /// assert_eq!(entry.metadata.rdepend.atoms().count(), 1);
    /// ```
    pub fn parse(input: &str) -> Result<CacheEntry> {
        let fields: HashMap<&str, &str> = input
            .lines()
            .map(str::trim)
            .filter_map(|line| line.split_once('='))
            .collect();
        let field = |key: &str| fields.get(key).copied().unwrap_or("");

        let eapi = match fields.get("EAPI") {
            Some(s) => s.parse::<Eapi>()?,
            None => Eapi::Zero,
        };

        let description = fields
            .get("DESCRIPTION")
            .map(|s| s.to_string())
            .ok_or_else(|| Error::MissingField("DESCRIPTION".to_string()))?;

        let slot = parse_slot(field("SLOT"))?;
        let keywords = Keyword::parse_line(field("KEYWORDS"))?;
        let iuse = IUse::parse_line(field("IUSE"))?;

        let required_use = match field("REQUIRED_USE") {
            "" => None,
            s => Some(RequiredUseExpr::parse(s)?),
        };

        let eclasses = parse_eclasses(field("_eclasses_"));
        let mut inherited: Vec<String> = Vec::new();
        let names = field("INHERITED")
            .split_whitespace()
            .chain(eclasses.iter().map(|(name, _)| name.as_str()));
        for name in names {
            if !inherited.iter().any(|e| e == name) {
                inherited.push(name.to_string());
            }
        }

        Ok(CacheEntry {
            metadata: PackageMetadata {
                eapi,
                description,
                slot,
                keywords,
                iuse,
                required_use,
                depend: DepSpec::parse(field("DEPEND"))?,
                rdepend: DepSpec::parse(field("RDEPEND"))?,
                bdepend: DepSpec::parse(field("BDEPEND"))?,
                pdepend: DepSpec::parse(field("PDEPEND"))?,
                idepend: DepSpec::parse(field("IDEPEND"))?,
                inherited,
            },
            md5: fields.get("_md5_").map(|s| s.to_string()),
            eclasses,
        })
    }
}

fn parse_slot(s: &str) -> Result<Slot> {
    match s.split_once('/') {
        _ if s.is_empty() => Err(Error::MissingField("SLOT".to_string())),
        Some((slot, subslot)) => Ok(Slot::with_subslot(slot, subslot)),
        None => Ok(Slot::new(s)),
    }
}

/// `_eclasses_` is a tab-separated list of `name\tchecksum` pairs; a
/// trailing unpaired value is dropped.
fn parse_eclasses(s: &str) -> Vec<(String, String)> {
    let parts: Vec<&str> = s.split('\t').filter(|p| !p.is_empty()).collect();
    parts
        .chunks_exact(2)
        .map(|pair| (pair[0].to_string(), pair[1].to_string()))
        .collect()
}
