//! Gentoo Linux Security Advisories.
//!
//! Each `glsa-*.xml` document lists affected packages together with the
//! version ranges that are vulnerable and those that are not:
//!
//! ```xml
//! <glsa id="202401-01">
//!   <affected>
//!     <package name="dev-libs/openssl" auto="yes" arch="*">
//!       <unaffected range="ge">3.0.13</unaffected>
//!       <vulnerable range="lt">3.0.13</vulnerable>
//!     </package>
//!   </affected>
//! </glsa>
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::atom::Atom;
use crate::error::{Error, Result};
use crate::package::Package;
use crate::version::Version;

/// Comparison operator of a `range` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    /// Revision-only variants: the version must also match with `~`.
    RLt,
    RLe,
    RGe,
    RGt,
}

impl RangeOp {
    fn parse(s: &str) -> Result<RangeOp> {
        Ok(match s {
            "lt" => RangeOp::Lt,
            "le" => RangeOp::Le,
            "eq" => RangeOp::Eq,
            "ge" => RangeOp::Ge,
            "gt" => RangeOp::Gt,
            "rlt" => RangeOp::RLt,
            "rle" => RangeOp::RLe,
            "rge" => RangeOp::RGe,
            "rgt" => RangeOp::RGt,
            _ => return Err(Error::InvalidGlsa(format!("unknown range: '{s}'"))),
        })
    }

    fn atom_prefix(self) -> &'static str {
        match self {
            RangeOp::Lt | RangeOp::RLt => "<",
            RangeOp::Le | RangeOp::RLe => "<=",
            RangeOp::Eq => "=",
            RangeOp::Ge | RangeOp::RGe => ">=",
            RangeOp::Gt | RangeOp::RGt => ">",
        }
    }

    fn is_revision(self) -> bool {
        matches!(self, RangeOp::RLt | RangeOp::RLe | RangeOp::RGe | RangeOp::RGt)
    }
}

/// A `<vulnerable>` or `<unaffected>` range, compiled into atoms that must
/// all match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    atoms: Vec<Atom>,
}

impl VersionRange {
    /// Build the range `op version` for package `name`, optionally limited
    /// to `slot`. A trailing `*` on the version is a glob and only valid
    /// with `eq`.
    pub fn new(name: &str, op: &str, version: &str, slot: Option<&str>) -> Result<VersionRange> {
        let op = RangeOp::parse(op)?;
        let slot = slot.map(|s| format!(":{s}")).unwrap_or_default();
        let atom = |prefix: &str| -> Result<Atom> {
            format!("{prefix}{name}-{version}{slot}").parse()
        };

        if let Some(base) = version.strip_suffix('*') {
            if op != RangeOp::Eq {
                return Err(Error::InvalidGlsa(format!("glob cannot be used with {op:?} ranges")));
            }
            base.parse::<Version>()?;
            let glob = format!("={name}-{base}*{slot}").parse()?;
            return Ok(VersionRange { atoms: vec![glob] });
        }

        let parsed: Version = version.parse()?;
        let atoms = match op {
            _ if !op.is_revision() => vec![atom(op.atom_prefix())?],
            RangeOp::RLt if !parsed.has_revision() => {
                return Err(Error::InvalidGlsa(format!(
                    "range rlt version {version} is a guaranteed empty set"
                )));
            }
            RangeOp::RLe if !parsed.has_revision() => vec![atom("=")?],
            RangeOp::RGe if !parsed.has_revision() => vec![atom("~")?],
            _ => vec![
                format!("~{name}-{version}").parse()?,
                atom(op.atom_prefix())?,
            ],
        };
        Ok(VersionRange { atoms })
    }

    pub fn matches(&self, pkg: &Package) -> bool {
        self.atoms.iter().all(|atom| atom.matches(pkg))
    }
}

/// One affected package of an advisory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlsaEntry {
    /// Advisory name, e.g. `glsa-202401-01`.
    pub id: String,
    /// `category/package`.
    pub key: String,
    /// Arches the advisory is limited to; `None` means any arch.
    pub arches: Option<BTreeSet<String>>,
    pub vulnerable: Vec<VersionRange>,
    pub unaffected: Vec<VersionRange>,
}

impl GlsaEntry {
    /// Whether `pkg` is vulnerable: some vulnerable range matches, no
    /// unaffected range does, and the package carries one of the listed
    /// arches as a keyword.
    pub fn matches(&self, pkg: &Package) -> bool {
        if pkg.key() != self.key {
            return false;
        }
        if let Some(arches) = &self.arches {
            let keywords: BTreeSet<String> =
                pkg.metadata.keywords.iter().map(|k| k.to_string()).collect();
            if arches.is_disjoint(&keywords) {
                return false;
            }
        }
        self.vulnerable.iter().any(|r| r.matches(pkg))
            && !self.unaffected.iter().any(|r| r.matches(pkg))
    }
}

/// Parse one advisory document. Packages with invalid ranges are logged
/// and skipped; an unparsable document is an error.
pub fn parse_document(id: &str, xml: &str) -> Result<Vec<GlsaEntry>> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| Error::InvalidGlsa(format!("{id}: {e}")))?;
    let root = doc.root_element();
    if !root.has_tag_name("glsa") {
        return Err(Error::InvalidGlsa(format!("{id}: not a GLSA document")));
    }

    let mut entries = Vec::new();
    let packages = root
        .children()
        .filter(|n| n.has_tag_name("affected"))
        .flat_map(|affected| affected.children())
        .filter(|n| n.has_tag_name("package"));
    for node in packages {
        let Some(name) = node.attribute("name") else {
            warn!(glsa = id, "package without name");
            continue;
        };
        match parse_package(id, name, node) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => debug!(glsa = id, package = name, "no vulnerable ranges"),
            Err(e) => warn!(glsa = id, package = name, error = %e, "skipping package"),
        }
    }
    Ok(entries)
}

fn parse_package(
    id: &str,
    name: &str,
    node: roxmltree::Node<'_, '_>,
) -> Result<Option<GlsaEntry>> {
    let arches = node
        .attribute("arch")
        .map(|a| a.split_whitespace().map(String::from).collect::<BTreeSet<_>>())
        .filter(|a| !a.is_empty() && !a.contains("*"));

    let ranges = |tag: &str| -> Result<Vec<VersionRange>> {
        node.children()
            .filter(|n| n.has_tag_name(tag))
            .map(|n| {
                let op = n
                    .attribute("range")
                    .ok_or_else(|| Error::InvalidGlsa(format!("{tag} without range")))?;
                let version = n.text().unwrap_or_default().trim();
                let slot = n.attribute("slot").map(str::trim).filter(|s| !s.is_empty());
                VersionRange::new(name, op.trim(), version, slot)
            })
            .collect()
    };

    let vulnerable = ranges("vulnerable")?;
    if vulnerable.is_empty() {
        return Ok(None);
    }
    Ok(Some(GlsaEntry {
        id: id.to_string(),
        key: name.to_string(),
        arches,
        vulnerable,
        unaffected: ranges("unaffected")?,
    }))
}

/// Load every `glsa-*.xml` file in `dir`, in file name order.
///
/// Unparsable documents are logged and skipped.
pub fn load_dir(dir: &Path) -> Result<Vec<GlsaEntry>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with("glsa-") && name.ends_with(".xml") && path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut entries = Vec::new();
    for path in files {
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let xml = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        match parse_document(&id, &xml) {
            Ok(parsed) => entries.extend(parsed),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping GLSA"),
        }
    }
    debug!(dir = %dir.display(), entries = entries.len(), "loaded GLSAs");
    Ok(entries)
}
