//! Checks for Gentoo ebuild repositories, based on [PMS].
//!
//! This crate scans a repository's `profiles/` tree and its metadata cache
//! and reports problems as typed [`Report`] values.
//!
//! [PMS]: https://projects.gentoo.org/pms/latest/pms.html
//!
//! # Overview
//!
//! Ebuilds are bash scripts, but the **metadata cache**
//! (`metadata/md5-cache/`) stores their pre-computed metadata in a simple
//! `KEY=VALUE` format. Package level checks work from that cache, profile
//! checks read the plain text files under `profiles/`.
//!
//! The available checks are:
//!
//! - `ProfilesCheck`: unknown packages, USE flags and keywords referenced
//!   from profile files, plus their parse errors.
//! - `RepoProfilesCheck`: `profiles.desc`, categories, arches and unused
//!   profile directories.
//! - `GlsaCheck`: package versions affected by a security advisory.
//! - `PythonCheck`: python eclass usage against dependencies, IUSE and
//!   `REQUIRED_USE`.
//!
//! # Examples
//!
//! Parse a cache entry:
//!
//! ```
//! use portage_lint::CacheEntry;
//!
//! let input = "\
//! EAPI=8
//! DESCRIPTION=Example package
//! SLOT=0
//! KEYWORDS=~amd64
//! RDEPEND=dev-lang/python:3.12
//! ";
//! let entry = CacheEntry::parse(input).unwrap();
//! assert_eq!(entry.metadata.description, "Example package");
//! assert_eq!(entry.metadata.eapi.to_string(), "8");
//! ```
//!
//! Scan a repository:
//!
//! ```no_run
//! use portage_lint::{CheckKind, ScanOptions, Scanner};
//!
//! let options = ScanOptions::new("/var/db/repos/gentoo")
//!     .checks([CheckKind::Profiles, CheckKind::RepoProfiles]);
//! let mut scanner = Scanner::new(options)?;
//! for report in scanner.run()? {
//!     println!("{} {}: {}", report.severity(), report.name(), report);
//! }
//! # Ok::<(), portage_lint::Error>(())
//! ```

mod atom;
mod cache;
mod depspec;
mod eapi;
mod error;
mod files;
mod iuse;
mod keyword;
mod metadata;
mod package;
mod required_use;
mod syntax;
mod version;

pub mod checks;
pub mod glsa;
pub mod profile;
pub mod repo;
pub mod report;
pub mod scan;

#[cfg(test)]
mod testutil;

// Re-export public types
pub use atom::{Atom, Blocker, Operator, SlotDep};
pub use cache::CacheEntry;
pub use depspec::DepSpec;
pub use eapi::Eapi;
pub use error::{Error, Result};
pub use iuse::{IUse, IUseDefault};
pub use keyword::{Keyword, Stability};
pub use metadata::PackageMetadata;
pub use package::{Cpv, Package};
pub use repo::{RepoSet, Repository};
pub use report::{Report, ReportKind, Scope, Severity};
pub use required_use::RequiredUseExpr;
pub use scan::{CheckKind, ScanOptions, Scanner};
pub use version::{Suffix, SuffixKind, Version};
