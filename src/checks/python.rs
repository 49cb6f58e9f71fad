use std::collections::BTreeSet;

use super::{Check, CheckContext};
use crate::package::Package;
use crate::report::{Report, ReportKind};
use crate::required_use::RequiredUseExpr;

/// Python eclasses, in the order they are picked when several are
/// inherited.
const ECLASSES: &[&str] = &["python-r1", "python-single-r1", "python-any-r1"];

const INTERPRETERS: &[&str] = &[
    "dev-lang/python",
    "dev-python/pypy",
    "dev-python/pypy3",
    "dev-python/pypy-bin",
    "dev-python/pypy3-bin",
    "virtual/pypy",
    "virtual/pypy3",
];

/// Slot-matching virtuals that depend on interpreters on purpose.
const EXEMPT: &[&str] = &["virtual/pypy", "virtual/pypy3"];

const TARGET_PREFIX: &str = "python_targets_";
const SINGLE_TARGET_PREFIX: &str = "python_single_target_";

/// Which `REQUIRED_USE` group the eclass generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    AnyOf,
    ExactlyOne,
}

/// Checks python eclass usage against dependencies, IUSE and
/// `REQUIRED_USE`.
#[derive(Debug, Default)]
pub struct PythonCheck;

impl PythonCheck {
    pub fn new() -> Self {
        PythonCheck
    }

    fn missing_eclass(pkg: &Package) -> Option<Report> {
        if EXEMPT.contains(&pkg.key().as_str()) {
            return None;
        }
        // the last dependency class with an interpreter decides
        let (attr, atom) = pkg
            .metadata
            .dependencies()
            .into_iter()
            .filter_map(|(attr, deps)| {
                deps.atoms()
                    .find(|a| !a.is_blocker() && INTERPRETERS.contains(&a.key().as_str()))
                    .map(|a| (attr, a))
            })
            .last()?;
        let eclass = match attr {
            "RDEPEND" | "PDEPEND" => "python-r1 or python-single-r1",
            _ => "python-any-r1",
        };
        Some(Report::MissingPythonEclass {
            cpv: pkg.cpv.clone(),
            eclass,
            attr,
            atom: atom.to_string(),
        })
    }

    /// Whether a top-level `REQUIRED_USE` entry constrains exactly `flags`
    /// (prefixed with `prefix`) with the expected group. A single flag may
    /// also appear bare.
    fn has_required_use(
        required_use: Option<&RequiredUseExpr>,
        flags: &BTreeSet<&str>,
        prefix: &str,
        group: Option<Group>,
    ) -> bool {
        let expected: BTreeSet<String> = flags.iter().map(|f| format!("{prefix}{f}")).collect();
        let Some(required_use) = required_use else {
            return false;
        };
        required_use.top_level().iter().any(|entry| {
            let members = match (entry, group) {
                (RequiredUseExpr::AnyOf(members), Some(Group::AnyOf) | None)
                | (RequiredUseExpr::ExactlyOne(members), Some(Group::ExactlyOne) | None) => {
                    members
                }
                (flag, _) => {
                    return expected.len() == 1
                        && flag.plain_flag().is_some_and(|f| expected.contains(f));
                }
            };
            let names: Option<BTreeSet<String>> = members
                .iter()
                .map(|m| m.plain_flag().map(String::from))
                .collect();
            names.is_some_and(|names| names == expected)
        })
    }
}

/// IUSE flags starting with `prefix`, with the prefix removed.
fn targets<'a>(pkg: &'a Package, prefix: &str) -> BTreeSet<&'a str> {
    pkg.metadata
        .iuse_stripped()
        .filter_map(|flag| flag.strip_prefix(prefix))
        .collect()
}

impl Check for PythonCheck {
    fn name(&self) -> &'static str {
        "PythonCheck"
    }

    fn known_results(&self) -> &'static [ReportKind] {
        &[
            ReportKind::MissingPythonEclass,
            ReportKind::PythonSingleUseMismatch,
            ReportKind::PythonMissingRequiredUse,
        ]
    }

    fn feed_package(&mut self, _ctx: &CheckContext, pkg: &Package) -> Vec<Report> {
        let eclass = ECLASSES.iter().find(|e| pkg.metadata.inherits(e));
        let Some(&eclass) = eclass else {
            return Self::missing_eclass(pkg).into_iter().collect();
        };
        if eclass == "python-any-r1" {
            return Vec::new();
        }

        let flags = targets(pkg, TARGET_PREFIX);
        if flags.is_empty() {
            return Vec::new();
        }
        let required_use = pkg.metadata.required_use.as_ref();
        let mut reports = Vec::new();
        let satisfied = if eclass == "python-r1" {
            Self::has_required_use(required_use, &flags, TARGET_PREFIX, Some(Group::AnyOf))
        } else {
            let single_flags = targets(pkg, SINGLE_TARGET_PREFIX);
            if flags.len() == 1 && single_flags.is_empty() {
                Self::has_required_use(required_use, &flags, TARGET_PREFIX, None)
            } else {
                if single_flags != flags {
                    reports.push(Report::PythonSingleUseMismatch {
                        cpv: pkg.cpv.clone(),
                        flags: flags.iter().map(|f| f.to_string()).collect(),
                        single_flags: single_flags.iter().map(|f| f.to_string()).collect(),
                    });
                }
                Self::has_required_use(
                    required_use,
                    &single_flags,
                    SINGLE_TARGET_PREFIX,
                    Some(Group::ExactlyOne),
                )
            }
        };
        if !satisfied {
            reports.push(Report::PythonMissingRequiredUse {
                cpv: pkg.cpv.clone(),
            });
        }
        reports
    }
}
