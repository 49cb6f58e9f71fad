use std::collections::{BTreeSet, HashMap};

use tracing::info;

use super::{Check, CheckContext};
use crate::error::Result;
use crate::glsa::{load_dir, GlsaEntry};
use crate::package::Package;
use crate::report::{Report, ReportKind};

/// Flags package versions affected by security advisories.
///
/// Only meaningful for the gentoo repository, and needs a GLSA directory:
/// either configured explicitly or `metadata/glsa` of the target or one of
/// its masters.
#[derive(Debug)]
pub struct GlsaCheck {
    vulns: HashMap<String, Vec<GlsaEntry>>,
}

impl GlsaCheck {
    /// Load the advisories, or `None` when the check does not apply.
    pub fn new(ctx: &CheckContext) -> Result<Option<Self>> {
        if !ctx.gentoo_repo {
            info!("skipping GlsaCheck: not the gentoo repo");
            return Ok(None);
        }
        let dir = match &ctx.glsa_dir {
            Some(dir) => dir.clone(),
            None => {
                let found = ctx
                    .repos
                    .repos()
                    .iter()
                    .map(|repo| repo.location().join("metadata/glsa"))
                    .find(|path| path.is_dir());
                match found {
                    Some(dir) => dir,
                    None => {
                        info!("skipping GlsaCheck: no available glsa source");
                        return Ok(None);
                    }
                }
            }
        };

        let mut vulns: HashMap<String, Vec<GlsaEntry>> = HashMap::new();
        for entry in load_dir(&dir)? {
            vulns.entry(entry.key.clone()).or_default().push(entry);
        }
        Ok(Some(GlsaCheck { vulns }))
    }
}

impl Check for GlsaCheck {
    fn name(&self) -> &'static str {
        "GlsaCheck"
    }

    fn known_results(&self) -> &'static [ReportKind] {
        &[ReportKind::VulnerablePackage]
    }

    fn feed_package(&mut self, _ctx: &CheckContext, pkg: &Package) -> Vec<Report> {
        let Some(entries) = self.vulns.get(&pkg.key()) else {
            return Vec::new();
        };
        let keys: BTreeSet<&str> = pkg.metadata.enabled_arches().collect();
        let mut seen = BTreeSet::new();
        let mut reports = Vec::new();
        for entry in entries {
            if !entry.matches(pkg) || !seen.insert(entry.id.as_str()) {
                continue;
            }
            let arches: Vec<String> = match &entry.arches {
                Some(listed) => listed
                    .iter()
                    .map(|a| a.trim_start_matches('~'))
                    .filter(|a| keys.contains(a))
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .map(String::from)
                    .collect(),
                None => keys.iter().map(|a| a.to_string()).collect(),
            };
            reports.push(Report::VulnerablePackage {
                cpv: pkg.cpv.clone(),
                glsa: entry.id.clone(),
                arches,
            });
        }
        reports
    }
}
