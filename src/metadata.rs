use portage_atom::Slot;

use crate::depspec::DepSpec;
use crate::eapi::Eapi;
use crate::iuse::IUse;
use crate::keyword::Keyword;
use crate::required_use::RequiredUseExpr;

/// The part of an ebuild's metadata the repository checks look at.
///
/// See [PMS 7.2](https://projects.gentoo.org/pms/9/pms.html#mandatory-ebuilddefined-variables).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    /// EAPI version.
    pub eapi: Eapi,

    /// Package description (mandatory).
    pub description: String,

    /// Package slot (mandatory).
    pub slot: Slot,

    /// Architecture keywords.
    pub keywords: Vec<Keyword>,

    /// USE flags declared by the ebuild.
    pub iuse: Vec<IUse>,

    /// REQUIRED_USE expression.
    pub required_use: Option<RequiredUseExpr>,

    /// Build-time dependencies (`DEPEND`).
    pub depend: DepSpec,

    /// Runtime dependencies (`RDEPEND`).
    pub rdepend: DepSpec,

    /// Build-host dependencies (`BDEPEND`, EAPI 7+).
    pub bdepend: DepSpec,

    /// Post-merge dependencies (`PDEPEND`).
    pub pdepend: DepSpec,

    /// Install-time dependencies (`IDEPEND`, EAPI 8+).
    pub idepend: DepSpec,

    /// Inherited eclasses.
    pub inherited: Vec<String>,
}

impl PackageMetadata {
    /// Whether the ebuild inherits `eclass`, directly or indirectly.
    pub fn inherits(&self, eclass: &str) -> bool {
        self.inherited.iter().any(|e| e == eclass)
    }

    /// IUSE flag names without default prefixes.
    pub fn iuse_stripped(&self) -> impl Iterator<Item = &str> {
        IUse::stripped(&self.iuse)
    }

    /// Keywords that enable the package, with `~` stripped.
    pub fn enabled_arches(&self) -> impl Iterator<Item = &str> {
        self.keywords
            .iter()
            .filter(|kw| kw.is_enabled())
            .map(|kw| kw.arch.as_str())
    }

    /// Dependency classes valid for this EAPI, as `(variable name, spec)`.
    pub fn dependencies(&self) -> Vec<(&'static str, &DepSpec)> {
        let mut deps = vec![("DEPEND", &self.depend)];
        if self.eapi.has_bdepend() {
            deps.push(("BDEPEND", &self.bdepend));
        }
        if self.eapi.has_idepend() {
            deps.push(("IDEPEND", &self.idepend));
        }
        deps.push(("RDEPEND", &self.rdepend));
        deps.push(("PDEPEND", &self.pdepend));
        deps
    }
}
