//! Extension discovery contracts and an in-process declaration registry.
//!
//! # Responsibility
//! - Define the collaborator boundary that supplies installed extensions,
//!   their install paths and theme inheritance chains.
//! - Provide a registry-backed implementation for embedding hosts and tests.
//!
//! # Invariants
//! - Extensions are listed in registration order, never sorted.
//! - Base theme chains are root first; unresolvable ancestors carry `None`.

use crate::extension::manifest::{ExtensionKind, ExtensionManifest, ManifestError};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// One ancestor in a theme chain: `(theme id, display name or None)`.
pub type BaseThemeEntry = (String, Option<String>);

/// Collaborator contract that supplies the installed extension set.
pub trait ExtensionDiscovery {
    /// Installed extensions of the given kind in declared order.
    ///
    /// `ExtensionKind::Module` listings include installation profiles.
    fn list_installed(&self, kind: ExtensionKind) -> Vec<ExtensionManifest>;

    /// Install path of one extension, absolute or relative to the root.
    fn install_path(&self, extension_id: &str) -> Option<PathBuf>;

    /// Transitive base themes of `theme_id`, root first.
    fn base_theme_chain(&self, themes: &[ExtensionManifest], theme_id: &str)
        -> Vec<BaseThemeEntry>;
}

/// Walks `base theme` links of declarations to build a root-first chain.
///
/// A missing ancestor, or a link that loops back, terminates the chain with a
/// `None` name for the offending entry.
pub fn resolve_base_theme_chain(
    themes: &[ExtensionManifest],
    theme_id: &str,
) -> Vec<BaseThemeEntry> {
    let by_id: IndexMap<&str, &ExtensionManifest> =
        themes.iter().map(|theme| (theme.id.as_str(), theme)).collect();

    let mut chain = Vec::new();
    let mut visited = HashSet::from([theme_id]);
    let mut next = by_id
        .get(theme_id)
        .and_then(|theme| theme.base_theme.as_deref());

    while let Some(parent_id) = next {
        if !visited.insert(parent_id) {
            chain.push((parent_id.to_string(), None));
            break;
        }
        match by_id.get(parent_id) {
            Some(parent) => {
                chain.push((parent_id.to_string(), Some(parent.name.clone())));
                next = parent.base_theme.as_deref();
            }
            None => {
                chain.push((parent_id.to_string(), None));
                break;
            }
        }
    }

    chain.reverse();
    chain
}

#[derive(Debug, Clone, PartialEq)]
struct RegisteredExtension {
    manifest: ExtensionManifest,
    path: PathBuf,
}

/// In-process discovery backed by explicitly registered declarations.
#[derive(Debug, Default, Clone)]
pub struct StaticExtensionDiscovery {
    entries: IndexMap<String, RegisteredExtension>,
}

impl StaticExtensionDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one declaration after identity validation.
    pub fn register(
        &mut self,
        manifest: ExtensionManifest,
        path: impl AsRef<Path>,
    ) -> Result<(), DiscoveryError> {
        manifest.validate().map_err(DiscoveryError::InvalidManifest)?;
        if self.entries.contains_key(manifest.id.as_str()) {
            return Err(DiscoveryError::DuplicateExtensionId(manifest.id));
        }
        self.entries.insert(
            manifest.id.clone(),
            RegisteredExtension {
                manifest,
                path: path.as_ref().to_path_buf(),
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, extension_id: &str) -> Option<&ExtensionManifest> {
        self.entries.get(extension_id).map(|entry| &entry.manifest)
    }
}

impl ExtensionDiscovery for StaticExtensionDiscovery {
    fn list_installed(&self, kind: ExtensionKind) -> Vec<ExtensionManifest> {
        self.entries
            .values()
            .filter(|entry| match kind {
                ExtensionKind::Theme => entry.manifest.kind.is_theme(),
                ExtensionKind::Module | ExtensionKind::Profile => !entry.manifest.kind.is_theme(),
            })
            .map(|entry| entry.manifest.clone())
            .collect()
    }

    fn install_path(&self, extension_id: &str) -> Option<PathBuf> {
        self.entries.get(extension_id).map(|entry| entry.path.clone())
    }

    fn base_theme_chain(
        &self,
        themes: &[ExtensionManifest],
        theme_id: &str,
    ) -> Vec<BaseThemeEntry> {
        resolve_base_theme_chain(themes, theme_id)
    }
}

/// Declaration registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    InvalidManifest(ManifestError),
    DuplicateExtensionId(String),
}

impl Display for DiscoveryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidManifest(err) => write!(f, "invalid extension declaration: {err}"),
            Self::DuplicateExtensionId(value) => {
                write!(f, "extension id already registered: {value}")
            }
        }
    }
}

impl Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidManifest(err) => Some(err),
            Self::DuplicateExtensionId(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        resolve_base_theme_chain, DiscoveryError, ExtensionDiscovery, StaticExtensionDiscovery,
    };
    use crate::extension::manifest::{ExtensionKind, ExtensionManifest};
    use std::path::PathBuf;

    fn theme(id: &str, name: &str, base: Option<&str>) -> ExtensionManifest {
        let manifest = ExtensionManifest::new(id, name, ExtensionKind::Theme);
        match base {
            Some(base) => manifest.with_base_theme(base),
            None => manifest,
        }
    }

    #[test]
    fn lists_by_kind_in_registration_order() {
        let mut discovery = StaticExtensionDiscovery::new();
        discovery
            .register(
                ExtensionManifest::new("zeta", "Zeta", ExtensionKind::Module),
                "modules/zeta",
            )
            .expect("zeta registration");
        discovery
            .register(theme("olivero", "Olivero", None), "themes/olivero")
            .expect("olivero registration");
        discovery
            .register(
                ExtensionManifest::new("standard", "Standard", ExtensionKind::Profile),
                "profiles/standard",
            )
            .expect("profile registration");
        discovery
            .register(
                ExtensionManifest::new("alpha", "Alpha", ExtensionKind::Module),
                "modules/alpha",
            )
            .expect("alpha registration");

        let modules: Vec<_> = discovery
            .list_installed(ExtensionKind::Module)
            .into_iter()
            .map(|manifest| manifest.id)
            .collect();
        assert_eq!(modules, ["zeta", "standard", "alpha"]);

        let themes = discovery.list_installed(ExtensionKind::Theme);
        assert_eq!(themes.len(), 1);
        assert_eq!(
            discovery.install_path("olivero"),
            Some(PathBuf::from("themes/olivero"))
        );
        assert_eq!(discovery.install_path("missing"), None);
    }

    #[test]
    fn rejects_duplicate_and_invalid_declarations() {
        let mut discovery = StaticExtensionDiscovery::new();
        discovery
            .register(theme("zen", "Zen", None), "themes/zen")
            .expect("first registration");
        let err = discovery
            .register(theme("zen", "Zen again", None), "themes/zen2")
            .expect_err("duplicate must fail");
        assert_eq!(err, DiscoveryError::DuplicateExtensionId("zen".to_string()));

        let err = discovery
            .register(theme("", "Nameless", None), "themes/x")
            .expect_err("invalid manifest must fail");
        assert!(matches!(err, DiscoveryError::InvalidManifest(_)));
        assert_eq!(discovery.len(), 1);
    }

    #[test]
    fn chain_is_root_first() {
        let themes = vec![
            theme("active", "Active", Some("base")),
            theme("base", "Base", Some("basest")),
            theme("basest", "Basest", None),
        ];
        let chain = resolve_base_theme_chain(&themes, "active");
        assert_eq!(
            chain,
            vec![
                ("basest".to_string(), Some("Basest".to_string())),
                ("base".to_string(), Some("Base".to_string())),
            ]
        );
        assert!(resolve_base_theme_chain(&themes, "basest").is_empty());
    }

    #[test]
    fn missing_ancestor_is_reported_with_none() {
        let themes = vec![
            theme("active", "Active", Some("base")),
            theme("base", "Base", Some("gone")),
        ];
        let chain = resolve_base_theme_chain(&themes, "active");
        assert_eq!(
            chain,
            vec![
                ("gone".to_string(), None),
                ("base".to_string(), Some("Base".to_string())),
            ]
        );
    }

    #[test]
    fn cyclic_chain_terminates() {
        let themes = vec![
            theme("a", "A", Some("b")),
            theme("b", "B", Some("a")),
        ];
        let chain = resolve_base_theme_chain(&themes, "a");
        assert_eq!(
            chain,
            vec![("a".to_string(), None), ("b".to_string(), Some("B".to_string()))]
        );
    }
}
