//! Normalization of raw declarations into uniform resolution records.
//!
//! # Responsibility
//! - Resolve namespace path fragments to absolute directories.
//! - Resolve theme inheritance chains, dropping broken ancestors.
//!
//! # Invariants
//! - Pure: normalization never mutates the supplied declarations.
//! - A fragment starting with `/` is resolved against the installation root;
//!   every other fragment is resolved against the declaring extension.

use crate::extension::discovery::ExtensionDiscovery;
use crate::extension::manifest::{ExtensionKind, ExtensionManifest, PathFragments};
use crate::namespace::NamespaceMap;
use log::debug;
use std::path::{Path, PathBuf};

/// Display metadata carried alongside normalized namespace data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionInfo {
    pub name: String,
    pub kind: ExtensionKind,
    pub package: String,
    /// Resolvable base themes, root first. Always empty for modules.
    pub base_themes: Vec<String>,
}

/// One extension after path and inheritance resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedExtension {
    pub id: String,
    pub info: ExtensionInfo,
    pub namespaces: NamespaceMap,
    pub allow_default_namespace_reuse: bool,
}

impl NormalizedExtension {
    /// True when the extension put at least one directory in its own namespace.
    pub fn populates_default_namespace(&self) -> bool {
        self.namespaces
            .get(self.id.as_str())
            .is_some_and(|paths| !paths.is_empty())
    }
}

/// Resolves declared path fragments to directories.
///
/// Root-relative fragments (leading `/`) are joined onto `root`; all others
/// are joined onto `extension_path`. Every leading `/` is stripped, so a
/// root-relative fragment never escapes `root`.
pub fn normalize_path_fragments(
    fragments: &PathFragments,
    root: &Path,
    extension_path: &Path,
) -> Vec<PathBuf> {
    fragments
        .as_slice()
        .iter()
        .map(|fragment| {
            if fragment.starts_with('/') {
                root.join(fragment.trim_start_matches('/'))
            } else {
                extension_path.join(fragment)
            }
        })
        .collect()
}

/// Normalizes every installed extension of `kind`, in discovery order.
pub fn normalize_extension_list(
    discovery: &dyn ExtensionDiscovery,
    kind: ExtensionKind,
    root: &Path,
) -> Vec<NormalizedExtension> {
    let installed = discovery.list_installed(kind);
    let themes: &[ExtensionManifest] = if kind.is_theme() { &installed } else { &[] };

    installed
        .iter()
        .map(|manifest| {
            let base_themes = if kind.is_theme() {
                resolvable_base_themes(discovery, themes, &manifest.id)
            } else {
                Vec::new()
            };
            normalize_extension(discovery, manifest, base_themes, root)
        })
        .collect()
}

fn resolvable_base_themes(
    discovery: &dyn ExtensionDiscovery,
    themes: &[ExtensionManifest],
    theme_id: &str,
) -> Vec<String> {
    discovery
        .base_theme_chain(themes, theme_id)
        .into_iter()
        .filter_map(|(base_id, name)| match name {
            Some(_) => Some(base_id),
            None => {
                debug!(
                    "event=base_theme_dropped module=normalize status=skip theme={} base_theme={}",
                    theme_id, base_id
                );
                None
            }
        })
        .collect()
}

fn normalize_extension(
    discovery: &dyn ExtensionDiscovery,
    manifest: &ExtensionManifest,
    base_themes: Vec<String>,
    root: &Path,
) -> NormalizedExtension {
    let mut namespaces = NamespaceMap::new();
    let mut declared = manifest.declared_namespaces().peekable();
    if declared.peek().is_some() {
        let extension_path = discovery
            .install_path(&manifest.id)
            .map_or_else(|| root.to_path_buf(), |path| root.join(path));
        for (namespace, fragments) in declared {
            namespaces.insert(
                namespace.clone(),
                normalize_path_fragments(fragments, root, &extension_path),
            );
        }
    }

    NormalizedExtension {
        id: manifest.id.clone(),
        info: ExtensionInfo {
            name: manifest.name.clone(),
            kind: manifest.kind,
            package: manifest.package_label().to_string(),
            base_themes,
        },
        namespaces,
        allow_default_namespace_reuse: manifest.allows_default_namespace_reuse(),
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_extension_list, normalize_path_fragments};
    use crate::extension::discovery::StaticExtensionDiscovery;
    use crate::extension::manifest::{ExtensionKind, ExtensionManifest, PathFragments};
    use std::path::{Path, PathBuf};

    const ROOT: &str = "/drupal";

    #[test]
    fn bare_fragment_is_a_one_element_list() {
        let paths = normalize_path_fragments(
            &PathFragments::from("myNamespacePath"),
            Path::new(ROOT),
            Path::new("/drupal/themes"),
        );
        assert_eq!(paths, [PathBuf::from("/drupal/themes/myNamespacePath")]);
    }

    #[test]
    fn leading_slash_resolves_against_root() {
        let paths = normalize_path_fragments(
            &PathFragments::from(vec!["templates", "/libraries/chapman/components"]),
            Path::new(ROOT),
            Path::new("/drupal/themes/chapman"),
        );
        assert_eq!(
            paths,
            [
                PathBuf::from("/drupal/themes/chapman/templates"),
                PathBuf::from("/drupal/libraries/chapman/components"),
            ]
        );
    }

    #[test]
    fn repeated_leading_slashes_stay_under_root() {
        let paths = normalize_path_fragments(
            &PathFragments::from("//libraries/x"),
            Path::new(ROOT),
            Path::new("/drupal/themes/chapman"),
        );
        assert_eq!(paths, [PathBuf::from("/drupal/libraries/x")]);
    }

    #[test]
    fn saves_extension_info_with_and_without_package() {
        let mut discovery = StaticExtensionDiscovery::new();
        discovery
            .register(
                ExtensionManifest::new("system", "System", ExtensionKind::Module)
                    .with_package("Core"),
                "core/modules/system",
            )
            .expect("system registration");
        discovery
            .register(
                ExtensionManifest::new("views", "Views", ExtensionKind::Module),
                "core/modules/views",
            )
            .expect("views registration");

        let normalized =
            normalize_extension_list(&discovery, ExtensionKind::Module, Path::new(ROOT));
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].info.package, "Core");
        assert_eq!(normalized[1].info.package, "");
        assert!(normalized[0].namespaces.is_empty());
        assert!(normalized[0].info.base_themes.is_empty());
        assert!(!normalized[0].allow_default_namespace_reuse);
    }

    #[test]
    fn relative_install_paths_are_joined_onto_root() {
        let mut discovery = StaticExtensionDiscovery::new();
        discovery
            .register(
                ExtensionManifest::new(
                    "phillis_wheatley",
                    "Phillis Wheatley",
                    ExtensionKind::Module,
                )
                .with_namespace("wheatley", vec!["components"])
                .with_namespace("wheatley_too", "templates"),
                "modules/phillis_wheatley",
            )
            .expect("registration");

        let normalized =
            normalize_extension_list(&discovery, ExtensionKind::Module, Path::new(ROOT));
        let namespaces = &normalized[0].namespaces;
        assert_eq!(
            namespaces["wheatley"],
            [PathBuf::from("/drupal/modules/phillis_wheatley/components")]
        );
        assert_eq!(
            namespaces["wheatley_too"],
            [PathBuf::from("/drupal/modules/phillis_wheatley/templates")]
        );
    }

    #[test]
    fn themes_keep_only_resolvable_base_themes() {
        let mut discovery = StaticExtensionDiscovery::new();
        discovery
            .register(
                ExtensionManifest::new("activeTheme", "Active Theme!", ExtensionKind::Theme)
                    .with_base_theme("baseTheme")
                    .with_namespace("activeTheme", "active"),
                "/drupal/themes/activeTheme",
            )
            .expect("active registration");
        discovery
            .register(
                ExtensionManifest::new("baseTheme", "Base Theme", ExtensionKind::Theme)
                    .with_base_theme("basestTheme"),
                "/drupal/themes/baseTheme",
            )
            .expect("base registration");

        let normalized =
            normalize_extension_list(&discovery, ExtensionKind::Theme, Path::new(ROOT));
        assert_eq!(normalized[0].info.base_themes, ["baseTheme"]);
        assert!(normalized[1].info.base_themes.is_empty());
        assert_eq!(
            normalized[0].namespaces["activeTheme"],
            [PathBuf::from("/drupal/themes/activeTheme/active")]
        );
    }

    #[test]
    fn default_namespace_population_requires_paths() {
        let mut discovery = StaticExtensionDiscovery::new();
        discovery
            .register(
                ExtensionManifest::new("edna_lewis", "Edna Lewis", ExtensionKind::Module)
                    .with_namespace("edna_lewis", PathFragments::Many(Vec::new())),
                "modules/edna_lewis",
            )
            .expect("registration");
        discovery
            .register(
                ExtensionManifest::new("zora", "Zora", ExtensionKind::Module)
                    .with_namespace("zora", "templates")
                    .allowing_default_namespace_reuse(),
                "modules/zora",
            )
            .expect("registration");

        let normalized =
            normalize_extension_list(&discovery, ExtensionKind::Module, Path::new(ROOT));
        assert!(!normalized[0].populates_default_namespace());
        assert!(normalized[1].populates_default_namespace());
        assert!(normalized[1].allow_default_namespace_reuse);
    }
}
