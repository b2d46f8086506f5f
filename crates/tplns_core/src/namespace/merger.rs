//! Per-theme namespace merging.
//!
//! # Responsibility
//! - Build the module tier shared by every theme.
//! - Layer base themes and the theme itself on top, for every installed theme.
//!
//! # Invariants
//! - Search priority within one theme's namespace:
//!   1. the theme itself
//!   2. its base themes, nearest first
//!   3. modules: non-default contributions (later-listed module first), then
//!      each module's own default namespace.
//! - Protection violations are dropped and reported; merging always completes.

use crate::extension::discovery::ExtensionDiscovery;
use crate::extension::manifest::ExtensionKind;
use crate::extension::normalize::{normalize_extension_list, NormalizedExtension};
use crate::namespace::hooks::AlterHooks;
use crate::namespace::protection::{
    find_protected_namespaces, NamespaceOwner, ProtectedNamespaces,
};
use crate::namespace::{prepend_paths, NamespaceMap, ThemeNamespaces};
use indexmap::IndexMap;
use log::{debug, warn};
use std::fmt::{Display, Formatter};
use std::path::Path;

/// A contribution dropped because it targeted another extension's namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionViolation {
    pub extension_name: String,
    pub extension_kind: ExtensionKind,
    pub namespace: String,
    pub owner_name: String,
    pub owner_kind: ExtensionKind,
}

impl ProtectionViolation {
    fn new(extension: &NormalizedExtension, namespace: &str, owner: &NamespaceOwner) -> Self {
        Self {
            extension_name: extension.info.name.clone(),
            extension_kind: extension.info.kind,
            namespace: namespace.to_string(),
            owner_name: owner.name.clone(),
            owner_kind: owner.kind,
        }
    }

    fn log(&self) {
        warn!(
            "event=namespace_protected module=merger status=dropped extension=\"{}\" extension_kind={} namespace={} owner=\"{}\" owner_kind={}",
            self.extension_name,
            self.extension_kind,
            self.namespace,
            self.owner_name,
            self.owner_kind
        );
    }
}

impl Display for ProtectionViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "The {} {} attempted to alter the protected template namespace, {}, owned by the {} {}.",
            self.extension_name,
            self.extension_kind,
            self.namespace,
            self.owner_name,
            self.owner_kind
        )
    }
}

/// Result of one full merge pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub namespaces: ThemeNamespaces,
    /// Dropped contributions in the order they were encountered.
    pub violations: Vec<ProtectionViolation>,
}

/// Normalizes installed extensions, resolves protection and merges namespaces.
pub fn find_namespaces(
    discovery: &dyn ExtensionDiscovery,
    root: &Path,
    hooks: &AlterHooks,
) -> MergeOutcome {
    let modules = normalize_extension_list(discovery, ExtensionKind::Module, root);
    let themes = normalize_extension_list(discovery, ExtensionKind::Theme, root);
    let protected = find_protected_namespaces(modules.iter().chain(themes.iter()), hooks);
    debug!(
        "event=namespaces_merge module=merger status=start modules={} themes={} protected={}",
        modules.len(),
        themes.len(),
        protected.len()
    );
    merge_namespaces(&modules, &themes, &protected)
}

/// Merges normalized modules and themes into one namespace map per theme.
pub fn merge_namespaces(
    modules: &[NormalizedExtension],
    themes: &[NormalizedExtension],
    protected: &ProtectedNamespaces,
) -> MergeOutcome {
    let mut violations = Vec::new();
    let module_namespaces = module_tier(modules, protected, &mut violations);

    let theme_declarations: IndexMap<&str, NamespaceMap> = themes
        .iter()
        .map(|theme| {
            (
                theme.id.as_str(),
                permitted_namespaces(theme, protected, &mut violations),
            )
        })
        .collect();

    let mut namespaces = ThemeNamespaces::new();
    for theme in themes {
        let mut merged = module_namespaces.clone();
        let layers = theme
            .info
            .base_themes
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(theme.id.as_str()));
        for layer in layers {
            let Some(declared) = theme_declarations.get(layer) else {
                debug!(
                    "event=base_theme_missing module=merger status=skip theme={} base_theme={}",
                    theme.id, layer
                );
                continue;
            };
            for (namespace, paths) in declared {
                prepend_paths(&mut merged, namespace, paths);
            }
        }
        namespaces.insert(theme.id.clone(), merged);
    }

    for violation in &violations {
        violation.log();
    }

    MergeOutcome {
        namespaces,
        violations,
    }
}

fn module_tier(
    modules: &[NormalizedExtension],
    protected: &ProtectedNamespaces,
    violations: &mut Vec<ProtectionViolation>,
) -> NamespaceMap {
    let mut tier = NamespaceMap::new();

    // Default namespaces go in first so every other contribution outranks them.
    for module in modules {
        if let Some(paths) = module.namespaces.get(module.id.as_str()) {
            tier.insert(module.id.clone(), paths.clone());
        }
    }

    for module in modules {
        for (namespace, paths) in &module.namespaces {
            if namespace == &module.id {
                continue;
            }
            if let Some(owner) = protected.get(namespace) {
                violations.push(ProtectionViolation::new(module, namespace, owner));
                continue;
            }
            prepend_paths(&mut tier, namespace, paths);
        }
    }

    tier
}

fn permitted_namespaces(
    extension: &NormalizedExtension,
    protected: &ProtectedNamespaces,
    violations: &mut Vec<ProtectionViolation>,
) -> NamespaceMap {
    extension
        .namespaces
        .iter()
        .filter(|(namespace, _)| match protected.get(namespace.as_str()) {
            Some(owner) if namespace.as_str() != extension.id => {
                violations.push(ProtectionViolation::new(extension, namespace, owner));
                false
            }
            _ => true,
        })
        .map(|(namespace, paths)| (namespace.clone(), paths.clone()))
        .collect()
}
