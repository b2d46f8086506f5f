//! Protected default namespaces.

use crate::extension::manifest::ExtensionKind;
use crate::extension::normalize::NormalizedExtension;
use crate::namespace::hooks::AlterHooks;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Owner of a protected namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceOwner {
    pub name: String,
    pub kind: ExtensionKind,
    pub package: String,
}

/// Namespace name to its owner, for namespaces others may not extend.
pub type ProtectedNamespaces = IndexMap<String, NamespaceOwner>;

/// Computes the protected set before alteration hooks run.
///
/// An extension's default namespace is protected unless the extension opted
/// in to reuse or populated that namespace itself. When two extensions share
/// an id, only the first one listed is considered.
pub fn base_protected_namespaces<'a, I>(extensions: I) -> ProtectedNamespaces
where
    I: IntoIterator<Item = &'a NormalizedExtension>,
{
    let mut seen = HashSet::new();
    extensions
        .into_iter()
        .filter(|extension| seen.insert(extension.id.clone()))
        .filter(|extension| {
            !extension.allow_default_namespace_reuse && !extension.populates_default_namespace()
        })
        .map(|extension| {
            (
                extension.id.clone(),
                NamespaceOwner {
                    name: extension.info.name.clone(),
                    kind: extension.info.kind,
                    package: extension.info.package.clone(),
                },
            )
        })
        .collect()
}

/// Computes the protected set and lets registered handlers alter it.
pub fn find_protected_namespaces<'a, I>(extensions: I, hooks: &AlterHooks) -> ProtectedNamespaces
where
    I: IntoIterator<Item = &'a NormalizedExtension>,
{
    let mut protected = base_protected_namespaces(extensions);
    hooks.alter_protected_namespaces(&mut protected);
    protected
}
