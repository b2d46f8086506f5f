//! Namespace protection and precedence merging.
//!
//! # Responsibility
//! - Decide which default namespaces other extensions may not extend.
//! - Merge module and theme contributions into one search order per theme.
//!
//! # Invariants
//! - Path order inside a namespace is precedence order, never alphabetic.
//! - Duplicate directories are kept; earlier entries are searched first.
//! - Protection only ever drops contributions, it never reorders them.

use indexmap::IndexMap;
use std::path::PathBuf;

pub mod hooks;
pub mod merger;
pub mod protection;

/// Namespace name to directories, highest search priority first.
pub type NamespaceMap = IndexMap<String, Vec<PathBuf>>;

/// Installed theme id to the namespaces visible while that theme is active.
pub type ThemeNamespaces = IndexMap<String, NamespaceMap>;

/// Puts `paths` ahead of anything already collected for `namespace`.
pub(crate) fn prepend_paths(map: &mut NamespaceMap, namespace: &str, paths: &[PathBuf]) {
    match map.get_mut(namespace) {
        Some(existing) => {
            existing.splice(0..0, paths.iter().cloned());
        }
        None => {
            map.insert(namespace.to_string(), paths.to_vec());
        }
    }
}
