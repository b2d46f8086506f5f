//! Filesystem template lookup over resolved namespaces.
//!
//! # Responsibility
//! - Map `@namespace/path/to/file` references to an existing file.
//! - Track the active theme and reload namespace paths when it changes.
//!
//! # Invariants
//! - The active theme and the registry generation are checked before every
//!   lookup; a change in either discards memoized hits and misses.
//! - Directories are searched in namespace order; the first existing file wins.

use crate::namespace::NamespaceMap;
use crate::registry::NamespaceRegistry;
use log::debug;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Component, Path, PathBuf};

/// Namespace searched for references without a leading `@namespace/`.
pub const MAIN_NAMESPACE: &str = "__main__";

pub type LoaderResult<T> = Result<T, LoaderError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    InvalidName { name: String, reason: &'static str },
    UnknownNamespace { name: String, namespace: String },
    NotFound { name: String, searched: Vec<PathBuf> },
}

impl Display for LoaderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName { name, reason } => {
                write!(f, "invalid template name \"{name}\": {reason}")
            }
            Self::UnknownNamespace { name, namespace } => write!(
                f,
                "there are no registered paths for namespace \"{namespace}\" (template \"{name}\")"
            ),
            Self::NotFound { name, searched } => {
                let searched: Vec<String> = searched
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect();
                write!(
                    f,
                    "unable to find template \"{name}\" (looked into: {})",
                    searched.join(", ")
                )
            }
        }
    }
}

impl Error for LoaderError {}

/// Template locator bound to the registry's active theme.
#[derive(Debug)]
pub struct TemplateLoader {
    registry: NamespaceRegistry,
    active_theme: Option<String>,
    generation: u64,
    paths: NamespaceMap,
    found: HashMap<String, PathBuf>,
    errors: HashMap<String, LoaderError>,
}

impl TemplateLoader {
    pub fn new(registry: NamespaceRegistry) -> Self {
        Self {
            registry,
            active_theme: None,
            generation: 0,
            paths: NamespaceMap::new(),
            found: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &NamespaceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut NamespaceRegistry {
        &mut self.registry
    }

    /// Theme the loaded paths belong to, if any lookup happened yet.
    pub fn active_theme(&self) -> Option<&str> {
        self.active_theme.as_deref()
    }

    /// Namespace paths currently in use, refreshed for the active theme.
    pub fn paths(&mut self) -> &NamespaceMap {
        self.refresh();
        &self.paths
    }

    /// Locates the file for a template reference.
    pub fn find_template(&mut self, name: &str) -> LoaderResult<PathBuf> {
        self.refresh();

        let normalized = normalize_name(name);
        if let Some(path) = self.found.get(&normalized) {
            return Ok(path.clone());
        }
        if let Some(err) = self.errors.get(&normalized) {
            return Err(err.clone());
        }

        let result = self.search(&normalized);
        match &result {
            Ok(path) => {
                self.found.insert(normalized, path.clone());
            }
            Err(err) => {
                self.errors.insert(normalized, err.clone());
            }
        }
        result
    }

    pub fn exists(&mut self, name: &str) -> bool {
        self.find_template(name).is_ok()
    }

    /// Clears both cache tiers; the next lookup reloads paths.
    pub fn invalidate(&mut self) {
        self.registry.invalidate();
    }

    fn refresh(&mut self) {
        let theme = self.registry.active_theme_id();
        let generation = self.registry.generation();
        if self.active_theme.as_deref() == Some(theme.as_str()) && self.generation == generation {
            return;
        }
        debug!(
            "event=loader_refresh module=loader status=ok previous={} theme={} generation={}",
            self.active_theme.as_deref().unwrap_or("-"),
            theme,
            generation
        );
        self.found.clear();
        self.errors.clear();
        self.paths = self.registry.namespaces_for_theme(&theme);
        self.active_theme = Some(theme);
        self.generation = self.registry.generation();
    }

    fn search(&self, name: &str) -> LoaderResult<PathBuf> {
        let (namespace, relative) = split_name(name)?;
        validate_relative(name, relative)?;

        let Some(directories) = self.paths.get(namespace) else {
            return Err(LoaderError::UnknownNamespace {
                name: name.to_string(),
                namespace: namespace.to_string(),
            });
        };

        directories
            .iter()
            .map(|directory| directory.join(relative))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| LoaderError::NotFound {
                name: name.to_string(),
                searched: directories.clone(),
            })
    }
}

fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    for c in name.chars().map(|c| if c == '\\' { '/' } else { c }) {
        if c == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(c);
    }
    normalized
}

fn split_name(name: &str) -> LoaderResult<(&str, &str)> {
    if name.is_empty() {
        return Err(LoaderError::InvalidName {
            name: name.to_string(),
            reason: "name is empty",
        });
    }
    let Some(reference) = name.strip_prefix('@') else {
        return Ok((MAIN_NAMESPACE, name.trim_start_matches('/')));
    };
    match reference.split_once('/') {
        Some((namespace, relative)) if !namespace.is_empty() && !relative.is_empty() => {
            Ok((namespace, relative))
        }
        _ => Err(LoaderError::InvalidName {
            name: name.to_string(),
            reason: "expected @namespace/path/to/template",
        }),
    }
}

fn validate_relative(name: &str, relative: &str) -> LoaderResult<()> {
    let mut depth = 0usize;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir if depth > 0 => depth -= 1,
            _ => {
                return Err(LoaderError::InvalidName {
                    name: name.to_string(),
                    reason: "path leaves the namespace directory",
                })
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{normalize_name, split_name, validate_relative, LoaderError, MAIN_NAMESPACE};

    #[test]
    fn normalizes_separators() {
        assert_eq!(normalize_name("@zen\\\\cards//card.twig"), "@zen/cards/card.twig");
    }

    #[test]
    fn splits_namespaced_and_plain_names() {
        assert_eq!(
            split_name("@zen/cards/card.twig").expect("namespaced"),
            ("zen", "cards/card.twig")
        );
        assert_eq!(
            split_name("page.twig").expect("plain"),
            (MAIN_NAMESPACE, "page.twig")
        );
        assert!(matches!(
            split_name("@zen"),
            Err(LoaderError::InvalidName { .. })
        ));
        assert!(matches!(split_name(""), Err(LoaderError::InvalidName { .. })));
    }

    #[test]
    fn rejects_traversal_outside_namespace() {
        assert!(validate_relative("@zen/a/../b.twig", "a/../b.twig").is_ok());
        assert!(matches!(
            validate_relative("@zen/../secret", "../secret"),
            Err(LoaderError::InvalidName { .. })
        ));
    }
}
