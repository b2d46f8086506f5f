//! Raw extension declarations and declaration-level validation.
//!
//! # Responsibility
//! - Model the per-extension declaration exactly as an installation supplies
//!   it (identifier, display metadata, template namespace contributions).
//! - Validate the identity fields the resolution pipeline keys on.
//!
//! # Invariants
//! - A manifest is never mutated by the resolution pipeline.
//! - Legacy `component-libraries` declarations are accepted but ignored.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Installable unit classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionKind {
    Module,
    Theme,
    Profile,
}

impl ExtensionKind {
    /// Stable string id used in declarations and log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Theme => "theme",
            Self::Profile => "profile",
        }
    }

    /// Profiles are listed with modules by discovery collaborators.
    pub fn is_theme(self) -> bool {
        matches!(self, Self::Theme)
    }
}

impl Display for ExtensionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One namespace path declaration: a bare fragment or a list of fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathFragments {
    One(String),
    Many(Vec<String>),
}

impl PathFragments {
    /// Fragments as a slice; a bare fragment is a one-element list.
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::One(fragment) => std::slice::from_ref(fragment),
            Self::Many(fragments) => fragments,
        }
    }
}

impl From<&str> for PathFragments {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<Vec<&str>> for PathFragments {
    fn from(value: Vec<&str>) -> Self {
        Self::Many(value.into_iter().map(str::to_string).collect())
    }
}

/// Template-related section of a declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentsDeclaration {
    /// Namespace name to path fragments, in declaration order.
    #[serde(default)]
    pub namespaces: IndexMap<String, PathFragments>,
    /// Opt-in flag; only its presence is significant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_default_namespace_reuse: Option<serde_json::Value>,
}

/// Raw declaration for one installed extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    /// Unique machine identifier, e.g. `zen`.
    pub id: String,
    /// Display name used in admin listings and warnings.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ExtensionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// Immediate parent theme; only meaningful for themes.
    #[serde(
        default,
        rename = "base theme",
        skip_serializing_if = "Option::is_none"
    )]
    pub base_theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<ComponentsDeclaration>,
}

impl ExtensionManifest {
    pub fn new(id: &str, name: &str, kind: ExtensionKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            package: None,
            base_theme: None,
            components: None,
        }
    }

    pub fn with_package(mut self, package: &str) -> Self {
        self.package = Some(package.to_string());
        self
    }

    pub fn with_base_theme(mut self, base_theme: &str) -> Self {
        self.base_theme = Some(base_theme.to_string());
        self
    }

    /// Appends one namespace declaration, keeping declaration order.
    pub fn with_namespace(mut self, namespace: &str, fragments: impl Into<PathFragments>) -> Self {
        self.components
            .get_or_insert_with(ComponentsDeclaration::default)
            .namespaces
            .insert(namespace.to_string(), fragments.into());
        self
    }

    pub fn allowing_default_namespace_reuse(mut self) -> Self {
        self.components
            .get_or_insert_with(ComponentsDeclaration::default)
            .allow_default_namespace_reuse = Some(serde_json::Value::Bool(true));
        self
    }

    /// Declared namespaces, empty when the extension has no components section.
    pub fn declared_namespaces(&self) -> impl Iterator<Item = (&String, &PathFragments)> {
        self.components
            .iter()
            .flat_map(|components| components.namespaces.iter())
    }

    /// True when the opt-in flag is present with a non-null value.
    pub fn allows_default_namespace_reuse(&self) -> bool {
        self.components
            .as_ref()
            .and_then(|components| components.allow_default_namespace_reuse.as_ref())
            .is_some_and(|value| !value.is_null())
    }

    pub fn package_label(&self) -> &str {
        self.package.as_deref().unwrap_or("")
    }

    /// Validates declaration-level identity invariants.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.id.trim().is_empty() {
            return Err(ManifestError::EmptyId);
        }
        if !is_valid_extension_id(&self.id) {
            return Err(ManifestError::InvalidId(self.id.clone()));
        }
        if self.name.trim().is_empty() {
            return Err(ManifestError::EmptyName(self.id.clone()));
        }
        if let Some(base_theme) = &self.base_theme {
            if !self.kind.is_theme() {
                return Err(ManifestError::BaseThemeOnNonTheme(self.id.clone()));
            }
            if base_theme == &self.id {
                return Err(ManifestError::SelfBaseTheme(self.id.clone()));
            }
        }
        Ok(())
    }
}

fn is_valid_extension_id(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Declaration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    EmptyId,
    InvalidId(String),
    EmptyName(String),
    BaseThemeOnNonTheme(String),
    SelfBaseTheme(String),
}

impl Display for ManifestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "extension id must not be empty"),
            Self::InvalidId(value) => write!(
                f,
                "extension id is invalid: {value} (expected [A-Za-z_][A-Za-z0-9_]*)"
            ),
            Self::EmptyName(id) => write!(f, "extension {id} has an empty display name"),
            Self::BaseThemeOnNonTheme(id) => {
                write!(f, "extension {id} declares a base theme but is not a theme")
            }
            Self::SelfBaseTheme(id) => write!(f, "theme {id} declares itself as base theme"),
        }
    }
}

impl Error for ManifestError {}
