//! Template namespace resolution for themeable extensions.
//! Modules and themes declare namespaces; this crate decides, per theme,
//! which directories each namespace searches and in what order.

pub mod cache;
pub mod db;
pub mod extension;
pub mod loader;
pub mod logging;
pub mod namespace;
pub mod registry;

pub use cache::{CacheError, CacheResult, CacheStore, MemoryCacheStore, SqliteCacheStore};
pub use extension::discovery::{
    resolve_base_theme_chain, DiscoveryError, ExtensionDiscovery, StaticExtensionDiscovery,
};
pub use extension::manifest::{ExtensionKind, ExtensionManifest, ManifestError, PathFragments};
pub use extension::normalize::{
    normalize_extension_list, normalize_path_fragments, ExtensionInfo, NormalizedExtension,
};
pub use loader::{LoaderError, LoaderResult, TemplateLoader, MAIN_NAMESPACE};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use namespace::hooks::{AlterHooks, HookScope};
pub use namespace::merger::{find_namespaces, merge_namespaces, MergeOutcome, ProtectionViolation};
pub use namespace::protection::{find_protected_namespaces, NamespaceOwner, ProtectedNamespaces};
pub use namespace::{NamespaceMap, ThemeNamespaces};
pub use registry::{
    ActiveThemeSource, FixedActiveTheme, NamespaceRegistry, RegistryConfig, RegistryState,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
