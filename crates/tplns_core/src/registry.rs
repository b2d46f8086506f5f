//! Active-theme namespace registry.
//!
//! # Responsibility
//! - Serve the namespaces of the currently active theme to template loaders.
//! - Memoize the installation-wide merge result and each theme's altered
//!   result in the cache store.
//!
//! # Invariants
//! - State moves `Uninitialized -> Loading -> Populated`; `invalidate` and
//!   `reset` return it to `Uninitialized`.
//! - A theme-scoped cache hit is returned as-is; namespace alteration hooks
//!   only run when that entry is written.
//! - The in-memory installation table is never altered; hooks always start
//!   from its pre-alteration entry.
//! - Cache failures degrade to recomputation, never to a failed lookup.

use crate::cache::{get_json, set_json, CacheStore};
use crate::extension::discovery::ExtensionDiscovery;
use crate::namespace::hooks::AlterHooks;
use crate::namespace::merger::find_namespaces;
use crate::namespace::{NamespaceMap, ThemeNamespaces};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Default key of the installation-wide cache entry.
pub const DEFAULT_INSTALLATION_CACHE_KEY: &str = "template_namespaces";
/// Default tag shared by both cache tiers.
pub const DEFAULT_INVALIDATION_TAG: &str = "theme_registry";

/// Collaborator contract that names the theme of the current request.
pub trait ActiveThemeSource: Send + Sync {
    fn active_theme_id(&self) -> String;
}

/// Switchable in-process active theme.
#[derive(Debug, Default)]
pub struct FixedActiveTheme {
    theme: RwLock<String>,
}

impl FixedActiveTheme {
    pub fn new(theme: &str) -> Self {
        Self {
            theme: RwLock::new(theme.to_string()),
        }
    }

    /// Switches the active theme, e.g. for a sub-request.
    pub fn switch_to(&self, theme: &str) {
        match self.theme.write() {
            Ok(mut current) => *current = theme.to_string(),
            Err(poisoned) => *poisoned.into_inner() = theme.to_string(),
        }
    }
}

impl ActiveThemeSource for FixedActiveTheme {
    fn active_theme_id(&self) -> String {
        match self.theme.read() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Installation-level registry settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Installation root that root-relative path fragments resolve against.
    pub root: PathBuf,
    pub installation_cache_key: String,
    /// Per-theme keys are this key, a `:` and the theme id.
    pub theme_cache_key_prefix: String,
    pub invalidation_tag: String,
}

impl RegistryConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            installation_cache_key: DEFAULT_INSTALLATION_CACHE_KEY.to_string(),
            theme_cache_key_prefix: DEFAULT_INSTALLATION_CACHE_KEY.to_string(),
            invalidation_tag: DEFAULT_INVALIDATION_TAG.to_string(),
        }
    }

    pub fn theme_cache_key(&self, theme: &str) -> String {
        format!("{}:{}", self.theme_cache_key_prefix, theme)
    }
}

/// Lifecycle of the installation-wide namespace table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    Uninitialized,
    Loading,
    Populated,
}

/// Lazily resolved, cached namespaces for the active theme.
pub struct NamespaceRegistry {
    config: RegistryConfig,
    discovery: Arc<dyn ExtensionDiscovery + Send + Sync>,
    active_theme: Arc<dyn ActiveThemeSource>,
    cache: Arc<dyn CacheStore>,
    hooks: AlterHooks,
    state: RegistryState,
    generation: u64,
    namespaces: ThemeNamespaces,
}

impl NamespaceRegistry {
    pub fn new(
        config: RegistryConfig,
        discovery: Arc<dyn ExtensionDiscovery + Send + Sync>,
        active_theme: Arc<dyn ActiveThemeSource>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            config,
            discovery,
            active_theme,
            cache,
            hooks: AlterHooks::new(),
            state: RegistryState::Uninitialized,
            generation: 0,
            namespaces: ThemeNamespaces::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: AlterHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn hooks_mut(&mut self) -> &mut AlterHooks {
        &mut self.hooks
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn state(&self) -> RegistryState {
        self.state
    }

    /// Bumped by every `invalidate` and `reset`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Machine name of the currently active theme.
    pub fn active_theme_id(&self) -> String {
        self.active_theme.active_theme_id()
    }

    /// Namespaces for the currently active theme, after alteration hooks.
    pub fn namespaces_for_active_theme(&mut self) -> NamespaceMap {
        let theme = self.active_theme_id();
        self.namespaces_for_theme(&theme)
    }

    /// Namespaces for `theme`, after alteration hooks.
    ///
    /// Unknown themes get an empty map passed through the hooks.
    pub fn namespaces_for_theme(&mut self, theme: &str) -> NamespaceMap {
        if self.state != RegistryState::Populated {
            self.init();
        }

        let key = self.config.theme_cache_key(theme);
        match get_json::<NamespaceMap>(&*self.cache, &key) {
            Ok(Some(cached)) => {
                debug!("event=namespaces_lookup module=registry status=cache_hit theme={theme}");
                return cached;
            }
            Ok(None) => {}
            Err(err) => warn!(
                "event=namespaces_lookup module=registry status=cache_error theme={theme} error={err}"
            ),
        }

        let mut namespaces = self.namespaces.get(theme).cloned().unwrap_or_default();
        self.hooks.alter_namespaces(&mut namespaces, theme);
        self.persist(&key, &namespaces);
        namespaces
    }

    /// Installation-wide table for every installed theme, before alteration.
    pub fn all_namespaces(&mut self) -> &ThemeNamespaces {
        if self.state != RegistryState::Populated {
            self.init();
        }
        &self.namespaces
    }

    /// Clears both cache tiers and forces a rebuild on next access.
    pub fn invalidate(&mut self) {
        let tag = self.config.invalidation_tag.as_str();
        match self.cache.invalidate_tags(&[tag]) {
            Ok(removed) => info!(
                "event=namespaces_invalidate module=registry status=ok tag={tag} removed={removed}"
            ),
            Err(err) => warn!(
                "event=namespaces_invalidate module=registry status=error tag={tag} error={err}"
            ),
        }
        self.reset();
    }

    /// Drops in-memory state without touching the cache store.
    pub fn reset(&mut self) {
        self.state = RegistryState::Uninitialized;
        self.generation += 1;
        self.namespaces.clear();
    }

    fn init(&mut self) {
        self.state = RegistryState::Loading;

        let key = self.config.installation_cache_key.clone();
        match get_json::<ThemeNamespaces>(&*self.cache, &key) {
            Ok(Some(cached)) => {
                debug!(
                    "event=namespaces_init module=registry status=cache_hit themes={}",
                    cached.len()
                );
                self.namespaces = cached;
                self.state = RegistryState::Populated;
                return;
            }
            Ok(None) => {}
            Err(err) => warn!(
                "event=namespaces_init module=registry status=cache_error error={err}"
            ),
        }

        let started_at = Instant::now();
        let outcome = find_namespaces(&*self.discovery, &self.config.root, &self.hooks);
        info!(
            "event=namespaces_init module=registry status=ok themes={} violations={} duration_ms={}",
            outcome.namespaces.len(),
            outcome.violations.len(),
            started_at.elapsed().as_millis()
        );
        self.namespaces = outcome.namespaces;
        self.persist(&key, &self.namespaces);
        self.state = RegistryState::Populated;
    }

    fn persist<T: serde::Serialize>(&self, key: &str, value: &T) {
        let tag = self.config.invalidation_tag.as_str();
        if let Err(err) = set_json(&*self.cache, key, value, &[tag]) {
            warn!("event=cache_write module=registry status=error key={key} error={err}");
        }
    }
}

impl std::fmt::Debug for NamespaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceRegistry")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("themes", &self.namespaces.len())
            .field("hooks", &self.hooks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ActiveThemeSource, FixedActiveTheme, NamespaceRegistry, RegistryConfig, RegistryState,
    };
    use crate::cache::{set_json, CacheStore, MemoryCacheStore};
    use crate::extension::discovery::StaticExtensionDiscovery;
    use crate::extension::manifest::{ExtensionKind, ExtensionManifest};
    use crate::namespace::hooks::HookScope;
    use crate::namespace::{NamespaceMap, ThemeNamespaces};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn discovery() -> StaticExtensionDiscovery {
        let mut discovery = StaticExtensionDiscovery::new();
        discovery
            .register(
                ExtensionManifest::new("activeTheme", "Active theme", ExtensionKind::Theme)
                    .with_namespace("components", vec!["path1", "path2"]),
                "/drupal/themes/activeTheme",
            )
            .expect("theme registration");
        discovery
    }

    fn registry(cache: Arc<MemoryCacheStore>) -> NamespaceRegistry {
        NamespaceRegistry::new(
            RegistryConfig::new("/drupal"),
            Arc::new(discovery()),
            Arc::new(FixedActiveTheme::new("activeTheme")),
            cache,
        )
    }

    #[test]
    fn reports_active_theme_name() {
        let theme = FixedActiveTheme::new("testThemeName");
        assert_eq!(theme.active_theme_id(), "testThemeName");
        theme.switch_to("other");
        assert_eq!(theme.active_theme_id(), "other");
    }

    #[test]
    fn init_builds_and_persists_installation_table() {
        let cache = Arc::new(MemoryCacheStore::new());
        let mut registry = registry(cache.clone());
        assert_eq!(registry.state(), RegistryState::Uninitialized);

        let namespaces = registry.namespaces_for_active_theme();
        assert_eq!(registry.state(), RegistryState::Populated);
        assert_eq!(
            namespaces["components"],
            [
                PathBuf::from("/drupal/themes/activeTheme/path1"),
                PathBuf::from("/drupal/themes/activeTheme/path2"),
            ]
        );
        assert!(cache.get("template_namespaces").expect("get").is_some());
        assert!(cache
            .get("template_namespaces:activeTheme")
            .expect("get")
            .is_some());
    }

    #[test]
    fn init_adopts_cached_installation_table() {
        let cache = Arc::new(MemoryCacheStore::new());
        let mut cached = ThemeNamespaces::new();
        let mut base = NamespaceMap::new();
        base.insert("components".to_string(), vec![PathBuf::from("/cached/base")]);
        cached.insert("baseTheme".to_string(), base);
        set_json(&*cache, "template_namespaces", &cached, &["theme_registry"])
            .expect("seed cache");

        let mut registry = registry(cache);
        let all = registry.all_namespaces();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key("baseTheme"));
        assert!(!all.contains_key("activeTheme"));
    }

    #[test]
    fn theme_cache_hit_bypasses_hooks() {
        let cache = Arc::new(MemoryCacheStore::new());
        let mut cached = NamespaceMap::new();
        cached.insert("components".to_string(), vec![PathBuf::from("/cached/theme")]);
        set_json(&*cache, "template_namespaces:activeTheme", &cached, &["theme_registry"])
            .expect("seed cache");

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = registry(cache);
        registry
            .hooks_mut()
            .on_namespaces(HookScope::Module, move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        assert_eq!(registry.namespaces_for_active_theme(), cached);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn hooks_run_once_per_theme_until_invalidated() {
        let cache = Arc::new(MemoryCacheStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = registry(cache.clone());
        registry
            .hooks_mut()
            .on_namespaces(HookScope::Theme, move |namespaces, theme| {
                counter.fetch_add(1, Ordering::SeqCst);
                namespaces.insert(format!("{theme}_extra"), vec![PathBuf::from("/srv/extra")]);
            });

        let first = registry.namespaces_for_active_theme();
        let second = registry.namespaces_for_active_theme();
        assert_eq!(first, second);
        assert!(first.contains_key("activeTheme_extra"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        registry.invalidate();
        assert_eq!(registry.state(), RegistryState::Uninitialized);
        assert!(cache.is_empty());
        registry.namespaces_for_active_theme();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn external_invalidation_reruns_hooks_on_unaltered_table() {
        let cache = Arc::new(MemoryCacheStore::new());
        let mut registry = registry(cache.clone());
        registry
            .hooks_mut()
            .on_namespaces(HookScope::Module, |namespaces, _| {
                if let Some(paths) = namespaces.get_mut("components") {
                    paths.insert(0, PathBuf::from("/extra"));
                }
            });

        let first = registry.namespaces_for_active_theme();
        assert_eq!(first["components"][0], PathBuf::from("/extra"));

        cache
            .invalidate_tags(&["theme_registry"])
            .expect("invalidate shared store");
        assert_eq!(registry.state(), RegistryState::Populated);

        let second = registry.namespaces_for_active_theme();
        assert_eq!(second, first);
        assert_eq!(
            registry.all_namespaces()["activeTheme"]["components"],
            [
                PathBuf::from("/drupal/themes/activeTheme/path1"),
                PathBuf::from("/drupal/themes/activeTheme/path2"),
            ]
        );
    }

    #[test]
    fn invalidate_and_reset_bump_generation() {
        let mut registry = registry(Arc::new(MemoryCacheStore::new()));
        assert_eq!(registry.generation(), 0);
        registry.invalidate();
        registry.reset();
        assert_eq!(registry.generation(), 2);
    }

    #[test]
    fn unknown_theme_yields_hook_output_only() {
        let cache = Arc::new(MemoryCacheStore::new());
        let mut registry = registry(cache);
        assert!(registry.namespaces_for_theme("missing").is_empty());
    }
}
