//! Alteration points for protected namespaces and per-theme namespaces.
//!
//! Handlers run synchronously: every module-scope handler in registration
//! order, then every theme-scope handler in registration order. Handlers may
//! run again on every resolution pass that misses the cache.

use crate::namespace::protection::ProtectedNamespaces;
use crate::namespace::NamespaceMap;

/// Which collaborator tier registered a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookScope {
    Module,
    Theme,
}

type ProtectedNamespacesAlter = Box<dyn Fn(&mut ProtectedNamespaces) + Send + Sync>;
type NamespacesAlter = Box<dyn Fn(&mut NamespaceMap, &str) + Send + Sync>;

struct ScopedHandlers<H> {
    module: Vec<H>,
    theme: Vec<H>,
}

impl<H> Default for ScopedHandlers<H> {
    fn default() -> Self {
        Self {
            module: Vec::new(),
            theme: Vec::new(),
        }
    }
}

impl<H> ScopedHandlers<H> {
    fn push(&mut self, scope: HookScope, handler: H) {
        match scope {
            HookScope::Module => self.module.push(handler),
            HookScope::Theme => self.theme.push(handler),
        }
    }

    fn in_dispatch_order(&self) -> impl Iterator<Item = &H> {
        self.module.iter().chain(self.theme.iter())
    }

    fn len(&self) -> usize {
        self.module.len() + self.theme.len()
    }
}

/// Registered alteration handlers.
#[derive(Default)]
pub struct AlterHooks {
    protected_namespaces: ScopedHandlers<ProtectedNamespacesAlter>,
    namespaces: ScopedHandlers<NamespacesAlter>,
}

impl AlterHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler that may add, remove or replace protected entries.
    pub fn on_protected_namespaces<F>(&mut self, scope: HookScope, handler: F) -> &mut Self
    where
        F: Fn(&mut ProtectedNamespaces) + Send + Sync + 'static,
    {
        self.protected_namespaces.push(scope, Box::new(handler));
        self
    }

    /// Registers a handler that may rewrite one theme's namespaces before caching.
    pub fn on_namespaces<F>(&mut self, scope: HookScope, handler: F) -> &mut Self
    where
        F: Fn(&mut NamespaceMap, &str) + Send + Sync + 'static,
    {
        self.namespaces.push(scope, Box::new(handler));
        self
    }

    pub fn alter_protected_namespaces(&self, protected: &mut ProtectedNamespaces) {
        for handler in self.protected_namespaces.in_dispatch_order() {
            handler(protected);
        }
    }

    pub fn alter_namespaces(&self, namespaces: &mut NamespaceMap, theme: &str) {
        for handler in self.namespaces.in_dispatch_order() {
            handler(namespaces, theme);
        }
    }

    pub fn len(&self) -> usize {
        self.protected_namespaces.len() + self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for AlterHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlterHooks")
            .field("protected_namespaces", &self.protected_namespaces.len())
            .field("namespaces", &self.namespaces.len())
            .finish()
    }
}
