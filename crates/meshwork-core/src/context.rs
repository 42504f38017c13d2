//! Context — the shared property map and capability registry.
//!
//! One `Context` is created per process and cloned into every provider.
//! Properties are plain `String → String` entries; capabilities are typed
//! handles (in practice `Arc<dyn Trait>`) keyed by their concrete handle
//! type. Consumers get cloned handles, never ownership.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

/// Shared runtime context. `Clone` is cheap (`Arc` interior) and every
/// clone observes the same state.
#[derive(Clone, Default)]
pub struct Context {
    inner: Arc<ContextInner>,
}

#[derive(Default)]
struct ContextInner {
    properties: RwLock<HashMap<String, String>>,
    capabilities: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Properties ─────────────────────────────────────────────

    /// Read a property value.
    pub fn property(&self, key: &str) -> Option<String> {
        self.inner
            .properties
            .read()
            .expect("property lock poisoned")
            .get(key)
            .cloned()
    }

    /// Set a property, replacing any previous value.
    pub fn set_property(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner
            .properties
            .write()
            .expect("property lock poisoned")
            .insert(key.into(), value.into());
    }

    /// Insert a property only if the key is absent. Returns true if the
    /// default was inserted, false if a value already existed.
    pub fn put_property_if_absent(&self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        let mut props = self
            .inner
            .properties
            .write()
            .expect("property lock poisoned");
        if props.contains_key(&key) {
            false
        } else {
            props.insert(key, value.into());
            true
        }
    }

    /// Read a property as a boolean. Only the case-insensitive string
    /// `"true"` counts as true; absence or anything else is false.
    pub fn bool_property(&self, key: &str) -> bool {
        self.property(key)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    // ── Capabilities ───────────────────────────────────────────

    /// Register a capability handle under its concrete type.
    ///
    /// Handles are expected to be cheap to clone (`Arc<dyn Trait>`);
    /// a second registration of the same type replaces the first.
    pub fn register_capability<C>(&self, handle: C)
    where
        C: Any + Clone + Send + Sync,
    {
        let mut caps = self
            .inner
            .capabilities
            .write()
            .expect("capability lock poisoned");
        caps.insert(TypeId::of::<C>(), Box::new(handle));
        debug!(capability = type_name::<C>(), "capability registered");
    }

    /// Look up a capability handle by type, returning a clone if present.
    pub fn capability<C>(&self) -> Option<C>
    where
        C: Any + Clone + Send + Sync,
    {
        let caps = self
            .inner
            .capabilities
            .read()
            .expect("capability lock poisoned");
        caps.get(&TypeId::of::<C>())
            .and_then(|boxed| boxed.downcast_ref::<C>())
            .cloned()
    }
}
