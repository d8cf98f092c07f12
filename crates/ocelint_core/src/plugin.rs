//! Plugin identity and loading.
//!
//! A plugin is identified by a `(name, namespace)` pair. Identities
//! are interned: constructing the same pair twice yields handles to
//! the same underlying allocation, so equality of identity is pointer
//! equality and per-plugin state (the inactive flag) is shared by
//! every handle.
//!
//! Namespaces support two shorthands. `@` expands to the built-in
//! plugin root, `@sub` to a sub-namespace under it, and `?` to the
//! empty namespace used by tests and ad-hoc registrations.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::EngineError;
use crate::registry::{LoadAbort, LoadOutcome, Registry};

/// Namespace all built-in plugins live under.
pub const BUILTIN_NAMESPACE: &str = "ocelint.plugins";

/// A runtime version triple, compared lexicographically.
pub type Version = (u64, u64, u64);

/// The version of the running engine.
pub fn runtime_version() -> Version {
    static VERSION: OnceLock<Version> = OnceLock::new();
    *VERSION.get_or_init(|| parse_version(env!("CARGO_PKG_VERSION")).unwrap_or((0, 0, 0)))
}

fn parse_version(text: &str) -> Option<Version> {
    let mut parts = text.split('.').map(|part| part.parse::<u64>().ok());
    let major = parts.next()??;
    let minor = parts.next()??;
    let patch = parts.next()??;
    Some((major, minor, patch))
}

#[derive(Debug)]
struct PluginCore {
    name: String,
    namespace: String,
    static_name: String,
    inactive: AtomicBool,
}

/// An interned plugin identity.
#[derive(Debug, Clone)]
pub struct Plugin {
    core: Arc<PluginCore>,
}

fn interned() -> &'static Mutex<HashMap<(String, String), Plugin>> {
    static TABLE: OnceLock<Mutex<HashMap<(String, String), Plugin>>> = OnceLock::new();
    TABLE.get_or_init(Mutex::default)
}

fn expand_namespace(namespace: &str) -> String {
    match namespace {
        "@" => BUILTIN_NAMESPACE.to_owned(),
        "?" => String::new(),
        _ => match namespace.strip_prefix('@') {
            Some(sub) => format!("{BUILTIN_NAMESPACE}.{sub}"),
            None => namespace.to_owned(),
        },
    }
}

impl Plugin {
    /// Returns the interned plugin for `(name, namespace)`, creating
    /// it on first use. The namespace may use the `@`/`?` shorthands.
    pub fn new(name: &str, namespace: &str) -> Plugin {
        Self::intern(name, namespace, None)
    }

    /// Like [`Plugin::new`], with an explicit module path overriding
    /// the derived one. The override only takes effect when the
    /// identity is interned for the first time.
    pub fn with_static_name(name: &str, namespace: &str, static_name: &str) -> Plugin {
        Self::intern(name, namespace, Some(static_name.to_owned()))
    }

    fn intern(name: &str, namespace: &str, static_name: Option<String>) -> Plugin {
        let namespace = expand_namespace(namespace);
        let mut table = interned().lock();
        table
            .entry((name.to_owned(), namespace.clone()))
            .or_insert_with(|| {
                let static_name = static_name.unwrap_or_else(|| {
                    if namespace.is_empty() {
                        name.to_owned()
                    } else {
                        format!("{namespace}.{name}")
                    }
                });
                Plugin {
                    core: Arc::new(PluginCore {
                        name: name.to_owned(),
                        namespace,
                        static_name,
                        inactive: AtomicBool::new(false),
                    }),
                }
            })
            .clone()
    }

    /// Parses a dotted `namespace.name` identifier. A bare `@name` or
    /// `?name` is also accepted; anything without a separator or
    /// shorthand prefix is rejected.
    pub fn from_simple(simple: &str) -> Result<Plugin, EngineError> {
        if let Some((namespace, name)) = simple.rsplit_once('.') {
            Ok(Self::new(name, namespace))
        } else if let Some(name) = simple.strip_prefix('@') {
            Ok(Self::new(name, "@"))
        } else if let Some(name) = simple.strip_prefix('?') {
            Ok(Self::new(name, "?"))
        } else {
            Err(EngineError::InvalidPlugin(simple.to_owned()))
        }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn namespace(&self) -> &str {
        &self.core.namespace
    }

    /// The module path this plugin's registrations are looked up by.
    pub fn static_name(&self) -> &str {
        &self.core.static_name
    }

    /// Whether the plugin was disabled at load time.
    pub fn is_inactive(&self) -> bool {
        self.core.inactive.load(Ordering::Relaxed)
    }

    pub fn set_inactive(&self, inactive: bool) {
        self.core.inactive.store(inactive, Ordering::Relaxed);
    }

    /// Identity comparison: true only for handles to the same interned
    /// plugin.
    pub fn same(&self, other: &Plugin) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    /// Registers this plugin's hooks into `registry`.
    ///
    /// Registration runs inside a buffered scope: if the plugin's
    /// module declares a minimum runtime version newer than ours, the
    /// scope is abandoned, nothing is registered and the plugin is
    /// marked inactive. Hooks of a committed scope are stamped with
    /// this plugin as their owner.
    pub fn load(&self, index: &ModuleIndex, registry: &mut Registry) -> Result<(), EngineError> {
        let module = index
            .get(self.static_name())
            .ok_or_else(|| EngineError::plugin_load(self.name(), self.namespace()))?;
        let min_version = module.min_version;
        let register = module.register;
        let plugin = self.clone();

        let outcome = registry.load_scope(move |registry| {
            if let Some(min) = min_version {
                if min > runtime_version() {
                    plugin.set_inactive(true);
                    debug!(
                        plugin = plugin.static_name(),
                        "requires a newer runtime, marked inactive"
                    );
                    return Err(LoadAbort);
                }
            }
            register(registry);
            Ok(())
        });

        if let LoadOutcome::Committed(hooks) = outcome {
            registry.stamp(&hooks, self);
        }
        Ok(())
    }
}

impl PartialEq for Plugin {
    fn eq(&self, other: &Plugin) -> bool {
        self.core.name == other.core.name && self.core.namespace == other.core.namespace
    }
}

impl Eq for Plugin {}

impl Hash for Plugin {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.core.name.hash(state);
        self.core.namespace.hash(state);
    }
}

impl fmt::Display for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.static_name())
    }
}

/// One loadable plugin module: a registration entry point plus its
/// metadata.
#[derive(Debug, Clone, Copy)]
pub struct PluginModule {
    /// Module path plugins resolve to, e.g. `ocelint.plugins.general`.
    pub static_name: &'static str,
    /// Oldest runtime this module works with, if it cares.
    pub min_version: Option<Version>,
    /// Registers the module's hooks.
    pub register: fn(&mut Registry),
}

/// Resolves plugin static names to their modules.
#[derive(Debug, Default)]
pub struct ModuleIndex {
    modules: HashMap<&'static str, PluginModule>,
}

impl ModuleIndex {
    /// An index with no modules. Useful for tests.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The index of built-in plugin modules.
    pub fn builtin() -> Self {
        let mut index = Self::empty();
        index.insert(crate::plugins::context::MODULE);
        index.insert(crate::plugins::parentize::MODULE);
        index.insert(crate::plugins::general::MODULE);
        index.insert(crate::plugins::upgrade::MODULE);
        index
    }

    pub fn insert(&mut self, module: PluginModule) {
        self.modules.insert(module.static_name, module);
    }

    pub fn get(&self, static_name: &str) -> Option<&PluginModule> {
        self.modules.get(static_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn identities_are_interned() {
        let a = Plugin::new("intern_probe", "@");
        let b = Plugin::new("intern_probe", "@");
        assert!(a.same(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn namespace_shorthands_expand() {
        assert_eq!(Plugin::new("a", "@").namespace(), BUILTIN_NAMESPACE);
        assert_eq!(
            Plugin::new("a", "@extras").namespace(),
            "ocelint.plugins.extras"
        );
        assert_eq!(Plugin::new("a", "?").namespace(), "");
        assert_eq!(Plugin::new("a", "third.party").namespace(), "third.party");
    }

    #[test]
    fn from_simple_splits_on_last_dot() {
        let plugin = Plugin::from_simple("third.party.checks").unwrap();
        assert_eq!(plugin.name(), "checks");
        assert_eq!(plugin.namespace(), "third.party");

        let builtin = Plugin::from_simple("@context").unwrap();
        assert_eq!(builtin.namespace(), BUILTIN_NAMESPACE);
        assert!(builtin.same(&Plugin::new("context", "@")));
    }

    #[test]
    fn from_simple_rejects_bare_names() {
        assert!(matches!(
            Plugin::from_simple("context"),
            Err(EngineError::InvalidPlugin(_))
        ));
    }

    #[test]
    fn static_name_derives_from_namespace() {
        assert_eq!(
            Plugin::new("general", "@").static_name(),
            "ocelint.plugins.general"
        );
        assert_eq!(Plugin::new("scratch_sn", "?").static_name(), "scratch_sn");
    }

    #[test]
    fn inactive_flag_is_shared_between_handles() {
        let a = Plugin::new("shared_flag_probe", "?");
        let b = Plugin::new("shared_flag_probe", "?");
        a.set_inactive(true);
        assert!(b.is_inactive());
        a.set_inactive(false);
    }

    #[test]
    fn version_triples_compare_lexicographically() {
        assert!(parse_version("1.2.3").unwrap() < (1, 10, 0));
        assert_eq!(parse_version("not.a.version"), None);
    }
}
