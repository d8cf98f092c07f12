//! Built-in plugins.
//!
//! Each module exposes a [`crate::plugin::PluginModule`] named
//! `MODULE` that registers its hooks; [`crate::plugin::ModuleIndex::builtin`]
//! indexes all of them under the `ocelint.plugins` namespace.

pub mod context;
pub mod general;
pub mod parentize;
pub mod upgrade;
