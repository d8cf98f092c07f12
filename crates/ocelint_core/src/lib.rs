//! # ocelint_core
//!
//! The inspection engine behind ocelint: plugin identity and loading,
//! hook registration and dispatch, the built-in inspections, and
//! report aggregation.
//!
//! The usual entry point is a [`Session`]: configure it, [`Session::start`]
//! it to load plugins, then inspect files or in-memory sources.
//!
//! ```rust
//! use ocelint_core::{Config, Session};
//!
//! let mut session = Session::new(Config::default());
//! session.start().unwrap();
//! let findings = session
//!     .inspect_source("demo.py", "def f(x=[]):\n    pass\n")
//!     .unwrap();
//! assert!(findings["general"]
//!     .iter()
//!     .any(|report| report.code == "DEFAULT_MUTABLE_ARG"));
//! ```

pub mod config;
pub mod error;
pub mod hookdb;
pub mod inspector;
pub mod plugin;
pub mod plugins;
pub mod predicates;
pub mod registry;
pub mod report;
pub mod session;

pub use config::{Blacklist, Config};
pub use error::EngineError;
pub use hookdb::HookDb;
pub use inspector::Inspector;
pub use plugin::{
    BUILTIN_NAMESPACE, ModuleIndex, Plugin, PluginModule, Version, runtime_version,
};
pub use registry::{
    Event, Hook, HookFn, HookId, InitialHookFn, LoadAbort, LoadOutcome, NodeHookFn, Priority,
    Registry, TransformHookFn, Verdict,
};
pub use report::{
    Group, GroupKey, Grouped, GroupedReport, Inspection, Report, grouped_to_json,
    merge_inspections,
};
pub use session::Session;
