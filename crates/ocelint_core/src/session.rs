//! A configured lint session.
//!
//! The session ties the pieces together: it loads plugins into a
//! registry according to the [`Config`], runs inspectors over files or
//! in-memory sources, and merges the findings. Bulk runs fan out over
//! a rayon pool sized by the `workers` setting.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::EngineError;
use crate::inspector::Inspector;
use crate::plugin::{ModuleIndex, Plugin};
use crate::registry::Registry;
use crate::report::{Group, Grouped, Inspection, merge_inspections};

pub struct Session {
    config: Config,
    index: ModuleIndex,
    registry: Registry,
    plugins: Vec<Plugin>,
}

impl Session {
    /// A session over the built-in plugin modules.
    pub fn new(config: Config) -> Self {
        Self::with_index(config, ModuleIndex::builtin())
    }

    /// A session resolving plugins against a custom module index.
    pub fn with_index(config: Config, index: ModuleIndex) -> Self {
        Self {
            config,
            index,
            registry: Registry::new(),
            plugins: Vec::new(),
        }
    }

    /// The built-in plugins, in load order.
    pub fn core_plugins() -> Vec<Plugin> {
        ["context", "parentize", "general", "upgrade"]
            .iter()
            .map(|name| Plugin::new(name, "@"))
            .collect()
    }

    /// Loads every configured plugin. Call once before inspecting.
    pub fn start(&mut self) -> Result<(), EngineError> {
        let mut plugins = Vec::new();
        if self.config.load_core {
            plugins.extend(Self::core_plugins());
        }
        for (namespace, names) in &self.config.plugins {
            for name in names {
                plugins.push(Plugin::new(name, namespace));
            }
        }
        for plugin in plugins {
            self.load_plugin(plugin)?;
        }
        info!(plugins = self.plugins.len(), "session ready");
        Ok(())
    }

    /// Loads one plugin, unless it is blacklisted or already loaded.
    pub fn load_plugin(&mut self, plugin: Plugin) -> Result<(), EngineError> {
        if self.is_blacklisted(&plugin) {
            debug!(%plugin, "blacklisted, not loaded");
            return Ok(());
        }
        if self.plugins.iter().any(|known| known.same(&plugin)) {
            return Ok(());
        }
        plugin.load(&self.index, &mut self.registry)?;
        self.plugins.push(plugin);
        Ok(())
    }

    fn is_blacklisted(&self, plugin: &Plugin) -> bool {
        self.config
            .blacklist
            .plugins
            .iter()
            .any(|entry| Plugin::from_simple(entry).is_ok_and(|listed| listed.same(plugin)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Plugins this session loaded, including inactive ones.
    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    /// Blacklisted report codes, normalized to the upper-cased form
    /// reports carry.
    pub fn ignored_codes(&self) -> HashSet<String> {
        self.config
            .blacklist
            .codes
            .iter()
            .map(|code| code.to_uppercase())
            .collect()
    }

    /// Inspects one file. When `strict` is off, unreadable or
    /// unparsable files are logged and yield no findings, so one bad
    /// file never sinks a whole run.
    pub fn single_inspection(&self, path: &Path, strict: bool) -> Result<Inspection, EngineError> {
        match Inspector::from_file(&self.registry, path) {
            Ok(inspector) => Ok(inspector.handle()),
            Err(err) if !strict => {
                error!(path = %path.display(), %err, "skipping file");
                Ok(Inspection::new())
            }
            Err(err) => Err(err),
        }
    }

    /// Inspects an in-memory source unit. Always strict.
    pub fn inspect_source(&self, unit: &str, source: &str) -> Result<Inspection, EngineError> {
        Ok(Inspector::from_source(&self.registry, unit, source)?.handle())
    }

    /// Inspects many files and merges the findings, filtered by the
    /// code blacklist and grouped along `group`.
    pub fn bulk_inspection(&self, files: &[PathBuf], group: Group) -> Result<Grouped, EngineError> {
        let ignored = self.ignored_codes();
        let inspections: Vec<Inspection> = if files.len() <= 1 || self.config.workers == 1 {
            files
                .iter()
                .map(|file| self.single_inspection(file, false))
                .collect::<Result<_, _>>()?
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.workers)
                .build()
                .map_err(|err| EngineError::WorkerPool(err.to_string()))?;
            pool.install(|| {
                files
                    .par_iter()
                    .map(|file| self.single_inspection(file, false))
                    .collect::<Result<_, _>>()
            })?
        };
        Ok(merge_inspections(inspections, group, &ignored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hookdb::HookDb;
    use crate::plugin::PluginModule;
    use crate::registry::Verdict;
    use ocelint_ast::{NodeId, NodeKind, Tree};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn hit_every_pass(_tree: &Tree, _node: NodeId, _db: &mut HookDb) -> Verdict {
        Verdict::Hit
    }

    fn register_pass_probe(registry: &mut Registry) {
        registry.on_node("pass_probe", &[NodeKind::Pass], hit_every_pass);
    }

    fn probe_index() -> ModuleIndex {
        let mut index = ModuleIndex::empty();
        index.insert(PluginModule {
            static_name: "probe.passes",
            min_version: None,
            register: register_pass_probe,
        });
        index.insert(PluginModule {
            static_name: "probe.future",
            min_version: Some((999, 0, 0)),
            register: register_pass_probe,
        });
        index
    }

    #[test]
    fn unknown_plugins_fail_with_both_identity_parts() {
        let mut session = Session::with_index(Config::default(), ModuleIndex::empty());
        let err = session
            .load_plugin(Plugin::new("nowhere", "missing.ns"))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("nowhere"));
        assert!(message.contains("missing.ns"));
    }

    #[test]
    fn version_gated_plugins_go_inactive_without_registering() {
        let mut session = Session::with_index(Config::default(), probe_index());
        let plugin = Plugin::new("future", "probe");
        session.load_plugin(plugin.clone()).unwrap();
        assert!(plugin.is_inactive());
        assert!(session.registry().node_hooks(NodeKind::Pass).is_empty());
    }

    #[test]
    fn blacklisted_plugins_are_skipped() {
        let mut config = Config::default();
        config.load_core = false;
        config.blacklist.plugins.push("probe.passes".to_owned());
        config
            .plugins
            .insert("probe".to_owned(), vec!["passes".to_owned()]);
        let mut session = Session::with_index(config, probe_index());
        session.start().unwrap();
        assert!(session.plugins().is_empty());
        assert!(session.registry().node_hooks(NodeKind::Pass).is_empty());
    }

    #[test]
    fn loading_twice_registers_once() {
        let mut session = Session::with_index(Config::default(), probe_index());
        let plugin = Plugin::new("passes", "probe");
        session.load_plugin(plugin.clone()).unwrap();
        session.load_plugin(plugin).unwrap();
        assert_eq!(session.registry().node_hooks(NodeKind::Pass).len(), 1);
        assert_eq!(session.plugins().len(), 1);
    }

    #[test]
    fn bulk_inspection_tolerates_broken_files() {
        let mut config = Config::default();
        config.load_core = false;
        config
            .plugins
            .insert("probe".to_owned(), vec!["passes".to_owned()]);
        let mut session = Session::with_index(config, probe_index());
        session.start().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.py");
        let bad = dir.path().join("bad.py");
        std::fs::File::create(&good)
            .and_then(|mut f| f.write_all(b"pass\npass\n"))
            .unwrap();
        std::fs::File::create(&bad)
            .and_then(|mut f| f.write_all(b"def broken(:\n"))
            .unwrap();

        let grouped = session
            .bulk_inspection(&[good, bad], Group::Code)
            .unwrap();
        let total: usize = grouped.values().map(Vec::len).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn code_blacklist_filters_bulk_results() {
        let mut config = Config::default();
        config.load_core = false;
        config
            .plugins
            .insert("probe".to_owned(), vec!["passes".to_owned()]);
        config.blacklist.codes.push("pass_probe".to_owned());
        let mut session = Session::with_index(config, probe_index());
        session.start().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("only.py");
        std::fs::write(&file, "pass\n").unwrap();
        let grouped = session.bulk_inspection(&[file], Group::Code).unwrap();
        assert!(grouped.is_empty());
    }
}
