//! Dynamic configuration plane.
//!
//! # Data Flow
//! ```text
//! FileSource (notify events)  ─┐
//! ClusterSource (60s poll)    ─┤→ change pump (dedicated thread)
//!                              │      → Registry::notify(table)
//!                              │          → merged records across sources
//!                              │          → watcher: map → combine → Atom::store
//! force_update() ──────────────┘   (synchronous variant, used at boot)
//! ```
//!
//! # Design Decisions
//! - One pump thread serializes all recompiles: updates from a single
//!   source apply in arrival order, and compilation is allowed to block
//!   (JWK fetches, file reads) without touching the request runtime
//! - Watchers always see the fully remapped union of every source,
//!   never one source's partial view
//! - Any mapping/combining failure logs and leaves the previous Atom
//!   value in place; one bad table never corrupts another

pub mod cluster;
pub mod file;

pub use cluster::ClusterSource;
pub use file::FileSource;

use std::sync::{mpsc, Arc, Mutex};

use serde_json::Value;

use crate::atom::Atom;
use crate::config::ConfigError;

/// The logical configuration tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Routes,
    AuthProviders,
    SinkProviders,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Routes, Table::AuthProviders, Table::SinkProviders];

    /// Array key in TOML config files.
    pub fn key(self) -> &'static str {
        match self {
            Table::Routes => "routes",
            Table::AuthProviders => "auth_providers",
            Table::SinkProviders => "sink_providers",
        }
    }

    /// Custom-resource kind on the cluster API.
    pub fn kind(self) -> &'static str {
        match self {
            Table::Routes => "GatewayRoute",
            Table::AuthProviders => "GatewayAuthProvider",
            Table::SinkProviders => "GatewaySinkProvider",
        }
    }

    /// Plural resource name in cluster API paths.
    pub fn plural(self) -> &'static str {
        match self {
            Table::Routes => "gatewayroutes",
            Table::AuthProviders => "gatewayauthproviders",
            Table::SinkProviders => "gatewaysinkproviders",
        }
    }
}

/// One origin of raw config records. Closed set: the two source kinds
/// the gateway supports.
pub enum ConfigSource {
    File(FileSource),
    Cluster(ClusterSource),
}

impl ConfigSource {
    /// Current cached records for a table. Never blocks on I/O.
    pub fn records(&self, table: Table) -> Vec<Value> {
        match self {
            ConfigSource::File(source) => source.records(table),
            ConfigSource::Cluster(source) => source.records(table),
        }
    }

    /// Re-poll the origin (blocking). Failures log and retain the
    /// previous records. Returns the tables whose records changed.
    pub fn refresh(&self) -> Vec<Table> {
        match self {
            ConfigSource::File(source) => source.refresh(),
            ConfigSource::Cluster(source) => source.refresh(),
        }
    }

    /// Spawn the source's own change machinery, feeding changed tables
    /// into the pump channel.
    fn start(self: &Arc<Self>, events: mpsc::Sender<Table>) -> std::io::Result<()> {
        match &**self {
            ConfigSource::File(source) => source.start(Arc::clone(self), events),
            ConfigSource::Cluster(source) => source.start(Arc::clone(self), events),
        }
    }
}

struct Watcher {
    table: Table,
    apply: Box<dyn Fn(Vec<Value>) + Send + Sync>,
}

/// Merged view over all configuration sources with change notification.
pub struct Registry {
    sources: Vec<Arc<ConfigSource>>,
    watchers: Mutex<Vec<Watcher>>,
}

impl Registry {
    pub fn new(sources: Vec<ConfigSource>) -> Arc<Self> {
        Arc::new(Self {
            sources: sources.into_iter().map(Arc::new).collect(),
            watchers: Mutex::new(Vec::new()),
        })
    }

    /// The merged record sequence for a table, in source order.
    pub fn get_maps(&self, table: Table) -> Vec<Value> {
        self.sources
            .iter()
            .flat_map(|source| source.records(table))
            .collect()
    }

    /// Register a subscription: `mapper` converts each raw record to a
    /// typed spec, `combiner` compiles the full merged spec list, and the
    /// result is published into `atom`. A mapping or combining failure
    /// logs and keeps the atom's previous value.
    pub fn watch<S, T>(
        &self,
        table: Table,
        mapper: impl Fn(&Value) -> Result<S, ConfigError> + Send + Sync + 'static,
        combiner: impl Fn(Vec<S>) -> Result<T, ConfigError> + Send + Sync + 'static,
        atom: Arc<Atom<T>>,
    ) where
        T: Send + Sync + 'static,
    {
        let apply = move |records: Vec<Value>| {
            let mut specs = Vec::with_capacity(records.len());
            for record in &records {
                match mapper(record) {
                    Ok(spec) => specs.push(spec),
                    Err(e) => {
                        tracing::error!(
                            table = ?table,
                            error = %e,
                            "malformed record, keeping previous snapshot"
                        );
                        return;
                    }
                }
            }
            match combiner(specs) {
                Ok(value) => atom.store(value),
                Err(e) => {
                    tracing::error!(
                        table = ?table,
                        error = %e,
                        "failed to compile snapshot, keeping previous"
                    );
                }
            }
        };
        self.watchers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Watcher {
                table,
                apply: Box::new(apply),
            });
    }

    /// Synchronously re-poll every source, then fire every watcher with
    /// the merged view. Blocking; used at boot and from the pump thread.
    pub fn force_update(&self) {
        for source in &self.sources {
            source.refresh();
        }
        for table in Table::ALL {
            self.notify(table);
        }
    }

    /// Fire the watchers for one table with the current merged records.
    pub fn notify(&self, table: Table) {
        let records = self.get_maps(table);
        let watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
        for watcher in watchers.iter().filter(|w| w.table == table) {
            (watcher.apply)(records.clone());
        }
    }

    /// Start each source's change machinery plus the pump thread that
    /// serializes recompiles.
    pub fn start(self: &Arc<Self>) -> std::io::Result<()> {
        let (tx, rx) = mpsc::channel::<Table>();
        for source in &self.sources {
            source.start(tx.clone())?;
        }
        drop(tx);
        let registry = Arc::clone(self);
        std::thread::Builder::new()
            .name("config-pump".to_string())
            .spawn(move || {
                for table in rx {
                    registry.notify(table);
                }
                tracing::info!("config pump stopped, no more sources");
            })?;
        Ok(())
    }
}
